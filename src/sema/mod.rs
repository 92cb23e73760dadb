// src/sema/mod.rs
pub mod dispatch;
pub mod implementation_map;
pub mod resolver;

pub use dispatch::{Dispatch, classify};
pub use implementation_map::{ImplementationMap, MethodMatch, StructImplementations};
pub use resolver::{Resolver, implements_method, receiver_type_name, resolve};
