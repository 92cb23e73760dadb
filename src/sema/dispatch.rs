// src/sema/dispatch.rs
//! Dispatch classification for functions.

use smallvec::SmallVec;

use crate::frontend::FnDecl;

use super::implementation_map::ImplementationMap;
use super::resolver::receiver_type_name;

/// How calls to a function are dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Called through its emitted name only
    Direct,
    /// Registered as a vtable slot in each listed interface, in discovery order
    Virtual(SmallVec<[String; 1]>),
}

impl Dispatch {
    pub fn is_virtual(&self) -> bool {
        matches!(self, Dispatch::Virtual(_))
    }

    pub fn interfaces(&self) -> &[String] {
        match self {
            Dispatch::Direct => &[],
            Dispatch::Virtual(interfaces) => interfaces,
        }
    }
}

/// Classify `func` from the resolver's verdicts. Pure function of the map.
///
/// A receiver method with at least one recorded `(interface, method)` pair
/// for its struct is virtual in every such interface; everything else,
/// including all free functions, is direct.
pub fn classify(func: &FnDecl, map: &ImplementationMap) -> Dispatch {
    let Some(receiver) = &func.receiver else {
        return Dispatch::Direct;
    };
    let Ok(struct_name) = receiver_type_name(receiver, &func.name) else {
        return Dispatch::Direct;
    };
    let interfaces: SmallVec<[String; 1]> = map
        .interfaces_for_method(struct_name, &func.name)
        .into_iter()
        .map(str::to_string)
        .collect();
    if interfaces.is_empty() {
        Dispatch::Direct
    } else {
        Dispatch::Virtual(interfaces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::PrimitiveType;

    #[test]
    fn free_function_is_direct() {
        let mut map = ImplementationMap::new();
        map.record("Square", "Shape", &["area"], "area", "area");
        let func = FnDecl::new("area").returns(PrimitiveType::I32);
        assert_eq!(classify(&func, &map), Dispatch::Direct);
    }

    #[test]
    fn unmatched_method_is_direct() {
        let map = ImplementationMap::new();
        let func = FnDecl::method("Point", "p", "sum").returns(PrimitiveType::I32);
        assert_eq!(classify(&func, &map), Dispatch::Direct);
    }

    #[test]
    fn matched_method_is_virtual_in_every_interface() {
        let mut map = ImplementationMap::new();
        map.record("Square", "Shape", &["area"], "area", "area");
        map.record("Square", "Sized", &["size"], "size", "area");
        let func = FnDecl::method("Square", "s", "area").returns(PrimitiveType::I32);
        let dispatch = classify(&func, &map);
        assert!(dispatch.is_virtual());
        assert_eq!(dispatch.interfaces(), ["Shape".to_string(), "Sized".to_string()]);
    }

    #[test]
    fn partial_match_is_still_virtual() {
        let mut map = ImplementationMap::new();
        map.record("Square", "Shape", &["area", "perimeter"], "area", "area");
        assert!(!map.implements("Square", "Shape"));
        let func = FnDecl::method("Square", "s", "area").returns(PrimitiveType::I32);
        assert!(classify(&func, &map).is_virtual());
    }
}
