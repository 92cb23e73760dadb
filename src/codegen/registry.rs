// src/codegen/registry.rs
//
// Lowered struct/interface/function metadata. Written while declarations are
// lowered; read by body lowering.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::frontend::Method;
use crate::sema::Dispatch;

use super::types::Ty;

/// Emitted name of a receiver method.
pub fn mangle(struct_name: &str, method: &str) -> String {
    format!("{struct_name}_{method}")
}

/// Name of the vtable struct type of an interface.
pub fn vtable_type_name(interface: &str) -> String {
    format!("{interface}_VTable")
}

/// Name of the constant vtable instance of an interface.
pub fn vtable_global_name(interface: &str) -> String {
    format!("{interface}_vtable")
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: Ty,
    pub mutable: bool,
    pub public: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructType {
    pub name: String,
    /// Flattened fields in declaration order
    pub fields: Vec<Field>,
    /// Emitted names of directly dispatched methods, in declaration order
    pub method_names: Vec<String>,
}

impl StructType {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: Vec::new(),
            method_names: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<(u32, &Field)> {
        self.fields
            .iter()
            .enumerate()
            .find(|(_, f)| f.name == name)
            .map(|(i, f)| (i as u32, f))
    }

    pub fn has_method(&self, emitted: &str) -> bool {
        self.method_names.iter().any(|m| m == emitted)
    }
}

/// One function-pointer member of an interface vtable.
#[derive(Debug, Clone, PartialEq)]
pub struct VtableSlot {
    /// Emitted name of the implementing function
    pub function: String,
    /// Lowered parameter list, receiver pointer first
    pub params: Vec<Ty>,
    pub ret: Ty,
    /// Interface methods this slot answers for
    pub satisfies: SmallVec<[String; 1]>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceType {
    pub name: String,
    /// Name of the `%<Interface>_VTable` struct type
    pub vtable: String,
    pub methods: Vec<Method>,
    pub slots: Vec<VtableSlot>,
}

impl InterfaceType {
    pub fn new(name: &str, methods: Vec<Method>) -> Self {
        Self {
            name: name.to_string(),
            vtable: vtable_type_name(name),
            methods,
            slots: Vec::new(),
        }
    }

    pub fn declares(&self, method: &str) -> bool {
        self.methods.iter().any(|m| m.name == method)
    }

    pub fn slot_of_function(&self, function: &str) -> Option<u32> {
        self.slots
            .iter()
            .position(|s| s.function == function)
            .map(|i| i as u32)
    }

    /// First slot registered for interface method `method`.
    pub fn slot_for_method(&self, method: &str) -> Option<(u32, &VtableSlot)> {
        self.slots
            .iter()
            .enumerate()
            .find(|(_, s)| s.satisfies.iter().any(|m| m == method))
            .map(|(i, s)| (i as u32, s))
    }

    /// Append a slot unless the function already has one. Returns the new
    /// slot's index.
    pub fn add_slot(&mut self, slot: VtableSlot) -> Option<u32> {
        if self.slot_of_function(&slot.function).is_some() {
            return None;
        }
        self.slots.push(slot);
        Some(self.slots.len() as u32 - 1)
    }
}

/// A declared function or method.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionInfo {
    /// Source name
    pub name: String,
    pub emitted: String,
    /// Receiver struct for methods
    pub receiver: Option<String>,
    /// User-visible parameters, receiver excluded
    pub params: Vec<Ty>,
    pub ret: Ty,
    pub dispatch: Dispatch,
    pub external: bool,
}

impl FunctionInfo {
    /// Parameter list as emitted: receiver pointer first, then `params`.
    pub fn abi_params(&self) -> Vec<Ty> {
        let receiver = self
            .receiver
            .iter()
            .map(|name| Ty::pointer(Ty::Struct(name.clone())));
        receiver.chain(self.params.iter().cloned()).collect()
    }
}

#[derive(Debug, Default)]
pub struct TypeRegistry {
    structs: FxHashMap<String, StructType>,
    interfaces: FxHashMap<String, InterfaceType>,
    aliases: FxHashMap<String, Ty>,
    functions: FxHashMap<String, FunctionInfo>,
    interface_order: Vec<String>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_struct(&mut self, ty: StructType) {
        self.structs.insert(ty.name.clone(), ty);
    }

    pub fn struct_type(&self, name: &str) -> Option<&StructType> {
        self.structs.get(name)
    }

    pub fn struct_type_mut(&mut self, name: &str) -> Option<&mut StructType> {
        self.structs.get_mut(name)
    }

    pub fn register_interface(&mut self, ty: InterfaceType) {
        if !self.interfaces.contains_key(&ty.name) {
            self.interface_order.push(ty.name.clone());
        }
        self.interfaces.insert(ty.name.clone(), ty);
    }

    pub fn interface(&self, name: &str) -> Option<&InterfaceType> {
        self.interfaces.get(name)
    }

    pub fn interface_mut(&mut self, name: &str) -> Option<&mut InterfaceType> {
        self.interfaces.get_mut(name)
    }

    /// Interfaces in registration order.
    pub fn interfaces(&self) -> impl Iterator<Item = &InterfaceType> {
        self.interface_order
            .iter()
            .filter_map(|name| self.interfaces.get(name))
    }

    pub fn add_alias(&mut self, name: &str, ty: Ty) {
        self.aliases.insert(name.to_string(), ty);
    }

    pub fn alias(&self, name: &str) -> Option<&Ty> {
        self.aliases.get(name)
    }

    /// Resolve a declared name to its lowered type, if it was lowered.
    pub fn lookup(&self, name: &str) -> Option<Ty> {
        if self.structs.contains_key(name) {
            Some(Ty::Struct(name.to_string()))
        } else if self.interfaces.contains_key(name) {
            Some(Ty::Interface(name.to_string()))
        } else {
            self.aliases.get(name).cloned()
        }
    }

    pub fn add_function(&mut self, info: FunctionInfo) {
        self.functions.insert(info.emitted.clone(), info);
    }

    pub fn function(&self, emitted: &str) -> Option<&FunctionInfo> {
        self.functions.get(emitted)
    }

    /// The interface and slot index a struct method was registered under.
    pub fn virtual_slot(&self, struct_name: &str, method: &str) -> Option<(&InterfaceType, u32)> {
        let emitted = mangle(struct_name, method);
        self.interfaces()
            .find_map(|iface| iface.slot_of_function(&emitted).map(|slot| (iface, slot)))
    }
}
