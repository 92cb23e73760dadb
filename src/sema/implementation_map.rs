// src/sema/implementation_map.rs
//! Struct to interface implementation map.
//!
//! Written only by the resolver, read by the dispatch classifier and the
//! lowerers. Entries are write-once: recording the same match twice changes
//! nothing.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// One struct method judged to satisfy one interface method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodMatch {
    pub interface: String,
    pub interface_method: String,
    pub method: String,
}

/// Per-struct resolver state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructImplementations {
    /// Matches in discovery order
    matches: Vec<MethodMatch>,
    /// Interfaces fully implemented, in the order they were completed
    implements: Vec<String>,
}

impl StructImplementations {
    pub fn matches(&self) -> &[MethodMatch] {
        &self.matches
    }

    pub fn implements(&self) -> &[String] {
        &self.implements
    }

    /// Distinct `(interface, method)` pairs in discovery order.
    pub fn matched_pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> = Vec::new();
        for m in &self.matches {
            let pair = (m.interface.as_str(), m.method.as_str());
            if !pairs.contains(&pair) {
                pairs.push(pair);
            }
        }
        pairs
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImplementationMap {
    structs: FxHashMap<String, StructImplementations>,
    /// Struct names in first-recorded order, for deterministic iteration
    order: Vec<String>,
}

impl ImplementationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `method` of `struct_name` satisfies `interface_method` of
    /// `interface`, then recompute whether the struct now fully implements
    /// the interface.
    ///
    /// `interface_methods` is the interface's complete method list. The
    /// struct implements the interface iff every listed method has exactly
    /// one matched struct method. Returns true if the match was new.
    pub fn record(
        &mut self,
        struct_name: &str,
        interface: &str,
        interface_methods: &[&str],
        interface_method: &str,
        method: &str,
    ) -> bool {
        if !self.structs.contains_key(struct_name) {
            self.order.push(struct_name.to_string());
        }
        let entry = self.structs.entry(struct_name.to_string()).or_default();

        let m = MethodMatch {
            interface: interface.to_string(),
            interface_method: interface_method.to_string(),
            method: method.to_string(),
        };
        if entry.matches.contains(&m) {
            return false;
        }
        entry.matches.push(m);

        let complete = !interface_methods.is_empty()
            && interface_methods.iter().all(|required| {
                let mut implementors: SmallVec<[&str; 2]> = SmallVec::new();
                for m in &entry.matches {
                    if m.interface == interface
                        && m.interface_method == *required
                        && !implementors.contains(&m.method.as_str())
                    {
                        implementors.push(&m.method);
                    }
                }
                implementors.len() == 1
            });

        let marked = entry.implements.iter().any(|i| i == interface);
        if complete && !marked {
            tracing::debug!(struct_name, interface, "struct fully implements interface");
            entry.implements.push(interface.to_string());
        } else if !complete && marked {
            tracing::debug!(
                struct_name,
                interface,
                "interface method became ambiguous, withdrawing implementation"
            );
            entry.implements.retain(|i| i != interface);
        }
        true
    }

    pub fn get(&self, struct_name: &str) -> Option<&StructImplementations> {
        self.structs.get(struct_name)
    }

    /// Whether `struct_name` fully implements `interface`.
    pub fn implements(&self, struct_name: &str, interface: &str) -> bool {
        self.structs
            .get(struct_name)
            .is_some_and(|s| s.implements.iter().any(|i| i == interface))
    }

    /// Interfaces with at least one recorded `(interface, method)` pair for
    /// this struct method, in discovery order and without duplicates.
    pub fn interfaces_for_method(&self, struct_name: &str, method: &str) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        if let Some(entry) = self.structs.get(struct_name) {
            for m in &entry.matches {
                if m.method == method && !out.contains(&m.interface.as_str()) {
                    out.push(&m.interface);
                }
            }
        }
        out
    }

    /// Interface methods that `method` was matched against within `interface`.
    pub fn satisfied_methods(&self, struct_name: &str, interface: &str, method: &str) -> Vec<&str> {
        self.structs
            .get(struct_name)
            .map(|entry| {
                entry
                    .matches
                    .iter()
                    .filter(|m| m.interface == interface && m.method == method)
                    .map(|m| m.interface_method.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Structs with any recorded match, in first-recorded order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StructImplementations)> {
        self.order
            .iter()
            .filter_map(|name| self.structs.get(name).map(|s| (name.as_str(), s)))
    }

    pub fn is_empty(&self) -> bool {
        self.structs.is_empty()
    }
}
