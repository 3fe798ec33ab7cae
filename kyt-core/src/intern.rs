//! Case-folding interner for addresses and tx-ids (spec.md §4.2 C5, §9).
//!
//! All cross-component identifiers are lowercased forms; interning to a
//! stable `u32` handle saves memory on large traces without changing any
//! contract in spec.md.

use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InternedId(u32);

#[derive(Default)]
pub struct AddressInterner {
    inner: Mutex<InternerInner>,
}

#[derive(Default)]
struct InternerInner {
    ids: HashMap<String, u32>,
    values: Vec<String>,
}

impl AddressInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&self, value: &str) -> InternedId {
        let lowered = value.to_lowercase();
        let mut guard = self.inner.lock().expect("interner mutex poisoned");
        if let Some(&id) = guard.ids.get(&lowered) {
            return InternedId(id);
        }
        let id = guard.values.len() as u32;
        guard.values.push(lowered.clone());
        guard.ids.insert(lowered, id);
        InternedId(id)
    }

    pub fn resolve(&self, id: InternedId) -> String {
        let guard = self.inner.lock().expect("interner mutex poisoned");
        guard.values[id.0 as usize].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_case_insensitive_and_stable() {
        let interner = AddressInterner::new();
        let a = interner.intern("0xABC");
        let b = interner.intern("0xabc");
        assert_eq!(a, b);
        assert_eq!(interner.resolve(a), "0xabc");
    }

    #[test]
    fn distinct_values_get_distinct_ids() {
        let interner = AddressInterner::new();
        let a = interner.intern("addr-a");
        let b = interner.intern("addr-b");
        assert_ne!(a, b);
    }
}
