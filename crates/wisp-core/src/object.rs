//! Heap-allocated objects.
//!
//! The only object kind the language has is the interned string. Every
//! `Obj` lives in the VM's object arena (see `wisp_vm::Interner`) and is
//! referred to from `Value::Obj` by an index, not a pointer — the arena
//! owns the storage and frees it in bulk when the VM is dropped, matching
//! the intrusive-list-freed-at-teardown scheme of the C original without
//! needing unsafe code to thread the list together.

/// Index into the VM's object arena. Two `ObjRef`s compare equal iff they
/// name the same arena slot, which for interned strings means "same
/// content" — see `wisp_core::table::Table::find_string`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjRef(pub u32);

impl ObjRef {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A heap object. Only `String` is realized; the enum exists so future
/// object kinds have somewhere to go without renegotiating `Value`.
#[derive(Debug, Clone, PartialEq)]
pub enum Obj {
    String(ObjString),
}

impl Obj {
    pub fn as_string(&self) -> Option<&ObjString> {
        match self {
            Obj::String(s) => Some(s),
        }
    }
}

/// Immutable byte sequence plus a precomputed FNV-1a hash.
///
/// Invariant: `hash == fnv1a(chars.as_bytes())`. Two `ObjString`s with
/// equal `chars` are only ever allocated once per VM (see the interner),
/// so string equality at the `Value` level reduces to `ObjRef` identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjString {
    pub chars: Box<str>,
    pub hash: u32,
}

impl ObjString {
    pub fn new(chars: impl Into<Box<str>>) -> Self {
        let chars = chars.into();
        let hash = fnv1a(chars.as_bytes());
        ObjString { chars, hash }
    }

    pub fn as_str(&self) -> &str {
        &self.chars
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }
}

/// FNV-1a over raw bytes: `h <- 2166136261; for b in bytes: h <- (h ^ b) * 16777619`.
/// Wrapping 32-bit arithmetic, matching `original_source`'s `uint32_t` hash.
pub fn fnv1a(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 2166136261;
    for &b in bytes {
        hash ^= b as u32;
        hash = hash.wrapping_mul(16777619);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_matches_content() {
        let s = ObjString::new("hi");
        assert_eq!(s.hash, fnv1a(b"hi"));
    }

    #[test]
    fn empty_string_hashes_to_offset_basis() {
        assert_eq!(fnv1a(b""), 2166136261);
    }

    #[test]
    fn different_content_different_hash_usually() {
        let a = ObjString::new("foo");
        let b = ObjString::new("bar");
        assert_ne!(a.hash, b.hash);
    }
}
