//! String interning: the pool both the compiler (constant-pool string
//! literals) and the VM (runtime string concatenation) allocate from.
//!
//! Interning guarantees that for any two string objects held by the same
//! `Interner`, equal content implies identical `ObjRef` — so string
//! equality at the `Value` level reduces to `ObjRef` identity (see
//! `value::values_equal`).

use crate::object::{Obj, ObjRef, ObjString, fnv1a};
use crate::table::Table;
use crate::value::Value;

#[derive(Debug, Default)]
pub struct Interner {
    objects: Vec<Obj>,
    strings: Table,
}

impl Interner {
    pub fn new() -> Self {
        Interner {
            objects: Vec::new(),
            strings: Table::new(),
        }
    }

    /// Resolve an `ObjRef` back to the `ObjString` it names.
    ///
    /// # Panics
    /// Panics if `r` was not allocated by this interner — that would be a
    /// bug in the compiler or VM, not a condition either should recover
    /// from at runtime.
    pub fn resolve(&self, r: ObjRef) -> &ObjString {
        match &self.objects[r.index()] {
            Obj::String(s) => s,
        }
    }

    fn find_existing(&self, bytes: &str, hash: u32) -> Option<ObjRef> {
        let objects = &self.objects;
        self.strings.find_string(hash, |candidate| {
            match &objects[candidate.index()] {
                Obj::String(s) => s.as_str() == bytes,
            }
        })
    }

    /// Intern a borrowed string: hash it, look it up, and only allocate if
    /// no interned object with that content exists yet.
    pub fn copy_string(&mut self, s: &str) -> ObjRef {
        let hash = fnv1a(s.as_bytes());
        if let Some(existing) = self.find_existing(s, hash) {
            return existing;
        }
        self.install(ObjString::new(s))
    }

    /// Intern an owned string. In the C original this avoids a copy when
    /// there is no intern hit by taking ownership of the caller's buffer;
    /// in Rust the caller's `String` is simply dropped on an intern hit,
    /// which is the same effect without unsafe bookkeeping.
    pub fn take_string(&mut self, s: String) -> ObjRef {
        let hash = fnv1a(s.as_bytes());
        if let Some(existing) = self.find_existing(&s, hash) {
            return existing;
        }
        self.install(ObjString::new(s))
    }

    fn install(&mut self, obj_string: ObjString) -> ObjRef {
        let hash = obj_string.hash;
        let r = ObjRef(self.objects.len() as u32);
        self.objects.push(Obj::String(obj_string));
        // The table is used purely as a content-addressed set here; the
        // stored value is never read back.
        self.strings.set(r, hash, Value::Bool(true));
        r
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
