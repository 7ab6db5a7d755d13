//! String interner backing [`Name`].
//!
//! The compiler is single-threaded, but the interner is shared by every
//! phase (front-end, type pool, TAC builder, emitter), so it uses interior
//! mutability behind an `RwLock` rather than threading `&mut` through all
//! of them.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::Name;

struct Inner {
    /// Map from string content to index.
    map: FxHashMap<Box<str>, u32>,
    /// Interned string contents, indexed by `Name::raw()`.
    strings: Vec<Box<str>>,
}

/// Interner for identifier strings.
///
/// `resolve` hands back an owned `String`; interned strings are small
/// (identifiers and qualified names) and resolution happens off the hot
/// path, when rendering diagnostics or emitting IR.
pub struct StringInterner {
    inner: RwLock<Inner>,
}

impl StringInterner {
    /// Create an interner with the empty string pre-interned as
    /// [`Name::EMPTY`].
    pub fn new() -> Self {
        let mut map = FxHashMap::default();
        map.insert(Box::from(""), 0);
        StringInterner {
            inner: RwLock::new(Inner {
                map,
                strings: vec![Box::from("")],
            }),
        }
    }

    /// Intern a string, returning its stable `Name`.
    pub fn intern(&self, s: &str) -> Name {
        {
            let inner = self.inner.read();
            if let Some(&idx) = inner.map.get(s) {
                return Name::from_raw(idx);
            }
        }
        let mut inner = self.inner.write();
        // Re-check under the write lock: another caller may have interned
        // between the read and write acquisitions.
        if let Some(&idx) = inner.map.get(s) {
            return Name::from_raw(idx);
        }
        let idx = inner.strings.len() as u32;
        let owned: Box<str> = Box::from(s);
        inner.strings.push(owned.clone());
        inner.map.insert(owned, idx);
        Name::from_raw(idx)
    }

    /// Resolve a `Name` back to its string.
    ///
    /// # Panics
    ///
    /// Panics if `name` did not come from this interner.
    pub fn resolve(&self, name: Name) -> String {
        self.inner.read().strings[name.index()].to_string()
    }

    /// Number of interned strings (including the pre-interned empty one).
    pub fn len(&self) -> usize {
        self.inner.read().strings.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn intern_is_idempotent() {
        let interner = StringInterner::new();
        let a = interner.intern("Console");
        let b = interner.intern("Console");
        assert_eq!(a, b);
        assert_eq!(interner.resolve(a), "Console");
    }

    #[test]
    fn distinct_strings_get_distinct_names() {
        let interner = StringInterner::new();
        let a = interner.intern("printLine");
        let b = interner.intern("printline");
        assert_ne!(a, b);
    }

    #[test]
    fn empty_string_is_pre_interned() {
        let interner = StringInterner::new();
        assert_eq!(interner.intern(""), Name::EMPTY);
        assert_eq!(interner.len(), 1);
    }
}
