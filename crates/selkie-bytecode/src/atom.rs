//! Atom (interned string) table
//!
//! Identifiers and property names are interned once per runtime and referenced
//! by integer handle everywhere else. Atom 0 is reserved as the invalid atom;
//! a fixed prefix of well-known names is pre-seeded at construction and
//! survives `clear`.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// An interned string handle.
///
/// Atoms are only meaningful relative to the [`AtomTable`] that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Atom(pub u32);

impl Atom {
    /// The reserved invalid atom.
    pub const INVALID: Atom = Atom(0);

    /// Get the raw index.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }

    /// Check whether this is the reserved invalid atom.
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

macro_rules! predefined_atoms {
    ($(($konst:ident, $text:literal)),+ $(,)?) => {
        /// Handles for the pre-seeded well-known atoms.
        pub mod well_known {
            use super::Atom;
            predefined_atoms!(@consts 1u32; $(($konst, $text)),+);
        }

        /// Spellings of the pre-seeded atoms, in handle order starting at 1.
        pub const PREDEFINED: &[&str] = &[$($text),+];
    };
    (@consts $idx:expr; ($konst:ident, $text:literal)) => {
        #[doc = concat!("`", $text, "`")]
        pub const $konst: Atom = Atom($idx);
    };
    (@consts $idx:expr; ($konst:ident, $text:literal), $(($tk:ident, $tt:literal)),+) => {
        #[doc = concat!("`", $text, "`")]
        pub const $konst: Atom = Atom($idx);
        predefined_atoms!(@consts $idx + 1u32; $(($tk, $tt)),+);
    };
}

predefined_atoms! {
    (NULL, "null"),
    (FALSE, "false"),
    (TRUE, "true"),
    (UNDEFINED, "undefined"),
    (IF, "if"),
    (ELSE, "else"),
    (RETURN, "return"),
    (VAR, "var"),
    (THIS, "this"),
    (DELETE, "delete"),
    (VOID, "void"),
    (TYPEOF, "typeof"),
    (NEW, "new"),
    (IN, "in"),
    (INSTANCEOF, "instanceof"),
    (DO, "do"),
    (WHILE, "while"),
    (FOR, "for"),
    (BREAK, "break"),
    (CONTINUE, "continue"),
    (SWITCH, "switch"),
    (CASE, "case"),
    (DEFAULT, "default"),
    (THROW, "throw"),
    (TRY, "try"),
    (CATCH, "catch"),
    (FINALLY, "finally"),
    (FUNCTION, "function"),
    (CLASS, "class"),
    (CONST, "const"),
    (EXTENDS, "extends"),
    (IMPORT, "import"),
    (EXPORT, "export"),
    (SUPER, "super"),
    (LET, "let"),
    (STATIC, "static"),
    (YIELD, "yield"),
    (AWAIT, "await"),
    (ASYNC, "async"),
    (OF, "of"),
    (GET, "get"),
    (SET, "set"),
    (EMPTY, ""),
    (LENGTH, "length"),
    (PROTOTYPE, "prototype"),
    (CONSTRUCTOR, "constructor"),
    (NAME, "name"),
    (MESSAGE, "message"),
    (STACK, "stack"),
    (VALUE, "value"),
    (WRITABLE, "writable"),
    (ENUMERABLE, "enumerable"),
    (CONFIGURABLE, "configurable"),
    (DONE, "done"),
    (NEXT, "next"),
    (THEN, "then"),
    (TO_STRING, "toString"),
    (VALUE_OF, "valueOf"),
    (ARGUMENTS, "arguments"),
    (CALLEE, "callee"),
    (CALLER, "caller"),
    (PROTO, "__proto__"),
    (RAW, "raw"),
    (ERRORS, "errors"),
    (GLOBAL_THIS, "globalThis"),
    (OBJECT, "Object"),
    (FUNCTION_CLASS, "Function"),
    (ARRAY, "Array"),
    (SYMBOL, "Symbol"),
    (PROMISE, "Promise"),
    (ERROR, "Error"),
    (TYPE_ERROR, "TypeError"),
    (RANGE_ERROR, "RangeError"),
    (SYNTAX_ERROR, "SyntaxError"),
    (REFERENCE_ERROR, "ReferenceError"),
    (AGGREGATE_ERROR, "AggregateError"),
    (ANONYMOUS, "<anonymous>"),
    (EVAL_SCRIPT, "<eval>"),
}

/// Runtime-scoped string interner mapping strings to [`Atom`] handles.
///
/// `intern` is idempotent; handles grow monotonically and never move.
/// `clear` drops every user atom but preserves the pre-seeded prefix.
#[derive(Debug)]
pub struct AtomTable {
    names: Vec<Box<str>>,
    map: FxHashMap<Box<str>, u32>,
}

impl AtomTable {
    /// Create a table holding only the pre-seeded well-known atoms.
    pub fn new() -> Self {
        let mut table = Self {
            // Slot 0 is the reserved invalid atom.
            names: vec!["".into()],
            map: FxHashMap::default(),
        };
        for name in PREDEFINED {
            let idx = table.names.len() as u32;
            table.names.push((*name).into());
            table.map.insert((*name).into(), idx);
        }
        table
    }

    /// Intern a string, returning its atom. Idempotent.
    pub fn intern(&mut self, s: &str) -> Atom {
        if let Some(&idx) = self.map.get(s) {
            return Atom(idx);
        }
        let idx = self.names.len() as u32;
        self.names.push(s.into());
        self.map.insert(s.into(), idx);
        Atom(idx)
    }

    /// Look up an already-interned string without creating a new atom.
    pub fn lookup(&self, s: &str) -> Option<Atom> {
        self.map.get(s).map(|&idx| Atom(idx))
    }

    /// Get the spelling of an atom, or `None` for an invalid handle.
    pub fn get_string(&self, atom: Atom) -> Option<&str> {
        if atom.0 == 0 {
            return None;
        }
        self.names.get(atom.0 as usize).map(|s| s.as_ref())
    }

    /// Number of live atoms, including the pre-seeded prefix.
    pub fn len(&self) -> usize {
        self.names.len() - 1
    }

    /// True when only the reserved slot exists (never, in practice).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all user atoms, keeping the pre-seeded prefix valid.
    pub fn clear(&mut self) {
        let keep = PREDEFINED.len() + 1;
        for name in self.names.drain(keep..) {
            self.map.remove(&name);
        }
    }
}

impl Default for AtomTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_round_trip() {
        let mut table = AtomTable::new();
        let a = table.intern("answer");
        assert_eq!(table.get_string(a), Some("answer"));
        assert_eq!(table.intern("answer"), a);
    }

    #[test]
    fn test_well_known_spellings() {
        let table = AtomTable::new();
        assert_eq!(table.get_string(well_known::NULL), Some("null"));
        assert_eq!(table.get_string(well_known::LENGTH), Some("length"));
        assert_eq!(table.get_string(well_known::PROTOTYPE), Some("prototype"));
        assert_eq!(table.get_string(well_known::PROTO), Some("__proto__"));
        assert_eq!(table.get_string(well_known::TYPE_ERROR), Some("TypeError"));
        assert!(PREDEFINED.len() >= 41);
    }

    #[test]
    fn test_invalid_atom() {
        let table = AtomTable::new();
        assert_eq!(table.get_string(Atom::INVALID), None);
        assert_eq!(table.get_string(Atom(0xFFFF_FFFF)), None);
    }

    #[test]
    fn test_clear_preserves_prefix() {
        let mut table = AtomTable::new();
        let user = table.intern("userAtom");
        table.clear();
        assert_eq!(table.get_string(user), None);
        assert_eq!(table.get_string(well_known::VALUE), Some("value"));
        // Re-interning after clear produces a fresh handle at the same slot.
        let again = table.intern("userAtom");
        assert_eq!(table.get_string(again), Some("userAtom"));
    }

    #[test]
    fn test_lookup_does_not_intern() {
        let mut table = AtomTable::new();
        assert_eq!(table.lookup("nope"), None);
        let a = table.intern("nope");
        assert_eq!(table.lookup("nope"), Some(a));
    }
}
