//! String interning for identifiers, type names, and struct field names.
//!
//! Every name that appears in source — a variable, a function, a struct or
//! its fields — is looked up repeatedly during resolution (once per use, on
//! top of its one declaration): interning each string once to an integer
//! [`Symbol`] makes every later comparison and scope-table key an O(1)
//! integer operation instead of a string comparison, and the emitter's
//! [`Interner::lookup`] for the program's `main` function is a single hash
//! lookup rather than a scan of every declared name.
//!
//! ```
//! use framec_base::{Interner, Symbol};
//!
//! let mut interner = Interner::new();
//!
//! let main_fn = interner.intern("main");
//! let same_name = interner.intern("main");
//! let other = interner.intern("sum");
//!
//! assert_eq!(main_fn, same_name);
//! assert_ne!(main_fn, other);
//! assert_eq!(interner.resolve(main_fn), "main");
//! ```

use std::collections::HashMap;

/// A lightweight handle to an interned string.
///
/// `Symbol`s are `Copy` and compare in O(1) time regardless of the length of
/// the name they stand for. Use [`Interner::resolve`] to retrieve the
/// original text, e.g. when rendering a name back into a diagnostic.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Symbol(u32);

impl Symbol {
    /// The empty string symbol, always at index 0. Used as the placeholder
    /// name for AST nodes that don't carry one (see
    /// `framec_syntax::ast::ASTNode` test helpers).
    pub const EMPTY: Symbol = Symbol(0);
}

impl Default for Symbol {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// A string interner providing O(1) equality comparison via [`Symbol`]
/// handles. Each compilation owns exactly one, built up during parsing and
/// consulted for the rest of the pipeline — resolution keys its symbol
/// table by `Symbol`, and the emitter resolves `main`'s `Symbol` back to a
/// function index through it.
pub struct Interner {
    map: HashMap<String, Symbol>,
    vec: Vec<String>,
}

impl Interner {
    /// Creates an interner with only the empty string pre-interned.
    pub fn new() -> Self {
        let mut interner = Interner {
            map: HashMap::new(),
            vec: Vec::new(),
        };
        interner.vec.push(String::new());
        interner
    }

    /// Interns a string, returning its symbol.
    ///
    /// Returns the existing symbol if the string was already interned —
    /// two uses of the same identifier anywhere in a source file resolve
    /// to the same `Symbol`.
    pub fn intern(&mut self, s: &str) -> Symbol {
        if let Some(&sym) = self.map.get(s) {
            return sym;
        }
        let sym = Symbol(self.vec.len() as u32);
        self.vec.push(s.to_string());
        self.map.insert(s.to_string(), sym);
        sym
    }

    /// Returns the string a symbol was interned from.
    ///
    /// # Panics
    ///
    /// Panics if `sym` was not created by this interner.
    pub fn resolve(&self, sym: Symbol) -> &str {
        &self.vec[sym.0 as usize]
    }

    /// Looks up an already-interned string without creating a new entry.
    /// The emitter uses this to find the program's `main` function by name
    /// without having tracked its `Symbol` through resolution itself.
    pub fn lookup(&self, s: &str) -> Option<Symbol> {
        self.map.get(s).copied()
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_the_same_identifier_twice_returns_the_same_symbol() {
        let mut interner = Interner::new();
        let a = interner.intern("main");
        let b = interner.intern("main");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_identifiers_intern_to_distinct_symbols() {
        let mut interner = Interner::new();
        let sum = interner.intern("sum");
        let point = interner.intern("Point");
        assert_ne!(sum, point);
    }

    #[test]
    fn resolve_returns_the_original_identifier_text() {
        let mut interner = Interner::new();
        let sym = interner.intern("tstack");
        assert_eq!(interner.resolve(sym), "tstack");
    }

    #[test]
    fn the_empty_symbol_resolves_to_the_empty_string() {
        let interner = Interner::new();
        assert_eq!(interner.resolve(Symbol::EMPTY), "");
    }

    #[test]
    fn symbols_are_copy_and_compare_by_value() {
        let mut interner = Interner::new();
        let a = interner.intern("x");
        let b = a;
        assert_eq!(a, b);
        assert_eq!(interner.resolve(a), interner.resolve(b));
    }

    #[test]
    fn lookup_finds_a_previously_interned_function_name() {
        let mut interner = Interner::new();
        let main_fn = interner.intern("main");
        assert_eq!(interner.lookup("main"), Some(main_fn));
    }

    #[test]
    fn lookup_of_an_undeclared_name_is_none() {
        let interner = Interner::new();
        assert_eq!(interner.lookup("main"), None);
    }

    #[test]
    fn identifiers_are_case_sensitive() {
        let mut interner = Interner::new();
        let lower = interner.intern("point");
        let upper = interner.intern("Point");
        assert_ne!(lower, upper);
    }
}
