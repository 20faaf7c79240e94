//! The flat symbol pool.
//!
//! Every variable and parameter the resolver sees — across every function
//! in the program — lives in one append-only `Vec`, addressed by a stable
//! [`SymbolId`]. AST identifier nodes hold a `SymbolId` rather than an
//! owning or borrowed link to a [`SymbolInfo`], which is what lets the
//! type `Symbol → Type → Struct → Type` cycle close without a cyclic
//! ownership graph (framec-syntax's `TypeTable` applies the same trick to
//! `Type`).

use std::cell::Cell;

use framec_base::Symbol;
use framec_syntax::TypeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(u32);

impl SymbolId {
    fn from_index(index: usize) -> Self {
        SymbolId(index as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }

    /// `ASTNode::symbol_id` stores a raw `u32` (framec-syntax does not
    /// depend on framec-sema), so identifier nodes are linked via these
    /// conversions rather than storing a `SymbolId` directly.
    pub fn to_raw(self) -> u32 {
        self.0
    }

    pub fn from_raw(raw: u32) -> Self {
        SymbolId(raw)
    }
}

/// One declared variable or parameter: its name, its type, and whether it
/// is definitely assigned at the current point of the walk. Parameters
/// start assigned; ordinary variables start assigned only if their type is
/// a struct (struct-backed storage is zero-initialized frame space, so
/// reading it before an explicit assignment is well-defined, unlike a
/// scalar local slot).
#[derive(Debug)]
pub struct SymbolInfo {
    pub name: Symbol,
    pub ty: TypeId,
    pub assigned: Cell<bool>,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<SymbolInfo>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: Symbol, ty: TypeId, assigned: bool) -> SymbolId {
        let id = SymbolId::from_index(self.symbols.len());
        self.symbols.push(SymbolInfo { name, ty, assigned: Cell::new(assigned) });
        id
    }

    pub fn get(&self, id: SymbolId) -> &SymbolInfo {
        &self.symbols[id.index()]
    }

    pub fn mark_assigned(&self, id: SymbolId) {
        self.get(id).assigned.set(true);
    }

    pub fn is_assigned(&self, id: SymbolId) -> bool {
        self.get(id).assigned.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framec_syntax::TypeTable;

    #[test]
    fn declare_assigns_increasing_ids() {
        let mut table = SymbolTable::new();
        let mut types = TypeTable::new();
        let i64_ty = types.builtin(framec_syntax::BuiltinName::I64);
        let a = table.declare(Symbol::EMPTY, i64_ty, false);
        let b = table.declare(Symbol::EMPTY, i64_ty, false);
        assert_ne!(a, b);
    }

    #[test]
    fn parameters_start_assigned() {
        let mut table = SymbolTable::new();
        let mut types = TypeTable::new();
        let i64_ty = types.builtin(framec_syntax::BuiltinName::I64);
        let id = table.declare(Symbol::EMPTY, i64_ty, true);
        assert!(table.is_assigned(id));
    }

    #[test]
    fn mark_assigned_flips_flag() {
        let mut table = SymbolTable::new();
        let mut types = TypeTable::new();
        let i64_ty = types.builtin(framec_syntax::BuiltinName::I64);
        let id = table.declare(Symbol::EMPTY, i64_ty, false);
        assert!(!table.is_assigned(id));
        table.mark_assigned(id);
        assert!(table.is_assigned(id));
    }
}
