//! The type model and its flat-pool storage.
//!
//! `Type` forms a cyclic graph in the language it describes (a struct field
//! can be a pointer back to the same struct), so individual `Type` values
//! are never nested by value or boxed into each other. Instead every `Type`
//! lives in a [`TypeTable`] and is referred to everywhere else — AST nodes,
//! symbols, other `Type`s — by its [`TypeId`]. Parser-time references to a
//! struct name that has not been declared yet are represented by
//! `Type::Unresolved` and patched in place once the name-resolution pass
//! sees the real declaration; the `TypeId` handed out at parse time stays
//! valid because patching mutates the table slot, not the identity.

use std::collections::HashMap;

use framec_base::Symbol;

/// The four built-in scalar type names. `Integer` is compile-time only: a
/// numeric literal carries it until context resolves it to a concrete type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinName {
    I64,
    U8,
    Boolean,
    Integer,
}

/// A handle into a [`TypeTable`]. Cheap to copy, compares by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(u32);

impl TypeId {
    fn from_index(index: usize) -> Self {
        TypeId(index as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// One field of a struct type: its name, its type, and its byte offset from
/// the start of the struct, computed by sequential layout in declaration
/// order.
#[derive(Debug, Clone, Copy)]
pub struct StructField {
    pub name: Symbol,
    pub ty: TypeId,
    pub offset: u32,
}

/// One member of the type sum, stored flat in a [`TypeTable`].
#[derive(Debug, Clone)]
pub enum Type {
    Builtin(BuiltinName),
    /// Machine-word address of a value of the inner type.
    Pointer(TypeId),
    /// Fat descriptor: items-pointer then length.
    Slice(TypeId),
    Struct {
        name: Symbol,
        fields: Vec<StructField>,
    },
    /// A named type referenced before its declaration was seen. Replaced by
    /// a real `Struct` entry during name resolution's declarations pass;
    /// never observed once resolution finishes without errors.
    Unresolved(Symbol),
}

/// Byte size of a type under this language's layout rules: `I64`/`Boolean`/
/// pointer are all 8 bytes, `U8` is 1 byte, a slice is 16 bytes (two 8-byte
/// fields), a struct is the sum of its field sizes.
pub fn builtin_size(name: BuiltinName) -> u32 {
    match name {
        BuiltinName::I64 | BuiltinName::Boolean | BuiltinName::Integer => 8,
        BuiltinName::U8 => 1,
    }
}

/// Flat, append-only pool of [`Type`]s indexed by [`TypeId`].
///
/// Builtins and `Pointer`/`Slice` wrappers are deduplicated by structural
/// equality of their already-resolved component so that, e.g., every
/// occurrence of `I64*` shares one `TypeId`. Struct types are keyed by name:
/// the first reference to a struct name (whether the declaration itself or
/// a forward use in another type's field) reserves a slot, and declaring
/// the struct overwrites that slot in place.
pub struct TypeTable {
    types: Vec<Type>,
    builtins: HashMap<BuiltinName, TypeId>,
    pointers: HashMap<TypeId, TypeId>,
    slices: HashMap<TypeId, TypeId>,
    named: HashMap<Symbol, TypeId>,
}

impl TypeTable {
    pub fn new() -> Self {
        TypeTable {
            types: Vec::new(),
            builtins: HashMap::new(),
            pointers: HashMap::new(),
            slices: HashMap::new(),
            named: HashMap::new(),
        }
    }

    fn push(&mut self, ty: Type) -> TypeId {
        let id = TypeId::from_index(self.types.len());
        self.types.push(ty);
        id
    }

    pub fn get(&self, id: TypeId) -> &Type {
        &self.types[id.index()]
    }

    pub fn builtin(&mut self, name: BuiltinName) -> TypeId {
        if let Some(&id) = self.builtins.get(&name) {
            return id;
        }
        let id = self.push(Type::Builtin(name));
        self.builtins.insert(name, id);
        id
    }

    pub fn pointer(&mut self, inner: TypeId) -> TypeId {
        if let Some(&id) = self.pointers.get(&inner) {
            return id;
        }
        let id = self.push(Type::Pointer(inner));
        self.pointers.insert(inner, id);
        id
    }

    pub fn slice(&mut self, elem: TypeId) -> TypeId {
        if let Some(&id) = self.slices.get(&elem) {
            return id;
        }
        let id = self.push(Type::Slice(elem));
        self.slices.insert(elem, id);
        id
    }

    /// Returns the `TypeId` for `name`, creating an `Unresolved` placeholder
    /// if this is the first reference (forward or otherwise) to that name.
    pub fn named(&mut self, name: Symbol) -> TypeId {
        if let Some(&id) = self.named.get(&name) {
            return id;
        }
        let id = self.push(Type::Unresolved(name));
        self.named.insert(name, id);
        id
    }

    /// Returns the existing `TypeId` for a struct name without creating a
    /// placeholder, for callers that must distinguish "never referenced"
    /// from "referenced but not yet declared".
    pub fn lookup_named(&self, name: Symbol) -> Option<TypeId> {
        self.named.get(&name).copied()
    }

    /// Overwrites the slot for `name` (creating one if none exists) with a
    /// concrete struct definition. Every `TypeId` obtained earlier via
    /// [`TypeTable::named`] for this name keeps pointing at the same slot,
    /// now resolved.
    pub fn define_struct(&mut self, name: Symbol, fields: Vec<StructField>) -> TypeId {
        let id = self.named(name);
        self.types[id.index()] = Type::Struct { name, fields };
        id
    }

    pub fn is_unresolved(&self, id: TypeId) -> bool {
        matches!(self.get(id), Type::Unresolved(_))
    }

    pub fn is_integer(&self, id: TypeId) -> bool {
        matches!(self.get(id), Type::Builtin(BuiltinName::Integer))
    }

    /// Every name ever passed to [`TypeTable::named`], with the slot it
    /// resolved to. Used once, at the end of name resolution's first pass,
    /// to report any name that never received a real declaration.
    pub fn named_entries(&self) -> impl Iterator<Item = (Symbol, TypeId)> + '_ {
        self.named.iter().map(|(&name, &id)| (name, id))
    }

    /// Looks up a struct field by name on a `Struct` type. Returns `None`
    /// both when `id` is not a struct and when the struct has no such field.
    pub fn struct_field(&self, id: TypeId, field: Symbol) -> Option<StructField> {
        match self.get(id) {
            Type::Struct { fields, .. } => fields.iter().find(|f| f.name == field).copied(),
            _ => None,
        }
    }

    /// Byte size per §3 of the type model: builtins per [`builtin_size`],
    /// pointer and slice fixed, struct the sum of its field sizes.
    pub fn size_of(&self, id: TypeId) -> u32 {
        match self.get(id) {
            Type::Builtin(name) => builtin_size(*name),
            Type::Pointer(_) => 8,
            Type::Slice(_) => 16,
            Type::Struct { fields, .. } => fields.iter().map(|f| self.size_of_field(f)).sum(),
            Type::Unresolved(_) => 0,
        }
    }

    fn size_of_field(&self, field: &StructField) -> u32 {
        self.size_of(field.ty)
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_deduplicated() {
        let mut table = TypeTable::new();
        let a = table.builtin(BuiltinName::I64);
        let b = table.builtin(BuiltinName::I64);
        assert_eq!(a, b);
    }

    #[test]
    fn pointer_to_same_inner_is_deduplicated() {
        let mut table = TypeTable::new();
        let i64_ty = table.builtin(BuiltinName::I64);
        let p1 = table.pointer(i64_ty);
        let p2 = table.pointer(i64_ty);
        assert_eq!(p1, p2);
    }

    #[test]
    fn forward_reference_then_definition_shares_type_id() {
        let mut table = TypeTable::new();
        let name = Symbol::EMPTY;
        let forward = table.named(name);
        assert!(table.is_unresolved(forward));
        let defined = table.define_struct(name, vec![]);
        assert_eq!(forward, defined);
        assert!(!table.is_unresolved(forward));
    }

    #[test]
    fn struct_size_is_sum_of_field_sizes() {
        let mut table = TypeTable::new();
        let i64_ty = table.builtin(BuiltinName::I64);
        let u8_ty = table.builtin(BuiltinName::U8);
        let name = Symbol::EMPTY;
        let id = table.define_struct(
            name,
            vec![
                StructField { name: Symbol::EMPTY, ty: i64_ty, offset: 0 },
                StructField { name: Symbol::EMPTY, ty: u8_ty, offset: 8 },
            ],
        );
        assert_eq!(table.size_of(id), 9);
    }

    #[test]
    fn slice_is_always_sixteen_bytes() {
        let mut table = TypeTable::new();
        let u8_ty = table.builtin(BuiltinName::U8);
        let slice_ty = table.slice(u8_ty);
        assert_eq!(table.size_of(slice_ty), 16);
    }
}
