//! Bump allocation for the compiler's arena-allocated AST.
//!
//! [`Arena<T>`] is monomorphic over one element type. An AST node's
//! children are never owned directly — `ASTNode` holds `&'ast` references
//! into arenas instead — so a single compilation needs one arena per
//! distinct element type: nodes themselves, node-reference lists (a
//! block's statements, a call's arguments), struct fields, `if` arms,
//! parameters. [`framec_syntax::Arenas`] bundles exactly those five behind
//! one struct so the driver only has one lifetime to thread through
//! parsing.
//!
//! ```
//! use framec_base::Arena;
//!
//! let arena: Arena<i32> = Arena::new();
//! let a = arena.alloc(1);
//! let b = arena.alloc(2);
//! assert_eq!((*a, *b), (1, 2));
//! ```

use bumpalo::Bump;

/// A bump allocator handing out `&'a T` references valid for its own
/// lifetime. No deallocation happens until the arena itself is dropped —
/// the AST it backs is read-only from the moment parsing finishes, so
/// nothing ever needs to free one node ahead of the rest.
pub struct Arena<T> {
    bump: Bump,
    _marker: std::marker::PhantomData<T>,
}

impl<T> Arena<T> {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Arena {
            bump: Bump::new(),
            _marker: std::marker::PhantomData,
        }
    }

    /// Allocates one value, returning a reference valid for the arena's
    /// lifetime. Used directly for `ASTNode`s (`framec_syntax::Parser::node`).
    pub fn alloc(&self, value: T) -> &T {
        self.bump.alloc(value)
    }

    /// Allocates a whole slice at once from an iterator, used for the
    /// four places the parser builds a fixed-length list in one pass —
    /// a block's statements, a call's arguments, a struct's fields, an
    /// `if`'s arms, a function's parameters — rather than allocating each
    /// element separately and collecting references afterward.
    pub fn alloc_slice<I>(&self, items: I) -> &[T]
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        self.bump.alloc_slice_fill_iter(items)
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_returns_stable_references() {
        let arena: Arena<i32> = Arena::new();
        let r1 = arena.alloc(42);
        let r2 = arena.alloc(100);
        assert_eq!(*r1, 42);
        assert_eq!(*r2, 100);
    }

    #[test]
    fn references_remain_valid_after_many_allocations() {
        let arena: Arena<i32> = Arena::new();
        let refs: Vec<&i32> = (0..10000).map(|i| arena.alloc(i)).collect();
        for (i, r) in refs.iter().enumerate() {
            assert_eq!(**r, i as i32);
        }
    }

    #[test]
    fn alloc_holds_struct_values_like_an_ast_node_would() {
        #[derive(Debug, PartialEq)]
        struct Param {
            name: u32,
            ty: u32,
        }

        let arena: Arena<Param> = Arena::new();
        let p1 = arena.alloc(Param { name: 1, ty: 2 });
        let p2 = arena.alloc(Param { name: 3, ty: 4 });
        assert_eq!(p1, &Param { name: 1, ty: 2 });
        assert_eq!(p2, &Param { name: 3, ty: 4 });
    }

    #[test]
    fn alloc_slice_builds_a_fixed_length_list_in_one_pass() {
        let arena: Arena<i32> = Arena::new();
        let params = arena.alloc_slice([1, 2, 3]);
        assert_eq!(params, &[1, 2, 3]);
    }

    #[test]
    fn alloc_slice_from_an_owned_vec() {
        let arena: Arena<i32> = Arena::new();
        let args = vec![10, 20, 30];
        let slice = arena.alloc_slice(args);
        assert_eq!(slice, &[10, 20, 30]);
    }

    #[test]
    fn alloc_slice_of_zero_arguments_is_a_valid_empty_slice() {
        let arena: Arena<i32> = Arena::new();
        let empty: Vec<i32> = vec![];
        let slice = arena.alloc_slice(empty);
        assert!(slice.is_empty());
    }
}
