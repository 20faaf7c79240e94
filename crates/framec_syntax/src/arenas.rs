//! The set of arenas a single compilation's AST lives in.
//!
//! [`Arena<T>`] is monomorphic, so a tree whose nodes hold references to
//! several distinct element types — nodes themselves, node-reference lists,
//! struct fields, if-arms, parameters — needs one arena per element type.
//! This bundles the ones the parser needs into a single long-lived object
//! the driver owns for the duration of a compilation.

use framec_base::Arena;

use crate::ast::{ASTNode, FieldDecl, IfArm, Param};

pub struct Arenas<'ast> {
    pub nodes: Arena<ASTNode<'ast>>,
    pub node_refs: Arena<&'ast ASTNode<'ast>>,
    pub fields: Arena<FieldDecl>,
    pub arms: Arena<IfArm<'ast>>,
    pub params: Arena<Param>,
}

impl<'ast> Arenas<'ast> {
    pub fn new() -> Self {
        Arenas {
            nodes: Arena::new(),
            node_refs: Arena::new(),
            fields: Arena::new(),
            arms: Arena::new(),
            params: Arena::new(),
        }
    }
}

impl<'ast> Default for Arenas<'ast> {
    fn default() -> Self {
        Self::new()
    }
}
