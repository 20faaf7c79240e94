//! # framec-base
//!
//! Shared structural atoms for the framec compiler.
//!
//! This crate provides the foundational types every later pass builds on:
//!
//! - [`Arena`] — bump allocation for stable AST references
//! - [`Interner`]/[`Symbol`] — string interning for O(1) equality
//! - [`Span`] — byte-offset source location tracking
//! - [`CompileError`]/[`ErrorList`] — the one error representation shared by
//!   the lexer, parser, resolver and emitter
//!
//! # Design Principles
//!
//! This crate has no knowledge of the framec language's grammar or
//! semantics. It provides only generic infrastructure that the lexer,
//! parser, resolver and emitter crates build upon, so that compiling two
//! independent programs never shares mutable state.
//!
//! # Example
//!
//! ```
//! use framec_base::{Arena, Interner, Span};
//!
//! let arena: Arena<&str> = Arena::new();
//! let mut interner = Interner::new();
//!
//! let hello = interner.intern("hello");
//! let span = Span::new(0, 5);
//!
//! let allocated = arena.alloc("hello");
//! assert_eq!(*allocated, "hello");
//! ```

pub mod arena;
pub mod error;
pub mod intern;
pub mod span;

pub use arena::Arena;
pub use error::{CompileError, ErrorKind, ErrorList};
pub use intern::{Interner, Symbol};
pub use span::Span;
