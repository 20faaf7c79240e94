//! Lowers a resolved program into a WASM binary.
//!
//! Three passes run per function: the layout planner (`layout`) assigns
//! every variable a storage class and WASM local index or frame offset,
//! statement and expression lowering (`stmt`, `expr`) walk the body against
//! that plan to emit instructions, and `emit` assembles the sections around
//! the resulting function bodies. `strings` and `context` are small pieces
//! of state threaded through expression lowering: the former interns string
//! literals into the data section, the latter tracks the `br` target depths
//! a `break`/`continue` needs.

pub mod context;
pub mod emit;
pub mod expr;
pub mod layout;
pub mod stmt;
pub mod strings;

pub use context::ControlFlowContext;
pub use emit::{emit_module, function_names};
pub use expr::{lower_expr, FuncEmitCtx, TSTACK_GLOBAL};
pub use layout::{plan_function, wasm_value_type, Address, LocalContext, LocalVar, StorageClass};
pub use stmt::{lower_block, lower_stmt};
pub use strings::StringPool;
