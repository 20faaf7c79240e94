//! Orchestrates the framec pipeline: lex and parse, resolve, emit.
//!
//! [`compile`] is the one entry point callers (the CLI, integration tests)
//! need. It owns the arena and interner for the duration of one
//! compilation, so repeated calls on the same thread never share state —
//! exercised by [`tests::two_independent_compilations_do_not_interfere`].

pub mod diagnostic;

use framec_base::{ErrorList, Interner};
use framec_sema::resolve;
use framec_syntax::{Arenas, Parser};

/// A successfully compiled module, plus whatever non-fatal warnings the
/// resolver collected along the way (currently just unreachable-statement
/// notices — see [`framec_sema::resolve`]).
#[derive(Debug)]
pub struct CompileOutput {
    pub wasm: Vec<u8>,
    pub warnings: Vec<String>,
}

/// Compiles one framec source file to a WASM binary.
///
/// Resolution only runs once parsing produced zero errors, and emission
/// only runs once resolution produced zero errors, per the pipeline's
/// short-circuit design (§7): a later pass never sees output an earlier
/// pass has already flagged as broken.
pub fn compile(source: &[u8]) -> Result<CompileOutput, ErrorList> {
    // The lexer requires a trailing NUL sentinel; callers pass plain source
    // bytes, so it is appended here rather than pushed onto every caller.
    let mut terminated = source.to_vec();
    if terminated.last() != Some(&0) {
        terminated.push(0);
    }
    let arena = Arenas::new();
    let parser = Parser::new(&terminated, &arena);
    let parsed = parser.parse_program();
    if parsed.errors.has_errors() {
        return Err(parsed.errors);
    }

    let resolved = resolve(parsed.items, parsed.types, &parsed.interner);
    if resolved.errors.has_errors() {
        return Err(resolved.errors);
    }

    let wasm = framec_codegen::emit_module(&resolved, &parsed.interner);
    Ok(CompileOutput { wasm, warnings: resolved.warnings })
}

/// What a framec program's two builtins need from whatever is running it.
///
/// The core compiler has no runtime of its own and no opinion about which
/// WASM engine executes its output; a caller that wants to actually run a
/// compiled module implements this trait against whichever host it embeds
/// (the CLI uses `wasmi`) and wires `print`/`print_bytes` to these two
/// methods plus a mutable `tstack: i32` global seeded at the top of linear
/// memory.
pub trait Host {
    /// Called for `print(v)`, where `v` is the language's uniform i64 value
    /// representation (booleans and `U8` arrive widened).
    fn print(&mut self, value: i64);

    /// Called for `print_bytes(ptr, len)` with the addressed region of
    /// linear memory already copied out.
    fn print_bytes(&mut self, bytes: &[u8]);
}

/// A [`Host`] that renders `print_bytes` as UTF-8 when possible and
/// accumulates output for tests that want to assert on it, rather than
/// writing to a stream directly.
#[derive(Default)]
pub struct RecordingHost {
    pub output: String,
}

impl Host for RecordingHost {
    fn print(&mut self, value: i64) {
        self.output.push_str(&value.to_string());
        self.output.push('\n');
    }

    fn print_bytes(&mut self, bytes: &[u8]) {
        self.output.push_str(&String::from_utf8_lossy(bytes));
        self.output.push('\n');
    }
}

pub use framec_base::{CompileError, ErrorKind, Span};
pub use framec_codegen::emit_module;
pub use framec_sema::ResolvedProgram;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_minimal_program_compiles_to_a_module_with_the_wasm_magic_number() {
        let source = b"func main() { print(1); }";
        let module = compile(source).expect("compiles");
        assert_eq!(&module.wasm[0..4], b"\0asm");
        assert!(module.warnings.is_empty());
    }

    #[test]
    fn two_independent_compilations_do_not_interfere() {
        let a = compile(b"func main() { print(1); }").expect("compiles");
        let b = compile(b"func main() { print(2); }").expect("compiles");
        assert_ne!(a.wasm, b.wasm);
    }

    #[test]
    fn a_statement_after_an_unconditional_return_produces_a_warning() {
        let output = compile(b"func main() { return; print(1); }").expect("compiles");
        assert_eq!(output.warnings.len(), 1);
    }

    #[test]
    fn an_undeclared_identifier_is_reported_as_a_name_error() {
        let source = b"func main() { print(missing); }";
        let errors = compile(source).expect_err("should fail to resolve");
        assert!(errors.iter().any(|e| e.kind == ErrorKind::Name));
    }

    #[test]
    fn recording_host_joins_prints_with_newlines() {
        let mut host = RecordingHost::default();
        host.print(1);
        host.print(2);
        assert_eq!(host.output, "1\n2\n");
    }
}
