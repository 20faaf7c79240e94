//! Module assembly: walks a resolved program's functions in declaration
//! order and produces a complete WASM binary.
//!
//! Section order follows the component's design exactly: type, import,
//! function, memory, export, code, data — there is no global section of
//! our own, since `tstack` is declared by the host and only imported here.
//! A custom name section is appended last purely for debuggability; the
//! host the module runs against never needs it.

use std::collections::HashMap;

use framec_base::Interner;
use framec_sema::ResolvedProgram;
use framec_syntax::{ASTNode, NodeKind};
use wasm_encoder::{
    CodeSection, DataSection, EntityType, ExportKind, ExportSection, Function,
    FunctionSection, GlobalType, ImportSection, MemorySection, MemoryType, Module, NameMap,
    NameSection, TypeSection, ValType,
};

use crate::context::ControlFlowContext;
use crate::expr::FuncEmitCtx;
use crate::layout::{plan_function, wasm_value_type};
use crate::stmt::lower_block;
use crate::strings::StringPool;

const IMPORT_COUNT: u32 = 2;
const MEMORY_PAGES: u64 = 1;

fn collect_functions<'ast>(stmts: &'ast [&'ast ASTNode<'ast>], out: &mut Vec<&'ast ASTNode<'ast>>) {
    for &stmt in stmts {
        if let NodeKind::Func { body, .. } = &stmt.kind {
            out.push(stmt);
            collect_functions(body, out);
            continue;
        }
        match &stmt.kind {
            NodeKind::Block(inner) | NodeKind::Loop(inner) => collect_functions(inner, out),
            NodeKind::If { arms } => {
                for arm in arms.iter() {
                    collect_functions(arm.body, out);
                }
            }
            _ => {}
        }
    }
}

/// Walks every expression reachable from a function body and interns every
/// string literal found. Run once over the whole program before any
/// function is lowered, so by the time `main`'s prologue is written every
/// literal already has a `data_index` and an assigned offset — a literal
/// used only by a function declared after `main` would otherwise still be
/// unknown when `main`'s segment-materializing instructions are emitted.
fn collect_string_literals<'ast>(node: &'ast ASTNode<'ast>, interner: &Interner, strings: &mut StringPool) {
    match &node.kind {
        NodeKind::String(sym) => {
            strings.intern(interner.resolve(*sym));
        }
        NodeKind::Binary { left, right, .. } => {
            collect_string_literals(left, interner, strings);
            collect_string_literals(right, interner, strings);
        }
        NodeKind::Unary { operand, .. } => collect_string_literals(operand, interner, strings),
        NodeKind::Call { args, .. } => {
            for &arg in args.iter() {
                collect_string_literals(arg, interner, strings);
            }
        }
        NodeKind::Index { base, index } => {
            collect_string_literals(base, interner, strings);
            collect_string_literals(index, interner, strings);
        }
        NodeKind::Dot { base, .. } => collect_string_literals(base, interner, strings),
        NodeKind::If { arms } => {
            for arm in arms.iter() {
                if let Some(cond) = arm.cond {
                    collect_string_literals(cond, interner, strings);
                }
                for &stmt in arm.body {
                    collect_string_literals(stmt, interner, strings);
                }
            }
        }
        NodeKind::Block(stmts) | NodeKind::Loop(stmts) => {
            for &stmt in stmts.iter() {
                collect_string_literals(stmt, interner, strings);
            }
        }
        NodeKind::Return(Some(value)) => collect_string_literals(value, interner, strings),
        NodeKind::Func { body, .. } => {
            for &stmt in body.iter() {
                collect_string_literals(stmt, interner, strings);
            }
        }
        _ => {}
    }
}

/// Assembles `resolved` into a binary WASM module. Panics (per the
/// component's error-handling design, an "internal error": any invariant
/// violation surviving to this point is a resolver bug, not a user-facing
/// diagnostic) if a function name resolution registered is missing from
/// the flattened AST walk, or if the program has no `main`.
pub fn emit_module(resolved: &ResolvedProgram<'_>, interner: &Interner) -> Vec<u8> {
    let mut func_nodes = Vec::new();
    collect_functions(resolved.items, &mut func_nodes);
    func_nodes.sort_by_key(|node| match &node.kind {
        NodeKind::Func { name, .. } => resolved.functions[name].declaration_index,
        _ => unreachable!(),
    });

    let mut types_section = TypeSection::new();
    types_section.ty().function([ValType::I64], []);
    types_section.ty().function([ValType::I32, ValType::I32], []);
    for node in &func_nodes {
        let name = match &node.kind {
            NodeKind::Func { name, .. } => *name,
            _ => unreachable!(),
        };
        let sig = &resolved.functions[&name];
        let return_type = sig.return_type;
        let param_tys: Vec<ValType> =
            sig.params.iter().map(|p| wasm_value_type(&resolved.types, p.ty)).collect();
        let result_tys: Vec<ValType> =
            return_type.map(|t| vec![wasm_value_type(&resolved.types, t)]).unwrap_or_default();
        types_section.ty().function(param_tys, result_tys);
    }

    let mut imports = ImportSection::new();
    imports.import("env", "print", EntityType::Function(0));
    imports.import("env", "print_bytes", EntityType::Function(1));
    imports.import("env", "tstack", EntityType::Global(GlobalType { val_type: ValType::I32, mutable: true, shared: false }));

    let mut function_section = FunctionSection::new();
    for (i, _) in func_nodes.iter().enumerate() {
        function_section.function(IMPORT_COUNT + i as u32);
    }

    let mut memory_section = MemorySection::new();
    memory_section.memory(MemoryType { minimum: MEMORY_PAGES, maximum: None, memory64: false, shared: false, page_size_log2: None });

    let main_symbol = interner.lookup("main").expect("program defines 'main'");
    let main_sig = resolved.functions.get(&main_symbol).expect("program defines 'main'");
    let mut exports = ExportSection::new();
    exports.export("main", ExportKind::Func, IMPORT_COUNT + main_sig.declaration_index);
    exports.export("memory", ExportKind::Memory, 0);

    let mut strings = StringPool::new();
    for node in &func_nodes {
        if let NodeKind::Func { body, .. } = &node.kind {
            for &stmt in body.iter() {
                collect_string_literals(stmt, interner, &mut strings);
            }
        }
    }

    let mut code_section = CodeSection::new();
    let mut name_map = NameMap::new();
    for node in &func_nodes {
        let (name, body) = match &node.kind {
            NodeKind::Func { name, body, .. } => (*name, *body),
            _ => unreachable!(),
        };
        let sig = resolved.functions.get(&name).expect("function registered during resolution").clone();
        name_map.append(IMPORT_COUNT + sig.declaration_index, interner.resolve(name));

        let param_types: Vec<_> = sig.params.iter().map(|p| p.ty).collect();
        let locals = plan_function(&resolved.types, &param_types, &sig.param_symbols, body, &resolved.address_taken);

        let mut function = Function::new(locals.locals.clone());
        if name == main_symbol {
            emit_string_segment_prologue(&mut function, strings.literals());
        }
        if locals.frame_size > 0 {
            let fp = locals.frame_pointer_local.expect("non-empty frame has a pointer local");
            emit_frame_prologue(&mut function, fp, locals.frame_size);
        }

        let mut ctx = FuncEmitCtx {
            types: &resolved.types,
            interner,
            functions: &resolved.functions,
            call_argument_order: &resolved.call_argument_order,
            strings: &mut strings,
            locals: &locals,
            import_count: IMPORT_COUNT,
            cf: ControlFlowContext::new(),
        };
        lower_block(&mut function, &mut ctx, body);
        function.instruction(&wasm_encoder::Instruction::End);
        code_section.function(&function);
    }

    let mut data_section = DataSection::new();
    for literal in strings.literals() {
        data_section.passive(literal.bytes.iter().copied());
    }

    let mut module = Module::new();
    module.section(&types_section);
    module.section(&imports);
    module.section(&function_section);
    module.section(&memory_section);
    module.section(&exports);
    module.section(&code_section);
    module.section(&data_section);

    let mut names = NameSection::new();
    names.functions(&name_map);
    module.section(&names);

    module.finish()
}

/// Reads `tstack`, stashes it in the frame-pointer local, then bumps
/// `tstack` past this function's frame. There is no matching epilogue: the
/// reservation is never returned, a known and documented leak rather than
/// an oversight (see DESIGN.md).
fn emit_frame_prologue(f: &mut Function, frame_pointer_local: u32, frame_size: u32) {
    use wasm_encoder::Instruction;
    f.instruction(&Instruction::GlobalGet(crate::expr::TSTACK_GLOBAL));
    f.instruction(&Instruction::LocalSet(frame_pointer_local));
    f.instruction(&Instruction::GlobalGet(crate::expr::TSTACK_GLOBAL));
    f.instruction(&Instruction::I32Const(frame_size as i32));
    f.instruction(&Instruction::I32Add);
    f.instruction(&Instruction::GlobalSet(crate::expr::TSTACK_GLOBAL));
}

/// Each string literal is its own passive data segment (see
/// `DataSection::passive` above) rather than being auto-materialized at
/// instantiation time, so `main` — the module's one entry point, run before
/// any other function — copies every segment to its assigned address with
/// one `memory.init` each, then `data.drop`s it: the segment's own backing
/// store is never read again once this runs.
fn emit_string_segment_prologue(f: &mut Function, literals: &[crate::strings::Literal]) {
    use wasm_encoder::Instruction;
    for (data_index, literal) in literals.iter().enumerate() {
        f.instruction(&Instruction::I32Const(literal.offset as i32));
        f.instruction(&Instruction::I32Const(0));
        f.instruction(&Instruction::I32Const(literal.bytes.len() as i32));
        f.instruction(&Instruction::MemoryInit { mem: 0, data_index: data_index as u32 });
        f.instruction(&Instruction::DataDrop(data_index as u32));
    }
}

/// Builds a lookup HashMap-shaped index over a resolved program's
/// functions by raw name, for callers (the driver, tests) that want to
/// find `main` without going through the interner by hand.
pub fn function_names(resolved: &ResolvedProgram<'_>, interner: &Interner) -> HashMap<String, u32> {
    resolved
        .functions
        .values()
        .map(|sig| (interner.resolve(sig.name).to_string(), IMPORT_COUNT + sig.declaration_index))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use framec_sema::resolve;
    use framec_syntax::{Arenas, Parser};

    fn compile(src: &str) -> Vec<u8> {
        let owned = format!("{src}\0");
        let arena: Arenas<'_> = Arenas::new();
        let parser = Parser::new(owned.as_bytes(), &arena);
        let parsed = parser.parse_program();
        assert!(!parsed.errors.has_errors(), "unexpected parse errors");
        let resolved = resolve(parsed.items, parsed.types, &parsed.interner);
        assert!(!resolved.errors.has_errors(), "unexpected resolve errors");
        emit_module(&resolved, &parsed.interner)
    }

    #[test]
    fn every_module_starts_with_the_wasm_magic_bytes_and_version() {
        let wasm = compile("func main() { print(1); }");
        assert_eq!(&wasm[0..8], &[0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn sections_appear_in_ascending_id_order_with_memory_and_main_exported() {
        let wasm = compile("func main() { print(1); }");
        let mut seen_kinds = Vec::new();
        let mut exported_names = Vec::new();
        for payload in wasmparser::Parser::new(0).parse_all(&wasm) {
            match payload.expect("valid module") {
                wasmparser::Payload::TypeSection(_) => seen_kinds.push("type"),
                wasmparser::Payload::ImportSection(_) => seen_kinds.push("import"),
                wasmparser::Payload::FunctionSection(_) => seen_kinds.push("function"),
                wasmparser::Payload::MemorySection(_) => seen_kinds.push("memory"),
                wasmparser::Payload::ExportSection(reader) => {
                    seen_kinds.push("export");
                    for export in reader {
                        exported_names.push(export.expect("valid export").name.to_string());
                    }
                }
                wasmparser::Payload::CodeSectionStart { .. } => seen_kinds.push("code"),
                wasmparser::Payload::DataSection(_) => seen_kinds.push("data"),
                wasmparser::Payload::CustomSection(_) => seen_kinds.push("custom"),
                _ => {}
            }
        }
        assert_eq!(seen_kinds, ["type", "import", "function", "memory", "export", "code", "custom"]);
        assert!(exported_names.contains(&"main".to_string()));
        assert!(exported_names.contains(&"memory".to_string()));
    }
}
