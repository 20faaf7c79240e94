//! Expression lowering: AST nodes to `wasm_encoder::Instruction` sequences
//! pushed onto one function's operand stack.

use std::collections::HashMap;

use framec_base::{Interner, Symbol};
use framec_sema::{FuncSig, SymbolId};
use framec_syntax::{ASTNode, BinaryOp, NodeKind, Type, TypeId, TypeTable, UnaryOp};
use wasm_encoder::{Function, Instruction, MemArg};

use crate::context::ControlFlowContext;
use crate::layout::{wasm_value_type, Address, LocalContext, StorageClass};
use crate::strings::StringPool;

pub const TSTACK_GLOBAL: u32 = 0;

fn mem_arg(offset: u32, align: u32) -> MemArg {
    MemArg { offset: offset as u64, align, memory_index: 0 }
}

fn node_key(node: &ASTNode<'_>) -> usize {
    node as *const ASTNode<'_> as usize
}

/// Everything expression and statement lowering need about the function
/// currently being emitted, bundled so call sites don't thread a dozen
/// separate arguments.
pub struct FuncEmitCtx<'a> {
    pub types: &'a TypeTable,
    pub interner: &'a Interner,
    pub functions: &'a HashMap<Symbol, FuncSig>,
    pub call_argument_order: &'a HashMap<usize, Vec<usize>>,
    pub strings: &'a mut StringPool,
    pub locals: &'a LocalContext,
    pub import_count: u32,
    pub cf: ControlFlowContext,
}

fn emit_frame_address(f: &mut Function, ctx: &FuncEmitCtx<'_>, offset: u32) {
    let fp = ctx.locals.frame_pointer_local.expect("a frame slot exists only if the frame does");
    f.instruction(&Instruction::LocalGet(fp));
    if offset != 0 {
        f.instruction(&Instruction::I32Const(offset as i32));
        f.instruction(&Instruction::I32Add);
    }
}

/// Pushes the i32 byte address of `node`'s storage. Valid for exactly the
/// nodes `ASTNode::is_addressable` accepts, plus a pointer dereference
/// (whose "address" is just its operand's value).
fn emit_address(f: &mut Function, ctx: &mut FuncEmitCtx<'_>, node: &ASTNode<'_>) {
    match &node.kind {
        NodeKind::Ident(_) => {
            let symbol = SymbolId::from_raw(node.symbol_id.get().expect("resolved ident"));
            let var = ctx.locals.get(symbol);
            match var.class {
                StorageClass::TStackFrame => emit_frame_address(f, ctx, var.address.frame_offset()),
                _ => unreachable!("a non-frame identifier is never addressable"),
            }
        }
        NodeKind::Unary { op: UnaryOp::Deref, operand } => {
            lower_expr(f, ctx, operand);
        }
        NodeKind::Dot { base, field } => {
            let base_ty = base.resolved_type.get().expect("resolved dot base");
            if matches!(ctx.types.get(base_ty), Type::Slice(_)) {
                // The only field resolution accepts on a slice is
                // `.length`, the second 8-byte header word.
                emit_address(f, ctx, base);
                f.instruction(&Instruction::I32Const(8));
                f.instruction(&Instruction::I32Add);
                return;
            }
            let struct_ty = match ctx.types.get(base_ty) {
                Type::Pointer(inner) => {
                    lower_expr(f, ctx, base);
                    *inner
                }
                Type::Struct { .. } => {
                    emit_address(f, ctx, base);
                    base_ty
                }
                _ => unreachable!("dot base is always a struct, a slice, or a pointer to a struct"),
            };
            let field_info = ctx.types.struct_field(struct_ty, *field).expect("resolved field");
            if field_info.offset != 0 {
                f.instruction(&Instruction::I32Const(field_info.offset as i32));
                f.instruction(&Instruction::I32Add);
            }
        }
        NodeKind::Index { base, index } => {
            emit_address(f, ctx, base);
            let elem_ty = match ctx.types.get(base.resolved_type.get().expect("resolved index base")) {
                Type::Slice(elem) => *elem,
                _ => unreachable!("index base is always a slice"),
            };
            let elem_size = ctx.types.size_of(elem_ty) as i64;
            lower_expr(f, ctx, index);
            f.instruction(&Instruction::I64Const(elem_size));
            f.instruction(&Instruction::I64Mul);
            f.instruction(&Instruction::I32WrapI64);
            f.instruction(&Instruction::I32Add);
        }
        _ => unreachable!("not an addressable node"),
    }
}

fn emit_typed_load(f: &mut Function, ctx: &FuncEmitCtx<'_>, ty: TypeId, offset: u32) {
    match ctx.types.get(ty) {
        Type::Builtin(framec_syntax::BuiltinName::U8) => {
            f.instruction(&Instruction::I64Load8U(mem_arg(offset, 0)));
        }
        Type::Pointer(_) | Type::Slice(_) => {
            f.instruction(&Instruction::I64Load(mem_arg(offset, 3)));
            f.instruction(&Instruction::I32WrapI64);
        }
        _ => {
            f.instruction(&Instruction::I64Load(mem_arg(offset, 3)));
        }
    }
}

fn emit_typed_store(f: &mut Function, ctx: &FuncEmitCtx<'_>, ty: TypeId, offset: u32) {
    match ctx.types.get(ty) {
        Type::Builtin(framec_syntax::BuiltinName::U8) => {
            f.instruction(&Instruction::I64Store8(mem_arg(offset, 0)));
        }
        Type::Pointer(_) => {
            f.instruction(&Instruction::I64ExtendI32S);
            f.instruction(&Instruction::I64Store(mem_arg(offset, 3)));
        }
        _ => {
            f.instruction(&Instruction::I64Store(mem_arg(offset, 3)));
        }
    }
}

fn emit_memory_copy(f: &mut Function, size: i32) {
    // Stack order for memory.copy is [dest, src, n]; callers push dest then
    // src before calling this with `size` still to push.
    f.instruction(&Instruction::I32Const(size));
    f.instruction(&Instruction::MemoryCopy { dst_mem: 0, src_mem: 0 });
}

fn lower_ident(f: &mut Function, ctx: &FuncEmitCtx<'_>, node: &ASTNode<'_>) {
    let symbol = SymbolId::from_raw(node.symbol_id.get().expect("resolved ident"));
    let var = ctx.locals.get(symbol);
    let ty = node.resolved_type.get().expect("resolved ident type");
    match var.class {
        StorageClass::LocalSlot | StorageClass::ParameterSlot => {
            f.instruction(&Instruction::LocalGet(var.address.local_index()));
        }
        StorageClass::TStackFrame => {
            if matches!(ctx.types.get(ty), Type::Struct { .. } | Type::Slice(_)) {
                emit_frame_address(f, ctx, var.address.frame_offset());
            } else {
                emit_frame_address(f, ctx, var.address.frame_offset());
                emit_typed_load(f, ctx, ty, 0);
            }
        }
    }
}

fn lower_binary(f: &mut Function, ctx: &mut FuncEmitCtx<'_>, op: BinaryOp, left: &ASTNode<'_>, right: &ASTNode<'_>) {
    if op == BinaryOp::Assign {
        lower_assign(f, ctx, left, right);
        return;
    }
    lower_expr(f, ctx, left);
    lower_expr(f, ctx, right);
    let comparison = matches!(op, BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::Lt | BinaryOp::Gt | BinaryOp::LtEq | BinaryOp::GtEq);
    let instr = match op {
        BinaryOp::Add => Instruction::I64Add,
        BinaryOp::Sub => Instruction::I64Sub,
        BinaryOp::Mul => Instruction::I64Mul,
        BinaryOp::Div => Instruction::I64DivS,
        BinaryOp::Rem => Instruction::I64RemS,
        BinaryOp::Eq => Instruction::I64Eq,
        BinaryOp::NotEq => Instruction::I64Ne,
        BinaryOp::Lt => Instruction::I64LtS,
        BinaryOp::Gt => Instruction::I64GtS,
        BinaryOp::LtEq => Instruction::I64LeS,
        BinaryOp::GtEq => Instruction::I64GeS,
        BinaryOp::Assign => unreachable!(),
    };
    f.instruction(&instr);
    if comparison {
        // Every WASM comparison produces i32; widen back to the language's
        // uniform i64 Boolean representation.
        f.instruction(&Instruction::I64ExtendI32S);
    }
}

fn lower_unary(f: &mut Function, ctx: &mut FuncEmitCtx<'_>, op: UnaryOp, operand: &ASTNode<'_>, node: &ASTNode<'_>) {
    match op {
        UnaryOp::Not => {
            lower_expr(f, ctx, operand);
            f.instruction(&Instruction::I64Eqz);
            f.instruction(&Instruction::I64ExtendI32S);
        }
        UnaryOp::Deref => {
            lower_expr(f, ctx, operand);
            let ty = node.resolved_type.get().expect("resolved deref type");
            emit_typed_load(f, ctx, ty, 0);
        }
        UnaryOp::AddressOf => {
            // Resolution rejects `&` on a non-addressable operand, so the
            // operand is always an Ident/Dot/Index reachable through
            // `emit_address`; the generic tstack-allocating form the
            // component spec describes for an arbitrary expression operand
            // is accordingly unreachable here.
            emit_address(f, ctx, operand);
        }
    }
}

fn lower_frame_store(f: &mut Function, ctx: &mut FuncEmitCtx<'_>, offset: u32, ty: TypeId, right: &ASTNode<'_>) {
    if matches!(ctx.types.get(ty), Type::Struct { .. }) {
        emit_frame_address(f, ctx, offset);
        lower_expr(f, ctx, right);
        emit_memory_copy(f, ctx.types.size_of(ty) as i32);
        return;
    }
    if matches!(ctx.types.get(ty), Type::Slice(_)) {
        if let NodeKind::String(sym) = right.kind {
            let raw = ctx.interner.resolve(sym);
            let (data_offset, len) = ctx.strings.intern(raw);
            emit_frame_address(f, ctx, offset);
            f.instruction(&Instruction::I64Const(data_offset as i64));
            f.instruction(&Instruction::I64Store(mem_arg(0, 3)));
            emit_frame_address(f, ctx, offset);
            f.instruction(&Instruction::I64Const(len as i64));
            f.instruction(&Instruction::I64Store(mem_arg(8, 3)));
        } else {
            emit_frame_address(f, ctx, offset);
            emit_address(f, ctx, right);
            emit_memory_copy(f, 16);
        }
        return;
    }
    emit_frame_address(f, ctx, offset);
    lower_expr(f, ctx, right);
    emit_typed_store(f, ctx, ty, 0);
}

fn lower_assign(f: &mut Function, ctx: &mut FuncEmitCtx<'_>, left: &ASTNode<'_>, right: &ASTNode<'_>) {
    let lty = left.resolved_type.get().expect("resolved assignment target");
    match &left.kind {
        NodeKind::Ident(_) => {
            let symbol = SymbolId::from_raw(left.symbol_id.get().expect("resolved ident"));
            let var = ctx.locals.get(symbol);
            match var.class {
                StorageClass::LocalSlot | StorageClass::ParameterSlot => {
                    lower_expr(f, ctx, right);
                    f.instruction(&Instruction::LocalSet(var.address.local_index()));
                }
                StorageClass::TStackFrame => lower_frame_store(f, ctx, var.address.frame_offset(), lty, right),
            }
        }
        NodeKind::Unary { op: UnaryOp::Deref, operand } => {
            lower_expr(f, ctx, operand);
            lower_expr(f, ctx, right);
            emit_typed_store(f, ctx, lty, 0);
        }
        NodeKind::Dot { .. } | NodeKind::Index { .. } => {
            emit_address(f, ctx, left);
            lower_expr(f, ctx, right);
            emit_typed_store(f, ctx, lty, 0);
        }
        _ => unreachable!("not an assignable target"),
    }
}

/// `print_bytes` and the slice-to-slice copy path both need a slice
/// expression's two header words as plain i32 values rather than as an
/// address; a string literal in this position never lived on the frame in
/// the first place, so it is handled directly instead of going through
/// `emit_address`.
fn lower_slice_parts(f: &mut Function, ctx: &mut FuncEmitCtx<'_>, node: &ASTNode<'_>) {
    if let NodeKind::String(sym) = node.kind {
        let raw = ctx.interner.resolve(sym);
        let (offset, len) = ctx.strings.intern(raw);
        f.instruction(&Instruction::I32Const(offset as i32));
        f.instruction(&Instruction::I32Const(len as i32));
        return;
    }
    emit_address(f, ctx, node);
    f.instruction(&Instruction::I64Load(mem_arg(0, 3)));
    f.instruction(&Instruction::I32WrapI64);
    emit_address(f, ctx, node);
    f.instruction(&Instruction::I64Load(mem_arg(8, 3)));
    f.instruction(&Instruction::I32WrapI64);
}

/// `append(slice_ptr, value)`: grows the slice behind `slice_ptr` by one
/// element, copying the existing backing buffer (if any) into a fresh
/// region at the top of `tstack` and never reclaiming the old one — the
/// quadratic-but-simple growing-array scheme this language's naive `tstack`
/// allocator is built around.
fn lower_append(f: &mut Function, ctx: &mut FuncEmitCtx<'_>, args: &[&ASTNode<'_>]) {
    let slice_ptr_arg = args[0];
    let value_arg = args[1];
    let elem_ty = match ctx.types.get(slice_ptr_arg.resolved_type.get().expect("resolved append target")) {
        Type::Pointer(inner) => match ctx.types.get(*inner) {
            Type::Slice(elem) => *elem,
            _ => unreachable!("append's first argument points to a slice"),
        },
        _ => unreachable!("append's first argument is a pointer"),
    };
    let elem_size = ctx.types.size_of(elem_ty) as i64;
    let old_ptr = ctx.locals.scratch_i32[0];
    let new_region = ctx.locals.scratch_i32[1];
    let old_len = ctx.locals.scratch_i64;

    lower_expr(f, ctx, slice_ptr_arg);
    f.instruction(&Instruction::I64Load(mem_arg(0, 3)));
    f.instruction(&Instruction::I32WrapI64);
    f.instruction(&Instruction::LocalSet(old_ptr));

    lower_expr(f, ctx, slice_ptr_arg);
    f.instruction(&Instruction::I64Load(mem_arg(8, 3)));
    f.instruction(&Instruction::LocalSet(old_len));

    f.instruction(&Instruction::GlobalGet(TSTACK_GLOBAL));
    f.instruction(&Instruction::LocalSet(new_region));
    f.instruction(&Instruction::GlobalGet(TSTACK_GLOBAL));
    f.instruction(&Instruction::LocalGet(old_len));
    f.instruction(&Instruction::I64Const(1));
    f.instruction(&Instruction::I64Add);
    f.instruction(&Instruction::I64Const(elem_size));
    f.instruction(&Instruction::I64Mul);
    f.instruction(&Instruction::I32WrapI64);
    f.instruction(&Instruction::I32Add);
    f.instruction(&Instruction::GlobalSet(TSTACK_GLOBAL));

    f.instruction(&Instruction::LocalGet(old_ptr));
    f.instruction(&Instruction::I32Eqz);
    f.instruction(&Instruction::If(wasm_encoder::BlockType::Empty));
    f.instruction(&Instruction::Else);
    f.instruction(&Instruction::LocalGet(new_region));
    f.instruction(&Instruction::LocalGet(old_ptr));
    f.instruction(&Instruction::LocalGet(old_len));
    f.instruction(&Instruction::I64Const(elem_size));
    f.instruction(&Instruction::I64Mul);
    f.instruction(&Instruction::I32WrapI64);
    f.instruction(&Instruction::MemoryCopy { dst_mem: 0, src_mem: 0 });
    f.instruction(&Instruction::End);

    f.instruction(&Instruction::LocalGet(new_region));
    f.instruction(&Instruction::LocalGet(old_len));
    f.instruction(&Instruction::I64Const(elem_size));
    f.instruction(&Instruction::I64Mul);
    f.instruction(&Instruction::I32WrapI64);
    f.instruction(&Instruction::I32Add);
    lower_expr(f, ctx, value_arg);
    emit_typed_store(f, ctx, elem_ty, 0);

    lower_expr(f, ctx, slice_ptr_arg);
    f.instruction(&Instruction::LocalGet(new_region));
    f.instruction(&Instruction::I64ExtendI32S);
    f.instruction(&Instruction::I64Store(mem_arg(0, 3)));

    lower_expr(f, ctx, slice_ptr_arg);
    f.instruction(&Instruction::LocalGet(old_len));
    f.instruction(&Instruction::I64Const(1));
    f.instruction(&Instruction::I64Add);
    f.instruction(&Instruction::I64Store(mem_arg(8, 3)));
}

const PRINT_FUNC_INDEX: u32 = 0;
const PRINT_BYTES_FUNC_INDEX: u32 = 1;

/// Struct-typed call arguments are passed by value: the callee must get its
/// own copy, not the caller's frame address, so a mutation on one side never
/// shows up on the other. Allocates `sizeof(ty)` bytes at the top of
/// `tstack`, copies the source struct in, advances `tstack` past the copy,
/// and leaves the copy's address as the pushed argument value.
fn lower_struct_argument_copy(f: &mut Function, ctx: &mut FuncEmitCtx<'_>, arg: &ASTNode<'_>, ty: TypeId) {
    let size = ctx.types.size_of(ty) as i32;
    let dest = ctx.locals.scratch_i32[0];

    f.instruction(&Instruction::GlobalGet(TSTACK_GLOBAL));
    f.instruction(&Instruction::LocalSet(dest));

    f.instruction(&Instruction::LocalGet(dest));
    emit_address(f, ctx, arg);
    emit_memory_copy(f, size);

    f.instruction(&Instruction::GlobalGet(TSTACK_GLOBAL));
    f.instruction(&Instruction::I32Const(size));
    f.instruction(&Instruction::I32Add);
    f.instruction(&Instruction::GlobalSet(TSTACK_GLOBAL));

    f.instruction(&Instruction::LocalGet(dest));
}

fn lower_call(f: &mut Function, ctx: &mut FuncEmitCtx<'_>, node: &ASTNode<'_>, callee: Symbol, args: &[&ASTNode<'_>]) {
    let name = ctx.interner.resolve(callee);
    match name {
        "print" => {
            lower_expr(f, ctx, args[0]);
            if matches!(ctx.types.get(args[0].resolved_type.get().expect("resolved print arg")), Type::Pointer(_)) {
                f.instruction(&Instruction::I64ExtendI32S);
            }
            f.instruction(&Instruction::Call(PRINT_FUNC_INDEX));
        }
        "print_bytes" => {
            lower_slice_parts(f, ctx, args[0]);
            f.instruction(&Instruction::Call(PRINT_BYTES_FUNC_INDEX));
        }
        "append" => lower_append(f, ctx, args),
        _ => {
            let sig = ctx.functions.get(&callee).expect("resolved call target").clone();
            let order = ctx
                .call_argument_order
                .get(&node_key(node))
                .cloned()
                .unwrap_or_else(|| (0..args.len()).collect());
            for &arg_index in &order {
                let arg = args[arg_index];
                let arg_ty = arg.resolved_type.get().expect("resolved call argument");
                if matches!(ctx.types.get(arg_ty), Type::Struct { .. }) {
                    lower_struct_argument_copy(f, ctx, arg, arg_ty);
                } else {
                    lower_expr(f, ctx, arg);
                }
            }
            f.instruction(&Instruction::Call(ctx.import_count + sig.declaration_index));
        }
    }
}

pub fn lower_expr(f: &mut Function, ctx: &mut FuncEmitCtx<'_>, node: &ASTNode<'_>) {
    match &node.kind {
        NodeKind::Integer(v) => {
            f.instruction(&Instruction::I64Const(*v));
        }
        NodeKind::Boolean(b) => {
            f.instruction(&Instruction::I64Const(if *b { 1 } else { 0 }));
        }
        NodeKind::String(sym) => {
            // A bare string value outside of `print_bytes`/slice-assignment
            // context only arises from unsupported slice-valued
            // expressions; fall back to its pointer half so the module
            // still assembles, matching §4.6's items-pointer definition.
            let raw = ctx.interner.resolve(*sym);
            let (offset, _) = ctx.strings.intern(raw);
            f.instruction(&Instruction::I32Const(offset as i32));
        }
        NodeKind::Ident(_) => lower_ident(f, ctx, node),
        NodeKind::Binary { op, left, right } => lower_binary(f, ctx, *op, left, right),
        NodeKind::Unary { op, operand } => lower_unary(f, ctx, *op, operand, node),
        NodeKind::Index { .. } => {
            let ty = node.resolved_type.get().expect("resolved index type");
            emit_address(f, ctx, node);
            emit_typed_load(f, ctx, ty, 0);
        }
        NodeKind::Dot { .. } => {
            let ty = node.resolved_type.get().expect("resolved dot type");
            emit_address(f, ctx, node);
            emit_typed_load(f, ctx, ty, 0);
        }
        NodeKind::Call { callee, args, .. } => lower_call(f, ctx, node, *callee, args),
        _ => unreachable!("not an expression node"),
    }
}
