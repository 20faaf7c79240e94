//! The layout planner.
//!
//! Assigns every variable and parameter of one function to a storage class
//! (parameter slot, plain WASM local, or a byte range on the `tstack`
//! frame) and works out the WASM local indices and frame size that follow
//! from that assignment. Structs and slices always live on the frame since
//! neither fits in a single WASM value type; a scalar only moves to the
//! frame if its address is taken somewhere in the function, which the
//! resolver has already recorded in `address_taken` so this pass does not
//! need to re-walk expressions looking for `&`.

use std::collections::{HashMap, HashSet};

use framec_sema::SymbolId;
use framec_syntax::{ASTNode, NodeKind, Type, TypeId, TypeTable};
use wasm_encoder::ValType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    ParameterSlot,
    LocalSlot,
    TStackFrame,
}

#[derive(Debug, Clone, Copy)]
pub enum Address {
    /// Index of a WASM parameter or local.
    Local(u32),
    /// Byte offset from the function's frame pointer.
    Frame(u32),
}

impl Address {
    pub fn local_index(self) -> u32 {
        match self {
            Address::Local(i) => i,
            Address::Frame(_) => panic!("not a local"),
        }
    }

    pub fn frame_offset(self) -> u32 {
        match self {
            Address::Frame(o) => o,
            Address::Local(_) => panic!("not a frame slot"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LocalVar {
    pub ty: TypeId,
    pub class: StorageClass,
    pub address: Address,
}

/// The outcome of planning one function: where every variable lives, the
/// grouped WASM local declarations that must precede its body, and the
/// frame size (if any) its prologue must reserve.
pub struct LocalContext {
    vars: HashMap<SymbolId, LocalVar>,
    pub locals: Vec<(u32, ValType)>,
    pub frame_pointer_local: Option<u32>,
    pub frame_size: u32,
    /// Two spare i32 locals and one spare i64 local, reserved in every
    /// function for multi-step lowering that needs to hold intermediate
    /// values the source program gave no name to: `append`'s header
    /// read-modify-write, and a struct-typed call argument's fresh `tstack`
    /// copy address.
    pub scratch_i32: [u32; 2],
    pub scratch_i64: u32,
}

impl LocalContext {
    pub fn get(&self, symbol: SymbolId) -> LocalVar {
        *self.vars.get(&symbol).expect("planned variable")
    }
}

/// Maps a type to the WASM value type used to hold it: `I64`/`Boolean`/`U8`
/// all widen to `i64` (an 8-bit `U8` is narrowed again only at the memory
/// load/store boundary); pointers and slice headers are `i32` addresses.
pub fn wasm_value_type(types: &TypeTable, ty: TypeId) -> ValType {
    match types.get(ty) {
        Type::Pointer(_) | Type::Slice(_) => ValType::I32,
        _ => ValType::I64,
    }
}

fn collect_var_decls<'ast>(body: &'ast [&'ast ASTNode<'ast>], out: &mut Vec<&'ast ASTNode<'ast>>) {
    for &stmt in body {
        match &stmt.kind {
            NodeKind::Var { .. } => out.push(stmt),
            NodeKind::Block(inner) | NodeKind::Loop(inner) => collect_var_decls(inner, out),
            NodeKind::If { arms } => {
                for arm in arms.iter() {
                    collect_var_decls(arm.body, out);
                }
            }
            // A nested `func`/`struct` declaration plans independently; its
            // locals are not part of this function's frame.
            _ => {}
        }
    }
}

pub fn plan_function<'ast>(
    types: &TypeTable,
    param_types: &[TypeId],
    param_symbols: &[SymbolId],
    body: &'ast [&'ast ASTNode<'ast>],
    address_taken: &HashSet<SymbolId>,
) -> LocalContext {
    let mut vars = HashMap::new();

    for (i, (&ty, &symbol)) in param_types.iter().zip(param_symbols).enumerate() {
        vars.insert(
            symbol,
            LocalVar { ty, class: StorageClass::ParameterSlot, address: Address::Local(i as u32) },
        );
    }
    let param_count = param_types.len() as u32;

    let mut decls = Vec::new();
    collect_var_decls(body, &mut decls);

    struct Pending {
        symbol: SymbolId,
        ty: TypeId,
        framed: bool,
    }
    let mut pending = Vec::with_capacity(decls.len());
    for decl in &decls {
        let ty = match &decl.kind {
            NodeKind::Var { declared_type, .. } => *declared_type,
            _ => unreachable!("collect_var_decls only collects Var nodes"),
        };
        let symbol = SymbolId::from_raw(decl.symbol_id.get().expect("var declaration resolved"));
        let framed =
            matches!(types.get(ty), Type::Struct { .. } | Type::Slice(_)) || address_taken.contains(&symbol);
        pending.push(Pending { symbol, ty, framed });
    }

    let mut i32_body_locals = 0u32;
    let mut i64_body_locals = 0u32;
    let mut frame_size = 0u32;

    let local_slot_order: Vec<usize> =
        pending.iter().enumerate().filter(|(_, p)| !p.framed).map(|(i, _)| i).collect();
    let frame_order: Vec<usize> =
        pending.iter().enumerate().filter(|(_, p)| p.framed).map(|(i, _)| i).collect();

    let mut i32_indices = HashMap::new();
    for &idx in &local_slot_order {
        if wasm_value_type(types, pending[idx].ty) == ValType::I32 {
            i32_indices.insert(idx, param_count + i32_body_locals);
            i32_body_locals += 1;
        }
    }
    let frame_pointer_local = if frame_order.is_empty() { None } else { Some(param_count + i32_body_locals) };
    let scratch_i32_base = param_count + i32_body_locals + if frame_pointer_local.is_some() { 1 } else { 0 };
    let scratch_i32 = [scratch_i32_base, scratch_i32_base + 1];

    let i64_start = scratch_i32_base + 2;
    let mut i64_indices = HashMap::new();
    for &idx in &local_slot_order {
        if wasm_value_type(types, pending[idx].ty) == ValType::I64 {
            i64_indices.insert(idx, i64_start + i64_body_locals);
            i64_body_locals += 1;
        }
    }
    let scratch_i64 = i64_start + i64_body_locals;

    for &idx in &frame_order {
        let size = types.size_of(pending[idx].ty);
        let offset = frame_size;
        frame_size += size;
        let p = &pending[idx];
        vars.insert(p.symbol, LocalVar { ty: p.ty, class: StorageClass::TStackFrame, address: Address::Frame(offset) });
    }
    for &idx in &local_slot_order {
        let p = &pending[idx];
        let index = i32_indices.get(&idx).or_else(|| i64_indices.get(&idx)).copied().unwrap();
        vars.insert(p.symbol, LocalVar { ty: p.ty, class: StorageClass::LocalSlot, address: Address::Local(index) });
    }

    let mut locals = Vec::new();
    let i32_total = i32_body_locals + if frame_pointer_local.is_some() { 1 } else { 0 } + 2;
    let i64_total = i64_body_locals + 1;
    if i32_total > 0 {
        locals.push((i32_total, ValType::I32));
    }
    if i64_total > 0 {
        locals.push((i64_total, ValType::I64));
    }

    LocalContext { vars, locals, frame_pointer_local, frame_size, scratch_i32, scratch_i64 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framec_base::Symbol;
    use framec_syntax::BuiltinName;

    #[test]
    fn parameters_occupy_the_first_local_indices() {
        let mut types = TypeTable::new();
        let i64_ty = types.builtin(BuiltinName::I64);
        let symbol = SymbolId::from_raw(0);
        let ctx = plan_function(&types, &[i64_ty], &[symbol], &[], &HashSet::new());
        assert!(matches!(ctx.get(symbol).class, StorageClass::ParameterSlot));
        assert_eq!(ctx.get(symbol).address.local_index(), 0);
    }

    #[test]
    fn address_taken_scalar_moves_to_the_frame() {
        let mut types = TypeTable::new();
        let i64_ty = types.builtin(BuiltinName::I64);
        let arena: framec_base::Arena<ASTNode> = framec_base::Arena::new();
        let var = arena.alloc(ASTNode::new(
            NodeKind::Var { name: Symbol::EMPTY, declared_type: i64_ty },
            framec_base::Span::new(0, 1),
        ));
        var.symbol_id.set(Some(0));
        let symbol = SymbolId::from_raw(0);
        let mut taken = HashSet::new();
        taken.insert(symbol);
        let body: &[&ASTNode] = &[var];
        let ctx = plan_function(&types, &[], &[], body, &taken);
        assert!(matches!(ctx.get(symbol).class, StorageClass::TStackFrame));
        assert_eq!(ctx.frame_size, 8);
        assert!(ctx.frame_pointer_local.is_some());
    }
}
