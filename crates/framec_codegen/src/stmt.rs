//! Statement lowering.

use framec_syntax::{ASTNode, NodeKind};
use wasm_encoder::{BlockType, Function, Instruction};

use crate::expr::{lower_expr, FuncEmitCtx};

pub fn lower_block(f: &mut Function, ctx: &mut FuncEmitCtx<'_>, body: &[&ASTNode<'_>]) {
    for stmt in body {
        lower_stmt(f, ctx, stmt);
    }
}

fn lower_if(f: &mut Function, ctx: &mut FuncEmitCtx<'_>, arms: &[framec_syntax::IfArm<'_>]) {
    // Chained `if`/`else if`/`else` lowers to nested `if`/`else` blocks, one
    // per arm with a condition; a trailing plain `else` is just the
    // innermost `else` branch. Each opened `if` needs a matching `end`,
    // counted as we go back out.
    let mut opened = 0u32;
    for arm in arms {
        match arm.cond {
            Some(cond) => {
                lower_expr(f, ctx, cond);
                f.instruction(&Instruction::I32WrapI64);
                f.instruction(&Instruction::If(BlockType::Empty));
                ctx.cf.enter_block();
                lower_block(f, ctx, arm.body);
                f.instruction(&Instruction::Else);
                opened += 1;
            }
            None => {
                lower_block(f, ctx, arm.body);
            }
        }
    }
    for _ in 0..opened {
        f.instruction(&Instruction::End);
        ctx.cf.exit_block();
    }
}

fn lower_loop(f: &mut Function, ctx: &mut FuncEmitCtx<'_>, body: &[&ASTNode<'_>]) {
    f.instruction(&Instruction::Block(BlockType::Empty));
    ctx.cf.enter_block();
    f.instruction(&Instruction::Loop(BlockType::Empty));
    ctx.cf.enter_block();
    ctx.cf.enter_loop();

    lower_block(f, ctx, body);
    // Loop back to the top by default; `break`/`continue` are the only
    // ways out, both already emitted as explicit `br`s inside the body.
    f.instruction(&Instruction::Br(0));

    ctx.cf.exit_loop();
    f.instruction(&Instruction::End);
    ctx.cf.exit_block();
    f.instruction(&Instruction::End);
    ctx.cf.exit_block();
}

pub fn lower_stmt(f: &mut Function, ctx: &mut FuncEmitCtx<'_>, node: &ASTNode<'_>) {
    match &node.kind {
        // A declaration reserves storage (the layout planner already
        // accounted for it); it emits no code of its own.
        NodeKind::Var { .. } => {}
        NodeKind::Struct { .. } => {}
        NodeKind::Func { .. } => {}
        NodeKind::Block(inner) => lower_block(f, ctx, inner),
        NodeKind::If { arms } => lower_if(f, ctx, arms),
        NodeKind::Loop(inner) => lower_loop(f, ctx, inner),
        NodeKind::Break => {
            f.instruction(&Instruction::Br(ctx.cf.break_label()));
        }
        NodeKind::Continue => {
            f.instruction(&Instruction::Br(ctx.cf.continue_label()));
        }
        NodeKind::Return(expr) => {
            if let Some(expr) = expr {
                lower_expr(f, ctx, expr);
            }
            f.instruction(&Instruction::Return);
        }
        // Any other node used as a statement is an expression statement
        // (an assignment or a call); lower it for its side effects and
        // discard whatever (if anything) it leaves on the stack. Every
        // callable usable at statement position returns either `()` (no
        // WASM result) or the language's inert void-call placeholder, so
        // nothing needs dropping here.
        _ => lower_expr(f, ctx, node),
    }
}
