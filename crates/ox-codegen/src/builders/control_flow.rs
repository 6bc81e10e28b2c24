//! PPC control flow instruction code generation

use ox_core::config::SwitchTable;

use super::helpers::*;
use crate::context::{BuilderContext, CsrState};
use crate::graph::TargetKind;

//=============================================================================
// Unconditional Branch
//=============================================================================

pub fn build_b(ctx: &mut BuilderContext) -> bool {
    let target = ctx.insn.operands[0];

    // Classify through the graph - handles thunks that branch to nearby
    // functions. Not a call, so a branch to our own base is a loop head.
    let kind = ctx.graph.classify_target(target, ctx.base, false);

    match kind {
        TargetKind::InternalLabel => {
            // Target is within this function and not another function's entry
            ctx.println(format!("\tgoto loc_{target:X};"));
        }
        TargetKind::Function | TargetKind::Import => {
            // Tail call to another function or import
            ctx.emit_function_call(target);
            ctx.println("\treturn;");
        }
        TargetKind::Unknown => {
            // Unknown target - fall back to range check
            if target >= ctx.fn_node.base() && target < ctx.fn_node.end() {
                ctx.println(format!("\tgoto loc_{target:X};"));
            } else {
                tracing::warn!(
                    target: "codegen",
                    "Unresolved b target 0x{:08X} from 0x{:08X}",
                    target,
                    ctx.base
                );
                ctx.emit_function_call(target);
                ctx.println("\treturn;");
            }
        }
    }
    true
}

pub fn build_bl(ctx: &mut BuilderContext) -> bool {
    let target = ctx.insn.operands[0];

    // Always set LR (unless skipLr)
    if !ctx.config.skip_lr {
        ctx.println(format!("\tctx.lr = 0x{:X};", ctx.base + 4));
    }

    // A call, so a branch to our own base is a recursive call.
    let kind = ctx.graph.classify_target(target, ctx.base, true);

    match kind {
        TargetKind::InternalLabel => {
            // PIC code pattern - bl to get PC into LR, treat as local jump.
            // LR is already set above, now jump to the target.
            ctx.println(format!("\tgoto loc_{target:X};"));
        }
        TargetKind::Function | TargetKind::Import => {
            ctx.emit_function_call(target);
            *ctx.csr_state = CsrState::Unknown; // Call could change CSR state
        }
        TargetKind::Unknown => {
            tracing::error!(
                target: "codegen",
                "Unresolved bl target 0x{:08X} from 0x{:08X}",
                target,
                ctx.base
            );
            ctx.println(format!("\t// ERROR: unresolved bl target 0x{target:08X}"));
            ctx.println(format!(
                "\tREX_FATAL(\"Unresolved call from 0x{:08X} to 0x{:08X}\");",
                ctx.base, target
            ));
            *ctx.validation_failed = true;
        }
    }
    true
}

pub fn build_blr(ctx: &mut BuilderContext) -> bool {
    ctx.println("\treturn;");
    true
}

pub fn build_blrl(ctx: &mut BuilderContext) -> bool {
    // Never observed in practice; leave a trap so a real occurrence is loud.
    ctx.println("__builtin_debugtrap();");
    true
}

//=============================================================================
// Count Register Branch
//=============================================================================

fn emit_switch(ctx: &mut BuilderContext, table: &SwitchTable) {
    let index = ctx.r(table.index_register);
    ctx.println(format!("\tswitch ({index}.u32) {{"));

    for (i, &label) in table.targets.iter().enumerate() {
        ctx.println(format!("\tcase {i}:"));
        if label < ctx.fn_node.base() || label >= ctx.fn_node.end() {
            tracing::error!(
                target: "codegen",
                "Jump target 0x{:08X} outside function bounds at bctr 0x{:08X}",
                label,
                ctx.base
            );
            ctx.println(format!(
                "\t\t// ERROR: jump target 0x{label:08X} outside function bounds"
            ));
            ctx.println("\t\treturn;");
            *ctx.validation_failed = true;
        } else {
            ctx.println(format!("\t\tgoto loc_{label:X};"));
        }
    }

    ctx.println("\tdefault:");
    ctx.println("\t\t__builtin_trap(); // Switch case out of range");
    ctx.println("\t}");
}

pub fn build_bctr(ctx: &mut BuilderContext) -> bool {
    // Config binding (manual override) wins, then auto-detected tables
    // attached to the function by analysis.
    let table = ctx.switch_table.cloned().or_else(|| {
        ctx.fn_node
            .jump_tables()
            .iter()
            .find(|jt| jt.address == ctx.base)
            .cloned()
    });

    if let Some(table) = table {
        emit_switch(ctx, &table);
    } else {
        // No switch table - assume tail call via CTR. If this is actually
        // an unresolved switch table the code after is unreachable; the
        // validation phase reports missing tables.
        let ctr = ctx.ctr();
        ctx.println(format!("\tPPC_CALL_INDIRECT_FUNC({ctr}.u32);"));
        ctx.println("\treturn;");
    }
    true
}

pub fn build_bctrl(ctx: &mut BuilderContext) -> bool {
    if !ctx.config.skip_lr {
        ctx.println(format!("\tctx.lr = 0x{:X};", ctx.base + 4));
    }
    let ctr = ctx.ctr();
    ctx.println(format!("\tPPC_CALL_INDIRECT_FUNC({ctr}.u32);"));
    *ctx.csr_state = CsrState::Unknown; // the call could change it
    true
}

pub fn build_bnectr(ctx: &mut BuilderContext) -> bool {
    let cr = ctx.cr(ctx.insn.operands[0]);
    ctx.println(format!("\tif (!{cr}.eq) {{"));
    let ctr = ctx.ctr();
    ctx.println(format!("\t\tPPC_CALL_INDIRECT_FUNC({ctr}.u32);"));
    ctx.println("\t\treturn;");
    ctx.println("\t}");
    true
}

//=============================================================================
// Decrement Counter and Branch
//=============================================================================

pub fn build_bdz(ctx: &mut BuilderContext) -> bool {
    let ctr = ctx.ctr();
    ctx.println(format!("\t--{ctr}.u64;"));
    let condition = format!("{ctr}.u32 == 0");
    emit_branch_with_bounds_check(ctx, ctx.insn.operands[0], &condition, "bdz");
    true
}

pub fn build_bdzlr(ctx: &mut BuilderContext) -> bool {
    let ctr = ctx.ctr();
    ctx.println(format!("\t--{ctr}.u64;"));
    ctx.println(format!("\tif ({ctr}.u32 == 0) return;"));
    true
}

pub fn build_bdnz(ctx: &mut BuilderContext) -> bool {
    let ctr = ctx.ctr();
    ctx.println(format!("\t--{ctr}.u64;"));
    let condition = format!("{ctr}.u32 != 0");
    emit_branch_with_bounds_check(ctx, ctx.insn.operands[0], &condition, "bdnz");
    true
}

pub fn build_bdnzf(ctx: &mut BuilderContext) -> bool {
    let bit = cr_bit_name(ctx.insn.operands[0]);
    let ctr = ctx.ctr();
    ctx.println(format!("\t--{ctr}.u64;"));
    let cr = ctx.cr(ctx.insn.operands[0] / 4);
    let condition = format!("{ctr}.u32 != 0 && !{cr}.{bit}");
    emit_branch_with_bounds_check(ctx, ctx.insn.operands[1], &condition, "bdnzf");
    true
}

pub fn build_bdnzt(ctx: &mut BuilderContext) -> bool {
    let bit = cr_bit_name(ctx.insn.operands[0]);
    let ctr = ctx.ctr();
    ctx.println(format!("\t--{ctr}.u64;"));
    let cr = ctx.cr(ctx.insn.operands[0] / 4);
    let condition = format!("{ctr}.u32 != 0 && {cr}.{bit}");
    emit_branch_with_bounds_check(ctx, ctx.insn.operands[1], &condition, "bdnzt");
    true
}

pub fn build_bdzf(ctx: &mut BuilderContext) -> bool {
    let bit = cr_bit_name(ctx.insn.operands[0]);
    let ctr = ctx.ctr();
    ctx.println(format!("\t--{ctr}.u64;"));
    let cr = ctx.cr(ctx.insn.operands[0] / 4);
    let condition = format!("{ctr}.u32 == 0 && !{cr}.{bit}");
    emit_branch_with_bounds_check(ctx, ctx.insn.operands[1], &condition, "bdzf");
    true
}

//=============================================================================
// Conditional Branch (eq)
//=============================================================================

pub fn build_beq(ctx: &mut BuilderContext) -> bool {
    ctx.emit_conditional_branch(false, "eq");
    true
}

pub fn build_beqlr(ctx: &mut BuilderContext) -> bool {
    let cr = ctx.cr(ctx.insn.operands[0]);
    ctx.println(format!("\tif ({cr}.eq) return;"));
    true
}

pub fn build_bne(ctx: &mut BuilderContext) -> bool {
    ctx.emit_conditional_branch(true, "eq");
    true
}

pub fn build_bnelr(ctx: &mut BuilderContext) -> bool {
    let cr = ctx.cr(ctx.insn.operands[0]);
    ctx.println(format!("\tif (!{cr}.eq) return;"));
    true
}

//=============================================================================
// Conditional Branch (lt)
//=============================================================================

pub fn build_blt(ctx: &mut BuilderContext) -> bool {
    ctx.emit_conditional_branch(false, "lt");
    true
}

pub fn build_bltlr(ctx: &mut BuilderContext) -> bool {
    let cr = ctx.cr(ctx.insn.operands[0]);
    ctx.println(format!("\tif ({cr}.lt) return;"));
    true
}

pub fn build_bge(ctx: &mut BuilderContext) -> bool {
    ctx.emit_conditional_branch(true, "lt");
    true
}

pub fn build_bgelr(ctx: &mut BuilderContext) -> bool {
    let cr = ctx.cr(ctx.insn.operands[0]);
    ctx.println(format!("\tif (!{cr}.lt) return;"));
    true
}

//=============================================================================
// Conditional Branch (gt)
//=============================================================================

pub fn build_bgt(ctx: &mut BuilderContext) -> bool {
    ctx.emit_conditional_branch(false, "gt");
    true
}

pub fn build_bgtlr(ctx: &mut BuilderContext) -> bool {
    let cr = ctx.cr(ctx.insn.operands[0]);
    ctx.println(format!("\tif ({cr}.gt) return;"));
    true
}

pub fn build_ble(ctx: &mut BuilderContext) -> bool {
    ctx.emit_conditional_branch(true, "gt");
    true
}

pub fn build_blelr(ctx: &mut BuilderContext) -> bool {
    let cr = ctx.cr(ctx.insn.operands[0]);
    ctx.println(format!("\tif (!{cr}.gt) return;"));
    true
}

//=============================================================================
// Conditional Branch (so - summary overflow / unordered)
//=============================================================================

pub fn build_bso(ctx: &mut BuilderContext) -> bool {
    ctx.emit_conditional_branch(false, "so");
    true
}

pub fn build_bsolr(ctx: &mut BuilderContext) -> bool {
    let cr = ctx.cr(ctx.insn.operands[0]);
    ctx.println(format!("\tif ({cr}.so) return;"));
    true
}

pub fn build_bns(ctx: &mut BuilderContext) -> bool {
    ctx.emit_conditional_branch(true, "so");
    true
}

pub fn build_bnslr(ctx: &mut BuilderContext) -> bool {
    let cr = ctx.cr(ctx.insn.operands[0]);
    ctx.println(format!("\tif (!{cr}.so) return;"));
    true
}
