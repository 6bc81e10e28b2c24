//! PPC comparison code generation
//!
//! All comparisons target the CR field named in operand 0; so always
//! mirrors XER[SO].

use crate::context::BuilderContext;

fn emit_compare_reg(ctx: &mut BuilderContext, cast: &str, field: &str) {
    let cr = ctx.cr(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    let xer = ctx.xer();
    ctx.println(format!(
        "\t{cr}.compare<{cast}>({a}.{field}, {b}.{field}, {xer});"
    ));
}

fn emit_compare_imm(ctx: &mut BuilderContext, cast: &str, field: &str, imm: String) {
    let cr = ctx.cr(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    let xer = ctx.xer();
    ctx.println(format!(
        "\t{cr}.compare<{cast}>({a}.{field}, {imm}, {xer});"
    ));
}

pub fn build_cmpd(ctx: &mut BuilderContext) -> bool {
    emit_compare_reg(ctx, "int64_t", "s64");
    true
}

pub fn build_cmpdi(ctx: &mut BuilderContext) -> bool {
    let imm = format!("{}", ctx.insn.operands[2] as i32);
    emit_compare_imm(ctx, "int64_t", "s64", imm);
    true
}

pub fn build_cmpld(ctx: &mut BuilderContext) -> bool {
    emit_compare_reg(ctx, "uint64_t", "u64");
    true
}

pub fn build_cmpldi(ctx: &mut BuilderContext) -> bool {
    let imm = format!("{}", ctx.insn.operands[2]);
    emit_compare_imm(ctx, "uint64_t", "u64", imm);
    true
}

pub fn build_cmplw(ctx: &mut BuilderContext) -> bool {
    emit_compare_reg(ctx, "uint32_t", "u32");
    true
}

pub fn build_cmplwi(ctx: &mut BuilderContext) -> bool {
    let imm = format!("{}", ctx.insn.operands[2]);
    emit_compare_imm(ctx, "uint32_t", "u32", imm);
    true
}

pub fn build_cmpw(ctx: &mut BuilderContext) -> bool {
    emit_compare_reg(ctx, "int32_t", "s32");
    true
}

pub fn build_cmpwi(ctx: &mut BuilderContext) -> bool {
    let imm = format!("{}", ctx.insn.operands[2] as i32);
    emit_compare_imm(ctx, "int32_t", "s32", imm);
    true
}
