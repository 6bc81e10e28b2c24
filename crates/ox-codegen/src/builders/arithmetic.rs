//! PPC integer arithmetic code generation
//!
//! Carry semantics are computed in 64-bit arithmetic, staged through the
//! temp register so the carry-in is consumed before XER[CA] is rewritten.

use super::helpers::*;
use crate::context::BuilderContext;

//=============================================================================
// Addition
//=============================================================================

pub fn build_add(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("\t{d}.u64 = {a}.u64 + {b}.u64;"));
    emit_record_form_compare(ctx);
    true
}

pub fn build_addc(ctx: &mut BuilderContext) -> bool {
    let xer = ctx.xer();
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("\t{xer}.ca = {b}.u64 > ~{a}.u64;"));
    let d = ctx.r(ctx.insn.operands[0]);
    ctx.println(format!("\t{d}.u64 = {a}.u64 + {b}.u64;"));
    emit_record_form_compare(ctx);
    true
}

pub fn build_adde(ctx: &mut BuilderContext) -> bool {
    let temp = ctx.temp();
    let xer = ctx.xer();
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("\t{temp}.u64 = {a}.u64 + {b}.u64 + {xer}.ca;"));
    ctx.println(format!(
        "\t{xer}.ca = {temp}.u64 < {a}.u64 || ({xer}.ca && {temp}.u64 == {a}.u64);"
    ));
    let d = ctx.r(ctx.insn.operands[0]);
    ctx.println(format!("\t{d}.u64 = {temp}.u64;"));
    emit_record_form_compare(ctx);
    true
}

pub fn build_addi(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    ctx.println(format!(
        "\t{d}.s64 = {a}.s64 + {};",
        ctx.insn.operands[2] as i32
    ));
    true
}

pub fn build_addic(ctx: &mut BuilderContext) -> bool {
    let imm = ctx.insn.operands[2] as i32 as i64 as u64;
    let xer = ctx.xer();
    let a = ctx.r(ctx.insn.operands[1]);
    ctx.println(format!("\t{xer}.ca = {a}.u64 > 0x{:X};", !imm));
    let d = ctx.r(ctx.insn.operands[0]);
    ctx.println(format!(
        "\t{d}.s64 = {a}.s64 + {};",
        ctx.insn.operands[2] as i32
    ));
    emit_record_form_compare(ctx);
    true
}

pub fn build_addis(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    ctx.println(format!(
        "\t{d}.s64 = {a}.s64 + {};",
        (ctx.insn.operands[2] as i32) << 16
    ));
    true
}

pub fn build_addme(ctx: &mut BuilderContext) -> bool {
    // rD = rA + CA - 1; carry out unless rA == 0 and CA == 0
    let temp = ctx.temp();
    let xer = ctx.xer();
    let a = ctx.r(ctx.insn.operands[1]);
    ctx.println(format!("\t{temp}.u64 = {a}.u64 + {xer}.ca - 1;"));
    ctx.println(format!("\t{xer}.ca = ({a}.u64 != 0) | {xer}.ca;"));
    let d = ctx.r(ctx.insn.operands[0]);
    ctx.println(format!("\t{d}.u64 = {temp}.u64;"));
    emit_record_form_compare(ctx);
    true
}

pub fn build_addze(ctx: &mut BuilderContext) -> bool {
    let temp = ctx.temp();
    let xer = ctx.xer();
    let a = ctx.r(ctx.insn.operands[1]);
    ctx.println(format!("\t{temp}.u64 = {a}.u64 + {xer}.ca;"));
    ctx.println(format!("\t{xer}.ca = {temp}.u64 < {a}.u64;"));
    let d = ctx.r(ctx.insn.operands[0]);
    ctx.println(format!("\t{d}.u64 = {temp}.u64;"));
    emit_record_form_compare(ctx);
    true
}

//=============================================================================
// Subtraction
//=============================================================================

pub fn build_subf(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("\t{d}.s64 = {b}.s64 - {a}.s64;"));
    emit_record_form_compare(ctx);
    true
}

pub fn build_subfc(ctx: &mut BuilderContext) -> bool {
    let xer = ctx.xer();
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("\t{xer}.ca = {b}.u64 >= {a}.u64;"));
    let d = ctx.r(ctx.insn.operands[0]);
    ctx.println(format!("\t{d}.s64 = {b}.s64 - {a}.s64;"));
    emit_record_form_compare(ctx);
    true
}

pub fn build_subfe(ctx: &mut BuilderContext) -> bool {
    // rD = ~rA + rB + CA
    let temp = ctx.temp();
    let xer = ctx.xer();
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("\t{temp}.u64 = ~{a}.u64 + {b}.u64 + {xer}.ca;"));
    ctx.println(format!(
        "\t{xer}.ca = {temp}.u64 < ~{a}.u64 || ({xer}.ca && {temp}.u64 == ~{a}.u64);"
    ));
    let d = ctx.r(ctx.insn.operands[0]);
    ctx.println(format!("\t{d}.u64 = {temp}.u64;"));
    emit_record_form_compare(ctx);
    true
}

pub fn build_subfic(ctx: &mut BuilderContext) -> bool {
    let imm = ctx.insn.operands[2] as i32;
    let xer = ctx.xer();
    let a = ctx.r(ctx.insn.operands[1]);
    ctx.println(format!(
        "\t{xer}.ca = {a}.u64 <= 0x{:X};",
        imm as i64 as u64
    ));
    let d = ctx.r(ctx.insn.operands[0]);
    ctx.println(format!("\t{d}.s64 = {imm} - {a}.s64;"));
    true
}

pub fn build_subfme(ctx: &mut BuilderContext) -> bool {
    // rD = ~rA + CA - 1; carry out unless ~rA == 0 and CA == 0
    let temp = ctx.temp();
    let xer = ctx.xer();
    let a = ctx.r(ctx.insn.operands[1]);
    ctx.println(format!("\t{temp}.u64 = ~{a}.u64 + {xer}.ca - 1;"));
    ctx.println(format!(
        "\t{xer}.ca = ({a}.u64 != 0xFFFFFFFFFFFFFFFF) | {xer}.ca;"
    ));
    let d = ctx.r(ctx.insn.operands[0]);
    ctx.println(format!("\t{d}.u64 = {temp}.u64;"));
    emit_record_form_compare(ctx);
    true
}

pub fn build_subfze(ctx: &mut BuilderContext) -> bool {
    let temp = ctx.temp();
    let xer = ctx.xer();
    let a = ctx.r(ctx.insn.operands[1]);
    ctx.println(format!("\t{temp}.u64 = ~{a}.u64 + {xer}.ca;"));
    ctx.println(format!("\t{xer}.ca = {temp}.u64 < ~{a}.u64;"));
    let d = ctx.r(ctx.insn.operands[0]);
    ctx.println(format!("\t{d}.u64 = {temp}.u64;"));
    emit_record_form_compare(ctx);
    true
}

//=============================================================================
// Negation
//=============================================================================

pub fn build_neg(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    ctx.println(format!("\t{d}.s64 = -{a}.s64;"));
    emit_record_form_compare(ctx);
    true
}

//=============================================================================
// Multiplication
//=============================================================================

pub fn build_mulhd(ctx: &mut BuilderContext) -> bool {
    // Record form rule is documented out for mulhd./mulhdu.: the high
    // doubleword result does not produce a CR write here.
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!(
        "\t{d}.s64 = int64_t((__int128_t({a}.s64) * __int128_t({b}.s64)) >> 64);"
    ));
    true
}

pub fn build_mulhdu(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!(
        "\t{d}.u64 = uint64_t((__uint128_t({a}.u64) * __uint128_t({b}.u64)) >> 64);"
    ));
    true
}

pub fn build_mulhw(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!(
        "\t{d}.s64 = (int64_t({a}.s32) * int64_t({b}.s32)) >> 32;"
    ));
    emit_record_form_compare(ctx);
    true
}

pub fn build_mulhwu(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!(
        "\t{d}.u64 = (uint64_t({a}.u32) * uint64_t({b}.u32)) >> 32;"
    ));
    emit_record_form_compare(ctx);
    true
}

pub fn build_mulld(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("\t{d}.s64 = {a}.s64 * {b}.s64;"));
    emit_record_form_compare(ctx);
    true
}

pub fn build_mulli(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    ctx.println(format!(
        "\t{d}.s64 = {a}.s64 * {};",
        ctx.insn.operands[2] as i32
    ));
    true
}

pub fn build_mullw(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!(
        "\t{d}.s64 = int64_t({a}.s32) * int64_t({b}.s32);"
    ));
    emit_record_form_compare(ctx);
    true
}

//=============================================================================
// Division
//=============================================================================

pub fn build_divd(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("\t{d}.s64 = {a}.s64 / {b}.s64;"));
    emit_record_form_compare(ctx);
    true
}

pub fn build_divdu(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("\t{d}.u64 = {a}.u64 / {b}.u64;"));
    emit_record_form_compare(ctx);
    true
}

pub fn build_divw(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("\t{d}.s32 = {a}.s32 / {b}.s32;"));
    emit_record_form_compare(ctx);
    true
}

pub fn build_divwu(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("\t{d}.u32 = {a}.u32 / {b}.u32;"));
    emit_record_form_compare(ctx);
    true
}
