//! PPC floating point instruction code generation
//!
//! Every FP builder drops the CSR into FPU mode first; single-precision
//! forms round through float before widening back to the double-backed
//! register.

use crate::context::BuilderContext;

//=============================================================================
// Sign Manipulation
//=============================================================================

pub fn build_fabs(ctx: &mut BuilderContext) -> bool {
    ctx.emit_set_flush_mode(false);
    let d = ctx.f(ctx.insn.operands[0]);
    let b = ctx.f(ctx.insn.operands[1]);
    ctx.println(format!(
        "\t{d}.u64 = {b}.u64 & ~0x8000000000000000;"
    ));
    true
}

pub fn build_fnabs(ctx: &mut BuilderContext) -> bool {
    ctx.emit_set_flush_mode(false);
    let d = ctx.f(ctx.insn.operands[0]);
    let b = ctx.f(ctx.insn.operands[1]);
    ctx.println(format!("\t{d}.u64 = {b}.u64 | 0x8000000000000000;"));
    true
}

pub fn build_fneg(ctx: &mut BuilderContext) -> bool {
    ctx.emit_set_flush_mode(false);
    let d = ctx.f(ctx.insn.operands[0]);
    let b = ctx.f(ctx.insn.operands[1]);
    ctx.println(format!("\t{d}.u64 = {b}.u64 ^ 0x8000000000000000;"));
    true
}

//=============================================================================
// Move and Conversion
//=============================================================================

pub fn build_fmr(ctx: &mut BuilderContext) -> bool {
    ctx.emit_set_flush_mode(false);
    let d = ctx.f(ctx.insn.operands[0]);
    let b = ctx.f(ctx.insn.operands[1]);
    ctx.println(format!("\t{d}.f64 = {b}.f64;"));
    true
}

pub fn build_fcfid(ctx: &mut BuilderContext) -> bool {
    ctx.emit_set_flush_mode(false);
    let d = ctx.f(ctx.insn.operands[0]);
    let b = ctx.f(ctx.insn.operands[1]);
    ctx.println(format!("\t{d}.f64 = double({b}.s64);"));
    true
}

pub fn build_fctid(ctx: &mut BuilderContext) -> bool {
    ctx.emit_set_flush_mode(false);
    let d = ctx.f(ctx.insn.operands[0]);
    let b = ctx.f(ctx.insn.operands[1]);
    ctx.println(format!(
        "\t{d}.s64 = ({b}.f64 > 9223372036854775807.0) ? 0x7FFFFFFFFFFFFFFF : llrint({b}.f64);"
    ));
    true
}

pub fn build_fctidz(ctx: &mut BuilderContext) -> bool {
    ctx.emit_set_flush_mode(false);
    let d = ctx.f(ctx.insn.operands[0]);
    let b = ctx.f(ctx.insn.operands[1]);
    ctx.println(format!(
        "\t{d}.s64 = ({b}.f64 > 9223372036854775807.0) ? 0x7FFFFFFFFFFFFFFF : int64_t({b}.f64);"
    ));
    true
}

pub fn build_fctiwz(ctx: &mut BuilderContext) -> bool {
    ctx.emit_set_flush_mode(false);
    let d = ctx.f(ctx.insn.operands[0]);
    let b = ctx.f(ctx.insn.operands[1]);
    ctx.println(format!(
        "\t{d}.s64 = ({b}.f64 > 2147483647.0) ? 0x7FFFFFFF : int32_t({b}.f64);"
    ));
    true
}

pub fn build_frsp(ctx: &mut BuilderContext) -> bool {
    ctx.emit_set_flush_mode(false);
    let d = ctx.f(ctx.insn.operands[0]);
    let b = ctx.f(ctx.insn.operands[1]);
    ctx.println(format!("\t{d}.f64 = double(float({b}.f64));"));
    true
}

//=============================================================================
// Comparison
//=============================================================================

pub fn build_fcmpu(ctx: &mut BuilderContext) -> bool {
    ctx.emit_set_flush_mode(false);
    let cr = ctx.cr(ctx.insn.operands[0]);
    let a = ctx.f(ctx.insn.operands[1]);
    let b = ctx.f(ctx.insn.operands[2]);
    ctx.println(format!("\t{cr}.compare({a}.f64, {b}.f64);"));
    true
}

pub fn build_fcmpo(ctx: &mut BuilderContext) -> bool {
    // Ordered compare; invalid-operand signalling is not modelled, so the
    // emitted comparison matches fcmpu.
    ctx.emit_set_flush_mode(false);
    let cr = ctx.cr(ctx.insn.operands[0]);
    let a = ctx.f(ctx.insn.operands[1]);
    let b = ctx.f(ctx.insn.operands[2]);
    ctx.println(format!("\t{cr}.compare({a}.f64, {b}.f64);"));
    true
}

//=============================================================================
// Arithmetic
//=============================================================================

fn emit_fp_binary(ctx: &mut BuilderContext, op: &str, single: bool) {
    ctx.emit_set_flush_mode(false);
    let d = ctx.f(ctx.insn.operands[0]);
    let a = ctx.f(ctx.insn.operands[1]);
    let b = ctx.f(ctx.insn.operands[2]);
    if single {
        ctx.println(format!(
            "\t{d}.f64 = double(float({a}.f64 {op} {b}.f64));"
        ));
    } else {
        ctx.println(format!("\t{d}.f64 = {a}.f64 {op} {b}.f64;"));
    }
}

pub fn build_fadd(ctx: &mut BuilderContext) -> bool {
    emit_fp_binary(ctx, "+", false);
    true
}

pub fn build_fadds(ctx: &mut BuilderContext) -> bool {
    emit_fp_binary(ctx, "+", true);
    true
}

pub fn build_fsub(ctx: &mut BuilderContext) -> bool {
    emit_fp_binary(ctx, "-", false);
    true
}

pub fn build_fsubs(ctx: &mut BuilderContext) -> bool {
    emit_fp_binary(ctx, "-", true);
    true
}

pub fn build_fmul(ctx: &mut BuilderContext) -> bool {
    emit_fp_binary(ctx, "*", false);
    true
}

pub fn build_fmuls(ctx: &mut BuilderContext) -> bool {
    emit_fp_binary(ctx, "*", true);
    true
}

pub fn build_fdiv(ctx: &mut BuilderContext) -> bool {
    emit_fp_binary(ctx, "/", false);
    true
}

pub fn build_fdivs(ctx: &mut BuilderContext) -> bool {
    emit_fp_binary(ctx, "/", true);
    true
}

//=============================================================================
// Fused Multiply-Add
//=============================================================================

// A-form operand order is (frD, frA, frC, frB): rD = ±(frA * frC ± frB).
fn emit_fp_madd(ctx: &mut BuilderContext, negate: bool, subtract: bool, single: bool) {
    ctx.emit_set_flush_mode(false);
    let d = ctx.f(ctx.insn.operands[0]);
    let a = ctx.f(ctx.insn.operands[1]);
    let c = ctx.f(ctx.insn.operands[2]);
    let b = ctx.f(ctx.insn.operands[3]);
    let op = if subtract { "-" } else { "+" };
    let mut expr = format!("{a}.f64 * {c}.f64 {op} {b}.f64");
    if negate {
        expr = format!("-({expr})");
    }
    if single {
        expr = format!("double(float({expr}))");
    }
    ctx.println(format!("\t{d}.f64 = {expr};"));
}

pub fn build_fmadd(ctx: &mut BuilderContext) -> bool {
    emit_fp_madd(ctx, false, false, false);
    true
}

pub fn build_fmadds(ctx: &mut BuilderContext) -> bool {
    emit_fp_madd(ctx, false, false, true);
    true
}

pub fn build_fmsub(ctx: &mut BuilderContext) -> bool {
    emit_fp_madd(ctx, false, true, false);
    true
}

pub fn build_fmsubs(ctx: &mut BuilderContext) -> bool {
    emit_fp_madd(ctx, false, true, true);
    true
}

pub fn build_fnmadd(ctx: &mut BuilderContext) -> bool {
    emit_fp_madd(ctx, true, false, false);
    true
}

pub fn build_fnmadds(ctx: &mut BuilderContext) -> bool {
    emit_fp_madd(ctx, true, false, true);
    true
}

pub fn build_fnmsub(ctx: &mut BuilderContext) -> bool {
    emit_fp_madd(ctx, true, true, false);
    true
}

pub fn build_fnmsubs(ctx: &mut BuilderContext) -> bool {
    emit_fp_madd(ctx, true, true, true);
    true
}

//=============================================================================
// Reciprocal and Square Root
//=============================================================================

pub fn build_fres(ctx: &mut BuilderContext) -> bool {
    ctx.emit_set_flush_mode(false);
    let d = ctx.f(ctx.insn.operands[0]);
    let b = ctx.f(ctx.insn.operands[1]);
    ctx.println(format!("\t{d}.f64 = double(float(1.0 / {b}.f64));"));
    true
}

pub fn build_frsqrte(ctx: &mut BuilderContext) -> bool {
    ctx.emit_set_flush_mode(false);
    let d = ctx.f(ctx.insn.operands[0]);
    let b = ctx.f(ctx.insn.operands[1]);
    ctx.println(format!("\t{d}.f64 = 1.0 / sqrt({b}.f64);"));
    true
}

pub fn build_fsqrt(ctx: &mut BuilderContext) -> bool {
    ctx.emit_set_flush_mode(false);
    let d = ctx.f(ctx.insn.operands[0]);
    let b = ctx.f(ctx.insn.operands[1]);
    ctx.println(format!("\t{d}.f64 = sqrt({b}.f64);"));
    true
}

pub fn build_fsqrts(ctx: &mut BuilderContext) -> bool {
    ctx.emit_set_flush_mode(false);
    let d = ctx.f(ctx.insn.operands[0]);
    let b = ctx.f(ctx.insn.operands[1]);
    ctx.println(format!("\t{d}.f64 = double(float(sqrt({b}.f64)));"));
    true
}

//=============================================================================
// Selection
//=============================================================================

pub fn build_fsel(ctx: &mut BuilderContext) -> bool {
    ctx.emit_set_flush_mode(false);
    let d = ctx.f(ctx.insn.operands[0]);
    let a = ctx.f(ctx.insn.operands[1]);
    let c = ctx.f(ctx.insn.operands[2]);
    let b = ctx.f(ctx.insn.operands[3]);
    ctx.println(format!(
        "\t{d}.f64 = {a}.f64 >= 0.0 ? {c}.f64 : {b}.f64;"
    ));
    true
}
