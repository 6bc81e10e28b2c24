//! PPC logical instruction code generation

use super::helpers::*;
use crate::context::BuilderContext;

//=============================================================================
// AND Operations
//=============================================================================

pub fn build_and(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("\t{d}.u64 = {a}.u64 & {b}.u64;"));
    emit_record_form_compare(ctx);
    true
}

pub fn build_andc(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("\t{d}.u64 = {a}.u64 & ~{b}.u64;"));
    emit_record_form_compare(ctx);
    true
}

pub fn build_andi(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    ctx.println(format!(
        "\t{d}.u64 = {a}.u64 & {};",
        ctx.insn.operands[2]
    ));
    // ANDI. always sets CR0
    let cr0 = ctx.cr(0);
    let d = ctx.r(ctx.insn.operands[0]);
    let xer = ctx.xer();
    ctx.println(format!("\t{cr0}.compare<int32_t>({d}.s32, 0, {xer});"));
    true
}

pub fn build_andis(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    ctx.println(format!(
        "\t{d}.u64 = {a}.u64 & {};",
        ctx.insn.operands[2] << 16
    ));
    // ANDIS. always sets CR0
    let cr0 = ctx.cr(0);
    let d = ctx.r(ctx.insn.operands[0]);
    let xer = ctx.xer();
    ctx.println(format!("\t{cr0}.compare<int32_t>({d}.s32, 0, {xer});"));
    true
}

//=============================================================================
// OR Operations
//=============================================================================

pub fn build_nand(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("\t{d}.u64 = ~({a}.u64 & {b}.u64);"));
    true
}

pub fn build_nor(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("\t{d}.u64 = ~({a}.u64 | {b}.u64);"));
    true
}

pub fn build_not(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    ctx.println(format!("\t{d}.u64 = ~{a}.u64;"));
    emit_record_form_compare(ctx);
    true
}

pub fn build_or(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("\t{d}.u64 = {a}.u64 | {b}.u64;"));
    emit_record_form_compare(ctx);

    // Propagates MMIO base flag if either source register is marked MMIO,
    // covers mr rD,rS which assembles as or rD,rS,rS
    if ctx.locals.is_mmio_base(ctx.insn.operands[1])
        || ctx.locals.is_mmio_base(ctx.insn.operands[2])
    {
        ctx.locals.set_mmio_base(ctx.insn.operands[0]);
    } else {
        ctx.locals.clear_mmio_base(ctx.insn.operands[0]);
    }

    true
}

pub fn build_orc(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("\t{d}.u64 = {a}.u64 | ~{b}.u64;"));
    true
}

pub fn build_ori(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    ctx.println(format!(
        "\t{d}.u64 = {a}.u64 | {};",
        ctx.insn.operands[2]
    ));

    // ori only sets low bits - propagate MMIO base from source
    if ctx.locals.is_mmio_base(ctx.insn.operands[1]) {
        ctx.locals.set_mmio_base(ctx.insn.operands[0]);
    } else {
        ctx.locals.clear_mmio_base(ctx.insn.operands[0]);
    }

    true
}

pub fn build_oris(ctx: &mut BuilderContext) -> bool {
    let imm = ctx.insn.operands[2];
    let dest_reg = ctx.insn.operands[0];

    let d = ctx.r(dest_reg);
    let a = ctx.r(ctx.insn.operands[1]);
    ctx.println(format!("\t{d}.u64 = {a}.u64 | {};", imm << 16));

    if is_mmio_upper_bits(imm) {
        ctx.locals.set_mmio_base(dest_reg);
    }
    // Don't clear the flag here - oris may preserve MMIO base from source.

    true
}

//=============================================================================
// XOR Operations
//=============================================================================

pub fn build_xor(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("\t{d}.u64 = {a}.u64 ^ {b}.u64;"));
    emit_record_form_compare(ctx);
    ctx.locals.clear_mmio_base(ctx.insn.operands[0]);
    true
}

pub fn build_xori(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    ctx.println(format!(
        "\t{d}.u64 = {a}.u64 ^ {};",
        ctx.insn.operands[2]
    ));
    ctx.locals.clear_mmio_base(ctx.insn.operands[0]);
    true
}

pub fn build_xoris(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    ctx.println(format!(
        "\t{d}.u64 = {a}.u64 ^ {};",
        ctx.insn.operands[2] << 16
    ));
    ctx.locals.clear_mmio_base(ctx.insn.operands[0]);
    true
}

pub fn build_eqv(ctx: &mut BuilderContext) -> bool {
    // eqv: rA = ~(rS ^ rB) (XNOR - equivalent)
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("\t{d}.u64 = ~({a}.u64 ^ {b}.u64);"));
    emit_record_form_compare(ctx);
    true
}

//=============================================================================
// Count Leading Zeros
//=============================================================================

pub fn build_cntlzd(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    ctx.println(format!(
        "\t{d}.u64 = {a}.u64 == 0 ? 64 : __builtin_clzll({a}.u64);"
    ));
    true
}

pub fn build_cntlzw(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    ctx.println(format!(
        "\t{d}.u64 = {a}.u32 == 0 ? 32 : __builtin_clz({a}.u32);"
    ));
    true
}

//=============================================================================
// Sign Extension
//=============================================================================

pub fn build_extsb(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    ctx.println(format!("\t{d}.s64 = {a}.s8;"));
    emit_record_form_compare(ctx);
    true
}

pub fn build_extsh(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    ctx.println(format!("\t{d}.s64 = {a}.s16;"));
    emit_record_form_compare(ctx);
    true
}

pub fn build_extsw(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    ctx.println(format!("\t{d}.s64 = {a}.s32;"));
    emit_record_form_compare(ctx);
    true
}

//=============================================================================
// Clear Left Immediate
//=============================================================================

pub fn build_clrlwi(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    ctx.println(format!(
        "\t{d}.u64 = {a}.u32 & 0x{:X};",
        (1u64 << (32 - ctx.insn.operands[2])) - 1
    ));
    emit_record_form_compare(ctx);
    true
}

pub fn build_clrldi(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    ctx.println(format!(
        "\t{d}.u64 = {a}.u64 & 0x{:X};",
        compute_mask(ctx.insn.operands[2], 63)
    ));
    emit_record_form_compare(ctx);
    true
}

//=============================================================================
// Rotate Left Double Word
//=============================================================================

pub fn build_rldicl(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    ctx.println(format!(
        "\t{d}.u64 = __builtin_rotateleft64({a}.u64, {}) & 0x{:X};",
        ctx.insn.operands[2],
        compute_mask(ctx.insn.operands[3], 63)
    ));
    true
}

pub fn build_rldicr(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    ctx.println(format!(
        "\t{d}.u64 = __builtin_rotateleft64({a}.u64, {}) & 0x{:X};",
        ctx.insn.operands[2],
        compute_mask(0, ctx.insn.operands[3])
    ));
    true
}

pub fn build_rldimi(ctx: &mut BuilderContext) -> bool {
    let mask = compute_mask(ctx.insn.operands[3], !ctx.insn.operands[2]);
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    ctx.println(format!(
        "\t{d}.u64 = (__builtin_rotateleft64({a}.u64, {}) & 0x{:X}) | ({d}.u64 & 0x{:X});",
        ctx.insn.operands[2],
        mask,
        !mask
    ));
    true
}

pub fn build_rotldi(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    ctx.println(format!(
        "\t{d}.u64 = __builtin_rotateleft64({a}.u64, {});",
        ctx.insn.operands[2]
    ));
    true
}

//=============================================================================
// Rotate Left Word
//=============================================================================

pub fn build_rlwimi(ctx: &mut BuilderContext) -> bool {
    let mask = compute_mask(ctx.insn.operands[3] + 32, ctx.insn.operands[4] + 32);
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    ctx.println(format!(
        "\t{d}.u64 = (__builtin_rotateleft32({a}.u32, {}) & 0x{:X}) | ({d}.u64 & 0x{:X});",
        ctx.insn.operands[2],
        mask,
        !mask
    ));
    true
}

pub fn build_rlwinm(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    ctx.println(format!(
        "\t{d}.u64 = __builtin_rotateleft64({a}.u32 | ({a}.u64 << 32), {}) & 0x{:X};",
        ctx.insn.operands[2],
        compute_mask(ctx.insn.operands[3] + 32, ctx.insn.operands[4] + 32)
    ));
    emit_record_form_compare(ctx);
    true
}

pub fn build_rlwnm(ctx: &mut BuilderContext) -> bool {
    // Like rlwinm but shift amount comes from register, not immediate
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!(
        "\t{d}.u64 = __builtin_rotateleft64({a}.u32 | ({a}.u64 << 32), {b}.u8 & 0x1F) & 0x{:X};",
        compute_mask(ctx.insn.operands[3] + 32, ctx.insn.operands[4] + 32)
    ));
    emit_record_form_compare(ctx);
    true
}

pub fn build_rotlw(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!(
        "\t{d}.u64 = __builtin_rotateleft32({a}.u32, {b}.u8 & 0x1F);"
    ));
    true
}

pub fn build_rotlwi(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    ctx.println(format!(
        "\t{d}.u64 = __builtin_rotateleft32({a}.u32, {});",
        ctx.insn.operands[2]
    ));
    emit_record_form_compare(ctx);
    true
}

//=============================================================================
// Shift Left
//=============================================================================

pub fn build_sld(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!(
        "\t{d}.u64 = {b}.u8 & 0x40 ? 0 : ({a}.u64 << ({b}.u8 & 0x7F));"
    ));
    true
}

pub fn build_slw(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!(
        "\t{d}.u64 = {b}.u8 & 0x20 ? 0 : ({a}.u32 << ({b}.u8 & 0x3F));"
    ));
    emit_record_form_compare(ctx);
    true
}

//=============================================================================
// Shift Right Algebraic (signed)
//=============================================================================

pub fn build_srad(ctx: &mut BuilderContext) -> bool {
    let temp = ctx.temp();
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("\t{temp}.u64 = {b}.u64 & 0x7F;"));
    ctx.println(format!("\tif ({temp}.u64 > 0x3F) {temp}.u64 = 0x3F;"));
    let xer = ctx.xer();
    let a = ctx.r(ctx.insn.operands[1]);
    ctx.println(format!(
        "\t{xer}.ca = ({a}.s64 < 0) & ((({a}.s64 >> {temp}.u64) << {temp}.u64) != {a}.s64);"
    ));
    let d = ctx.r(ctx.insn.operands[0]);
    ctx.println(format!("\t{d}.s64 = {a}.s64 >> {temp}.u64;"));
    true
}

pub fn build_sradi(ctx: &mut BuilderContext) -> bool {
    if ctx.insn.operands[2] != 0 {
        let xer = ctx.xer();
        let a = ctx.r(ctx.insn.operands[1]);
        ctx.println(format!(
            "\t{xer}.ca = ({a}.s64 < 0) & (({a}.u64 & 0x{:X}) != 0);",
            compute_mask(64 - ctx.insn.operands[2], 63)
        ));
        let d = ctx.r(ctx.insn.operands[0]);
        ctx.println(format!(
            "\t{d}.s64 = {a}.s64 >> {};",
            ctx.insn.operands[2]
        ));
    } else {
        let xer = ctx.xer();
        ctx.println(format!("\t{xer}.ca = 0;"));
        let d = ctx.r(ctx.insn.operands[0]);
        let a = ctx.r(ctx.insn.operands[1]);
        ctx.println(format!("\t{d}.s64 = {a}.s64;"));
    }
    true
}

pub fn build_sraw(ctx: &mut BuilderContext) -> bool {
    let temp = ctx.temp();
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("\t{temp}.u32 = {b}.u32 & 0x3F;"));
    ctx.println(format!("\tif ({temp}.u32 > 0x1F) {temp}.u32 = 0x1F;"));
    let xer = ctx.xer();
    let a = ctx.r(ctx.insn.operands[1]);
    ctx.println(format!(
        "\t{xer}.ca = ({a}.s32 < 0) & ((({a}.s32 >> {temp}.u32) << {temp}.u32) != {a}.s32);"
    ));
    let d = ctx.r(ctx.insn.operands[0]);
    ctx.println(format!("\t{d}.s64 = {a}.s32 >> {temp}.u32;"));
    emit_record_form_compare(ctx);
    true
}

pub fn build_srawi(ctx: &mut BuilderContext) -> bool {
    if ctx.insn.operands[2] != 0 {
        let xer = ctx.xer();
        let a = ctx.r(ctx.insn.operands[1]);
        ctx.println(format!(
            "\t{xer}.ca = ({a}.s32 < 0) & (({a}.u32 & 0x{:X}) != 0);",
            compute_mask(64 - ctx.insn.operands[2], 63)
        ));
        let d = ctx.r(ctx.insn.operands[0]);
        ctx.println(format!(
            "\t{d}.s64 = {a}.s32 >> {};",
            ctx.insn.operands[2]
        ));
    } else {
        let xer = ctx.xer();
        ctx.println(format!("\t{xer}.ca = 0;"));
        let d = ctx.r(ctx.insn.operands[0]);
        let a = ctx.r(ctx.insn.operands[1]);
        ctx.println(format!("\t{d}.s64 = {a}.s32;"));
    }
    emit_record_form_compare(ctx);
    true
}

//=============================================================================
// Shift Right (unsigned)
//=============================================================================

pub fn build_srd(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!(
        "\t{d}.u64 = {b}.u8 & 0x40 ? 0 : ({a}.u64 >> ({b}.u8 & 0x7F));"
    ));
    true
}

pub fn build_srw(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!(
        "\t{d}.u64 = {b}.u8 & 0x20 ? 0 : ({a}.u32 >> ({b}.u8 & 0x3F));"
    ));
    emit_record_form_compare(ctx);
    true
}

//=============================================================================
// Condition Register Bit Operations
//=============================================================================

pub fn build_crand(ctx: &mut BuilderContext) -> bool {
    // crand: CR[crD] = CR[crA] & CR[crB]
    emit_cr_bit_operation(ctx, "&", false, false, false);
    true
}

pub fn build_crandc(ctx: &mut BuilderContext) -> bool {
    // crandc: CR[crD] = CR[crA] & ~CR[crB]
    emit_cr_bit_operation(ctx, "&", false, true, false);
    true
}

pub fn build_creqv(ctx: &mut BuilderContext) -> bool {
    // creqv: CR[crD] = ~(CR[crA] ^ CR[crB])
    emit_cr_bit_operation(ctx, "==", false, false, false);
    true
}

pub fn build_crnand(ctx: &mut BuilderContext) -> bool {
    // crnand: CR[crD] = ~(CR[crA] & CR[crB])
    emit_cr_bit_operation(ctx, "&", false, false, true);
    true
}

pub fn build_crnor(ctx: &mut BuilderContext) -> bool {
    // crnor: CR[crD] = ~(CR[crA] | CR[crB])
    emit_cr_bit_operation(ctx, "|", false, false, true);
    true
}

pub fn build_cror(ctx: &mut BuilderContext) -> bool {
    // cror: CR[crD] = CR[crA] | CR[crB]
    emit_cr_bit_operation(ctx, "|", false, false, false);
    true
}

pub fn build_crorc(ctx: &mut BuilderContext) -> bool {
    // crorc: CR[crD] = CR[crA] | ~CR[crB]
    emit_cr_bit_operation(ctx, "|", false, true, false);
    true
}
