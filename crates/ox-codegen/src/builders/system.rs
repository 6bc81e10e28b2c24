//! PPC system instruction code generation
//!
//! No-ops, barriers, cache control, special register moves and traps.
//! Barriers lower to nothing: MMIO ordering is carried by the dedicated
//! store macros, and the remaining guest fences are covered by the host
//! memory model under the conservative single-word reservation scheme.

use super::helpers::*;
use crate::context::BuilderContext;

//=============================================================================
// No-ops and Barriers
//=============================================================================

pub fn build_nop(_ctx: &mut BuilderContext) -> bool {
    true
}

pub fn build_attn(ctx: &mut BuilderContext) -> bool {
    ctx.println("\t__builtin_debugtrap();");
    true
}

pub fn build_sync(_ctx: &mut BuilderContext) -> bool {
    true
}

pub fn build_lwsync(_ctx: &mut BuilderContext) -> bool {
    true
}

pub fn build_eieio(_ctx: &mut BuilderContext) -> bool {
    true
}

pub fn build_db16cyc(_ctx: &mut BuilderContext) -> bool {
    true
}

pub fn build_cctpl(_ctx: &mut BuilderContext) -> bool {
    true
}

pub fn build_cctpm(_ctx: &mut BuilderContext) -> bool {
    true
}

//=============================================================================
// Traps
//=============================================================================

// The named trap variants all route to the generic builders, so the TO
// field and register numbers come from the raw instruction word rather
// than the simplified operand list.

fn trap_fields(ctx: &BuilderContext) -> (u32, u32, u32) {
    let word = ctx.data.first().copied().unwrap_or(0);
    let to = (word >> 21) & 0x1F;
    let ra = (word >> 16) & 0x1F;
    let rb = (word >> 11) & 0x1F;
    (to, ra, rb)
}

fn trap_immediate(ctx: &BuilderContext) -> i32 {
    let word = ctx.data.first().copied().unwrap_or(0);
    (word & 0xFFFF) as i16 as i32
}

pub fn build_twi(ctx: &mut BuilderContext) -> bool {
    let (to, ra, _) = trap_fields(ctx);
    let imm = trap_immediate(ctx);
    let a = ctx.r(ra);
    emit_trap(
        ctx,
        to,
        &format!("{a}.s32"),
        &format!("{a}.u32"),
        &format!("{imm}"),
        &format!("{}u", imm as u32),
    );
    true
}

pub fn build_tdi(ctx: &mut BuilderContext) -> bool {
    let (to, ra, _) = trap_fields(ctx);
    let imm = trap_immediate(ctx);
    let a = ctx.r(ra);
    emit_trap(
        ctx,
        to,
        &format!("{a}.s64"),
        &format!("{a}.u64"),
        &format!("{imm}"),
        &format!("{}ull", imm as i64 as u64),
    );
    true
}

pub fn build_tw(ctx: &mut BuilderContext) -> bool {
    let (to, ra, rb) = trap_fields(ctx);
    let a = ctx.r(ra);
    let b = ctx.r(rb);
    emit_trap(
        ctx,
        to,
        &format!("{a}.s32"),
        &format!("{a}.u32"),
        &format!("{b}.s32"),
        &format!("{b}.u32"),
    );
    true
}

pub fn build_td(ctx: &mut BuilderContext) -> bool {
    let (to, ra, rb) = trap_fields(ctx);
    let a = ctx.r(ra);
    let b = ctx.r(rb);
    emit_trap(
        ctx,
        to,
        &format!("{a}.s64"),
        &format!("{a}.u64"),
        &format!("{b}.s64"),
        &format!("{b}.u64"),
    );
    true
}

//=============================================================================
// Cache Operations
//=============================================================================

pub fn build_dcbf(_ctx: &mut BuilderContext) -> bool {
    true
}

pub fn build_dcbt(_ctx: &mut BuilderContext) -> bool {
    true
}

pub fn build_dcbtst(_ctx: &mut BuilderContext) -> bool {
    true
}

pub fn build_dcbst(_ctx: &mut BuilderContext) -> bool {
    true
}

pub fn build_dcbz(ctx: &mut BuilderContext) -> bool {
    let ea = ctx.ea();
    ctx.print(format!("\t{ea} = ("));
    if ctx.insn.operands[0] != 0 {
        let a = ctx.r(ctx.insn.operands[0]);
        ctx.print(format!("{a}.u32 + "));
    }
    let b = ctx.r(ctx.insn.operands[1]);
    ctx.println(format!("{b}.u32) & ~31;"));
    ctx.println(format!("\tmemset(PPC_RAW_ADDR({ea}), 0, 32);"));
    true
}

pub fn build_dcbzl(ctx: &mut BuilderContext) -> bool {
    let ea = ctx.ea();
    ctx.print(format!("\t{ea} = ("));
    if ctx.insn.operands[0] != 0 {
        let a = ctx.r(ctx.insn.operands[0]);
        ctx.print(format!("{a}.u32 + "));
    }
    let b = ctx.r(ctx.insn.operands[1]);
    ctx.println(format!("{b}.u32) & ~127;"));
    ctx.println(format!("\tmemset(PPC_RAW_ADDR({ea}), 0, 128);"));
    true
}

//=============================================================================
// Move Register
//=============================================================================

pub fn build_mr(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    let s = ctx.r(ctx.insn.operands[1]);
    ctx.println(format!("\t{d}.u64 = {s}.u64;"));
    emit_record_form_compare(ctx);

    // mr moves an MMIO base along with the value
    if ctx.locals.is_mmio_base(ctx.insn.operands[1]) {
        ctx.locals.set_mmio_base(ctx.insn.operands[0]);
    } else {
        ctx.locals.clear_mmio_base(ctx.insn.operands[0]);
    }
    true
}

//=============================================================================
// Move From Special Registers
//=============================================================================

pub fn build_mfcr(ctx: &mut BuilderContext) -> bool {
    // Pack the eight 4-bit fields into the architectural 32-bit CR image.
    for i in 0..32u32 {
        let d = ctx.r(ctx.insn.operands[0]);
        let cr = ctx.cr(i / 4);
        let bit = cr_bit_name(i % 4);
        let op = if i == 0 { "" } else { "|" };
        ctx.println(format!(
            "\t{d}.u64 {op}= {cr}.{bit} ? 0x{:X} : 0;",
            1u32 << (31 - i)
        ));
    }
    true
}

pub fn build_mfocrf(ctx: &mut BuilderContext) -> bool {
    // The whole CR image is defined for mfocrf on this CPU; reuse mfcr.
    build_mfcr(ctx)
}

pub fn build_mflr(ctx: &mut BuilderContext) -> bool {
    if !ctx.config.skip_lr {
        let d = ctx.r(ctx.insn.operands[0]);
        ctx.println(format!("\t{d}.u64 = ctx.lr;"));
    }
    true
}

pub fn build_mfmsr(ctx: &mut BuilderContext) -> bool {
    if !ctx.config.skip_msr {
        let d = ctx.r(ctx.insn.operands[0]);
        ctx.println(format!("\t{d}.u64 = ctx.msr;"));
    }
    true
}

pub fn build_mffs(ctx: &mut BuilderContext) -> bool {
    let d = ctx.f(ctx.insn.operands[0]);
    ctx.println(format!("\t{d}.u64 = ctx.fpscr.loadFromHost();"));
    true
}

pub fn build_mftb(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    ctx.println(format!("\t{d}.u64 = __rdtsc();"));
    true
}

//=============================================================================
// Move To Special Registers
//=============================================================================

pub fn build_mtcr(ctx: &mut BuilderContext) -> bool {
    for i in 0..32u32 {
        let cr = ctx.cr(i / 4);
        let bit = cr_bit_name(i % 4);
        let s = ctx.r(ctx.insn.operands[0]);
        ctx.println(format!(
            "\t{cr}.{bit} = ({s}.u32 & 0x{:X}) != 0;",
            1u32 << (31 - i)
        ));
    }
    true
}

pub fn build_mtctr(ctx: &mut BuilderContext) -> bool {
    let ctr = ctx.ctr();
    let s = ctx.r(ctx.insn.operands[0]);
    ctx.println(format!("\t{ctr}.u64 = {s}.u64;"));
    true
}

pub fn build_mtlr(ctx: &mut BuilderContext) -> bool {
    if !ctx.config.skip_lr {
        let s = ctx.r(ctx.insn.operands[0]);
        ctx.println(format!("\tctx.lr = {s}.u64;"));
    }
    true
}

pub fn build_mtmsrd(ctx: &mut BuilderContext) -> bool {
    if !ctx.config.skip_msr {
        let s = ctx.r(ctx.insn.operands[0]);
        ctx.println(format!("\tctx.msr = {s}.u64;"));
    }
    true
}

pub fn build_mtfsf(ctx: &mut BuilderContext) -> bool {
    let s = ctx.f(ctx.insn.operands[1]);
    ctx.println(format!("\tctx.fpscr.storeFromGuest({s}.u32);"));
    true
}

pub fn build_mtxer(ctx: &mut BuilderContext) -> bool {
    let xer = ctx.xer();
    let s = ctx.r(ctx.insn.operands[0]);
    ctx.println(format!("\t{xer}.so = ({s}.u64 & 0x80000000) != 0;"));
    ctx.println(format!("\t{xer}.ov = ({s}.u64 & 0x40000000) != 0;"));
    ctx.println(format!("\t{xer}.ca = ({s}.u64 & 0x20000000) != 0;"));
    true
}
