//! PPC memory instruction code generation

use super::helpers::*;
use crate::context::BuilderContext;

//=============================================================================
// Load Immediate (not really memory operations, but L* category)
//=============================================================================

pub fn build_li(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    ctx.println(format!(
        "\t{d}.s64 = {};",
        ctx.insn.operands[1] as i32
    ));
    true
}

pub fn build_lis(ctx: &mut BuilderContext) -> bool {
    let imm = ctx.insn.operands[1];
    let dest_reg = ctx.insn.operands[0];

    let d = ctx.r(dest_reg);
    ctx.println(format!("\t{d}.s64 = {};", (imm << 16) as i32));

    if is_mmio_upper_bits(imm) {
        ctx.locals.set_mmio_base(dest_reg);
    } else {
        ctx.locals.clear_mmio_base(dest_reg);
    }

    true
}

//=============================================================================
// Byte Loads
//=============================================================================

pub fn build_lbz(ctx: &mut BuilderContext) -> bool {
    ctx.emit_load_d_form("PPC_LOAD_U8", "u64");
    true
}

pub fn build_lbzu(ctx: &mut BuilderContext) -> bool {
    emit_load_with_update(ctx, "PPC_LOAD_U8");
    true
}

pub fn build_lbzx(ctx: &mut BuilderContext) -> bool {
    ctx.emit_load_x_form("PPC_LOAD_U8", "u64");
    true
}

pub fn build_lbzux(ctx: &mut BuilderContext) -> bool {
    // X-form load with update: EA = rA + rB, then rD = MEM[EA], rA = EA
    let ea = ctx.ea();
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("\t{ea} = {a}.u32 + {b}.u32;"));
    let d = ctx.r(ctx.insn.operands[0]);
    ctx.println(format!("\t{d}.u64 = PPC_LOAD_U8({ea});"));
    ctx.println(format!("\t{a}.u32 = {ea};"));
    true
}

//=============================================================================
// Halfword Loads
//=============================================================================

pub fn build_lha(ctx: &mut BuilderContext) -> bool {
    emit_sign_extend_load_d_form(ctx, "int16_t", "PPC_LOAD_U16");
    true
}

pub fn build_lhax(ctx: &mut BuilderContext) -> bool {
    emit_sign_extend_load_x_form(ctx, "int16_t", "PPC_LOAD_U16");
    true
}

pub fn build_lhz(ctx: &mut BuilderContext) -> bool {
    ctx.emit_load_d_form("PPC_LOAD_U16", "u64");
    true
}

pub fn build_lhzx(ctx: &mut BuilderContext) -> bool {
    ctx.emit_load_x_form("PPC_LOAD_U16", "u64");
    true
}

pub fn build_lhzu(ctx: &mut BuilderContext) -> bool {
    emit_load_with_update(ctx, "PPC_LOAD_U16");
    true
}

pub fn build_lhzux(ctx: &mut BuilderContext) -> bool {
    let ea = ctx.ea();
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("\t{ea} = {a}.u32 + {b}.u32;"));
    let d = ctx.r(ctx.insn.operands[0]);
    ctx.println(format!("\t{d}.u64 = PPC_LOAD_U16({ea});"));
    ctx.println(format!("\t{a}.u32 = {ea};"));
    true
}

pub fn build_lhau(ctx: &mut BuilderContext) -> bool {
    // Load Halfword Algebraic with Update: sign-extend then update rA
    let ea = ctx.ea();
    let a = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!(
        "\t{ea} = {} + {a}.u32;",
        ctx.insn.operands[1] as i32
    ));
    let d = ctx.r(ctx.insn.operands[0]);
    ctx.println(format!("\t{d}.s64 = int16_t(PPC_LOAD_U16({ea}));"));
    ctx.println(format!("\t{a}.u32 = {ea};"));
    true
}

pub fn build_lhbrx(ctx: &mut BuilderContext) -> bool {
    // Load Halfword Byte-Reverse Indexed
    let d = ctx.r(ctx.insn.operands[0]);
    ctx.print(format!("\t{d}.u64 = __builtin_bswap16(PPC_LOAD_U16("));
    if ctx.insn.operands[1] != 0 {
        let a = ctx.r(ctx.insn.operands[1]);
        ctx.print(format!("{a}.u32 + "));
    }
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("{b}.u32));"));
    true
}

//=============================================================================
// Word Loads
//=============================================================================

pub fn build_lwa(ctx: &mut BuilderContext) -> bool {
    emit_sign_extend_load_d_form(ctx, "int32_t", "PPC_LOAD_U32");
    true
}

pub fn build_lwax(ctx: &mut BuilderContext) -> bool {
    emit_sign_extend_load_x_form(ctx, "int32_t", "PPC_LOAD_U32");
    true
}

pub fn build_lwz(ctx: &mut BuilderContext) -> bool {
    ctx.emit_load_d_form("PPC_LOAD_U32", "u64");
    true
}

pub fn build_lwzu(ctx: &mut BuilderContext) -> bool {
    emit_load_with_update(ctx, "PPC_LOAD_U32");
    true
}

pub fn build_lwzx(ctx: &mut BuilderContext) -> bool {
    ctx.emit_load_x_form("PPC_LOAD_U32", "u64");
    true
}

pub fn build_lwzux(ctx: &mut BuilderContext) -> bool {
    let ea = ctx.ea();
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("\t{ea} = {a}.u32 + {b}.u32;"));
    let d = ctx.r(ctx.insn.operands[0]);
    ctx.println(format!("\t{d}.u64 = PPC_LOAD_U32({ea});"));
    ctx.println(format!("\t{a}.u32 = {ea};"));
    true
}

pub fn build_lwbrx(ctx: &mut BuilderContext) -> bool {
    let d = ctx.r(ctx.insn.operands[0]);
    ctx.print(format!("\t{d}.u64 = __builtin_bswap32(PPC_LOAD_U32("));
    if ctx.insn.operands[1] != 0 {
        let a = ctx.r(ctx.insn.operands[1]);
        ctx.print(format!("{a}.u32 + "));
    }
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("{b}.u32));"));
    true
}

//=============================================================================
// Doubleword Loads
//=============================================================================

pub fn build_ld(ctx: &mut BuilderContext) -> bool {
    ctx.emit_load_d_form("PPC_LOAD_U64", "u64");
    true
}

pub fn build_ldu(ctx: &mut BuilderContext) -> bool {
    emit_load_with_update(ctx, "PPC_LOAD_U64");
    true
}

pub fn build_ldx(ctx: &mut BuilderContext) -> bool {
    ctx.emit_load_x_form("PPC_LOAD_U64", "u64");
    true
}

pub fn build_ldux(ctx: &mut BuilderContext) -> bool {
    let ea = ctx.ea();
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("\t{ea} = {a}.u32 + {b}.u32;"));
    let d = ctx.r(ctx.insn.operands[0]);
    ctx.println(format!("\t{d}.u64 = PPC_LOAD_U64({ea});"));
    ctx.println(format!("\t{a}.u32 = {ea};"));
    true
}

//=============================================================================
// Atomic Load and Reserve
//=============================================================================

pub fn build_lwarx(ctx: &mut BuilderContext) -> bool {
    // Load directly from the raw host address backing the EA; stash the
    // pre-swap value in the per-thread reservation register.
    let ea = ctx.ea();
    ctx.print(format!("\t{ea} = "));
    if ctx.insn.operands[1] != 0 {
        let a = ctx.r(ctx.insn.operands[1]);
        ctx.print(format!("{a}.u32 + "));
    }
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("{b}.u32;"));
    let reserved = ctx.reserved();
    ctx.println(format!(
        "\t{reserved}.u32 = *(uint32_t*)PPC_RAW_ADDR({ea});"
    ));
    let d = ctx.r(ctx.insn.operands[0]);
    ctx.println(format!(
        "\t{d}.u64 = __builtin_bswap32({reserved}.u32);"
    ));
    true
}

pub fn build_ldarx(ctx: &mut BuilderContext) -> bool {
    let ea = ctx.ea();
    ctx.print(format!("\t{ea} = "));
    if ctx.insn.operands[1] != 0 {
        let a = ctx.r(ctx.insn.operands[1]);
        ctx.print(format!("{a}.u32 + "));
    }
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("{b}.u32;"));
    let reserved = ctx.reserved();
    ctx.println(format!(
        "\t{reserved}.u64 = *(uint64_t*)PPC_RAW_ADDR({ea});"
    ));
    let d = ctx.r(ctx.insn.operands[0]);
    ctx.println(format!(
        "\t{d}.u64 = __builtin_bswap64({reserved}.u64);"
    ));
    true
}

//=============================================================================
// Floating Point Loads
//=============================================================================

pub fn build_lfd(ctx: &mut BuilderContext) -> bool {
    ctx.emit_set_flush_mode(false);
    let d = ctx.f(ctx.insn.operands[0]);
    ctx.print(format!("\t{d}.u64 = PPC_LOAD_U64("));
    if ctx.insn.operands[2] != 0 {
        let a = ctx.r(ctx.insn.operands[2]);
        ctx.print(format!("{a}.u32 + "));
    }
    ctx.println(format!("{});", ctx.insn.operands[1] as i32));
    true
}

pub fn build_lfdx(ctx: &mut BuilderContext) -> bool {
    ctx.emit_set_flush_mode(false);
    let d = ctx.f(ctx.insn.operands[0]);
    ctx.print(format!("\t{d}.u64 = PPC_LOAD_U64("));
    if ctx.insn.operands[1] != 0 {
        let a = ctx.r(ctx.insn.operands[1]);
        ctx.print(format!("{a}.u32 + "));
    }
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("{b}.u32);"));
    true
}

pub fn build_lfs(ctx: &mut BuilderContext) -> bool {
    ctx.emit_set_flush_mode(false);
    let temp = ctx.temp();
    ctx.print(format!("\t{temp}.u32 = PPC_LOAD_U32("));
    if ctx.insn.operands[2] != 0 {
        let a = ctx.r(ctx.insn.operands[2]);
        ctx.print(format!("{a}.u32 + "));
    }
    ctx.println(format!("{});", ctx.insn.operands[1] as i32));
    let d = ctx.f(ctx.insn.operands[0]);
    ctx.println(format!("\t{d}.f64 = double({temp}.f32);"));
    true
}

pub fn build_lfsx(ctx: &mut BuilderContext) -> bool {
    ctx.emit_set_flush_mode(false);
    let temp = ctx.temp();
    ctx.print(format!("\t{temp}.u32 = PPC_LOAD_U32("));
    if ctx.insn.operands[1] != 0 {
        let a = ctx.r(ctx.insn.operands[1]);
        ctx.print(format!("{a}.u32 + "));
    }
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("{b}.u32);"));
    let d = ctx.f(ctx.insn.operands[0]);
    ctx.println(format!("\t{d}.f64 = double({temp}.f32);"));
    true
}

pub fn build_lfdu(ctx: &mut BuilderContext) -> bool {
    // Load Floating-point Double with Update
    ctx.emit_set_flush_mode(false);
    let ea = ctx.ea();
    let a = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!(
        "\t{ea} = {} + {a}.u32;",
        ctx.insn.operands[1] as i32
    ));
    let d = ctx.f(ctx.insn.operands[0]);
    ctx.println(format!("\t{d}.u64 = PPC_LOAD_U64({ea});"));
    ctx.println(format!("\t{a}.u32 = {ea};"));
    true
}

pub fn build_lfdux(ctx: &mut BuilderContext) -> bool {
    // Load Floating-point Double with Update Indexed
    ctx.emit_set_flush_mode(false);
    let ea = ctx.ea();
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("\t{ea} = {a}.u32 + {b}.u32;"));
    let d = ctx.f(ctx.insn.operands[0]);
    ctx.println(format!("\t{d}.u64 = PPC_LOAD_U64({ea});"));
    ctx.println(format!("\t{a}.u32 = {ea};"));
    true
}

pub fn build_lfsu(ctx: &mut BuilderContext) -> bool {
    // Load Floating-point Single with Update (convert to double)
    ctx.emit_set_flush_mode(false);
    let ea = ctx.ea();
    let a = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!(
        "\t{ea} = {} + {a}.u32;",
        ctx.insn.operands[1] as i32
    ));
    let temp = ctx.temp();
    ctx.println(format!("\t{temp}.u32 = PPC_LOAD_U32({ea});"));
    let d = ctx.f(ctx.insn.operands[0]);
    ctx.println(format!("\t{d}.f64 = double({temp}.f32);"));
    ctx.println(format!("\t{a}.u32 = {ea};"));
    true
}

pub fn build_lfsux(ctx: &mut BuilderContext) -> bool {
    // Load Floating-point Single with Update Indexed (convert to double)
    ctx.emit_set_flush_mode(false);
    let ea = ctx.ea();
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("\t{ea} = {a}.u32 + {b}.u32;"));
    let temp = ctx.temp();
    ctx.println(format!("\t{temp}.u32 = PPC_LOAD_U32({ea});"));
    let d = ctx.f(ctx.insn.operands[0]);
    ctx.println(format!("\t{d}.f64 = double({temp}.f32);"));
    ctx.println(format!("\t{a}.u32 = {ea};"));
    true
}

//=============================================================================
// Byte Stores
//=============================================================================

pub fn build_stb(ctx: &mut BuilderContext) -> bool {
    ctx.emit_store_d_form("PPC_STORE_U8", "u8", true);
    true
}

pub fn build_stbu(ctx: &mut BuilderContext) -> bool {
    emit_store_with_update(ctx, "PPC_STORE_U8", "u8");
    true
}

pub fn build_stbx(ctx: &mut BuilderContext) -> bool {
    ctx.emit_store_x_form("PPC_STORE_U8", "u8", true);
    true
}

pub fn build_stbux(ctx: &mut BuilderContext) -> bool {
    // X-form store with update: EA = rA + rB, store, then rA = EA
    let ea = ctx.ea();
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("\t{ea} = {a}.u32 + {b}.u32;"));
    let s = ctx.r(ctx.insn.operands[0]);
    ctx.println(format!("\tPPC_STORE_U8({ea}, {s}.u8);"));
    ctx.println(format!("\t{a}.u32 = {ea};"));
    true
}

//=============================================================================
// Halfword Stores
//=============================================================================

pub fn build_sth(ctx: &mut BuilderContext) -> bool {
    ctx.emit_store_d_form("PPC_STORE_U16", "u16", true);
    true
}

pub fn build_sthbrx(ctx: &mut BuilderContext) -> bool {
    let macro_name = if ctx.mmio_check_x_form() {
        "\tPPC_MM_STORE_U16("
    } else {
        "\tPPC_STORE_U16("
    };
    ctx.print(macro_name);
    if ctx.insn.operands[1] != 0 {
        let a = ctx.r(ctx.insn.operands[1]);
        ctx.print(format!("{a}.u32 + "));
    }
    let b = ctx.r(ctx.insn.operands[2]);
    let s = ctx.r(ctx.insn.operands[0]);
    ctx.println(format!("{b}.u32, __builtin_bswap16({s}.u16));"));
    true
}

pub fn build_sthx(ctx: &mut BuilderContext) -> bool {
    ctx.emit_store_x_form("PPC_STORE_U16", "u16", true);
    true
}

pub fn build_sthu(ctx: &mut BuilderContext) -> bool {
    emit_store_with_update(ctx, "PPC_STORE_U16", "u16");
    true
}

pub fn build_sthux(ctx: &mut BuilderContext) -> bool {
    let ea = ctx.ea();
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("\t{ea} = {a}.u32 + {b}.u32;"));
    let s = ctx.r(ctx.insn.operands[0]);
    ctx.println(format!("\tPPC_STORE_U16({ea}, {s}.u16);"));
    ctx.println(format!("\t{a}.u32 = {ea};"));
    true
}

//=============================================================================
// Word Stores
//=============================================================================

pub fn build_stw(ctx: &mut BuilderContext) -> bool {
    ctx.emit_store_d_form("PPC_STORE_U32", "u32", true);
    true
}

pub fn build_stwu(ctx: &mut BuilderContext) -> bool {
    emit_store_with_update(ctx, "PPC_STORE_U32", "u32");
    true
}

pub fn build_stwux(ctx: &mut BuilderContext) -> bool {
    let ea = ctx.ea();
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("\t{ea} = {a}.u32 + {b}.u32;"));
    let s = ctx.r(ctx.insn.operands[0]);
    ctx.println(format!("\tPPC_STORE_U32({ea}, {s}.u32);"));
    ctx.println(format!("\t{a}.u32 = {ea};"));
    true
}

pub fn build_stwx(ctx: &mut BuilderContext) -> bool {
    ctx.emit_store_x_form("PPC_STORE_U32", "u32", true);
    true
}

pub fn build_stwbrx(ctx: &mut BuilderContext) -> bool {
    let macro_name = if ctx.mmio_check_x_form() {
        "\tPPC_MM_STORE_U32("
    } else {
        "\tPPC_STORE_U32("
    };
    ctx.print(macro_name);
    if ctx.insn.operands[1] != 0 {
        let a = ctx.r(ctx.insn.operands[1]);
        ctx.print(format!("{a}.u32 + "));
    }
    let b = ctx.r(ctx.insn.operands[2]);
    let s = ctx.r(ctx.insn.operands[0]);
    ctx.println(format!("{b}.u32, __builtin_bswap32({s}.u32));"));
    true
}

//=============================================================================
// Atomic Store Conditional
//=============================================================================

pub fn build_stwcx(ctx: &mut BuilderContext) -> bool {
    // Compare-and-swap against the per-thread reservation; cr0.eq reports
    // the CAS result, lt/gt cleared, so mirrors XER[SO].
    let ea = ctx.ea();
    ctx.print(format!("\t{ea} = "));
    if ctx.insn.operands[1] != 0 {
        let a = ctx.r(ctx.insn.operands[1]);
        ctx.print(format!("{a}.u32 + "));
    }
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("{b}.u32;"));
    let cr0 = ctx.cr(0);
    ctx.println(format!("\t{cr0}.lt = 0;"));
    ctx.println(format!("\t{cr0}.gt = 0;"));
    let reserved = ctx.reserved();
    let s = ctx.r(ctx.insn.operands[0]);
    ctx.println(format!(
        "\t{cr0}.eq = __sync_bool_compare_and_swap(reinterpret_cast<uint32_t*>(PPC_RAW_ADDR({ea})), {reserved}.s32, __builtin_bswap32({s}.s32));"
    ));
    let xer = ctx.xer();
    ctx.println(format!("\t{cr0}.so = {xer}.so;"));
    true
}

pub fn build_stdcx(ctx: &mut BuilderContext) -> bool {
    let ea = ctx.ea();
    ctx.print(format!("\t{ea} = "));
    if ctx.insn.operands[1] != 0 {
        let a = ctx.r(ctx.insn.operands[1]);
        ctx.print(format!("{a}.u32 + "));
    }
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("{b}.u32;"));
    let cr0 = ctx.cr(0);
    ctx.println(format!("\t{cr0}.lt = 0;"));
    ctx.println(format!("\t{cr0}.gt = 0;"));
    let reserved = ctx.reserved();
    let s = ctx.r(ctx.insn.operands[0]);
    ctx.println(format!(
        "\t{cr0}.eq = __sync_bool_compare_and_swap(reinterpret_cast<uint64_t*>(PPC_RAW_ADDR({ea})), {reserved}.s64, __builtin_bswap64({s}.s64));"
    ));
    let xer = ctx.xer();
    ctx.println(format!("\t{cr0}.so = {xer}.so;"));
    true
}

//=============================================================================
// Doubleword Stores
//=============================================================================

pub fn build_std(ctx: &mut BuilderContext) -> bool {
    ctx.emit_store_d_form("PPC_STORE_U64", "u64", true);
    true
}

pub fn build_stdu(ctx: &mut BuilderContext) -> bool {
    let ea = ctx.ea();
    let a = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!(
        "\t{ea} = {} + {a}.u32;",
        ctx.insn.operands[1] as i32
    ));
    let s = ctx.r(ctx.insn.operands[0]);
    ctx.println(format!("\tPPC_STORE_U64({ea}, {s}.u64);"));
    ctx.println(format!("\t{a}.u32 = {ea};"));
    true
}

pub fn build_stdx(ctx: &mut BuilderContext) -> bool {
    ctx.emit_store_x_form("PPC_STORE_U64", "u64", true);
    true
}

pub fn build_stdux(ctx: &mut BuilderContext) -> bool {
    let ea = ctx.ea();
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("\t{ea} = {a}.u32 + {b}.u32;"));
    let s = ctx.r(ctx.insn.operands[0]);
    ctx.println(format!("\tPPC_STORE_U64({ea}, {s}.u64);"));
    ctx.println(format!("\t{a}.u32 = {ea};"));
    true
}

//=============================================================================
// Floating Point Stores
//=============================================================================

pub fn build_stfd(ctx: &mut BuilderContext) -> bool {
    ctx.emit_set_flush_mode(false);
    let macro_name = if ctx.mmio_check_d_form() {
        "\tPPC_MM_STORE_U64("
    } else {
        "\tPPC_STORE_U64("
    };
    ctx.print(macro_name);
    if ctx.insn.operands[2] != 0 {
        let a = ctx.r(ctx.insn.operands[2]);
        ctx.print(format!("{a}.u32 + "));
    }
    let s = ctx.f(ctx.insn.operands[0]);
    ctx.println(format!("{}, {s}.u64);", ctx.insn.operands[1] as i32));
    true
}

pub fn build_stfdx(ctx: &mut BuilderContext) -> bool {
    ctx.emit_set_flush_mode(false);
    let macro_name = if ctx.mmio_check_x_form() {
        "\tPPC_MM_STORE_U64("
    } else {
        "\tPPC_STORE_U64("
    };
    ctx.print(macro_name);
    if ctx.insn.operands[1] != 0 {
        let a = ctx.r(ctx.insn.operands[1]);
        ctx.print(format!("{a}.u32 + "));
    }
    let b = ctx.r(ctx.insn.operands[2]);
    let s = ctx.f(ctx.insn.operands[0]);
    ctx.println(format!("{b}.u32, {s}.u64);"));
    true
}

pub fn build_stfiwx(ctx: &mut BuilderContext) -> bool {
    ctx.emit_set_flush_mode(false);
    let macro_name = if ctx.mmio_check_x_form() {
        "\tPPC_MM_STORE_U32("
    } else {
        "\tPPC_STORE_U32("
    };
    ctx.print(macro_name);
    if ctx.insn.operands[1] != 0 {
        let a = ctx.r(ctx.insn.operands[1]);
        ctx.print(format!("{a}.u32 + "));
    }
    let b = ctx.r(ctx.insn.operands[2]);
    let s = ctx.f(ctx.insn.operands[0]);
    ctx.println(format!("{b}.u32, {s}.u32);"));
    true
}

pub fn build_stfs(ctx: &mut BuilderContext) -> bool {
    ctx.emit_set_flush_mode(false);
    let temp = ctx.temp();
    let s = ctx.f(ctx.insn.operands[0]);
    ctx.println(format!("\t{temp}.f32 = float({s}.f64);"));
    let macro_name = if ctx.mmio_check_d_form() {
        "\tPPC_MM_STORE_U32("
    } else {
        "\tPPC_STORE_U32("
    };
    ctx.print(macro_name);
    if ctx.insn.operands[2] != 0 {
        let a = ctx.r(ctx.insn.operands[2]);
        ctx.print(format!("{a}.u32 + "));
    }
    ctx.println(format!(
        "{}, {temp}.u32);",
        ctx.insn.operands[1] as i32
    ));
    true
}

pub fn build_stfsx(ctx: &mut BuilderContext) -> bool {
    ctx.emit_set_flush_mode(false);
    let temp = ctx.temp();
    let s = ctx.f(ctx.insn.operands[0]);
    ctx.println(format!("\t{temp}.f32 = float({s}.f64);"));
    let macro_name = if ctx.mmio_check_x_form() {
        "\tPPC_MM_STORE_U32("
    } else {
        "\tPPC_STORE_U32("
    };
    ctx.print(macro_name);
    if ctx.insn.operands[1] != 0 {
        let a = ctx.r(ctx.insn.operands[1]);
        ctx.print(format!("{a}.u32 + "));
    }
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("{b}.u32, {temp}.u32);"));
    true
}

pub fn build_stfdu(ctx: &mut BuilderContext) -> bool {
    // Store Floating-point Double with Update
    ctx.emit_set_flush_mode(false);
    let ea = ctx.ea();
    let a = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!(
        "\t{ea} = {} + {a}.u32;",
        ctx.insn.operands[1] as i32
    ));
    let s = ctx.f(ctx.insn.operands[0]);
    ctx.println(format!("\tPPC_STORE_U64({ea}, {s}.u64);"));
    ctx.println(format!("\t{a}.u32 = {ea};"));
    true
}

pub fn build_stfsu(ctx: &mut BuilderContext) -> bool {
    // Store Floating-point Single with Update (convert double to float first)
    ctx.emit_set_flush_mode(false);
    let ea = ctx.ea();
    let a = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!(
        "\t{ea} = {} + {a}.u32;",
        ctx.insn.operands[1] as i32
    ));
    let temp = ctx.temp();
    let s = ctx.f(ctx.insn.operands[0]);
    ctx.println(format!("\t{temp}.f32 = float({s}.f64);"));
    ctx.println(format!("\tPPC_STORE_U32({ea}, {temp}.u32);"));
    ctx.println(format!("\t{a}.u32 = {ea};"));
    true
}

pub fn build_stfsux(ctx: &mut BuilderContext) -> bool {
    ctx.emit_set_flush_mode(false);
    let ea = ctx.ea();
    let a = ctx.r(ctx.insn.operands[1]);
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("\t{ea} = {a}.u32 + {b}.u32;"));
    let temp = ctx.temp();
    let s = ctx.f(ctx.insn.operands[0]);
    ctx.println(format!("\t{temp}.f32 = float({s}.f64);"));
    ctx.println(format!("\tPPC_STORE_U32({ea}, {temp}.u32);"));
    ctx.println(format!("\t{a}.u32 = {ea};"));
    true
}

//=============================================================================
// Vector Loads
//=============================================================================

pub fn build_lvx(ctx: &mut BuilderContext) -> bool {
    // For endian swapping the whole vector is reversed instead of
    // individual elements; every vector builder accounts for this
    // (eg. dot products sum yzw instead of xyz).
    emit_vector_ea(ctx, Some("0xF"));
    let d = ctx.v(ctx.insn.operands[0]);
    let ea = ctx.ea();
    ctx.println(format!(
        "\tsimde_mm_store_si128((simde__m128i*){d}.u8, simde_mm_shuffle_epi8(simde_mm_load_si128((simde__m128i*)PPC_RAW_ADDR({ea})), simde_mm_load_si128((simde__m128i*)VectorMaskL)));"
    ));
    true
}

pub fn build_lvlx(ctx: &mut BuilderContext) -> bool {
    emit_vector_temp_ea(ctx);
    let d = ctx.v(ctx.insn.operands[0]);
    let temp = ctx.temp();
    ctx.println(format!(
        "\tsimde_mm_store_si128((simde__m128i*){d}.u8, simde_mm_shuffle_epi8(simde_mm_load_si128((simde__m128i*)PPC_RAW_ADDR({temp}.u32 & ~0xF)), simde_mm_load_si128((simde__m128i*)&VectorMaskL[({temp}.u32 & 0xF) * 16])));"
    ));
    true
}

pub fn build_lvrx(ctx: &mut BuilderContext) -> bool {
    emit_vector_temp_ea(ctx);
    let d = ctx.v(ctx.insn.operands[0]);
    let temp = ctx.temp();
    ctx.println(format!(
        "\tsimde_mm_store_si128((simde__m128i*){d}.u8, {temp}.u32 & 0xF ? simde_mm_shuffle_epi8(simde_mm_load_si128((simde__m128i*)PPC_RAW_ADDR({temp}.u32 & ~0xF)), simde_mm_load_si128((simde__m128i*)&VectorMaskR[({temp}.u32 & 0xF) * 16])) : simde_mm_setzero_si128());"
    ));
    true
}

pub fn build_lvsl(ctx: &mut BuilderContext) -> bool {
    emit_vector_temp_ea(ctx);
    let d = ctx.v(ctx.insn.operands[0]);
    let temp = ctx.temp();
    ctx.println(format!(
        "\tsimde_mm_store_si128((simde__m128i*){d}.u8, simde_mm_load_si128((simde__m128i*)&VectorShiftTableL[({temp}.u32 & 0xF) * 16]));"
    ));
    true
}

pub fn build_lvsr(ctx: &mut BuilderContext) -> bool {
    emit_vector_temp_ea(ctx);
    let d = ctx.v(ctx.insn.operands[0]);
    let temp = ctx.temp();
    ctx.println(format!(
        "\tsimde_mm_store_si128((simde__m128i*){d}.u8, simde_mm_load_si128((simde__m128i*)&VectorShiftTableR[({temp}.u32 & 0xF) * 16]));"
    ));
    true
}

//=============================================================================
// Vector Stores
//=============================================================================

pub fn build_stvehx(ctx: &mut BuilderContext) -> bool {
    // Element index accounts for the full vector reversal.
    emit_vector_ea(ctx, Some("0x1"));
    let s = ctx.v(ctx.insn.operands[0]);
    let ea = ctx.ea();
    ctx.println(format!(
        "\tPPC_STORE_U16(ea, {s}.u16[7 - (({ea} & 0xF) >> 1)]);"
    ));
    true
}

pub fn build_stvewx(ctx: &mut BuilderContext) -> bool {
    emit_vector_ea(ctx, Some("0x3"));
    let s = ctx.v(ctx.insn.operands[0]);
    let ea = ctx.ea();
    ctx.println(format!(
        "\tPPC_STORE_U32(ea, {s}.u32[3 - (({ea} & 0xF) >> 2)]);"
    ));
    true
}

pub fn build_stvlx(ctx: &mut BuilderContext) -> bool {
    emit_vector_ea(ctx, None);
    let ea = ctx.ea();
    let s = ctx.v(ctx.insn.operands[0]);
    ctx.println(format!("\tfor (size_t i = 0; i < (16 - ({ea} & 0xF)); i++)"));
    ctx.println(format!("\t\tPPC_STORE_U8({ea} + i, {s}.u8[15 - i]);"));
    true
}

pub fn build_stvrx(ctx: &mut BuilderContext) -> bool {
    emit_vector_ea(ctx, None);
    let ea = ctx.ea();
    let s = ctx.v(ctx.insn.operands[0]);
    ctx.println(format!("\tfor (size_t i = 0; i < ({ea} & 0xF); i++)"));
    ctx.println(format!("\t\tPPC_STORE_U8({ea} - i - 1, {s}.u8[i]);"));
    true
}

pub fn build_stvx(ctx: &mut BuilderContext) -> bool {
    emit_vector_ea(ctx, Some("0xF"));
    let ea = ctx.ea();
    let s = ctx.v(ctx.insn.operands[0]);
    ctx.println(format!(
        "\tsimde_mm_store_si128((simde__m128i*)PPC_RAW_ADDR({ea}), simde_mm_shuffle_epi8(simde_mm_load_si128((simde__m128i*){s}.u8), simde_mm_load_si128((simde__m128i*)VectorMaskL)));"
    ));
    true
}
