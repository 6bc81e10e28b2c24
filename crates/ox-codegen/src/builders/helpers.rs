//! Recompiler helper utilities shared by the builder families

use crate::context::BuilderContext;

/// Compute a 64-bit mask for PPC rotate/mask instructions.
/// Bits [mstart..mstop] are set; the mask wraps when mstart > mstop.
pub fn compute_mask(mstart: u32, mstop: u32) -> u64 {
    let mstart = mstart & 0x3F;
    let mstop = mstop & 0x3F;
    let value =
        (u64::MAX >> mstart) ^ (if mstop >= 63 { 0 } else { u64::MAX >> (mstop + 1) });
    if mstart <= mstop {
        value
    } else {
        !value
    }
}

/// Map a PPC BI field bit index (0-3) to a CR field member name.
pub fn cr_bit_name(bi: u32) -> &'static str {
    ["lt", "gt", "eq", "so"][(bi & 3) as usize]
}

/// Emit the CR0 comparison record-form instructions require:
/// lt/gt/eq follow the signed 32-bit result, so mirrors XER[SO].
pub fn emit_record_form_compare(ctx: &mut BuilderContext) {
    if ctx.insn.is_record_form() {
        let cr0 = ctx.cr(0);
        let d = ctx.r(ctx.insn.operands[0]);
        let xer = ctx.xer();
        ctx.println(format!("\t{cr0}.compare<int32_t>({d}.s32, 0, {xer});"));
    }
}

/// Emit a CR bit operation: crD = crA <op> crB, where the global bit index
/// i maps to field i/4 and bit i%4.
pub fn emit_cr_bit_operation(
    ctx: &mut BuilderContext,
    op: &str,
    invert_a: bool,
    invert_b: bool,
    invert_result: bool,
) {
    let cr_d = ctx.insn.operands[0];
    let cr_a = ctx.insn.operands[1];
    let cr_b = ctx.insn.operands[2];

    let field_a = ctx.cr(cr_a / 4);
    let mut a_expr = format!("{}.{}", field_a, cr_bit_name(cr_a % 4));
    let field_b = ctx.cr(cr_b / 4);
    let mut b_expr = format!("{}.{}", field_b, cr_bit_name(cr_b % 4));

    if invert_a {
        a_expr = format!("!({a_expr})");
    }
    if invert_b {
        b_expr = format!("!({b_expr})");
    }

    let mut expr = format!("{a_expr} {op} {b_expr}");
    if invert_result {
        expr = format!("!({expr})");
    }

    let field_d = ctx.cr(cr_d / 4);
    ctx.println(format!(
        "\t{}.{} = {};",
        field_d,
        cr_bit_name(cr_d % 4),
        expr
    ));
}

/// D-form load with update: EA = (rA) + d; rD = MEM[EA]; rA = EA.
pub fn emit_load_with_update(ctx: &mut BuilderContext, load_macro: &str) {
    let ea = ctx.ea();
    let a = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!(
        "\t{ea} = {} + {a}.u32;",
        ctx.insn.operands[1] as i32
    ));
    let d = ctx.r(ctx.insn.operands[0]);
    ctx.println(format!("\t{d}.u64 = {load_macro}({ea});"));
    let a = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("\t{a}.u32 = {ea};"));
}

/// D-form store with update: EA = (rA) + d; MEM[EA] = rS; rA = EA.
pub fn emit_store_with_update(ctx: &mut BuilderContext, store_macro: &str, field: &str) {
    let ea = ctx.ea();
    let a = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!(
        "\t{ea} = {} + {a}.u32;",
        ctx.insn.operands[1] as i32
    ));
    let s = ctx.r(ctx.insn.operands[0]);
    ctx.println(format!("\t{store_macro}({ea}, {s}.{field});"));
    let a = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("\t{a}.u32 = {ea};"));
}

/// D-form sign-extending load: rD = cast(MACRO([rA.u32 +] disp)).
pub fn emit_sign_extend_load_d_form(ctx: &mut BuilderContext, cast: &str, load_macro: &str) {
    let d = ctx.r(ctx.insn.operands[0]);
    ctx.print(format!("\t{d}.s64 = {cast}({load_macro}("));
    if ctx.insn.operands[2] != 0 {
        let a = ctx.r(ctx.insn.operands[2]);
        ctx.print(format!("{a}.u32 + "));
    }
    ctx.println(format!("{}));", ctx.insn.operands[1] as i32));
}

/// X-form sign-extending load: rD = cast(MACRO([rA.u32 +] rB.u32)).
pub fn emit_sign_extend_load_x_form(ctx: &mut BuilderContext, cast: &str, load_macro: &str) {
    let d = ctx.r(ctx.insn.operands[0]);
    ctx.print(format!("\t{d}.s64 = {cast}({load_macro}("));
    if ctx.insn.operands[1] != 0 {
        let a = ctx.r(ctx.insn.operands[1]);
        ctx.print(format!("{a}.u32 + "));
    }
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("{b}.u32));"));
}

/// Check if an upper-16-bit immediate corresponds to a known MMIO range.
///
/// Hardware register ranges:
/// - GPU MMIO: 0x7FC80000-0x7FCFFFFF (upper bits 0x7FC8-0x7FCF)
/// - XMA/APU MMIO: 0x7FEA0000-0x7FEAFFFF (upper bits 0x7FEA)
pub fn is_mmio_upper_bits(imm: u32) -> bool {
    (0x7FC8..=0x7FCF).contains(&imm) || imm == 0x7FEA
}

/// Emit a conditional branch with bounds checking: a goto inside the
/// function, a warning and a guarded return outside it.
pub fn emit_branch_with_bounds_check(
    ctx: &mut BuilderContext,
    target: u32,
    condition: &str,
    instr_name: &str,
) {
    if target < ctx.fn_node.base() || target >= ctx.fn_node.end() {
        tracing::warn!(
            target: "codegen",
            "{} at {:X} branches outside function to {:X}",
            instr_name,
            ctx.base,
            target
        );
        ctx.println(format!(
            "\tif ({condition}) {{ /* branch to 0x{target:X} outside function */ return; }}"
        ));
    } else {
        ctx.println(format!("\tif ({condition}) goto loc_{target:X};"));
    }
}

/// Aligned or unaligned vector EA into `ea`: ea = (opt_rA + rB) [& ~mask].
pub fn emit_vector_ea(ctx: &mut BuilderContext, align_mask: Option<&str>) {
    let ea = ctx.ea();
    if align_mask.is_some() {
        ctx.print(format!("\t{ea} = ("));
    } else {
        ctx.print(format!("\t{ea} = "));
    }
    if ctx.insn.operands[1] != 0 {
        let a = ctx.r(ctx.insn.operands[1]);
        ctx.print(format!("{a}.u32 + "));
    }
    let b = ctx.r(ctx.insn.operands[2]);
    match align_mask {
        Some(mask) => ctx.println(format!("{b}.u32) & ~{mask};")),
        None => ctx.println(format!("{b}.u32;")),
    }
}

/// Unaligned vector EA into `temp`: temp.u32 = opt_rA + rB.
pub fn emit_vector_temp_ea(ctx: &mut BuilderContext) {
    let temp = ctx.temp();
    ctx.print(format!("\t{temp}.u32 = "));
    if ctx.insn.operands[1] != 0 {
        let a = ctx.r(ctx.insn.operands[1]);
        ctx.print(format!("{a}.u32 + "));
    }
    let b = ctx.r(ctx.insn.operands[2]);
    ctx.println(format!("{b}.u32;"));
}

/// Emit a PPC trap: the 5-bit TO field selects up to five disjoint
/// comparisons. TO=0x1F is unconditional, TO=0 is a no-op.
pub fn emit_trap(
    ctx: &mut BuilderContext,
    to: u32,
    a_signed: &str,
    a_unsigned: &str,
    b_signed: &str,
    b_unsigned: &str,
) {
    if to == 0 {
        return;
    }
    if to == 0x1F {
        ctx.println("\tppc_trap(ctx, base, 0);");
        return;
    }

    let mut cond = String::new();
    let mut add = |clause: String| {
        if !cond.is_empty() {
            cond.push_str(" || ");
        }
        cond.push_str(&clause);
    };
    if to & 0x10 != 0 {
        add(format!("{a_signed} < {b_signed}"));
    }
    if to & 0x08 != 0 {
        add(format!("{a_signed} > {b_signed}"));
    }
    if to & 0x04 != 0 {
        add(format!("{a_signed} == {b_signed}"));
    }
    if to & 0x02 != 0 {
        add(format!("{a_unsigned} < {b_unsigned}"));
    }
    if to & 0x01 != 0 {
        add(format!("{a_unsigned} > {b_unsigned}"));
    }

    ctx.println(format!("\tif ({cond}) ppc_trap(ctx, base, 0);"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_mask_plain() {
        assert_eq!(compute_mask(0, 63), u64::MAX);
        assert_eq!(compute_mask(0, 0), 0x8000_0000_0000_0000);
        assert_eq!(compute_mask(63, 63), 1);
        assert_eq!(compute_mask(48, 63), 0xFFFF);
        assert_eq!(compute_mask(32, 63), 0xFFFF_FFFF);
    }

    #[test]
    fn test_compute_mask_wraps() {
        // mstart > mstop: complement of the bits strictly between them.
        assert_eq!(compute_mask(63, 0), !compute_mask(1, 62));
        // Direct wrap check against the PPC definition.
        for start in 0..64u32 {
            for stop in 0..64u32 {
                let mut expected = 0u64;
                let mut bit = start;
                loop {
                    expected |= 1u64 << (63 - bit);
                    if bit == stop {
                        break;
                    }
                    bit = (bit + 1) & 63;
                }
                assert_eq!(compute_mask(start, stop), expected, "mask({start},{stop})");
            }
        }
    }

    #[test]
    fn test_cr_bit_name() {
        for i in 0..32 {
            assert_eq!(cr_bit_name(i), ["lt", "gt", "eq", "so"][(i & 3) as usize]);
        }
    }

    #[test]
    fn test_mmio_upper_bits() {
        assert!(is_mmio_upper_bits(0x7FC8));
        assert!(is_mmio_upper_bits(0x7FCF));
        assert!(is_mmio_upper_bits(0x7FEA));
        assert!(!is_mmio_upper_bits(0x7FC7));
        assert!(!is_mmio_upper_bits(0x7FD0));
        assert!(!is_mmio_upper_bits(0x8000));
    }
}
