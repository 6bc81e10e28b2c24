//! PPC vector (AltiVec/VMX-128) instruction code generation
//!
//! Vectors live in host registers in the reverse of guest byte order (the
//! full-reversal loading convention), so lane-order sensitive operations
//! (merges, packs, splats, dot products, permutes) compensate here rather
//! than at load/store time.

use super::helpers::*;
use crate::context::BuilderContext;

fn load_si(reg: &str) -> String {
    format!("simde_mm_load_si128((simde__m128i*){reg}.u8)")
}

fn load_ps(reg: &str) -> String {
    format!("simde_mm_load_ps({reg}.f32)")
}

/// d = intrinsic(a, b) over the integer lanes.
fn emit_int_binary(ctx: &mut BuilderContext, intrinsic: &str) {
    let d = ctx.v(ctx.insn.operands[0]);
    let a = ctx.v(ctx.insn.operands[1]);
    let b = ctx.v(ctx.insn.operands[2]);
    ctx.println(format!(
        "\tsimde_mm_store_si128((simde__m128i*){d}.u8, {intrinsic}({}, {}));",
        load_si(&a),
        load_si(&b)
    ));
}

/// d = intrinsic(a, b) over the float lanes, in VMX flush mode.
fn emit_fp_binary(ctx: &mut BuilderContext, intrinsic: &str) {
    ctx.emit_set_flush_mode(true);
    let d = ctx.v(ctx.insn.operands[0]);
    let a = ctx.v(ctx.insn.operands[1]);
    let b = ctx.v(ctx.insn.operands[2]);
    ctx.println(format!(
        "\tsimde_mm_store_ps({d}.f32, {intrinsic}({}, {}));",
        load_ps(&a),
        load_ps(&b)
    ));
}

/// Vector compares with Rc report all-true/all-false through CR6.
fn emit_vector_record(ctx: &mut BuilderContext, float_lanes: bool) {
    if ctx.insn.is_record_form() {
        let cr = ctx.cr(6);
        let d = ctx.v(ctx.insn.operands[0]);
        if float_lanes {
            ctx.println(format!(
                "\t{cr}.setFromMask(simde_mm_load_ps({d}.f32), 0xF);"
            ));
        } else {
            ctx.println(format!(
                "\t{cr}.setFromMask(simde_mm_load_si128((simde__m128i*){d}.u8), 0xFFFF);"
            ));
        }
    }
}

//=============================================================================
// Vector Floating Point Arithmetic
//=============================================================================

pub fn build_vaddfp(ctx: &mut BuilderContext) -> bool {
    emit_fp_binary(ctx, "simde_mm_add_ps");
    true
}

pub fn build_vsubfp(ctx: &mut BuilderContext) -> bool {
    emit_fp_binary(ctx, "simde_mm_sub_ps");
    true
}

pub fn build_vmulfp128(ctx: &mut BuilderContext) -> bool {
    emit_fp_binary(ctx, "simde_mm_mul_ps");
    true
}

pub fn build_vmaddfp(ctx: &mut BuilderContext) -> bool {
    // Operand order is (vD, vA, vC, vB): d = a * c + b
    ctx.emit_set_flush_mode(true);
    let d = ctx.v(ctx.insn.operands[0]);
    let a = ctx.v(ctx.insn.operands[1]);
    let c = ctx.v(ctx.insn.operands[2]);
    let b = ctx.v(ctx.insn.operands[3]);
    ctx.println(format!(
        "\tsimde_mm_store_ps({d}.f32, simde_mm_add_ps(simde_mm_mul_ps({}, {}), {}));",
        load_ps(&a),
        load_ps(&c),
        load_ps(&b)
    ));
    true
}

pub fn build_vnmsubfp(ctx: &mut BuilderContext) -> bool {
    // d = -(a * c - b)
    ctx.emit_set_flush_mode(true);
    let d = ctx.v(ctx.insn.operands[0]);
    let a = ctx.v(ctx.insn.operands[1]);
    let c = ctx.v(ctx.insn.operands[2]);
    let b = ctx.v(ctx.insn.operands[3]);
    ctx.println(format!(
        "\tsimde_mm_store_ps({d}.f32, simde_mm_xor_ps(simde_mm_sub_ps(simde_mm_mul_ps({}, {}), {}), simde_mm_set1_ps(-0.0f)));",
        load_ps(&a),
        load_ps(&c),
        load_ps(&b)
    ));
    true
}

pub fn build_vmaxfp(ctx: &mut BuilderContext) -> bool {
    emit_fp_binary(ctx, "simde_mm_max_ps");
    true
}

pub fn build_vminfp(ctx: &mut BuilderContext) -> bool {
    emit_fp_binary(ctx, "simde_mm_min_ps");
    true
}

pub fn build_vrefp(ctx: &mut BuilderContext) -> bool {
    ctx.emit_set_flush_mode(true);
    let d = ctx.v(ctx.insn.operands[0]);
    let b = ctx.v(ctx.insn.operands[1]);
    ctx.println(format!(
        "\tsimde_mm_store_ps({d}.f32, simde_mm_rcp_ps({}));",
        load_ps(&b)
    ));
    true
}

pub fn build_vrsqrtefp(ctx: &mut BuilderContext) -> bool {
    ctx.emit_set_flush_mode(true);
    let d = ctx.v(ctx.insn.operands[0]);
    let b = ctx.v(ctx.insn.operands[1]);
    ctx.println(format!(
        "\tsimde_mm_store_ps({d}.f32, simde_mm_rsqrt_ps({}));",
        load_ps(&b)
    ));
    true
}

pub fn build_vexptefp(ctx: &mut BuilderContext) -> bool {
    ctx.emit_set_flush_mode(true);
    let d = ctx.v(ctx.insn.operands[0]);
    let b = ctx.v(ctx.insn.operands[1]);
    ctx.println(format!("\tfor (size_t i = 0; i < 4; i++)"));
    ctx.println(format!("\t\t{d}.f32[i] = exp2f({b}.f32[i]);"));
    true
}

pub fn build_vlogefp(ctx: &mut BuilderContext) -> bool {
    ctx.emit_set_flush_mode(true);
    let d = ctx.v(ctx.insn.operands[0]);
    let b = ctx.v(ctx.insn.operands[1]);
    ctx.println(format!("\tfor (size_t i = 0; i < 4; i++)"));
    ctx.println(format!("\t\t{d}.f32[i] = log2f({b}.f32[i]);"));
    true
}

//=============================================================================
// Vector Dot Products
//=============================================================================

pub fn build_vmsum3fp128(ctx: &mut BuilderContext) -> bool {
    // With the full reversal, guest xyz occupy host lanes 1..3.
    ctx.emit_set_flush_mode(true);
    let d = ctx.v(ctx.insn.operands[0]);
    let a = ctx.v(ctx.insn.operands[1]);
    let b = ctx.v(ctx.insn.operands[2]);
    ctx.println(format!(
        "\tsimde_mm_store_ps({d}.f32, simde_mm_dp_ps({}, {}, 0xEF));",
        load_ps(&a),
        load_ps(&b)
    ));
    true
}

pub fn build_vmsum4fp128(ctx: &mut BuilderContext) -> bool {
    ctx.emit_set_flush_mode(true);
    let d = ctx.v(ctx.insn.operands[0]);
    let a = ctx.v(ctx.insn.operands[1]);
    let b = ctx.v(ctx.insn.operands[2]);
    ctx.println(format!(
        "\tsimde_mm_store_ps({d}.f32, simde_mm_dp_ps({}, {}, 0xFF));",
        load_ps(&a),
        load_ps(&b)
    ));
    true
}

//=============================================================================
// Vector Rounding
//=============================================================================

fn emit_round(ctx: &mut BuilderContext, mode: &str) {
    ctx.emit_set_flush_mode(true);
    let d = ctx.v(ctx.insn.operands[0]);
    let b = ctx.v(ctx.insn.operands[1]);
    ctx.println(format!(
        "\tsimde_mm_store_ps({d}.f32, simde_mm_round_ps({}, {mode} | SIMDE_MM_FROUND_NO_EXC));",
        load_ps(&b)
    ));
}

pub fn build_vrfim(ctx: &mut BuilderContext) -> bool {
    emit_round(ctx, "SIMDE_MM_FROUND_TO_NEG_INF");
    true
}

pub fn build_vrfin(ctx: &mut BuilderContext) -> bool {
    emit_round(ctx, "SIMDE_MM_FROUND_TO_NEAREST_INT");
    true
}

pub fn build_vrfip(ctx: &mut BuilderContext) -> bool {
    emit_round(ctx, "SIMDE_MM_FROUND_TO_POS_INF");
    true
}

pub fn build_vrfiz(ctx: &mut BuilderContext) -> bool {
    emit_round(ctx, "SIMDE_MM_FROUND_TO_ZERO");
    true
}

//=============================================================================
// Vector Integer Arithmetic
//=============================================================================

pub fn build_vaddsbs(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_adds_epi8");
    true
}

pub fn build_vaddshs(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_adds_epi16");
    true
}

pub fn build_vaddsws(ctx: &mut BuilderContext) -> bool {
    // 32-bit saturating lanes come from the runtime's helper set.
    emit_int_binary(ctx, "simde_mm_adds_epi32");
    true
}

pub fn build_vaddubm(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_add_epi8");
    true
}

pub fn build_vaddubs(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_adds_epu8");
    true
}

pub fn build_vadduhm(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_add_epi16");
    true
}

pub fn build_vadduwm(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_add_epi32");
    true
}

pub fn build_vadduws(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_adds_epu32");
    true
}

pub fn build_vsubsbs(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_subs_epi8");
    true
}

pub fn build_vsubshs(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_subs_epi16");
    true
}

pub fn build_vsubsws(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_subs_epi32");
    true
}

pub fn build_vsububm(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_sub_epi8");
    true
}

pub fn build_vsububs(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_subs_epu8");
    true
}

pub fn build_vsubuhm(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_sub_epi16");
    true
}

pub fn build_vsubuhs(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_subs_epu16");
    true
}

pub fn build_vsubuwm(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_sub_epi32");
    true
}

pub fn build_vsubuws(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_subs_epu32");
    true
}

pub fn build_vmaxsh(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_max_epi16");
    true
}

pub fn build_vmaxsw(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_max_epi32");
    true
}

pub fn build_vmaxuh(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_max_epu16");
    true
}

pub fn build_vminsh(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_min_epi16");
    true
}

pub fn build_vminsw(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_min_epi32");
    true
}

pub fn build_vminuh(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_min_epu16");
    true
}

//=============================================================================
// Vector Average
//=============================================================================

pub fn build_vavgsb(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_avg_epi8");
    true
}

pub fn build_vavgsh(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_avg_epi16");
    true
}

pub fn build_vavgub(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_avg_epu8");
    true
}

pub fn build_vavguh(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_avg_epu16");
    true
}

//=============================================================================
// Vector Logical
//=============================================================================

pub fn build_vand(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_and_si128");
    true
}

pub fn build_vandc(ctx: &mut BuilderContext) -> bool {
    // vandc: d = a & ~b, andnot takes the complemented operand first
    let d = ctx.v(ctx.insn.operands[0]);
    let a = ctx.v(ctx.insn.operands[1]);
    let b = ctx.v(ctx.insn.operands[2]);
    ctx.println(format!(
        "\tsimde_mm_store_si128((simde__m128i*){d}.u8, simde_mm_andnot_si128({}, {}));",
        load_si(&b),
        load_si(&a)
    ));
    true
}

pub fn build_vandc128(ctx: &mut BuilderContext) -> bool {
    build_vandc(ctx)
}

pub fn build_vor(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_or_si128");
    true
}

pub fn build_vxor(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_xor_si128");
    true
}

pub fn build_vnor(ctx: &mut BuilderContext) -> bool {
    let d = ctx.v(ctx.insn.operands[0]);
    let a = ctx.v(ctx.insn.operands[1]);
    let b = ctx.v(ctx.insn.operands[2]);
    ctx.println(format!(
        "\tsimde_mm_store_si128((simde__m128i*){d}.u8, simde_mm_xor_si128(simde_mm_or_si128({}, {}), simde_mm_set1_epi32(-1)));",
        load_si(&a),
        load_si(&b)
    ));
    true
}

pub fn build_vsel(ctx: &mut BuilderContext) -> bool {
    // d = (a & ~c) | (b & c)
    let d = ctx.v(ctx.insn.operands[0]);
    let a = ctx.v(ctx.insn.operands[1]);
    let b = ctx.v(ctx.insn.operands[2]);
    let c = ctx.v(ctx.insn.operands[3]);
    ctx.println(format!(
        "\tsimde_mm_store_si128((simde__m128i*){d}.u8, simde_mm_or_si128(simde_mm_andnot_si128({}, {}), simde_mm_and_si128({}, {})));",
        load_si(&c),
        load_si(&a),
        load_si(&c),
        load_si(&b)
    ));
    true
}

//=============================================================================
// Vector Compare
//=============================================================================

pub fn build_vcmpbfp(ctx: &mut BuilderContext) -> bool {
    ctx.emit_set_flush_mode(true);
    let d = ctx.v(ctx.insn.operands[0]);
    let a = ctx.v(ctx.insn.operands[1]);
    let b = ctx.v(ctx.insn.operands[2]);
    ctx.println(format!(
        "\tsimde_mm_store_ps({d}.f32, simde_mm_vcmpbfp_ps({}, {}));",
        load_ps(&a),
        load_ps(&b)
    ));
    emit_vector_record(ctx, true);
    true
}

pub fn build_vcmpeqfp(ctx: &mut BuilderContext) -> bool {
    emit_fp_binary(ctx, "simde_mm_cmpeq_ps");
    emit_vector_record(ctx, true);
    true
}

pub fn build_vcmpequb(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_cmpeq_epi8");
    emit_vector_record(ctx, false);
    true
}

pub fn build_vcmpequh(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_cmpeq_epi16");
    emit_vector_record(ctx, false);
    true
}

pub fn build_vcmpequw(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_cmpeq_epi32");
    emit_vector_record(ctx, false);
    true
}

pub fn build_vcmpgefp(ctx: &mut BuilderContext) -> bool {
    emit_fp_binary(ctx, "simde_mm_cmpge_ps");
    emit_vector_record(ctx, true);
    true
}

pub fn build_vcmpgtfp(ctx: &mut BuilderContext) -> bool {
    emit_fp_binary(ctx, "simde_mm_cmpgt_ps");
    emit_vector_record(ctx, true);
    true
}

pub fn build_vcmpgtub(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_cmpgt_epu8");
    emit_vector_record(ctx, false);
    true
}

pub fn build_vcmpgtuh(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_cmpgt_epu16");
    emit_vector_record(ctx, false);
    true
}

pub fn build_vcmpgtsh(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_cmpgt_epi16");
    emit_vector_record(ctx, false);
    true
}

pub fn build_vcmpgtsw(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_cmpgt_epi32");
    emit_vector_record(ctx, false);
    true
}

//=============================================================================
// Vector Conversion
//=============================================================================

pub fn build_vctsxs(ctx: &mut BuilderContext) -> bool {
    // Saturating float->s32 with a 2^uim scale factor applied first.
    ctx.emit_set_flush_mode(true);
    let d = ctx.v(ctx.insn.operands[0]);
    let b = ctx.v(ctx.insn.operands[1]);
    let scale = (1u64 << ctx.insn.operands[2]) as f32;
    ctx.println(format!(
        "\tsimde_mm_store_si128((simde__m128i*){d}.s32, simde_mm_vctsxs(simde_mm_mul_ps({}, simde_mm_set1_ps({scale:.1}f))));",
        load_ps(&b)
    ));
    true
}

pub fn build_vctuxs(ctx: &mut BuilderContext) -> bool {
    ctx.emit_set_flush_mode(true);
    let d = ctx.v(ctx.insn.operands[0]);
    let b = ctx.v(ctx.insn.operands[1]);
    let scale = (1u64 << ctx.insn.operands[2]) as f32;
    ctx.println(format!(
        "\tsimde_mm_store_si128((simde__m128i*){d}.u32, simde_mm_vctuxs(simde_mm_mul_ps({}, simde_mm_set1_ps({scale:.1}f))));",
        load_ps(&b)
    ));
    true
}

pub fn build_vcfsx(ctx: &mut BuilderContext) -> bool {
    ctx.emit_set_flush_mode(true);
    let d = ctx.v(ctx.insn.operands[0]);
    let b = ctx.v(ctx.insn.operands[1]);
    let scale = 1.0 / (1u64 << ctx.insn.operands[2]) as f64;
    ctx.println(format!(
        "\tsimde_mm_store_ps({d}.f32, simde_mm_mul_ps(simde_mm_cvtepi32_ps(simde_mm_load_si128((simde__m128i*){b}.s32)), simde_mm_set1_ps({scale:e}f)));"
    ));
    true
}

pub fn build_vcfux(ctx: &mut BuilderContext) -> bool {
    ctx.emit_set_flush_mode(true);
    let d = ctx.v(ctx.insn.operands[0]);
    let b = ctx.v(ctx.insn.operands[1]);
    let scale = 1.0 / (1u64 << ctx.insn.operands[2]) as f64;
    ctx.println(format!(
        "\tsimde_mm_store_ps({d}.f32, simde_mm_mul_ps(simde_mm_cvtepu32_ps(simde_mm_load_si128((simde__m128i*){b}.u32)), simde_mm_set1_ps({scale:e}f)));"
    ));
    true
}

//=============================================================================
// Vector Merge
//=============================================================================

// Reversed storage flips guest high/low halves, so guest "merge high" is a
// host unpackhi with the operands swapped (and vice versa for low).

fn emit_merge(ctx: &mut BuilderContext, intrinsic: &str) {
    let d = ctx.v(ctx.insn.operands[0]);
    let a = ctx.v(ctx.insn.operands[1]);
    let b = ctx.v(ctx.insn.operands[2]);
    ctx.println(format!(
        "\tsimde_mm_store_si128((simde__m128i*){d}.u8, {intrinsic}({}, {}));",
        load_si(&b),
        load_si(&a)
    ));
}

pub fn build_vmrghb(ctx: &mut BuilderContext) -> bool {
    emit_merge(ctx, "simde_mm_unpackhi_epi8");
    true
}

pub fn build_vmrghh(ctx: &mut BuilderContext) -> bool {
    emit_merge(ctx, "simde_mm_unpackhi_epi16");
    true
}

pub fn build_vmrghw(ctx: &mut BuilderContext) -> bool {
    emit_merge(ctx, "simde_mm_unpackhi_epi32");
    true
}

pub fn build_vmrglb(ctx: &mut BuilderContext) -> bool {
    emit_merge(ctx, "simde_mm_unpacklo_epi8");
    true
}

pub fn build_vmrglh(ctx: &mut BuilderContext) -> bool {
    emit_merge(ctx, "simde_mm_unpacklo_epi16");
    true
}

pub fn build_vmrglw(ctx: &mut BuilderContext) -> bool {
    emit_merge(ctx, "simde_mm_unpacklo_epi32");
    true
}

//=============================================================================
// Vector Permute
//=============================================================================

pub fn build_vperm(ctx: &mut BuilderContext) -> bool {
    let d = ctx.v(ctx.insn.operands[0]);
    let a = ctx.v(ctx.insn.operands[1]);
    let b = ctx.v(ctx.insn.operands[2]);
    let c = ctx.v(ctx.insn.operands[3]);
    ctx.println(format!(
        "\tsimde_mm_store_si128((simde__m128i*){d}.u8, simde_mm_perm_epi8({}, {}, {}));",
        load_si(&a),
        load_si(&b),
        load_si(&c)
    ));
    true
}

pub fn build_vpermwi128(ctx: &mut BuilderContext) -> bool {
    // Map the guest word selectors onto the reversed host lane order.
    let perm = ctx.insn.operands[2];
    let mut control = 0u32;
    for host_lane in 0..4u32 {
        let guest_word = 3 - host_lane;
        let selector = (perm >> ((3 - guest_word) * 2)) & 3;
        control |= (3 - selector) << (host_lane * 2);
    }
    let d = ctx.v(ctx.insn.operands[0]);
    let b = ctx.v(ctx.insn.operands[1]);
    ctx.println(format!(
        "\tsimde_mm_store_si128((simde__m128i*){d}.u8, simde_mm_shuffle_epi32({}, 0x{control:X}));",
        load_si(&b)
    ));
    true
}

pub fn build_vrlimi128(ctx: &mut BuilderContext) -> bool {
    // Rotate the source words left by z, then insert the words selected by
    // the 4-bit mask. The blend mask maps directly onto the reversed lanes.
    let mask = ctx.insn.operands[2];
    let z = ctx.insn.operands[3] & 3;
    let d = ctx.v(ctx.insn.operands[0]);
    let b = ctx.v(ctx.insn.operands[1]);
    let source = if z != 0 {
        // Word-rotate shuffle controls for z = 1..3.
        let controls = [0x93u32, 0x4E, 0x39];
        format!(
            "simde_mm_shuffle_ps({}, {}, 0x{:X})",
            load_ps(&b),
            load_ps(&b),
            controls[(z - 1) as usize]
        )
    } else {
        load_ps(&b)
    };
    ctx.println(format!(
        "\tsimde_mm_store_ps({d}.f32, simde_mm_blend_ps({}, {source}, 0x{mask:X}));",
        load_ps(&d)
    ));
    true
}

//=============================================================================
// Vector Shift
//=============================================================================

/// Per-lane shift emitted as a scalar loop; lane pairing is unaffected by
/// the reversal since both operands are reversed.
fn emit_lane_shift(ctx: &mut BuilderContext, lanes: u32, field: &str, op: &str, mask: u32) {
    let d = ctx.v(ctx.insn.operands[0]);
    let a = ctx.v(ctx.insn.operands[1]);
    let b = ctx.v(ctx.insn.operands[2]);
    ctx.println(format!("\tfor (size_t i = 0; i < {lanes}; i++)"));
    ctx.println(format!(
        "\t\t{d}.{field}[i] = {a}.{field}[i] {op} ({b}.{field}[i] & 0x{mask:X});"
    ));
}

pub fn build_vsl(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_vsl");
    true
}

pub fn build_vslb(ctx: &mut BuilderContext) -> bool {
    emit_lane_shift(ctx, 16, "u8", "<<", 0x7);
    true
}

pub fn build_vslh(ctx: &mut BuilderContext) -> bool {
    emit_lane_shift(ctx, 8, "u16", "<<", 0xF);
    true
}

pub fn build_vsldoi(ctx: &mut BuilderContext) -> bool {
    // Concatenated shift by octets; alignr on the reversed halves.
    let sh = ctx.insn.operands[3] & 0xF;
    let d = ctx.v(ctx.insn.operands[0]);
    let a = ctx.v(ctx.insn.operands[1]);
    let b = ctx.v(ctx.insn.operands[2]);
    ctx.println(format!(
        "\tsimde_mm_store_si128((simde__m128i*){d}.u8, simde_mm_alignr_epi8({}, {}, {}));",
        load_si(&a),
        load_si(&b),
        16 - sh
    ));
    true
}

pub fn build_vslw(ctx: &mut BuilderContext) -> bool {
    emit_lane_shift(ctx, 4, "u32", "<<", 0x1F);
    true
}

pub fn build_vslo(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_vslo");
    true
}

pub fn build_vsr(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_vsr");
    true
}

pub fn build_vsrh(ctx: &mut BuilderContext) -> bool {
    emit_lane_shift(ctx, 8, "u16", ">>", 0xF);
    true
}

pub fn build_vsrab(ctx: &mut BuilderContext) -> bool {
    emit_lane_shift(ctx, 16, "s8", ">>", 0x7);
    true
}

pub fn build_vsrah(ctx: &mut BuilderContext) -> bool {
    emit_lane_shift(ctx, 8, "s16", ">>", 0xF);
    true
}

pub fn build_vsraw(ctx: &mut BuilderContext) -> bool {
    emit_lane_shift(ctx, 4, "s32", ">>", 0x1F);
    true
}

pub fn build_vsrw(ctx: &mut BuilderContext) -> bool {
    emit_lane_shift(ctx, 4, "u32", ">>", 0x1F);
    true
}

pub fn build_vsro(ctx: &mut BuilderContext) -> bool {
    emit_int_binary(ctx, "simde_mm_vsro");
    true
}

pub fn build_vrlh(ctx: &mut BuilderContext) -> bool {
    let d = ctx.v(ctx.insn.operands[0]);
    let a = ctx.v(ctx.insn.operands[1]);
    let b = ctx.v(ctx.insn.operands[2]);
    ctx.println(format!("\tfor (size_t i = 0; i < 8; i++)"));
    ctx.println(format!(
        "\t\t{d}.u16[i] = ({a}.u16[i] << ({b}.u16[i] & 0xF)) | ({a}.u16[i] >> (16 - ({b}.u16[i] & 0xF)) % 16);"
    ));
    true
}

//=============================================================================
// Vector Splat
//=============================================================================

pub fn build_vspltb(ctx: &mut BuilderContext) -> bool {
    // Guest element uim sits at host byte 15 - uim.
    let d = ctx.v(ctx.insn.operands[0]);
    let b = ctx.v(ctx.insn.operands[1]);
    let uim = ctx.insn.operands[2] & 0xF;
    ctx.println(format!(
        "\tsimde_mm_store_si128((simde__m128i*){d}.u8, simde_mm_set1_epi8({b}.u8[{}]));",
        15 - uim
    ));
    true
}

pub fn build_vsplth(ctx: &mut BuilderContext) -> bool {
    let d = ctx.v(ctx.insn.operands[0]);
    let b = ctx.v(ctx.insn.operands[1]);
    let uim = ctx.insn.operands[2] & 0x7;
    ctx.println(format!(
        "\tsimde_mm_store_si128((simde__m128i*){d}.u8, simde_mm_set1_epi16({b}.u16[{}]));",
        7 - uim
    ));
    true
}

pub fn build_vspltw(ctx: &mut BuilderContext) -> bool {
    let d = ctx.v(ctx.insn.operands[0]);
    let b = ctx.v(ctx.insn.operands[1]);
    let uim = ctx.insn.operands[2] & 0x3;
    ctx.println(format!(
        "\tsimde_mm_store_si128((simde__m128i*){d}.u8, simde_mm_set1_epi32({b}.u32[{}]));",
        3 - uim
    ));
    true
}

fn splat_immediate(ctx: &BuilderContext) -> i32 {
    // 5-bit signed immediate
    let imm = ctx.insn.operands[1] & 0x1F;
    ((imm as i32) ^ 0x10) - 0x10
}

pub fn build_vspltisb(ctx: &mut BuilderContext) -> bool {
    let imm = splat_immediate(ctx);
    let d = ctx.v(ctx.insn.operands[0]);
    ctx.println(format!(
        "\tsimde_mm_store_si128((simde__m128i*){d}.u8, simde_mm_set1_epi8({imm}));"
    ));
    true
}

pub fn build_vspltish(ctx: &mut BuilderContext) -> bool {
    let imm = splat_immediate(ctx);
    let d = ctx.v(ctx.insn.operands[0]);
    ctx.println(format!(
        "\tsimde_mm_store_si128((simde__m128i*){d}.u8, simde_mm_set1_epi16({imm}));"
    ));
    true
}

pub fn build_vspltisw(ctx: &mut BuilderContext) -> bool {
    let imm = splat_immediate(ctx);
    let d = ctx.v(ctx.insn.operands[0]);
    ctx.println(format!(
        "\tsimde_mm_store_si128((simde__m128i*){d}.u8, simde_mm_set1_epi32({imm}));"
    ));
    true
}

//=============================================================================
// Vector Pack
//=============================================================================

// Guest packs place vA's elements first (most significant); with the
// reversal that is the host high half, so the host pack order is (b, a).

fn emit_pack(ctx: &mut BuilderContext, intrinsic: &str) {
    let d = ctx.v(ctx.insn.operands[0]);
    let a = ctx.v(ctx.insn.operands[1]);
    let b = ctx.v(ctx.insn.operands[2]);
    ctx.println(format!(
        "\tsimde_mm_store_si128((simde__m128i*){d}.u8, {intrinsic}({}, {}));",
        load_si(&b),
        load_si(&a)
    ));
}

pub fn build_vpkuhum(ctx: &mut BuilderContext) -> bool {
    emit_pack(ctx, "simde_mm_vpkuhum");
    true
}

pub fn build_vpkuhus(ctx: &mut BuilderContext) -> bool {
    emit_pack(ctx, "simde_mm_vpkuhus");
    true
}

pub fn build_vpkuwum(ctx: &mut BuilderContext) -> bool {
    emit_pack(ctx, "simde_mm_vpkuwum");
    true
}

pub fn build_vpkuwus(ctx: &mut BuilderContext) -> bool {
    emit_pack(ctx, "simde_mm_vpkuwus");
    true
}

pub fn build_vpkshss(ctx: &mut BuilderContext) -> bool {
    emit_pack(ctx, "simde_mm_packs_epi16");
    true
}

pub fn build_vpkshus(ctx: &mut BuilderContext) -> bool {
    emit_pack(ctx, "simde_mm_packus_epi16");
    true
}

pub fn build_vpkswss(ctx: &mut BuilderContext) -> bool {
    emit_pack(ctx, "simde_mm_packs_epi32");
    true
}

pub fn build_vpkswus(ctx: &mut BuilderContext) -> bool {
    emit_pack(ctx, "simde_mm_packus_epi32");
    true
}

pub fn build_vpkd3d128(ctx: &mut BuilderContext) -> bool {
    // Direct3D format pack; the runtime helper takes the format selector
    // and shift control raw.
    let d = ctx.v(ctx.insn.operands[0]);
    let b = ctx.v(ctx.insn.operands[1]);
    ctx.println(format!(
        "\tsimde_mm_store_si128((simde__m128i*){d}.u8, simde_mm_vpkd3d128({}, {}, {}, {}));",
        load_si(&b),
        ctx.insn.operands[2],
        ctx.insn.operands[3],
        ctx.insn.operands[4]
    ));
    true
}

//=============================================================================
// Vector Unpack
//=============================================================================

// Duplicate the half then arithmetic-shift to sign-extend in place. With
// the reversal, guest "high" elements sit in the host high half.

pub fn build_vupkhsb(ctx: &mut BuilderContext) -> bool {
    let d = ctx.v(ctx.insn.operands[0]);
    let b = ctx.v(ctx.insn.operands[1]);
    ctx.println(format!(
        "\tsimde_mm_store_si128((simde__m128i*){d}.u8, simde_mm_srai_epi16(simde_mm_unpackhi_epi8({}, {}), 8));",
        load_si(&b),
        load_si(&b)
    ));
    true
}

pub fn build_vupkhsh(ctx: &mut BuilderContext) -> bool {
    let d = ctx.v(ctx.insn.operands[0]);
    let b = ctx.v(ctx.insn.operands[1]);
    ctx.println(format!(
        "\tsimde_mm_store_si128((simde__m128i*){d}.u8, simde_mm_srai_epi32(simde_mm_unpackhi_epi16({}, {}), 16));",
        load_si(&b),
        load_si(&b)
    ));
    true
}

pub fn build_vupklsb(ctx: &mut BuilderContext) -> bool {
    let d = ctx.v(ctx.insn.operands[0]);
    let b = ctx.v(ctx.insn.operands[1]);
    ctx.println(format!(
        "\tsimde_mm_store_si128((simde__m128i*){d}.u8, simde_mm_srai_epi16(simde_mm_unpacklo_epi8({}, {}), 8));",
        load_si(&b),
        load_si(&b)
    ));
    true
}

pub fn build_vupklsh(ctx: &mut BuilderContext) -> bool {
    let d = ctx.v(ctx.insn.operands[0]);
    let b = ctx.v(ctx.insn.operands[1]);
    ctx.println(format!(
        "\tsimde_mm_store_si128((simde__m128i*){d}.u8, simde_mm_srai_epi32(simde_mm_unpacklo_epi16({}, {}), 16));",
        load_si(&b),
        load_si(&b)
    ));
    true
}

pub fn build_vupkd3d128(ctx: &mut BuilderContext) -> bool {
    let d = ctx.v(ctx.insn.operands[0]);
    let b = ctx.v(ctx.insn.operands[1]);
    ctx.println(format!(
        "\tsimde_mm_store_si128((simde__m128i*){d}.u8, simde_mm_vupkd3d128({}, {}));",
        load_si(&b),
        ctx.insn.operands[2]
    ));
    true
}
