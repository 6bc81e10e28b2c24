//! Static opcode -> builder dispatch
//!
//! VMX-128 register-extended variants bind to the same builder as their
//! base opcode. A missing entry never drops an instruction silently: the
//! emitter writes a warning plus a runtime trap stub instead.

use crate::builders::{arithmetic, compare, control_flow, fp, logical, memory, system, vector};
use crate::context::BuilderContext;
use crate::insn::Opcode;

/// Build host code for one instruction. Returns false only when the opcode
/// has no builder at all.
pub fn dispatch_instruction(id: Opcode, ctx: &mut BuilderContext) -> bool {
    use Opcode::*;
    match id {
        // Arithmetic
        Add => arithmetic::build_add(ctx),
        Addc => arithmetic::build_addc(ctx),
        Adde => arithmetic::build_adde(ctx),
        Addi => arithmetic::build_addi(ctx),
        Addic => arithmetic::build_addic(ctx),
        Addis => arithmetic::build_addis(ctx),
        Addme => arithmetic::build_addme(ctx),
        Addze => arithmetic::build_addze(ctx),
        Divd => arithmetic::build_divd(ctx),
        Divdu => arithmetic::build_divdu(ctx),
        Divw => arithmetic::build_divw(ctx),
        Divwu => arithmetic::build_divwu(ctx),
        Mulhd => arithmetic::build_mulhd(ctx),
        Mulhdu => arithmetic::build_mulhdu(ctx),
        Mulhw => arithmetic::build_mulhw(ctx),
        Mulhwu => arithmetic::build_mulhwu(ctx),
        Mulld => arithmetic::build_mulld(ctx),
        Mulli => arithmetic::build_mulli(ctx),
        Mullw => arithmetic::build_mullw(ctx),
        Neg => arithmetic::build_neg(ctx),
        Subf => arithmetic::build_subf(ctx),
        Subfc => arithmetic::build_subfc(ctx),
        Subfe => arithmetic::build_subfe(ctx),
        Subfic => arithmetic::build_subfic(ctx),
        Subfme => arithmetic::build_subfme(ctx),
        Subfze => arithmetic::build_subfze(ctx),

        // Logical
        And => logical::build_and(ctx),
        Andc => logical::build_andc(ctx),
        Andi => logical::build_andi(ctx),
        Andis => logical::build_andis(ctx),
        Nand => logical::build_nand(ctx),
        Nor => logical::build_nor(ctx),
        Not => logical::build_not(ctx),
        Or => logical::build_or(ctx),
        Orc => logical::build_orc(ctx),
        Ori => logical::build_ori(ctx),
        Oris => logical::build_oris(ctx),
        Xor => logical::build_xor(ctx),
        Xori => logical::build_xori(ctx),
        Xoris => logical::build_xoris(ctx),
        Eqv => logical::build_eqv(ctx),
        Cntlzd => logical::build_cntlzd(ctx),
        Cntlzw => logical::build_cntlzw(ctx),
        Extsb => logical::build_extsb(ctx),
        Extsh => logical::build_extsh(ctx),
        Extsw => logical::build_extsw(ctx),
        Clrlwi => logical::build_clrlwi(ctx),
        Clrldi => logical::build_clrldi(ctx),
        Rldicl => logical::build_rldicl(ctx),
        Rldicr => logical::build_rldicr(ctx),
        Rldimi => logical::build_rldimi(ctx),
        Rotldi => logical::build_rotldi(ctx),
        Rlwimi => logical::build_rlwimi(ctx),
        Rlwinm => logical::build_rlwinm(ctx),
        Rlwnm => logical::build_rlwnm(ctx),
        Rotlw => logical::build_rotlw(ctx),
        Rotlwi => logical::build_rotlwi(ctx),
        Sld => logical::build_sld(ctx),
        Slw => logical::build_slw(ctx),
        Srad => logical::build_srad(ctx),
        Sradi => logical::build_sradi(ctx),
        Sraw => logical::build_sraw(ctx),
        Srawi => logical::build_srawi(ctx),
        Srd => logical::build_srd(ctx),
        Srw => logical::build_srw(ctx),

        // Condition register
        Crand => logical::build_crand(ctx),
        Crandc => logical::build_crandc(ctx),
        Creqv => logical::build_creqv(ctx),
        Crnand => logical::build_crnand(ctx),
        Crnor => logical::build_crnor(ctx),
        Cror => logical::build_cror(ctx),
        Crorc => logical::build_crorc(ctx),

        // Comparison
        Cmpd => compare::build_cmpd(ctx),
        Cmpdi => compare::build_cmpdi(ctx),
        Cmpld => compare::build_cmpld(ctx),
        Cmpldi => compare::build_cmpldi(ctx),
        Cmplw => compare::build_cmplw(ctx),
        Cmplwi => compare::build_cmplwi(ctx),
        Cmpw => compare::build_cmpw(ctx),
        Cmpwi => compare::build_cmpwi(ctx),

        // Control flow
        B => control_flow::build_b(ctx),
        Bl => control_flow::build_bl(ctx),
        Blr => control_flow::build_blr(ctx),
        Blrl => control_flow::build_blrl(ctx),
        Bctr => control_flow::build_bctr(ctx),
        Bctrl => control_flow::build_bctrl(ctx),
        Bnectr => control_flow::build_bnectr(ctx),
        Bdz => control_flow::build_bdz(ctx),
        Bdzf => control_flow::build_bdzf(ctx),
        Bdzlr => control_flow::build_bdzlr(ctx),
        Bdnz => control_flow::build_bdnz(ctx),
        Bdnzf => control_flow::build_bdnzf(ctx),
        Bdnzt => control_flow::build_bdnzt(ctx),
        Beq => control_flow::build_beq(ctx),
        Beqlr => control_flow::build_beqlr(ctx),
        Bne => control_flow::build_bne(ctx),
        Bnelr => control_flow::build_bnelr(ctx),
        Blt => control_flow::build_blt(ctx),
        Bltlr => control_flow::build_bltlr(ctx),
        Bge => control_flow::build_bge(ctx),
        Bgelr => control_flow::build_bgelr(ctx),
        Bgt => control_flow::build_bgt(ctx),
        Bgtlr => control_flow::build_bgtlr(ctx),
        Ble => control_flow::build_ble(ctx),
        Blelr => control_flow::build_blelr(ctx),
        Bso => control_flow::build_bso(ctx),
        Bsolr => control_flow::build_bsolr(ctx),
        Bns => control_flow::build_bns(ctx),
        Bnslr => control_flow::build_bnslr(ctx),

        // Floating point
        Fabs => fp::build_fabs(ctx),
        Fnabs => fp::build_fnabs(ctx),
        Fneg => fp::build_fneg(ctx),
        Fmr => fp::build_fmr(ctx),
        Fcfid => fp::build_fcfid(ctx),
        Fctid => fp::build_fctid(ctx),
        Fctidz => fp::build_fctidz(ctx),
        Fctiwz => fp::build_fctiwz(ctx),
        Frsp => fp::build_frsp(ctx),
        Fcmpu => fp::build_fcmpu(ctx),
        Fcmpo => fp::build_fcmpo(ctx),
        Fadd => fp::build_fadd(ctx),
        Fadds => fp::build_fadds(ctx),
        Fsub => fp::build_fsub(ctx),
        Fsubs => fp::build_fsubs(ctx),
        Fmul => fp::build_fmul(ctx),
        Fmuls => fp::build_fmuls(ctx),
        Fdiv => fp::build_fdiv(ctx),
        Fdivs => fp::build_fdivs(ctx),
        Fmadd => fp::build_fmadd(ctx),
        Fmadds => fp::build_fmadds(ctx),
        Fmsub => fp::build_fmsub(ctx),
        Fmsubs => fp::build_fmsubs(ctx),
        Fnmadd => fp::build_fnmadd(ctx),
        Fnmadds => fp::build_fnmadds(ctx),
        Fnmsub => fp::build_fnmsub(ctx),
        Fnmsubs => fp::build_fnmsubs(ctx),
        Fres => fp::build_fres(ctx),
        Frsqrte => fp::build_frsqrte(ctx),
        Fsqrt => fp::build_fsqrt(ctx),
        Fsqrts => fp::build_fsqrts(ctx),
        Fsel => fp::build_fsel(ctx),

        // Load immediate
        Li => memory::build_li(ctx),
        Lis => memory::build_lis(ctx),

        // Loads
        Lbz => memory::build_lbz(ctx),
        Lbzu => memory::build_lbzu(ctx),
        Lbzx => memory::build_lbzx(ctx),
        Lbzux => memory::build_lbzux(ctx),
        Lha => memory::build_lha(ctx),
        Lhau => memory::build_lhau(ctx),
        Lhax => memory::build_lhax(ctx),
        Lhbrx => memory::build_lhbrx(ctx),
        Lhz => memory::build_lhz(ctx),
        Lhzu => memory::build_lhzu(ctx),
        Lhzux => memory::build_lhzux(ctx),
        Lhzx => memory::build_lhzx(ctx),
        Lwa => memory::build_lwa(ctx),
        Lwax => memory::build_lwax(ctx),
        Lwz => memory::build_lwz(ctx),
        Lwzu => memory::build_lwzu(ctx),
        Lwzux => memory::build_lwzux(ctx),
        Lwzx => memory::build_lwzx(ctx),
        Lwbrx => memory::build_lwbrx(ctx),
        Ld => memory::build_ld(ctx),
        Ldu => memory::build_ldu(ctx),
        Ldx => memory::build_ldx(ctx),
        Ldux => memory::build_ldux(ctx),
        Lwarx => memory::build_lwarx(ctx),
        Ldarx => memory::build_ldarx(ctx),
        Lfd => memory::build_lfd(ctx),
        Lfdu => memory::build_lfdu(ctx),
        Lfdux => memory::build_lfdux(ctx),
        Lfdx => memory::build_lfdx(ctx),
        Lfs => memory::build_lfs(ctx),
        Lfsu => memory::build_lfsu(ctx),
        Lfsux => memory::build_lfsux(ctx),
        Lfsx => memory::build_lfsx(ctx),

        // Stores
        Stb => memory::build_stb(ctx),
        Stbu => memory::build_stbu(ctx),
        Stbx => memory::build_stbx(ctx),
        Stbux => memory::build_stbux(ctx),
        Sth => memory::build_sth(ctx),
        Sthbrx => memory::build_sthbrx(ctx),
        Sthu => memory::build_sthu(ctx),
        Sthux => memory::build_sthux(ctx),
        Sthx => memory::build_sthx(ctx),
        Stw => memory::build_stw(ctx),
        Stwu => memory::build_stwu(ctx),
        Stwux => memory::build_stwux(ctx),
        Stwx => memory::build_stwx(ctx),
        Stwbrx => memory::build_stwbrx(ctx),
        Stwcx => memory::build_stwcx(ctx),
        Stdcx => memory::build_stdcx(ctx),
        Std => memory::build_std(ctx),
        Stdu => memory::build_stdu(ctx),
        Stdx => memory::build_stdx(ctx),
        Stdux => memory::build_stdux(ctx),
        Stfd => memory::build_stfd(ctx),
        Stfdu => memory::build_stfdu(ctx),
        Stfdx => memory::build_stfdx(ctx),
        Stfiwx => memory::build_stfiwx(ctx),
        Stfs => memory::build_stfs(ctx),
        Stfsu => memory::build_stfsu(ctx),
        Stfsux => memory::build_stfsux(ctx),
        Stfsx => memory::build_stfsx(ctx),

        // Vector loads; the element forms behave as full loads here
        Lvx | Lvx128 | Lvxl128 | Lvebx | Lvehx | Lvewx | Lvewx128 => memory::build_lvx(ctx),
        Lvlx | Lvlx128 => memory::build_lvlx(ctx),
        Lvrx | Lvrx128 => memory::build_lvrx(ctx),
        Lvsl => memory::build_lvsl(ctx),
        Lvsr => memory::build_lvsr(ctx),

        // Vector stores
        Stvehx => memory::build_stvehx(ctx),
        Stvewx | Stvewx128 => memory::build_stvewx(ctx),
        Stvlx | Stvlx128 | Stvlxl128 => memory::build_stvlx(ctx),
        Stvrx | Stvrx128 => memory::build_stvrx(ctx),
        Stvx | Stvx128 => memory::build_stvx(ctx),

        // System
        Nop => system::build_nop(ctx),
        Attn => system::build_attn(ctx),
        Sync => system::build_sync(ctx),
        Lwsync => system::build_lwsync(ctx),
        Eieio => system::build_eieio(ctx),
        Db16cyc => system::build_db16cyc(ctx),
        Cctpl => system::build_cctpl(ctx),
        Cctpm => system::build_cctpm(ctx),

        // Traps: every named variant maps to its generic builder
        Twi | Twlgti | Twllti | Tweqi | Twlgei | Twlnli | Twllei | Twlngi | Twgti | Twgei
        | Twnli | Twlti | Twlei | Twngi | Twnei => system::build_twi(ctx),
        Tdi | Tdlgti | Tdllti | Tdeqi | Tdlgei | Tdlnli | Tdllei | Tdlngi | Tdgti | Tdgei
        | Tdnli | Tdlti | Tdlei | Tdngi | Tdnei => system::build_tdi(ctx),
        Tw | Twge | Twgt | Twle | Twlt | Tweq | Twne | Twlge | Twlgt | Twlle | Twllt => {
            system::build_tw(ctx)
        }
        Td | Tdge | Tdgt | Tdle | Tdlt | Tdeq | Tdne | Tdlge | Tdlgt | Tdlle | Tdllt => {
            system::build_td(ctx)
        }

        // Cache operations
        Dcbf => system::build_dcbf(ctx),
        Dcbt => system::build_dcbt(ctx),
        Dcbtst => system::build_dcbtst(ctx),
        Dcbz => system::build_dcbz(ctx),
        Dcbzl => system::build_dcbzl(ctx),
        Dcbst => system::build_dcbst(ctx),

        // Register moves
        Mr => system::build_mr(ctx),
        Mfcr => system::build_mfcr(ctx),
        Mfocrf => system::build_mfocrf(ctx),
        Mflr => system::build_mflr(ctx),
        Mfmsr => system::build_mfmsr(ctx),
        Mffs => system::build_mffs(ctx),
        Mftb => system::build_mftb(ctx),
        Mtcr => system::build_mtcr(ctx),
        Mtctr => system::build_mtctr(ctx),
        Mtlr => system::build_mtlr(ctx),
        Mtmsrd => system::build_mtmsrd(ctx),
        Mtfsf => system::build_mtfsf(ctx),
        Mtxer => system::build_mtxer(ctx),

        // Vector float arithmetic
        Vaddfp | Vaddfp128 => vector::build_vaddfp(ctx),
        Vsubfp | Vsubfp128 => vector::build_vsubfp(ctx),
        Vmulfp128 => vector::build_vmulfp128(ctx),
        Vmaddfp | Vmaddfp128 | Vmaddcfp128 => vector::build_vmaddfp(ctx),
        Vnmsubfp | Vnmsubfp128 => vector::build_vnmsubfp(ctx),
        Vmaxfp | Vmaxfp128 => vector::build_vmaxfp(ctx),
        Vminfp | Vminfp128 => vector::build_vminfp(ctx),
        Vrefp | Vrefp128 => vector::build_vrefp(ctx),
        Vrsqrtefp | Vrsqrtefp128 => vector::build_vrsqrtefp(ctx),
        Vexptefp | Vexptefp128 => vector::build_vexptefp(ctx),
        Vlogefp | Vlogefp128 => vector::build_vlogefp(ctx),
        Vmsum3fp128 => vector::build_vmsum3fp128(ctx),
        Vmsum4fp128 => vector::build_vmsum4fp128(ctx),

        // Vector rounding
        Vrfim | Vrfim128 => vector::build_vrfim(ctx),
        Vrfin | Vrfin128 => vector::build_vrfin(ctx),
        Vrfip | Vrfip128 => vector::build_vrfip(ctx),
        Vrfiz | Vrfiz128 => vector::build_vrfiz(ctx),

        // Vector integer arithmetic
        Vaddsbs => vector::build_vaddsbs(ctx),
        Vaddshs => vector::build_vaddshs(ctx),
        Vaddsws => vector::build_vaddsws(ctx),
        Vaddubm => vector::build_vaddubm(ctx),
        Vaddubs => vector::build_vaddubs(ctx),
        Vadduhm => vector::build_vadduhm(ctx),
        Vadduwm => vector::build_vadduwm(ctx),
        Vadduws => vector::build_vadduws(ctx),
        Vsubsbs => vector::build_vsubsbs(ctx),
        Vsubshs => vector::build_vsubshs(ctx),
        Vsubsws => vector::build_vsubsws(ctx),
        Vsububm => vector::build_vsububm(ctx),
        Vsububs => vector::build_vsububs(ctx),
        Vsubuhm => vector::build_vsubuhm(ctx),
        Vsubuhs => vector::build_vsubuhs(ctx),
        Vsubuwm => vector::build_vsubuwm(ctx),
        Vsubuws => vector::build_vsubuws(ctx),
        Vmaxsh => vector::build_vmaxsh(ctx),
        Vmaxsw => vector::build_vmaxsw(ctx),
        Vmaxuh => vector::build_vmaxuh(ctx),
        Vminsh => vector::build_vminsh(ctx),
        Vminsw => vector::build_vminsw(ctx),
        Vminuh => vector::build_vminuh(ctx),

        // Vector average
        Vavgsb => vector::build_vavgsb(ctx),
        Vavgsh => vector::build_vavgsh(ctx),
        Vavgub => vector::build_vavgub(ctx),
        Vavguh => vector::build_vavguh(ctx),

        // Vector logical
        Vand | Vand128 => vector::build_vand(ctx),
        Vandc => vector::build_vandc(ctx),
        Vandc128 => vector::build_vandc128(ctx),
        Vor | Vor128 => vector::build_vor(ctx),
        Vxor | Vxor128 => vector::build_vxor(ctx),
        Vnor | Vnor128 => vector::build_vnor(ctx),
        Vsel | Vsel128 => vector::build_vsel(ctx),

        // Vector compare
        Vcmpbfp | Vcmpbfp128 => vector::build_vcmpbfp(ctx),
        Vcmpeqfp | Vcmpeqfp128 => vector::build_vcmpeqfp(ctx),
        Vcmpequb => vector::build_vcmpequb(ctx),
        Vcmpequh => vector::build_vcmpequh(ctx),
        Vcmpequw | Vcmpequw128 => vector::build_vcmpequw(ctx),
        Vcmpgefp | Vcmpgefp128 => vector::build_vcmpgefp(ctx),
        Vcmpgtfp | Vcmpgtfp128 => vector::build_vcmpgtfp(ctx),
        Vcmpgtub => vector::build_vcmpgtub(ctx),
        Vcmpgtuh => vector::build_vcmpgtuh(ctx),
        Vcmpgtsh => vector::build_vcmpgtsh(ctx),
        Vcmpgtsw => vector::build_vcmpgtsw(ctx),

        // Vector conversion (the 128 forms are aliases)
        Vctsxs | Vcfpsxws128 => vector::build_vctsxs(ctx),
        Vctuxs | Vcfpuxws128 => vector::build_vctuxs(ctx),
        Vcfsx | Vcsxwfp128 => vector::build_vcfsx(ctx),
        Vcfux | Vcuxwfp128 => vector::build_vcfux(ctx),

        // Vector merge
        Vmrghb => vector::build_vmrghb(ctx),
        Vmrghh => vector::build_vmrghh(ctx),
        Vmrghw | Vmrghw128 => vector::build_vmrghw(ctx),
        Vmrglb => vector::build_vmrglb(ctx),
        Vmrglh => vector::build_vmrglh(ctx),
        Vmrglw | Vmrglw128 => vector::build_vmrglw(ctx),

        // Vector permute
        Vperm | Vperm128 => vector::build_vperm(ctx),
        Vpermwi128 => vector::build_vpermwi128(ctx),
        Vrlimi128 => vector::build_vrlimi128(ctx),

        // Vector shift
        Vsl => vector::build_vsl(ctx),
        Vslb => vector::build_vslb(ctx),
        Vslh => vector::build_vslh(ctx),
        Vsldoi | Vsldoi128 => vector::build_vsldoi(ctx),
        Vslw | Vslw128 => vector::build_vslw(ctx),
        Vslo | Vslo128 => vector::build_vslo(ctx),
        Vsr => vector::build_vsr(ctx),
        Vsrh => vector::build_vsrh(ctx),
        Vsrab => vector::build_vsrab(ctx),
        Vsrah => vector::build_vsrah(ctx),
        Vsraw | Vsraw128 => vector::build_vsraw(ctx),
        Vsrw | Vsrw128 => vector::build_vsrw(ctx),
        Vsro | Vsro128 => vector::build_vsro(ctx),
        Vrlh => vector::build_vrlh(ctx),

        // Vector splat
        Vspltb => vector::build_vspltb(ctx),
        Vsplth => vector::build_vsplth(ctx),
        Vspltisb => vector::build_vspltisb(ctx),
        Vspltish => vector::build_vspltish(ctx),
        Vspltisw | Vspltisw128 => vector::build_vspltisw(ctx),
        Vspltw | Vspltw128 => vector::build_vspltw(ctx),

        // Vector pack
        Vpkuhum | Vpkuhum128 => vector::build_vpkuhum(ctx),
        Vpkuhus | Vpkuhus128 => vector::build_vpkuhus(ctx),
        Vpkuwum | Vpkuwum128 => vector::build_vpkuwum(ctx),
        Vpkuwus | Vpkuwus128 => vector::build_vpkuwus(ctx),
        Vpkshss | Vpkshss128 => vector::build_vpkshss(ctx),
        Vpkshus | Vpkshus128 => vector::build_vpkshus(ctx),
        Vpkswss | Vpkswss128 => vector::build_vpkswss(ctx),
        Vpkswus | Vpkswus128 => vector::build_vpkswus(ctx),
        Vpkd3d128 => vector::build_vpkd3d128(ctx),

        // Vector unpack
        Vupkd3d128 => vector::build_vupkd3d128(ctx),
        Vupkhsb | Vupkhsb128 => vector::build_vupkhsb(ctx),
        Vupkhsh | Vupkhsh128 => vector::build_vupkhsh(ctx),
        Vupklsb | Vupklsb128 => vector::build_vupklsb(ctx),
        Vupklsh | Vupklsh128 => vector::build_vupklsh(ctx),
    }
}
