//! Instruction identities and raw-word helpers
//!
//! Decoding instruction bytes is the disassembler's job; this module only
//! names the instructions the builders understand and provides the few
//! raw-word field extractions the emitter's label pass needs.

/// Primary opcode of a raw big-endian instruction word.
pub fn ppc_op(word: u32) -> u32 {
    word >> 26
}

pub const OP_BC: u32 = 16;
pub const OP_B: u32 = 18;

/// True for `bl` (unconditional branch with LK set).
pub fn is_bl(word: u32) -> bool {
    ppc_op(word) == OP_B && (word & 1) != 0
}

/// Signed displacement of an I-form branch (LI field, already <<2).
pub fn b_displacement(word: u32) -> i32 {
    (((word & 0x03FF_FFFC) ^ 0x0200_0000) as i32).wrapping_sub(0x0200_0000)
}

/// Signed displacement of a B-form conditional branch (BD field, <<2).
pub fn bc_displacement(word: u32) -> i32 {
    (((word & 0xFFFC) ^ 0x8000) as i32).wrapping_sub(0x8000)
}

/// `mtctr rX` matcher: 0x7C__03A6 with only the RS field free.
pub const MTCTR_MASK: u32 = 0xFC1F_FFFF;
pub const MTCTR_OPCODE: u32 = 0x7C00_03A6;
/// `ori r0, r0, 0`
pub const NOP_WORD: u32 = 0x6000_0000;
/// `eieio`
pub const EIEIO_WORD: u32 = 0x7C00_06AC;

macro_rules! opcodes {
    ($(($variant:ident, $name:literal),)+) => {
        /// Every instruction the dispatch table maps, including the
        /// VMX-128 register-extended variants that alias a base builder.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[allow(clippy::upper_case_acronyms)]
        pub enum Opcode {
            $($variant,)+
        }

        impl Opcode {
            /// Base mnemonic (without any record-form dot).
            pub fn name(self) -> &'static str {
                match self {
                    $(Opcode::$variant => $name,)+
                }
            }
        }
    };
}

opcodes! {
    // Arithmetic
    (Add, "add"), (Addc, "addc"), (Adde, "adde"), (Addi, "addi"),
    (Addic, "addic"), (Addis, "addis"), (Addme, "addme"), (Addze, "addze"),
    (Divd, "divd"), (Divdu, "divdu"), (Divw, "divw"), (Divwu, "divwu"),
    (Mulhd, "mulhd"), (Mulhdu, "mulhdu"), (Mulhw, "mulhw"), (Mulhwu, "mulhwu"),
    (Mulld, "mulld"), (Mulli, "mulli"), (Mullw, "mullw"),
    (Neg, "neg"),
    (Subf, "subf"), (Subfc, "subfc"), (Subfe, "subfe"), (Subfic, "subfic"),
    (Subfme, "subfme"), (Subfze, "subfze"),

    // Logical / rotate / shift
    (And, "and"), (Andc, "andc"), (Andi, "andi."), (Andis, "andis."),
    (Nand, "nand"), (Nor, "nor"), (Not, "not"), (Or, "or"), (Orc, "orc"),
    (Ori, "ori"), (Oris, "oris"),
    (Xor, "xor"), (Xori, "xori"), (Xoris, "xoris"), (Eqv, "eqv"),
    (Cntlzd, "cntlzd"), (Cntlzw, "cntlzw"),
    (Extsb, "extsb"), (Extsh, "extsh"), (Extsw, "extsw"),
    (Clrlwi, "clrlwi"), (Clrldi, "clrldi"),
    (Rldicl, "rldicl"), (Rldicr, "rldicr"), (Rldimi, "rldimi"), (Rotldi, "rotldi"),
    (Rlwimi, "rlwimi"), (Rlwinm, "rlwinm"), (Rlwnm, "rlwnm"),
    (Rotlw, "rotlw"), (Rotlwi, "rotlwi"),
    (Sld, "sld"), (Slw, "slw"),
    (Srad, "srad"), (Sradi, "sradi"), (Sraw, "sraw"), (Srawi, "srawi"),
    (Srd, "srd"), (Srw, "srw"),

    // Condition register bit ops
    (Crand, "crand"), (Crandc, "crandc"), (Creqv, "creqv"), (Crnand, "crnand"),
    (Crnor, "crnor"), (Cror, "cror"), (Crorc, "crorc"),

    // Comparison
    (Cmpd, "cmpd"), (Cmpdi, "cmpdi"), (Cmpld, "cmpld"), (Cmpldi, "cmpldi"),
    (Cmplw, "cmplw"), (Cmplwi, "cmplwi"), (Cmpw, "cmpw"), (Cmpwi, "cmpwi"),

    // Control flow
    (B, "b"), (Bl, "bl"), (Blr, "blr"), (Blrl, "blrl"),
    (Bctr, "bctr"), (Bctrl, "bctrl"), (Bnectr, "bnectr"),
    (Bdz, "bdz"), (Bdzf, "bdzf"), (Bdzlr, "bdzlr"),
    (Bdnz, "bdnz"), (Bdnzf, "bdnzf"), (Bdnzt, "bdnzt"),
    (Beq, "beq"), (Beqlr, "beqlr"), (Bne, "bne"), (Bnelr, "bnelr"),
    (Blt, "blt"), (Bltlr, "bltlr"), (Bge, "bge"), (Bgelr, "bgelr"),
    (Bgt, "bgt"), (Bgtlr, "bgtlr"), (Ble, "ble"), (Blelr, "blelr"),
    (Bso, "bso"), (Bsolr, "bsolr"), (Bns, "bns"), (Bnslr, "bnslr"),

    // Floating point
    (Fabs, "fabs"), (Fnabs, "fnabs"), (Fneg, "fneg"), (Fmr, "fmr"),
    (Fcfid, "fcfid"), (Fctid, "fctid"), (Fctidz, "fctidz"), (Fctiwz, "fctiwz"),
    (Frsp, "frsp"), (Fcmpu, "fcmpu"), (Fcmpo, "fcmpo"),
    (Fadd, "fadd"), (Fadds, "fadds"), (Fsub, "fsub"), (Fsubs, "fsubs"),
    (Fmul, "fmul"), (Fmuls, "fmuls"), (Fdiv, "fdiv"), (Fdivs, "fdivs"),
    (Fmadd, "fmadd"), (Fmadds, "fmadds"), (Fmsub, "fmsub"), (Fmsubs, "fmsubs"),
    (Fnmadd, "fnmadd"), (Fnmadds, "fnmadds"), (Fnmsub, "fnmsub"), (Fnmsubs, "fnmsubs"),
    (Fres, "fres"), (Frsqrte, "frsqrte"), (Fsqrt, "fsqrt"), (Fsqrts, "fsqrts"),
    (Fsel, "fsel"),

    // Load immediate
    (Li, "li"), (Lis, "lis"),

    // Loads
    (Lbz, "lbz"), (Lbzu, "lbzu"), (Lbzux, "lbzux"), (Lbzx, "lbzx"),
    (Lha, "lha"), (Lhau, "lhau"), (Lhax, "lhax"), (Lhbrx, "lhbrx"),
    (Lhz, "lhz"), (Lhzu, "lhzu"), (Lhzux, "lhzux"), (Lhzx, "lhzx"),
    (Lwa, "lwa"), (Lwax, "lwax"), (Lwbrx, "lwbrx"),
    (Lwz, "lwz"), (Lwzu, "lwzu"), (Lwzux, "lwzux"), (Lwzx, "lwzx"),
    (Ld, "ld"), (Ldu, "ldu"), (Ldux, "ldux"), (Ldx, "ldx"),
    (Lwarx, "lwarx"), (Ldarx, "ldarx"),
    (Lfd, "lfd"), (Lfdu, "lfdu"), (Lfdux, "lfdux"), (Lfdx, "lfdx"),
    (Lfs, "lfs"), (Lfsu, "lfsu"), (Lfsux, "lfsux"), (Lfsx, "lfsx"),

    // Stores
    (Stb, "stb"), (Stbu, "stbu"), (Stbux, "stbux"), (Stbx, "stbx"),
    (Sth, "sth"), (Sthbrx, "sthbrx"), (Sthu, "sthu"), (Sthux, "sthux"), (Sthx, "sthx"),
    (Stw, "stw"), (Stwbrx, "stwbrx"), (Stwu, "stwu"), (Stwux, "stwux"), (Stwx, "stwx"),
    (Stwcx, "stwcx."), (Stdcx, "stdcx."),
    (Std, "std"), (Stdu, "stdu"), (Stdux, "stdux"), (Stdx, "stdx"),
    (Stfd, "stfd"), (Stfdu, "stfdu"), (Stfdx, "stfdx"), (Stfiwx, "stfiwx"),
    (Stfs, "stfs"), (Stfsu, "stfsu"), (Stfsux, "stfsux"), (Stfsx, "stfsx"),

    // Vector loads
    (Lvx, "lvx"), (Lvx128, "lvx128"), (Lvxl128, "lvxl128"),
    (Lvlx, "lvlx"), (Lvlx128, "lvlx128"), (Lvrx, "lvrx"), (Lvrx128, "lvrx128"),
    (Lvsl, "lvsl"), (Lvsr, "lvsr"),
    (Lvebx, "lvebx"), (Lvehx, "lvehx"), (Lvewx, "lvewx"), (Lvewx128, "lvewx128"),

    // Vector stores
    (Stvehx, "stvehx"), (Stvewx, "stvewx"), (Stvewx128, "stvewx128"),
    (Stvlx, "stvlx"), (Stvlx128, "stvlx128"), (Stvlxl128, "stvlxl128"),
    (Stvrx, "stvrx"), (Stvrx128, "stvrx128"),
    (Stvx, "stvx"), (Stvx128, "stvx128"),

    // System
    (Nop, "nop"), (Attn, "attn"), (Sync, "sync"), (Lwsync, "lwsync"),
    (Eieio, "eieio"), (Db16cyc, "db16cyc"), (Cctpl, "cctpl"), (Cctpm, "cctpm"),
    (Twi, "twi"), (Tdi, "tdi"), (Tw, "tw"), (Td, "td"),
    (Twlgti, "twlgti"), (Twllti, "twllti"), (Tweqi, "tweqi"), (Twlgei, "twlgei"),
    (Twlnli, "twlnli"), (Twllei, "twllei"), (Twlngi, "twlngi"), (Twgti, "twgti"),
    (Twgei, "twgei"), (Twnli, "twnli"), (Twlti, "twlti"), (Twlei, "twlei"),
    (Twngi, "twngi"), (Twnei, "twnei"),
    (Tdlgti, "tdlgti"), (Tdllti, "tdllti"), (Tdeqi, "tdeqi"), (Tdlgei, "tdlgei"),
    (Tdlnli, "tdlnli"), (Tdllei, "tdllei"), (Tdlngi, "tdlngi"), (Tdgti, "tdgti"),
    (Tdgei, "tdgei"), (Tdnli, "tdnli"), (Tdlti, "tdlti"), (Tdlei, "tdlei"),
    (Tdngi, "tdngi"), (Tdnei, "tdnei"),
    (Twge, "twge"), (Twgt, "twgt"), (Twle, "twle"), (Twlt, "twlt"),
    (Tweq, "tweq"), (Twne, "twne"), (Twlge, "twlge"), (Twlgt, "twlgt"),
    (Twlle, "twlle"), (Twllt, "twllt"),
    (Tdge, "tdge"), (Tdgt, "tdgt"), (Tdle, "tdle"), (Tdlt, "tdlt"),
    (Tdeq, "tdeq"), (Tdne, "tdne"), (Tdlge, "tdlge"), (Tdlgt, "tdlgt"),
    (Tdlle, "tdlle"), (Tdllt, "tdllt"),
    (Dcbf, "dcbf"), (Dcbt, "dcbt"), (Dcbtst, "dcbtst"), (Dcbz, "dcbz"),
    (Dcbzl, "dcbzl"), (Dcbst, "dcbst"),
    (Mr, "mr"),
    (Mfcr, "mfcr"), (Mfocrf, "mfocrf"), (Mflr, "mflr"), (Mfmsr, "mfmsr"),
    (Mffs, "mffs"), (Mftb, "mftb"),
    (Mtcr, "mtcr"), (Mtctr, "mtctr"), (Mtlr, "mtlr"), (Mtmsrd, "mtmsrd"),
    (Mtfsf, "mtfsf"), (Mtxer, "mtxer"),

    // Vector float arithmetic
    (Vaddfp, "vaddfp"), (Vaddfp128, "vaddfp128"),
    (Vsubfp, "vsubfp"), (Vsubfp128, "vsubfp128"),
    (Vmulfp128, "vmulfp128"),
    (Vmaddfp, "vmaddfp"), (Vmaddfp128, "vmaddfp128"), (Vmaddcfp128, "vmaddcfp128"),
    (Vnmsubfp, "vnmsubfp"), (Vnmsubfp128, "vnmsubfp128"),
    (Vmaxfp, "vmaxfp"), (Vmaxfp128, "vmaxfp128"),
    (Vminfp, "vminfp"), (Vminfp128, "vminfp128"),
    (Vrefp, "vrefp"), (Vrefp128, "vrefp128"),
    (Vrsqrtefp, "vrsqrtefp"), (Vrsqrtefp128, "vrsqrtefp128"),
    (Vexptefp, "vexptefp"), (Vexptefp128, "vexptefp128"),
    (Vlogefp, "vlogefp"), (Vlogefp128, "vlogefp128"),
    (Vmsum3fp128, "vmsum3fp128"), (Vmsum4fp128, "vmsum4fp128"),

    // Vector rounding
    (Vrfim, "vrfim"), (Vrfim128, "vrfim128"), (Vrfin, "vrfin"), (Vrfin128, "vrfin128"),
    (Vrfip, "vrfip"), (Vrfip128, "vrfip128"), (Vrfiz, "vrfiz"), (Vrfiz128, "vrfiz128"),

    // Vector integer arithmetic
    (Vaddsbs, "vaddsbs"), (Vaddshs, "vaddshs"), (Vaddsws, "vaddsws"),
    (Vaddubm, "vaddubm"), (Vaddubs, "vaddubs"), (Vadduhm, "vadduhm"),
    (Vadduwm, "vadduwm"), (Vadduws, "vadduws"),
    (Vsubsbs, "vsubsbs"), (Vsubshs, "vsubshs"), (Vsubsws, "vsubsws"),
    (Vsububm, "vsububm"), (Vsububs, "vsububs"), (Vsubuhm, "vsubuhm"),
    (Vsubuhs, "vsubuhs"), (Vsubuwm, "vsubuwm"), (Vsubuws, "vsubuws"),
    (Vmaxsh, "vmaxsh"), (Vmaxsw, "vmaxsw"), (Vmaxuh, "vmaxuh"),
    (Vminsh, "vminsh"), (Vminsw, "vminsw"), (Vminuh, "vminuh"),
    (Vavgsb, "vavgsb"), (Vavgsh, "vavgsh"), (Vavgub, "vavgub"), (Vavguh, "vavguh"),

    // Vector logical
    (Vand, "vand"), (Vand128, "vand128"), (Vandc, "vandc"), (Vandc128, "vandc128"),
    (Vor, "vor"), (Vor128, "vor128"), (Vxor, "vxor"), (Vxor128, "vxor128"),
    (Vnor, "vnor"), (Vnor128, "vnor128"), (Vsel, "vsel"), (Vsel128, "vsel128"),

    // Vector compare
    (Vcmpbfp, "vcmpbfp"), (Vcmpbfp128, "vcmpbfp128"),
    (Vcmpeqfp, "vcmpeqfp"), (Vcmpeqfp128, "vcmpeqfp128"),
    (Vcmpequb, "vcmpequb"), (Vcmpequh, "vcmpequh"),
    (Vcmpequw, "vcmpequw"), (Vcmpequw128, "vcmpequw128"),
    (Vcmpgefp, "vcmpgefp"), (Vcmpgefp128, "vcmpgefp128"),
    (Vcmpgtfp, "vcmpgtfp"), (Vcmpgtfp128, "vcmpgtfp128"),
    (Vcmpgtub, "vcmpgtub"), (Vcmpgtuh, "vcmpgtuh"),
    (Vcmpgtsh, "vcmpgtsh"), (Vcmpgtsw, "vcmpgtsw"),

    // Vector conversion
    (Vctsxs, "vctsxs"), (Vcfpsxws128, "vcfpsxws128"),
    (Vctuxs, "vctuxs"), (Vcfpuxws128, "vcfpuxws128"),
    (Vcfsx, "vcfsx"), (Vcsxwfp128, "vcsxwfp128"),
    (Vcfux, "vcfux"), (Vcuxwfp128, "vcuxwfp128"),

    // Vector merge
    (Vmrghb, "vmrghb"), (Vmrghh, "vmrghh"), (Vmrghw, "vmrghw"), (Vmrghw128, "vmrghw128"),
    (Vmrglb, "vmrglb"), (Vmrglh, "vmrglh"), (Vmrglw, "vmrglw"), (Vmrglw128, "vmrglw128"),

    // Vector permute
    (Vperm, "vperm"), (Vperm128, "vperm128"), (Vpermwi128, "vpermwi128"),
    (Vrlimi128, "vrlimi128"),

    // Vector shift
    (Vsl, "vsl"), (Vslb, "vslb"), (Vslh, "vslh"),
    (Vsldoi, "vsldoi"), (Vsldoi128, "vsldoi128"),
    (Vslw, "vslw"), (Vslw128, "vslw128"), (Vslo, "vslo"), (Vslo128, "vslo128"),
    (Vsr, "vsr"), (Vsrh, "vsrh"), (Vsrab, "vsrab"), (Vsrah, "vsrah"),
    (Vsraw, "vsraw"), (Vsraw128, "vsraw128"), (Vsrw, "vsrw"), (Vsrw128, "vsrw128"),
    (Vsro, "vsro"), (Vsro128, "vsro128"), (Vrlh, "vrlh"),

    // Vector splat
    (Vspltb, "vspltb"), (Vsplth, "vsplth"),
    (Vspltisb, "vspltisb"), (Vspltish, "vspltish"),
    (Vspltisw, "vspltisw"), (Vspltisw128, "vspltisw128"),
    (Vspltw, "vspltw"), (Vspltw128, "vspltw128"),

    // Vector pack
    (Vpkuhum, "vpkuhum"), (Vpkuhum128, "vpkuhum128"),
    (Vpkuhus, "vpkuhus"), (Vpkuhus128, "vpkuhus128"),
    (Vpkuwum, "vpkuwum"), (Vpkuwum128, "vpkuwum128"),
    (Vpkuwus, "vpkuwus"), (Vpkuwus128, "vpkuwus128"),
    (Vpkshss, "vpkshss"), (Vpkshss128, "vpkshss128"),
    (Vpkshus, "vpkshus"), (Vpkshus128, "vpkshus128"),
    (Vpkswss, "vpkswss"), (Vpkswss128, "vpkswss128"),
    (Vpkswus, "vpkswus"), (Vpkswus128, "vpkswus128"),
    (Vpkd3d128, "vpkd3d128"),

    // Vector unpack
    (Vupkd3d128, "vupkd3d128"),
    (Vupkhsb, "vupkhsb"), (Vupkhsb128, "vupkhsb128"),
    (Vupkhsh, "vupkhsh"), (Vupkhsh128, "vupkhsh128"),
    (Vupklsb, "vupklsb"), (Vupklsb128, "vupklsb128"),
    (Vupklsh, "vupklsh"), (Vupklsh128, "vupklsh128"),
}

/// A decoded instruction as handed over by the external disassembler.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub opcode: Opcode,
    /// Mnemonic as disassembled, including any record-form dot.
    pub name: String,
    /// Raw operand fields; displacements are stored sign-extended into u32.
    pub operands: [u32; 5],
    /// Pretty operand string, used only for the emitted comment line.
    pub op_str: String,
}

impl Instruction {
    pub fn new(opcode: Opcode, operands: [u32; 5]) -> Self {
        Self {
            opcode,
            name: opcode.name().to_string(),
            operands,
            op_str: String::new(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Record-form instructions carry a '.' in their mnemonic and update
    /// CR0 from the result.
    pub fn is_record_form(&self) -> bool {
        self.name.contains('.')
    }
}

/// External decoder for raw instruction words. Returns None when the word
/// does not decode; the emitter comments it out instead of aborting.
pub trait Disassembler {
    fn disassemble(&self, word: u32, addr: u32) -> Option<Instruction>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_displacements() {
        // b +0x100
        assert_eq!(b_displacement(0x4800_0100), 0x100);
        // b -4
        assert_eq!(b_displacement(0x4BFF_FFFC), -4);
        // bc forward/backward
        assert_eq!(bc_displacement(0x4182_0010), 0x10);
        assert_eq!(bc_displacement(0x4082_FFF0), -0x10);
    }

    #[test]
    fn test_bl_detection() {
        assert!(is_bl(0x4800_0101)); // bl +0x100
        assert!(!is_bl(0x4800_0100)); // b +0x100
        assert!(!is_bl(0x4182_0011)); // bc with LK is not bl
    }

    #[test]
    fn test_mtctr_pattern() {
        // mtctr r12 = 0x7D8903A6
        assert_eq!(0x7D89_03A6 & MTCTR_MASK, MTCTR_OPCODE);
        assert_ne!(0x7D89_03A7 & MTCTR_MASK, MTCTR_OPCODE);
    }

    #[test]
    fn test_record_form() {
        let insn = Instruction::new(Opcode::Add, [0; 5]).with_name("add.");
        assert!(insn.is_record_form());
        let insn = Instruction::new(Opcode::Add, [0; 5]);
        assert!(!insn.is_record_form());
        // andi. is always record form
        let insn = Instruction::new(Opcode::Andi, [0; 5]);
        assert!(insn.is_record_form());
    }
}
