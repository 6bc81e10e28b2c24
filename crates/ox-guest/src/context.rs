//! PPC register file and per-register views

use std::ffi::c_void;

/// One 64-bit general purpose (or FP) register with byte-swap aware
/// sub-lane views.
///
/// GPRs are always 64-bit; 32-bit instructions update the low half through
/// the `u32`/`s32` views and sign-extend through `set_s64` where the
/// architecture requires it. FPRs reuse the same storage with the `f64`
/// view (and the `f32` reinterpret view used by single-precision loads).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(transparent)]
pub struct PpcRegister(u64);

impl PpcRegister {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn u64(self) -> u64 {
        self.0
    }
    #[inline]
    pub fn u32(self) -> u32 {
        self.0 as u32
    }
    #[inline]
    pub fn u16(self) -> u16 {
        self.0 as u16
    }
    #[inline]
    pub fn u8(self) -> u8 {
        self.0 as u8
    }
    #[inline]
    pub fn s64(self) -> i64 {
        self.0 as i64
    }
    #[inline]
    pub fn s32(self) -> i32 {
        self.0 as i32
    }
    #[inline]
    pub fn s16(self) -> i16 {
        self.0 as i16
    }
    #[inline]
    pub fn s8(self) -> i8 {
        self.0 as i8
    }
    #[inline]
    pub fn f64(self) -> f64 {
        f64::from_bits(self.0)
    }
    /// Low 32 bits reinterpreted as a float.
    #[inline]
    pub fn f32(self) -> f32 {
        f32::from_bits(self.0 as u32)
    }

    #[inline]
    pub fn set_u64(&mut self, value: u64) {
        self.0 = value;
    }
    /// Writes the low word and clears the high word.
    #[inline]
    pub fn set_u32(&mut self, value: u32) {
        self.0 = value as u64;
    }
    /// Sign-extends into the full register.
    #[inline]
    pub fn set_s64(&mut self, value: i64) {
        self.0 = value as u64;
    }
    #[inline]
    pub fn set_s32(&mut self, value: i32) {
        self.0 = value as i64 as u64;
    }
    #[inline]
    pub fn set_f64(&mut self, value: f64) {
        self.0 = value.to_bits();
    }
    #[inline]
    pub fn set_f32(&mut self, value: f32) {
        self.0 = value.to_bits() as u64;
    }
}

/// One 4-bit condition register field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct CrField {
    pub lt: u8,
    pub gt: u8,
    pub eq: u8,
    pub so: u8,
}

impl CrField {
    /// Set lt/gt/eq from an ordered comparison and mirror XER summary
    /// overflow into so.
    #[inline]
    pub fn compare<T: PartialOrd>(&mut self, lhs: T, rhs: T, xer: &Xer) {
        self.lt = (lhs < rhs) as u8;
        self.gt = (lhs > rhs) as u8;
        self.eq = (lhs == rhs) as u8;
        self.so = xer.so;
    }

    /// Packed field value, lt in bit 3 down to so in bit 0.
    pub fn raw(self) -> u32 {
        ((self.lt as u32) << 3) | ((self.gt as u32) << 2) | ((self.eq as u32) << 1) | self.so as u32
    }

    pub fn set_raw(&mut self, value: u32) {
        self.lt = ((value >> 3) & 1) as u8;
        self.gt = ((value >> 2) & 1) as u8;
        self.eq = ((value >> 1) & 1) as u8;
        self.so = (value & 1) as u8;
    }

    /// Read a bit by its position within the field (0=lt..3=so).
    pub fn bit(self, index: u32) -> bool {
        match index & 3 {
            0 => self.lt != 0,
            1 => self.gt != 0,
            2 => self.eq != 0,
            _ => self.so != 0,
        }
    }

    pub fn set_bit(&mut self, index: u32, value: bool) {
        let value = value as u8;
        match index & 3 {
            0 => self.lt = value,
            1 => self.gt = value,
            2 => self.eq = value,
            _ => self.so = value,
        }
    }
}

/// XER carry/overflow flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct Xer {
    pub so: u8,
    pub ov: u8,
    pub ca: u8,
}

impl Xer {
    /// Packed SPR encoding (so bit 31, ov bit 30, ca bit 29).
    pub fn raw(self) -> u64 {
        ((self.so as u64) << 31) | ((self.ov as u64) << 30) | ((self.ca as u64) << 29)
    }

    pub fn set_raw(&mut self, value: u64) {
        self.so = ((value >> 31) & 1) as u8;
        self.ov = ((value >> 30) & 1) as u8;
        self.ca = ((value >> 29) & 1) as u8;
    }
}

/// FP status and control register.
///
/// Only the control portion matters to recompiled code: the rounding mode
/// and the non-IEEE (flush-to-zero) bit toggled around VMX sections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct Fpscr {
    pub csr: u32,
}

impl Fpscr {
    const NI_BIT: u32 = 1 << 2;

    /// Reset to the state guest threads start in: round-to-nearest, all FP
    /// exceptions masked.
    pub fn init_host(&mut self) {
        self.csr = 0;
    }

    pub fn enable_flush_mode(&mut self) {
        self.csr |= Self::NI_BIT;
    }

    pub fn disable_flush_mode(&mut self) {
        self.csr &= !Self::NI_BIT;
    }

    pub fn flush_mode(&self) -> bool {
        self.csr & Self::NI_BIT != 0
    }
}

/// One 128-bit vector register.
///
/// Lane order in host storage is the reverse of guest byte order (the
/// "full reversal" the vector builders account for); the lane accessors
/// here index host storage directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C, align(16))]
pub struct VRegister {
    pub bytes: [u8; 16],
}

impl VRegister {
    pub fn u8_lane(&self, lane: usize) -> u8 {
        self.bytes[lane]
    }

    pub fn u16_lane(&self, lane: usize) -> u16 {
        u16::from_ne_bytes(self.bytes[lane * 2..lane * 2 + 2].try_into().unwrap())
    }

    pub fn u32_lane(&self, lane: usize) -> u32 {
        u32::from_ne_bytes(self.bytes[lane * 4..lane * 4 + 4].try_into().unwrap())
    }

    pub fn f32_lane(&self, lane: usize) -> f32 {
        f32::from_bits(self.u32_lane(lane))
    }

    pub fn set_u32_lane(&mut self, lane: usize, value: u32) {
        self.bytes[lane * 4..lane * 4 + 4].copy_from_slice(&value.to_ne_bytes());
    }

    pub fn set_f32_lane(&mut self, lane: usize, value: f32) {
        self.set_u32_lane(lane, value.to_bits());
    }
}

/// The guest register file passed by reference to every recompiled
/// function.
///
/// Fixed shape, no heap. The companion `base` pointer of the ABI supplies
/// the guest virtual membase for the memory macros; it is not stored here.
#[derive(Clone)]
#[repr(C)]
pub struct PpcContext {
    pub r: [PpcRegister; 32],
    pub f: [PpcRegister; 32],
    pub v: [VRegister; 128],
    pub cr: [CrField; 8],
    pub xer: Xer,
    pub ctr: PpcRegister,
    pub lr: u64,
    pub fpscr: Fpscr,
    pub msr: u64,
    /// VSCR saturation sticky bit.
    pub vscr_sat: u8,
    /// Per-thread load-and-reserve value for stwcx./stdcx.
    pub reserved: PpcRegister,
    /// Back-pointer to the owning kernel state, for import thunks.
    pub kernel_state: *mut c_void,
}

impl Default for PpcContext {
    fn default() -> Self {
        Self {
            r: [PpcRegister::default(); 32],
            f: [PpcRegister::default(); 32],
            v: [VRegister::default(); 128],
            cr: [CrField::default(); 8],
            xer: Xer::default(),
            ctr: PpcRegister::default(),
            lr: 0,
            fpscr: Fpscr::default(),
            msr: 0,
            vscr_sat: 0,
            reserved: PpcRegister::default(),
            kernel_state: std::ptr::null_mut(),
        }
    }
}

// The context is owned by exactly one guest thread; the raw kernel_state
// pointer is only dereferenced by import thunks on that thread.
unsafe impl Send for PpcContext {}

/// Recompiled function entry point: `void f(PPCContext& ctx, uint8_t* base)`.
pub type PpcFunc = extern "C" fn(ctx: &mut PpcContext, base: *mut u8);

/// One row of the generated function mapping table. A zero `guest` address
/// terminates the table.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct PpcFuncMapping {
    pub guest: u32,
    pub host: Option<PpcFunc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_views() {
        let mut reg = PpcRegister::default();
        reg.set_s64(-1);
        assert_eq!(reg.u64(), 0xFFFF_FFFF_FFFF_FFFF);
        assert_eq!(reg.s32(), -1);

        reg.set_u32(0xAABB_CCDD);
        assert_eq!(reg.u64(), 0xAABB_CCDD);
        assert_eq!(reg.u16(), 0xCCDD);
        assert_eq!(reg.u8(), 0xDD);
        assert_eq!(reg.s16(), -0x3323);
    }

    #[test]
    fn test_register_float_views() {
        let mut reg = PpcRegister::default();
        reg.set_f64(1.5);
        assert_eq!(reg.f64(), 1.5);

        reg.set_f32(2.0);
        assert_eq!(reg.f32(), 2.0);
        assert_eq!(reg.u32(), 2.0f32.to_bits());
    }

    #[test]
    fn test_cr_compare_signed() {
        let mut cr = CrField::default();
        let xer = Xer {
            so: 1,
            ..Default::default()
        };

        cr.compare::<i32>(7, 5, &xer);
        assert_eq!((cr.lt, cr.gt, cr.eq, cr.so), (0, 1, 0, 1));

        cr.compare::<i32>(-3, 5, &Xer::default());
        assert_eq!((cr.lt, cr.gt, cr.eq, cr.so), (1, 0, 0, 0));

        cr.compare::<u32>(0xFFFF_FFFF, 5, &Xer::default());
        assert_eq!((cr.lt, cr.gt, cr.eq, cr.so), (0, 1, 0, 0));
    }

    #[test]
    fn test_cr_raw_round_trip() {
        let mut cr = CrField::default();
        cr.set_raw(0b1010);
        assert_eq!((cr.lt, cr.gt, cr.eq, cr.so), (1, 0, 1, 0));
        assert_eq!(cr.raw(), 0b1010);
    }

    #[test]
    fn test_vr_lanes() {
        let mut vr = VRegister::default();
        vr.set_u32_lane(0, 0x1122_3344);
        vr.set_u32_lane(3, 0xAABB_CCDD);
        assert_eq!(vr.u32_lane(0), 0x1122_3344);
        assert_eq!(vr.u32_lane(3), 0xAABB_CCDD);

        vr.set_f32_lane(1, 4.0);
        assert_eq!(vr.f32_lane(1), 4.0);
    }

    #[test]
    fn test_zeroed_context() {
        let ctx = PpcContext::default();
        assert_eq!(ctx.r[1].u64(), 0);
        assert_eq!(ctx.cr[0].raw(), 0);
        assert!(!ctx.fpscr.flush_mode());
    }
}
