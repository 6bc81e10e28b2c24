//! Guest CPU state for recompiled Xenon (PPC64) code
//!
//! The register file here is the runtime half of the recompiled-function
//! ABI: every generated function has the shape
//! `void name(PPCContext& ctx, uint8_t* base)`, and the kernel crate stages
//! a [`PpcContext`] before dispatching into the function table.

pub mod context;

pub use context::{
    CrField, Fpscr, PpcContext, PpcFunc, PpcFuncMapping, PpcRegister, VRegister, Xer,
};
