//! Guest virtual memory for the oxidized-xenon runtime
//!
//! A single flat 32-bit guest address space backed by host memory. All
//! recompiled code reaches it through the `base` pointer of the function
//! ABI; the kernel crate reaches it through the typed big-endian accessors
//! here.

pub mod constants;
pub mod heap;
pub mod manager;
pub mod pages;

pub use manager::{GuestMemory, MemoryError};
pub use pages::PageFlags;
