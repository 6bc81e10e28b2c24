//! Guest memory map constants

/// Standard page size (4 KB)
pub const PAGE_SIZE: u32 = 0x1000;

/// Default size of the backed guest address space (256 MB)
pub const DEFAULT_MEMORY_SIZE: u32 = 0x1000_0000;

/// System heap base address
pub const SYSTEM_HEAP_BASE: u32 = 0x0400_0000;
/// System heap size (32 MB)
pub const SYSTEM_HEAP_SIZE: u32 = 0x0200_0000;

/// Thread stack allocation range
pub const STACK_RANGE_BEGIN: u32 = 0x0800_0000;
pub const STACK_RANGE_END: u32 = 0x0FF0_0000;
