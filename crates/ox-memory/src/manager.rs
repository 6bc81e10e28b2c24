//! Guest address space manager

use std::cell::UnsafeCell;

use parking_lot::Mutex;
use thiserror::Error;

use crate::constants::{
    DEFAULT_MEMORY_SIZE, PAGE_SIZE, STACK_RANGE_BEGIN, STACK_RANGE_END, SYSTEM_HEAP_BASE,
    SYSTEM_HEAP_SIZE,
};
use crate::heap::RangeHeap;
use crate::pages::PageFlags;

/// Errors raised by guest memory accesses
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoryError {
    #[error("guest address {addr:#010x} (+{len}) out of range")]
    OutOfRange { addr: u32, len: u32 },

    #[error("access violation at guest address {addr:#010x}")]
    AccessViolation { addr: u32 },
}

/// The guest 32-bit address space.
///
/// Backed by one host allocation; page flags are bookkeeping only (there is
/// no host page protection behind them), but every typed accessor checks
/// them so guard-page hits surface as [`MemoryError::AccessViolation`].
pub struct GuestMemory {
    storage: UnsafeCell<Box<[u8]>>,
    size: u32,
    page_flags: Mutex<Vec<PageFlags>>,
    system_heap: Mutex<RangeHeap>,
    stack_heap: Mutex<RangeHeap>,
}

// Guest memory is shared between guest threads exactly like physical RAM;
// racing guest accesses are the guest's own data races, not ours.
unsafe impl Send for GuestMemory {}
unsafe impl Sync for GuestMemory {}

impl GuestMemory {
    pub fn new(size: u32) -> Self {
        assert!(size >= SYSTEM_HEAP_BASE + SYSTEM_HEAP_SIZE);
        let pages = (size / PAGE_SIZE) as usize;
        let stack_end = STACK_RANGE_END.min(size);
        Self {
            storage: UnsafeCell::new(vec![0u8; size as usize].into_boxed_slice()),
            size,
            page_flags: Mutex::new(vec![PageFlags::RW; pages]),
            system_heap: Mutex::new(RangeHeap::new(SYSTEM_HEAP_BASE, SYSTEM_HEAP_SIZE)),
            stack_heap: Mutex::new(RangeHeap::new(
                STACK_RANGE_BEGIN,
                stack_end - STACK_RANGE_BEGIN,
            )),
        }
    }

    pub fn with_default_size() -> Self {
        Self::new(DEFAULT_MEMORY_SIZE)
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Host pointer to guest address 0; the `base` argument of every
    /// recompiled function.
    pub fn membase(&self) -> *mut u8 {
        unsafe { (*self.storage.get()).as_mut_ptr() }
    }

    /// Translate a guest address to a host pointer without access checks.
    pub fn translate(&self, addr: u32) -> Result<*mut u8, MemoryError> {
        if addr >= self.size {
            return Err(MemoryError::OutOfRange { addr, len: 1 });
        }
        Ok(unsafe { self.membase().add(addr as usize) })
    }

    fn check(&self, addr: u32, len: u32, needs: PageFlags) -> Result<(), MemoryError> {
        let end = addr.checked_add(len).ok_or(MemoryError::OutOfRange { addr, len })?;
        if end > self.size {
            return Err(MemoryError::OutOfRange { addr, len });
        }
        let flags = self.page_flags.lock();
        let first = (addr / PAGE_SIZE) as usize;
        let last = ((end - 1) / PAGE_SIZE) as usize;
        for page in first..=last {
            if !flags[page].contains(needs) {
                return Err(MemoryError::AccessViolation {
                    addr: page as u32 * PAGE_SIZE,
                });
            }
        }
        Ok(())
    }

    /// Change the protection flags of a page-aligned range.
    pub fn protect(&self, addr: u32, size: u32, new_flags: PageFlags) {
        let mut flags = self.page_flags.lock();
        let first = (addr / PAGE_SIZE) as usize;
        let last = (((addr + size).saturating_sub(1)) / PAGE_SIZE) as usize;
        for page in first..=last.min(flags.len() - 1) {
            flags[page] = new_flags;
        }
    }

    pub fn read_u8(&self, addr: u32) -> Result<u8, MemoryError> {
        self.check(addr, 1, PageFlags::READ)?;
        Ok(unsafe { *self.membase().add(addr as usize) })
    }

    pub fn write_u8(&self, addr: u32, value: u8) -> Result<(), MemoryError> {
        self.check(addr, 1, PageFlags::WRITE)?;
        unsafe { *self.membase().add(addr as usize) = value };
        Ok(())
    }

    pub fn read_be16(&self, addr: u32) -> Result<u16, MemoryError> {
        self.check(addr, 2, PageFlags::READ)?;
        let mut bytes = [0u8; 2];
        unsafe {
            std::ptr::copy_nonoverlapping(self.membase().add(addr as usize), bytes.as_mut_ptr(), 2)
        };
        Ok(u16::from_be_bytes(bytes))
    }

    pub fn read_be32(&self, addr: u32) -> Result<u32, MemoryError> {
        self.check(addr, 4, PageFlags::READ)?;
        let mut bytes = [0u8; 4];
        unsafe {
            std::ptr::copy_nonoverlapping(self.membase().add(addr as usize), bytes.as_mut_ptr(), 4)
        };
        Ok(u32::from_be_bytes(bytes))
    }

    pub fn read_be64(&self, addr: u32) -> Result<u64, MemoryError> {
        self.check(addr, 8, PageFlags::READ)?;
        let mut bytes = [0u8; 8];
        unsafe {
            std::ptr::copy_nonoverlapping(self.membase().add(addr as usize), bytes.as_mut_ptr(), 8)
        };
        Ok(u64::from_be_bytes(bytes))
    }

    pub fn write_be16(&self, addr: u32, value: u16) -> Result<(), MemoryError> {
        self.check(addr, 2, PageFlags::WRITE)?;
        let bytes = value.to_be_bytes();
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), self.membase().add(addr as usize), 2)
        };
        Ok(())
    }

    pub fn write_be32(&self, addr: u32, value: u32) -> Result<(), MemoryError> {
        self.check(addr, 4, PageFlags::WRITE)?;
        let bytes = value.to_be_bytes();
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), self.membase().add(addr as usize), 4)
        };
        Ok(())
    }

    pub fn write_be64(&self, addr: u32, value: u64) -> Result<(), MemoryError> {
        self.check(addr, 8, PageFlags::WRITE)?;
        let bytes = value.to_be_bytes();
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), self.membase().add(addr as usize), 8)
        };
        Ok(())
    }

    /// Fill a range with a byte value, ignoring page flags (used for stack
    /// poisoning before guard pages are armed).
    pub fn fill(&self, addr: u32, len: u32, value: u8) -> Result<(), MemoryError> {
        let end = addr.checked_add(len).ok_or(MemoryError::OutOfRange { addr, len })?;
        if end > self.size {
            return Err(MemoryError::OutOfRange { addr, len });
        }
        unsafe { std::ptr::write_bytes(self.membase().add(addr as usize), value, len as usize) };
        Ok(())
    }

    pub fn copy(&self, dst: u32, src: u32, len: u32) -> Result<(), MemoryError> {
        self.check(src, len, PageFlags::READ)?;
        self.check(dst, len, PageFlags::WRITE)?;
        unsafe {
            std::ptr::copy(
                self.membase().add(src as usize),
                self.membase().add(dst as usize),
                len as usize,
            )
        };
        Ok(())
    }

    /// Allocate from the system heap (TLS blocks, PCR, APC nodes).
    /// Returns 0 on exhaustion, matching the guest convention.
    pub fn system_heap_alloc(&self, size: u32) -> u32 {
        match self.system_heap.lock().alloc(size, 16) {
            Some(addr) => addr,
            None => {
                tracing::warn!(target: "memory", "system heap exhausted ({} bytes)", size);
                0
            }
        }
    }

    pub fn system_heap_free(&self, addr: u32) {
        if addr != 0 {
            self.system_heap.lock().free(addr);
        }
    }

    /// Allocate a page-aligned block from the stack range.
    pub fn stack_alloc(&self, size: u32) -> Option<u32> {
        self.stack_heap.lock().alloc(size, PAGE_SIZE)
    }

    pub fn stack_free(&self, addr: u32) {
        self.stack_heap.lock().free(addr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::SYSTEM_HEAP_BASE;

    fn small_memory() -> GuestMemory {
        GuestMemory::new(DEFAULT_MEMORY_SIZE)
    }

    #[test]
    fn test_big_endian_round_trip() {
        let mem = small_memory();
        mem.write_be32(0x100, 0x1234_5678).unwrap();
        assert_eq!(mem.read_be32(0x100).unwrap(), 0x1234_5678);
        // PPC is big-endian: byte order in storage is MSB first.
        assert_eq!(mem.read_u8(0x100).unwrap(), 0x12);
        assert_eq!(mem.read_u8(0x103).unwrap(), 0x78);

        mem.write_be64(0x200, 0x1122_3344_5566_7788).unwrap();
        assert_eq!(mem.read_be64(0x200).unwrap(), 0x1122_3344_5566_7788);
    }

    #[test]
    fn test_out_of_range() {
        let mem = small_memory();
        let end = mem.size();
        assert!(matches!(
            mem.read_be32(end - 2),
            Err(MemoryError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_guard_page_faults() {
        let mem = small_memory();
        mem.protect(0x2000, PAGE_SIZE, PageFlags::NO_ACCESS);
        assert_eq!(
            mem.read_u8(0x2000),
            Err(MemoryError::AccessViolation { addr: 0x2000 })
        );
        assert_eq!(
            mem.write_be32(0x2FFC, 1),
            Err(MemoryError::AccessViolation { addr: 0x2000 })
        );
        mem.protect(0x2000, PAGE_SIZE, PageFlags::RW);
        assert!(mem.read_u8(0x2000).is_ok());
    }

    #[test]
    fn test_system_heap() {
        let mem = small_memory();
        let a = mem.system_heap_alloc(64);
        let b = mem.system_heap_alloc(64);
        assert!(a >= SYSTEM_HEAP_BASE);
        assert_ne!(a, b);
        mem.system_heap_free(a);
        mem.system_heap_free(b);
    }

    #[test]
    fn test_stack_alloc_page_aligned() {
        let mem = small_memory();
        let stack = mem.stack_alloc(0x4000).unwrap();
        assert_eq!(stack % PAGE_SIZE, 0);
        mem.stack_free(stack);
    }
}
