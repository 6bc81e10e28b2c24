//! Guest-memory linked list
//!
//! The APC queue lives in guest memory as a chain of list entries; each
//! entry is a big-endian flink pointer at offset 0. Append keeps FIFO
//! order. A zero flink terminates the chain.

use std::sync::Arc;

use ox_memory::GuestMemory;

pub struct NativeList {
    memory: Arc<GuestMemory>,
    head: u32,
}

impl NativeList {
    pub fn new(memory: Arc<GuestMemory>) -> Self {
        Self { memory, head: 0 }
    }

    pub fn head(&self) -> u32 {
        self.head
    }

    pub fn set_head(&mut self, head: u32) {
        self.head = head;
    }

    pub fn has_pending(&self) -> bool {
        self.head != 0
    }

    /// Append an entry at the tail.
    pub fn insert(&mut self, entry_ptr: u32) {
        let _ = self.memory.write_be32(entry_ptr, 0);
        if self.head == 0 {
            self.head = entry_ptr;
            return;
        }
        let mut cursor = self.head;
        loop {
            match self.memory.read_be32(cursor) {
                Ok(0) | Err(_) => break,
                Ok(next) => cursor = next,
            }
        }
        let _ = self.memory.write_be32(cursor, entry_ptr);
    }

    /// Pop the head entry; returns its guest address, 0 when empty.
    pub fn shift(&mut self) -> u32 {
        if self.head == 0 {
            return 0;
        }
        let entry = self.head;
        self.head = self.memory.read_be32(entry).unwrap_or(0);
        let _ = self.memory.write_be32(entry, 0);
        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let memory = Arc::new(GuestMemory::with_default_size());
        let mut list = NativeList::new(memory);

        assert!(!list.has_pending());
        list.insert(0x1000);
        list.insert(0x2000);
        list.insert(0x3000);
        assert!(list.has_pending());
        assert_eq!(list.head(), 0x1000);

        assert_eq!(list.shift(), 0x1000);
        assert_eq!(list.shift(), 0x2000);
        assert_eq!(list.shift(), 0x3000);
        assert_eq!(list.shift(), 0);
        assert!(!list.has_pending());
    }

    #[test]
    fn test_reinsert_after_shift() {
        let memory = Arc::new(GuestMemory::with_default_size());
        let mut list = NativeList::new(memory);
        list.insert(0x1000);
        assert_eq!(list.shift(), 0x1000);
        list.insert(0x1000);
        assert_eq!(list.head(), 0x1000);
        assert_eq!(list.shift(), 0x1000);
    }
}
