//! Host function table for recompiled guest code

use parking_lot::RwLock;

use ox_guest::{PpcFunc, PpcFuncMapping};

/// Guest-address to host-function dispatch table covering the code range.
///
/// Lookup is a direct index: `(addr - code_base) / 4`. Populated from the
/// generated zero-terminated mapping table at startup.
pub struct Processor {
    code_base: u32,
    functions: RwLock<Vec<Option<PpcFunc>>>,
}

impl Processor {
    pub fn new(code_base: u32, code_size: u32) -> Self {
        Self {
            code_base,
            functions: RwLock::new(vec![None; (code_size / 4) as usize]),
        }
    }

    fn index(&self, addr: u32) -> Option<usize> {
        if addr < self.code_base || addr % 4 != 0 {
            return None;
        }
        Some(((addr - self.code_base) / 4) as usize)
    }

    pub fn set_function(&self, addr: u32, func: PpcFunc) -> bool {
        match self.index(addr) {
            Some(index) => {
                let mut functions = self.functions.write();
                if index >= functions.len() {
                    return false;
                }
                functions[index] = Some(func);
                true
            }
            None => false,
        }
    }

    pub fn get_function(&self, addr: u32) -> Option<PpcFunc> {
        let index = self.index(addr)?;
        self.functions.read().get(index).copied().flatten()
    }

    /// Register every row of a generated mapping table; a zero guest
    /// address terminates the table.
    pub fn register_mappings(&self, mappings: &[PpcFuncMapping]) -> usize {
        let mut count = 0;
        for mapping in mappings {
            if mapping.guest == 0 {
                break;
            }
            if let Some(host) = mapping.host {
                if self.set_function(mapping.guest, host) {
                    count += 1;
                }
            }
        }
        tracing::debug!(target: "kernel", "Registered {} recompiled functions", count);
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ox_guest::PpcContext;

    extern "C" fn stub(_ctx: &mut PpcContext, _base: *mut u8) {}

    #[test]
    fn test_set_and_get() {
        let processor = Processor::new(0x8200_0000, 0x1000);
        assert!(processor.set_function(0x8200_0010, stub));
        assert!(processor.get_function(0x8200_0010).is_some());
        assert!(processor.get_function(0x8200_0014).is_none());
    }

    #[test]
    fn test_out_of_range_rejected() {
        let processor = Processor::new(0x8200_0000, 0x100);
        assert!(!processor.set_function(0x8100_0000, stub));
        assert!(!processor.set_function(0x8200_0200, stub));
        assert!(!processor.set_function(0x8200_0002, stub));
    }

    #[test]
    fn test_mapping_table_is_zero_terminated() {
        let processor = Processor::new(0x8200_0000, 0x1000);
        let mappings = [
            PpcFuncMapping {
                guest: 0x8200_0000,
                host: Some(stub as _),
            },
            PpcFuncMapping {
                guest: 0,
                host: None,
            },
            PpcFuncMapping {
                guest: 0x8200_0008,
                host: Some(stub as _),
            },
        ];
        assert_eq!(processor.register_mappings(&mappings), 1);
        assert!(processor.get_function(0x8200_0008).is_none());
    }
}
