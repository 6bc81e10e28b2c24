//! In-memory view of the analyzed guest image

/// One mapped section of the guest image.
#[derive(Debug, Clone)]
pub struct Section {
    pub base_address: u32,
    pub size: u32,
    pub executable: bool,
}

/// The loaded guest image the emitter reads instruction words from.
///
/// Produced by the external loader/analysis stage; `data` covers the whole
/// image starting at `base_address`.
#[derive(Debug, Clone)]
pub struct BinaryImage {
    pub base_address: u32,
    pub data: Vec<u8>,
    pub sections: Vec<Section>,
}

impl BinaryImage {
    pub fn image_size(&self) -> u32 {
        self.data.len() as u32
    }

    /// Slice of the image starting at a guest virtual address.
    pub fn translate(&self, addr: u32) -> Option<&[u8]> {
        let offset = addr.checked_sub(self.base_address)? as usize;
        self.data.get(offset..)
    }

    /// Big-endian instruction word at a guest address.
    pub fn read_word(&self, addr: u32) -> Option<u32> {
        let bytes = self.translate(addr)?;
        Some(u32::from_be_bytes(bytes.get(..4)?.try_into().ok()?))
    }

    /// Bounds of the executable sections: (code_min, code_max).
    pub fn code_bounds(&self) -> (u32, u32) {
        let mut code_min = u32::MAX;
        let mut code_max = 0;
        for section in &self.sections {
            if section.executable {
                code_min = code_min.min(section.base_address);
                code_max = code_max.max(section.base_address + section.size);
            }
        }
        (code_min, code_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> BinaryImage {
        BinaryImage {
            base_address: 0x8200_0000,
            data: vec![0x48, 0x00, 0x01, 0x00, 0xAA, 0xBB, 0xCC, 0xDD],
            sections: vec![
                Section {
                    base_address: 0x8200_0000,
                    size: 8,
                    executable: true,
                },
                Section {
                    base_address: 0x8300_0000,
                    size: 0x100,
                    executable: false,
                },
            ],
        }
    }

    #[test]
    fn test_read_word() {
        let image = image();
        assert_eq!(image.read_word(0x8200_0000), Some(0x4800_0100));
        assert_eq!(image.read_word(0x8200_0004), Some(0xAABB_CCDD));
        assert_eq!(image.read_word(0x8200_0008), None);
        assert_eq!(image.read_word(0x8100_0000), None);
    }

    #[test]
    fn test_code_bounds() {
        let (code_min, code_max) = image().code_bounds();
        assert_eq!(code_min, 0x8200_0000);
        assert_eq!(code_max, 0x8200_0008);
    }
}
