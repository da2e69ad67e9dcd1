//! Bump allocator used by sections to lay out their fields

use crate::error::{FlashError, Result};

/// Round `value` up to `alignment`, which must be a power of two
pub fn align_up(value: u64, alignment: u64) -> u64 {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

/// Check that an alignment is a non-zero power of two
pub fn check_alignment(what: &'static str, value: u64) -> Result<u64> {
    if value.is_power_of_two() {
        Ok(value)
    } else {
        Err(FlashError::InvalidAlignment { what, value })
    }
}

/// Offset allocator scoped to the content declaration of one section
///
/// The allocator starts at the (aligned) section offset. Section kinds
/// reserve room for each of their fields with [`alloc`](Self::alloc) and
/// insert padding with [`align`](Self::align); the final cursor position
/// gives the natural size of the section.
#[derive(Debug, Clone)]
pub struct SectionAllocator {
    start: u64,
    cursor: u64,
}

impl SectionAllocator {
    /// Create an allocator starting at the given absolute offset
    pub fn new(start: u64) -> Self {
        Self {
            start,
            cursor: start,
        }
    }

    /// Reserve `size` bytes, returning the absolute offset of the allocation
    pub fn alloc(&mut self, size: u64) -> u64 {
        let offset = self.cursor;
        self.cursor += size;
        offset
    }

    /// Align the cursor, returning the number of padding bytes inserted
    pub fn align(&mut self, alignment: u64) -> Result<u64> {
        let alignment = check_alignment("content", alignment)?;
        let aligned = align_up(self.cursor, alignment);
        let padding = aligned - self.cursor;
        self.cursor = aligned;
        Ok(padding)
    }

    /// Absolute offset of the next allocation
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Number of bytes allocated so far, padding included
    pub fn allocated(&self) -> u64 {
        self.cursor - self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 0x1000), 0);
        assert_eq!(align_up(1, 0x1000), 0x1000);
        assert_eq!(align_up(0x1000, 0x1000), 0x1000);
        assert_eq!(align_up(0x1001, 4), 0x1004);
    }

    #[test]
    fn test_alloc_and_align() {
        let mut alloc = SectionAllocator::new(0x100);
        assert_eq!(alloc.alloc(3), 0x100);
        assert_eq!(alloc.align(4).unwrap(), 1);
        assert_eq!(alloc.alloc(8), 0x104);
        assert_eq!(alloc.align(4).unwrap(), 0);
        assert_eq!(alloc.cursor(), 0x10C);
        assert_eq!(alloc.allocated(), 0xC);
    }

    #[test]
    fn test_align_rejects_non_power_of_two() {
        let mut alloc = SectionAllocator::new(0);
        assert!(matches!(
            alloc.align(3),
            Err(FlashError::InvalidAlignment { value: 3, .. })
        ));
        assert!(alloc.align(0).is_err());
    }
}
