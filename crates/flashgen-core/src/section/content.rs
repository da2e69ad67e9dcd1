//! Content structures packed into section images

/// A structure stored inside a section
///
/// The packed bytes of all contents of a section, in order, form the
/// section image before padding.
pub trait Content {
    /// Serialize the structure
    fn pack(&self) -> Vec<u8>;

    /// Render the structure for the layout dump
    ///
    /// `level` is the remaining dump depth. Structures with nested fields
    /// should only expand them when it is greater than zero.
    fn describe(&self, level: usize) -> String;

    /// Packed size in bytes
    fn size(&self) -> u64 {
        self.pack().len() as u64
    }
}

/// Opaque chunk of bytes, typically the content of a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    /// Label shown in the layout dump
    pub name: String,
    /// Absolute flash offset of the blob
    pub offset: u64,
    /// Raw bytes
    pub data: Vec<u8>,
}

impl Blob {
    /// Create a blob located at `offset`
    pub fn new(name: impl Into<String>, offset: u64, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            offset,
            data,
        }
    }
}

impl Content for Blob {
    fn pack(&self) -> Vec<u8> {
        self.data.clone()
    }

    fn describe(&self, _level: usize) -> String {
        format!(
            "{} @ 0x{:x} (0x{:x} bytes)",
            self.name,
            self.offset,
            self.data.len()
        )
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Run of zero bytes inserted to honor an alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Padding {
    /// Number of bytes
    pub size: u64,
}

impl Content for Padding {
    fn pack(&self) -> Vec<u8> {
        vec![0; self.size as usize]
    }

    fn describe(&self, _level: usize) -> String {
        format!("padding (0x{:x} bytes)", self.size)
    }

    fn size(&self) -> u64 {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob() {
        let blob = Blob::new("app.bin", 0x1000, vec![1, 2, 3]);
        assert_eq!(blob.pack(), vec![1, 2, 3]);
        assert_eq!(blob.size(), 3);
        assert_eq!(blob.describe(0), "app.bin @ 0x1000 (0x3 bytes)");
    }

    #[test]
    fn test_padding() {
        let padding = Padding { size: 5 };
        assert_eq!(padding.pack(), vec![0; 5]);
    }
}
