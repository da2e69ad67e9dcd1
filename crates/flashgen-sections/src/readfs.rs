//! Read-only file system
//!
//! The section starts with a header and a table giving the absolute flash
//! offset and the size of every file, followed by the file data:
//!
//! ```text
//! +--------------------+
//! | header (8 bytes)   |  magic "RDFS", file count
//! +--------------------+
//! | entry 0 (64 bytes) |  offset, size, NUL-terminated name
//! | ...                |
//! +--------------------+
//! | file 0 data        |  each aligned on file_align
//! | ...                |
//! +--------------------+
//! ```

use std::mem::size_of;
use std::path::Path;

use flashgen_core::property::{PropertyRegistry, PropertyValue};
use flashgen_core::section::{
    check_alignment, Blob, Content, Padding, SectionAllocator, SectionContext, SectionKind,
};
use flashgen_core::{FlashError, Result};
use zerocopy::byteorder::{LittleEndian, U32};
use zerocopy::{Immutable, IntoBytes, KnownLayout};

use crate::{field_name, field_u32, name_field, read_file, Record, RecordBlock, PARTITION_TYPE_DATA};

/// Template id
pub const TEMPLATE: &str = "readfs";

/// Partition subtype of read-only file systems
pub const PARTITION_SUBTYPE_READFS: u8 = 0x81;

/// Header magic
pub const READFS_MAGIC: [u8; 4] = *b"RDFS";

/// Size of the name field of an entry, terminator included
pub const FILE_NAME_LEN: usize = 56;

/// Default alignment of file data
pub const DEFAULT_FILE_ALIGN: i64 = 4;

/// File system header
#[repr(C)]
#[derive(Debug, Clone, Copy, IntoBytes, Immutable, KnownLayout)]
pub struct ReadFsHeader {
    pub magic: [u8; 4],
    pub count: U32<LittleEndian>,
}

/// One file of the table
#[repr(C)]
#[derive(Debug, Clone, Copy, IntoBytes, Immutable, KnownLayout)]
pub struct ReadFsEntry {
    /// Absolute flash offset of the data
    pub offset: U32<LittleEndian>,
    pub size: U32<LittleEndian>,
    pub name: [u8; FILE_NAME_LEN],
}

impl Record for ReadFsHeader {
    fn describe(&self) -> String {
        format!("{} files", self.count.get())
    }
}

impl Record for ReadFsEntry {
    fn describe(&self) -> String {
        format!(
            "{} @ 0x{:x} (0x{:x} bytes)",
            field_name(&self.name),
            self.offset.get(),
            self.size.get()
        )
    }
}

/// Read-only file system section
pub struct ReadFs {
    name: String,
    items: Vec<Box<dyn Content>>,
    file_count: usize,
}

/// Template factory
pub fn create(ctx: &SectionContext<'_>) -> Result<Box<dyn SectionKind>> {
    Ok(Box::new(ReadFs {
        name: ctx.name.to_string(),
        items: Vec::new(),
        file_count: 0,
    }))
}

impl ReadFs {
    fn file_paths(properties: &PropertyRegistry) -> Result<Vec<String>> {
        properties
            .get_list("files")?
            .into_iter()
            .map(|item| match item {
                PropertyValue::Str(path) => Ok(path),
                other => Err(FlashError::InvalidPropertyValue {
                    owner: properties.owner().to_string(),
                    property: "files".to_string(),
                    expected: "list of file paths",
                    found: other.to_string(),
                }),
            })
            .collect()
    }

    fn entry_name(properties: &PropertyRegistry, path: &str) -> Result<[u8; FILE_NAME_LEN]> {
        let name = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string());
        name_field(&name).ok_or_else(|| FlashError::InvalidPropertyValue {
            owner: properties.owner().to_string(),
            property: "files".to_string(),
            expected: "file names shorter than 56 bytes",
            found: name,
        })
    }
}

impl SectionKind for ReadFs {
    fn declare_properties(&self, properties: &mut PropertyRegistry) -> Result<()> {
        properties.declare("files", PropertyValue::Null, "List of files to include.")?;
        properties.declare(
            "file_align",
            DEFAULT_FILE_ALIGN,
            "Alignment of the data of each file.",
        )
    }

    fn declare_content(
        &mut self,
        properties: &PropertyRegistry,
        alloc: &mut SectionAllocator,
    ) -> Result<()> {
        let paths = Self::file_paths(properties)?;
        let file_align = properties.get_int("file_align")?.unwrap_or(DEFAULT_FILE_ALIGN);
        let file_align = check_alignment("readfs file", u64::try_from(file_align).unwrap_or(0))?;

        let header = ReadFsHeader {
            magic: READFS_MAGIC,
            count: field_u32(&self.name, "count", paths.len() as u64)?,
        };
        let header = RecordBlock::new("readfs header", alloc, vec![header]);

        // Reserve the table first, entries are filled as data gets placed
        let table_offset = alloc.alloc((size_of::<ReadFsEntry>() * paths.len()) as u64);

        let mut entries = Vec::with_capacity(paths.len());
        let mut files: Vec<Box<dyn Content>> = Vec::new();
        for path in &paths {
            let name = Self::entry_name(properties, path)?;
            let data = read_file(path)?;

            let padding = alloc.align(file_align)?;
            if padding > 0 {
                files.push(Box::new(Padding { size: padding }));
            }
            let offset = alloc.alloc(data.len() as u64);

            entries.push(ReadFsEntry {
                offset: field_u32(&self.name, "offset", offset)?,
                size: field_u32(&self.name, "size", data.len() as u64)?,
                name,
            });
            files.push(Box::new(Blob::new(field_name(&name), offset, data)));
        }

        let table = RecordBlock::at("readfs table", table_offset, entries);

        self.file_count = paths.len();
        self.items = vec![Box::new(header), Box::new(table)];
        self.items.extend(files);
        Ok(())
    }

    fn contents(&self) -> Vec<&dyn Content> {
        self.items.iter().map(|c| c.as_ref()).collect()
    }

    fn is_empty(&self) -> bool {
        self.file_count == 0
    }

    fn partition_type(&self) -> u8 {
        PARTITION_TYPE_DATA
    }

    fn partition_subtype(&self) -> u8 {
        PARTITION_SUBTYPE_READFS
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use flashgen_core::{Flash, FlashAttributes, FlashContent, PropertyOverrides, SectionDescriptor};

    fn u32_at(data: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn test_record_sizes() {
        assert_eq!(size_of::<ReadFsHeader>(), 8);
        assert_eq!(size_of::<ReadFsEntry>(), 64);
    }

    #[test]
    fn test_readfs_image() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        fs::write(&a, [0x11u8; 3]).unwrap();
        fs::write(&b, [0x22u8; 5]).unwrap();

        let mut flash = Flash::new("flash", 0x1000, FlashAttributes::default()).unwrap();
        crate::register_all(&mut flash).unwrap();
        flash.set_content(FlashContent::new(vec![
            SectionDescriptor::new("boot", "reserved").with_property("size", 0x10i64),
            SectionDescriptor::new("fs", "readfs")
                .with_property("files", vec![a.to_str().unwrap(), b.to_str().unwrap()]),
        ]));

        let section = flash.section_by_name("fs").unwrap().unwrap();
        assert_eq!(section.offset(), 0x10);
        // header + 2 entries, 3 bytes, 1 byte of padding, 5 bytes
        assert_eq!(section.size(), 8 + 2 * 64 + 3 + 1 + 5);
        assert!(!section.is_empty());

        let image = section.image().unwrap();
        assert_eq!(&image[..4], b"RDFS");
        assert_eq!(u32_at(&image, 4), 2);

        // First entry points to the data right after the table
        assert_eq!(u32_at(&image, 8), 0x10 + 8 + 128);
        assert_eq!(u32_at(&image, 12), 3);
        assert_eq!(&image[16..22], b"a.bin\0");

        // Second entry is aligned on 4 bytes
        assert_eq!(u32_at(&image, 72), 0x10 + 8 + 128 + 4);
        assert_eq!(u32_at(&image, 76), 5);

        assert_eq!(&image[136..139], &[0x11; 3]);
        assert_eq!(image[139], 0);
        assert_eq!(&image[140..145], &[0x22; 5]);
    }

    #[test]
    fn test_files_appended_by_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        fs::write(&a, [1u8; 4]).unwrap();
        fs::write(&b, [2u8; 4]).unwrap();

        let mut flash = Flash::new("flash", 0x1000, FlashAttributes::default()).unwrap();
        crate::register_all(&mut flash).unwrap();
        flash.set_content(FlashContent::new(vec![SectionDescriptor::new("fs", "readfs")
            .with_property("files", vec![a.to_str().unwrap()])]));

        let mut overrides = PropertyOverrides::new();
        overrides.add("fs", "files", b.to_str().unwrap());
        flash.set_overrides(overrides);

        let section = flash.section_by_name("fs").unwrap().unwrap();
        assert_eq!(section.size(), 8 + 2 * 64 + 4 + 4);
        let table = section.dump_table(1);
        assert!(table.contains("a.bin @"));
        assert!(table.contains("b.bin @"));
    }

    #[test]
    fn test_empty_readfs() {
        let mut flash = Flash::new("flash", 0x1000, FlashAttributes::default()).unwrap();
        crate::register_all(&mut flash).unwrap();
        flash.set_content(FlashContent::new(vec![SectionDescriptor::new("fs", "readfs")]));

        let section = flash.section_by_name("fs").unwrap().unwrap();
        assert!(section.is_empty());
        assert_eq!(section.image().unwrap(), b"RDFS\0\0\0\0".to_vec());
    }

    #[test]
    fn test_invalid_file_align() {
        let mut flash = Flash::new("flash", 0x1000, FlashAttributes::default()).unwrap();
        crate::register_all(&mut flash).unwrap();
        flash.set_content(FlashContent::new(vec![
            SectionDescriptor::new("fs", "readfs").with_property("file_align", 3i64),
        ]));

        assert!(matches!(
            flash.sections(),
            Err(FlashError::InvalidAlignment { value: 3, .. })
        ));
    }
}
