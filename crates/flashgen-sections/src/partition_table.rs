//! Partition table
//!
//! Lists the sections of the flash so that the firmware can find them at
//! runtime. The table size only depends on the number of sections, so it is
//! allocated during content declaration and filled in once every section
//! has been placed.

use std::mem::size_of;

use flashgen_core::property::PropertyRegistry;
use flashgen_core::section::{
    Content, FinalizeContext, SectionAllocator, SectionContext, SectionKind,
};
use flashgen_core::{FlashError, Result};
use zerocopy::byteorder::{LittleEndian, U16, U32};
use zerocopy::{Immutable, IntoBytes, KnownLayout};

use crate::{field_name, field_u32, name_field, Record, RecordBlock, PARTITION_TYPE_DATA};

/// Template id
pub const TEMPLATE: &str = "partition-table";

/// Partition subtype of the partition table itself
pub const PARTITION_SUBTYPE_TABLE: u8 = 0x02;

/// Header magic
pub const PARTITION_TABLE_MAGIC: [u8; 4] = *b"PTBL";

/// Size of the name field of an entry, terminator included
pub const PARTITION_NAME_LEN: usize = 20;

/// Entry flag set once the section has been placed in the layout
pub const FLAG_PLACED: u16 = 1 << 0;

#[repr(C)]
#[derive(Debug, Clone, Copy, IntoBytes, Immutable, KnownLayout)]
pub struct PartitionTableHeader {
    pub magic: [u8; 4],
    pub version: U32<LittleEndian>,
    pub count: U32<LittleEndian>,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, IntoBytes, Immutable, KnownLayout)]
pub struct PartitionEntry {
    pub partition_type: u8,
    pub partition_subtype: u8,
    pub flags: U16<LittleEndian>,
    pub offset: U32<LittleEndian>,
    pub size: U32<LittleEndian>,
    pub name: [u8; PARTITION_NAME_LEN],
}

impl PartitionEntry {
    fn new(name: &str) -> Self {
        let name = name_field(name).unwrap_or_else(|| {
            log::warn!(
                "Section name '{}' truncated to {} bytes in partition table",
                name,
                PARTITION_NAME_LEN - 1
            );
            let mut field = [0u8; PARTITION_NAME_LEN];
            field[..PARTITION_NAME_LEN - 1]
                .copy_from_slice(&name.as_bytes()[..PARTITION_NAME_LEN - 1]);
            field
        });

        Self {
            partition_type: 0,
            partition_subtype: 0,
            flags: U16::new(0),
            offset: U32::new(0),
            size: U32::new(0),
            name,
        }
    }
}

impl Record for PartitionTableHeader {
    fn describe(&self) -> String {
        format!("version {}, {} entries", self.version.get(), self.count.get())
    }
}

impl Record for PartitionEntry {
    fn describe(&self) -> String {
        format!(
            "{}: 0x{:x} (0x{:x} bytes) type 0x{:02x}/0x{:02x}",
            field_name(&self.name),
            self.offset.get(),
            self.size.get(),
            self.partition_type,
            self.partition_subtype
        )
    }
}

/// Partition table section
pub struct PartitionTable {
    name: String,
    sections: Vec<String>,
    listed: Vec<String>,
    header: Option<RecordBlock<PartitionTableHeader>>,
    entries: Option<RecordBlock<PartitionEntry>>,
}

/// Template factory
pub fn create(ctx: &SectionContext<'_>) -> Result<Box<dyn SectionKind>> {
    Ok(Box::new(PartitionTable {
        name: ctx.name.to_string(),
        sections: ctx.sections.to_vec(),
        listed: Vec::new(),
        header: None,
        entries: None,
    }))
}

impl SectionKind for PartitionTable {
    fn declare_properties(&self, properties: &mut PropertyRegistry) -> Result<()> {
        properties.declare("version", 1i64, "Version of the partition table format.")?;
        properties.declare(
            "include_self",
            false,
            "List the partition table among the partitions.",
        )
    }

    fn declare_content(
        &mut self,
        properties: &PropertyRegistry,
        alloc: &mut SectionAllocator,
    ) -> Result<()> {
        let version = properties.get_int("version")?.unwrap_or(1);
        let version = u32::try_from(version).map_err(|_| FlashError::InvalidPropertyValue {
            owner: properties.owner().to_string(),
            property: "version".to_string(),
            expected: "32-bit unsigned integer",
            found: version.to_string(),
        })?;
        let include_self = properties.get_bool("include_self")?.unwrap_or(false);

        self.listed = self
            .sections
            .iter()
            .filter(|name| include_self || **name != self.name)
            .cloned()
            .collect();

        let header = PartitionTableHeader {
            magic: PARTITION_TABLE_MAGIC,
            version: U32::new(version),
            count: field_u32(&self.name, "count", self.listed.len() as u64)?,
        };
        self.header = Some(RecordBlock::new("partition table header", alloc, vec![header]));

        let entries = self.listed.iter().map(|name| PartitionEntry::new(name)).collect();
        self.entries = Some(RecordBlock::new("partition entries", alloc, entries));
        Ok(())
    }

    fn contents(&self) -> Vec<&dyn Content> {
        let mut contents: Vec<&dyn Content> = Vec::new();
        if let Some(header) = &self.header {
            contents.push(header);
        }
        if let Some(entries) = &self.entries {
            contents.push(entries);
        }
        contents
    }

    fn finalize(&mut self, ctx: &FinalizeContext<'_>) -> Result<()> {
        let Some(entries) = &mut self.entries else {
            return Ok(());
        };

        for (entry, name) in entries.records.iter_mut().zip(&self.listed) {
            // Sections dropped from a truncated preview stay zeroed
            let Some(placement) = ctx.view.get(name) else {
                continue;
            };
            entry.partition_type = placement.partition_type;
            entry.partition_subtype = placement.partition_subtype;
            entry.flags = U16::new(FLAG_PLACED);
            entry.offset = field_u32(&self.name, "offset", placement.offset)?;
            entry.size = field_u32(&self.name, "size", placement.size)?;
        }

        log::debug!(
            "Partition table '{}' lists {} sections",
            self.name,
            self.listed.len()
        );
        Ok(())
    }

    fn is_empty(&self) -> bool {
        false
    }

    fn partition_type(&self) -> u8 {
        PARTITION_TYPE_DATA
    }

    fn partition_subtype(&self) -> u8 {
        PARTITION_SUBTYPE_TABLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashgen_core::{Flash, FlashAttributes, FlashContent, SectionDescriptor};

    fn u32_at(data: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap())
    }

    fn flash(attributes: FlashAttributes) -> Flash {
        let mut flash = Flash::new("flash", 0x10000, attributes).unwrap();
        crate::register_all(&mut flash).unwrap();
        flash
    }

    #[test]
    fn test_record_sizes() {
        assert_eq!(size_of::<PartitionTableHeader>(), 12);
        assert_eq!(size_of::<PartitionEntry>(), 32);
    }

    #[test]
    fn test_table_lists_later_sections() {
        let attributes = FlashAttributes {
            section_start_align: Some(0x100),
            section_size_align: None,
        };
        let mut flash = flash(attributes);
        flash.set_content(FlashContent::new(vec![
            SectionDescriptor::new("table", "partition-table"),
            SectionDescriptor::new("nvram", "reserved").with_property("size", 0x200i64),
            SectionDescriptor::new("spare", "reserved").with_property("size", 0x80i64),
        ]));

        let table = flash.section_by_name("table").unwrap().unwrap();
        assert_eq!(table.size(), 12 + 2 * 32);
        assert!(!table.is_empty());

        let image = table.image().unwrap();
        assert_eq!(&image[..4], b"PTBL");
        assert_eq!(u32_at(&image, 4), 1);
        assert_eq!(u32_at(&image, 8), 2);

        // nvram
        let entry = &image[12..44];
        assert_eq!(entry[0], 0x01);
        assert_eq!(entry[1], 0xFE);
        assert_eq!(u16::from_le_bytes([entry[2], entry[3]]), FLAG_PLACED);
        assert_eq!(u32_at(entry, 4), 0x100);
        assert_eq!(u32_at(entry, 8), 0x200);
        assert_eq!(&entry[12..18], b"nvram\0");

        // spare
        let entry = &image[44..76];
        assert_eq!(u32_at(entry, 4), 0x300);
        assert_eq!(u32_at(entry, 8), 0x80);
    }

    #[test]
    fn test_include_self() {
        let mut flash = flash(FlashAttributes::default());
        flash.set_content(FlashContent::new(vec![
            SectionDescriptor::new("nvram", "reserved").with_property("size", 0x40i64),
            SectionDescriptor::new("table", "partition-table")
                .with_property("include_self", "true")
                .with_property("version", 3i64),
        ]));

        let table = flash.section_by_name("table").unwrap().unwrap();
        let image = table.image().unwrap();
        assert_eq!(u32_at(&image, 4), 3);
        assert_eq!(u32_at(&image, 8), 2);

        let entry = &image[44..76];
        assert_eq!(entry[1], PARTITION_SUBTYPE_TABLE);
        assert_eq!(u32_at(entry, 4), 0x40);
        assert_eq!(u32_at(entry, 8), 12 + 2 * 32);
    }

    #[test]
    fn test_long_name_truncated() {
        let mut flash = flash(FlashAttributes::default());
        flash.set_content(FlashContent::new(vec![
            SectionDescriptor::new("table", "partition-table"),
            SectionDescriptor::new("a-really-long-section-name", "reserved"),
        ]));

        let image = flash.section_by_name("table").unwrap().unwrap().image().unwrap();
        assert_eq!(&image[24..43], b"a-really-long-secti");
        assert_eq!(image[43], 0);
    }

    #[test]
    fn test_preview_leaves_dropped_sections_zeroed() {
        let mut flash = Flash::new("flash", 0x100, FlashAttributes::default()).unwrap();
        crate::register_all(&mut flash).unwrap();
        flash.set_content(FlashContent::new(vec![
            SectionDescriptor::new("table", "partition-table"),
            SectionDescriptor::new("big", "reserved").with_property("size", 0x200i64),
            SectionDescriptor::new("after", "reserved").with_property("size", 0x10i64),
        ]));

        let layout = flash.preview_layout().unwrap();
        assert!(layout.is_truncated());
        assert_eq!(layout.sections().len(), 2);

        let image = layout.get("table").unwrap().image().unwrap();
        // big was placed, after was not
        assert_eq!(u16::from_le_bytes([image[14], image[15]]), FLAG_PLACED);
        assert_eq!(&image[44..76][..12], &[0; 12]);
    }
}
