//! Section holding the content of a single file

use flashgen_core::property::{PropertyRegistry, PropertyValue};
use flashgen_core::section::{Blob, Content, SectionAllocator, SectionContext, SectionKind};
use flashgen_core::Result;

use crate::{read_file, PARTITION_TYPE_DATA};

/// Template id
pub const TEMPLATE: &str = "raw";

/// Partition subtype of raw sections
pub const PARTITION_SUBTYPE_RAW: u8 = 0x00;

/// Raw file section
#[derive(Debug, Default)]
pub struct Raw {
    blob: Option<Blob>,
}

/// Template factory
pub fn create(_ctx: &SectionContext<'_>) -> Result<Box<dyn SectionKind>> {
    Ok(Box::new(Raw::default()))
}

impl SectionKind for Raw {
    fn declare_properties(&self, properties: &mut PropertyRegistry) -> Result<()> {
        properties.declare("file", PropertyValue::Null, "File copied into the section.")
    }

    fn declare_content(
        &mut self,
        properties: &PropertyRegistry,
        alloc: &mut SectionAllocator,
    ) -> Result<()> {
        self.blob = match properties.get_str("file")? {
            Some(path) => {
                let data = read_file(path)?;
                let offset = alloc.alloc(data.len() as u64);
                Some(Blob::new(path, offset, data))
            }
            None => None,
        };
        Ok(())
    }

    fn contents(&self) -> Vec<&dyn Content> {
        self.blob.iter().map(|b| b as &dyn Content).collect()
    }

    fn is_empty(&self) -> bool {
        self.blob.as_ref().map_or(true, |b| b.data.is_empty())
    }

    fn partition_type(&self) -> u8 {
        PARTITION_TYPE_DATA
    }

    fn partition_subtype(&self) -> u8 {
        PARTITION_SUBTYPE_RAW
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use flashgen_core::{Flash, FlashAttributes, FlashContent, FlashError, SectionDescriptor};

    fn flash() -> Flash {
        let mut flash = Flash::new("flash", 0x1000, FlashAttributes::default()).unwrap();
        crate::register_all(&mut flash).unwrap();
        flash
    }

    #[test]
    fn test_raw_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.bin");
        fs::write(&path, [1u8, 2, 3, 4, 5]).unwrap();

        let mut flash = flash();
        flash.set_content(FlashContent::new(vec![SectionDescriptor::new("app", "raw")
            .with_property("file", path.to_str().unwrap())]));

        let section = flash.section_by_name("app").unwrap().unwrap();
        assert_eq!(section.size(), 5);
        assert!(!section.is_empty());
        assert_eq!(section.partition_type(), 0x01);
        assert_eq!(section.partition_subtype(), 0x00);
        assert_eq!(section.image().unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_raw_without_file() {
        let mut flash = flash();
        flash.set_content(FlashContent::new(vec![
            SectionDescriptor::new("app", "raw").with_property("size", 0x100i64),
        ]));

        let section = flash.section_by_name("app").unwrap().unwrap();
        assert!(section.is_empty());
        assert_eq!(section.image().unwrap(), vec![0; 0x100]);
    }

    #[test]
    fn test_raw_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.bin");

        let mut flash = flash();
        flash.set_content(FlashContent::new(vec![SectionDescriptor::new("app", "raw")
            .with_property("file", path.to_str().unwrap())]));

        assert!(matches!(
            flash.sections(),
            Err(FlashError::Io {
                artifact: "section file",
                ..
            })
        ));
    }
}
