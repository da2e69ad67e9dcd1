//! Section keeping space free for runtime use

use flashgen_core::property::PropertyRegistry;
use flashgen_core::section::{Content, SectionAllocator, SectionContext, SectionKind};
use flashgen_core::Result;

use crate::PARTITION_TYPE_DATA;

/// Template id
pub const TEMPLATE: &str = "reserved";

/// Partition subtype of reserved sections
pub const PARTITION_SUBTYPE_RESERVED: u8 = 0xFE;

/// Reserved section, sized only through its `size` property
#[derive(Debug, Default)]
pub struct Reserved;

/// Template factory
pub fn create(_ctx: &SectionContext<'_>) -> Result<Box<dyn SectionKind>> {
    Ok(Box::new(Reserved))
}

impl SectionKind for Reserved {
    fn declare_content(
        &mut self,
        _properties: &PropertyRegistry,
        _alloc: &mut SectionAllocator,
    ) -> Result<()> {
        Ok(())
    }

    fn contents(&self) -> Vec<&dyn Content> {
        Vec::new()
    }

    fn partition_type(&self) -> u8 {
        PARTITION_TYPE_DATA
    }

    fn partition_subtype(&self) -> u8 {
        PARTITION_SUBTYPE_RESERVED
    }
}
