//! Flash sections
//!
//! A [`Section`] is one named, contiguous region of a flash. The generic part
//! (properties, alignment policy, offset and size resolution, image padding)
//! lives here, while what a section actually contains is provided by a
//! [`SectionKind`] created from a registered template.
//!
//! # Lifecycle
//!
//! 1. The template factory creates the kind and the section declares its
//!    properties.
//! 2. The flash sets the alignment policy, then calls
//!    [`Section::set_content`] with the base offset and the descriptor. This
//!    is where the kind declares its content through a [`SectionAllocator`].
//! 3. Once every section is placed, [`Section::finalize`] lets the kind fill
//!    fields that depend on other sections.

mod allocator;
mod content;
mod view;

pub use allocator::{align_up, check_alignment, SectionAllocator};
pub use content::{Blob, Content, Padding};
pub use view::{LayoutView, Placement};

use crate::descriptor::SectionDescriptor;
use crate::error::{FlashError, Result};
use crate::property::{PropertyRegistry, PropertyValue};

/// Partition type and subtype reported by sections of unknown kind
pub const PARTITION_UNKNOWN: u8 = 0xFF;

/// Name of the property every section declares to force its size
pub const SIZE_PROPERTY: &str = "size";

/// Information given to a template factory
#[derive(Debug, Clone, Copy)]
pub struct SectionContext<'a> {
    /// Name of the flash containing the section
    pub flash_name: &'a str,
    /// Section name
    pub name: &'a str,
    /// Declaration index of the section
    pub id: usize,
    /// Names of all sections of the flash, in declaration order
    pub sections: &'a [String],
}

/// Information given to a section kind during the finalize pass
#[derive(Debug, Clone, Copy)]
pub struct FinalizeContext<'a> {
    /// Properties of the section
    pub properties: &'a PropertyRegistry,
    /// Placements of every placed section
    pub view: &'a LayoutView,
    /// Declaration index of the section being finalized
    pub id: usize,
}

impl FinalizeContext<'_> {
    /// Placement of the section being finalized
    pub fn this(&self) -> Option<&Placement> {
        self.view.by_id(self.id)
    }

    /// Placement of the section following this one, if any
    pub fn next_section(&self) -> Option<&Placement> {
        self.view.next(self.id)
    }
}

/// Behaviour of a concrete kind of section
///
/// Implementations own their content structures so that they can still
/// patch them during [`finalize`](Self::finalize).
pub trait SectionKind {
    /// Declare the properties accepted by this kind
    ///
    /// The `size` property is already declared by the section itself.
    fn declare_properties(&self, _properties: &mut PropertyRegistry) -> Result<()> {
        Ok(())
    }

    /// Declare the content structures, reserving their room in `alloc`
    fn declare_content(
        &mut self,
        properties: &PropertyRegistry,
        alloc: &mut SectionAllocator,
    ) -> Result<()>;

    /// Content structures, in image order
    fn contents(&self) -> Vec<&dyn Content>;

    /// Update fields which depend on the placement of other sections
    ///
    /// Must not change the amount of space used by the content.
    fn finalize(&mut self, _ctx: &FinalizeContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Tell if the section holds no meaningful data
    fn is_empty(&self) -> bool {
        true
    }

    /// Partition type used in section descriptions
    fn partition_type(&self) -> u8 {
        PARTITION_UNKNOWN
    }

    /// Partition subtype used in section descriptions
    fn partition_subtype(&self) -> u8 {
        PARTITION_UNKNOWN
    }
}

/// Machine-readable description of a section, written to the JSON file
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SectionDescription {
    /// Section name
    pub name: String,
    /// Partition type
    pub partition_type: u8,
    /// Partition subtype
    pub partition_subtype: u8,
    /// Resolved size
    pub size: u64,
    /// Reserved, always equal to `size`
    pub overcommit_size: u64,
    /// File name of the section image
    pub image_file: String,
}

/// One region of a flash
pub struct Section {
    name: String,
    id: usize,
    flash_name: String,
    properties: PropertyRegistry,
    start_align: Option<u64>,
    size_align: Option<u64>,
    offset: u64,
    end: u64,
    size: u64,
    placed: bool,
    kind: Box<dyn SectionKind>,
}

impl std::fmt::Debug for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Section")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("offset", &self.offset)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl Section {
    /// Create a section around a kind and declare its properties
    pub fn new(ctx: &SectionContext<'_>, kind: Box<dyn SectionKind>) -> Result<Self> {
        let mut properties = PropertyRegistry::new(format!("section '{}'", ctx.name));
        properties.declare(
            SIZE_PROPERTY,
            PropertyValue::Null,
            "Force a certain size for section.",
        )?;
        kind.declare_properties(&mut properties)?;

        Ok(Self {
            name: ctx.name.to_string(),
            id: ctx.id,
            flash_name: ctx.flash_name.to_string(),
            properties,
            start_align: None,
            size_align: None,
            offset: 0,
            end: 0,
            size: 0,
            placed: false,
            kind,
        })
    }

    /// Set the alignment policy, before [`set_content`](Self::set_content)
    pub fn set_alignment(&mut self, start_align: Option<u64>, size_align: Option<u64>) {
        self.start_align = start_align;
        self.size_align = size_align;
    }

    /// Apply the descriptor properties, place the section and declare content
    ///
    /// `base_offset` is the end of the previous section; it is rounded up to
    /// the start alignment before being used. A section is placed only once.
    pub fn set_content(&mut self, base_offset: u64, descriptor: &SectionDescriptor) -> Result<()> {
        if self.placed {
            return Err(FlashError::SectionAlreadyPlaced(self.name.clone()));
        }

        if let Some(properties) = &descriptor.properties {
            for (name, value) in properties.iter() {
                if !self.properties.is_declared(name) {
                    return Err(FlashError::UnknownProperty {
                        section: self.name.clone(),
                        property: name.to_string(),
                    });
                }
                self.properties.set(name, value.clone())?;
            }
        }

        self.offset = match self.start_align {
            Some(align) => align_up(base_offset, align),
            None => base_offset,
        };

        let mut alloc = SectionAllocator::new(self.offset);
        self.kind.declare_content(&self.properties, &mut alloc)?;
        self.end = alloc.cursor();
        self.size = self.resolve_size()?;
        self.placed = true;

        log::debug!(
            "Placed section '{}' at 0x{:x} (natural size 0x{:x}, size 0x{:x})",
            self.name,
            self.offset,
            alloc.allocated(),
            self.size
        );

        Ok(())
    }

    /// Compute the size from the allocated content and the `size` property
    fn resolve_size(&self) -> Result<u64> {
        let natural = self.end - self.offset;

        let size = match self.properties.get_int(SIZE_PROPERTY)? {
            None | Some(-1) => natural,
            Some(requested) if requested < 0 => {
                return Err(FlashError::InvalidPropertyValue {
                    owner: self.properties.owner().to_string(),
                    property: SIZE_PROPERTY.to_string(),
                    expected: "positive size or -1",
                    found: requested.to_string(),
                })
            }
            Some(requested) => {
                let requested = requested as u64;
                if natural > requested {
                    return Err(FlashError::SectionSizeOverflow {
                        section: self.name.clone(),
                        natural,
                        requested,
                    });
                }
                if let Some(align) = self.size_align {
                    if align_up(requested, align) != requested {
                        return Err(FlashError::UnalignedSectionSize {
                            section: self.name.clone(),
                            requested,
                            alignment: align,
                        });
                    }
                }
                requested
            }
        };

        Ok(match self.size_align {
            Some(align) => align_up(size, align),
            None => size,
        })
    }

    /// Run the finalize hook of the kind
    pub fn finalize(&mut self, view: &LayoutView) -> Result<()> {
        let ctx = FinalizeContext {
            properties: &self.properties,
            view,
            id: self.id,
        };
        self.kind.finalize(&ctx)
    }

    /// Section name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declaration index
    pub fn id(&self) -> usize {
        self.id
    }

    /// Absolute start offset
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Resolved size, including the size override and alignment
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Absolute offset right after the section
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }

    /// Start alignment in effect
    pub fn start_align(&self) -> Option<u64> {
        self.start_align
    }

    /// Size alignment in effect
    pub fn size_align(&self) -> Option<u64> {
        self.size_align
    }

    /// Properties of the section
    pub fn properties(&self) -> &PropertyRegistry {
        &self.properties
    }

    /// Tell if the section holds no meaningful data
    pub fn is_empty(&self) -> bool {
        self.kind.is_empty()
    }

    /// Partition type
    pub fn partition_type(&self) -> u8 {
        self.kind.partition_type()
    }

    /// Partition subtype
    pub fn partition_subtype(&self) -> u8 {
        self.kind.partition_subtype()
    }

    /// Placement of this section, as seen by finalize hooks
    pub fn placement(&self) -> Placement {
        Placement {
            name: self.name.clone(),
            id: self.id,
            offset: self.offset,
            size: self.size,
            partition_type: self.partition_type(),
            partition_subtype: self.partition_subtype(),
        }
    }

    /// File name of the section image
    pub fn image_name(&self) -> String {
        format!("{}-{}.bin", self.flash_name, self.name)
    }

    /// Packed content of the section, zero padded to its size
    pub fn image(&self) -> Result<Vec<u8>> {
        let mut image = Vec::with_capacity(self.size as usize);
        for content in self.kind.contents() {
            image.extend_from_slice(&content.pack());
        }

        let len = image.len() as u64;
        if len > self.size {
            return Err(FlashError::SectionImageTooLarge {
                section: self.name.clone(),
                expected: self.size,
                actual: len,
            });
        }

        image.resize(self.size as usize, 0);
        Ok(image)
    }

    /// Render the content structures of the section
    pub fn dump_table(&self, level: usize) -> String {
        self.kind
            .contents()
            .iter()
            .map(|content| content.describe(level))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Description written to the JSON description file
    pub fn describe(&self) -> SectionDescription {
        SectionDescription {
            name: self.name.clone(),
            partition_type: self.partition_type(),
            partition_subtype: self.partition_subtype(),
            size: self.size,
            overcommit_size: self.size,
            image_file: self.image_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Kind declaring a single blob of `len` bytes
    struct Fixed {
        len: u64,
        data: Vec<Blob>,
    }

    impl Fixed {
        fn boxed(len: u64) -> Box<dyn SectionKind> {
            Box::new(Self {
                len,
                data: Vec::new(),
            })
        }
    }

    impl SectionKind for Fixed {
        fn declare_properties(&self, properties: &mut PropertyRegistry) -> Result<()> {
            properties.declare("fill", 0xA5i64, "Fill byte")
        }

        fn declare_content(
            &mut self,
            properties: &PropertyRegistry,
            alloc: &mut SectionAllocator,
        ) -> Result<()> {
            let fill = properties.get_int("fill")?.unwrap_or(0) as u8;
            let offset = alloc.alloc(self.len);
            self.data = vec![Blob::new("data", offset, vec![fill; self.len as usize])];
            Ok(())
        }

        fn contents(&self) -> Vec<&dyn Content> {
            self.data.iter().map(|b| b as &dyn Content).collect()
        }
    }

    fn section(len: u64) -> Section {
        let names = vec!["data".to_string()];
        let ctx = SectionContext {
            flash_name: "flash",
            name: "data",
            id: 0,
            sections: &names,
        };
        Section::new(&ctx, Fixed::boxed(len)).unwrap()
    }

    fn descriptor() -> SectionDescriptor {
        SectionDescriptor::new("data", "fixed")
    }

    #[test]
    fn test_natural_size() {
        let mut s = section(0x20);
        s.set_content(0x10, &descriptor()).unwrap();
        assert_eq!(s.offset(), 0x10);
        assert_eq!(s.size(), 0x20);
        assert_eq!(s.image().unwrap(), vec![0xA5; 0x20]);
    }

    #[test]
    fn test_start_and_size_alignment() {
        let mut s = section(0x21);
        s.set_alignment(Some(0x100), Some(0x10));
        s.set_content(0x10, &descriptor()).unwrap();
        assert_eq!(s.offset(), 0x100);
        assert_eq!(s.size(), 0x30);
        let image = s.image().unwrap();
        assert_eq!(image.len(), 0x30);
        assert!(image[0x21..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_size_override_too_small() {
        let mut s = section(0x20);
        let err = s
            .set_content(0, &descriptor().with_property("size", 0x10i64))
            .unwrap_err();
        assert!(matches!(
            err,
            FlashError::SectionSizeOverflow {
                natural: 0x20,
                requested: 0x10,
                ..
            }
        ));
    }

    #[test]
    fn test_size_override_pads_image() {
        let mut s = section(0x20);
        s.set_content(0, &descriptor().with_property("size", "0x40"))
            .unwrap();
        assert_eq!(s.size(), 0x40);
        let image = s.image().unwrap();
        assert_eq!(image.len(), 0x40);
        assert!(image[..0x20].iter().all(|&b| b == 0xA5));
        assert!(image[0x20..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_size_auto_sentinel() {
        let mut s = section(0x20);
        s.set_content(0, &descriptor().with_property("size", -1i64))
            .unwrap();
        assert_eq!(s.size(), 0x20);
    }

    #[test]
    fn test_unaligned_size_override() {
        let mut s = section(0x8);
        s.set_alignment(None, Some(0x10));
        let err = s
            .set_content(0, &descriptor().with_property("size", 0x18i64))
            .unwrap_err();
        assert!(matches!(err, FlashError::UnalignedSectionSize { .. }));
    }

    #[test]
    fn test_unknown_property() {
        let mut s = section(0x8);
        let err = s
            .set_content(0, &descriptor().with_property("file", "a.bin"))
            .unwrap_err();
        assert!(matches!(
            err,
            FlashError::UnknownProperty { ref property, .. } if property == "file"
        ));
    }

    #[test]
    fn test_descriptor_properties_are_applied() {
        let mut s = section(0x4);
        s.set_content(0, &descriptor().with_property("fill", 0x11i64))
            .unwrap();
        assert_eq!(s.properties().get("fill").unwrap(), &PropertyValue::Int(0x11));
        assert_eq!(s.image().unwrap(), vec![0x11; 4]);
    }

    #[test]
    fn test_describe() {
        let mut s = section(0x10);
        s.set_content(0, &descriptor()).unwrap();
        let desc = s.describe();
        assert_eq!(desc.name, "data");
        assert_eq!(desc.partition_type, PARTITION_UNKNOWN);
        assert_eq!(desc.partition_subtype, PARTITION_UNKNOWN);
        assert_eq!(desc.size, 0x10);
        assert_eq!(desc.overcommit_size, 0x10);
        assert_eq!(desc.image_file, "flash-data.bin");
        assert!(s.is_empty());
    }

    #[test]
    fn test_content_set_once() {
        let mut s = section(0x10);
        s.set_content(0, &descriptor()).unwrap();
        let err = s
            .set_content(0x100, &descriptor().with_property("fill", 0x11i64))
            .unwrap_err();
        assert!(matches!(err, FlashError::SectionAlreadyPlaced(ref name) if name == "data"));

        // The first placement is kept
        assert_eq!(s.offset(), 0);
        assert_eq!(s.image().unwrap(), vec![0xA5; 0x10]);
    }

    #[test]
    fn test_finalize_context_neighbours() {
        let placement = |name: &str, id, offset| Placement {
            name: name.to_string(),
            id,
            offset,
            size: 0x10,
            partition_type: PARTITION_UNKNOWN,
            partition_subtype: PARTITION_UNKNOWN,
        };
        let view = LayoutView::new(vec![placement("a", 0, 0), placement("b", 1, 0x10)]);
        let properties = PropertyRegistry::new("section 'a'");

        let first = FinalizeContext {
            properties: &properties,
            view: &view,
            id: 0,
        };
        assert_eq!(first.this().map(|p| p.name.as_str()), Some("a"));
        assert_eq!(first.next_section().map(|p| p.offset), Some(0x10));

        let last = FinalizeContext { id: 1, ..first };
        assert_eq!(last.this().map(Placement::end), Some(0x20));
        assert!(last.next_section().is_none());
    }
}
