//! Read-only snapshot of the placed sections
//!
//! Finalize hooks run once every section has an offset and a size. Instead
//! of re-entering the flash, they get a [`LayoutView`] built right after the
//! offset assignment pass.

/// Position and classification of one placed section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Section name
    pub name: String,
    /// Declaration index
    pub id: usize,
    /// Absolute start offset
    pub offset: u64,
    /// Resolved size
    pub size: u64,
    /// Partition type reported by the section
    pub partition_type: u8,
    /// Partition subtype reported by the section
    pub partition_subtype: u8,
}

impl Placement {
    /// Absolute offset right after the section
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// Ordered placements of every section laid out by the flash
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutView {
    placements: Vec<Placement>,
}

impl LayoutView {
    /// Build a view from placements in declaration order
    pub fn new(placements: Vec<Placement>) -> Self {
        Self { placements }
    }

    /// Iterate over placements in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Placement> {
        self.placements.iter()
    }

    /// Find a placement by section name
    pub fn get(&self, name: &str) -> Option<&Placement> {
        self.placements.iter().find(|p| p.name == name)
    }

    /// Find a placement by declaration index
    pub fn by_id(&self, id: usize) -> Option<&Placement> {
        self.placements.get(id)
    }

    /// Placement following the section with the given index
    pub fn next(&self, id: usize) -> Option<&Placement> {
        self.placements.get(id + 1)
    }

    /// Number of placed sections
    pub fn len(&self) -> usize {
        self.placements.len()
    }

    /// Check if no section was placed
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}
