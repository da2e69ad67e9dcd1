//! Image and description emission

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{FlashError, Result};
use crate::section::{Section, SectionDescription};

use super::Flash;

/// Suffix appended to the image path (without extension) for the description
pub const DESCRIPTION_SUFFIX: &str = "-description.json";

/// Derive the description file path from an image path
pub fn description_path(image_path: &Path) -> PathBuf {
    let mut path: OsString = image_path.with_extension("").into_os_string();
    path.push(DESCRIPTION_SUFFIX);
    PathBuf::from(path)
}

/// Serialize section descriptions as a JSON array indented by four spaces
pub fn descriptions_to_json(descriptions: &[SectionDescription]) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    descriptions.serialize(&mut serializer)?;
    Ok(buf)
}

fn write_artifact(artifact: &'static str, path: &Path, data: &[u8]) -> Result<()> {
    fs::write(path, data).map_err(|e| FlashError::io(artifact, path, e))?;
    log::info!("Wrote {} bytes to {}", data.len(), path.display());
    Ok(())
}

impl Flash {
    /// Contiguous image of the sections `first..=last`
    ///
    /// Both bounds default to the whole flash. Holes between consecutive
    /// sections are filled with zeros.
    pub fn get_image(&self, first: Option<usize>, last: Option<usize>) -> Result<Vec<u8>> {
        let sections = self.sections()?;
        if sections.is_empty() {
            return Ok(Vec::new());
        }

        let count = sections.len();
        let first = first.unwrap_or(0);
        let last = last.unwrap_or(count - 1);
        for index in [first, last] {
            if index >= count {
                return Err(FlashError::SectionIndexOutOfRange { index, count });
            }
        }
        if first > last {
            return Err(FlashError::SectionIndexOutOfRange { index: first, count });
        }

        let selected = &sections[first..=last];
        let total = selected[selected.len() - 1].end() - selected[0].offset();
        let mut image = Vec::with_capacity(total as usize);

        let mut prev: Option<&Section> = None;
        for section in selected {
            if let Some(prev) = prev {
                let padding = section.offset() - prev.end();
                image.resize(image.len() + padding as usize, 0);
            }
            image.extend_from_slice(&section.image()?);
            prev = Some(section);
        }

        Ok(image)
    }

    /// Descriptions of every section
    pub fn section_descriptions(&self) -> Result<Vec<SectionDescription>> {
        Ok(self.sections()?.iter().map(Section::describe).collect())
    }

    /// Path of the JSON description file
    pub fn description_path(&self) -> PathBuf {
        description_path(&self.image_path())
    }

    /// Write the full image to [`image_path`](Self::image_path)
    pub fn dump_image(&self) -> Result<PathBuf> {
        let path = self.image_path();
        self.dump_image_to(&path)?;
        Ok(path)
    }

    /// Write the full image to the given path
    pub fn dump_image_to(&self, path: &Path) -> Result<()> {
        let image = self.get_image(None, None)?;
        write_artifact("flash image", path, &image)
    }

    /// Write the description file and one image per section
    pub fn dump_sections(&self) -> Result<()> {
        self.dump_sections_with(|_| {})
    }

    /// Same as [`dump_sections`](Self::dump_sections), calling `progress`
    /// after each section image is written
    pub fn dump_sections_with<F>(&self, mut progress: F) -> Result<()>
    where
        F: FnMut(&Section),
    {
        let sections = self.sections()?;
        log::info!("Dumping flash \"{}\" section content", self.name);

        fs::create_dir_all(&self.output_dir)
            .map_err(|e| FlashError::io("output directory", &self.output_dir, e))?;

        let path = self.description_path();
        let descriptions: Vec<_> = sections.iter().map(Section::describe).collect();
        let json = descriptions_to_json(&descriptions)
            .map_err(|e| FlashError::io("section description", &path, e))?;
        write_artifact("section description", &path, &json)?;

        for section in sections {
            let image = section.image()?;
            let path = self.output_dir.join(section.image_name());
            write_artifact("section image", &path, &image)?;
            progress(section);
        }

        Ok(())
    }
}
