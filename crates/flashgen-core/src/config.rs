//! Flash description files
//!
//! Descriptions are written in TOML (or JSON, picked by file extension):
//!
//! ```toml
//! [flash]
//! name = "flash"
//! size = "8 MiB"
//! image = "flash.bin"
//! section_start_align = 0x1000
//!
//! [[section]]
//! name = "table"
//! template = "partition-table"
//!
//! [[section]]
//! name = "app"
//! template = "raw"
//! [section.properties]
//! file = "app.bin"
//! size = "0x10000"
//! ```
//!
//! Sizes and alignments accept integers, hex strings (`"0x1000"`) and sizes
//! with a unit (`"64 KiB"`, `"8 MiB"`).

use std::fs;
use std::path::Path;

use crate::descriptor::{FlashContent, SectionDescriptor};
use crate::error::{FlashError, Result};
use crate::flash::{Flash, FlashAttributes};

/// Flash-level settings of a description file
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct FlashSettings {
    /// Flash name, also the default image base name
    pub name: String,
    /// Capacity in bytes
    #[serde(deserialize_with = "deserialize_size")]
    pub size: u64,
    /// Image file name, `<name>.bin` when absent
    #[serde(default)]
    pub image: Option<String>,
    /// Start alignment applied to every section
    #[serde(default, deserialize_with = "deserialize_opt_size")]
    pub section_start_align: Option<u64>,
    /// Size alignment applied to every section
    #[serde(default, deserialize_with = "deserialize_opt_size")]
    pub section_size_align: Option<u64>,
}

/// Content of a description file
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct FlashDescription {
    /// Flash-level settings
    pub flash: FlashSettings,
    /// Sections in layout order
    #[serde(default, rename = "section", alias = "sections")]
    pub sections: Vec<SectionDescriptor>,
}

/// Size or number that can be an integer or a string
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum SizeOrStr {
    Int(u64),
    Str(String),
}

/// Deserialize a size that can be an integer, hex, or with a unit
fn deserialize_size<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    match SizeOrStr::deserialize(deserializer)? {
        SizeOrStr::Int(n) => Ok(n),
        SizeOrStr::Str(s) => parse_size(&s).map_err(serde::de::Error::custom),
    }
}

fn deserialize_opt_size<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserialize_size(deserializer).map(Some)
}

/// Parse a size string like "16 MiB", "0x1000" or "4096"
pub fn parse_size(s: &str) -> std::result::Result<u64, String> {
    let s = s.trim();

    // Try plain number first
    if let Ok(n) = s.parse::<u64>() {
        return Ok(n);
    }

    // Try hex
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u64::from_str_radix(hex.trim(), 16).map_err(|e| format!("invalid hex: {}", e));
    }

    // Try with suffix
    let s_lower = s.to_lowercase();
    let (num_str, multiplier) = if let Some(n) = s_lower.strip_suffix("gib") {
        (n.trim(), 1024 * 1024 * 1024)
    } else if let Some(n) = s_lower.strip_suffix("mib") {
        (n.trim(), 1024 * 1024)
    } else if let Some(n) = s_lower.strip_suffix("mb") {
        (n.trim(), 1024 * 1024)
    } else if let Some(n) = s_lower.strip_suffix("kib") {
        (n.trim(), 1024)
    } else if let Some(n) = s_lower.strip_suffix("kb") {
        (n.trim(), 1024)
    } else if let Some(n) = s_lower.strip_suffix('b') {
        (n.trim(), 1)
    } else {
        return Err(format!("invalid size: {}", s));
    };

    let num: u64 = num_str.parse().map_err(|_| format!("invalid size: {}", s))?;
    num.checked_mul(multiplier)
        .ok_or_else(|| format!("size too large: {}", s))
}

/// Format a size as human-readable string
pub fn format_size(size: u64) -> String {
    if size >= 1024 * 1024 && size % (1024 * 1024) == 0 {
        format!("{} MiB", size / (1024 * 1024))
    } else if size >= 1024 && size % 1024 == 0 {
        format!("{} KiB", size / 1024)
    } else {
        format!("{}", size)
    }
}

impl FlashDescription {
    /// Load a description file, TOML unless the extension is `.json`
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| FlashError::io("flash description", path, e))?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let description = if is_json {
            Self::from_json_str(&content)?
        } else {
            Self::from_toml_str(&content)?
        };

        log::info!(
            "Loaded flash '{}' with {} sections from {}",
            description.flash.name,
            description.sections.len(),
            path.display()
        );
        Ok(description)
    }

    /// Parse a TOML description
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| FlashError::InvalidDescription(e.to_string()))
    }

    /// Parse a JSON description
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| FlashError::InvalidDescription(e.to_string()))
    }

    /// Flash-wide attributes of the description
    pub fn attributes(&self) -> FlashAttributes {
        FlashAttributes {
            section_start_align: self.flash.section_start_align,
            section_size_align: self.flash.section_size_align,
        }
    }

    /// Create the flash, with its content set but no template registered
    pub fn into_flash(self) -> Result<Flash> {
        let mut flash = Flash::new(&self.flash.name, self.flash.size, self.attributes())?;
        if let Some(image) = &self.flash.image {
            flash.set_image_name(image.as_str());
        }
        flash.set_content(FlashContent::new(self.sections));
        Ok(flash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyValue;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("4096").unwrap(), 4096);
        assert_eq!(parse_size("0x1000").unwrap(), 4096);
        assert_eq!(parse_size("4 KiB").unwrap(), 4096);
        assert_eq!(parse_size("4KiB").unwrap(), 4096);
        assert_eq!(parse_size("16 MiB").unwrap(), 16 * 1024 * 1024);
        assert_eq!(parse_size("1 GiB").unwrap(), 1024 * 1024 * 1024);
        assert!(parse_size("lots").is_err());
        assert_eq!(parse_size("16 EiB"), Err("invalid size: 16 EiB".to_string()));
        assert_eq!(
            parse_size("20000000000 GiB"),
            Err("size too large: 20000000000 GiB".to_string())
        );
        assert_eq!(parse_size("17179869183 GiB").unwrap(), 0xFFFF_FFFF_C000_0000);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(8 * 1024 * 1024), "8 MiB");
        assert_eq!(format_size(0x1000), "4 KiB");
        assert_eq!(format_size(100), "100");
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[flash]
name = "mram"
size = "2 MiB"
section_start_align = 0x1000

[[section]]
name = "app"
template = "raw"
[section.properties]
size = "0x10000"
file = "app.bin"

[[section]]
name = "fs"
template = "readfs"
[section.properties]
files = ["a.bin", "b.bin"]
"#;
        let description = FlashDescription::from_toml_str(toml).unwrap();
        assert_eq!(description.flash.name, "mram");
        assert_eq!(description.flash.size, 2 * 1024 * 1024);
        assert_eq!(description.flash.section_start_align, Some(0x1000));
        assert_eq!(description.flash.section_size_align, None);
        assert_eq!(description.sections.len(), 2);

        let app = description.sections[0].properties.as_ref().unwrap();
        let keys: Vec<_> = app.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["size", "file"]);
        assert_eq!(app.get("size"), Some(&PropertyValue::from("0x10000")));

        let fs = description.sections[1].properties.as_ref().unwrap();
        assert_eq!(fs.get("files"), Some(&PropertyValue::from(vec!["a.bin", "b.bin"])));

        let flash = description.into_flash().unwrap();
        assert_eq!(flash.name(), "mram");
        assert_eq!(flash.image_name(), "mram.bin");
        assert_eq!(flash.capacity(), 2 * 1024 * 1024);
        assert_eq!(flash.content().sections.len(), 2);
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{
            "flash": { "name": "flash", "size": 4096, "image": "out.img" },
            "sections": [
                { "name": "a", "template": "raw", "properties": { "file": null } },
                { "template": "raw" }
            ]
        }"#;
        let description = FlashDescription::from_json_str(json).unwrap();
        assert_eq!(description.flash.image.as_deref(), Some("out.img"));
        assert_eq!(
            description.sections[0].properties.as_ref().unwrap().get("file"),
            Some(&PropertyValue::Null)
        );
        assert_eq!(description.sections[1].name, None);
    }

    #[test]
    fn test_invalid_description() {
        assert!(matches!(
            FlashDescription::from_toml_str("[flash]\nname = \"f\"\n"),
            Err(FlashError::InvalidDescription(_))
        ));
        assert!(matches!(
            FlashDescription::from_toml_str("[flash]\nname = \"f\"\nsize = \"huge\"\n"),
            Err(FlashError::InvalidDescription(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flash.toml");
        fs::write(&path, "[flash]\nname = \"f\"\nsize = 256\n").unwrap();
        let description = FlashDescription::from_file(&path).unwrap();
        assert_eq!(description.flash.size, 256);
        assert!(description.sections.is_empty());

        assert!(matches!(
            FlashDescription::from_file(dir.path().join("missing.toml")),
            Err(FlashError::Io { .. })
        ));
    }
}
