//! CLI command implementations
//!
//! Every layout command starts from [`load_flash`], which applies the
//! command-line overrides on top of the description file and registers the
//! built-in section templates.

pub mod image;
pub mod layout;
mod list;

pub use list::list_templates;

use flashgen_core::config::FlashDescription;
use flashgen_core::{Flash, PropertyOverrides};

use crate::cli::FlashArgs;

/// Load the flash described by the command-line arguments
pub fn load_flash(args: &FlashArgs) -> Result<Flash, Box<dyn std::error::Error>> {
    let mut description = FlashDescription::from_file(&args.config)?;

    if let Some(size) = args.size {
        log::debug!("Flash size overridden to 0x{:x}", size);
        description.flash.size = size;
    }
    if let Some(align) = args.section_start_align {
        description.flash.section_start_align = Some(align);
    }
    if let Some(align) = args.section_size_align {
        description.flash.section_size_align = Some(align);
    }

    let mut flash = description.into_flash()?;
    flashgen_sections::register_all(&mut flash)?;

    if let Some(dir) = &args.output_dir {
        flash.set_output_dir(dir);
    }

    let mut overrides = PropertyOverrides::new();
    for entry in &args.properties {
        overrides.parse_entry(entry)?;
    }
    flash.set_overrides(overrides);

    Ok(flash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn args(config: PathBuf) -> FlashArgs {
        FlashArgs {
            config,
            output_dir: None,
            properties: Vec::new(),
            size: None,
            section_start_align: None,
            section_size_align: None,
        }
    }

    #[test]
    fn test_load_flash_with_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("flash.toml");
        fs::write(
            &config,
            r#"
[flash]
name = "flash"
size = "4 KiB"

[[section]]
name = "table"
template = "partition-table"

[[section]]
name = "nvram"
template = "reserved"
"#,
        )
        .unwrap();

        let mut args = args(config);
        args.size = Some(0x2000);
        args.section_start_align = Some(0x100);
        args.output_dir = Some(dir.path().join("out"));
        args.properties = vec!["nvram:size=0x400".to_string()];

        let flash = load_flash(&args).unwrap();
        assert_eq!(flash.capacity(), 0x2000);
        assert_eq!(flash.output_dir(), dir.path().join("out"));

        let nvram = flash.section_by_name("nvram").unwrap().unwrap();
        assert_eq!(nvram.offset(), 0x100);
        assert_eq!(nvram.size(), 0x400);
    }

    #[test]
    fn test_load_flash_bad_override() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("flash.toml");
        fs::write(&config, "[flash]\nname = \"flash\"\nsize = 4096\n").unwrap();

        let mut args = args(config);
        args.properties = vec!["nvram-size".to_string()];
        assert!(load_flash(&args).is_err());
    }
}
