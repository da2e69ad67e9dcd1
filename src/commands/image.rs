//! Image command implementations

use std::fs;
use std::path::Path;

use flashgen_core::Flash;
use indicatif::{ProgressBar, ProgressStyle};

/// Write the flash image
pub fn cmd_image(flash: &Flash, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let path = match output {
        Some(path) => path.to_path_buf(),
        None => flash.image_path(),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    flash.dump_image_to(&path)?;

    println!("Flash image saved to {:?}", path);
    Ok(())
}

/// Write the section images and their description
pub fn cmd_sections(flash: &Flash) -> Result<(), Box<dyn std::error::Error>> {
    let count = flash.sections()?.len();

    let pb = ProgressBar::new(count as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    flash.dump_sections_with(|section| {
        pb.set_message(section.name().to_string());
        pb.inc(1);
    })?;

    pb.finish_with_message("Sections written");
    println!("Section description saved to {:?}", flash.description_path());
    Ok(())
}
