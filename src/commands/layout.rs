//! Layout command implementations

use flashgen_core::config::format_size;
use flashgen_core::Flash;

/// Print the layout table of a flash
///
/// Overflowing layouts are still printed, up to the first section crossing
/// the flash capacity.
pub fn cmd_layout(flash: &Flash, level: usize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", flash.dump_layout(level)?);
    print_usage(flash)?;
    Ok(())
}

/// Print the properties of every section
pub fn cmd_properties(flash: &Flash) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", flash.dump_section_properties()?);
    Ok(())
}

fn print_usage(flash: &Flash) -> Result<(), Box<dyn std::error::Error>> {
    let layout = flash.preview_layout()?;
    let used = layout.sections().last().map_or(0, |s| s.end());

    println!(
        "Flash:  {} bytes ({})",
        flash.capacity(),
        format_size(flash.capacity())
    );
    println!("Used:   0x{:x} bytes", used);
    if layout.is_truncated() {
        println!("Layout overflows the flash, next sections are not shown");
    } else {
        println!("Free:   0x{:x} bytes", flash.capacity() - used);
    }
    Ok(())
}
