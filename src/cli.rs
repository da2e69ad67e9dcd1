//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a size or alignment like "0x1000", "4096" or "64 KiB"
fn parse_size_arg(s: &str) -> Result<u64, String> {
    flashgen_core::config::parse_size(s)
}

#[derive(Parser)]
#[command(name = "flashgen")]
#[command(author, version, about = "Flash image layout generator", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flash options shared across commands
#[derive(clap::Args, Debug, Clone)]
pub struct FlashArgs {
    /// Flash description file (TOML, or JSON with a .json extension)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Directory where images and descriptions are written
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Override a section property, can be repeated (e.g. -p app:file=app.bin)
    #[arg(short = 'p', long = "property", value_name = "SECTION:KEY=VALUE")]
    pub properties: Vec<String>,

    /// Override the flash size (e.g. 0x800000, 8MiB)
    #[arg(long, value_parser = parse_size_arg)]
    pub size: Option<u64>,

    /// Override the start alignment of every section
    #[arg(long, value_parser = parse_size_arg)]
    pub section_start_align: Option<u64>,

    /// Override the size alignment of every section
    #[arg(long, value_parser = parse_size_arg)]
    pub section_size_align: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the flash layout
    Layout {
        #[command(flatten)]
        flash: FlashArgs,

        /// Depth of the section content details (0 hides the content)
        #[arg(long, default_value_t = 1)]
        level: usize,
    },

    /// Print the properties of every section
    Properties {
        #[command(flatten)]
        flash: FlashArgs,
    },

    /// Write the flash image
    Image {
        #[command(flatten)]
        flash: FlashArgs,

        /// Image path (defaults to the image of the description, in the output directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write one image per section and the JSON description of the sections
    Sections {
        #[command(flatten)]
        flash: FlashArgs,
    },

    /// List built-in section templates
    Templates,
}
