//! flashgen - Flash image layout generator
//!
//! Reads a flash description (TOML or JSON), computes where every section
//! lands in the flash and writes the flash image, the per-section images and
//! the JSON description consumed by flashing tools.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let result = match cli.command {
        Commands::Layout { flash, level } => {
            let flash = commands::load_flash(&flash)?;
            commands::layout::cmd_layout(&flash, level)
        }
        Commands::Properties { flash } => {
            let flash = commands::load_flash(&flash)?;
            commands::layout::cmd_properties(&flash)
        }
        Commands::Image { flash, output } => {
            let flash = commands::load_flash(&flash)?;
            commands::image::cmd_image(&flash, output.as_deref())
        }
        Commands::Sections { flash } => {
            let flash = commands::load_flash(&flash)?;
            commands::image::cmd_sections(&flash)
        }
        Commands::Templates => {
            commands::list_templates();
            Ok(())
        }
    };

    result
}
