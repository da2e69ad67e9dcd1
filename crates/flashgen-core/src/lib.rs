//! flashgen-core - Core library for flash image generation
//!
//! This crate computes the layout of a flash made of named sections and
//! produces the flash image and its JSON description. What each section
//! contains is provided by templates registered on the [`Flash`]; the
//! built-in ones live in the `flashgen-sections` crate.
//!
//! # Example
//!
//! ```ignore
//! use flashgen_core::config::FlashDescription;
//!
//! let mut flash = FlashDescription::from_file("flash.toml")?.into_flash()?;
//! flashgen_sections::register_all(&mut flash)?;
//!
//! println!("{}", flash.dump_layout(1)?);
//! flash.dump_image()?;
//! flash.dump_sections()?;
//! ```

#![warn(rust_2018_idioms)]

pub mod config;
pub mod descriptor;
pub mod error;
pub mod flash;
pub mod property;
pub mod report;
pub mod section;
pub mod template;

pub use descriptor::{FlashContent, PropertyOverrides, SectionDescriptor};
pub use error::{FlashError, Result};
pub use flash::{Flash, FlashAttributes, ResolvedLayout};
pub use property::{PropertyRegistry, PropertyValue};
pub use section::{Section, SectionKind};
