//! List commands implementation

use flashgen_sections::TEMPLATES;

/// List the built-in section templates
pub fn list_templates() {
    println!("Built-in section templates:");
    println!();
    for template in TEMPLATES {
        println!("  {:<16} - {}", template.name, template.description);
    }
}
