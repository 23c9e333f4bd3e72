//! Terminal output formatting.

use console::style;

/// Prints a success message.
pub fn success(message: &str) {
    println!("{} {}", style("✓").green().bold(), message);
}

/// Prints an error message.
pub fn error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), message);
}

/// Prints a warning message.
pub fn warning(message: &str) {
    println!("{} {}", style("⚠").yellow().bold(), message);
}

/// Prints an info message.
pub fn info(message: &str) {
    println!("{} {}", style("ℹ").blue().bold(), message);
}

/// Prints a header for a section.
pub fn section_header(title: &str) {
    println!("\n{}", style(format!("── {} ──", title)).bold());
}

/// Prints a list item.
pub fn list_item(text: &str) {
    println!("  {} {}", style("•").dim(), text);
}

/// Prints a key-value pair.
pub fn key_value(key: &str, value: &str) {
    println!("    {}: {}", style(key).dim(), value);
}

/// Prints every leaf of a batch failure, one per line.
pub fn error_list(errors: &[String]) {
    for message in errors {
        eprintln!("  {} {}", style("✗").red(), message);
    }
}
