//! Terminal messages
//!
//! Everything here goes to stderr; stdout is reserved for documents.

use colored::Colorize;

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue().bold(), message);
}
