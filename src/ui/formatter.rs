//! Pure formatting functions for UI output.
//!
//! Status lines for humans go through here; diagnostics go through `tracing`.

use console::style;

use crate::warning::PipelineWarning;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Display a non-fatal pipeline warning.
pub fn display_warning(warning: &PipelineWarning) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), warning);
}

/// Display a stage heading, e.g. "Sync", "Build", "Release".
pub fn display_stage(name: &str) {
    println!("\n{}", style(format!("== {} ==", name)).bold());
}

/// Display the numbered repository menu.
pub fn display_menu(menu: &str) {
    println!("{}", style("Available repositories:").bold());
    println!("{}", menu);
}
