//! Terminal diagnostics for verification results.
//!
//! Formats warnings collected during analysis with the stable error id,
//! the node the verdict is attributed to, and the counterexample trace
//! when one was reconstructed. Source locations are node ids; the front
//! end owns the source map.

use colored::Colorize;

use contract_fv_analysis::Warning;

/// Render one warning to a string (without color control codes this is
/// the exact text printed by [`print_warning`]).
pub fn format_warning(warning: &Warning) -> String {
    let mut text = format!(
        "warning[{}]: {} (node {})",
        warning.report_id, warning.message, warning.node
    );
    if let Some(secondary) = &warning.secondary {
        text.push_str(secondary);
    }
    text
}

/// Print one warning with severity coloring.
pub fn print_warning(warning: &Warning) {
    let header = format!("warning[{}]", warning.report_id);
    eprintln!(
        "{}: {} {}",
        header.yellow().bold(),
        warning.message,
        format!("(node {})", warning.node).dimmed()
    );
    if let Some(secondary) = &warning.secondary {
        eprintln!("{}", secondary.dimmed());
    }
}

/// Print all warnings of an analysis, followed by a count line.
pub fn render_warnings(warnings: &[Warning]) {
    for warning in warnings {
        print_warning(warning);
    }
    if !warnings.is_empty() {
        eprintln!(
            "{}: {} warning(s) emitted",
            "summary".bold(),
            warnings.len()
        );
    }
}
