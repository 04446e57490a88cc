//! Output formatting for sync runs.
//!
//! - [`terminal`] - Colored run summary

mod terminal;

pub use terminal::{format_label, print_nothing_to_do, print_report, report_lines};
