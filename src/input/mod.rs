//! Input file handling.
//!
//! - [`parser`] - Delimited text to [`Record`](crate::models::Record)s
//! - [`cache`] - Change cache that skips runs on unchanged input

mod cache;
mod parser;

pub use cache::{should_process, ChangeCache};
pub use parser::{parse, parse_column_list, Column, ParsedInput};
