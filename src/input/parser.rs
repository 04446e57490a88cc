//! Delimited input file parsing.
//!
//! Turns lines like `Office,10.0.0.1,10.0.0.254` into [`Record`]s. The column
//! order comes from `--columns` or from the header line.

use crate::error::SyncError;
use crate::models::{RangeEnd, RangeMode, Record, SkippedLine, MAX_LENGTH};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Known input columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Name,
    Starting,
    Ending,
    Cidr,
}

impl FromStr for Column {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(Column::Name),
            "starting" => Ok(Column::Starting),
            "ending" => Ok(Column::Ending),
            "cidr" => Ok(Column::Cidr),
            other => Err(SyncError::config(format!(
                "unknown column '{other}', expected name, starting, ending or cidr"
            ))),
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Column::Name => "name",
            Column::Starting => "starting",
            Column::Ending => "ending",
            Column::Cidr => "cidr",
        };
        write!(f, "{s}")
    }
}

/// Parse a `name,starting,ending` style list given on the command line.
pub fn parse_column_list(list: &str) -> Result<Vec<Column>, SyncError> {
    list.split(',').map(Column::from_str).collect()
}

/// Field positions for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Layout {
    name: usize,
    starting: usize,
    end: usize,
    mode: RangeMode,
}

impl Layout {
    /// `None` entries are header names we don't know; they are ignored.
    fn resolve(columns: &[Option<Column>]) -> Result<Layout, SyncError> {
        let position = |wanted: Column| -> Result<Option<usize>, SyncError> {
            let found: Vec<usize> = columns
                .iter()
                .enumerate()
                .filter(|(_, c)| **c == Some(wanted))
                .map(|(i, _)| i)
                .collect();
            match found.as_slice() {
                [] => Ok(None),
                [i] => Ok(Some(*i)),
                _ => Err(SyncError::config(format!(
                    "column '{wanted}' is given more than once"
                ))),
            }
        };

        let name = position(Column::Name)?
            .ok_or_else(|| SyncError::config("required column 'name' is missing"))?;
        let starting = position(Column::Starting)?
            .ok_or_else(|| SyncError::config("required column 'starting' is missing"))?;
        let (end, mode) = match (position(Column::Ending)?, position(Column::Cidr)?) {
            (Some(i), None) => (i, RangeMode::EndingAddress),
            (None, Some(i)) => (i, RangeMode::Cidr),
            (Some(_), Some(_)) => {
                return Err(SyncError::config(
                    "columns 'ending' and 'cidr' cannot both be used in one file",
                ))
            }
            (None, None) => {
                return Err(SyncError::config(
                    "one of the columns 'ending' or 'cidr' is required",
                ))
            }
        };
        Ok(Layout {
            name,
            starting,
            end,
            mode,
        })
    }
}

/// Result of parsing one input file.
#[derive(Debug, Clone)]
pub struct ParsedInput {
    pub mode: RangeMode,
    /// Records in input line order.
    pub records: Vec<Record>,
    pub skipped: Vec<SkippedLine>,
}

/// Parse delimited text into records.
///
/// # Arguments
/// * `raw_text` - Full file contents
/// * `delimiter` - Field separator
/// * `explicit_columns` - Column order; wins over the header when given
/// * `has_header` - First line is a header (used for columns only when no explicit order)
///
/// # Returns
/// * `Ok(ParsedInput)` - Records and the lines that were skipped
/// * `Err(SyncError::Configuration)` - Columns are unknown, missing or ambiguous
pub fn parse(
    raw_text: &str,
    delimiter: &str,
    explicit_columns: Option<&[Column]>,
    has_header: bool,
) -> Result<ParsedInput, SyncError> {
    if delimiter.is_empty() {
        return Err(SyncError::config("delimiter must not be empty"));
    }
    let text = raw_text.strip_prefix('\u{feff}').unwrap_or(raw_text);
    let mut lines = text.lines().enumerate();

    let columns: Vec<Option<Column>> = match explicit_columns {
        Some(cols) => {
            if has_header {
                if let Some((_, header)) = lines.next() {
                    log::debug!("Ignoring header line: {header}");
                }
            }
            cols.iter().copied().map(Some).collect()
        }
        None if has_header => {
            let (_, header) = lines
                .next()
                .ok_or_else(|| SyncError::config("input is empty, expected a header line"))?;
            header
                .split(delimiter)
                .map(|h| Column::from_str(h).ok())
                .collect()
        }
        None => {
            return Err(SyncError::config(
                "column order unknown: give --columns or use a header line",
            ))
        }
    };

    let layout = Layout::resolve(&columns)?;
    log::debug!("Column layout: {layout:?}");

    let mut records = Vec::new();
    let mut skipped = Vec::new();
    let mut seen = HashSet::new();

    for (i, line) in lines {
        let line_no = i + 1;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(delimiter).map(str::trim).collect();
        match parse_line(&fields, &layout) {
            Ok(record) => {
                if !seen.insert(record.name.clone()) {
                    skip(&mut skipped, line_no, format!("duplicate name '{}'", record.name));
                    continue;
                }
                log::trace!("line {line_no}: {record}");
                records.push(record);
            }
            Err(reason) => skip(&mut skipped, line_no, reason),
        }
    }

    log::info!(
        "Parsed {} records ({} mode), skipped {} lines",
        records.len(),
        layout.mode,
        skipped.len()
    );

    Ok(ParsedInput {
        mode: layout.mode,
        records,
        skipped,
    })
}

fn skip(skipped: &mut Vec<SkippedLine>, line: usize, reason: String) {
    log::warn!("Skipping line {line}: {reason}");
    skipped.push(SkippedLine { line, reason });
}

fn field<'a>(fields: &[&'a str], i: usize, column: &str) -> Result<&'a str, String> {
    match fields.get(i) {
        Some(v) if !v.is_empty() => Ok(*v),
        _ => Err(format!("missing {column}")),
    }
}

fn parse_line(fields: &[&str], layout: &Layout) -> Result<Record, String> {
    let name = field(fields, layout.name, "name")?;
    let starting = field(fields, layout.starting, "starting")?;
    let range_end = match layout.mode {
        RangeMode::EndingAddress => {
            RangeEnd::Ending(field(fields, layout.end, "ending")?.to_string())
        }
        RangeMode::Cidr => {
            let raw = field(fields, layout.end, "cidr")?;
            let cidr = raw.trim_start_matches('/');
            match cidr.parse::<u8>() {
                Ok(c) if c <= MAX_LENGTH => RangeEnd::Cidr(c),
                _ => return Err(format!("invalid cidr '{raw}'")),
            }
        }
    };

    Ok(Record::new(name, starting, range_end))
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLS: [Column; 3] = [Column::Name, Column::Starting, Column::Ending];

    #[test]
    fn test_parse_explicit_columns() {
        let text = "Office, 10.0.0.1 ,10.0.0.254\nLab,10.1.0.1,10.1.0.254\n";
        let parsed = parse(text, ",", Some(&COLS[..]), false).unwrap();
        assert_eq!(parsed.mode, RangeMode::EndingAddress);
        assert_eq!(
            parsed.records,
            vec![
                Record::new("Office", "10.0.0.1", RangeEnd::Ending("10.0.0.254".into())),
                Record::new("Lab", "10.1.0.1", RangeEnd::Ending("10.1.0.254".into())),
            ]
        );
        assert!(parsed.skipped.is_empty());
    }

    #[test]
    fn test_parse_header_columns_any_order() {
        let text = "CIDR;Name;Starting\n24;Office;10.0.0.0\n16;Campus;10.8.0.0\n";
        let parsed = parse(text, ";", None, true).unwrap();
        assert_eq!(parsed.mode, RangeMode::Cidr);
        assert_eq!(parsed.records[0], Record::new("Office", "10.0.0.0", RangeEnd::Cidr(24)));
        assert_eq!(parsed.records[1], Record::new("Campus", "10.8.0.0", RangeEnd::Cidr(16)));
    }

    #[test]
    fn test_parse_explicit_columns_discard_header() {
        let text = "segment,from,to\nOffice,10.0.0.1,10.0.0.254\n";
        let parsed = parse(text, ",", Some(&COLS[..]), true).unwrap();
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].name, "Office");
    }

    #[test]
    fn test_parse_unknown_header_columns_ignored() {
        let text = "name,site,starting,ending\nOffice,HQ,10.0.0.1,10.0.0.254\n";
        let parsed = parse(text, ",", None, true).unwrap();
        assert_eq!(
            parsed.records[0],
            Record::new("Office", "10.0.0.1", RangeEnd::Ending("10.0.0.254".into()))
        );
    }

    #[test]
    fn test_parse_no_columns_is_config_error() {
        let err = parse("Office,10.0.0.1,10.0.0.254", ",", None, false).unwrap_err();
        assert!(matches!(err, SyncError::Configuration { .. }));
    }

    #[test]
    fn test_parse_mixed_ending_and_cidr_rejected() {
        let text = "name,starting,ending,cidr\nA,10.0.0.1,10.0.0.254,\nB,10.1.0.1,,24\n";
        let err = parse(text, ",", None, true).unwrap_err();
        assert!(err.to_string().contains("cannot both be used"), "{err}");
    }

    #[test]
    fn test_parse_missing_required_columns() {
        let cols = [Column::Name, Column::Ending];
        let err = parse("A,10.0.0.1", ",", Some(&cols[..]), false).unwrap_err();
        assert!(err.to_string().contains("'starting'"), "{err}");

        let cols = [Column::Name, Column::Starting];
        let err = parse("A,10.0.0.1", ",", Some(&cols[..]), false).unwrap_err();
        assert!(err.to_string().contains("'ending' or 'cidr'"), "{err}");

        let cols = [Column::Name, Column::Name, Column::Starting, Column::Cidr];
        let err = parse("A,A,10.0.0.1,24", ",", Some(&cols[..]), false).unwrap_err();
        assert!(err.to_string().contains("more than once"), "{err}");
    }

    #[test]
    fn test_parse_skips_malformed_lines() {
        let text = "\
Office,10.0.0.1,10.0.0.254
Broken,10.0.0.1

,10.2.0.1,10.2.0.254
Lab,  ,10.3.0.254
Lab2,10.4.0.1,10.4.0.254
";
        let parsed = parse(text, ",", Some(&COLS[..]), false).unwrap();
        let names: Vec<&str> = parsed.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Office", "Lab2"]);
        assert_eq!(
            parsed.skipped,
            vec![
                SkippedLine {
                    line: 2,
                    reason: "missing ending".to_string()
                },
                SkippedLine {
                    line: 4,
                    reason: "missing name".to_string()
                },
                SkippedLine {
                    line: 5,
                    reason: "missing starting".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_parse_invalid_cidr_skipped() {
        let cols = [Column::Name, Column::Starting, Column::Cidr];
        let text = "A,10.0.0.0,24\nB,10.1.0.0,33\nC,10.2.0.0,abc\nD,10.3.0.0,/20\n";
        let parsed = parse(text, ",", Some(&cols[..]), false).unwrap();
        let names: Vec<&str> = parsed.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["A", "D"]);
        assert_eq!(parsed.records[1].range_end, RangeEnd::Cidr(20));
        assert_eq!(parsed.skipped.len(), 2);
        assert_eq!(parsed.skipped[0].reason, "invalid cidr '33'");
    }

    #[test]
    fn test_parse_duplicate_names_keep_first() {
        let text = "A,10.0.0.1,10.0.0.2\nA,10.9.0.1,10.9.0.2\n";
        let parsed = parse(text, ",", Some(&COLS[..]), false).unwrap();
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].starting, "10.0.0.1");
        assert_eq!(parsed.skipped[0].line, 2);
    }

    #[test]
    fn test_parse_bom_and_crlf() {
        let text = "\u{feff}name\tstarting\tending\r\nOffice\t10.0.0.1\t10.0.0.254\r\n";
        let parsed = parse(text, "\t", None, true).unwrap();
        assert_eq!(
            parsed.records,
            vec![Record::new("Office", "10.0.0.1", RangeEnd::Ending("10.0.0.254".into()))]
        );
    }

    #[test]
    fn test_parse_column_list() {
        assert_eq!(
            parse_column_list("name, starting ,CIDR").unwrap(),
            vec![Column::Name, Column::Starting, Column::Cidr]
        );
        assert!(parse_column_list("name,start,end").is_err());
    }

    #[test]
    fn test_parse_test_data_file() {
        let text = std::fs::read_to_string("src/tests/test_data/network_segments.csv")
            .expect("Error reading test data");
        let parsed = parse(&text, ",", None, true).unwrap();
        assert_eq!(parsed.mode, RangeMode::EndingAddress);
        assert_eq!(parsed.records.len(), 4);
        assert_eq!(parsed.skipped.len(), 1);
        assert_eq!(parsed.records[0].name, "HQ Floor 1");
    }
}
