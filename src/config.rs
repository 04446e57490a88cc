//! Command line options and defaults.

use crate::directory::JamfConfig;
use crate::error::SyncError;
use crate::input::parse_column_list;
use crate::processing::SyncOptions;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MANUAL_PREFIX: &str = "Manual-";
pub const DEFAULT_PORT: u16 = 8443;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const CACHE_DIR: &str = ".netsegment-sync";
pub const CACHE_FILE: &str = "last_input.cache";

/// Sync Jamf network segments with a delimited text file.
///
/// Segments in the file are created or updated, segments missing from the
/// file are deleted. Segments named with the manual prefix are never touched.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    /// Input file, one network segment per line.
    pub input: Option<PathBuf>,

    /// Field delimiter.
    #[arg(short, long, default_value = ",")]
    pub delimiter: String,

    /// First line of the file is a header naming the columns.
    #[arg(short = 'H', long)]
    pub header: bool,

    /// Column order, e.g. `name,starting,ending` or `name,starting,cidr`.
    #[arg(short, long)]
    pub columns: Option<String>,

    /// Segments whose name starts with this are managed by hand.
    #[arg(short, long, default_value = DEFAULT_MANUAL_PREFIX)]
    pub manual_prefix: String,

    /// Change cache file [default: ~/.netsegment-sync/last_input.cache]
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Process the file even if it has not changed since the last run.
    #[arg(short, long)]
    pub force: bool,

    /// Jamf server host name or URL.
    #[arg(short, long, env = "JAMF_SERVER")]
    pub server: Option<String>,

    #[arg(short, long, env = "JAMF_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// API user name.
    #[arg(short, long, env = "JAMF_USER")]
    pub user: Option<String>,

    /// API password.
    #[arg(long, env = "JAMF_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Do not verify the server's TLS certificate.
    #[arg(long)]
    pub no_verify: bool,

    /// Request timeout in seconds.
    #[arg(short, long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Debug logging.
    #[arg(short, long)]
    pub verbose: bool,
}

/// `$HOME/.netsegment-sync/last_input.cache`, or relative to the current
/// directory when no home is set.
pub fn default_cache_path() -> PathBuf {
    let base = std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_default();
    base.join(CACHE_DIR).join(CACHE_FILE)
}

impl CliArgs {
    pub fn sync_options(&self, input: PathBuf) -> Result<SyncOptions, SyncError> {
        let columns = match &self.columns {
            Some(list) => Some(parse_column_list(list)?),
            None => None,
        };
        Ok(SyncOptions {
            input,
            delimiter: unescape_delimiter(&self.delimiter),
            columns,
            has_header: self.header,
            manual_prefix: self.manual_prefix.clone(),
            cache_path: self.cache.clone().unwrap_or_else(default_cache_path),
            force: self.force,
        })
    }

    /// Connection settings; server and credentials are required.
    pub fn jamf_config(&self) -> Result<JamfConfig, SyncError> {
        let required = |value: &Option<String>, what: &str, env: &str| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| SyncError::config(format!("no {what} given (set {env})")))
        };
        Ok(JamfConfig {
            server: required(&self.server, "server", "--server or JAMF_SERVER")?,
            port: self.port,
            user: required(&self.user, "user", "--user or JAMF_USER")?,
            password: required(&self.password, "password", "JAMF_PASSWORD")?,
            verify_tls: !self.no_verify,
            timeout: Duration::from_secs(self.timeout),
        })
    }
}

/// Allow `\t` on the command line for tab separated files.
fn unescape_delimiter(delimiter: &str) -> String {
    match delimiter {
        "\\t" | "tab" => "\t".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Column;

    fn args(argv: &[&str]) -> CliArgs {
        let mut full = vec!["netsegment-sync"];
        full.extend_from_slice(argv);
        CliArgs::try_parse_from(full).expect("Error parsing args")
    }

    #[test]
    fn test_defaults() {
        let a = args(&["--cache", "/tmp/c", "segments.csv"]);
        assert_eq!(a.input, Some(PathBuf::from("segments.csv")));
        assert_eq!(a.manual_prefix, "Manual-");
        assert_eq!(a.timeout, 60);
        assert!(!a.header && !a.force && !a.no_verify);

        let opts = a.sync_options(PathBuf::from("segments.csv")).unwrap();
        assert_eq!(opts.delimiter, ",");
        assert_eq!(opts.columns, None);
        assert_eq!(opts.cache_path, PathBuf::from("/tmp/c"));
    }

    #[test]
    fn test_columns_and_delimiter() {
        let a = args(&["-d", "\\t", "-c", "name,starting,cidr", "-H", "in.tsv"]);
        let opts = a.sync_options(PathBuf::from("in.tsv")).unwrap();
        assert_eq!(opts.delimiter, "\t");
        assert!(opts.has_header);
        assert_eq!(
            opts.columns,
            Some(vec![Column::Name, Column::Starting, Column::Cidr])
        );
    }

    #[test]
    fn test_bad_column_is_config_error() {
        let a = args(&["-c", "name,start,end", "in.csv"]);
        let err = a.sync_options(PathBuf::from("in.csv")).unwrap_err();
        assert!(matches!(err, SyncError::Configuration { .. }));
    }

    #[test]
    fn test_jamf_config_requires_credentials() {
        let a = args(&["--server", "jamf.example.com", "--user", "api", "--password", " "]);
        let err = a.jamf_config().unwrap_err();
        assert!(err.to_string().contains("password"), "{err}");

        let a = args(&[
            "--server",
            "jamf.example.com",
            "--user",
            "api",
            "--password",
            "pw",
            "--no-verify",
            "-t",
            "5",
        ]);
        let cfg = a.jamf_config().unwrap();
        assert!(!cfg.verify_tls);
        assert_eq!(cfg.timeout, Duration::from_secs(5));
        assert_eq!(cfg.port, DEFAULT_PORT);
    }

    #[test]
    fn test_default_cache_path_file_name() {
        let path = default_cache_path();
        assert!(path.ends_with(".netsegment-sync/last_input.cache"));
    }
}
