//! Run configuration parsed from the command line.

use std::path::PathBuf;

use crate::report::DEFAULT_REPORT_DIR;

/// Configuration parsed from command-line args.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Only run units whose full path contains this.
    pub filter: Option<String>,
    /// Only list units, don't run them.
    pub list: bool,
    /// Hand the finished report to the JSON sink.
    pub generate_report: bool,
    pub report_dir: PathBuf,
    /// Print every unit's statements and debug logs.
    pub verbose: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            filter: None,
            list: false,
            generate_report: false,
            report_dir: PathBuf::from(DEFAULT_REPORT_DIR),
            verbose: false,
        }
    }
}

impl RunConfig {
    /// Parse from the process args (compatible with `cargo test -- <args>`).
    pub fn from_args() -> Self {
        RunConfig::parse(std::env::args().skip(1))
    }

    /// Parse from args without the binary name. Unknown flags are ignored.
    pub fn parse(args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut config = RunConfig::default();
        let mut args = args.into_iter().map(Into::into);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--list" => config.list = true,
                "--report" => config.generate_report = true,
                "--report-dir" => {
                    if let Some(dir) = args.next() {
                        config.report_dir = PathBuf::from(dir);
                        config.generate_report = true;
                    }
                }
                "--verbose" | "-v" => config.verbose = true,
                arg if !arg.starts_with('-') => config.filter = Some(arg.to_string()),
                _ => {}
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_run_everything_without_report() {
        let config = RunConfig::parse(Vec::<String>::new());
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.report_dir, PathBuf::from("target/giwt"));
    }

    #[test]
    fn flags_and_filter_are_parsed() {
        let config = RunConfig::parse(["--list", "checkout", "--nocapture", "-v"]);
        assert!(config.list);
        assert!(config.verbose);
        assert!(!config.generate_report);
        assert_eq!(config.filter.as_deref(), Some("checkout"));
    }

    #[test]
    fn report_dir_implies_report() {
        let config = RunConfig::parse(["--report-dir", "out/reports"]);
        assert!(config.generate_report);
        assert_eq!(config.report_dir, PathBuf::from("out/reports"));
    }
}
