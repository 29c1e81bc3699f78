//! Parsing Options.
//! `--script {file}` or `-s` replays a command file, otherwise commands are read from stdin.

use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;

use crate::config::PnConfig;

fn make_options_parser() -> clap::Command {
    Command::new("pn")
        .no_binary_name(true)
        .version("v0.1.0")
        .about("Interactive Petri net editor and simulator")
        .arg(
            Arg::new("script")
                .short('s')
                .long("script")
                .value_name("FILE")
                .help("Command file to replay instead of reading stdin"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("TOML configuration file")
                .default_value("pn.toml"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Print events as JSON lines"),
        )
        .arg(
            Arg::new("check")
                .long("check")
                .action(ArgAction::SetTrue)
                .help("Verify transition enablement after every command"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .help("Do not echo events"),
        )
}

#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub script: Option<PathBuf>,
    pub config: PathBuf,
    pub json: bool,
    pub check: bool,
    pub quiet: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            script: None,
            config: PathBuf::from("pn.toml"),
            json: false,
            check: false,
            quiet: false,
        }
    }
}

impl Options {
    pub fn parse_from_str(s: &str) -> Result<Self> {
        let flags = shellwords::split(s)?;
        Self::parse_from_args(&flags)
    }

    pub fn parse_from_args(flags: &[String]) -> Result<Self> {
        let app = make_options_parser();
        let matches = app.try_get_matches_from(flags.iter())?;

        let script = matches.get_one::<String>("script").map(PathBuf::from);
        let config = matches
            .get_one::<String>("config")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("pn.toml"));
        Ok(Options {
            script,
            config,
            json: matches.get_flag("json"),
            check: matches.get_flag("check"),
            quiet: matches.get_flag("quiet"),
        })
    }

    /// Command-line flags win over the configuration file.
    pub fn apply(&self, config: &mut PnConfig) {
        if self.json {
            config.json_events = true;
        }
        if self.check {
            config.check_after_each = true;
        }
        if self.quiet {
            config.echo_events = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_from_str_err() {
        let options = Options::parse_from_str("-k unknown --json");
        assert!(options.is_err());
    }

    #[test]
    fn test_parse_from_str_unbalanced_quote() {
        assert!(Options::parse_from_str("-s \"net.pn").is_err());
    }

    #[test]
    fn test_parse_defaults() {
        let options = Options::parse_from_args(&[]).unwrap();
        assert_eq!(options, Options::default());
    }

    #[test]
    fn test_flags_override_config() {
        let options = Options::parse_from_str("-s demo.pn --json --check -q").unwrap();
        assert_eq!(options.script, Some(PathBuf::from("demo.pn")));

        let mut config = PnConfig::default();
        options.apply(&mut config);
        assert!(config.json_events);
        assert!(config.check_after_each);
        assert!(!config.echo_events);
    }
}
