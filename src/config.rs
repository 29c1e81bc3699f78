use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PnConfig {
    #[serde(default = "default_prompt")]
    pub prompt: String,
    #[serde(default = "default_echo_events")]
    pub echo_events: bool,
    #[serde(default)]
    pub json_events: bool,
    #[serde(default)]
    pub check_after_each: bool,
    #[serde(default)]
    pub dot_on_exit: Option<PathBuf>,
}

impl Default for PnConfig {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
            echo_events: default_echo_events(),
            json_events: false,
            check_after_each: false,
            dot_on_exit: None,
        }
    }
}

impl PnConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: PnConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }
}

fn default_prompt() -> String {
    "pn> ".to_string()
}

fn default_echo_events() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PnConfig::load_from_file(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, PnConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "json_events = true").unwrap();
        writeln!(file, "dot_on_exit = \"out/net.dot\"").unwrap();

        let config = PnConfig::load_from_file(file.path()).unwrap();
        assert!(config.json_events);
        assert!(config.echo_events);
        assert_eq!(config.prompt, "pn> ");
        assert_eq!(config.dot_on_exit, Some(PathBuf::from("out/net.dot")));
    }

    #[test]
    fn malformed_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "echo_events = \"maybe\"").unwrap();
        let err = PnConfig::load_from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
