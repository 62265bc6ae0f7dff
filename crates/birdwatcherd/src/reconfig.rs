//! Last reconfiguration timestamp
//!
//! The daemon only reports when it last re-read its configuration, which
//! is not necessarily when the configuration changed. Deployments that
//! stamp their generated configuration can use the file itself instead.

use crate::config::{BirdConfig, ReconfigTimestampSource, StatusConfig};
use crate::error::{BirdwatcherError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Resolved timestamp source, with its regex compiled
#[derive(Debug, Clone)]
pub enum ReconfigSource {
    Bird,
    ConfigModified(PathBuf),
    ConfigRegex(PathBuf, Regex),
}

impl ReconfigSource {
    pub fn from_config(status: &StatusConfig, bird: &BirdConfig) -> Result<Self> {
        Ok(match status.reconfig_timestamp_source {
            ReconfigTimestampSource::Bird => ReconfigSource::Bird,
            ReconfigTimestampSource::ConfigModified => {
                ReconfigSource::ConfigModified(bird.config.clone())
            }
            ReconfigTimestampSource::ConfigRegex => {
                let regex = Regex::new(&status.reconfig_timestamp_match).map_err(|e| {
                    BirdwatcherError::config(format!("Invalid reconfig_timestamp_match: {}", e))
                })?;
                ReconfigSource::ConfigRegex(bird.config.clone(), regex)
            }
        })
    }

    /// Timestamp to report, given what the daemon said
    pub fn resolve(&self, reported: Option<&str>) -> Result<Option<String>> {
        match self {
            ReconfigSource::Bird => Ok(reported.map(str::to_string)),
            ReconfigSource::ConfigModified(path) => modified_at(path).map(Some),
            ReconfigSource::ConfigRegex(path, regex) => first_match(path, regex),
        }
    }
}

/// File modification time as RFC 3339 UTC
pub fn modified_at(path: &Path) -> Result<String> {
    let modified = fs::metadata(path)?.modified()?;
    let modified: DateTime<Utc> = modified.into();
    Ok(modified.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// First capture group of the first matching line
pub fn first_match(path: &Path, regex: &Regex) -> Result<Option<String>> {
    let reader = BufReader::new(File::open(path)?);
    for line in reader.lines() {
        let line = line?;
        if let Some(caps) = regex.captures(&line) {
            return Ok(caps.get(1).map(|m| m.as_str().to_string()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn bird_config(path: &Path) -> BirdConfig {
        BirdConfig {
            config: path.to_path_buf(),
            ..BirdConfig::default()
        }
    }

    #[test]
    fn test_bird_source_passes_through() {
        let source = ReconfigSource::Bird;
        assert_eq!(
            source.resolve(Some("2018-01-01 12:00:00")).unwrap(),
            Some("2018-01-01 12:00:00".to_string())
        );
        assert_eq!(source.resolve(None).unwrap(), None);
    }

    #[test]
    fn test_regex_source() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# generated by arouteserver").unwrap();
        writeln!(file, "# Created: 2018-11-28 13:37:00").unwrap();
        writeln!(file, "router id 172.16.0.1;").unwrap();

        let status = StatusConfig {
            reconfig_timestamp_source: ReconfigTimestampSource::ConfigRegex,
            reconfig_timestamp_match: r"# Created: (.*)".to_string(),
            ..StatusConfig::default()
        };
        let source = ReconfigSource::from_config(&status, &bird_config(file.path())).unwrap();
        assert_eq!(
            source.resolve(Some("ignored")).unwrap(),
            Some("2018-11-28 13:37:00".to_string())
        );
    }

    #[test]
    fn test_regex_without_match() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "router id 172.16.0.1;").unwrap();
        let regex = Regex::new(r"# Created: (.*)").unwrap();
        assert_eq!(first_match(file.path(), &regex).unwrap(), None);
    }

    #[test]
    fn test_invalid_regex() {
        let status = StatusConfig {
            reconfig_timestamp_source: ReconfigTimestampSource::ConfigRegex,
            reconfig_timestamp_match: "(".to_string(),
            ..StatusConfig::default()
        };
        let result = ReconfigSource::from_config(&status, &BirdConfig::default());
        assert!(matches!(result, Err(BirdwatcherError::Config(_))));
    }

    #[test]
    fn test_modified_source() {
        let file = NamedTempFile::new().unwrap();
        let status = StatusConfig {
            reconfig_timestamp_source: ReconfigTimestampSource::ConfigModified,
            ..StatusConfig::default()
        };
        let source = ReconfigSource::from_config(&status, &bird_config(file.path())).unwrap();
        let stamp = source.resolve(None).unwrap().unwrap();
        assert!(DateTime::parse_from_rfc3339(&stamp).is_ok());
        assert!(stamp.ends_with('Z'));
    }

    #[test]
    fn test_missing_file() {
        let source = ReconfigSource::ConfigModified(PathBuf::from("/nonexistent/bird.conf"));
        assert!(matches!(source.resolve(None), Err(BirdwatcherError::Io(_))));
    }
}
