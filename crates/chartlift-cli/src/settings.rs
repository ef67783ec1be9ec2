//! Configuration loading and command-line overrides

use std::path::Path;

use chartlift_repo::{ImportConfig, MirrorRule};

use crate::error::{CliError, Result};

/// Load the configuration file, or defaults when none exists
pub fn load(path: Option<&Path>) -> Result<ImportConfig> {
    let config = match path {
        Some(path) => ImportConfig::load_from(path).map_err(|e| {
            CliError::config_with_help(
                e.to_string(),
                format!("Check that {} exists and is valid YAML", path.display()),
            )
        })?,
        None => ImportConfig::load()?,
    };
    Ok(config)
}

/// Parse a `--mirror PATTERN=URL` value
pub fn parse_mirror(value: &str) -> std::result::Result<MirrorRule, String> {
    match value.rsplit_once('=') {
        Some((pattern, mirror)) if !pattern.is_empty() && !mirror.is_empty() => {
            Ok(MirrorRule::new(pattern, mirror))
        }
        _ => Err(format!("expected PATTERN=URL, got '{}'", value)),
    }
}

/// Overwrite `target` when a value was given on the command line
pub fn override_with<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
    if value.is_some() {
        *target = value.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mirror() {
        let rule = parse_mirror(r"^https://github\.com/=https://ghproxy.example.com").unwrap();
        assert_eq!(rule.pattern, r"^https://github\.com/");
        assert_eq!(rule.mirror, "https://ghproxy.example.com");

        assert!(parse_mirror("no-separator").is_err());
        assert!(parse_mirror("=https://m").is_err());
    }

    #[test]
    fn test_override_with() {
        let mut target = Some("file".to_string());
        override_with(&mut target, &None);
        assert_eq!(target.as_deref(), Some("file"));
        override_with(&mut target, &Some("flag".to_string()));
        assert_eq!(target.as_deref(), Some("flag"));
    }

    #[test]
    fn test_load_explicit_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(Some(&dir.path().join("absent.yaml"))).unwrap_err();
        assert!(matches!(err, CliError::Config { .. }));
    }
}
