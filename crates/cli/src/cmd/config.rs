//! Show effective tracker configuration

use anyhow::{Context, Result};
use audit_core::AuditConfig;
use owo_colors::OwoColorize;
use std::path::Path;

/// Load configuration from `path`, or defaults when none is given
pub fn load(path: Option<&Path>) -> Result<AuditConfig> {
    match path {
        Some(path) => AuditConfig::load(path).context("Failed to load tracker configuration"),
        None => Ok(AuditConfig::default()),
    }
}

pub async fn run(path: Option<&Path>) -> Result<()> {
    let config = load(path)?;

    println!("{}", "Tracker Configuration".bold());
    match path {
        Some(path) => println!("{}: {}\n", "Location".dimmed(), path.display().dimmed()),
        None => println!("{}\n", "(built-in defaults)".dimmed()),
    }

    print!("{}", config.to_toml_string()?);

    println!("\n{}", "Constraint:".bold());
    println!("  max_debounce_ms >= debounce_ms");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_without_path() {
        assert_eq!(load(None).unwrap(), AuditConfig::default());
    }

    #[test]
    fn test_load_reports_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("audit.toml");
        std::fs::write(&path, "[read]\ndebounce_ms = 5000\nmax_debounce_ms = 10\n").unwrap();

        let err = load(Some(&path)).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to load tracker configuration"));
    }
}
