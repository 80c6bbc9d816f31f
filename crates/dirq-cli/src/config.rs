//! Configuration loading for the Dirq CLI
//!
//! Config file location: ~/.dirq/config.toml, unless `--config` is given.
//! `DIRQ_*` environment variables override the file's default `[ldap]`
//! section.

use anyhow::{Context, Result};
use dirq_core::DirectorySettings;
use std::path::{Path, PathBuf};

/// Get config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .context("Could not determine home directory")?
        .home_dir()
        .to_path_buf();

    Ok(home.join(".dirq"))
}

/// Get config file path
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Load settings from an explicit path or the default location, then apply
/// environment overrides.
///
/// An explicit path must exist; a missing default file means built-in
/// defaults.
pub fn load(path: Option<&Path>) -> Result<DirectorySettings> {
    let mut settings = match path {
        Some(path) => read(path)?,
        None => {
            let default_path = config_path()?;
            if default_path.exists() {
                read(&default_path)?
            } else {
                DirectorySettings::default()
            }
        }
    };

    settings.apply_env();
    Ok(settings)
}

fn read(path: &Path) -> Result<DirectorySettings> {
    DirectorySettings::from_file(&path.to_string_lossy())
        .with_context(|| format!("Failed to load config file: {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[ldap]
url = "ldap://localhost:389"
base_dn = "dc=example,dc=com"

[ldap.groups]
group_member_attr = "uniqueMember"
"#
        )
        .unwrap();

        let settings = load(Some(file.path())).unwrap();
        let config = settings.server(None).unwrap();
        assert_eq!(config.base_dn, "dc=example,dc=com");
        assert_eq!(config.groups.group_member_attr, "uniqueMember");
        assert_eq!(config.groups.group_name_attr, "cn");
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        assert!(load(Some(Path::new("/nonexistent/dirq.toml"))).is_err());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[ldap\nurl = ").unwrap();
        assert!(load(Some(file.path())).is_err());
    }

    #[test]
    fn test_config_path_under_home() {
        let path = config_path().unwrap();
        assert!(path.ends_with(".dirq/config.toml"));
    }
}
