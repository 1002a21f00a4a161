// src/core/paths.rs

use std::path::PathBuf;

use crate::constants::CONFIG_FILE_EXTENSION;
use crate::error::{CliError, CliResult};

/// Returns the per-command default configuration file, `~/.<name>.cfg`.
pub fn default_config_path(command_name: &str) -> CliResult<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| {
        CliError::ConfigPathUnresolved(format!(
            "no home directory found; pass --config to choose a file for '{}'",
            command_name
        ))
    })?;
    Ok(home.join(format!(".{}.{}", command_name, CONFIG_FILE_EXTENSION)))
}

/// Expands `~` and environment variables in a user-supplied path.
pub fn expand_path(raw: &str) -> CliResult<PathBuf> {
    shellexpand::full(raw)
        .map(|expanded| PathBuf::from(expanded.as_ref()))
        .map_err(|e| CliError::ConfigPathUnresolved(format!("'{}': {}", raw, e)))
}

/// The configuration file of an invocation: the explicit `-c` value when
/// present, otherwise the default derived from the root command's name.
pub fn resolve_config_path(explicit: Option<&str>, command_name: &str) -> CliResult<PathBuf> {
    let path = match explicit {
        Some(raw) => expand_path(raw)?,
        None => default_config_path(command_name)?,
    };
    log::debug!("Using configuration file '{}'", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_path_is_hidden_file_in_home() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        assert_eq!(
            default_config_path("mytool").unwrap(),
            home.join(".mytool.cfg")
        );
    }

    #[test]
    fn test_explicit_path_wins_and_is_expanded() {
        let plain = resolve_config_path(Some("/tmp/x.cfg"), "mytool").unwrap();
        assert_eq!(plain, PathBuf::from("/tmp/x.cfg"));

        if let Some(home) = dirs::home_dir() {
            let tilde = resolve_config_path(Some("~/y.cfg"), "mytool").unwrap();
            assert_eq!(tilde, home.join("y.cfg"));
        }
    }

    #[test]
    fn test_unknown_variable_is_unresolved() {
        let err = expand_path("$CLIBIND_SURELY_UNSET_VARIABLE/x.cfg").unwrap_err();
        assert!(matches!(err, CliError::ConfigPathUnresolved(_)), "got: {err}");
    }
}
