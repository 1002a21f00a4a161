// src/core/config_store.rs

//! # Config Store
//!
//! Owns the on-disk JSON document of one invocation:
//!
//! ```json
//! { "defaultProfile": "default",
//!   "profiles": { "default": { "a": "foo", "subcommands": { "child": { "b": "bar" } } } } }
//! ```
//!
//! The document is loaded (or synthesized) once, mutated in memory by binding
//! and by the save pass, and only written back when explicitly persisted.

use serde_json::{Map, Value};
use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::constants::{DEFAULT_PROFILE, DEFAULT_PROFILE_KEY, PROFILES_KEY};
use crate::error::{CliError, CliResult};
use crate::models::ProfileNode;

/// The configuration file of one invocation and its in-memory document.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    root: Map<String, Value>,
}

impl ConfigStore {
    /// A fresh document: `defaultProfile = "default"` and one empty profile.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        let mut profiles = Map::new();
        profiles.insert(DEFAULT_PROFILE.to_string(), Value::Object(Map::new()));

        let mut root = Map::new();
        root.insert(
            DEFAULT_PROFILE_KEY.to_string(),
            Value::String(DEFAULT_PROFILE.to_string()),
        );
        root.insert(PROFILES_KEY.to_string(), Value::Object(profiles));

        Self {
            path: path.into(),
            root,
        }
    }

    /// Wraps an already-parsed document, which must be a JSON object.
    pub fn from_value(path: impl Into<PathBuf>, value: Value) -> CliResult<Self> {
        let path = path.into();
        match value {
            Value::Object(root) => Ok(Self { path, root }),
            other => Err(CliError::InvalidConfigFormat {
                key: path.display().to_string(),
                reason: format!("is not a json object (found {})", json_type(&other)),
            }),
        }
    }

    /// Loads `path`, or synthesizes a fresh document if it does not exist.
    ///
    /// # Errors
    /// `ConfigRead` when the file exists but cannot be read or parsed,
    /// `InvalidConfigFormat` when it parses to something other than an object.
    pub fn open(path: impl Into<PathBuf>) -> CliResult<Self> {
        let path = path.into();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!(
                    "No configuration file at '{}', starting from an empty one",
                    path.display()
                );
                return Ok(Self::empty(path));
            }
            Err(source) => return Err(CliError::ConfigRead { path, source }),
        };

        let value: Value = match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(e) => {
                return Err(CliError::ConfigRead {
                    path,
                    source: io::Error::from(e),
                });
            }
        };
        log::debug!("Loaded configuration file '{}'", path.display());
        Self::from_value(path, value)
    }

    /// The file the document is read from and written to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The whole document, as it would be written.
    pub fn document(&self) -> &Map<String, Value> {
        &self.root
    }

    /// The profile used when none is selected, if the document names one.
    pub fn default_profile(&self) -> CliResult<Option<&str>> {
        match self.root.get(DEFAULT_PROFILE_KEY) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(name)) => Ok(Some(name)),
            Some(other) => Err(CliError::InvalidConfigFormat {
                key: DEFAULT_PROFILE_KEY.to_string(),
                reason: format!("is not a string (found {})", json_type(other)),
            }),
        }
    }

    /// Records `name` as the default profile, in memory.
    pub fn set_default_profile(&mut self, name: &str) {
        self.root.insert(
            DEFAULT_PROFILE_KEY.to_string(),
            Value::String(name.to_string()),
        );
    }

    /// Picks the profile for this invocation and makes sure its node exists.
    ///
    /// An explicitly requested profile is always accepted, created empty if
    /// needed. Without one, `defaultProfile` is used; if the document has no
    /// `defaultProfile` yet it is set to `"default"` (in memory only).
    pub fn resolve_profile(&mut self, requested: Option<&str>) -> CliResult<String> {
        let default = match self.default_profile()? {
            Some(name) => name.to_string(),
            None => {
                log::debug!("No default profile recorded, using '{}'", DEFAULT_PROFILE);
                self.set_default_profile(DEFAULT_PROFILE);
                DEFAULT_PROFILE.to_string()
            }
        };

        let name = requested.map_or(default, str::to_string);
        self.profile_mut(&name)?;
        log::debug!("Resolved profile '{}'", name);
        Ok(name)
    }

    /// Read access to a profile node, if present and well-formed.
    pub fn profile(&self, name: &str) -> Option<&ProfileNode> {
        self.root
            .get(PROFILES_KEY)
            .and_then(Value::as_object)
            .and_then(|profiles| profiles.get(name))
            .and_then(Value::as_object)
    }

    /// Mutable access to a profile node, creating it (and `profiles`) on demand.
    pub fn profile_mut(&mut self, name: &str) -> CliResult<&mut ProfileNode> {
        let profiles = child_object(&mut self.root, PROFILES_KEY, PROFILES_KEY)?;
        child_object(profiles, name, &format!("{}/{}", PROFILES_KEY, name))
    }

    /// Writes the document as pretty-printed JSON.
    ///
    /// The content goes to a temporary file next to the target which is then
    /// renamed over it, so an interrupted write never leaves a truncated file.
    pub fn persist(&self) -> CliResult<()> {
        self.write_atomically()
            .map_err(|source| CliError::ConfigWrite {
                path: self.path.clone(),
                source,
            })?;
        log::debug!("Saved configuration to '{}'", self.path.display());
        Ok(())
    }

    fn write_atomically(&self) -> io::Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }

        let mut tmp = NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut tmp, &self.root)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Returns the object stored under `key`, creating an empty one if the key is
/// missing or `null`. Any other value there is a format error reported with
/// `key_path`.
pub(crate) fn child_object<'a>(
    parent: &'a mut ProfileNode,
    key: &str,
    key_path: &str,
) -> CliResult<&'a mut ProfileNode> {
    let slot = parent
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if slot.is_null() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(map) => Ok(map),
        other => Err(CliError::InvalidConfigFormat {
            key: key_path.to_string(),
            reason: format!("is not a json object (found {})", json_type(other)),
        }),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_open_missing_file_bootstraps_default_profile() {
        let dir = TempDir::new().unwrap();
        let mut store = ConfigStore::open(dir.path().join("absent.cfg")).unwrap();

        assert_eq!(store.default_profile().unwrap(), Some("default"));
        assert_eq!(store.profile("default"), Some(&Map::new()));
        assert_eq!(store.resolve_profile(None).unwrap(), "default");
        // Nothing is written until persisted.
        assert!(!dir.path().join("absent.cfg").exists());
    }

    #[test]
    fn test_open_rejects_non_object_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("array.cfg");
        fs::write(&path, "[1, 2]").unwrap();

        let err = ConfigStore::open(&path).unwrap_err();
        assert!(matches!(err, CliError::InvalidConfigFormat { .. }), "got: {err}");
    }

    #[test]
    fn test_open_reports_corrupt_json_as_read_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.cfg");
        fs::write(&path, "{ \"profiles\": ").unwrap();

        let err = ConfigStore::open(&path).unwrap_err();
        assert!(matches!(err, CliError::ConfigRead { .. }), "got: {err}");
    }

    #[test]
    fn test_resolve_requested_profile_creates_it() {
        let mut store = ConfigStore::empty("unused.cfg");
        assert_eq!(store.resolve_profile(Some("work")).unwrap(), "work");
        assert_eq!(store.profile("work"), Some(&Map::new()));
        // The default profile is left alone.
        assert_eq!(store.default_profile().unwrap(), Some("default"));
    }

    #[test]
    fn test_resolve_sets_missing_default_in_memory() {
        let mut store =
            ConfigStore::from_value("x.cfg", json!({ "profiles": { "default": { "a": 1 } } }))
                .unwrap();
        assert_eq!(store.default_profile().unwrap(), None);
        assert_eq!(store.resolve_profile(None).unwrap(), "default");
        assert_eq!(store.document()["defaultProfile"], json!("default"));
        assert_eq!(store.profile("default").unwrap()["a"], json!(1));
    }

    #[test]
    fn test_scalar_profiles_is_a_format_error() {
        let mut store = ConfigStore::from_value("x.cfg", json!({ "profiles": 3 })).unwrap();
        let err = store.resolve_profile(None).unwrap_err();
        assert!(
            matches!(&err, CliError::InvalidConfigFormat { key, .. } if key == "profiles"),
            "got: {err}"
        );
    }

    #[test]
    fn test_persist_writes_pretty_json_and_reloads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("app.cfg");
        let mut store = ConfigStore::open(&path).unwrap();
        store
            .profile_mut("default")
            .unwrap()
            .insert("a".to_string(), json!("foo"));
        store.persist().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  \"defaultProfile\": \"default\""));

        let reloaded = ConfigStore::open(&path).unwrap();
        assert_eq!(reloaded.document(), store.document());

        // Only the target remains in the directory: no stray temporary files.
        let entries = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_persist_failure_is_a_write_error() {
        let dir = TempDir::new().unwrap();
        // The target is an existing directory, so the final rename fails.
        let store = ConfigStore::empty(dir.path());
        let err = store.persist().unwrap_err();
        assert!(matches!(err, CliError::ConfigWrite { .. }), "got: {err}");
    }
}
