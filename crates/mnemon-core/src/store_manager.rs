//! Named-store resolution: directory layout, the active-store pointer
//! file, and store name validation.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

pub const DEFAULT_STORE_NAME: &str = "default";

static VALID_STORE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_-]*$").unwrap());

/// Whether `name` matches `[A-Za-z0-9][A-Za-z0-9_-]*`.
pub fn valid_store_name(name: &str) -> bool {
    VALID_STORE_NAME_RE.is_match(name)
}

/// `~/.mnemon`, the fallback when no base directory is configured.
pub fn default_data_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|u| u.home_dir().join(".mnemon"))
        .unwrap_or_else(|| PathBuf::from(".mnemon"))
}

/// `<base_dir>/data/<name>`.
pub fn store_dir(base_dir: &Path, name: &str) -> PathBuf {
    base_dir.join("data").join(name)
}

fn active_file(base_dir: &Path) -> PathBuf {
    base_dir.join("active")
}

/// Read the active store name from `<base_dir>/active`, falling back to
/// [`DEFAULT_STORE_NAME`] if the pointer is missing or empty.
pub fn read_active(base_dir: &Path) -> String {
    match std::fs::read_to_string(active_file(base_dir)) {
        Ok(data) => {
            let name = data.trim();
            if name.is_empty() { DEFAULT_STORE_NAME.to_string() } else { name.to_string() }
        }
        Err(_) => DEFAULT_STORE_NAME.to_string(),
    }
}

/// Persist `name` as the active store.
pub fn write_active(base_dir: &Path, name: &str) -> std::io::Result<()> {
    std::fs::create_dir_all(base_dir)?;
    std::fs::write(active_file(base_dir), format!("{name}\n"))
}

/// Sorted names of every store directory under `<base_dir>/data/`.
pub fn list_stores(base_dir: &Path) -> std::io::Result<Vec<String>> {
    let data_dir = base_dir.join("data");
    if !data_dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names: Vec<String> = std::fs::read_dir(data_dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().into_string().ok())
        .collect();
    names.sort();
    Ok(names)
}

pub fn store_exists(base_dir: &Path, name: &str) -> bool {
    store_dir(base_dir, name).is_dir()
}

/// Resolve the effective base directory: an explicit override, then
/// `MNEMON_DATA_DIR`, then [`default_data_dir`].
pub fn resolve_base_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    if let Ok(env) = std::env::var("MNEMON_DATA_DIR") {
        if !env.is_empty() {
            return PathBuf::from(env);
        }
    }
    default_data_dir()
}

/// Resolve the effective active store name: an explicit flag, then
/// `MNEMON_STORE`, then the `active` pointer file, then the default.
pub fn resolve_store_name(base_dir: &Path, explicit: Option<&str>) -> String {
    if let Some(name) = explicit {
        if !name.is_empty() {
            return name.to_string();
        }
    }
    if let Ok(env) = std::env::var("MNEMON_STORE") {
        if !env.is_empty() {
            return env;
        }
    }
    read_active(base_dir)
}

/// Resolve `(base_dir, store_name)` purely from environment variables
/// and on-disk state, with no explicit overrides. Used by the CLI to
/// seed its config before applying any `--data-dir`/`--store` flags.
pub fn from_env() -> (PathBuf, String) {
    let base_dir = resolve_base_dir(None);
    let store_name = resolve_store_name(&base_dir, None);
    (base_dir, store_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_name_validation() {
        assert!(valid_store_name("default"));
        assert!(valid_store_name("work-1"));
        assert!(valid_store_name("a_b"));
        assert!(!valid_store_name("-leading-dash"));
        assert!(!valid_store_name(""));
        assert!(!valid_store_name("has space"));
    }

    #[test]
    fn active_pointer_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_active(dir.path()), DEFAULT_STORE_NAME);
        write_active(dir.path(), "work").unwrap();
        assert_eq!(read_active(dir.path()), "work");
    }

    #[test]
    fn list_stores_is_sorted_and_empty_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_stores(dir.path()).unwrap().is_empty());
        std::fs::create_dir_all(store_dir(dir.path(), "zeta")).unwrap();
        std::fs::create_dir_all(store_dir(dir.path(), "alpha")).unwrap();
        assert_eq!(list_stores(dir.path()).unwrap(), vec!["alpha".to_string(), "zeta".to_string()]);
    }

    #[test]
    fn resolve_store_name_prefers_explicit_over_pointer() {
        let dir = tempfile::tempdir().unwrap();
        write_active(dir.path(), "pointer-store").unwrap();
        assert_eq!(resolve_store_name(dir.path(), Some("flag-store")), "flag-store");
        assert_eq!(resolve_store_name(dir.path(), None), "pointer-store");
    }
}
