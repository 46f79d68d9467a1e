use std::env;
use std::path::PathBuf;

use dirs_next::home_dir;

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    let p = path.trim();
    if p == "~" {
        return home_dir().unwrap_or_else(|| PathBuf::from("~"));
    }
    if let Some(rest) = p.strip_prefix("~/").or_else(|| p.strip_prefix("~\\")) {
        return home_dir().unwrap_or_else(|| PathBuf::from("~")).join(rest);
    }
    PathBuf::from(p)
}

/// Read a path from `var`, falling back to `default` when unset or blank.
pub fn path_from_env(var: &str, default: &str) -> PathBuf {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => expand_tilde(&value),
        _ => PathBuf::from(default),
    }
}
