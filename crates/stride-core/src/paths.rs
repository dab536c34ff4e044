use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const STRIDE_DIR: &str = ".stride";
pub const USERS_DIR: &str = ".stride/users";
pub const CONFIG_FILE: &str = ".stride/config.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn users_dir(root: &Path) -> PathBuf {
    root.join(USERS_DIR)
}

/// One YAML document per user. The file stem is the URL-safe base64 of the
/// id: distinct ids never share a file and no id can leave the directory.
pub fn user_data_path(root: &Path, user_id: &str) -> PathBuf {
    users_dir(root).join(format!("{}.yaml", file_stem(user_id)))
}

fn file_stem(id: &str) -> String {
    URL_SAFE_NO_PAD.encode(id.as_bytes())
}
