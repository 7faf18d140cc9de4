use std::path::PathBuf;

use directories::ProjectDirs;

/// Directory holding the SQLite database and generated reports.
///
/// Debug builds keep everything under `./dev_assets` so a development checkout never
/// touches the user's real data directory.
pub fn asset_dir() -> PathBuf {
    let path = if cfg!(debug_assertions) {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../dev_assets")
    } else {
        ProjectDirs::from("app", "housy", "housy")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".housy"))
    };

    if !path.exists() {
        if let Err(e) = std::fs::create_dir_all(&path) {
            tracing::warn!(path = %path.display(), error = %e, "Failed to create asset directory");
        }
    }

    path
}

pub fn database_path() -> PathBuf {
    asset_dir().join("housy.sqlite")
}

pub fn reports_dir() -> PathBuf {
    asset_dir().join("reports")
}
