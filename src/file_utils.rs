// File utilities for the whisper CLI backend
//
// Each model call gets its own scratch folder, named after a UUID, holding
// the WAV input and the JSON output. The folder is removed once the call
// finishes.

use log::{debug, error};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Paths used by a single model call
#[derive(Debug, Clone)]
pub struct ScratchPaths {
    /// Unique folder for this call
    pub folder: PathBuf,
    /// Audio file path inside the folder
    pub audio_file: PathBuf,
    /// Output path prefix, the CLI appends its own extension
    pub output_prefix: PathBuf,
    /// Folder name (UUID)
    pub id: String,
}

impl ScratchPaths {
    /// Path of the JSON file written for `output_prefix`
    pub fn json_output(&self) -> PathBuf {
        self.output_prefix.with_extension("json")
    }
}

/// Create a unique scratch folder under `base_dir`
///
/// # Errors
///
/// Returns an IO error if directory creation fails
pub fn create_scratch_paths(base_dir: &Path, prefix: &str) -> io::Result<ScratchPaths> {
    let id = Uuid::new_v4().to_string();
    let folder = base_dir.join(&id);

    fs::create_dir_all(&folder)?;

    let audio_file = folder.join(format!("{}_{}.wav", prefix, id));
    let output_prefix = folder.join(format!("{}_{}", prefix, id));

    Ok(ScratchPaths {
        folder,
        audio_file,
        output_prefix,
        id,
    })
}

/// Remove a folder and its contents
///
/// Errors are logged, not returned
pub fn cleanup_folder(folder_path: &Path) {
    if let Err(e) = fs::remove_dir_all(folder_path) {
        error!("Failed to clean up folder {}: {}", folder_path.display(), e);
    } else {
        debug!("Cleaned up folder: {}", folder_path.display());
    }
}
