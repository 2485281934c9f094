use crate::errors::Error;
use log::trace;
use serde_json::Value;
use std::path::{Component, Path, PathBuf};

/// Source of every document the compiler reads: specs, test definitions,
/// examples, ARM templates and their parameter files.
pub trait FileLoader {
    async fn load(&self, path: &Path) -> Result<String, Error>;
}

pub struct FsFileLoader;

impl FileLoader for FsFileLoader {
    async fn load(&self, path: &Path) -> Result<String, Error> {
        trace!("reading {}", path.display());
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::io(path, e))
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
        .unwrap_or(false)
}

/// Parses a structured document, choosing YAML or JSON by file extension.
pub fn parse_document(path: &Path, content: &str) -> Result<Value, Error> {
    if is_yaml(path) {
        serde_yaml::from_str::<Value>(content).map_err(|e| Error::parse(path, e))
    } else {
        serde_json::from_str::<Value>(content).map_err(|e| Error::parse(path, e))
    }
}

pub async fn load_document<L: FileLoader>(files: &L, path: &Path) -> Result<Value, Error> {
    let content = files.load(path).await?;
    parse_document(path, &content)
}

/// Joins `path` onto `base` (when relative) and onto the working directory
/// (when still relative), then removes `.` and `..` components lexically.
/// The file is never touched, so links to files that do not exist yet
/// still normalize to one canonical key.
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let rooted = if joined.is_absolute() {
        joined
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(&joined))
            .unwrap_or(joined)
    };

    let mut normalized = PathBuf::new();
    for component in rooted.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }

    normalized
}

/// Directory containing `file`, for resolving references relative to it.
pub fn parent_dir(file: &Path) -> PathBuf {
    file.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
