//! Site artifacts and directory collection.
//!
//! An artifact is one file of the built site: its site path, its bytes and the
//! content type the Pages edge will serve it with.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Result;

/// Content type used when the extension is unknown.
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Entries never deployed.
const IGNORED_NAMES: &[&str] = &[".DS_Store", ".git", "node_modules", "Thumbs.db"];

/// One file to deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileArtifact {
    path: String,
    content: Arc<[u8]>,
    content_type: String,
}

impl FileArtifact {
    /// Creates an artifact from its site path, bytes and content type.
    ///
    /// The path is normalized to start with `/`.
    #[must_use]
    pub fn new(path: impl Into<String>, content: impl Into<Arc<[u8]>>, content_type: impl Into<String>) -> Self {
        let path = path.into();
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };

        Self {
            path,
            content: content.into(),
            content_type: content_type.into(),
        }
    }

    /// Creates an artifact whose content type is derived from the path.
    #[must_use]
    pub fn with_guessed_type(path: impl Into<String>, content: impl Into<Arc<[u8]>>) -> Self {
        let path = path.into();
        let content_type = content_type_for(&path);
        Self::new(path, content, content_type)
    }

    /// Site path, e.g. `/index.html`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// File bytes.
    #[must_use]
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// MIME type sent as upload metadata.
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Size of the content in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Returns true if the file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Returns the MIME type for a path based on its extension.
#[must_use]
pub fn content_type_for(path: &str) -> &'static str {
    let extension = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("html" | "htm") => "text/html",
        Some("css") => "text/css",
        Some("js" | "mjs") => "application/javascript",
        Some("json" | "map") => "application/json",
        Some("xml") => "application/xml",
        Some("txt") => "text/plain",
        Some("md") => "text/markdown",
        Some("csv") => "text/csv",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",
        Some("wasm") => "application/wasm",
        Some("pdf") => "application/pdf",
        Some("webmanifest") => "application/manifest+json",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mp3") => "audio/mpeg",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

/// Reads every file under `root` into artifacts, sorted by site path.
///
/// Site paths are relative to `root`, use `/` separators and start with `/`.
///
/// # Errors
///
/// Returns an error if the directory or one of its files cannot be read.
pub fn collect_artifacts(root: impl AsRef<Path>) -> Result<Vec<FileArtifact>> {
    let root = root.as_ref();
    let mut artifacts = Vec::new();

    let mut visited = HashSet::new();
    walk_dir(root, root, &mut visited, &mut artifacts)?;
    artifacts.sort_by(|a, b| a.path.cmp(&b.path));

    debug!("Collected {} files from {}", artifacts.len(), root.display());
    Ok(artifacts)
}

/// Symbolic links are followed. A directory reached twice through links is
/// walked once, and a link to nothing is skipped.
fn walk_dir(
    root: &Path,
    current: &Path,
    visited: &mut HashSet<PathBuf>,
    artifacts: &mut Vec<FileArtifact>,
) -> Result<()> {
    if !visited.insert(current.canonicalize()?) {
        debug!("Skipping already visited directory {}", current.display());
        return Ok(());
    }

    for entry in std::fs::read_dir(current)? {
        let entry = entry?;
        let name = entry.file_name();
        if IGNORED_NAMES.iter().any(|ignored| name == *ignored) {
            continue;
        }

        let path = entry.path();
        let metadata = match std::fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Skipping broken link {}", path.display());
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if metadata.is_dir() {
            walk_dir(root, &path, visited, artifacts)?;
        } else if metadata.is_file() {
            let relative = path.strip_prefix(root).map_err(std::io::Error::other)?;
            let site_path = relative.to_string_lossy().replace('\\', "/");
            let content = std::fs::read(&path)?;

            artifacts.push(FileArtifact::with_guessed_type(site_path, content));
        } else {
            debug!("Skipping {}: not a regular file", path.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_site() -> TempDir {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let root = dir.path();

        fs::write(root.join("index.html"), b"<h1>home</h1>").expect("write index");
        fs::create_dir_all(root.join("assets").join("img")).expect("create assets");
        fs::write(root.join("assets").join("style.css"), b"body{}").expect("write css");
        fs::write(root.join("assets").join("img").join("logo.PNG"), [0x89, b'P', b'N', b'G'])
            .expect("write png");
        fs::write(root.join(".DS_Store"), b"junk").expect("write junk");
        fs::create_dir_all(root.join(".git")).expect("create .git");
        fs::write(root.join(".git").join("HEAD"), b"ref").expect("write HEAD");

        dir
    }

    #[test]
    fn test_collect_artifacts() {
        let site = create_site();
        let artifacts = collect_artifacts(site.path()).expect("collect failed");

        let paths: Vec<&str> = artifacts.iter().map(FileArtifact::path).collect();
        assert_eq!(
            paths,
            vec!["/assets/img/logo.PNG", "/assets/style.css", "/index.html"]
        );

        let index = &artifacts[2];
        assert_eq!(index.content(), b"<h1>home</h1>");
        assert_eq!(index.content_type(), "text/html");
        assert_eq!(artifacts[0].content_type(), "image/png");
    }

    #[test]
    fn test_collect_missing_directory() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        assert!(collect_artifacts(dir.path().join("dist")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_collect_follows_symlinks() {
        use std::os::unix::fs::symlink;

        let outside = TempDir::new().expect("Failed to create temp dir");
        fs::write(outside.path().join("shared.css"), b"a{}").expect("write shared");

        let site = TempDir::new().expect("Failed to create temp dir");
        let root = site.path();
        fs::write(root.join("index.html"), b"home").expect("write index");
        symlink(outside.path().join("shared.css"), root.join("shared.css")).expect("link file");
        symlink(root, root.join("loop")).expect("link loop");
        symlink(root.join("gone.txt"), root.join("broken.txt")).expect("link broken");

        let artifacts = collect_artifacts(root).expect("collect failed");
        let paths: Vec<&str> = artifacts.iter().map(FileArtifact::path).collect();
        assert_eq!(paths, vec!["/index.html", "/shared.css"]);
        assert_eq!(artifacts[1].content(), b"a{}");
    }

    #[test]
    fn test_path_is_normalized() {
        let artifact = FileArtifact::new("index.html", b"x".to_vec(), "text/html");
        assert_eq!(artifact.path(), "/index.html");

        let artifact = FileArtifact::new("/about.html", b"x".to_vec(), "text/html");
        assert_eq!(artifact.path(), "/about.html");
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("/app.js"), "application/javascript");
        assert_eq!(content_type_for("/fonts/a.woff2"), "font/woff2");
        assert_eq!(content_type_for("/LICENSE"), DEFAULT_CONTENT_TYPE);
        assert_eq!(content_type_for("/archive.tar.gz"), DEFAULT_CONTENT_TYPE);
    }
}
