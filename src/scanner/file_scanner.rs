//! Image file scanning and collection

use lazy_static::lazy_static;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

lazy_static! {
    /// Lowercase extensions, without the dot, treated as image candidates
    pub static ref IMAGE_EXTENSIONS: HashSet<&'static str> = [
        "jpg", "jpeg", "png", "gif", "bmp", "webp", "tiff", "tif", "ico",
    ]
    .into_iter()
    .collect();
}

/// Whether `path` carries a recognised image extension (case-insensitive).
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| IMAGE_EXTENSIONS.contains(ext.to_string_lossy().to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Collect all image files below a directory
///
/// # Arguments
/// * `root` - Directory to scan recursively
///
/// # Returns
/// Image file paths in discovery order (depth-first). Unreadable
/// directories are logged and skipped; an empty vector means nothing
/// was found.
pub fn collect_image_files(root: &Path) -> Vec<PathBuf> {
    let mut image_files = Vec::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let location = e.path().unwrap_or(root).display().to_string();
                warn!(path = %location, error = %e, "Skipping unreadable entry");
                continue;
            }
        };

        if entry.file_type().is_file() && is_image_file(entry.path()) {
            image_files.push(entry.into_path());
        }
    }

    image_files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::TempDir;

    #[test]
    fn test_is_image_file() {
        assert!(is_image_file(Path::new("a.jpg")));
        assert!(is_image_file(Path::new("a.JPEG")));
        assert!(is_image_file(Path::new("dir/a.Tif")));
        assert!(is_image_file(Path::new("favicon.ico")));
        assert!(!is_image_file(Path::new("notes.txt")));
        assert!(!is_image_file(Path::new("archive.png.zip")));
        assert!(!is_image_file(Path::new("png")));
    }

    #[test]
    fn test_collect_filters_non_images() {
        let temp_dir = TempDir::new().unwrap();
        File::create(temp_dir.path().join("photo.png")).unwrap();
        File::create(temp_dir.path().join("readme.md")).unwrap();
        File::create(temp_dir.path().join("data.json")).unwrap();

        let files = collect_image_files(temp_dir.path());
        assert_eq!(files, vec![temp_dir.path().join("photo.png")]);
    }

    #[test]
    fn test_collect_recursive() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        File::create(temp_dir.path().join("top.webp")).unwrap();
        File::create(nested.join("deep.GIF")).unwrap();
        File::create(nested.join("deep.txt")).unwrap();

        let mut files = collect_image_files(temp_dir.path());
        files.sort();
        assert_eq!(files, vec![nested.join("deep.GIF"), temp_dir.path().join("top.webp")]);
    }

    #[test]
    fn test_directory_named_like_image_is_not_a_candidate() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("album.png")).unwrap();

        assert!(collect_image_files(temp_dir.path()).is_empty());
    }

    #[test]
    fn test_empty_and_missing_roots() {
        let temp_dir = TempDir::new().unwrap();
        assert!(collect_image_files(temp_dir.path()).is_empty());
        assert!(collect_image_files(&temp_dir.path().join("missing")).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subdirectory_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let locked = temp_dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        File::create(locked.join("hidden.png")).unwrap();
        File::create(temp_dir.path().join("visible.png")).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users can read it anyway
        let readable = fs::read_dir(&locked).is_ok();
        let files = collect_image_files(temp_dir.path());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        if readable {
            return;
        }
        assert_eq!(files, vec![temp_dir.path().join("visible.png")]);
    }
}
