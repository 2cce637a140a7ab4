//! Directory-backed image dataset scanning.
//!
//! A dataset split is a directory with one subfolder per class; every
//! regular file inside a class folder is one sample. Class indices follow
//! the sorted subfolder names so the mapping is stable across scans and
//! across the train/test/val splits.

use std::path::{Path, PathBuf};

use crate::error::SweepError;

/// One labeled sample.
#[derive(Debug, Clone)]
pub struct ImageSample {
    pub path: PathBuf,
    /// `class/filename`, stable across machines; used in reports.
    pub relative_path: String,
    pub class_index: usize,
}

/// A scanned one-subfolder-per-class image tree.
#[derive(Debug, Clone)]
pub struct ImageFolderSource {
    root: PathBuf,
    class_names: Vec<String>,
    samples: Vec<ImageSample>,
}

impl ImageFolderSource {
    /// Scan `root`, treating each subdirectory as one class.
    ///
    /// Errors if the root is missing, has no class subdirectories, or
    /// contains no sample files at all.
    pub fn scan(root: &Path) -> Result<Self, SweepError> {
        if !root.is_dir() {
            return Err(SweepError::dataset(format!(
                "dataset directory not found: {}",
                root.display()
            )));
        }

        let mut class_names: Vec<String> = std::fs::read_dir(root)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .collect();
        class_names.sort();
        if class_names.is_empty() {
            return Err(SweepError::dataset(format!(
                "no class subdirectories under {}",
                root.display()
            )));
        }

        let mut samples = Vec::new();
        for (class_index, name) in class_names.iter().enumerate() {
            let class_dir = root.join(name);
            let mut files: Vec<PathBuf> = std::fs::read_dir(&class_dir)?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file())
                .collect();
            files.sort();
            for path in files {
                let file_name = path
                    .file_name()
                    .and_then(|s| s.to_str())
                    .unwrap_or_default()
                    .to_string();
                samples.push(ImageSample {
                    relative_path: format!("{name}/{file_name}"),
                    path,
                    class_index,
                });
            }
        }
        if samples.is_empty() {
            return Err(SweepError::dataset(format!(
                "no image files under {}",
                root.display()
            )));
        }

        tracing::debug!(
            root = %root.display(),
            classes = class_names.len(),
            samples = samples.len(),
            "scanned image folder"
        );

        Ok(Self {
            root: root.to_path_buf(),
            class_names,
            samples,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    pub fn num_classes(&self) -> usize {
        self.class_names.len()
    }

    pub fn samples(&self) -> &[ImageSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        std::fs::write(path, b"x").unwrap();
    }

    fn tree_with_classes() -> TempDir {
        let dir = TempDir::new().unwrap();
        for class in ["dogs", "cats", "birds"] {
            std::fs::create_dir(dir.path().join(class)).unwrap();
        }
        touch(&dir.path().join("cats").join("b.png"));
        touch(&dir.path().join("cats").join("a.png"));
        touch(&dir.path().join("dogs").join("d.png"));
        touch(&dir.path().join("birds").join("c.png"));
        dir
    }

    #[test]
    fn test_class_names_are_sorted() {
        let dir = tree_with_classes();
        let source = ImageFolderSource::scan(dir.path()).unwrap();
        assert_eq!(source.class_names(), &["birds", "cats", "dogs"]);
        assert_eq!(source.num_classes(), 3);
    }

    #[test]
    fn test_samples_follow_class_then_file_order() {
        let dir = tree_with_classes();
        let source = ImageFolderSource::scan(dir.path()).unwrap();
        let relative: Vec<&str> = source
            .samples()
            .iter()
            .map(|s| s.relative_path.as_str())
            .collect();
        assert_eq!(
            relative,
            vec!["birds/c.png", "cats/a.png", "cats/b.png", "dogs/d.png"]
        );
        assert_eq!(source.samples()[0].class_index, 0);
        assert_eq!(source.samples()[3].class_index, 2);
    }

    #[test]
    fn test_missing_root_errors() {
        let err = ImageFolderSource::scan(Path::new("/nonexistent/dataset"));
        assert!(matches!(err, Err(SweepError::Dataset(_))));
    }

    #[test]
    fn test_no_classes_errors() {
        let dir = TempDir::new().unwrap();
        let err = ImageFolderSource::scan(dir.path());
        assert!(matches!(err, Err(SweepError::Dataset(_))));
    }

    #[test]
    fn test_empty_classes_error() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("cats")).unwrap();
        let err = ImageFolderSource::scan(dir.path());
        assert!(matches!(err, Err(SweepError::Dataset(_))));
    }
}
