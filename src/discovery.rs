use std::{
    cmp::Ordering,
    fs,
    path::{Path, PathBuf},
};

use walkdir::{DirEntry, WalkDir};

use crate::errors::{FixtureError, HarnessError};

// =====================
// Core Types
// =====================

/// One fixture file, read and ready to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureSource {
    /// File name without its extension.
    pub logical_name: String,
    /// Path relative to the root, without extension, `/`-separated. Unique
    /// within a run, so it is the name the template is registered under.
    pub template_name: String,
    pub path: PathBuf,
    pub raw_text: String,
}

/// A candidate that could not be read. The run reports it and carries on.
#[derive(Debug)]
pub struct UnreadableFixture {
    pub name: String,
    pub path: PathBuf,
    pub error: FixtureError,
}

/// Enumerates fixture files under a root directory.
///
/// Traversal is depth-first. Within a directory, files come first, ordered
/// by file name (byte-wise, locale-independent), then subdirectories in the
/// same order. Symlinks to files are read through; symlinked directories are
/// not descended.
///
/// The locator is restartable: each call to [`FixtureLocator::iter`] walks
/// the tree afresh.
#[derive(Debug, Clone)]
pub struct FixtureLocator {
    root: PathBuf,
    extensions: Vec<String>,
}

impl FixtureLocator {
    /// Checks that `root` is a readable directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, HarnessError> {
        let root = root.into();
        let metadata = fs::metadata(&root).map_err(|source| HarnessError::Io {
            path: root.clone(),
            source,
        })?;
        if !metadata.is_dir() {
            return Err(HarnessError::NotADirectory { path: root });
        }
        fs::read_dir(&root).map_err(|source| HarnessError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self {
            root,
            extensions: Vec::new(),
        })
    }

    /// Restricts candidates to the given extensions (with or without the
    /// leading dot). No extensions means every regular file is a candidate.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_string())
            .filter(|ext| !ext.is_empty())
            .collect();
        self
    }

    pub fn iter(&self) -> Fixtures<'_> {
        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by(files_first_by_name)
            .into_iter();
        Fixtures {
            locator: self,
            walker,
        }
    }

    fn accepts(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|wanted| wanted == ext))
    }

    fn read(&self, path: &Path) -> Result<FixtureSource, UnreadableFixture> {
        let logical_name = logical_name(path);
        match fs::read_to_string(path) {
            Ok(raw_text) => Ok(FixtureSource {
                template_name: self.template_name(path),
                logical_name,
                path: path.to_path_buf(),
                raw_text,
            }),
            Err(source) => Err(UnreadableFixture {
                name: logical_name,
                path: path.to_path_buf(),
                error: FixtureError::Unreadable {
                    path: path.to_path_buf(),
                    source,
                },
            }),
        }
    }

    fn template_name(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .with_extension("")
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl<'a> IntoIterator for &'a FixtureLocator {
    type Item = Result<FixtureSource, UnreadableFixture>;
    type IntoIter = Fixtures<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy iterator over the fixtures of a [`FixtureLocator`].
pub struct Fixtures<'a> {
    locator: &'a FixtureLocator,
    walker: walkdir::IntoIter,
}

impl Iterator for Fixtures<'_> {
    type Item = Result<FixtureSource, UnreadableFixture>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map_or_else(|| self.locator.root.clone(), Path::to_path_buf);
                    return Some(Err(UnreadableFixture {
                        name: logical_name(&path),
                        error: FixtureError::Walk {
                            path: path.clone(),
                            message: e.to_string(),
                        },
                        path,
                    }));
                }
            };

            if !is_candidate(&entry) || !self.locator.accepts(entry.path()) {
                continue;
            }
            return Some(self.locator.read(entry.path()));
        }
    }
}

// =====================
// Internal Helpers
// =====================

fn files_first_by_name(a: &DirEntry, b: &DirEntry) -> Ordering {
    let a_dir = a.file_type().is_dir();
    let b_dir = b.file_type().is_dir();
    a_dir
        .cmp(&b_dir)
        .then_with(|| a.file_name().cmp(b.file_name()))
}

/// Regular files and symlinks that do not resolve to a directory. A dangling
/// link is kept so the failed read shows up in the report.
fn is_candidate(entry: &DirEntry) -> bool {
    entry.file_type().is_file() || (entry.path_is_symlink() && !entry.path().is_dir())
}

fn logical_name(path: &Path) -> String {
    path.file_stem()
        .or_else(|| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
