use std::fmt;
use std::path::PathBuf;

use crate::{path_segments, DirPath, ModulePath, MODULE_FILE_EXTENSION};

/// The canonical identity of a module file in a project: the module path
/// together with the source directory it was resolved against.
///
/// Two `ProjectFilePath`s are the same file exactly when they compare
/// equal, which makes this the correlation key for everything that refers
/// to files across the engine boundary.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProjectFilePath {
    pub source_directory: DirPath,
    pub module_path: ModulePath,
}

impl ProjectFilePath {
    pub fn new(source_directory: DirPath, module_path: ModulePath) -> ProjectFilePath {
        ProjectFilePath {
            source_directory,
            module_path,
        }
    }

    /// Resolves a textual file path against the configured source
    /// directories, in declaration order.
    ///
    /// The first directory that is a strict prefix of the path claims the
    /// file; the segments after it form the module path. A path under no
    /// configured directory resolves against [`DirPath::empty`], so the
    /// whole path becomes the module path. Only the empty path resolves to
    /// nothing.
    pub fn resolve(path: &str, source_directories: &[DirPath]) -> Option<ProjectFilePath> {
        let mut segments = path_segments(path);
        let last = segments.pop()?;
        segments.push(strip_module_extension(&last).to_owned());

        let source_directory = source_directories
            .iter()
            .find(|dir| dir.is_strict_prefix_of(&segments))
            .cloned()
            .unwrap_or_else(DirPath::empty);
        let module_segments = segments.split_off(source_directory.segments().len());
        let module_path = ModulePath::from_segments(module_segments)
            .expect("a strict prefix leaves at least one module segment");
        Some(ProjectFilePath {
            source_directory,
            module_path,
        })
    }

    /// The location of this module file on disk: the source directory
    /// segments, the namespace chain, and the module name with the module
    /// file extension.
    pub fn to_file_path(&self) -> PathBuf {
        let mut path: PathBuf = self.source_directory.segments().iter().collect();
        for namespace in self.module_path.namespace() {
            path.push(namespace);
        }
        path.push(format!(
            "{}.{}",
            self.module_path.name(),
            MODULE_FILE_EXTENSION
        ));
        path
    }
}

impl fmt::Display for ProjectFilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_file_path().display())
    }
}

/// Strips the module file extension from a path segment, leaving segments
/// without it untouched.
fn strip_module_extension(segment: &str) -> &str {
    segment
        .strip_suffix(MODULE_FILE_EXTENSION)
        .and_then(|stem| stem.strip_suffix('.'))
        .unwrap_or(segment)
}
