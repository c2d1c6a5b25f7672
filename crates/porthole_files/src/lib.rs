//! Filesystem access for Elm projects.
//!
//! The engine that generates declarations never touches the disk itself; it
//! works on [`ProjectFile`]s handed to it by the host. This crate provides
//! the host side: enumerating the module files a project contains and
//! reading individual files on demand.

use std::path::PathBuf;

use relative_path::RelativePath;
use walkdir::WalkDir;

use porthole_paths::{DirPath, ModulePath, ProjectFilePath, MODULE_FILE_EXTENSION};

/// Directories Elm tooling generates inside a project; their contents never
/// belong to the project's own modules.
const EXCLUDED_DIRECTORIES: [&str; 2] = ["elm-stuff", "node_modules"];

/// A module file as known to the project. The contents are `None` until the
/// file has been read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectFile {
    pub path: ProjectFilePath,
    pub contents: Option<String>,
}

impl ProjectFile {
    /// A file whose contents have not been read yet.
    pub fn unloaded(path: ProjectFilePath) -> ProjectFile {
        ProjectFile {
            path,
            contents: None,
        }
    }
}

/// Enumerates every module file under the configured source directories.
///
/// Results are grouped by source directory, in declaration order. Source
/// directories that do not exist on disk are passed over, as are the cache
/// directories Elm tooling drops inside a project.
pub fn all_project_file_paths(source_directories: &[DirPath]) -> Vec<ProjectFilePath> {
    source_directories
        .iter()
        .flat_map(directory_file_paths)
        .collect()
}

/// Reads the module file identified by `path` from disk.
///
/// The returned file carries the identity it was asked for, so a reply can
/// be matched to its request by equality.
pub fn read_project_file(path: &ProjectFilePath) -> std::io::Result<ProjectFile> {
    let contents = std::fs::read_to_string(path.to_file_path())?;
    Ok(ProjectFile {
        path: path.clone(),
        contents: Some(contents),
    })
}

/// Enumerates the module files of a single source directory.
fn directory_file_paths(source_directory: &DirPath) -> Vec<ProjectFilePath> {
    let root: PathBuf = source_directory.segments().iter().collect();
    if !root.is_dir() {
        return Vec::new();
    }

    WalkDir::new(&root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| {
            if !entry.file_type().is_dir() {
                true
            } else {
                entry.depth() == 0 || !is_excluded_directory(entry)
            }
        })
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let relative = entry
                .path()
                .strip_prefix(&root)
                .expect("walkdir yields paths under its root");
            let relative = match RelativePath::from_path(relative) {
                Ok(relative) => relative,
                Err(error) => {
                    log::warn!("skipping `{}`: {error}", relative.display());
                    return None;
                }
            };
            if relative.extension() != Some(MODULE_FILE_EXTENSION) {
                return None;
            }
            let module_path = ModulePath::from_relative_path(relative)?;
            Some(ProjectFilePath::new(source_directory.clone(), module_path))
        })
        .collect()
}

fn is_excluded_directory(entry: &walkdir::DirEntry) -> bool {
    EXCLUDED_DIRECTORIES
        .iter()
        .any(|excluded| entry.file_name() == *excluded)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use serial_test::serial;

    use porthole_paths::{DirPath, ModulePath, ProjectFilePath};

    use super::{all_project_file_paths, read_project_file, ProjectFile};

    fn write_file(root: &Path, path: &str, contents: &str) {
        let path = root.join(path);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    fn sorted(mut paths: Vec<ProjectFilePath>) -> Vec<ProjectFilePath> {
        paths.sort_by_key(ProjectFilePath::to_file_path);
        paths
    }

    #[test]
    #[serial]
    fn enumerates_module_files_under_the_source_directories() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "src/Main.elm", "module Main exposing (..)\n");
        write_file(dir.path(), "src/Page/Home.elm", "module Page.Home exposing (..)\n");
        write_file(dir.path(), "src/notes.md", "not a module\n");
        write_file(dir.path(), "generated/Api.elm", "module Api exposing (..)\n");
        std::env::set_current_dir(dir.path()).unwrap();

        let source_directories = [
            DirPath::from("src"),
            DirPath::from("generated"),
            DirPath::from("vendor"),
        ];
        let paths = all_project_file_paths(&source_directories);

        assert_eq!(
            sorted(paths),
            sorted(vec![
                ProjectFilePath::new(DirPath::from("src"), ModulePath::new(vec![], "Main")),
                ProjectFilePath::new(
                    DirPath::from("src"),
                    ModulePath::new(vec!["Page".to_owned()], "Home"),
                ),
                ProjectFilePath::new(DirPath::from("generated"), ModulePath::new(vec![], "Api")),
            ])
        );
    }

    #[test]
    #[serial]
    fn tooling_directories_are_not_enumerated() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "src/Main.elm", "module Main exposing (..)\n");
        write_file(dir.path(), "src/elm-stuff/Cached.elm", "");
        write_file(dir.path(), "src/deep/node_modules/lib/Dep.elm", "");
        std::env::set_current_dir(dir.path()).unwrap();

        let paths = all_project_file_paths(&[DirPath::from("src")]);

        assert_eq!(
            paths,
            vec![ProjectFilePath::new(
                DirPath::from("src"),
                ModulePath::new(vec![], "Main"),
            )]
        );
    }

    #[test]
    #[serial]
    fn reads_a_file_with_its_identity() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "src/Main.elm", "module Main exposing (..)\n");
        std::env::set_current_dir(dir.path()).unwrap();

        let path = ProjectFilePath::new(DirPath::from("src"), ModulePath::new(vec![], "Main"));
        let file = read_project_file(&path).unwrap();
        assert_eq!(
            file,
            ProjectFile {
                path,
                contents: Some("module Main exposing (..)\n".to_owned()),
            }
        );
    }

    #[test]
    #[serial]
    fn reading_a_missing_file_fails_with_not_found() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();

        let path = ProjectFilePath::new(DirPath::from("src"), ModulePath::new(vec![], "Gone"));
        let error = read_project_file(&path).unwrap_err();
        assert_eq!(error.kind(), std::io::ErrorKind::NotFound);
    }
}
