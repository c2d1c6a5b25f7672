//! Path handling for Elm projects.
//!
//! An Elm project declares a set of *source directories* in its `elm.json`.
//! A module lives in exactly one of them, and its place on disk mirrors its
//! dotted name: the module `Page.Home` found in the source directory `src`
//! is stored as `src/Page/Home.elm`. This crate provides the three types
//! that capture that correspondence:
//!
//! * [`DirPath`]: the segments of a configured source directory,
//! * [`ModulePath`]: the dotted identity of a module (namespace plus name),
//! * [`ProjectFilePath`]: a module paired with the source directory it was
//!   resolved against, the canonical identity of a module file.
//!
//! Conversions between the filesystem world and the module world go through
//! [`ProjectFilePath::resolve`] and [`ProjectFilePath::to_file_path`], which
//! are inverses of each other for any path that lies under a configured
//! source directory.

pub use dir_path::DirPath;
pub use module_path::ModulePath;
pub use project_file_path::ProjectFilePath;

mod dir_path;
mod module_path;
mod project_file_path;

/// The file extension of Elm module files, without the leading dot.
pub const MODULE_FILE_EXTENSION: &str = "elm";

/// Splits a path string into its segments, one per path component.
///
/// Component spelling is preserved; only empty components and non-leading
/// `.` components are normalized away.
pub(crate) fn path_segments(path: &str) -> Vec<String> {
    std::path::Path::new(path)
        .components()
        .map(|component| {
            component
                .as_os_str()
                .to_str()
                .expect("components of a utf-8 path are utf-8")
                .to_owned()
        })
        .collect()
}
