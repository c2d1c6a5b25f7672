use std::fmt;
use std::path::MAIN_SEPARATOR;

use crate::path_segments;

/// The path of a source directory, stored as its segments.
///
/// Source directories come from the project configuration in declaration
/// order, and that order is significant: when several directories could
/// claim the same file, the first declared one wins.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct DirPath(Vec<String>);

impl DirPath {
    /// The empty directory path, the root the project configuration lives
    /// in. Files that fall under no configured source directory resolve
    /// against this path.
    pub fn empty() -> DirPath {
        DirPath(Vec::new())
    }

    /// The segments of this directory path, in order.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// True if `segments` starts with this directory path and extends
    /// beyond it by at least one segment.
    ///
    /// A directory that consumes all of `segments` would leave nothing to
    /// name a module with, so equality does not count as a match.
    pub fn is_strict_prefix_of(&self, segments: &[String]) -> bool {
        segments.len() > self.0.len() && segments.starts_with(&self.0)
    }
}

impl From<&str> for DirPath {
    fn from(path: &str) -> DirPath {
        DirPath(path_segments(path))
    }
}

impl fmt::Display for DirPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut segments = self.0.iter();
        if let Some(first) = segments.next() {
            write!(f, "{first}")?;
            for segment in segments {
                write!(f, "{MAIN_SEPARATOR}{segment}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::DirPath;

    #[test]
    fn splits_into_segments() {
        assert_eq!(DirPath::from("src").segments(), ["src"]);
        assert_eq!(DirPath::from("app/elm").segments(), ["app", "elm"]);
        assert_eq!(DirPath::from("src/").segments(), ["src"]);
    }

    #[test]
    fn empty_has_no_segments() {
        assert!(DirPath::from("").segments().is_empty());
        assert_eq!(DirPath::from(""), DirPath::empty());
    }

    #[test]
    fn strict_prefix_requires_a_remainder() {
        let dir = DirPath::from("src");
        let segments = ["src".to_owned(), "Main".to_owned()];
        assert!(dir.is_strict_prefix_of(&segments));
        assert!(!dir.is_strict_prefix_of(&segments[..1]));
        assert!(!DirPath::from("lib").is_strict_prefix_of(&segments));
    }

    #[test]
    fn empty_is_a_strict_prefix_of_anything_nonempty() {
        let segments = ["Main".to_owned()];
        assert!(DirPath::empty().is_strict_prefix_of(&segments));
        assert!(!DirPath::empty().is_strict_prefix_of(&[]));
    }
}
