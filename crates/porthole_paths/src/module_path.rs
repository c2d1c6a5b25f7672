use std::fmt;

use relative_path::RelativePath;

/// The dotted identity of a module: its namespace chain and its name.
///
/// `Page.Home` has the namespace `["Page"]` and the name `Home`; a
/// top-level module such as `Main` has an empty namespace. The namespace
/// mirrors the directory chain between the source directory and the module
/// file, and the name is always present.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModulePath {
    namespace: Vec<String>,
    name: String,
}

impl ModulePath {
    pub fn new(namespace: Vec<String>, name: impl Into<String>) -> ModulePath {
        ModulePath {
            namespace,
            name: name.into(),
        }
    }

    /// Interprets a non-empty segment sequence as a module path, taking the
    /// last segment as the name and the rest as the namespace.
    ///
    /// Returns `None` for an empty sequence, which names no module.
    pub fn from_segments(mut segments: Vec<String>) -> Option<ModulePath> {
        let name = segments.pop()?;
        Some(ModulePath {
            namespace: segments,
            name,
        })
    }

    /// Derives the module path from a file path relative to its source
    /// directory, dropping the file extension.
    pub fn from_relative_path(path: &RelativePath) -> Option<ModulePath> {
        let path = path.with_extension("");
        let segments = path
            .components()
            .map(|component| component.as_str().to_owned())
            .collect();
        ModulePath::from_segments(segments)
    }

    /// The namespace chain, outermost first.
    pub fn namespace(&self) -> &[String] {
        &self.namespace
    }

    /// The module's own name, the last dotted segment.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for namespace in &self.namespace {
            write!(f, "{namespace}.")?;
        }
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use relative_path::RelativePath;

    use super::ModulePath;

    #[test]
    fn last_segment_is_the_name() {
        let path = ModulePath::from_segments(vec![
            "Page".to_owned(),
            "Settings".to_owned(),
            "Form".to_owned(),
        ])
        .unwrap();
        assert_eq!(path.namespace(), ["Page", "Settings"]);
        assert_eq!(path.name(), "Form");
    }

    #[test]
    fn empty_segments_name_no_module() {
        assert_eq!(ModulePath::from_segments(vec![]), None);
    }

    #[test]
    fn from_relative_path_drops_the_extension() {
        let path = ModulePath::from_relative_path(RelativePath::new("Page/Home.elm")).unwrap();
        assert_eq!(path, ModulePath::new(vec!["Page".to_owned()], "Home"));

        let top_level = ModulePath::from_relative_path(RelativePath::new("Main.elm")).unwrap();
        assert_eq!(top_level, ModulePath::new(vec![], "Main"));
    }

    #[test]
    fn displays_dotted() {
        let path = ModulePath::new(vec!["Page".to_owned()], "Home");
        assert_eq!(path.to_string(), "Page.Home");
        assert_eq!(ModulePath::new(vec![], "Main").to_string(), "Main");
    }
}
