//! `[project]` section configuration.
//!
//! Directory layout and source classification settings.
//!
//! # Example
//!
//! ```toml
//! [project]
//! src = "src"                  # Typed-source and markup tree
//! template = "template"        # Plain template assets, copied verbatim
//! output = "bin-debug"         # Compiler/copier output tree
//! typed_suffixes = [".ts"]
//! markup_suffixes = [".exml"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Project directory layout and source suffix settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSection {
    /// Source tree containing typed-language and markup sources.
    pub src: PathBuf,

    /// Template asset tree, mirrored into the output directory.
    pub template: PathBuf,

    /// Output directory for compiled/copied files.
    pub output: PathBuf,

    /// Suffixes classified as typed-language sources.
    pub typed_suffixes: Vec<String>,

    /// Suffixes classified as markup/UI-description sources.
    pub markup_suffixes: Vec<String>,
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            src: PathBuf::from("src"),
            template: PathBuf::from("template"),
            output: PathBuf::from("bin-debug"),
            typed_suffixes: vec![".ts".into()],
            markup_suffixes: vec![".exml".into()],
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;
    use std::path::PathBuf;

    #[test]
    fn test_project_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.project.src, PathBuf::from("src"));
        assert_eq!(config.project.template, PathBuf::from("template"));
        assert_eq!(config.project.output, PathBuf::from("bin-debug"));
        assert_eq!(config.project.typed_suffixes, vec![".ts"]);
        assert_eq!(config.project.markup_suffixes, vec![".exml"]);
    }

    #[test]
    fn test_project_override() {
        let config = test_parse_config(
            "[project]\nsrc = \"source\"\ntyped_suffixes = [\".ts\", \".tsx\"]",
        );
        assert_eq!(config.project.src, PathBuf::from("source"));
        assert_eq!(config.project.typed_suffixes, vec![".ts", ".tsx"]);
        // untouched fields keep defaults
        assert_eq!(config.project.output, PathBuf::from("bin-debug"));
    }
}
