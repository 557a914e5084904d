//! Path classification.
//!
//! Pure functions mapping a filesystem path to a source kind. No side
//! effects, no filesystem access.

use std::path::Path;

use crate::config::ProjectConfig;

/// What a path means to the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Typed-language source (`.ts`-like). Content edits recompile
    /// incrementally; additions/removals force a full rebuild.
    TypedSource,
    /// Markup/UI-description source (`.exml`-like), transpiled per file.
    MarkupSource,
    /// Plain template asset, copied verbatim into the output tree.
    TemplateAsset,
    /// Everything else; never enters a change set.
    Irrelevant,
}

/// Classify a path by directory membership and suffix.
///
/// Template-root membership wins over suffix: everything under the template
/// tree is a copied asset regardless of extension. Directories are
/// ignore-but-traverse: the recursive watcher descends into them on its own,
/// and the watcher bridge drops their events before they reach a change set.
pub fn classify(path: &Path, config: &ProjectConfig) -> FileKind {
    if path.starts_with(config.template_dir()) {
        return FileKind::TemplateAsset;
    }
    if !path.starts_with(config.src_dir()) {
        return FileKind::Irrelevant;
    }
    if has_suffix(path, &config.project.typed_suffixes) {
        FileKind::TypedSource
    } else if has_suffix(path, &config.project.markup_suffixes) {
        FileKind::MarkupSource
    } else {
        FileKind::Irrelevant
    }
}

fn has_suffix(path: &Path, suffixes: &[String]) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    suffixes.iter().any(|s| name.ends_with(s.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use tempfile::TempDir;

    fn make_config() -> (TempDir, crate::config::ProjectConfig) {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        (temp, config)
    }

    #[test]
    fn test_typed_source_by_suffix() {
        let (_tmp, config) = make_config();
        let path = config.src_dir().join("game/Main.ts");
        assert_eq!(classify(&path, &config), FileKind::TypedSource);
    }

    #[test]
    fn test_markup_source_by_suffix() {
        let (_tmp, config) = make_config();
        let path = config.src_dir().join("ui/Panel.exml");
        assert_eq!(classify(&path, &config), FileKind::MarkupSource);
    }

    #[test]
    fn test_template_membership_wins_over_suffix() {
        let (_tmp, config) = make_config();
        let path = config.template_dir().join("loader.ts");
        assert_eq!(classify(&path, &config), FileKind::TemplateAsset);

        let path = config.template_dir().join("index.html");
        assert_eq!(classify(&path, &config), FileKind::TemplateAsset);
    }

    #[test]
    fn test_other_suffix_is_irrelevant() {
        let (_tmp, config) = make_config();
        let path = config.src_dir().join("notes.md");
        assert_eq!(classify(&path, &config), FileKind::Irrelevant);
    }

    #[test]
    fn test_outside_roots_is_irrelevant() {
        let (_tmp, config) = make_config();
        let path = config.root.join("elsewhere/Main.ts");
        assert_eq!(classify(&path, &config), FileKind::Irrelevant);
    }

    #[test]
    fn test_directory_paths_never_classify_as_sources() {
        let (_tmp, config) = make_config();
        let dir = config.src_dir().join("nested");
        std::fs::create_dir_all(&dir).unwrap();
        assert_eq!(classify(&dir, &config), FileKind::Irrelevant);
    }

    #[test]
    fn test_custom_suffixes() {
        let (_tmp, mut config) = make_config();
        config.project.typed_suffixes = vec![".ts".into(), ".tsx".into()];
        let path = config.src_dir().join("App.tsx");
        assert_eq!(classify(&path, &config), FileKind::TypedSource);
    }
}
