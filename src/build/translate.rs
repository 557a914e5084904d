//! Per-file translators.
//!
//! Markup sources are transpiled by an external command into a sibling typed
//! source; template assets are mirrored into the output tree by plain file
//! copy. A failure on one file is logged and never aborts the batch or fails
//! unrelated files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use crate::config::ProjectConfig;
use crate::log;
use crate::project::{ChangeKind, ChangeSet, FileKind, classify};
use crate::utils::exec::Cmd;

// ============================================================================
// Template assets
// ============================================================================

/// Mirrors the template tree into the output directory.
pub struct TemplateCopier {
    template_dir: PathBuf,
    output_dir: PathBuf,
}

impl TemplateCopier {
    pub fn new(config: &ProjectConfig) -> Self {
        Self {
            template_dir: config.template_dir().to_path_buf(),
            output_dir: config.output_dir().to_path_buf(),
        }
    }

    /// Output path mirroring the source's position in the template tree.
    pub fn output_path(&self, source: &Path) -> Option<PathBuf> {
        source
            .strip_prefix(&self.template_dir)
            .ok()
            .map(|rel| self.output_dir.join(rel))
    }

    /// Copy one template asset into the output tree.
    pub fn translate(&self, source: &Path) -> Result<PathBuf> {
        let output = self
            .output_path(source)
            .ok_or_else(|| anyhow!("`{}` is outside the template tree", source.display()))?;
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create `{}`", parent.display()))?;
        }
        std::fs::copy(source, &output)
            .with_context(|| format!("failed to copy `{}`", source.display()))?;
        Ok(output)
    }

    /// Remove the mirrored output of a deleted template asset.
    pub fn remove_output(&self, source: &Path) -> Result<()> {
        let Some(output) = self.output_path(source) else {
            return Ok(());
        };
        if output.is_file() {
            std::fs::remove_file(&output)
                .with_context(|| format!("failed to remove `{}`", output.display()))?;
        }
        Ok(())
    }
}

// ============================================================================
// Markup sources
// ============================================================================

/// Transpiles markup sources via the configured external command.
///
/// The generated typed source sits next to the markup file with the first
/// configured typed suffix, so removal of the markup removes the sibling.
pub struct MarkupTranspiler {
    command: Vec<String>,
    root: PathBuf,
    markup_suffixes: Vec<String>,
    typed_suffix: String,
}

impl MarkupTranspiler {
    /// `None` when no transpiler is configured.
    pub fn from_config(config: &ProjectConfig) -> Option<Self> {
        if config.service.transpiler.is_empty() {
            return None;
        }
        Some(Self {
            command: config.service.transpiler.clone(),
            root: config.root.clone(),
            markup_suffixes: config.project.markup_suffixes.clone(),
            typed_suffix: config
                .project
                .typed_suffixes
                .first()
                .cloned()
                .unwrap_or_else(|| ".ts".into()),
        })
    }

    /// The sibling generated source for a markup file.
    pub fn output_path(&self, source: &Path) -> PathBuf {
        let name = source.file_name().and_then(|n| n.to_str()).unwrap_or("");
        for suffix in &self.markup_suffixes {
            if let Some(stem) = name.strip_suffix(suffix.as_str()) {
                return source.with_file_name(format!("{stem}{}", self.typed_suffix));
            }
        }
        source.to_path_buf()
    }

    /// Transpile one markup file.
    pub fn translate(&self, source: &Path) -> Result<PathBuf> {
        Cmd::from_slice(&self.command)
            .arg(source)
            .cwd(&self.root)
            .run()
            .with_context(|| format!("transpile failed for `{}`", source.display()))?;
        Ok(self.output_path(source))
    }

    /// Remove the generated sibling of a deleted markup file.
    pub fn remove_output(&self, source: &Path) -> Result<()> {
        let output = self.output_path(source);
        if output != source && output.is_file() {
            std::fs::remove_file(&output)
                .with_context(|| format!("failed to remove `{}`", output.display()))?;
        }
        Ok(())
    }
}

// ============================================================================
// Batch application
// ============================================================================

/// Both translators, applied to the markup/template slice of a change set.
pub struct Translators {
    pub markup: Option<MarkupTranspiler>,
    pub template: TemplateCopier,
}

impl Translators {
    pub fn from_config(config: &ProjectConfig) -> Self {
        if config.service.transpiler.is_empty() {
            crate::debug!("markup"; "no transpiler configured, markup left to the service");
        }
        Self {
            markup: MarkupTranspiler::from_config(config),
            template: TemplateCopier::new(config),
        }
    }

    /// Translate/copy/remove every markup and template change.
    ///
    /// Returns the number of per-file failures (already logged).
    pub fn apply(&self, changes: &ChangeSet, config: &ProjectConfig) -> usize {
        let mut errors = 0;
        for (path, kind) in changes.iter_with_kind() {
            let result = match classify(path, config) {
                FileKind::MarkupSource => self.apply_markup(path, kind),
                FileKind::TemplateAsset => self.apply_template(path, kind),
                FileKind::TypedSource | FileKind::Irrelevant => continue,
            };
            if let Err(e) = result {
                log!("error"; "{:#}", e);
                errors += 1;
            }
        }
        errors
    }

    fn apply_markup(&self, path: &Path, kind: ChangeKind) -> Result<()> {
        let Some(markup) = &self.markup else {
            return Ok(());
        };
        match kind {
            ChangeKind::Added | ChangeKind::Modified => {
                crate::debug!("markup"; "transpile: {}", path.display());
                markup.translate(path).map(|_| ())
            }
            ChangeKind::Removed => markup.remove_output(path),
        }
    }

    fn apply_template(&self, path: &Path, kind: ChangeKind) -> Result<()> {
        match kind {
            ChangeKind::Added | ChangeKind::Modified => {
                let output = self.template.translate(path)?;
                crate::debug!("template"; "copy: {} -> {}", path.display(), output.display());
                Ok(())
            }
            ChangeKind::Removed => self.template.remove_output(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use tempfile::TempDir;

    fn make_project() -> (TempDir, crate::config::ProjectConfig) {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        std::fs::create_dir_all(config.src_dir()).unwrap();
        std::fs::create_dir_all(config.template_dir()).unwrap();
        (temp, config)
    }

    #[test]
    fn test_template_output_mirrors_tree() {
        let (_tmp, config) = make_project();
        let copier = TemplateCopier::new(&config);
        let source = config.template_dir().join("assets/logo.png");
        assert_eq!(
            copier.output_path(&source),
            Some(config.output_dir().join("assets/logo.png"))
        );
        assert_eq!(copier.output_path(&config.src_dir().join("a.ts")), None);
    }

    #[test]
    fn test_template_copy_and_remove() {
        let (_tmp, config) = make_project();
        let copier = TemplateCopier::new(&config);
        let source = config.template_dir().join("index.html");
        std::fs::write(&source, "<html/>").unwrap();

        let output = copier.translate(&source).unwrap();
        assert!(output.is_file());
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "<html/>");

        copier.remove_output(&source).unwrap();
        assert!(!output.exists());
        // removing an already-removed output is fine
        copier.remove_output(&source).unwrap();
    }

    #[test]
    fn test_markup_output_is_sibling_typed_source() {
        let (_tmp, mut config) = make_project();
        config.service.transpiler = vec!["true".into()];
        let markup = MarkupTranspiler::from_config(&config).unwrap();
        let source = config.src_dir().join("ui/Panel.exml");
        assert_eq!(
            markup.output_path(&source),
            config.src_dir().join("ui/Panel.ts")
        );
    }

    #[test]
    fn test_markup_remove_output_deletes_sibling() {
        let (_tmp, mut config) = make_project();
        config.service.transpiler = vec!["true".into()];
        let markup = MarkupTranspiler::from_config(&config).unwrap();

        let source = config.src_dir().join("Panel.exml");
        let generated = config.src_dir().join("Panel.ts");
        std::fs::write(&generated, "// generated").unwrap();

        markup.remove_output(&source).unwrap();
        assert!(!generated.exists());
    }

    #[test]
    fn test_no_transpiler_configured() {
        let (_tmp, config) = make_project();
        assert!(MarkupTranspiler::from_config(&config).is_none());
    }

    #[test]
    fn test_apply_continues_past_failures() {
        let (_tmp, mut config) = make_project();
        // a transpiler that always fails
        config.service.transpiler = vec!["false".into()];
        let translators = Translators::from_config(&config);

        let good = config.template_dir().join("ok.html");
        std::fs::write(&good, "<html/>").unwrap();
        let bad = config.src_dir().join("broken.exml");
        std::fs::write(&bad, "<e:Skin/>").unwrap();

        let changes = ChangeSet {
            modified: vec![bad, good.clone()],
            ..Default::default()
        };
        let errors = translators.apply(&changes, &config);
        assert_eq!(errors, 1);
        // the template copy still happened
        assert!(config.output_dir().join("ok.html").is_file());
    }
}
