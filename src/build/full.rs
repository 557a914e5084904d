//! Whole-project rebuild.
//!
//! Runs the configured one-shot compiler to completion, then sweeps the
//! markup and template trees through the per-file translators. Used when a
//! structural typed-source change invalidates incremental compilation, and
//! by the `build` subcommand.

use anyhow::{Context, Result};

use crate::config::ProjectConfig;
use crate::log;
use crate::project::{FileKind, classify};
use crate::utils::exec::Cmd;
use crate::utils::path::normalize_path;

use super::translate::{MarkupTranspiler, TemplateCopier};

/// Summary of one whole-project rebuild.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullBuildReport {
    /// Markup files transpiled.
    pub transpiled: usize,
    /// Template assets copied.
    pub copied: usize,
    /// Per-file translator failures (logged, not fatal).
    pub errors: usize,
}

/// Rebuild the entire project from scratch.
///
/// The compiler command failing is an error; individual translator failures
/// are logged and counted but do not abort the rebuild.
pub fn rebuild_whole_project(config: &ProjectConfig) -> Result<FullBuildReport> {
    config.validate_for_build()?;

    log!("build"; "rebuilding whole project");
    Cmd::from_slice(&config.service.build_command)
        .arg(&config.root)
        .cwd(&config.root)
        .run()
        .context("whole-project compile failed")?;

    let mut report = FullBuildReport::default();
    sweep_markup(config, &mut report);
    sweep_templates(config, &mut report);

    log!(
        "build";
        "done: {} markup transpiled, {} templates copied, {} errors",
        report.transpiled, report.copied, report.errors
    );
    Ok(report)
}

/// Transpile every markup source under the source tree.
fn sweep_markup(config: &ProjectConfig, report: &mut FullBuildReport) {
    let Some(markup) = MarkupTranspiler::from_config(config) else {
        return;
    };
    for path in walk_files(config.src_dir()) {
        if classify(&path, config) != FileKind::MarkupSource {
            continue;
        }
        match markup.translate(&path) {
            Ok(_) => report.transpiled += 1,
            Err(e) => {
                log!("error"; "{:#}", e);
                report.errors += 1;
            }
        }
    }
}

/// Mirror every template asset into the output tree.
fn sweep_templates(config: &ProjectConfig, report: &mut FullBuildReport) {
    if !config.template_dir().is_dir() {
        return;
    }
    let copier = TemplateCopier::new(config);
    for path in walk_files(config.template_dir()) {
        match copier.translate(&path) {
            Ok(_) => report.copied += 1,
            Err(e) => {
                log!("error"; "{:#}", e);
                report.errors += 1;
            }
        }
    }
}

fn walk_files(root: &std::path::Path) -> impl Iterator<Item = std::path::PathBuf> {
    jwalk::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| normalize_path(&e.path()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use tempfile::TempDir;

    fn make_project() -> (TempDir, crate::config::ProjectConfig) {
        let temp = TempDir::new().unwrap();
        let mut config = test_config(temp.path());
        config.service.build_command = vec!["true".into()];
        std::fs::create_dir_all(config.src_dir()).unwrap();
        std::fs::create_dir_all(config.template_dir()).unwrap();
        (temp, config)
    }

    #[test]
    fn test_rebuild_requires_build_command() {
        let (_tmp, mut config) = make_project();
        config.service.build_command.clear();
        assert!(rebuild_whole_project(&config).is_err());
    }

    #[test]
    fn test_rebuild_fails_when_compiler_fails() {
        let (_tmp, mut config) = make_project();
        config.service.build_command = vec!["false".into()];
        assert!(rebuild_whole_project(&config).is_err());
    }

    #[test]
    fn test_rebuild_sweeps_templates() {
        let (_tmp, config) = make_project();
        std::fs::write(config.src_dir().join("a.ts"), "class A {}").unwrap();
        std::fs::create_dir_all(config.template_dir().join("assets")).unwrap();
        std::fs::write(config.template_dir().join("index.html"), "<html/>").unwrap();
        std::fs::write(config.template_dir().join("assets/app.js"), "boot()").unwrap();

        let report = rebuild_whole_project(&config).unwrap();
        assert_eq!(report.copied, 2);
        assert_eq!(report.errors, 0);
        assert!(config.output_dir().join("index.html").is_file());
        assert!(config.output_dir().join("assets/app.js").is_file());
    }

    #[test]
    fn test_rebuild_counts_transpiler_failures() {
        let (_tmp, mut config) = make_project();
        config.service.transpiler = vec!["false".into()];
        std::fs::write(config.src_dir().join("Panel.exml"), "<e:Skin/>").unwrap();

        let report = rebuild_whole_project(&config).unwrap();
        assert_eq!(report.transpiled, 0);
        assert_eq!(report.errors, 1);
    }
}
