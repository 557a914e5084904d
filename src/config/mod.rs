//! Project configuration management for `kestrel.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── project    # [project] directories and suffixes
//! │   ├── watch      # [watch] debounce, timeout, HTTP address
//! │   └── service    # [service] external compiler commands
//! ├── error          # ConfigError
//! └── mod.rs         # ProjectConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section     | Purpose                                            |
//! |-------------|----------------------------------------------------|
//! | `[project]` | Directory layout and source suffixes               |
//! | `[watch]`   | Debounce window, reply timeout, HTTP front-end     |
//! | `[service]` | Incremental / one-shot compiler commands           |

mod error;
pub mod section;

pub use error::ConfigError;
pub use section::{ProjectSection, ServiceSection, WatchSection};

use crate::{
    cli::{Cli, Commands},
    log,
    utils::path::{normalize_path, resolve_config_path},
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing kestrel.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Verbose logging requested on the CLI (internal use only)
    #[serde(skip)]
    pub verbose: bool,

    /// Directory layout and source suffixes
    pub project: ProjectSection,

    /// Watch daemon settings
    pub watch: WatchSection,

    /// External compiler commands
    pub service: ServiceSection,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            root: PathBuf::new(),
            verbose: false,
            project: ProjectSection::default(),
            watch: WatchSection::default(),
            service: ServiceSection::default(),
        }
    }
}

impl ProjectConfig {
    /// Load configuration from CLI arguments.
    ///
    /// Searches upward from cwd to find the config file; the project root is
    /// the config file's parent directory.
    pub fn load(cli: &Cli) -> Result<Self> {
        let Some(config_path) = find_config_file(&cli.config) else {
            log!(
                "error";
                "config file '{}' not found in this directory or any parent",
                cli.config.display()
            );
            std::process::exit(1);
        };

        let mut config = Self::from_path(&config_path)?;

        config.config_path = config_path.clone();
        config.root = config_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_default();

        config.apply_cli(cli);
        config.normalize();
        config.validate()?;

        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;

        if !ignored.is_empty() {
            let display_path = path
                .file_name()
                .map(|n| n.to_string_lossy())
                .unwrap_or_else(|| path.to_string_lossy());
            log!("warning"; "unknown fields in {}, ignoring:", display_path);
            for field in &ignored {
                eprintln!("- {}", field);
            }
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Apply CLI overrides on top of the file values.
    fn apply_cli(&mut self, cli: &Cli) {
        match &cli.command {
            Commands::Watch {
                interface,
                port,
                verbose,
            } => {
                if let Some(interface) = interface {
                    self.watch.interface = *interface;
                }
                if let Some(port) = port {
                    self.watch.port = *port;
                }
                self.verbose = *verbose;
            }
            Commands::Build { verbose } => {
                self.verbose = *verbose;
            }
        }
    }

    /// Resolve configured directories to absolute paths under the root.
    fn normalize(&mut self) {
        self.root = normalize_path(&self.root);
        self.project.src = resolve_config_path(&self.project.src, &self.root);
        self.project.template = resolve_config_path(&self.project.template, &self.root);
        self.project.output = resolve_config_path(&self.project.output, &self.root);
    }

    /// Validate settings shared by every command.
    ///
    /// Configuration errors are fatal at startup: no partial state is kept.
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.project.src.is_dir() {
            return Err(ConfigError::Validation(format!(
                "source directory `{}` does not exist",
                self.project.src.display()
            )));
        }
        fs::read_dir(&self.project.src)
            .map_err(|e| ConfigError::Io(self.project.src.clone(), e))?;

        if self.project.typed_suffixes.is_empty() {
            return Err(ConfigError::Validation(
                "project.typed_suffixes must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Validate settings required by the watch daemon.
    pub fn validate_for_watch(&self) -> Result<(), ConfigError> {
        if self.service.command.is_empty() {
            return Err(ConfigError::Validation(
                "service.command must be set to run the watch daemon".into(),
            ));
        }
        self.validate_for_build()?;

        // Missing executables are only a warning here: the command may be
        // provided by a project-local toolchain not yet on PATH.
        for cmd in [&self.service.command, &self.service.build_command] {
            if let Some(program) = cmd.first()
                && which::which(program).is_err()
            {
                log!("warning"; "`{}` not found on PATH", program);
            }
        }
        Ok(())
    }

    /// Validate settings required by a full rebuild.
    pub fn validate_for_build(&self) -> Result<(), ConfigError> {
        if self.service.build_command.is_empty() {
            return Err(ConfigError::Validation(
                "service.build_command must be set to build the project".into(),
            ));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors (absolute after load)
    // ------------------------------------------------------------------

    pub fn src_dir(&self) -> &Path {
        &self.project.src
    }

    pub fn template_dir(&self) -> &Path {
        &self.project.template
    }

    pub fn output_dir(&self) -> &Path {
        &self.project.output
    }
}

/// Search upward from cwd for the config file.
///
/// A path with directory components (or an absolute path) is used as-is.
fn find_config_file(name: &Path) -> Option<PathBuf> {
    if name.is_absolute() || name.components().count() > 1 {
        return name.is_file().then(|| normalize_path(name));
    }

    let mut dir = std::env::current_dir().ok()?;
    loop {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(normalize_path(&candidate));
        }
        if !dir.pop() {
            return None;
        }
    }
}

// ============================================================================
// Test helpers
// ============================================================================

/// Parse a TOML snippet into a ProjectConfig (no normalization).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> ProjectConfig {
    ProjectConfig::from_str(content).expect("test config must parse")
}

/// Build a config rooted at `root` with default sections, normalized.
#[cfg(test)]
pub fn test_config(root: &Path) -> ProjectConfig {
    let mut config = ProjectConfig {
        config_path: root.join("kestrel.toml"),
        root: root.to_path_buf(),
        ..Default::default()
    };
    config.normalize();
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_is_default() {
        let config = test_parse_config("");
        assert_eq!(config.project.src, PathBuf::from("src"));
        assert_eq!(config.watch.port, 3721);
        assert!(config.service.command.is_empty());
    }

    #[test]
    fn test_parse_invalid_toml_fails() {
        let result: Result<ProjectConfig, _> = toml::from_str("[project\nsrc = \"src\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_with_ignored_collects_unknown_fields() {
        let (config, ignored) =
            ProjectConfig::parse_with_ignored("[project]\nsrc = \"src\"\nbogus = 1").unwrap();
        assert_eq!(config.project.src, PathBuf::from("src"));
        assert_eq!(ignored, vec!["project.bogus"]);
    }

    #[test]
    fn test_validate_missing_src_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = test_config(temp.path());
        // no src/ created yet
        assert!(config.validate().is_err());

        std::fs::create_dir_all(config.src_dir()).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_for_watch_requires_commands() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut config = test_config(temp.path());
        std::fs::create_dir_all(config.src_dir()).unwrap();

        assert!(config.validate_for_watch().is_err());

        config.service.command = vec!["cat".into()];
        assert!(config.validate_for_watch().is_err());

        config.service.build_command = vec!["true".into()];
        assert!(config.validate_for_watch().is_ok());
    }

    #[test]
    fn test_normalize_makes_dirs_absolute() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = test_config(temp.path());
        assert!(config.src_dir().is_absolute());
        assert!(config.src_dir().starts_with(normalize_path(temp.path())));
        assert!(config.output_dir().ends_with("bin-debug"));
    }
}
