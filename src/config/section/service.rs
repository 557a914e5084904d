//! `[service]` section configuration.
//!
//! External compiler commands. Kestrel orchestrates builds but owns no
//! compiler: the incremental service, the one-shot whole-project build, and
//! the markup transpiler are all configured commands.
//!
//! # Example
//!
//! ```toml
//! [service]
//! command = ["tsc-service"]          # long-lived incremental compiler
//! build_command = ["tsc", "--build"] # one-shot whole-project build
//! transpiler = ["exmlc"]             # per-file markup -> source transpiler
//! ```
//!
//! Each command receives the project root as its final argument and runs
//! with the project root as working directory.

use serde::{Deserialize, Serialize};

/// External compiler command settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSection {
    /// Long-lived incremental compiler service command. Spawned on the first
    /// incremental build; spoken to over stdin/stdout in newline-delimited
    /// JSON.
    pub command: Vec<String>,

    /// One-shot whole-project build command, used for full rebuilds.
    pub build_command: Vec<String>,

    /// Per-file markup transpiler command. Empty disables markup
    /// transpilation (markup changes are still forwarded to the service).
    pub transpiler: Vec<String>,
}
