//! `kestrel build` - one-shot whole-project rebuild.

use anyhow::Result;

use crate::build::rebuild_whole_project;
use crate::config::ProjectConfig;

pub fn run_build(config: &ProjectConfig) -> Result<()> {
    let report = rebuild_whole_project(config)?;
    if report.errors > 0 {
        anyhow::bail!("{} file(s) failed to translate", report.errors);
    }
    Ok(())
}
