//! Build collaborators: per-file translators and the whole-project rebuild.
//!
//! The actual compilers are external; this module owns invoking them and the
//! in-process template mirroring.

pub mod full;
pub mod translate;

pub use full::{FullBuildReport, rebuild_whole_project};
pub use translate::Translators;
