//! Configuration section definitions.

mod project;
mod service;
mod watch;

pub use project::ProjectSection;
pub use service::ServiceSection;
pub use watch::WatchSection;
