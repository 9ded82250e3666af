mod assets;
mod builder;
mod cache;
mod envelope;
mod front_matter;
mod highlight;
mod markdown;
mod page;
mod paths;
pub mod pipeline;
mod plan;
mod render;
mod transform;
mod watch;

pub use builder::{BuildResult, Builder};
pub use cache::ChangeKind;
pub use paths::base_path_from_config;
pub use watch::{FileWatcher, WatchEvent, WatchPaths};
