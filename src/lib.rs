pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::SlicerConfig;

pub use adapters::{ChannelUi, LocalStorage, MemoryScene, RecordingUi, SceneDocument, ZipPackager};
pub use core::{orchestrator::SliceOrchestrator, plugin::SlicerPlugin};
pub use utils::error::{Result, SlicerError};
