pub mod naming;
pub mod orchestrator;
pub mod plugin;
pub mod regions;
pub mod template;

pub use crate::domain::messages::{CoreMessage, PackageZip, SelectionState, UiCommand};
pub use crate::domain::model::{ExportedArtifact, NamedEntry, Region};
pub use crate::domain::ports::{ConfigProvider, SceneService, UiSink};
pub use crate::utils::error::Result;
