// Adapters layer: concrete implementations of the domain ports.

pub mod memory_scene;
pub mod storage;
pub mod ui;

pub use memory_scene::{MemoryScene, SceneDocument};
pub use storage::LocalStorage;
pub use ui::{ChannelUi, RecordingUi, ZipPackager};
