use crate::domain::messages::CoreMessage;
use crate::domain::model::{
    ArtifactGroup, ArtifactRequest, Guide, ImageFormat, NodeId, SceneNode,
};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Capabilities of the host design tool. Every call may suspend.
#[async_trait]
pub trait SceneService: Send + Sync {
    /// Nodes currently selected by the user.
    async fn selection(&self) -> Result<Vec<SceneNode>>;

    /// Looks up a direct child group of `parent` by exact name.
    async fn find_group(&self, parent: &NodeId, name: &str) -> Result<Option<ArtifactGroup>>;

    /// Creates an empty group as the last child of `parent`.
    async fn create_group(&self, parent: &NodeId, name: &str) -> Result<NodeId>;

    async fn create_artifact(&self, request: ArtifactRequest) -> Result<NodeId>;

    /// Removes a node and all of its descendants.
    async fn remove_node(&self, id: &NodeId) -> Result<()>;

    /// Rasterizes a node's bounds.
    async fn export_image(&self, id: &NodeId, format: ImageFormat, scale: f64) -> Result<Vec<u8>>;

    /// Replaces the guides of a frame.
    async fn set_guides(&self, frame: &NodeId, guides: Vec<Guide>) -> Result<()>;
}

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// One-directional, ordered channel to the UI panel.
pub trait UiSink: Send + Sync {
    fn post(&self, message: CoreMessage) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn image_format(&self) -> ImageFormat;
    fn max_regions(&self) -> usize;
    fn group_name(&self) -> &str;
    fn content_width(&self) -> u32;
    fn email_title(&self) -> &str;
    fn background(&self) -> &str;
    fn footer_text(&self) -> Option<&str>;
    fn footer_url(&self) -> Option<&str>;
}
