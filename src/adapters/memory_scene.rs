//! In-process host scene backed by a JSON scene document.
//!
//! Frames may point at a mockup image; rasterizing a node crops the part of
//! that image under the node. Frames without an image render as their fill
//! colour.

use crate::domain::model::{
    ArtifactGroup, ArtifactInfo, ArtifactParent, ArtifactRequest, Guide, ImageFormat, NodeId,
    NodeKind, Rect, SceneNode, SliceTag,
};
use crate::domain::ports::SceneService;
use crate::utils::error::{Result, SlicerError};
use crate::utils::validation::parse_hex_color;
use async_trait::async_trait;
use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

const DEFAULT_FILL: [u8; 3] = [255, 255, 255];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    /// Names of the selected frames.
    #[serde(default)]
    pub selection: Vec<String>,
    #[serde(default)]
    pub frames: Vec<FrameDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameDocument {
    pub name: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub guides: Vec<Guide>,
    /// Mockup image, relative to the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slice_group: Option<SliceGroupDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceGroupDocument {
    pub name: String,
    #[serde(default)]
    pub slices: Vec<SliceDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceDocument {
    pub name: String,
    /// Entries of any other kind load as plain, untagged nodes.
    #[serde(default = "email_slice_kind")]
    pub kind: String,
    #[serde(flatten)]
    pub tag: SliceTag,
}

fn email_slice_kind() -> String {
    SliceTag::KIND.to_string()
}

impl SceneDocument {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    kind: NodeKind,
    parent: Option<u64>,
    bounds: Rect,
    guides: Vec<Guide>,
    tag: Option<SliceTag>,
    fill: [u8; 3],
    image_path: Option<PathBuf>,
    image: Option<Arc<DynamicImage>>,
}

impl Node {
    fn new(name: impl Into<String>, kind: NodeKind, parent: Option<u64>, bounds: Rect) -> Self {
        Self {
            name: name.into(),
            kind,
            parent,
            bounds,
            guides: Vec::new(),
            tag: None,
            fill: DEFAULT_FILL,
            image_path: None,
            image: None,
        }
    }
}

#[derive(Debug, Default)]
struct SceneState {
    nodes: BTreeMap<u64, Node>,
    next_id: u64,
    selection: Vec<u64>,
}

impl SceneState {
    fn insert(&mut self, node: Node) -> u64 {
        self.next_id += 1;
        let key = self.next_id;
        self.nodes.insert(key, node);
        key
    }

    fn get(&self, key: u64) -> Result<&Node> {
        self.nodes
            .get(&key)
            .ok_or_else(|| SlicerError::scene(format!("Node {} does not exist", node_id(key))))
    }

    fn children(&self, parent: u64) -> impl Iterator<Item = (u64, &Node)> {
        self.nodes
            .iter()
            .filter(move |(_, node)| node.parent == Some(parent))
            .map(|(key, node)| (*key, node))
    }

    fn descendants(&self, root: u64) -> Vec<u64> {
        let mut found = vec![root];
        let mut i = 0;
        while i < found.len() {
            let parent = found[i];
            found.extend(self.children(parent).map(|(key, _)| key));
            i += 1;
        }
        found
    }

    fn frame_by_name(&self, name: &str) -> Option<u64> {
        self.nodes
            .iter()
            .find(|(_, n)| n.parent.is_none() && n.kind == NodeKind::Frame && n.name == name)
            .map(|(key, _)| *key)
    }

    /// The top-level frame a node is drawn on.
    fn backdrop(&self, key: u64) -> Option<&Node> {
        let mut current = self.nodes.get(&key)?;
        while let Some(parent) = current.parent {
            current = self.nodes.get(&parent)?;
        }
        if current.kind == NodeKind::Frame {
            return Some(current);
        }

        let (x, y) = (current.bounds.x, current.bounds.y);
        self.nodes
            .values()
            .filter(|n| n.parent.is_none() && n.kind == NodeKind::Frame)
            .find(|n| n.bounds.contains_point(x, y))
    }
}

fn node_id(key: u64) -> NodeId {
    NodeId::new(format!("1:{}", key))
}

fn node_key(id: &NodeId) -> Result<u64> {
    id.as_str()
        .strip_prefix("1:")
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| SlicerError::scene(format!("Unknown node id {}", id)))
}

fn hex(fill: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", fill[0], fill[1], fill[2])
}

/// Shared, mutable scene graph. Clones see the same scene.
#[derive(Debug, Clone, Default)]
pub struct MemoryScene {
    state: Arc<Mutex<SceneState>>,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a scene from a document, loading frame images relative to
    /// `base_dir`.
    pub fn from_document(document: &SceneDocument, base_dir: &Path) -> Result<Self> {
        let mut state = SceneState::default();

        for frame in &document.frames {
            let bounds = Rect::new(frame.x, frame.y, frame.width, frame.height);
            if !(frame.width > 0.0 && frame.height > 0.0) {
                return Err(SlicerError::scene(format!(
                    "Frame '{}' must have a positive size",
                    frame.name
                )));
            }

            let mut node = Node::new(&frame.name, NodeKind::Frame, None, bounds);
            node.guides = frame.guides.clone();
            if let Some(fill) = &frame.fill {
                node.fill = parse_hex_color(&format!("frames.{}.fill", frame.name), fill)?;
            }
            if let Some(path) = &frame.image {
                let image = image::open(base_dir.join(path))?;
                tracing::debug!(
                    "Loaded {} ({}x{}) for frame '{}'",
                    path.display(),
                    image.width(),
                    image.height(),
                    frame.name
                );
                node.image_path = Some(path.clone());
                node.image = Some(Arc::new(image));
            }
            let frame_key = state.insert(node);

            if let Some(group) = &frame.slice_group {
                let group_key = state.insert(Node::new(
                    &group.name,
                    NodeKind::Group,
                    Some(frame_key),
                    bounds,
                ));
                for slice in &group.slices {
                    let mut child = Node::new(
                        &slice.name,
                        NodeKind::Slice,
                        Some(group_key),
                        Rect::new(
                            frame.x,
                            frame.y + slice.tag.y0 as f64,
                            frame.width,
                            slice.tag.y1.saturating_sub(slice.tag.y0) as f64,
                        ),
                    );
                    if slice.kind == SliceTag::KIND {
                        child.tag = Some(slice.tag);
                    } else {
                        tracing::debug!(
                            "Slice '{}' has foreign kind '{}', loading it untagged",
                            slice.name,
                            slice.kind
                        );
                    }
                    state.insert(child);
                }
            }
        }

        for name in &document.selection {
            let key = state
                .frame_by_name(name)
                .ok_or_else(|| SlicerError::scene(format!("Selected frame '{}' not found", name)))?;
            state.selection.push(key);
        }

        Ok(Self {
            state: Arc::new(Mutex::new(state)),
        })
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        let document = SceneDocument::from_json(&raw)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_document(&document, base_dir)
    }

    /// Current state as a document, dropping anything that is not a frame
    /// or a tagged slice group.
    pub async fn to_document(&self) -> SceneDocument {
        let state = self.state.lock().await;

        let frames = state
            .nodes
            .iter()
            .filter(|(_, n)| n.parent.is_none() && n.kind == NodeKind::Frame)
            .map(|(key, frame)| {
                let slice_group = state
                    .children(*key)
                    .filter(|(_, n)| n.kind == NodeKind::Group)
                    .map(|(group_key, group)| SliceGroupDocument {
                        name: group.name.clone(),
                        slices: state
                            .children(group_key)
                            .filter_map(|(_, n)| {
                                n.tag.map(|tag| SliceDocument {
                                    name: n.name.clone(),
                                    kind: email_slice_kind(),
                                    tag,
                                })
                            })
                            .collect(),
                    })
                    .find(|g| !g.slices.is_empty());

                FrameDocument {
                    name: frame.name.clone(),
                    x: frame.bounds.x,
                    y: frame.bounds.y,
                    width: frame.bounds.width,
                    height: frame.bounds.height,
                    guides: frame.guides.clone(),
                    image: frame.image_path.clone(),
                    fill: (frame.fill != DEFAULT_FILL).then(|| hex(frame.fill)),
                    slice_group,
                }
            })
            .collect();

        let selection = state
            .selection
            .iter()
            .filter_map(|key| state.nodes.get(key))
            .map(|n| n.name.clone())
            .collect();

        SceneDocument { selection, frames }
    }

    pub async fn add_frame(&self, name: &str, bounds: Rect, guides: Vec<Guide>) -> NodeId {
        let mut state = self.state.lock().await;
        let mut node = Node::new(name, NodeKind::Frame, None, bounds);
        node.guides = guides;
        node_id(state.insert(node))
    }

    /// Adds a plain top-level rectangle, which is never a valid selection.
    pub async fn add_rectangle(&self, name: &str, bounds: Rect) -> NodeId {
        let mut state = self.state.lock().await;
        node_id(state.insert(Node::new(name, NodeKind::Rectangle, None, bounds)))
    }

    pub async fn select(&self, ids: &[NodeId]) -> Result<()> {
        let mut state = self.state.lock().await;
        let mut keys = Vec::with_capacity(ids.len());
        for id in ids {
            let key = node_key(id)?;
            state.get(key)?;
            keys.push(key);
        }
        state.selection = keys;
        Ok(())
    }

    pub async fn select_frame(&self, name: &str) -> Result<NodeId> {
        let mut state = self.state.lock().await;
        let key = state
            .frame_by_name(name)
            .ok_or_else(|| SlicerError::scene(format!("Frame '{}' not found", name)))?;
        state.selection = vec![key];
        Ok(node_id(key))
    }

    pub async fn rename(&self, id: &NodeId, name: &str) -> Result<()> {
        let key = node_key(id)?;
        let mut state = self.state.lock().await;
        let node = state
            .nodes
            .get_mut(&key)
            .ok_or_else(|| SlicerError::scene(format!("Node {} does not exist", id)))?;
        node.name = name.to_string();
        Ok(())
    }

    pub async fn node_count(&self) -> usize {
        self.state.lock().await.nodes.len()
    }

    /// Ids of nodes sitting directly on the page.
    pub async fn page_children(&self) -> Vec<NodeId> {
        let state = self.state.lock().await;
        state
            .nodes
            .iter()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(key, _)| node_id(*key))
            .collect()
    }

    pub async fn guides(&self, id: &NodeId) -> Result<Vec<Guide>> {
        let key = node_key(id)?;
        let state = self.state.lock().await;
        Ok(state.get(key)?.guides.clone())
    }
}

fn rasterize(node: &Node, backdrop: Option<&Node>, scale: f64) -> Result<DynamicImage> {
    let width = (node.bounds.width * scale).round().max(1.0) as u32;
    let height = (node.bounds.height * scale).round().max(1.0) as u32;

    let Some(frame) = backdrop else {
        let [r, g, b] = DEFAULT_FILL;
        return Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([r, g, b, 255]),
        )));
    };

    let Some(source) = &frame.image else {
        let [r, g, b] = frame.fill;
        return Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([r, g, b, 255]),
        )));
    };

    // The mockup may be drawn at a different density than the frame.
    let ratio_x = source.width() as f64 / frame.bounds.width;
    let ratio_y = source.height() as f64 / frame.bounds.height;
    let crop_x = ((node.bounds.x - frame.bounds.x) * ratio_x).round().max(0.0) as u32;
    let crop_y = ((node.bounds.y - frame.bounds.y) * ratio_y).round().max(0.0) as u32;
    if crop_x >= source.width() || crop_y >= source.height() {
        return Err(SlicerError::export(format!(
            "'{}' lies outside the frame image",
            node.name
        )));
    }
    let crop_w = ((node.bounds.width * ratio_x).round() as u32)
        .clamp(1, source.width() - crop_x);
    let crop_h = ((node.bounds.height * ratio_y).round() as u32)
        .clamp(1, source.height() - crop_y);

    let cropped = source.crop_imm(crop_x, crop_y, crop_w, crop_h);
    if cropped.width() == width && cropped.height() == height {
        Ok(cropped)
    } else {
        Ok(cropped.resize_exact(width, height, FilterType::Triangle))
    }
}

fn encode(image: DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    match format {
        ImageFormat::Png => {
            image.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
        }
        ImageFormat::Jpg => {
            DynamicImage::ImageRgb8(image.to_rgb8())
                .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Jpeg)?;
        }
    }
    Ok(bytes)
}

#[async_trait]
impl SceneService for MemoryScene {
    async fn selection(&self) -> Result<Vec<SceneNode>> {
        let state = self.state.lock().await;
        Ok(state
            .selection
            .iter()
            .filter_map(|key| state.nodes.get(key).map(|node| (*key, node)))
            .map(|(key, node)| SceneNode {
                id: node_id(key),
                name: node.name.clone(),
                kind: node.kind,
                top_level: node.parent.is_none(),
                bounds: node.bounds,
                guides: node.guides.clone(),
            })
            .collect())
    }

    async fn find_group(&self, parent: &NodeId, name: &str) -> Result<Option<ArtifactGroup>> {
        let parent_key = node_key(parent)?;
        let state = self.state.lock().await;
        state.get(parent_key)?;

        let group = state
            .children(parent_key)
            .find(|(_, n)| n.kind == NodeKind::Group && n.name == name)
            .map(|(key, group)| ArtifactGroup {
                id: node_id(key),
                name: group.name.clone(),
                children: state
                    .children(key)
                    .map(|(child_key, child)| ArtifactInfo {
                        id: node_id(child_key),
                        name: child.name.clone(),
                        bounds: child.bounds,
                        tag: child.tag,
                    })
                    .collect(),
            });
        Ok(group)
    }

    async fn create_group(&self, parent: &NodeId, name: &str) -> Result<NodeId> {
        let parent_key = node_key(parent)?;
        let mut state = self.state.lock().await;
        let bounds = state.get(parent_key)?.bounds;
        let key = state.insert(Node::new(name, NodeKind::Group, Some(parent_key), bounds));
        Ok(node_id(key))
    }

    async fn create_artifact(&self, request: ArtifactRequest) -> Result<NodeId> {
        let mut state = self.state.lock().await;
        let parent = match &request.parent {
            ArtifactParent::Page => None,
            ArtifactParent::Node(id) => {
                let key = node_key(id)?;
                state.get(key)?;
                Some(key)
            }
        };

        let mut node = Node::new(request.name, NodeKind::Slice, parent, request.bounds);
        node.tag = request.tag;
        Ok(node_id(state.insert(node)))
    }

    async fn remove_node(&self, id: &NodeId) -> Result<()> {
        let key = node_key(id)?;
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        state.get(key)?;
        for doomed in state.descendants(key) {
            state.nodes.remove(&doomed);
        }
        let nodes = &state.nodes;
        state.selection.retain(|selected| nodes.contains_key(selected));
        Ok(())
    }

    async fn export_image(&self, id: &NodeId, format: ImageFormat, scale: f64) -> Result<Vec<u8>> {
        let key = node_key(id)?;
        let state = self.state.lock().await;
        let node = state.get(key)?;
        let image = rasterize(node, state.backdrop(key), scale)?;
        encode(image, format)
    }

    async fn set_guides(&self, frame: &NodeId, guides: Vec<Guide>) -> Result<()> {
        let key = node_key(frame)?;
        let mut state = self.state.lock().await;
        let node = state
            .nodes
            .get_mut(&key)
            .ok_or_else(|| SlicerError::scene(format!("Node {} does not exist", frame)))?;
        if node.kind != NodeKind::Frame {
            return Err(SlicerError::scene(format!("'{}' is not a frame", node.name)));
        }
        node.guides = guides;
        Ok(())
    }
}
