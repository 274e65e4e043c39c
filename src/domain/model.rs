use serde::{Deserialize, Serialize};
use std::fmt;

/// Host-assigned node identifier (e.g. `"1:42"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Axis-aligned rectangle in page coordinates unless stated otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuideAxis {
    X,
    /// Horizontal line at a fixed vertical offset.
    Y,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Guide {
    pub axis: GuideAxis,
    pub offset: f64,
}

impl Guide {
    pub fn horizontal(offset: f64) -> Self {
        Self {
            axis: GuideAxis::Y,
            offset,
        }
    }

    pub fn vertical(offset: f64) -> Self {
        Self {
            axis: GuideAxis::X,
            offset,
        }
    }

    pub fn is_horizontal(&self) -> bool {
        self.axis == GuideAxis::Y
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Frame,
    Group,
    Rectangle,
    Slice,
    Other,
}

/// A selected node as reported by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    /// Direct child of the page.
    pub top_level: bool,
    pub bounds: Rect,
    pub guides: Vec<Guide>,
}

impl SceneNode {
    pub fn horizontal_guide_offsets(&self) -> Vec<f64> {
        self.guides
            .iter()
            .filter(|g| g.is_horizontal())
            .map(|g| g.offset)
            .collect()
    }
}

/// Plugin data stored on generated artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceTag {
    pub index: usize,
    pub y0: u32,
    pub y1: u32,
}

impl SliceTag {
    pub const KIND: &'static str = "email-slice";
}

impl From<&Region> for SliceTag {
    fn from(region: &Region) -> Self {
        Self {
            index: region.index,
            y0: region.y0,
            y1: region.y1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactInfo {
    pub id: NodeId,
    pub name: String,
    pub bounds: Rect,
    pub tag: Option<SliceTag>,
}

/// The reserved container holding one batch of slice artifacts.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactGroup {
    pub id: NodeId,
    pub name: String,
    pub children: Vec<ArtifactInfo>,
}

impl ArtifactGroup {
    pub fn tagged(&self) -> impl Iterator<Item = (&ArtifactInfo, SliceTag)> {
        self.children
            .iter()
            .filter_map(|child| child.tag.map(|tag| (child, tag)))
    }

    pub fn name_for_index(&self, index: usize) -> Option<&str> {
        self.tagged()
            .find(|(_, tag)| tag.index == index)
            .map(|(child, _)| child.name.as_str())
    }
}

/// Where a newly created artifact goes.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactParent {
    /// Ungrouped, directly on the page.
    Page,
    Node(NodeId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactRequest {
    pub name: String,
    pub parent: ArtifactParent,
    /// Page-absolute.
    pub bounds: Rect,
    pub tag: Option<SliceTag>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    #[serde(alias = "jpeg")]
    Jpg,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
        }
    }
}

impl std::str::FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpg),
            other => Err(format!("unsupported image format: {}", other)),
        }
    }
}

/// A computed row interval within the frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub index: usize,
    pub y0: u32,
    pub y1: u32,
    pub default_name: String,
}

impl Region {
    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedEntry {
    pub region: Region,
    pub display_name: String,
    pub file_name: String,
    pub link_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedArtifact {
    pub file_name: String,
    pub image_bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub absolute_x: f64,
    pub absolute_y: f64,
    pub link_url: Option<String>,
}
