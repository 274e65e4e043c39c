use crate::domain::model::ExportedArtifact;
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};

/// Commands posted by the UI panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiCommand {
    GenerateSlices,
    ExportHtml {
        #[serde(default, rename = "addFooter", skip_serializing_if = "Option::is_none")]
        add_footer: Option<bool>,
    },
    ClearSlices,
    ClearGuides,
}

impl UiCommand {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::GenerateSlices => "generate-slices",
            Self::ExportHtml { .. } => "export-html",
            Self::ClearSlices => "clear-slices",
            Self::ClearGuides => "clear-guides",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionState {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guide_count: Option<usize>,
}

impl SelectionState {
    pub fn invalid() -> Self {
        Self::default()
    }
}

/// Final handoff to the packaging side of the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageZip {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(alias = "slices")]
    pub images: Vec<ExportedArtifact>,
    pub frame_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_footer: Option<bool>,
}

/// Messages posted from the core to the UI panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CoreMessage {
    SelectionChanged(SelectionState),
    SlicesGenerated { count: usize },
    SlicesCleared {},
    GuidesCleared {},
    ExportProgress { current: usize, total: usize },
    Error { message: String },
    PackageZip(PackageZip),
}

impl CoreMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
