use thiserror::Error;

#[derive(Error, Debug)]
pub enum SlicerError {
    #[error("No horizontal guides found. Add guides to the frame to mark slice boundaries.")]
    NoGuides,

    #[error("Too many slices ({count}). The maximum is {max}.")]
    TooManyRegions { count: usize, max: usize },

    #[error("No slices found to export")]
    NoArtifacts,

    #[error("Another operation is still running")]
    Busy,

    #[error("UI channel closed")]
    UiClosed,

    #[error("Scene error: {message}")]
    Scene { message: String },

    #[error("Export failed: {message}")]
    Export { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Zip operation failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl SlicerError {
    pub fn scene(message: impl Into<String>) -> Self {
        Self::Scene {
            message: message.into(),
        }
    }

    pub fn export(message: impl Into<String>) -> Self {
        Self::Export {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Flat message shown in the UI panel.
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Scene { message } => message.clone(),
            Self::Io(e) => format!("Could not read or write a file: {}", e),
            Self::Image(e) => format!("Could not render image: {}", e),
            other => other.to_string(),
        }
    }

    /// User errors leave the scene untouched; everything else may have
    /// happened mid-run.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::NoGuides
                | Self::TooManyRegions { .. }
                | Self::NoArtifacts
                | Self::Busy
        )
    }
}

pub type Result<T> = std::result::Result<T, SlicerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_message_names_limit() {
        let err = SlicerError::TooManyRegions { count: 151, max: 100 };
        assert_eq!(err.user_friendly_message(), "Too many slices (151). The maximum is 100.");
        assert!(err.is_user_error());
    }

    #[test]
    fn test_export_message_is_flat() {
        let err = SlicerError::export("node 1:4 is gone");
        assert_eq!(err.user_friendly_message(), "Export failed: node 1:4 is gone");
        assert!(!err.is_user_error());
    }
}
