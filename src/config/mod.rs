pub mod toml_config;

pub use toml_config::SlicerConfig;

#[cfg(feature = "cli")]
use crate::domain::model::ImageFormat;
#[cfg(feature = "cli")]
use clap::{Parser, Subcommand, ValueEnum};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "email-slicer")]
#[command(about = "Slice a design frame along its guides into an HTML email")]
pub struct CliConfig {
    /// Scene document (JSON) describing the page
    #[arg(long, default_value = "scene.json")]
    pub scene: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory the ZIP package is written to
    #[arg(short, long, default_value = "./output")]
    pub output: PathBuf,

    /// Select this frame instead of the document's saved selection
    #[arg(long)]
    pub frame: Option<String>,

    /// Override the image format from the config file
    #[arg(long)]
    pub format: Option<ImageFormat>,

    /// Write guide and slice changes back to the scene document
    #[arg(long)]
    pub save_scene: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum CliCommand {
    /// Show the selected frame and its guides
    Inspect,
    /// Create one slice per guide interval
    Generate,
    /// Export slices and package them with the HTML email
    Export {
        /// Append a footer row to the email
        #[arg(long)]
        footer: bool,
    },
    /// Remove generated slices
    ClearSlices,
    /// Remove horizontal guides
    ClearGuides,
}

#[cfg(feature = "cli")]
impl CliCommand {
    /// The UI message this subcommand stands in for.
    pub fn to_ui_command(&self) -> Option<crate::domain::messages::UiCommand> {
        use crate::domain::messages::UiCommand;
        match self {
            Self::Inspect => None,
            Self::Generate => Some(UiCommand::GenerateSlices),
            Self::Export { footer } => Some(UiCommand::ExportHtml {
                add_footer: Some(*footer),
            }),
            Self::ClearSlices => Some(UiCommand::ClearSlices),
            Self::ClearGuides => Some(UiCommand::ClearGuides),
        }
    }
}
