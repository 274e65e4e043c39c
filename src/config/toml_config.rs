use crate::core::regions::DEFAULT_MAX_REGIONS;
use crate::core::template::DEFAULT_CONTENT_WIDTH;
use crate::core::ConfigProvider;
use crate::domain::model::ImageFormat;
use crate::utils::error::{Result, SlicerError};
use crate::utils::validation::{
    parse_hex_color, validate_non_empty_string, validate_range, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_GROUP_NAME: &str = "Email Slices";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlicerConfig {
    pub export: ExportConfig,
    pub template: TemplateConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub format: ImageFormat,
    pub max_regions: usize,
    pub group_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ImageFormat::Png,
            max_regions: DEFAULT_MAX_REGIONS,
            group_name: DEFAULT_GROUP_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    pub content_width: u32,
    pub title: String,
    pub background: String,
    pub footer_text: Option<String>,
    pub footer_url: Option<String>,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            content_width: DEFAULT_CONTENT_WIDTH,
            title: "Email".to_string(),
            background: "#ffffff".to_string(),
            footer_text: None,
            footer_url: None,
        }
    }
}

impl SlicerConfig {
    /// Loads a config from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed)?)
    }

    /// Replaces `${VAR}` with the value of environment variable `VAR`.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| SlicerError::config(format!("env pattern: {}", e)))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl Validate for SlicerConfig {
    fn validate(&self) -> Result<()> {
        validate_range(
            "export.max_regions",
            self.export.max_regions,
            1,
            DEFAULT_MAX_REGIONS,
        )?;
        validate_non_empty_string("export.group_name", &self.export.group_name)?;
        validate_range("template.content_width", self.template.content_width, 100, 2000)?;
        parse_hex_color("template.background", &self.template.background)?;

        if let Some(text) = &self.template.footer_text {
            validate_non_empty_string("template.footer_text", text)?;
        }
        if let Some(url) = &self.template.footer_url {
            validate_url("template.footer_url", url)?;
        }

        Ok(())
    }
}

impl ConfigProvider for SlicerConfig {
    fn image_format(&self) -> ImageFormat {
        self.export.format
    }

    fn max_regions(&self) -> usize {
        self.export.max_regions
    }

    fn group_name(&self) -> &str {
        &self.export.group_name
    }

    fn content_width(&self) -> u32 {
        self.template.content_width
    }

    fn email_title(&self) -> &str {
        &self.template.title
    }

    fn background(&self) -> &str {
        &self.template.background
    }

    fn footer_text(&self) -> Option<&str> {
        self.template.footer_text.as_deref()
    }

    fn footer_url(&self) -> Option<&str> {
        self.template.footer_url.as_deref()
    }
}
