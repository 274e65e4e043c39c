use crate::core::naming::resolve_entries;
use crate::core::regions::plan_regions;
use crate::core::template::{render_html_with, Footer, TemplateOptions};
use crate::domain::messages::{CoreMessage, PackageZip, SelectionState};
use crate::domain::model::{
    ArtifactGroup, ArtifactParent, ArtifactRequest, ExportedArtifact, NamedEntry, NodeId, NodeKind,
    Rect, SceneNode, SliceTag,
};
use crate::domain::ports::{ConfigProvider, SceneService, UiSink};
use crate::utils::error::{Result, SlicerError};
use std::collections::HashMap;

pub const DEFAULT_FOOTER_TEXT: &str = "View in browser";

/// Slices are rasterized at design size, one pixel per frame unit.
pub const EXPORT_SCALE: f64 = 1.0;

/// Sequences artifact creation, export and cleanup against the host scene.
pub struct SliceOrchestrator<S: SceneService, C: ConfigProvider> {
    scene: S,
    config: C,
}

impl<S: SceneService, C: ConfigProvider> SliceOrchestrator<S, C> {
    pub fn new(scene: S, config: C) -> Self {
        Self { scene, config }
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    /// The selected frame, if exactly one top-level frame is selected.
    pub async fn selected_frame(&self) -> Result<Option<SceneNode>> {
        let mut selection = self.scene.selection().await?;
        if selection.len() != 1 {
            return Ok(None);
        }
        let node = selection.remove(0);
        if node.kind == NodeKind::Frame && node.top_level {
            Ok(Some(node))
        } else {
            Ok(None)
        }
    }

    pub async fn selection_state(&self) -> Result<SelectionState> {
        Ok(match self.selected_frame().await? {
            Some(frame) => SelectionState {
                valid: true,
                frame_name: Some(frame.name.clone()),
                frame_width: Some(frame.bounds.width),
                frame_height: Some(frame.bounds.height),
                guide_count: Some(frame.horizontal_guide_offsets().len()),
            },
            None => SelectionState::invalid(),
        })
    }

    async fn find_group(&self, frame: &SceneNode) -> Result<Option<ArtifactGroup>> {
        self.scene
            .find_group(&frame.id, self.config.group_name())
            .await
    }

    /// Materializes one tagged artifact per region inside the reserved group.
    ///
    /// An existing group is replaced; artifacts whose tag index survives keep
    /// their current name. Nothing is touched when planning fails, and the
    /// old group stays in place until the new one is complete.
    pub async fn generate_slices(&self, frame: &SceneNode) -> Result<usize> {
        let regions = plan_regions(
            frame.bounds.height,
            frame.horizontal_guide_offsets(),
            self.config.max_regions(),
        )?;

        let existing = self.find_group(frame).await?;
        let mut preserved: HashMap<usize, String> = existing
            .iter()
            .flat_map(|group| group.tagged())
            .map(|(artifact, tag)| (tag.index, artifact.name.clone()))
            .collect();

        let group_id = self
            .scene
            .create_group(&frame.id, self.config.group_name())
            .await?;

        for region in &regions {
            let name = preserved
                .remove(&region.index)
                .unwrap_or_else(|| region.default_name.clone());
            let request = ArtifactRequest {
                name,
                parent: ArtifactParent::Node(group_id.clone()),
                bounds: Rect::new(
                    frame.bounds.x,
                    frame.bounds.y + region.y0 as f64,
                    frame.bounds.width,
                    region.height() as f64,
                ),
                tag: Some(SliceTag::from(region)),
            };
            if let Err(e) = self.scene.create_artifact(request).await {
                self.discard(&group_id).await;
                return Err(e);
            }
        }

        if let Some(existing) = existing {
            tracing::debug!("Replacing existing group {} with {}", existing.id, group_id);
            if let Err(e) = self.scene.remove_node(&existing.id).await {
                self.discard(&group_id).await;
                return Err(e);
            }
        }

        tracing::info!(
            "Generated {} slices for frame '{}'",
            regions.len(),
            frame.name
        );
        Ok(regions.len())
    }

    /// Best-effort removal of a half-built group.
    async fn discard(&self, group_id: &NodeId) {
        if let Err(e) = self.scene.remove_node(group_id).await {
            tracing::warn!("Could not remove incomplete slice group {}: {}", group_id, e);
        }
    }

    /// Exports every slice of `frame` and renders the email around them.
    pub async fn export<U: UiSink>(
        &self,
        frame: &SceneNode,
        add_footer: bool,
        ui: &U,
    ) -> Result<PackageZip> {
        let mut group = self.find_group(frame).await?;
        if group.is_none() {
            tracing::info!("No slices for '{}' yet, generating them first", frame.name);
            self.generate_slices(frame).await?;
            group = self.find_group(frame).await?;
        }

        let group = group
            .filter(|g| g.tagged().next().is_some())
            .ok_or(SlicerError::NoArtifacts)?;

        let regions = plan_regions(
            frame.bounds.height,
            frame.horizontal_guide_offsets(),
            self.config.max_regions(),
        )?;
        let entries = resolve_entries(
            &regions,
            Some(&group),
            self.config.image_format().extension(),
        );

        let total = entries.len();
        let mut exported = Vec::with_capacity(total);
        for (i, entry) in entries.iter().enumerate() {
            ui.post(CoreMessage::ExportProgress {
                current: i + 1,
                total,
            })
            .await?;
            exported.push(self.export_entry(frame, entry).await?);
        }

        let html = render_html_with(&exported, &self.template_options(add_footer));
        tracing::info!(
            "Exported {} slices from '{}' ({} bytes of HTML)",
            exported.len(),
            frame.name,
            html.len()
        );

        Ok(PackageZip {
            html: Some(html),
            images: exported,
            frame_name: frame.name.clone(),
            add_footer: Some(add_footer),
        })
    }

    async fn export_entry(&self, frame: &SceneNode, entry: &NamedEntry) -> Result<ExportedArtifact> {
        let bounds = Rect::new(
            frame.bounds.x,
            frame.bounds.y + entry.region.y0 as f64,
            frame.bounds.width,
            entry.region.height() as f64,
        );
        let temp = self
            .scene
            .create_artifact(ArtifactRequest {
                name: entry.file_name.clone(),
                parent: ArtifactParent::Page,
                bounds,
                tag: None,
            })
            .await?;

        let image = self
            .scene
            .export_image(&temp, self.config.image_format(), EXPORT_SCALE)
            .await;

        if let Err(e) = self.scene.remove_node(&temp).await {
            tracing::warn!("Could not remove temporary slice {}: {}", temp, e);
        }

        let image_bytes = image?;
        tracing::debug!("Exported {} ({} bytes)", entry.file_name, image_bytes.len());

        Ok(ExportedArtifact {
            file_name: entry.file_name.clone(),
            image_bytes,
            width: bounds.width.round() as u32,
            height: entry.region.height(),
            absolute_x: bounds.x,
            absolute_y: bounds.y,
            link_url: entry.link_url.clone(),
        })
    }

    fn template_options(&self, add_footer: bool) -> TemplateOptions {
        let footer = add_footer.then(|| Footer {
            text: self
                .config
                .footer_text()
                .unwrap_or(DEFAULT_FOOTER_TEXT)
                .to_string(),
            url: self.config.footer_url().map(str::to_string),
        });

        TemplateOptions {
            content_width: self.config.content_width(),
            title: self.config.email_title().to_string(),
            background: self.config.background().to_string(),
            footer,
        }
    }

    /// Returns whether a group was removed.
    pub async fn clear_slices(&self, frame: &SceneNode) -> Result<bool> {
        match self.find_group(frame).await? {
            Some(group) => {
                self.scene.remove_node(&group.id).await?;
                tracing::info!("Removed slice group from '{}'", frame.name);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drops horizontal guides, keeping vertical ones. Returns how many went.
    pub async fn clear_guides(&self, frame: &SceneNode) -> Result<usize> {
        let (horizontal, kept): (Vec<_>, Vec<_>) =
            frame.guides.iter().copied().partition(|g| g.is_horizontal());
        self.scene.set_guides(&frame.id, kept).await?;
        tracing::info!(
            "Cleared {} horizontal guides from '{}'",
            horizontal.len(),
            frame.name
        );
        Ok(horizontal.len())
    }
}
