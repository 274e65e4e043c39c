use async_trait::async_trait;
use email_slicer::core::{CoreMessage, SceneService, SelectionState, UiCommand};
use email_slicer::domain::model::{
    ArtifactGroup, ArtifactParent, ArtifactRequest, Guide, ImageFormat, NodeId, Rect, SceneNode,
};
use email_slicer::{
    LocalStorage, MemoryScene, RecordingUi, Result, SlicerConfig, SlicerPlugin, ZipPackager,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

async fn frame_scene(height: f64, guides: &[f64]) -> (MemoryScene, NodeId) {
    let scene = MemoryScene::new();
    let frame = scene
        .add_frame(
            "Newsletter",
            Rect::new(0.0, 0.0, 600.0, height),
            guides.iter().copied().map(Guide::horizontal).collect(),
        )
        .await;
    scene.select(&[frame.clone()]).await.unwrap();
    (scene, frame)
}

fn plugin(scene: &MemoryScene) -> SlicerPlugin<MemoryScene, SlicerConfig, RecordingUi> {
    SlicerPlugin::new(scene.clone(), SlicerConfig::default(), RecordingUi::new())
}

#[tokio::test]
async fn test_generate_slices_from_duplicate_guides() {
    let (scene, frame) = frame_scene(900.0, &[300.0, 300.0, 600.0]).await;
    let plugin = plugin(&scene);

    plugin.dispatch(UiCommand::GenerateSlices).await.unwrap();

    assert_eq!(
        plugin.ui().messages().await,
        vec![CoreMessage::SlicesGenerated { count: 3 }]
    );
    let group = scene
        .find_group(&frame, "Email Slices")
        .await
        .unwrap()
        .unwrap();
    let spans: Vec<(u32, u32)> = group.tagged().map(|(_, t)| (t.y0, t.y1)).collect();
    assert_eq!(spans, vec![(0, 300), (300, 600), (600, 900)]);
}

#[tokio::test]
async fn test_no_guides_reports_error_without_mutation() {
    let (scene, _) = frame_scene(900.0, &[]).await;
    let plugin = plugin(&scene);

    plugin.dispatch(UiCommand::GenerateSlices).await.unwrap();
    plugin
        .dispatch(UiCommand::ExportHtml { add_footer: None })
        .await
        .unwrap();

    let errors = plugin.ui().errors().await;
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| e.contains("No horizontal guides")));
    assert_eq!(scene.node_count().await, 1);
}

#[tokio::test]
async fn test_capacity_error_before_any_artifact() {
    let guides: Vec<f64> = (1..=150).map(|i| i as f64 * 10.0).collect();
    let (scene, _) = frame_scene(2000.0, &guides).await;
    let plugin = plugin(&scene);

    plugin.dispatch(UiCommand::GenerateSlices).await.unwrap();

    assert_eq!(
        plugin.ui().errors().await,
        vec!["Too many slices (151). The maximum is 100.".to_string()]
    );
    assert_eq!(scene.node_count().await, 1);
}

#[tokio::test]
async fn test_invalid_selection_is_a_silent_no_op() {
    let (scene, frame) = frame_scene(900.0, &[300.0]).await;
    let other = scene
        .add_frame("Other", Rect::new(700.0, 0.0, 600.0, 400.0), vec![])
        .await;
    scene.select(&[frame, other]).await.unwrap();
    let plugin = plugin(&scene);

    plugin.dispatch(UiCommand::GenerateSlices).await.unwrap();
    plugin.dispatch(UiCommand::ClearGuides).await.unwrap();

    assert_eq!(
        plugin.ui().messages().await,
        vec![
            CoreMessage::SelectionChanged(SelectionState::invalid()),
            CoreMessage::SelectionChanged(SelectionState::invalid()),
        ]
    );
    assert_eq!(scene.node_count().await, 2);
}

#[tokio::test]
async fn test_refresh_selection_reports_frame() {
    let (scene, _) = frame_scene(900.0, &[300.0, 600.0]).await;
    let plugin = plugin(&scene);

    let state = plugin.refresh_selection().await.unwrap();

    assert_eq!(
        state,
        SelectionState {
            valid: true,
            frame_name: Some("Newsletter".to_string()),
            frame_width: Some(600.0),
            frame_height: Some(900.0),
            guide_count: Some(2),
        }
    );
    assert_eq!(
        plugin.ui().messages().await,
        vec![CoreMessage::SelectionChanged(state)]
    );
}

#[tokio::test]
async fn test_export_generates_reports_progress_and_packages() {
    let (scene, _) = frame_scene(900.0, &[300.0, 600.0]).await;
    let plugin = plugin(&scene);

    plugin
        .dispatch(UiCommand::ExportHtml {
            add_footer: Some(false),
        })
        .await
        .unwrap();

    let messages = plugin.ui().messages().await;
    assert_eq!(messages.len(), 4);
    assert_eq!(
        &messages[..3],
        &[
            CoreMessage::ExportProgress { current: 1, total: 3 },
            CoreMessage::ExportProgress { current: 2, total: 3 },
            CoreMessage::ExportProgress { current: 3, total: 3 },
        ]
    );

    let package = plugin.ui().last_package().await.unwrap();
    assert_eq!(package.frame_name, "Newsletter");
    assert_eq!(package.add_footer, Some(false));
    let files: Vec<&str> = package.images.iter().map(|i| i.file_name.as_str()).collect();
    assert_eq!(files, vec!["slice-001.png", "slice-002.png", "slice-003.png"]);
    assert_eq!(package.images[1].height, 300);
    assert_eq!(package.images[1].absolute_y, 300.0);

    let html = package.html.unwrap();
    assert_eq!(html.matches("<img ").count(), 3);
    assert!(html.contains(r#"src="images/slice-002.png""#));

    // Temporary export artifacts are gone: frame + group + 3 slices.
    assert_eq!(scene.node_count().await, 5);
}

#[tokio::test]
async fn test_renamed_slices_drive_names_and_links() {
    let (scene, frame) = frame_scene(900.0, &[300.0, 600.0]).await;
    let plugin = plugin(&scene);
    plugin.dispatch(UiCommand::GenerateSlices).await.unwrap();

    let group = scene
        .find_group(&frame, "Email Slices")
        .await
        .unwrap()
        .unwrap();
    scene
        .rename(&group.children[0].id, "Hero (https://shop.example.com/?a=1&b=2)")
        .await
        .unwrap();
    scene.rename(&group.children[1].id, "Hero").await.unwrap();
    scene.rename(&group.children[2].id, "Hero (note)").await.unwrap();

    plugin.ui().take().await;
    plugin
        .dispatch(UiCommand::ExportHtml { add_footer: None })
        .await
        .unwrap();

    let package = plugin.ui().last_package().await.unwrap();
    let files: Vec<&str> = package.images.iter().map(|i| i.file_name.as_str()).collect();
    assert_eq!(files, vec!["hero.png", "hero-1.png", "hero-note.png"]);
    assert_eq!(
        package.images[0].link_url.as_deref(),
        Some("https://shop.example.com/?a=1&b=2")
    );

    let html = package.html.unwrap();
    assert_eq!(html.matches("<a ").count(), 1);
    assert!(html.contains(r#"href="https://shop.example.com/?a=1&amp;b=2""#));
}

#[tokio::test]
async fn test_labels_shaped_like_suffixes_get_unique_files() {
    let (scene, frame) = frame_scene(900.0, &[300.0, 600.0]).await;
    let plugin = plugin(&scene);
    plugin.dispatch(UiCommand::GenerateSlices).await.unwrap();

    let group = scene
        .find_group(&frame, "Email Slices")
        .await
        .unwrap()
        .unwrap();
    for (child, name) in group.children.iter().zip(["Promo", "Promo", "Promo-1"]) {
        scene.rename(&child.id, name).await.unwrap();
    }

    plugin.ui().take().await;
    plugin
        .dispatch(UiCommand::ExportHtml { add_footer: None })
        .await
        .unwrap();

    let package = plugin.ui().last_package().await.unwrap();
    let files: Vec<&str> = package.images.iter().map(|i| i.file_name.as_str()).collect();
    assert_eq!(files, vec!["promo.png", "promo-1.png", "promo-1-1.png"]);

    let archive = ZipPackager::<LocalStorage>::build_archive(&package).unwrap();
    let archive = zip::ZipArchive::new(std::io::Cursor::new(archive)).unwrap();
    assert_eq!(archive.len(), 4);
}

#[tokio::test]
async fn test_export_with_only_untagged_artifacts_reports_error() {
    let (scene, frame) = frame_scene(900.0, &[300.0, 600.0]).await;
    let group = scene.create_group(&frame, "Email Slices").await.unwrap();
    scene
        .create_artifact(ArtifactRequest {
            name: "Sticky note".to_string(),
            parent: ArtifactParent::Node(group),
            bounds: Rect::new(0.0, 0.0, 100.0, 40.0),
            tag: None,
        })
        .await
        .unwrap();
    let plugin = plugin(&scene);

    plugin
        .dispatch(UiCommand::ExportHtml {
            add_footer: Some(true),
        })
        .await
        .unwrap();

    assert_eq!(
        plugin.ui().messages().await,
        vec![CoreMessage::Error {
            message: "No slices found to export".to_string()
        }]
    );
    assert!(plugin.ui().last_package().await.is_none());
    assert_eq!(scene.node_count().await, 3);
}

#[tokio::test]
async fn test_regenerate_keeps_renamed_labels() {
    let (scene, frame) = frame_scene(900.0, &[300.0]).await;
    let plugin = plugin(&scene);
    plugin.dispatch(UiCommand::GenerateSlices).await.unwrap();

    let group = scene
        .find_group(&frame, "Email Slices")
        .await
        .unwrap()
        .unwrap();
    scene.rename(&group.children[1].id, "Footer").await.unwrap();
    scene
        .set_guides(&frame, vec![Guide::horizontal(300.0), Guide::horizontal(600.0)])
        .await
        .unwrap();

    // The host reports the new guides on the next selection read.
    plugin.dispatch(UiCommand::GenerateSlices).await.unwrap();

    let group = scene
        .find_group(&frame, "Email Slices")
        .await
        .unwrap()
        .unwrap();
    let names: Vec<&str> = group.children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["slice-001", "Footer", "slice-003"]);
}

#[tokio::test]
async fn test_clear_commands() {
    let (scene, frame) = frame_scene(900.0, &[300.0, 600.0]).await;
    let plugin = plugin(&scene);
    plugin.dispatch(UiCommand::GenerateSlices).await.unwrap();
    plugin.ui().take().await;

    plugin.dispatch(UiCommand::ClearSlices).await.unwrap();
    assert!(scene.find_group(&frame, "Email Slices").await.unwrap().is_none());

    plugin.dispatch(UiCommand::ClearGuides).await.unwrap();
    assert!(scene.guides(&frame).await.unwrap().is_empty());

    let messages = plugin.ui().messages().await;
    assert_eq!(messages[0], CoreMessage::SlicesCleared {});
    assert_eq!(messages[1], CoreMessage::GuidesCleared {});
    match &messages[2] {
        CoreMessage::SelectionChanged(state) => assert_eq!(state.guide_count, Some(0)),
        other => panic!("expected selection-changed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_message_reports_error() {
    let (scene, _) = frame_scene(900.0, &[300.0]).await;
    let plugin = plugin(&scene);

    plugin.dispatch_json(r#"{"type":"explode"}"#).await.unwrap();
    plugin
        .dispatch_json(r#"{"type":"generate-slices"}"#)
        .await
        .unwrap();

    let messages = plugin.ui().messages().await;
    assert!(matches!(&messages[0], CoreMessage::Error { message } if message.starts_with("Unknown command")));
    assert_eq!(messages[1], CoreMessage::SlicesGenerated { count: 2 });
}

/// Holds the first rasterization until released.
struct GatedScene {
    inner: MemoryScene,
    entered: Arc<Notify>,
    release: Arc<Notify>,
    gated: AtomicBool,
}

#[async_trait]
impl SceneService for GatedScene {
    async fn selection(&self) -> Result<Vec<SceneNode>> {
        self.inner.selection().await
    }

    async fn find_group(&self, parent: &NodeId, name: &str) -> Result<Option<ArtifactGroup>> {
        self.inner.find_group(parent, name).await
    }

    async fn create_group(&self, parent: &NodeId, name: &str) -> Result<NodeId> {
        self.inner.create_group(parent, name).await
    }

    async fn create_artifact(&self, request: ArtifactRequest) -> Result<NodeId> {
        self.inner.create_artifact(request).await
    }

    async fn remove_node(&self, id: &NodeId) -> Result<()> {
        self.inner.remove_node(id).await
    }

    async fn export_image(&self, id: &NodeId, format: ImageFormat, scale: f64) -> Result<Vec<u8>> {
        if !self.gated.swap(true, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.export_image(id, format, scale).await
    }

    async fn set_guides(&self, frame: &NodeId, guides: Vec<Guide>) -> Result<()> {
        self.inner.set_guides(frame, guides).await
    }
}

#[tokio::test]
async fn test_commands_are_rejected_while_busy() {
    let (scene, _) = frame_scene(900.0, &[450.0]).await;
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let gated = GatedScene {
        inner: scene.clone(),
        entered: entered.clone(),
        release: release.clone(),
        gated: AtomicBool::new(false),
    };
    let plugin = SlicerPlugin::new(gated, SlicerConfig::default(), RecordingUi::new());

    let export = plugin.dispatch(UiCommand::ExportHtml { add_footer: None });
    let interloper = async {
        entered.notified().await;
        assert!(plugin.is_busy());
        plugin.dispatch(UiCommand::ClearSlices).await.unwrap();
        release.notify_one();
    };
    let (result, _) = tokio::join!(export, interloper);
    result.unwrap();

    assert!(!plugin.is_busy());
    let messages = plugin.ui().messages().await;
    assert!(messages.contains(&CoreMessage::error("Another operation is still running")));
    assert!(matches!(messages.last(), Some(CoreMessage::PackageZip(_))));
    // The rejected clear-slices never ran.
    assert_eq!(scene.node_count().await, 4);
}
