use crate::core::orchestrator::SliceOrchestrator;
use crate::domain::messages::{CoreMessage, SelectionState, UiCommand};
use crate::domain::model::SceneNode;
use crate::domain::ports::{ConfigProvider, SceneService, UiSink};
use crate::utils::error::{Result, SlicerError};
use std::sync::atomic::{AtomicBool, Ordering};

struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Routes UI commands to the orchestrator and reports back over `UiSink`.
///
/// One command runs at a time; anything dispatched meanwhile is answered with
/// an error message instead of being queued.
pub struct SlicerPlugin<S: SceneService, C: ConfigProvider, U: UiSink> {
    orchestrator: SliceOrchestrator<S, C>,
    ui: U,
    busy: AtomicBool,
}

impl<S: SceneService, C: ConfigProvider, U: UiSink> SlicerPlugin<S, C, U> {
    pub fn new(scene: S, config: C, ui: U) -> Self {
        Self {
            orchestrator: SliceOrchestrator::new(scene, config),
            ui,
            busy: AtomicBool::new(false),
        }
    }

    pub fn orchestrator(&self) -> &SliceOrchestrator<S, C> {
        &self.orchestrator
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Broadcasts `selection-changed`; called on startup and whenever the
    /// host selection moves.
    pub async fn refresh_selection(&self) -> Result<SelectionState> {
        let state = match self.orchestrator.selection_state().await {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!("Could not read selection: {}", e);
                SelectionState::invalid()
            }
        };
        self.ui
            .post(CoreMessage::SelectionChanged(state.clone()))
            .await?;
        Ok(state)
    }

    /// Parses a raw UI message and dispatches it.
    pub async fn dispatch_json(&self, raw: &str) -> Result<()> {
        match UiCommand::from_json(raw) {
            Ok(command) => self.dispatch(command).await,
            Err(e) => {
                tracing::warn!("Ignoring malformed UI message: {}", e);
                self.ui
                    .post(CoreMessage::error(format!("Unknown command: {}", e)))
                    .await
            }
        }
    }

    /// Runs one command to completion. Only a failure to reach the UI is
    /// returned; command failures are posted as `error` messages.
    pub async fn dispatch(&self, command: UiCommand) -> Result<()> {
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            tracing::warn!("Rejected '{}' while busy", command.name());
            return self
                .ui
                .post(CoreMessage::error(SlicerError::Busy.user_friendly_message()))
                .await;
        };

        tracing::debug!("Handling '{}'", command.name());

        let frame = match self.orchestrator.selected_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::debug!("No valid frame selected, ignoring '{}'", command.name());
                return self
                    .ui
                    .post(CoreMessage::SelectionChanged(SelectionState::invalid()))
                    .await;
            }
            Err(e) => return self.report(&command, e).await,
        };

        match self.handle(&command, &frame).await {
            Ok(messages) => {
                for message in messages {
                    self.ui.post(message).await?;
                }
                Ok(())
            }
            Err(e) => self.report(&command, e).await,
        }
    }

    async fn handle(&self, command: &UiCommand, frame: &SceneNode) -> Result<Vec<CoreMessage>> {
        match command {
            UiCommand::GenerateSlices => {
                let count = self.orchestrator.generate_slices(frame).await?;
                Ok(vec![CoreMessage::SlicesGenerated { count }])
            }
            UiCommand::ExportHtml { add_footer } => {
                let package = self
                    .orchestrator
                    .export(frame, add_footer.unwrap_or(false), &self.ui)
                    .await?;
                Ok(vec![CoreMessage::PackageZip(package)])
            }
            UiCommand::ClearSlices => {
                self.orchestrator.clear_slices(frame).await?;
                Ok(vec![CoreMessage::SlicesCleared {}])
            }
            UiCommand::ClearGuides => {
                self.orchestrator.clear_guides(frame).await?;
                let state = self.orchestrator.selection_state().await?;
                Ok(vec![
                    CoreMessage::GuidesCleared {},
                    CoreMessage::SelectionChanged(state),
                ])
            }
        }
    }

    async fn report(&self, command: &UiCommand, error: SlicerError) -> Result<()> {
        if error.is_user_error() {
            tracing::info!("'{}' refused: {}", command.name(), error);
        } else {
            tracing::error!("'{}' failed: {}", command.name(), error);
        }
        self.ui
            .post(CoreMessage::error(error.user_friendly_message()))
            .await
    }
}
