//! Single-writer export progress, observed through a `watch` channel.

use newscut_common::error::{NewscutError, NewscutResult};
use newscut_project_model::{ExportProgress, ExportStatus};
use tokio::sync::watch;

/// Owns the only sender of the export progress channel.
///
/// Rejects transitions the export state machine does not allow and keeps
/// progress non-decreasing while a phase is unchanged.
#[derive(Debug)]
pub struct ProgressPublisher {
    tx: watch::Sender<ExportProgress>,
    phases: Vec<ExportStatus>,
}

impl Default for ProgressPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressPublisher {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ExportProgress::idle());
        Self {
            tx,
            phases: vec![ExportStatus::Idle],
        }
    }

    /// A read-only observer of the progress state.
    pub fn subscribe(&self) -> watch::Receiver<ExportProgress> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> ExportProgress {
        self.tx.borrow().clone()
    }

    pub fn status(&self) -> ExportStatus {
        self.tx.borrow().status
    }

    /// Every phase entered since construction, in order.
    pub fn phases(&self) -> &[ExportStatus] {
        &self.phases
    }

    /// Enter `status`, resetting progress and ETA.
    pub fn transition(
        &mut self,
        status: ExportStatus,
        progress: f64,
        message: impl Into<String>,
    ) -> NewscutResult<()> {
        let from = self.status();
        if !from.can_transition_to(status) {
            return Err(NewscutError::invalid_state(format!(
                "Cannot move export from {from} to {status}"
            )));
        }
        let message = message.into();
        tracing::info!(from = %from, to = %status, %message, "Export phase changed");
        self.tx
            .send_replace(ExportProgress::new(status, progress, message));
        self.phases.push(status);
        Ok(())
    }

    /// Update progress inside the current phase. Lower values are ignored.
    pub fn advance(&mut self, progress: f64, eta_secs: Option<f64>) {
        self.tx.send_if_modified(|state| {
            let progress = progress.clamp(0.0, 100.0);
            if progress < state.progress {
                return false;
            }
            state.progress = progress;
            state.eta_secs = eta_secs.map(|eta| eta.max(0.0));
            true
        });
    }

    /// Replace the message of the current phase.
    pub fn set_message(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.tx.send_modify(|state| state.message = message);
    }

    /// Enter the error phase from any non-error phase.
    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        if self.status() == ExportStatus::Error {
            self.set_message(message);
            return;
        }
        tracing::error!(from = %self.status(), %message, "Export failed");
        self.tx
            .send_replace(ExportProgress::new(ExportStatus::Error, 0.0, message));
        self.phases.push(ExportStatus::Error);
    }

    /// Return to idle with an optional note (cancellation, reset, rejected start).
    pub fn idle(&mut self, message: impl Into<String>) {
        let message = message.into();
        if self.status() != ExportStatus::Idle {
            self.phases.push(ExportStatus::Idle);
        }
        self.tx.send_replace(ExportProgress {
            message,
            ..ExportProgress::idle()
        });
    }

    /// Forget the phase history before a new run.
    pub fn clear_history(&mut self) {
        self.phases.clear();
        self.phases.push(self.status());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_path_is_recorded() {
        let mut publisher = ProgressPublisher::new();
        let rx = publisher.subscribe();
        publisher
            .transition(ExportStatus::Preparing, 0.0, "Preparing")
            .unwrap();
        publisher
            .transition(ExportStatus::Rendering, 0.0, "Recording")
            .unwrap();
        assert_eq!(rx.borrow().status, ExportStatus::Rendering);
        assert_eq!(
            publisher.phases(),
            &[
                ExportStatus::Idle,
                ExportStatus::Preparing,
                ExportStatus::Rendering
            ]
        );
    }

    #[test]
    fn test_illegal_transition_rejected() {
        let mut publisher = ProgressPublisher::new();
        let err = publisher
            .transition(ExportStatus::Encoding, 0.0, "skip ahead")
            .unwrap_err();
        assert!(matches!(err, NewscutError::InvalidState { .. }));
        assert_eq!(publisher.status(), ExportStatus::Idle);
    }

    #[test]
    fn test_progress_never_decreases() {
        let mut publisher = ProgressPublisher::new();
        publisher
            .transition(ExportStatus::Preparing, 0.0, "")
            .unwrap();
        publisher
            .transition(ExportStatus::Rendering, 0.0, "")
            .unwrap();
        publisher.advance(40.0, Some(6.0));
        publisher.advance(25.0, Some(1.0));
        let state = publisher.current();
        assert_eq!(state.progress, 40.0);
        assert_eq!(state.eta_secs, Some(6.0));

        publisher.advance(140.0, None);
        assert_eq!(publisher.current().progress, 100.0);
    }

    #[test]
    fn test_fail_then_idle() {
        let mut publisher = ProgressPublisher::new();
        publisher
            .transition(ExportStatus::Preparing, 0.0, "")
            .unwrap();
        publisher.fail("ffmpeg crashed");
        assert_eq!(publisher.status(), ExportStatus::Error);
        assert_eq!(publisher.current().message, "ffmpeg crashed");

        publisher.idle("");
        assert_eq!(publisher.status(), ExportStatus::Idle);
        assert_eq!(publisher.phases().last(), Some(&ExportStatus::Idle));
    }
}
