use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::entry::EntryStore;
use crate::location::LocationProvider;
use crate::session::{CaptureError, CaptureService, SessionUpdate};

/// Snapshot of the live capture session, folded from its update stream so
/// HTTP clients can poll it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CaptureSnapshot {
    /// Baseline plus the spoken-so-far transcript
    pub text: String,
    /// Whether the terminal transcript has arrived
    pub is_final: bool,
    /// Error that ended the session, if any
    pub error: Option<String>,
}

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub capture: Arc<CaptureService>,
    pub entries: Arc<dyn EntryStore>,
    pub location: Arc<dyn LocationProvider>,
    pub snapshot: Arc<RwLock<CaptureSnapshot>>,
}

impl AppState {
    pub fn new(
        capture: Arc<CaptureService>,
        entries: Arc<dyn EntryStore>,
        location: Arc<dyn LocationProvider>,
    ) -> Self {
        Self {
            capture,
            entries,
            location,
            snapshot: Arc::new(RwLock::new(CaptureSnapshot::default())),
        }
    }

    /// Start a capture session and fold its updates into the snapshot.
    pub async fn start_capture(&self, baseline: String) -> Result<(), CaptureError> {
        let mut updates = self.capture.start(baseline.clone()).await?;

        {
            let mut snapshot = self.snapshot.write().await;
            *snapshot = CaptureSnapshot {
                text: baseline,
                is_final: false,
                error: None,
            };
        }

        let snapshot = Arc::clone(&self.snapshot);
        tokio::spawn(async move {
            while let Some(update) = updates.recv().await {
                let mut snapshot = snapshot.write().await;
                match update {
                    SessionUpdate::Transcript { text, is_final } => {
                        snapshot.text = text;
                        snapshot.is_final = is_final;
                    }
                    SessionUpdate::Error(e) => {
                        snapshot.error = Some(e.to_string());
                    }
                }
            }
        });

        Ok(())
    }
}
