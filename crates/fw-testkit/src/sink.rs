use std::sync::atomic::{AtomicBool, Ordering};

use fw_integrity::IncidentSink;
use fw_schemas::{EngineError, IntegrityAlert};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct RecordingIncidentSink {
    created: Mutex<Vec<(String, IntegrityAlert)>>,
    failing: AtomicBool,
}

impl RecordingIncidentSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn alerts(&self) -> Vec<IntegrityAlert> {
        self.created.lock().await.iter().map(|(_, a)| a.clone()).collect()
    }

    pub async fn incident_ids(&self) -> Vec<String> {
        self.created.lock().await.iter().map(|(id, _)| id.clone()).collect()
    }
}

#[async_trait::async_trait]
impl IncidentSink for RecordingIncidentSink {
    async fn create_incident(&self, alert: &IntegrityAlert) -> Result<String, EngineError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EngineError::Infrastructure("incident service unavailable".to_string()));
        }
        let mut created = self.created.lock().await;
        let id = format!("INC-{:04}", created.len() + 1);
        created.push((id.clone(), alert.clone()));
        Ok(id)
    }
}
