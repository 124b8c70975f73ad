//! Audit emission.
//!
//! Every committed transition produces one [`AuditEvent`]. Emission happens
//! after the write; a failing sink is logged and never undoes the write.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::engine::error::EngineError;
use crate::models::audit::{AuditEvent, AuditKind, AuditSubject};

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: &AuditEvent) -> Result<(), EngineError>;
}

/// Writes each event as one JSON line on the `audit` log target.
pub struct LogAuditSink;

#[async_trait]
impl AuditSink for LogAuditSink {
    async fn record(&self, event: &AuditEvent) -> Result<(), EngineError> {
        let line = serde_json::to_string(event).map_err(|e| EngineError::Store(e.to_string()))?;
        log::info!(target: "audit", "{}", line);
        Ok(())
    }
}

impl AuditEvent {
    pub fn new(kind: AuditKind, subject: AuditSubject, subject_id: i32, actor_id: i32) -> Self {
        AuditEvent {
            id: Uuid::new_v4(),
            kind,
            subject,
            subject_id,
            actor_id,
            from_status: None,
            to_status: None,
            detail: serde_json::Value::Null,
            occurred_at: Utc::now(),
        }
    }

    pub fn statuses(mut self, from: Option<&str>, to: &str) -> Self {
        self.from_status = from.map(str::to_string);
        self.to_status = Some(to.to_string());
        self
    }

    pub fn detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = detail;
        self
    }
}

#[derive(Clone)]
pub struct AuditEmitter {
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl AuditEmitter {
    pub fn new(sinks: Vec<Arc<dyn AuditSink>>) -> Self {
        Self { sinks }
    }

    pub async fn emit(&self, event: AuditEvent) {
        for sink in &self.sinks {
            if let Err(e) = sink.record(&event).await {
                log::error!(
                    "Failed to record audit event {} ({}) for {} {}: {}",
                    event.id,
                    event.kind.as_str(),
                    event.subject.as_str(),
                    event.subject_id,
                    e
                );
            }
        }
    }
}
