//! NATS request/reply surface for the prediction form

use crate::error::PipelineError;
use crate::handler::{self, Command, Response};
use crate::models::inference::ModelTiming;
use crate::registry::ModelRegistry;
use anyhow::Result;
use async_nats::{Client, Subject, Subscriber};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Result of one request as sent back to the form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", content = "body", rename_all = "snake_case")]
pub enum Outcome {
    /// The command was served
    Ok(Response),
    /// The submission was invalid; `message` is meant for the user
    Rejected { kind: String, message: String },
    /// The deployment could not serve the request
    Failed { kind: String, message: String },
}

/// Reply envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub request_id: Uuid,
    pub handled_at: DateTime<Utc>,
    pub outcome: Outcome,
}

/// A served request together with what the metrics need
pub struct Served {
    pub command: Option<&'static str>,
    pub reply: Reply,
    pub timings: Vec<ModelTiming>,
}

impl Served {
    pub fn is_rejected(&self) -> bool {
        matches!(self.reply.outcome, Outcome::Rejected { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.reply.outcome, Outcome::Failed { .. })
    }
}

/// Decode a request payload, dispatch it and build the reply.
///
/// Validation errors become `rejected` replies; every other error is logged
/// and becomes a `failed` reply.
pub fn serve(registry: &ModelRegistry, payload: &[u8]) -> Served {
    let request_id = Uuid::new_v4();

    let command: Command = match serde_json::from_slice(payload) {
        Ok(command) => command,
        Err(e) => {
            warn!(request_id = %request_id, error = %e, "Failed to deserialize command");
            return Served {
                command: None,
                reply: reply(
                    request_id,
                    Outcome::Rejected {
                        kind: "bad_request".to_string(),
                        message: format!("Malformed request: {}", e),
                    },
                ),
                timings: Vec::new(),
            };
        }
    };

    let (outcome, timings) = match handler::handle_timed(registry, &command) {
        Ok((response, timings)) => (Outcome::Ok(response), timings),
        Err(e) => (outcome_for_error(request_id, command.name(), &e), Vec::new()),
    };

    Served {
        command: Some(command.name()),
        reply: reply(request_id, outcome),
        timings,
    }
}

fn outcome_for_error(request_id: Uuid, command: &str, e: &PipelineError) -> Outcome {
    if e.is_validation() {
        debug!(request_id = %request_id, command = command, error = %e, "Submission rejected");
        Outcome::Rejected {
            kind: e.kind().to_string(),
            message: e.to_string(),
        }
    } else {
        error!(request_id = %request_id, command = command, error = %e, "Request failed");
        Outcome::Failed {
            kind: e.kind().to_string(),
            message: e.to_string(),
        }
    }
}

fn reply(request_id: Uuid, outcome: Outcome) -> Reply {
    Reply {
        request_id,
        handled_at: Utc::now(),
        outcome,
    }
}

/// Subscriber for form commands and publisher of their replies
#[derive(Clone)]
pub struct FormService {
    client: Client,
    subject: String,
}

impl FormService {
    /// Create a new form service
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Subscribe to the request subject
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.subject.clone()).await?;
        info!(subject = %self.subject, "Subscribed to form request subject");
        Ok(subscriber)
    }

    /// Publish a reply to the requester's inbox
    pub async fn respond(&self, inbox: Subject, reply: &Reply) -> Result<()> {
        let payload = serde_json::to_vec(reply)?;

        self.client.publish(inbox, payload.into()).await?;

        debug!(request_id = %reply.request_id, "Published reply");

        Ok(())
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}
