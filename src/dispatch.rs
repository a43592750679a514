use crate::config::Config;
use crate::error::{Result, RetentionError};
use crate::provider::{LogGroupProvider, LogGroupRecord};
use crate::sweep::{Correction, SweepReport, reconcile_log_group, sweep};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// CloudTrail `eventSource` of CloudWatch Logs API calls.
pub const LOGS_EVENT_SOURCE: &str = "logs.amazonaws.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionEvent {
    pub log_group_name: String,
    /// `None` when the call did not specify a retention, leaving the group without one.
    pub requested_retention_days: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Targeted(RetentionEvent),
    Sweep,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestParameters {
    log_group_name: Option<String>,
    retention_in_days: Option<i32>,
}

impl Trigger {
    /// Classifies a raw invocation payload. CloudTrail records for CloudWatch Logs calls are
    /// accepted either bare or wrapped in an EventBridge envelope (under `detail`); any other payload
    /// is a sweep.
    pub fn from_event(event: &Value) -> Result<Self> {
        let record = match event.get("detail") {
            Some(detail) if detail.is_object() => detail,
            _ => event,
        };

        let event_source = record.get("eventSource").and_then(Value::as_str);
        if event_source != Some(LOGS_EVENT_SOURCE) {
            debug!("Event source {event_source:?} is not {LOGS_EVENT_SOURCE}, sweeping");
            return Ok(Trigger::Sweep);
        }

        let request_parameters = record
            .get("requestParameters")
            .filter(|params| !params.is_null())
            .ok_or_else(|| {
                RetentionError::InvalidInput("event is missing requestParameters".to_string())
            })?;

        let params: RequestParameters = serde_json::from_value(request_parameters.clone())
            .map_err(|e| {
                RetentionError::InvalidInput(format!("malformed requestParameters: {e}"))
            })?;

        let log_group_name = params
            .log_group_name
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| {
                RetentionError::InvalidInput(
                    "requestParameters is missing logGroupName".to_string(),
                )
            })?;

        Ok(Trigger::Targeted(RetentionEvent {
            log_group_name,
            requested_retention_days: params.retention_in_days,
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetedResult {
    Skipped,
    Kept,
    Corrected,
    WouldCorrect,
}

#[derive(Debug, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Outcome {
    Targeted {
        log_group_name: String,
        result: TargetedResult,
        retention_in_days: Option<i32>,
    },
    Sweep(SweepReport),
}

impl Outcome {
    pub fn ensure_success(&self) -> Result<()> {
        match self {
            Outcome::Targeted { .. } => Ok(()),
            Outcome::Sweep(report) => report.ensure_success(),
        }
    }
}

/// Handles one trigger: a targeted event is reconciled on its own, anything else sweeps every log
/// group.
pub async fn dispatch(
    trigger: Trigger,
    provider: &impl LogGroupProvider,
    config: &Config,
) -> Result<Outcome> {
    match trigger {
        Trigger::Targeted(event) => {
            info!(
                "Reconciling {} after retention change (requested {:?})",
                event.log_group_name, event.requested_retention_days
            );

            let log_group =
                LogGroupRecord::new(event.log_group_name, event.requested_retention_days);

            let (result, retention_in_days) =
                match reconcile_log_group(provider, config, &log_group).await? {
                    Correction::Skipped => (TargetedResult::Skipped, log_group.retention_in_days),
                    Correction::Kept => (TargetedResult::Kept, log_group.retention_in_days),
                    Correction::Applied(days) => (TargetedResult::Corrected, Some(days)),
                    Correction::DryRun(days) => (TargetedResult::WouldCorrect, Some(days)),
                };

            Ok(Outcome::Targeted {
                log_group_name: log_group.name,
                result,
                retention_in_days,
            })
        }
        Trigger::Sweep => Ok(Outcome::Sweep(sweep(provider, config).await?)),
    }
}
