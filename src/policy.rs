use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Action {
    NoAction,
    SetRetention(i32),
}

/// Decides whether a log group's retention must be overwritten with `default_retention_days`.
///
/// An unset retention means events never expire and is always capped. A finite retention is only
/// capped when it exceeds the default; shorter retentions are left alone.
pub fn decide(current_retention_days: Option<i32>, default_retention_days: i32) -> Action {
    match current_retention_days {
        Some(days) if days <= default_retention_days => Action::NoAction,
        _ => Action::SetRetention(default_retention_days),
    }
}
