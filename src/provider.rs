use anyhow::{Context, Result};
use aws_config::ConfigLoader;
use aws_config::retry::RetryConfig;
use aws_sdk_cloudwatchlogs::Client;
use aws_sdk_cloudwatchlogs::config::Region;
use aws_sdk_cloudwatchlogs::types::LogGroup;
use log::{debug, trace, warn};
use std::future::Future;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogGroupRecord {
    pub name: String,
    /// `None` means events in the group never expire.
    pub retention_in_days: Option<i32>,
}

impl LogGroupRecord {
    pub fn new(name: impl Into<String>, retention_in_days: Option<i32>) -> Self {
        Self {
            name: name.into(),
            retention_in_days,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogGroupPage {
    pub log_groups: Vec<LogGroupRecord>,
    pub next_token: Option<String>,
}

/// The two log-management calls retention enforcement depends on.
pub trait LogGroupProvider {
    /// Fetches one page of log groups. `next_token` is `None` for the first page; the returned
    /// page's `next_token` is `None` once the listing is exhausted.
    fn list_log_groups(
        &self,
        next_token: Option<String>,
    ) -> impl Future<Output = Result<LogGroupPage>> + Send;

    fn put_retention_policy(
        &self,
        log_group_name: &str,
        retention_in_days: i32,
    ) -> impl Future<Output = Result<()>> + Send;
}

#[derive(Debug, Clone)]
pub struct CloudWatchLogs {
    client: Client,
}

impl CloudWatchLogs {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn load(region: Option<String>) -> Self {
        let mut aws_config = ConfigLoader::default();
        if let Some(region) = region {
            aws_config = aws_config.region(Region::new(region));
        }

        let aws_config = aws_config
            .retry_config(RetryConfig::standard())
            .load()
            .await;

        Self::new(Client::new(&aws_config))
    }
}

fn log_group_records(log_groups: Vec<LogGroup>) -> Vec<LogGroupRecord> {
    log_groups
        .into_iter()
        .filter_map(|group| match group.log_group_name() {
            Some(name) => Some(LogGroupRecord::new(name, group.retention_in_days())),
            None => {
                warn!("Skipping log group without a name: {group:?}");
                None
            }
        })
        .collect()
}

impl LogGroupProvider for CloudWatchLogs {
    async fn list_log_groups(&self, next_token: Option<String>) -> Result<LogGroupPage> {
        trace!("Describing log groups (next_token={next_token:?})");

        let describe_output = self
            .client
            .describe_log_groups()
            .set_next_token(next_token)
            .send()
            .await
            .context("Failed to describe log groups")?;

        let log_groups = log_group_records(describe_output.log_groups.unwrap_or_default());
        debug!("Described {} log group(s)", log_groups.len());

        Ok(LogGroupPage {
            log_groups,
            next_token: describe_output.next_token,
        })
    }

    async fn put_retention_policy(&self, log_group_name: &str, retention_in_days: i32) -> Result<()> {
        self.client
            .put_retention_policy()
            .log_group_name(log_group_name)
            .retention_in_days(retention_in_days)
            .send()
            .await
            .with_context(|| {
                format!(
                    "Failed to put {retention_in_days}d retention policy on {log_group_name}"
                )
            })?;

        debug!("Set retention of {log_group_name} to {retention_in_days}d");
        Ok(())
    }
}


#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use anyhow::anyhow;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// In-memory provider serving fixed pages, recording every retention call.
    #[derive(Debug, Default)]
    pub struct FakeProvider {
        pages: Vec<Vec<LogGroupRecord>>,
        failing_groups: HashSet<String>,
        failing_page: Option<usize>,
        list_calls: Mutex<usize>,
        calls: Mutex<Vec<(String, i32)>>,
    }

    impl FakeProvider {
        pub fn with_pages(pages: Vec<Vec<LogGroupRecord>>) -> Self {
            Self {
                pages,
                ..Self::default()
            }
        }

        pub fn with_groups(groups: Vec<LogGroupRecord>) -> Self {
            Self::with_pages(vec![groups])
        }

        pub fn failing_on(mut self, log_group_name: &str) -> Self {
            self.failing_groups.insert(log_group_name.to_string());
            self
        }

        pub fn failing_page(mut self, page: usize) -> Self {
            self.failing_page = Some(page);
            self
        }

        pub fn calls(&self) -> Vec<(String, i32)> {
            self.calls.lock().unwrap().clone()
        }

        pub fn list_calls(&self) -> usize {
            *self.list_calls.lock().unwrap()
        }
    }

    impl LogGroupProvider for FakeProvider {
        async fn list_log_groups(&self, next_token: Option<String>) -> Result<LogGroupPage> {
            *self.list_calls.lock().unwrap() += 1;

            let index = match next_token {
                Some(token) => token.parse::<usize>()?,
                None => 0,
            };

            if self.failing_page == Some(index) {
                return Err(anyhow!("Throttled while describing page {index}"));
            }

            let log_groups = self.pages.get(index).cloned().unwrap_or_default();
            let next_token = (index + 1 < self.pages.len()).then(|| (index + 1).to_string());

            Ok(LogGroupPage {
                log_groups,
                next_token,
            })
        }

        async fn put_retention_policy(
            &self,
            log_group_name: &str,
            retention_in_days: i32,
        ) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push((log_group_name.to_string(), retention_in_days));

            if self.failing_groups.contains(log_group_name) {
                return Err(anyhow!("Access denied for {log_group_name}"));
            }

            Ok(())
        }
    }
}
