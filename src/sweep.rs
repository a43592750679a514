use crate::config::Config;
use crate::error::{Result, RetentionError};
use crate::policy::{Action, decide};
use crate::provider::{LogGroupProvider, LogGroupRecord};
use log::{debug, info, warn};
use serde::Serialize;
use std::time::Instant;

#[derive(Debug, Serialize)]
pub struct CorrectionFailure {
    pub log_group_name: String,
    pub retention_in_days: i32,
    #[serde(serialize_with = "serialize_error")]
    pub error: anyhow::Error,
}

fn serialize_error<S: serde::Serializer>(
    error: &anyhow::Error,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(&format_args!("{error:#}"))
}

#[derive(Debug, Default, Serialize)]
pub struct SweepReport {
    pub examined: usize,
    pub skipped: usize,
    pub corrected: Vec<String>,
    pub failures: Vec<CorrectionFailure>,
}

impl SweepReport {
    /// Turns any isolated correction failures into a single error for the caller.
    pub fn ensure_success(&self) -> Result<()> {
        if self.failures.is_empty() {
            return Ok(());
        }

        Err(RetentionError::CorrectionFailures {
            failed: self.failures.len(),
            total: self.corrected.len() + self.failures.len(),
        })
    }
}

/// The outcome of applying the retention policy to a single log group.
#[derive(Debug)]
pub(crate) enum Correction {
    Skipped,
    Kept,
    Applied(i32),
    DryRun(i32),
}

pub(crate) async fn reconcile_log_group(
    provider: &impl LogGroupProvider,
    config: &Config,
    log_group: &LogGroupRecord,
) -> Result<Correction> {
    let log_group_name = &log_group.name;

    if !config.is_managed(log_group_name) {
        debug!("Skipping {log_group_name} (filtered out)");
        return Ok(Correction::Skipped);
    }

    match decide(log_group.retention_in_days, config.default_retention_days) {
        Action::NoAction => {
            debug!(
                "Keeping {log_group_name} (retention {:?} <= {}d)",
                log_group.retention_in_days, config.default_retention_days
            );
            Ok(Correction::Kept)
        }
        Action::SetRetention(days) if config.dry_run => {
            info!(
                "Would set retention of {log_group_name} to {days}d (Dry-Run, currently {:?})",
                log_group.retention_in_days
            );
            Ok(Correction::DryRun(days))
        }
        Action::SetRetention(days) => {
            info!(
                "Setting retention of {log_group_name} to {days}d (currently {:?})",
                log_group.retention_in_days
            );
            provider
                .put_retention_policy(log_group_name, days)
                .await
                .map_err(|source| RetentionError::CorrectionFailure {
                    log_group_name: log_group_name.clone(),
                    source,
                })?;
            Ok(Correction::Applied(days))
        }
    }
}

/// Pages through every log group known to `provider`, capping retention on each one the policy
/// flags. A failed correction is recorded in the report and the sweep moves on; a failed listing
/// call ends the sweep.
pub async fn sweep(provider: &impl LogGroupProvider, config: &Config) -> Result<SweepReport> {
    let start_time = Instant::now();
    let mut report = SweepReport::default();
    let mut next_token = None;
    let mut page_count = 0;

    loop {
        let page = provider
            .list_log_groups(next_token)
            .await
            .map_err(RetentionError::EnumerationFailure)?;

        page_count += 1;
        debug!(
            "Reconciling {} log group(s) from page {page_count}",
            page.log_groups.len()
        );

        for log_group in &page.log_groups {
            report.examined += 1;

            match reconcile_log_group(provider, config, log_group).await {
                Ok(Correction::Skipped) => report.skipped += 1,
                Ok(Correction::Kept) => {}
                Ok(Correction::Applied(_) | Correction::DryRun(_)) => {
                    report.corrected.push(log_group.name.clone())
                }
                Err(RetentionError::CorrectionFailure {
                    log_group_name,
                    source,
                }) => {
                    warn!("Failed to set retention of {log_group_name}: {source:#}");
                    report.failures.push(CorrectionFailure {
                        log_group_name,
                        retention_in_days: config.default_retention_days,
                        error: source,
                    });
                }
                Err(e) => return Err(e),
            }
        }

        next_token = page.next_token;
        if next_token.is_none() {
            break;
        }
    }

    info!(
        "Sweep completed: examined {} log group(s) across {page_count} page(s), {} {}, {} skipped, {} failed in {:.2}s",
        report.examined,
        report.corrected.len(),
        if config.dry_run {
            "would be corrected (Dry-Run)"
        } else {
            "corrected"
        },
        report.skipped,
        report.failures.len(),
        start_time.elapsed().as_secs_f64()
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::fake::FakeProvider;
    use proptest::prelude::*;

    fn group(name: &str, retention_in_days: Option<i32>) -> LogGroupRecord {
        LogGroupRecord::new(name, retention_in_days)
    }

    fn sorted(mut calls: Vec<(String, i32)>) -> Vec<(String, i32)> {
        calls.sort();
        calls
    }

    #[tokio::test]
    async fn caps_unset_and_long_retention() {
        let provider = FakeProvider::with_groups(vec![
            group("a", None),
            group("b", Some(30)),
            group("c", Some(400)),
        ]);
        let config = Config::new(365).unwrap();

        let report = sweep(&provider, &config).await.unwrap();

        assert_eq!(
            provider.calls(),
            vec![("a".to_string(), 365), ("c".to_string(), 365)]
        );
        assert_eq!(report.examined, 3);
        assert_eq!(report.corrected, vec!["a", "c"]);
        assert!(report.failures.is_empty());
        assert!(report.ensure_success().is_ok());
    }

    #[tokio::test]
    async fn empty_listing_makes_no_calls() {
        let provider = FakeProvider::with_pages(vec![]);
        let report = sweep(&provider, &Config::default()).await.unwrap();

        assert!(provider.calls().is_empty());
        assert_eq!(provider.list_calls(), 1);
        assert_eq!(report.examined, 0);
    }

    #[tokio::test]
    async fn walks_every_page() {
        let provider = FakeProvider::with_pages(vec![
            vec![group("a", None), group("b", Some(731))],
            vec![],
            vec![group("c", Some(3653)), group("d", Some(1))],
        ]);

        let report = sweep(&provider, &Config::default()).await.unwrap();

        assert_eq!(provider.list_calls(), 3);
        assert_eq!(report.examined, 4);
        assert_eq!(
            provider.calls(),
            vec![
                ("a".to_string(), 365),
                ("b".to_string(), 365),
                ("c".to_string(), 365)
            ]
        );
    }

    #[tokio::test]
    async fn continues_after_a_failed_correction() {
        let provider = FakeProvider::with_pages(vec![
            vec![group("a", None), group("broken", None)],
            vec![group("c", Some(400))],
        ])
        .failing_on("broken");

        let report = sweep(&provider, &Config::default()).await.unwrap();

        assert_eq!(
            provider.calls(),
            vec![
                ("a".to_string(), 365),
                ("broken".to_string(), 365),
                ("c".to_string(), 365)
            ]
        );
        assert_eq!(report.corrected, vec!["a", "c"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].log_group_name, "broken");

        match report.ensure_success() {
            Err(RetentionError::CorrectionFailures { failed, total }) => {
                assert_eq!((failed, total), (1, 3));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn listing_failure_aborts_without_rollback() {
        let provider = FakeProvider::with_pages(vec![
            vec![group("a", None)],
            vec![group("b", None)],
        ])
        .failing_page(1);

        let err = sweep(&provider, &Config::default()).await.unwrap_err();

        assert!(matches!(err, RetentionError::EnumerationFailure(_)));
        assert_eq!(provider.calls(), vec![("a".to_string(), 365)]);
    }

    #[tokio::test]
    async fn dry_run_makes_no_calls() {
        let provider = FakeProvider::with_groups(vec![group("a", None), group("b", Some(30))]);
        let config = Config::default().with_dry_run(true);

        let report = sweep(&provider, &config).await.unwrap();

        assert!(provider.calls().is_empty());
        assert_eq!(report.corrected, vec!["a"]);
    }

    #[tokio::test]
    async fn honours_include_and_exclude_patterns() {
        let provider = FakeProvider::with_groups(vec![
            group("/aws/lambda/api", None),
            group("/aws/lambda/audit-keep", None),
            group("/ecs/web", None),
        ]);
        let config = Config::default()
            .with_include_pattern(Some("^/aws/lambda/"))
            .unwrap()
            .with_exclude_pattern(Some("-keep$"))
            .unwrap();

        let report = sweep(&provider, &config).await.unwrap();

        assert_eq!(provider.calls(), vec![("/aws/lambda/api".to_string(), 365)]);
        assert_eq!(report.skipped, 2);
    }

    #[tokio::test]
    async fn second_sweep_is_a_no_op() {
        let groups = vec![group("a", None), group("b", Some(30)), group("c", Some(400))];
        let config = Config::default();

        let first = FakeProvider::with_groups(groups.clone());
        sweep(&first, &config).await.unwrap();

        let corrected = groups
            .into_iter()
            .map(|g| {
                let applied = first.calls().iter().any(|(name, _)| *name == g.name);
                if applied {
                    group(&g.name, Some(config.default_retention_days))
                } else {
                    g
                }
            })
            .collect();

        let second = FakeProvider::with_groups(corrected);
        let report = sweep(&second, &config).await.unwrap();

        assert!(second.calls().is_empty());
        assert!(report.corrected.is_empty());
    }

    fn run_sweep(groups: Vec<LogGroupRecord>, page_size: usize) -> Vec<(String, i32)> {
        let pages = groups.chunks(page_size.max(1)).map(<[_]>::to_vec).collect();
        let provider = FakeProvider::with_pages(pages).failing_on("g0");

        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(sweep(&provider, &Config::default()))
            .unwrap();

        provider.calls()
    }

    fn named_groups() -> impl Strategy<Value = Vec<LogGroupRecord>> {
        proptest::collection::vec(proptest::option::of(1i32..=3653), 0..40).prop_map(|retentions| {
            retentions
                .into_iter()
                .enumerate()
                .map(|(i, r)| group(&format!("g{i}"), r))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn order_and_paging_do_not_change_corrections(
            (groups, shuffled) in named_groups()
                .prop_flat_map(|groups| (Just(groups.clone()), Just(groups).prop_shuffle())),
            page_size in 1usize..10,
        ) {
            let expected: Vec<_> = groups
                .iter()
                .filter(|g| g.retention_in_days.is_none_or(|d| d > 365))
                .map(|g| (g.name.clone(), 365))
                .collect();

            prop_assert_eq!(sorted(run_sweep(groups, page_size)), sorted(expected.clone()));
            prop_assert_eq!(sorted(run_sweep(shuffled, 1)), sorted(expected));
        }
    }
}
