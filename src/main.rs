use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use log::{LevelFilter, debug};
use log_retention_default::config::{
    DEFAULT_RETENTION_ENV, DRY_RUN_ENV, EXCLUDE_PATTERN_ENV, INCLUDE_PATTERN_ENV,
};
use log_retention_default::{CloudWatchLogs, Config, RetentionError, set_up_logger, sweep};
use std::collections::HashMap;

#[derive(Debug)]
struct Args {
    verbose: bool,
    region: String,
    config: Config,
}

fn command() -> Command {
    Command::new("log-retention-default")
        .version("0.1")
        .author("Jacob Luszcz")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Verbose mode. Outputs DEBUG and higher log messages."),
        )
        .arg(
            Arg::new("dryrun")
                .short('d')
                .long("dryrun")
                .alias("dry-run")
                .action(ArgAction::SetTrue)
                .help("Reports the log groups that would be changed without changing them. [env: dry_run]"),
        )
        .arg(
            Arg::new("region")
                .short('r')
                .long("region")
                .required(true)
                .env("AWS_REGION")
                .help("AWS region to enforce retention in."),
        )
        .arg(
            Arg::new("default-retention")
                .long("default-retention")
                .help("Retention (in days) to apply to log groups without one or with a longer one. Defaults to 365. [env: default_log_retention]"),
        )
        .arg(
            Arg::new("include")
                .long("include")
                .help("Only manage log groups whose name matches this regex. [env: include_pattern]"),
        )
        .arg(
            Arg::new("exclude")
                .long("exclude")
                .help("Never manage log groups whose name matches this regex. [env: exclude_pattern]"),
        )
}

/// Layers command-line flags over `env`, then parses both the way the lambda parses its environment.
fn config_from_matches(
    matches: &ArgMatches,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Config, RetentionError> {
    let mut flags = HashMap::new();
    if matches.get_flag("dryrun") {
        flags.insert(DRY_RUN_ENV, "true".to_string());
    }
    for (id, key) in [
        ("default-retention", DEFAULT_RETENTION_ENV),
        ("include", INCLUDE_PATTERN_ENV),
        ("exclude", EXCLUDE_PATTERN_ENV),
    ] {
        if let Some(value) = matches.get_one::<String>(id) {
            flags.insert(key, value.clone());
        }
    }

    Config::from_lookup(|key| flags.get(key).cloned().or_else(|| env(key)))
}

fn parse_args() -> Result<Args> {
    let matches = command().get_matches();
    let config = config_from_matches(&matches, |key| std::env::var(key).ok())?;

    Ok(Args {
        verbose: matches.get_flag("verbose"),
        region: matches
            .get_one::<String>("region")
            .cloned()
            .unwrap_or_default(),
        config,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args()?;
    set_up_logger(
        module_path!(),
        if args.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        },
    )?;
    debug!("{:?}", args);

    let provider = CloudWatchLogs::load(Some(args.region)).await;
    let report = sweep(&provider, &args.config).await?;
    report.ensure_success()?;

    Ok(())
}
