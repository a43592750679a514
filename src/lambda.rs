use lambda_runtime::{LambdaEvent, service_fn};
use log::info;
use log_retention_default::config::log_level_from_lookup;
use log_retention_default::{CloudWatchLogs, Config, Outcome, Trigger, dispatch, set_up_logger};
use serde_json::Value;
use std::error::Error;

type LambdaError = Box<dyn Error + Send + Sync + 'static>;

#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    let level = log_level_from_lookup(|key| std::env::var(key).ok(), log::LevelFilter::Debug)?;
    set_up_logger(module_path!(), level)?;

    let config = Config::from_env()?;
    info!("Loaded {config:?}");

    let provider = CloudWatchLogs::load(None).await;

    let func = service_fn(|event| function(event, &provider, &config));
    lambda_runtime::run(func).await?;
    Ok(())
}

async fn function(
    event: LambdaEvent<Value>,
    provider: &CloudWatchLogs,
    config: &Config,
) -> Result<Outcome, LambdaError> {
    info!("Received event: {}", event.payload);

    let trigger = Trigger::from_event(&event.payload)?;
    let outcome = dispatch(trigger, provider, config).await?;

    outcome.ensure_success()?;

    Ok(outcome)
}
