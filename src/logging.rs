use anyhow::Result;
use chrono::Utc;
use log::LevelFilter;

/// Routes this crate's log output to stdout at `level`, and everything else (mostly the AWS SDK) at
/// `Warn`. The caller's own module is logged at `level` too, so binaries can pass `module_path!()`.
pub fn set_up_logger(calling_module: &str, level: LevelFilter) -> Result<()> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}] {}",
                Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(LevelFilter::Warn)
        .level_for(crate::APP_NAME, level)
        .level_for(calling_module.to_string(), level)
        .chain(std::io::stdout())
        .apply()?;

    Ok(())
}
