use std::process::ExitCode;

use api_compat_lib::config::CompatConfig;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    api_compat_lib::logging::init();

    let config = match CompatConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::from(2);
        }
    };

    match api_compat_lib::run(&config).await {
        Ok(outcome) => ExitCode::from(outcome.exit_code() as u8),
        Err(e) => {
            tracing::error!(error = %e, "run aborted");
            ExitCode::from(2)
        }
    }
}
