use pipeline::{Pipeline, PipelineConfig, RunOutcome};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_tracing();

    let config = match PipelineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let pipeline = match Pipeline::from_config(config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "Failed to set up pipeline");
            return ExitCode::FAILURE;
        }
    };

    match pipeline.run().await {
        Ok(RunOutcome::Completed(report_path)) => {
            println!("{}", report_path.display());
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Stopped { step, error }) => {
            tracing::error!(step, error = %error, "Run stopped");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            ExitCode::FAILURE
        }
    }
}
