use std::io::Write;

use review_queue::{GitHub, JsonSource, PrSource, fetch_pull_requests, parse_args};
use tracing_subscriber::EnvFilter;

/// Logs go to stderr so stdout carries only the list to post.
fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_logging();

    let request = match parse_args(std::env::args_os()) {
        Ok(request) => request,
        // clap exits 0 for --help/--version and 2 for usage errors.
        Err(err) => match err.downcast::<clap::Error>() {
            Ok(clap_err) => clap_err.exit(),
            Err(err) => return Err(err),
        },
    };

    let result = match &request.source {
        PrSource::Input(_) => fetch_pull_requests(&request, &JsonSource).await?,
        PrSource::Search(_) => fetch_pull_requests(&request, &GitHub).await?,
    };

    if let Some(output) = result.render(request.empty_message.as_deref()) {
        writeln!(std::io::stdout().lock(), "{output}")?;
    }

    Ok(())
}
