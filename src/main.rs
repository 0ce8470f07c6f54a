mod cli;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use cli::Cli;
use nfield_dl::download::{ensure_absent, HttpDownloader};
use nfield_dl::error::Error;
use nfield_dl::progress::Console;
use nfield_dl::service::NfieldConnection;
use nfield_dl::workflow::{Outcome, Workflow};
use reqwest::Client;

#[tokio::main]
async fn main() -> ExitCode {
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
    )
    .with_writer(std::io::stderr)
    .with_target(false)
    .init();

  let cli = Cli::parse();
  let request = match cli.job_request() {
    Ok(request) => request,
    Err(message) => Cli::command().error(ErrorKind::ArgumentConflict, message).exit(),
  };

  println!("Nfield survey data downloader v{}", env!("CARGO_PKG_VERSION"));

  // Checked before signing in as well, no point in a session if the file is in the way.
  if let Err(e) = ensure_absent(&cli.filename).await {
    return fail(e);
  }

  let client = Client::new();
  let connection = match NfieldConnection::sign_in(client.clone(), &cli.api_url, &cli.credentials()).await {
    Ok(connection) => Arc::new(connection),
    Err(e) => return fail(e),
  };

  let workflow = Workflow::new(
    connection.clone(),
    connection,
    Arc::new(HttpDownloader { client }),
    Duration::from_secs(cli.poll_interval),
    Arc::new(Console),
  );

  workflow.run(&request, &cli.filename).await.into()
}

fn fail(error: Error) -> ExitCode {
  eprintln!("{error}");
  Outcome::from(&error).into()
}
