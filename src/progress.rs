use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::error::Error;
use crate::model::{JobHandle, JobStatus};

/// Receives what a run observes while it waits on the service. Bars and spinners only draw on a
/// terminal; an observer sees every event.
pub trait Observer: Send + Sync {
  fn polling(&self, handle: &JobHandle);
  /// A non-terminal status, reported before waiting `next_check` for the next query.
  fn status(&self, handle: &JobHandle, status: JobStatus, next_check: Duration);
  /// Whole percent of the artifact written so far. Rises monotonically and ends at 100.
  fn downloaded(&self, percent: u8);
}

/// Status lines on stdout.
pub struct Console;

impl Observer for Console {
  fn polling(&self, handle: &JobHandle) {
    println!("Polling status of job {handle}");
  }

  fn status(&self, _handle: &JobHandle, status: JobStatus, next_check: Duration) {
    println!("Status: {status}");
    println!("Waiting {}s...", next_check.as_secs());
  }

  fn downloaded(&self, percent: u8) {
    println!("Downloading: {percent}%");
  }
}

pub struct ProgressHelper;

impl ProgressHelper {
  pub fn job_spinner(handle: &JobHandle) -> Result<ProgressBar, Error> {
    let spinner = ProgressBar::new_spinner();
    spinner.enable_steady_tick(Duration::from_millis(250));
    spinner.set_style(
      ProgressStyle::default_spinner()
        .tick_strings(&["◐", "◓", "◑", "◒", "●"])
        .template("{spinner:.cyan} [{elapsed}] {msg}")?,
    );
    spinner.set_message(format!("Export job {handle} submitted"));
    Ok(spinner)
  }

  /// The length is unknown until the response headers arrive; the downloader sets it.
  pub fn download_bar(handle: &JobHandle) -> Result<ProgressBar, Error> {
    let bar = ProgressBar::new(0);
    bar.set_style(
      ProgressStyle::default_bar()
        .template("{msg}\n[{bar:40.cyan}] {percent:>3}% {bytes}/{total_bytes} ({bytes_per_sec})")?
        .progress_chars("■□ "),
    );
    bar.set_message(format!("Survey data of job {handle}"));
    Ok(bar)
  }
}

/// Whole percent of `done` out of `total`, clamped to 0..=100.
pub fn percent_complete(done: u64, total: u64) -> u8 {
  if total == 0 {
    return 100;
  }
  (done.min(total) * 100 / total) as u8
}
