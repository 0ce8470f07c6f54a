use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::Parser;
use nfield_dl::model::{Credentials, JobRequest};
use nfield_dl::service::NFIELD_URL;

/// Exporting the data of an Nfield survey (interviews, answers, media, para data) and downloading
/// the resulting archive once the export job finished.
#[derive(Parser)]
#[clap(version)]
pub(crate) struct Cli {
  /// The Nfield API user name.
  #[clap(long, env = "NFIELD_USER")]
  pub(crate) user: String,
  /// The password of the Nfield API user.
  #[clap(long, env = "NFIELD_PASSWORD", hide_env_values = true)]
  pub(crate) password: String,
  /// The Nfield domain the user signs in to.
  #[clap(long, env = "NFIELD_DOMAIN", default_value = "Kantar Polska")]
  pub(crate) domain: String,
  /// Base url of the Nfield API.
  #[clap(long, env = "NFIELD_API_URL", default_value = NFIELD_URL)]
  pub(crate) api_url: String,
  /// The id of the survey to export (e.g. `da96674b-dd83-4656-8305-11fc28f0b206`).
  #[clap(long)]
  pub(crate) survey_id: String,
  #[clap(long, default_value_t = true, action = clap::ArgAction::Set)]
  pub(crate) successful_live_interview_data: bool,
  #[clap(long, default_value_t = false, action = clap::ArgAction::Set)]
  pub(crate) not_successful_live_interview_data: bool,
  #[clap(long, default_value_t = true, action = clap::ArgAction::Set)]
  pub(crate) open_answer_data: bool,
  #[clap(long, default_value_t = true, action = clap::ArgAction::Set)]
  pub(crate) closed_answer_data: bool,
  #[clap(long, default_value_t = false, action = clap::ArgAction::Set)]
  pub(crate) suspended_live_interview_data: bool,
  #[clap(long, default_value_t = true, action = clap::ArgAction::Set)]
  pub(crate) captured_media: bool,
  #[clap(long, default_value_t = true, action = clap::ArgAction::Set)]
  pub(crate) para_data: bool,
  #[clap(long, default_value_t = false, action = clap::ArgAction::Set)]
  pub(crate) test_interview_data: bool,
  /// The file the archive is downloaded to. It must not exist yet.
  #[clap(long, default_value = "NfieldDownloadFileName.zip")]
  pub(crate) filename: PathBuf,
  /// UTC start of the exported period, e.g. `2019-09-01T00:00:00Z`. All data gets exported when
  /// no date is given.
  #[clap(long, value_parser = parse_utc)]
  pub(crate) start_date: Option<DateTime<Utc>>,
  /// UTC end of the exported period, e.g. `2019-12-31T23:59:59Z`.
  #[clap(long, value_parser = parse_utc)]
  pub(crate) end_date: Option<DateTime<Utc>>,
  /// Seconds to wait between two job status checks.
  #[clap(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
  pub(crate) poll_interval: u64,
}

impl Cli {
  pub(crate) fn job_request(&self) -> Result<JobRequest, String> {
    if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
      if start > end {
        return Err(format!("The start date {start} lies after the end date {end}"));
      }
    }

    Ok(JobRequest {
      survey_id: self.survey_id.clone(),
      download_successful_live_interview_data: self.successful_live_interview_data,
      download_not_successful_live_interview_data: self.not_successful_live_interview_data,
      download_open_answer_data: self.open_answer_data,
      download_closed_answer_data: self.closed_answer_data,
      download_suspended_live_interview_data: self.suspended_live_interview_data,
      download_captured_media: self.captured_media,
      download_para_data: self.para_data,
      download_test_interview_data: self.test_interview_data,
      download_file_name: file_stem(&self.filename),
      start_date: self.start_date,
      end_date: self.end_date,
    })
  }

  pub(crate) fn credentials(&self) -> Credentials {
    Credentials {
      domain: self.domain.clone(),
      username: self.user.clone(),
      password: self.password.clone(),
    }
  }
}

fn parse_utc(value: &str) -> Result<DateTime<Utc>, String> {
  DateTime::parse_from_rfc3339(value)
    .map(|date| date.with_timezone(&Utc))
    .map_err(|e| format!("`{value}` is not a UTC date like 2019-09-01T00:00:00Z: {e}"))
}

fn file_stem(path: &Path) -> String {
  path
    .file_stem()
    .map(|stem| stem.to_string_lossy().into_owned())
    .unwrap_or_default()
}
