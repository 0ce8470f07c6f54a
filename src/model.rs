use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::Error;
use crate::error::Error::InvalidJobStatus;

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Export request for the data of one survey. Serialized the way the Nfield API expects it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobRequest {
    pub survey_id: String,
    pub download_successful_live_interview_data: bool,
    pub download_not_successful_live_interview_data: bool,
    pub download_open_answer_data: bool,
    pub download_closed_answer_data: bool,
    pub download_suspended_live_interview_data: bool,
    pub download_captured_media: bool,
    pub download_para_data: bool,
    pub download_test_interview_data: bool,
    /// Name of the produced archive without its extension.
    pub download_file_name: String,
    #[serde(serialize_with = "serialize_date")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(serialize_with = "serialize_date")]
    pub end_date: Option<DateTime<Utc>>,
}

impl JobRequest {
    /// A request for the categories the Nfield UI exports by default.
    pub fn new(survey_id: &str, download_file_name: &str) -> JobRequest {
        JobRequest {
            survey_id: survey_id.to_string(),
            download_successful_live_interview_data: true,
            download_not_successful_live_interview_data: false,
            download_open_answer_data: true,
            download_closed_answer_data: true,
            download_suspended_live_interview_data: false,
            download_captured_media: true,
            download_para_data: true,
            download_test_interview_data: false,
            download_file_name: download_file_name.to_string(),
            start_date: None,
            end_date: None,
        }
    }
}

fn serialize_date<S: Serializer>(
    date: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match date {
        Some(date) => serializer.collect_str(&date.format(DATE_FORMAT)),
        None => serializer.serialize_none(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle {
    #[serde(rename = "Id")]
    pub(crate) id: String,
}

impl JobHandle {
    pub fn new(id: impl Into<String>) -> JobHandle {
        JobHandle { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Display for JobHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawJobStatus")]
pub enum JobStatus {
    Created,
    Running,
    Cancelled,
    Faulted,
    SuccessfullyCompleted,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Created | JobStatus::Running)
    }
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStatus::Created => "Created",
            JobStatus::Running => "Running",
            JobStatus::Cancelled => "Canceled",
            JobStatus::Faulted => "Faulted",
            JobStatus::SuccessfullyCompleted => "SuccessfullyCompleted",
        };
        f.write_str(name)
    }
}

impl FromStr for JobStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "Created" => Ok(JobStatus::Created),
            "Running" => Ok(JobStatus::Running),
            "Canceled" | "Cancelled" => Ok(JobStatus::Cancelled),
            "Faulted" => Ok(JobStatus::Faulted),
            "SuccessfullyCompleted" => Ok(JobStatus::SuccessfullyCompleted),
            invalid => Err(InvalidJobStatus(invalid.to_string())),
        }
    }
}

impl TryFrom<u8> for JobStatus {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self, Error> {
        match code {
            0 => Ok(JobStatus::Created),
            1 => Ok(JobStatus::Running),
            2 => Ok(JobStatus::Cancelled),
            3 => Ok(JobStatus::Faulted),
            4 => Ok(JobStatus::SuccessfullyCompleted),
            invalid => Err(InvalidJobStatus(invalid.to_string())),
        }
    }
}

/// The API reports statuses either by enum code or by name.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawJobStatus {
    Code(u8),
    Name(String),
}

impl TryFrom<RawJobStatus> for JobStatus {
    type Error = Error;

    fn try_from(raw: RawJobStatus) -> Result<Self, Error> {
        match raw {
            RawJobStatus::Code(code) => JobStatus::try_from(code),
            RawJobStatus::Name(name) => name.parse(),
        }
    }
}

/// One entry of the background task listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BackgroundTask {
    pub id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub result_url: Option<String>,
}

/// Terminal snapshot of a job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobResult {
    pub handle: JobHandle,
    pub status: JobStatus,
    pub result_url: Option<String>,
}

impl JobResult {
    pub(crate) fn from(handle: &JobHandle, task: BackgroundTask) -> JobResult {
        JobResult { handle: handle.clone(), status: task.status, result_url: task.result_url }
    }
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Credentials {
    pub domain: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("domain", &self.domain)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}
