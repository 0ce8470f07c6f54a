use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::download::{ensure_absent, ArtifactDownloader};
use crate::error::Error;
use crate::model::{JobRequest, JobStatus};
use crate::poller::StatusPoller;
use crate::progress::{Observer, ProgressHelper};
use crate::service::{BackgroundTaskService, SurveyDataService};

/// How a run ended. Each outcome has its own process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Downloaded,
    DestinationExists,
    JobFaulted,
    JobCancelled,
    Failed,
}

impl Outcome {
    pub fn code(self) -> u8 {
        match self {
            Outcome::Downloaded => 0,
            Outcome::Failed => 1,
            Outcome::JobFaulted => 2,
            Outcome::DestinationExists => 3,
            Outcome::JobCancelled => 255,
        }
    }
}

impl From<&Error> for Outcome {
    fn from(error: &Error) -> Self {
        match error {
            Error::DestinationExists(_) => Outcome::DestinationExists,
            Error::JobFaulted(_) => Outcome::JobFaulted,
            Error::JobCancelled(_) => Outcome::JobCancelled,
            _ => Outcome::Failed,
        }
    }
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        ExitCode::from(outcome.code())
    }
}

/// Submits one export job, waits for it and downloads its result.
pub struct Workflow {
    surveys: Arc<dyn SurveyDataService>,
    poller: StatusPoller,
    downloader: Arc<dyn ArtifactDownloader>,
    observer: Arc<dyn Observer>,
}

impl Workflow {
    pub fn new(
        surveys: Arc<dyn SurveyDataService>,
        tasks: Arc<dyn BackgroundTaskService>,
        downloader: Arc<dyn ArtifactDownloader>,
        poll_interval: Duration,
        observer: Arc<dyn Observer>,
    ) -> Workflow {
        Workflow { surveys, poller: StatusPoller::new(tasks, poll_interval), downloader, observer }
    }

    pub async fn run(&self, request: &JobRequest, destination: &Path) -> Outcome {
        match self.execute(request, destination).await {
            Ok(()) => {
                println!("Finished successfully");
                Outcome::Downloaded
            }
            Err(e) => {
                let outcome = Outcome::from(&e);
                error!(?outcome, "{e}");
                eprintln!("{e}");
                outcome
            }
        }
    }

    async fn execute(&self, request: &JobRequest, destination: &Path) -> Result<(), Error> {
        ensure_absent(destination).await?;

        let handle = self.surveys.submit(request).await?;
        println!("Submitted export job {handle} for survey {survey}", survey = request.survey_id);
        info!(job = %handle, survey = %request.survey_id, "export job submitted");

        let spinner = ProgressHelper::job_spinner(&handle)?;
        let result = self.poller.await_completion(&handle, &spinner, self.observer.as_ref()).await;
        let result = match result {
            Ok(result) => result,
            Err(e) => {
                spinner.abandon_with_message(format!("FAILURE – Could not check job with id {handle}."));
                return Err(e);
            }
        };

        match result.status {
            JobStatus::SuccessfullyCompleted => {
                spinner.finish_with_message(format!("Status: {} – job id: {handle}", result.status));
                let url = result.result_url.ok_or_else(|| {
                    Error::Transfer(format!("Job {handle} completed without a result url"))
                })?;

                println!("Downloading file: {url}");
                println!("Downloading to: {}", destination.display());
                let progress = ProgressHelper::download_bar(&handle)?;
                self.downloader
                    .download(&url, destination, &progress, self.observer.as_ref())
                    .await?;
                info!(job = %handle, destination = %destination.display(), "survey data downloaded");
                Ok(())
            }
            JobStatus::Faulted => {
                spinner.abandon_with_message(format!("Failure! Status: {} – job id: {handle}", result.status));
                Err(Error::JobFaulted(handle.to_string()))
            }
            JobStatus::Cancelled => {
                spinner.abandon_with_message(format!("Download cancelled. Status: {} – job id: {handle}", result.status));
                Err(Error::JobCancelled(handle.to_string()))
            }
            // Unreachable: await_completion only returns terminal statuses.
            status @ (JobStatus::Created | JobStatus::Running) => {
                Err(Error::Polling(format!("Job {handle} returned while still {status}")))
            }
        }
    }
}
