use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("File already exists: {}", .0.display())]
  DestinationExists(PathBuf),
  #[error("Sign in failed: {0}")]
  SignIn(String),
  #[error("Creating the export job failed: {0}")]
  Submission(String),
  #[error("Checking the job status failed: {0}")]
  Polling(String),
  #[error("Downloading the survey data failed: {0}")]
  Transfer(String),
  #[error("Job {0} faulted")]
  JobFaulted(String),
  #[error("Job {0} was cancelled")]
  JobCancelled(String),
  #[error("Invalid job status: {0}")]
  InvalidJobStatus(String),
  #[error(transparent)]
  Io(#[from] std::io::Error),
  #[error(transparent)]
  Template(#[from] indicatif::style::TemplateError),
}
