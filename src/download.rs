use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;
use futures::StreamExt;
use indicatif::ProgressBar;
use reqwest::Client;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::Error;
use crate::progress::{percent_complete, Observer};

/// Transfers a finished export to local disk. Never overwrites an existing file.
#[async_trait]
pub trait ArtifactDownloader: Send + Sync {
    async fn download(
        &self,
        url: &str,
        destination: &Path,
        progress: &ProgressBar,
        observer: &dyn Observer,
    ) -> Result<(), Error>;
}

/// Fails with [`Error::DestinationExists`] if something is already at `destination`.
pub async fn ensure_absent(destination: &Path) -> Result<(), Error> {
    if fs::try_exists(destination).await? {
        Err(Error::DestinationExists(destination.to_path_buf()))
    } else {
        Ok(())
    }
}

pub struct HttpDownloader {
    pub client: Client,
}

#[async_trait]
impl ArtifactDownloader for HttpDownloader {
    async fn download(
        &self,
        url: &str,
        destination: &Path,
        progress: &ProgressBar,
        observer: &dyn Observer,
    ) -> Result<(), Error> {
        ensure_absent(destination).await?;

        let mut out = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(destination)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => Error::DestinationExists(destination.to_path_buf()),
                _ => Error::Transfer(format!("Cannot create {}: {e}", destination.display())),
            })?;

        match self.transfer(url, &mut out, progress, observer).await {
            Ok(()) => Ok(()),
            Err(e) => {
                drop(out);
                // The file did not exist before this call, so it is ours to remove.
                if let Err(remove_error) = fs::remove_file(destination).await {
                    warn!("Could not remove partial download {}: {remove_error}", destination.display());
                }
                progress.abandon();
                Err(e)
            }
        }
    }
}

impl HttpDownloader {
    async fn transfer(
        &self,
        url: &str,
        out: &mut File,
        progress: &ProgressBar,
        observer: &dyn Observer,
    ) -> Result<(), Error> {
        debug!("GET {url}");
        let response = self.client.get(url).send().await.map_err(transfer_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transfer(format!(
                "Something went wrong downloading the survey data. Try to download at: {url}. Status code: {status}. Body: {body}",
                body = response.text().await.unwrap_or_default()
            )));
        }

        let total = response.content_length();
        if let Some(total) = total {
            progress.set_length(total);
        }

        let mut downloaded = 0u64;
        let mut last_percent = None;
        let mut chunks = response.bytes_stream();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(transfer_error)?;
            out.write_all(&chunk).await.map_err(transfer_error)?;
            downloaded += chunk.len() as u64;
            progress.set_position(downloaded);

            // 100 is only reported once the transfer is known to be complete.
            if let Some(total) = total {
                let percent = percent_complete(downloaded, total);
                if percent < 100 && last_percent != Some(percent) {
                    observer.downloaded(percent);
                    last_percent = Some(percent);
                }
            }
        }

        if let Some(total) = total {
            if downloaded < total {
                return Err(Error::Transfer(format!(
                    "The transfer ended after {downloaded} of {total} bytes"
                )));
            }
        }

        out.flush().await.map_err(transfer_error)?;
        out.sync_all().await.map_err(transfer_error)?;
        if total.is_none() {
            progress.set_length(downloaded);
        }
        progress.finish();
        observer.downloaded(100);
        debug!("Downloaded {downloaded} bytes from {url}");
        Ok(())
    }
}

fn transfer_error(error: impl std::fmt::Display) -> Error {
    Error::Transfer(error.to_string())
}
