use async_trait::async_trait;
use http::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::error::Error;
use crate::model::{BackgroundTask, Credentials, JobHandle, JobRequest};

pub const NFIELD_URL: &str = "https://api.nfieldmr.com/v1/";

const AUTHENTICATION_TOKEN: &str = "X-AuthenticationToken";

/// Creates survey data export jobs.
#[async_trait]
pub trait SurveyDataService: Send + Sync {
    async fn submit(&self, request: &JobRequest) -> Result<JobHandle, Error>;
}

/// Reads the state of the background tasks of the signed in domain.
#[async_trait]
pub trait BackgroundTaskService: Send + Sync {
    async fn list_tasks(&self) -> Result<Vec<BackgroundTask>, Error>;
}

/// An authenticated session against the Nfield API.
pub struct NfieldConnection {
    client: Client,
    base_url: String,
    token: String,
}

impl NfieldConnection {
    pub async fn sign_in(
        client: Client,
        base_url: &str,
        credentials: &Credentials,
    ) -> Result<NfieldConnection, Error> {
        let base_url = normalize(base_url);
        debug!(domain = %credentials.domain, user = %credentials.username, "signing in to {base_url}");

        let sign_in = client
            .post(format!("{base_url}SignIn"))
            .json(credentials)
            .send()
            .await
            .map_err(|e| Error::SignIn(e.to_string()))?;

        match sign_in.status() {
            StatusCode::OK => {
                let token = sign_in
                    .headers()
                    .get(AUTHENTICATION_TOKEN)
                    .and_then(|token| token.to_str().ok())
                    .ok_or_else(|| {
                        Error::SignIn("The response did not contain an authentication token".to_string())
                    })?
                    .to_string();

                Ok(NfieldConnection { client, base_url, token })
            }
            status => Err(Error::SignIn(format!(
                "Signing in as {user} to domain {domain} was rejected with status {status}",
                user = credentials.username,
                domain = credentials.domain,
            ))),
        }
    }

    fn authorization(&self) -> String {
        format!("Basic {token}", token = self.token)
    }
}

#[async_trait]
impl SurveyDataService for NfieldConnection {
    async fn submit(&self, request: &JobRequest) -> Result<JobHandle, Error> {
        let url = format!(
            "{base_url}Surveys/{survey_id}/data",
            base_url = self.base_url,
            survey_id = request.survey_id
        );
        debug!("POST {url}");

        let submission = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.authorization())
            .json(request)
            .send()
            .await
            .map_err(|e| Error::Submission(e.to_string()))?;

        let status = submission.status();
        let body = submission.text().await.map_err(|e| Error::Submission(e.to_string()))?;

        if status.is_success() {
            serde_json::from_str::<JobHandle>(&body).map_err(|e| Error::Submission(e.to_string()))
        } else {
            Err(Error::Submission(format!(
                "Survey {survey_id} rejected the export job with status {status}: {body}",
                survey_id = request.survey_id
            )))
        }
    }
}

#[async_trait]
impl BackgroundTaskService for NfieldConnection {
    async fn list_tasks(&self) -> Result<Vec<BackgroundTask>, Error> {
        let url = format!("{base_url}BackgroundTasks", base_url = self.base_url);
        debug!("GET {url}");

        let listing = self
            .client
            .get(&url)
            .header(AUTHORIZATION, self.authorization())
            .send()
            .await
            .map_err(|e| Error::Polling(e.to_string()))?;

        match listing.status() {
            StatusCode::OK => {
                let body = listing.text().await.map_err(|e| Error::Polling(e.to_string()))?;
                serde_json::from_str::<Vec<BackgroundTask>>(&body).map_err(|e| Error::Polling(e.to_string()))
            }
            status => Err(Error::Polling(format!(
                "Listing the background tasks failed with status {status}: {body}",
                body = listing.text().await.unwrap_or_default()
            ))),
        }
    }
}

fn normalize(base_url: &str) -> String {
    if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{base_url}/")
    }
}
