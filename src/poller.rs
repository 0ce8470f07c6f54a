use std::sync::Arc;
use std::time::Duration;

use indicatif::ProgressBar;
use tracing::{debug, info};

use crate::error::Error;
use crate::model::{JobHandle, JobResult};
use crate::progress::Observer;
use crate::service::BackgroundTaskService;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Waits for a background task to reach a terminal state, one listing per interval.
pub struct StatusPoller {
    tasks: Arc<dyn BackgroundTaskService>,
    interval: Duration,
}

impl StatusPoller {
    pub fn new(tasks: Arc<dyn BackgroundTaskService>, interval: Duration) -> StatusPoller {
        StatusPoller { tasks, interval }
    }

    pub async fn await_completion(
        &self,
        handle: &JobHandle,
        spinner: &ProgressBar,
        observer: &dyn Observer,
    ) -> Result<JobResult, Error> {
        observer.polling(handle);
        loop {
            let task = self
                .tasks
                .list_tasks()
                .await?
                .into_iter()
                .find(|task| task.id == handle.id)
                .ok_or_else(|| {
                    Error::Polling(format!("No background task with id {handle} in the task listing"))
                })?;

            if task.status.is_terminal() {
                info!(job = %handle, status = %task.status, "job reached terminal state");
                return Ok(JobResult::from(handle, task));
            }

            spinner.set_message(format!("Status: {status} – job id: {handle}", status = task.status));
            observer.status(handle, task.status, self.interval);
            debug!(job = %handle, status = %task.status, "waiting {:?}", self.interval);
            tokio::time::sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use indicatif::ProgressBar;
    use tokio::time::Instant;

    use crate::error::Error;
    use crate::model::{BackgroundTask, JobHandle, JobResult, JobStatus};
    use crate::poller::{StatusPoller, DEFAULT_POLL_INTERVAL};
    use crate::progress::recording::{Event, RecordingObserver};
    use crate::service::BackgroundTaskService;

    /// Answers each listing with the next scripted result and records when it was asked.
    struct ScriptedTasks {
        listings: Mutex<VecDeque<Result<Vec<BackgroundTask>, Error>>>,
        queried_at: Mutex<Vec<Instant>>,
    }

    impl ScriptedTasks {
        fn new(listings: Vec<Result<Vec<BackgroundTask>, Error>>) -> Arc<ScriptedTasks> {
            Arc::new(ScriptedTasks {
                listings: Mutex::new(listings.into()),
                queried_at: Mutex::new(vec![]),
            })
        }

        fn queried_at(&self) -> Vec<Instant> {
            self.queried_at.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BackgroundTaskService for ScriptedTasks {
        async fn list_tasks(&self) -> Result<Vec<BackgroundTask>, Error> {
            self.queried_at.lock().unwrap().push(Instant::now());
            self.listings.lock().unwrap().pop_front().expect("no more scripted listings")
        }
    }

    fn task(id: &str, status: JobStatus, result_url: Option<&str>) -> BackgroundTask {
        BackgroundTask { id: id.to_string(), status, result_url: result_url.map(String::from) }
    }

    fn listing(status: JobStatus) -> Result<Vec<BackgroundTask>, Error> {
        Ok(vec![task("other-job", JobStatus::Running, None), task("my-job", status, None)])
    }

    #[tokio::test(start_paused = true)]
    async fn given_job_completing_after_running_when_await_completion_then_four_queries_and_three_waits() {
        // Given
        let tasks = ScriptedTasks::new(vec![
            listing(JobStatus::Created),
            listing(JobStatus::Running),
            listing(JobStatus::Running),
            Ok(vec![task("my-job", JobStatus::SuccessfullyCompleted, Some("https://blob/export.zip"))]),
        ]);
        let poller = StatusPoller::new(tasks.clone(), DEFAULT_POLL_INTERVAL);
        let started = Instant::now();

        // When
        let result = poller
            .await_completion(&JobHandle::new("my-job"), &ProgressBar::hidden(), &RecordingObserver::default())
            .await
            .unwrap();

        // Then
        assert_eq!(
            result,
            JobResult {
                handle: JobHandle::new("my-job"),
                status: JobStatus::SuccessfullyCompleted,
                result_url: Some("https://blob/export.zip".to_string()),
            }
        );
        let queried_at = tasks.queried_at();
        assert_eq!(queried_at.len(), 4);
        let elapsed = started.elapsed();
        assert!(elapsed >= DEFAULT_POLL_INTERVAL * 3 && elapsed < DEFAULT_POLL_INTERVAL * 4);
        for pair in queried_at.windows(2) {
            assert!(pair[1] - pair[0] >= DEFAULT_POLL_INTERVAL);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn given_faulted_job_when_await_completion_then_give_faulted_result_without_waiting() {
        // Given
        let tasks = ScriptedTasks::new(vec![listing(JobStatus::Faulted)]);
        let poller = StatusPoller::new(tasks.clone(), DEFAULT_POLL_INTERVAL);
        let started = Instant::now();

        // When
        let result = poller
            .await_completion(&JobHandle::new("my-job"), &ProgressBar::hidden(), &RecordingObserver::default())
            .await
            .unwrap();

        // Then
        assert_eq!(result.status, JobStatus::Faulted);
        assert_eq!(tasks.queried_at().len(), 1);
        assert!(started.elapsed() < DEFAULT_POLL_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn given_custom_interval_when_await_completion_then_wait_that_interval() {
        // Given
        let interval = Duration::from_secs(30);
        let tasks = ScriptedTasks::new(vec![listing(JobStatus::Running), listing(JobStatus::Cancelled)]);
        let poller = StatusPoller::new(tasks.clone(), interval);
        let started = Instant::now();

        // When
        let result = poller
            .await_completion(&JobHandle::new("my-job"), &ProgressBar::hidden(), &RecordingObserver::default())
            .await
            .unwrap();

        // Then
        assert_eq!(result.status, JobStatus::Cancelled);
        let elapsed = started.elapsed();
        assert!(elapsed >= interval && elapsed < interval * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn given_job_vanishing_mid_poll_when_await_completion_then_polling_error() {
        // Given
        let tasks = ScriptedTasks::new(vec![
            listing(JobStatus::Running),
            Ok(vec![task("other-job", JobStatus::Running, None)]),
        ]);
        let poller = StatusPoller::new(tasks.clone(), DEFAULT_POLL_INTERVAL);

        // When
        let result = poller
            .await_completion(&JobHandle::new("my-job"), &ProgressBar::hidden(), &RecordingObserver::default())
            .await;

        // Then
        assert!(matches!(result, Err(Error::Polling(_))));
        assert_eq!(tasks.queried_at().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn given_unknown_handle_when_await_completion_then_polling_error() {
        // Given
        let tasks = ScriptedTasks::new(vec![Ok(vec![])]);
        let poller = StatusPoller::new(tasks.clone(), DEFAULT_POLL_INTERVAL);

        // When
        let result = poller
            .await_completion(&JobHandle::new("my-job"), &ProgressBar::hidden(), &RecordingObserver::default())
            .await;

        // Then
        assert!(matches!(result, Err(Error::Polling(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn given_failing_query_when_await_completion_then_error_propagates_without_retry() {
        // Given
        let tasks = ScriptedTasks::new(vec![
            listing(JobStatus::Running),
            Err(Error::Polling("connection reset".to_string())),
        ]);
        let poller = StatusPoller::new(tasks.clone(), DEFAULT_POLL_INTERVAL);

        // When
        let result = poller
            .await_completion(&JobHandle::new("my-job"), &ProgressBar::hidden(), &RecordingObserver::default())
            .await;

        // Then
        assert!(matches!(result, Err(Error::Polling(message)) if message == "connection reset"));
        assert_eq!(tasks.queried_at().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn given_running_job_when_await_completion_then_report_polling_and_every_open_status() {
        // Given
        let tasks = ScriptedTasks::new(vec![
            listing(JobStatus::Created),
            listing(JobStatus::Running),
            listing(JobStatus::SuccessfullyCompleted),
        ]);
        let poller = StatusPoller::new(tasks, DEFAULT_POLL_INTERVAL);
        let observer = RecordingObserver::default();

        // When
        poller
            .await_completion(&JobHandle::new("my-job"), &ProgressBar::hidden(), &observer)
            .await
            .unwrap();

        // Then
        assert_eq!(
            observer.events(),
            vec![
                Event::Polling("my-job".to_string()),
                Event::Status(JobStatus::Created, DEFAULT_POLL_INTERVAL),
                Event::Status(JobStatus::Running, DEFAULT_POLL_INTERVAL),
            ]
        );
    }
}
