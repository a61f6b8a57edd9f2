use super::{JobHandle, JobService, JobStatus, Submission};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
enum MockSubmission<T> {
    Queued,
    Immediate(T),
    Fail(String),
}

/// Scripted [`JobService`] for tests and dry runs.
///
/// Every submission is answered the same way. Status queries consume the
/// scripted sequence in order, shared across jobs, and report `Pending` once
/// the script runs out.
#[derive(Clone)]
pub struct MockJobService<R, T> {
    submission: Arc<Mutex<MockSubmission<T>>>,
    statuses: Arc<Mutex<VecDeque<std::result::Result<JobStatus<T>, String>>>>,
    submitted: Arc<Mutex<Vec<R>>>,
    submit_count: Arc<Mutex<usize>>,
    status_count: Arc<Mutex<usize>>,
}

impl<R, T> MockJobService<R, T> {
    pub fn new() -> Self {
        Self {
            submission: Arc::new(Mutex::new(MockSubmission::Queued)),
            statuses: Arc::new(Mutex::new(VecDeque::new())),
            submitted: Arc::new(Mutex::new(Vec::new())),
            submit_count: Arc::new(Mutex::new(0)),
            status_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_immediate_result(self, result: T) -> Self {
        *self.submission.lock().unwrap() = MockSubmission::Immediate(result);
        self
    }

    pub fn with_submission_error(self, message: String) -> Self {
        *self.submission.lock().unwrap() = MockSubmission::Fail(message);
        self
    }

    pub fn with_status(self, status: JobStatus<T>) -> Self {
        self.statuses.lock().unwrap().push_back(Ok(status));
        self
    }

    pub fn with_transport_error(self, message: String) -> Self {
        self.statuses.lock().unwrap().push_back(Err(message));
        self
    }

    pub fn get_submit_count(&self) -> usize {
        *self.submit_count.lock().unwrap()
    }

    pub fn get_status_count(&self) -> usize {
        *self.status_count.lock().unwrap()
    }

    pub fn get_submitted(&self) -> Vec<R>
    where
        R: Clone,
    {
        self.submitted.lock().unwrap().clone()
    }
}

impl<R, T> Default for MockJobService<R, T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R, T> JobService for MockJobService<R, T>
where
    R: Clone + Send + Sync,
    T: Clone + Send,
{
    type Request = R;
    type Output = T;

    async fn submit(&self, request: &R) -> Result<Submission<T>> {
        let id = {
            let mut count = self.submit_count.lock().unwrap();
            *count += 1;
            *count
        };
        self.submitted.lock().unwrap().push(request.clone());

        match self.submission.lock().unwrap().clone() {
            MockSubmission::Queued => Ok(Submission::Queued(JobHandle::new(format!(
                "mock-job-{}",
                id
            )))),
            MockSubmission::Immediate(result) => Ok(Submission::Completed(result)),
            MockSubmission::Fail(message) => Err(Error::AiProvider(message)),
        }
    }

    async fn status(&self, _handle: &JobHandle) -> Result<JobStatus<T>> {
        *self.status_count.lock().unwrap() += 1;

        match self.statuses.lock().unwrap().pop_front() {
            Some(Ok(status)) => Ok(status),
            Some(Err(message)) => Err(Error::AiProvider(message)),
            None => Ok(JobStatus::Pending),
        }
    }
}
