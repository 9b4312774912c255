//! Long-running server jobs: submit, poll, fetch.
//!
//! # Design
//! Submitting a request with `async=true` answers `202 Accepted` with two
//! headers: `Location` (job status) and `Content-Location` (result). An
//! [`AsyncResult`] keeps both URLs and the last-known job state. It never
//! spawns anything: every status check is one request issued from the
//! caller's task, and the waits between checks are `tokio::time::sleep`
//! calls. Dropping the future returned by [`AsyncResult::get`] stops polling.

use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::client::Client;
use crate::config::PollPolicy;
use crate::error::{ApiErrorDetail, Error, Result};
use crate::http::{HttpMethod, HttpResponse};
use crate::list::List;
use crate::meta::{Meta, MetaType, MetaTyper, MetaWrapper};
use crate::params::Params;
use crate::request::{check_status, Response};
use crate::types::Timestamp;

/// Server-side state of an async job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AsyncState {
    Pending,
    Processing,
    Done,
    Error,
    Cancel,
    ApiError,
}

impl AsyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AsyncState::Pending => "PENDING",
            AsyncState::Processing => "PROCESSING",
            AsyncState::Done => "DONE",
            AsyncState::Error => "ERROR",
            AsyncState::Cancel => "CANCEL",
            AsyncState::ApiError => "API_ERROR",
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, AsyncState::Error | AsyncState::Cancel | AsyncState::ApiError)
    }

    pub fn is_terminal(&self) -> bool {
        *self == AsyncState::Done || self.is_failed()
    }
}

impl fmt::Display for AsyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job descriptor returned by `async/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsyncTask {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<MetaWrapper>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<AsyncState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_date: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ApiErrorDetail>,
}

impl MetaTyper for AsyncTask {
    const META_TYPE: MetaType = MetaType::Async;
}

/// Handle to a submitted job whose payload decodes into `T`.
///
/// `check` and `get` take `&mut self`; the last-known state is readable
/// through `&self`.
pub struct AsyncResult<T> {
    client: Client,
    status_url: String,
    result_url: String,
    last: Option<AsyncTask>,
    _target: PhantomData<fn() -> T>,
}

impl<T> AsyncResult<T> {
    pub fn new(client: Client, status_url: String, result_url: String) -> Self {
        Self {
            client,
            status_url,
            result_url,
            last: None,
            _target: PhantomData,
        }
    }

    /// Reads the job descriptor headers of a submit response.
    pub fn from_submit(client: Client, response: &HttpResponse) -> Result<Self> {
        check_status(response)?;
        let status_url = response
            .header("location")
            .ok_or(Error::MissingHeader("Location"))?;
        let result_url = response
            .header("content-location")
            .ok_or(Error::MissingHeader("Content-Location"))?;
        Ok(Self::new(client, status_url.to_string(), result_url.to_string()))
    }

    pub fn status_url(&self) -> &str {
        &self.status_url
    }

    pub fn result_url(&self) -> &str {
        &self.result_url
    }

    pub fn id(&self) -> Option<Uuid> {
        self.status_url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .and_then(|last| last.parse().ok())
    }

    /// State seen by the most recent `check`, without a request.
    pub fn last_state(&self) -> Option<AsyncState> {
        self.last.as_ref().and_then(|task| task.state)
    }

    pub fn last_task(&self) -> Option<&AsyncTask> {
        self.last.as_ref()
    }

    /// Asks the server for the current job state.
    pub async fn check(&mut self) -> Result<AsyncState> {
        let task = self
            .client
            .request::<AsyncTask>(self.status_url.clone())
            .get()
            .await?
            .into_data();
        let state = task.state.unwrap_or(AsyncState::Pending);
        tracing::debug!(url = %self.status_url, %state, "checked async job");
        self.last = Some(task);
        Ok(state)
    }

    /// Asks the server to stop the job.
    pub async fn cancel(&self) -> Result<()> {
        self.client
            .request::<()>(format!("{}/cancel", self.status_url.trim_end_matches('/')))
            .send_raw(HttpMethod::Put, None)
            .await
            .and_then(|response| check_status(&response))
    }

    fn failure(&self, state: AsyncState) -> Error {
        let reported = self
            .last
            .as_ref()
            .map(|task| {
                task.errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ")
            })
            .unwrap_or_default();
        let reason = if reported.is_empty() {
            format!("job {} reported no reason", self.status_url)
        } else {
            reported
        };
        Error::AsyncJobFailed { state, reason }
    }
}

impl<T: DeserializeOwned> AsyncResult<T> {
    /// Waits for the job with the client's poll policy, then fetches the payload.
    pub async fn get(&mut self) -> Result<T> {
        let policy = self.client.config().poll.clone();
        self.get_with_policy(&policy).await
    }

    /// Waits for the job, sleeping per `policy` between checks.
    pub async fn get_with_policy(&mut self, policy: &PollPolicy) -> Result<T> {
        let mut attempt = 0;
        loop {
            let state = match self.last_state() {
                Some(state) if state.is_terminal() => state,
                _ => self.check().await?,
            };
            if state == AsyncState::Done {
                return self.fetch_result().await;
            }
            if state.is_failed() {
                return Err(self.failure(state));
            }
            let delay = policy.delay(attempt);
            tracing::debug!(url = %self.status_url, %state, ?delay, "async job not ready");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Like [`AsyncResult::get`], giving up with `Error::Timeout` after `deadline`.
    pub async fn get_timeout(&mut self, deadline: Duration) -> Result<T> {
        tokio::time::timeout(deadline, self.get())
            .await
            .map_err(|_| Error::Timeout(deadline))?
    }

    async fn fetch_result(&self) -> Result<T> {
        self.client
            .request::<T>(self.result_url.clone())
            .get()
            .await
            .map(Response::into_data)
    }
}

impl<T> fmt::Debug for AsyncResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncResult")
            .field("status_url", &self.status_url)
            .field("result_url", &self.result_url)
            .field("last_state", &self.last_state())
            .finish()
    }
}

/// Operations on the account's job list (`async`).
pub struct AsyncService<'c> {
    client: &'c Client,
}

impl<'c> AsyncService<'c> {
    pub(crate) fn new(client: &'c Client) -> Self {
        Self { client }
    }

    pub async fn get_list(&self, params: Option<Params>) -> Result<List<AsyncTask>> {
        self.client
            .request("async")
            .maybe_params(params)
            .get()
            .await
            .map(Response::into_data)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<AsyncTask> {
        self.client
            .request(format!("async/{id}"))
            .get()
            .await
            .map(Response::into_data)
    }

    pub async fn cancel(&self, id: Uuid) -> Result<()> {
        let response = self
            .client
            .request::<()>(format!("async/{id}/cancel"))
            .send_raw(HttpMethod::Put, None)
            .await?;
        check_status(&response)
    }

    /// Reattaches to a job submitted earlier, e.g. by another process.
    pub fn resume<T>(&self, id: Uuid) -> AsyncResult<T> {
        let base = self.client.base_url();
        AsyncResult::new(
            self.client.clone(),
            format!("{base}/async/{id}"),
            format!("{base}/async/{id}/result"),
        )
    }
}
