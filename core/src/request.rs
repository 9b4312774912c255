//! Generic request builder.
//!
//! # Design
//! A `RequestBuilder<T>` names an endpoint, accumulates [`Params`] and
//! decodes the response body into `T`. Each call is split into a pure
//! `build` step producing an `HttpRequest` and a pure `parse` step consuming
//! an `HttpResponse`; the verb methods join the two around
//! [`Client::execute`]. Builders borrow the client and hold no state beyond
//! the call they describe.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::async_result::AsyncResult;
use crate::client::Client;
use crate::error::{Error, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::list::List;
use crate::params::Params;

/// A decoded body together with the response it came from.
#[derive(Debug, Clone)]
pub struct Response<T> {
    pub data: T,
    pub http: HttpResponse,
}

impl<T> Response<T> {
    pub fn into_data(self) -> T {
        self.data
    }

    pub fn status(&self) -> u16 {
        self.http.status
    }
}

pub struct RequestBuilder<'c, T> {
    client: &'c Client,
    path: String,
    params: Params,
    _target: PhantomData<fn() -> T>,
}

impl<'c, T> RequestBuilder<'c, T> {
    pub(crate) fn new(client: &'c Client, path: String) -> Self {
        Self {
            client,
            path,
            params: Params::new(),
            _target: PhantomData,
        }
    }

    /// Merges `params` over the ones set so far.
    pub fn params(mut self, params: Params) -> Self {
        self.params = std::mem::take(&mut self.params).merge(params);
        self
    }

    /// Merges optional `params`; `None` leaves the builder unchanged.
    pub fn maybe_params(self, params: Option<Params>) -> Self {
        match params {
            Some(params) => self.params(params),
            None => self,
        }
    }

    /// Applies a modifier to the current params.
    pub fn with(mut self, modify: impl FnOnce(Params) -> Params) -> Self {
        self.params = modify(std::mem::take(&mut self.params));
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn current_params(&self) -> &Params {
        &self.params
    }

    pub fn build(&self, method: HttpMethod, body: Option<String>) -> Result<HttpRequest> {
        self.client.build_request(method, &self.path, &self.params, body)
    }

    /// Sends a `DELETE`; succeeds on any 2xx.
    pub async fn delete(self) -> Result<HttpResponse> {
        let request = self.build(HttpMethod::Delete, None)?;
        let response = self.client.execute(request).await?;
        check_status(&response)?;
        Ok(response)
    }

    /// Sends the request and returns the raw response without checking the status.
    pub async fn send_raw(self, method: HttpMethod, body: Option<String>) -> Result<HttpResponse> {
        let request = self.build(method, body)?;
        self.client.execute(request).await
    }
}

impl<'c, T: DeserializeOwned> RequestBuilder<'c, T> {
    pub fn parse(&self, response: HttpResponse) -> Result<Response<T>> {
        parse_response(response)
    }

    pub async fn get(self) -> Result<Response<T>> {
        self.send(HttpMethod::Get, None).await
    }

    pub async fn post<B: Serialize + ?Sized>(self, body: &B) -> Result<Response<T>> {
        let body = encode(body)?;
        self.send(HttpMethod::Post, Some(body)).await
    }

    pub async fn put<B: Serialize + ?Sized>(self, body: &B) -> Result<Response<T>> {
        let body = encode(body)?;
        self.send(HttpMethod::Put, Some(body)).await
    }

    /// Submits the `GET` as an asynchronous job.
    ///
    /// The server answers at once with a job descriptor; the payload is
    /// fetched later through the returned handle.
    pub async fn get_async(self) -> Result<AsyncResult<T>> {
        let client = self.client;
        let request = self.with(Params::with_async).build(HttpMethod::Get, None)?;
        tracing::debug!(url = %request.url, "submitting async job");
        let response = client.execute(request).await?;
        AsyncResult::from_submit(client.clone(), &response)
    }

    async fn send(self, method: HttpMethod, body: Option<String>) -> Result<Response<T>> {
        let request = self.build(method, body)?;
        let response = self.client.execute(request).await?;
        parse_response(response)
    }
}

impl<'c, R: DeserializeOwned> RequestBuilder<'c, List<R>> {
    /// Fetches every page with contiguous offsets and concatenates the rows.
    ///
    /// The page size is the `limit` set on the builder, or the client's
    /// configured page size.
    pub async fn get_all(self) -> Result<Vec<R>> {
        let page_size = self.params.limit.unwrap_or(self.client.config().page_size);
        let mut offset = self.params.offset.unwrap_or(0);
        let mut rows = Vec::new();
        loop {
            let params = self.params.clone().limit(page_size).offset(offset);
            let request = self
                .client
                .build_request(HttpMethod::Get, &self.path, &params, None)?;
            let page: List<R> = parse_response(self.client.execute(request).await?)?.data;
            let fetched = page.rows.len() as u64;
            let total = page.total();
            rows.extend(page.rows);
            offset += fetched;
            tracing::debug!(path = %self.path, offset, total, "fetched page");
            if fetched == 0 || offset >= total {
                break;
            }
        }
        Ok(rows)
    }
}

/// Maps a non-2xx status to `Error::Api`.
pub(crate) fn check_status(response: &HttpResponse) -> Result<()> {
    if response.is_success() {
        return Ok(());
    }
    Err(Error::from_status(response.status, response.body.clone()))
}

pub(crate) fn parse_response<T: DeserializeOwned>(response: HttpResponse) -> Result<Response<T>> {
    check_status(&response)?;
    let data = decode(&response.body)?;
    Ok(Response {
        data,
        http: response,
    })
}

pub(crate) fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|source| Error::Decode {
        source,
        body: body.to_string(),
    })
}

pub(crate) fn encode<B: Serialize + ?Sized>(body: &B) -> Result<String> {
    serde_json::to_string(body).map_err(Error::Encode)
}
