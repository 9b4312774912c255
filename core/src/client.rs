//! Entry point: configuration plus a shared transport.
//!
//! # Design
//! `Client` holds only immutable configuration and an `Arc<dyn Transport>`,
//! so clones are cheap and concurrent calls share nothing mutable. Request
//! construction (`build_request`) is pure; `execute` is the single place
//! where the transport is called.

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::application::Application;
use crate::async_result::AsyncService;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::loss::Loss;
use crate::params::Params;
use crate::payment::{PaymentIn, PaymentOut};
use crate::report_money::ReportMoneyService;
use crate::request::RequestBuilder;
use crate::service::{Entity, EntityService};

const ACCEPT: &str = "application/json;charset=utf-8";

#[derive(Clone)]
pub struct Client {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
}

impl Client {
    pub fn new(config: ClientConfig, transport: impl Transport + 'static) -> Self {
        Self::with_shared_transport(config, Arc::new(transport))
    }

    pub fn with_shared_transport(mut config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        Self {
            config: Arc::new(config),
            transport,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Resolves `path` against the base URL and appends `params`.
    ///
    /// Absolute URLs (job descriptors, `nextHref`) are used as given.
    pub fn url(&self, path: &str, params: &Params) -> Result<String> {
        let mut url = if path.starts_with("http://") || path.starts_with("https://") {
            Url::parse(path)?
        } else {
            Url::parse(&format!("{}/{}", self.base_url(), path.trim_start_matches('/')))?
        };
        let query = params.to_query();
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url.to_string())
    }

    pub fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        params: &Params,
        body: Option<String>,
    ) -> Result<HttpRequest> {
        let mut headers = vec![
            ("accept".to_string(), ACCEPT.to_string()),
            ("user-agent".to_string(), self.config.user_agent.clone()),
        ];
        if let Some(credentials) = &self.config.credentials {
            headers.push(("authorization".to_string(), credentials.authorization()));
        }
        if body.is_some() {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }
        Ok(HttpRequest {
            method,
            url: self.url(path, params)?,
            headers,
            body,
        })
    }

    /// Sends `request` through the transport; the status is not inspected.
    #[tracing::instrument(level = "debug", skip_all, fields(method = request.method.as_str(), url = %request.url))]
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = self.transport.execute(request).await.map_err(|err| {
            tracing::warn!(error = %err, "transport failure");
            Error::Transport(err)
        })?;
        tracing::debug!(status = response.status, "response received");
        Ok(response)
    }

    /// Starts a request against `path` decoding into `T`.
    pub fn request<T>(&self, path: impl Into<String>) -> RequestBuilder<'_, T> {
        RequestBuilder::new(self, path.into())
    }

    pub fn entity<E: Entity>(&self) -> EntityService<'_, E> {
        EntityService::new(self)
    }

    pub fn loss(&self) -> EntityService<'_, Loss> {
        self.entity()
    }

    pub fn application(&self) -> EntityService<'_, Application> {
        self.entity()
    }

    pub fn payment_in(&self) -> EntityService<'_, PaymentIn> {
        self.entity()
    }

    pub fn payment_out(&self) -> EntityService<'_, PaymentOut> {
        self.entity()
    }

    pub fn report_money(&self) -> ReportMoneyService<'_> {
        ReportMoneyService::new(self)
    }

    pub fn async_tasks(&self) -> AsyncService<'_> {
        AsyncService::new(self)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::mock::MockTransport;

    fn client() -> Client {
        let config = ClientConfig::new(Credentials::token("secret-token"))
            .with_base_url("http://localhost:3000/");
        Client::new(config, MockTransport::new())
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let url = client().url("entity/loss", &Params::new()).unwrap();
        assert_eq!(url, "http://localhost:3000/entity/loss");
    }

    #[test]
    fn leading_slash_in_path_is_tolerated() {
        let url = client().url("/entity/loss", &Params::new()).unwrap();
        assert_eq!(url, "http://localhost:3000/entity/loss");
    }

    #[test]
    fn absolute_urls_are_kept() {
        let url = client()
            .url("https://api.moysklad.ru/api/remap/1.2/async/1", &Params::new())
            .unwrap();
        assert_eq!(url, "https://api.moysklad.ru/api/remap/1.2/async/1");
    }

    #[test]
    fn query_is_encoded() {
        let params = Params::new().limit(10).filter_equals("name", "a b;c");
        let url = client().url("entity/loss", &params).unwrap();
        let parsed = Url::parse(&url).unwrap();
        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("limit".to_string(), "10".to_string()),
                ("filter".to_string(), "name=a b;c".to_string()),
            ]
        );
    }

    #[test]
    fn build_request_sets_auth_and_content_type() {
        let req = client()
            .build_request(HttpMethod::Post, "entity/loss", &Params::new(), Some("{}".to_string()))
            .unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.header("authorization"), Some("Bearer secret-token"));
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("accept"), Some(ACCEPT));
    }

    #[test]
    fn build_request_without_body_has_no_content_type() {
        let req = client()
            .build_request(HttpMethod::Get, "entity/loss", &Params::new(), None)
            .unwrap();
        assert!(req.header("content-type").is_none());
        assert!(req.body.is_none());
    }

    #[test]
    fn anonymous_client_sends_no_authorization() {
        let client = Client::new(ClientConfig::default(), MockTransport::new());
        let req = client
            .build_request(HttpMethod::Get, "entity/loss", &Params::new(), None)
            .unwrap();
        assert!(req.header("authorization").is_none());
    }

    #[tokio::test]
    async fn transport_failures_surface_unchanged() {
        let transport = MockTransport::new();
        transport.push_transport_error("connection refused");
        let client = Client::new(ClientConfig::default(), transport);
        let req = client
            .build_request(HttpMethod::Get, "entity/loss", &Params::new(), None)
            .unwrap();
        let err = client.execute(req).await.unwrap_err();
        match err {
            Error::Transport(inner) => assert_eq!(inner.to_string(), "connection refused"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn debug_does_not_leak_token() {
        assert!(!format!("{:?}", client()).contains("secret-token"));
    }
}
