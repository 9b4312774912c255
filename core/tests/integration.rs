//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives the typed client over
//! real HTTP through a ureq-backed [`Transport`]. Validates that request
//! building, paging, async polling and the operation envelope work against
//! the server's actual wire format.

use std::time::Duration;

use async_trait::async_trait;
use moysklad_core::{
    AsyncState, Client, ClientConfig, Credentials, Error, HttpMethod, HttpRequest, HttpResponse,
    Interval, Loss, LossPosition, LossTemplateArg, Meta, MetaType, Params, PollPolicy, Timestamp,
    Transport, TransportError,
};
use uuid::Uuid;

/// Executes requests with a blocking ureq agent on tokio's blocking pool.
///
/// Disables ureq's automatic status-code-as-error behavior so 4xx/5xx
/// responses are returned as data rather than `Err`, letting the client
/// handle status interpretation.
#[derive(Clone)]
struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn execute(agent: &ureq::Agent, req: HttpRequest) -> Result<HttpResponse, ureq::Error> {
    let url = req.url.as_str();
    let mut response = match (req.method, req.body) {
        (HttpMethod::Get, _) => with_headers(agent.get(url), &req.headers).call(),
        (HttpMethod::Delete, _) => with_headers(agent.delete(url), &req.headers).call(),
        (HttpMethod::Post, Some(body)) => {
            with_headers(agent.post(url), &req.headers).send(body.as_bytes())
        }
        (HttpMethod::Post, None) => with_headers(agent.post(url), &req.headers).send_empty(),
        (HttpMethod::Put, Some(body)) => {
            with_headers(agent.put(url), &req.headers).send(body.as_bytes())
        }
        (HttpMethod::Put, None) => with_headers(agent.put(url), &req.headers).send_empty(),
    }?;

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            let value = value.to_str().ok()?;
            Some((name.as_str().to_string(), value.to_string()))
        })
        .collect();
    let body = response.body_mut().read_to_string().unwrap_or_default();

    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}

#[async_trait]
impl Transport for UreqTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let agent = self.agent.clone();
        let response = tokio::task::spawn_blocking(move || execute(&agent, request)).await??;
        Ok(response)
    }
}

async fn start_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(mock_server::run(listener));
    format!("http://{addr}")
}

async fn client_with(page_size: u32) -> Client {
    let base = start_server().await;
    let config = ClientConfig::new(Credentials::token("integration"))
        .with_base_url(&base)
        .with_page_size(page_size)
        .with_poll_policy(PollPolicy::fixed(Duration::from_millis(10)));
    Client::new(config, UreqTransport::new())
}

async fn client() -> Client {
    client_with(1000).await
}

fn new_loss(client: &Client, description: &str) -> Loss {
    let base = client.base_url();
    Loss::new()
        .with_organization(Meta::entity(base, MetaType::Organization, Uuid::from_u128(3)))
        .with_store(Meta::entity(base, MetaType::Store, Uuid::from_u128(5)))
        .with_description(description)
}

fn product(client: &Client, n: u128) -> Meta {
    Meta::entity(client.base_url(), MetaType::Product, Uuid::from_u128(n))
}

#[tokio::test(flavor = "multi_thread")]
async fn loss_lifecycle() {
    let c = client().await;
    let losses = c.loss();

    // create with one position
    let input = new_loss(&c, "Порча")
        .with_positions(vec![LossPosition::new(product(&c, 9), 3.0).with_price(100.0)]);
    let created = losses.create(&input, None).await.unwrap();
    let id = created.id.unwrap();
    assert_eq!(created.sum, Some(300.0));
    assert_eq!(created.meta.as_ref().and_then(Meta::id), Some(id));
    assert_eq!(created.positions.as_ref().map(|p| p.size()), Some(1));

    // update
    let patch = Loss::new().with_description("Бой");
    let updated = losses.update(id, &patch, None).await.unwrap();
    assert_eq!(updated.description.as_deref(), Some("Бой"));
    assert_eq!(updated.store, created.store);

    // positions
    let added = losses
        .create_position(id, &LossPosition::new(product(&c, 10), 1.0).with_price(50.0))
        .await
        .unwrap();
    let position_id = added.id.unwrap();
    let page = losses.get_positions(id, None).await.unwrap();
    assert_eq!(page.size(), 2);
    assert_eq!(page.rows.len(), 2);

    let changed = losses
        .update_position(id, position_id, &LossPosition::default().with_reason("брак"), None)
        .await
        .unwrap();
    assert_eq!(changed.reason.as_deref(), Some("брак"));
    assert_eq!(changed.quantity, Some(1.0));

    let expanded = losses
        .get_by_id(id, Some(Params::new().expand("positions")))
        .await
        .unwrap();
    assert_eq!(expanded.sum, Some(350.0));
    assert_eq!(expanded.positions.map(|p| p.rows.len()), Some(2));

    assert!(losses.delete_position(id, position_id).await.unwrap());
    assert!(!losses.delete_position(id, position_id).await.unwrap());
    assert_eq!(losses.get_positions_all(id, None).await.unwrap().len(), 1);

    // delete
    assert!(losses.delete(id).await.unwrap());
    let err = losses.get_by_id(id, None).await.unwrap_err();
    assert!(err.is_not_found(), "{err}");
    assert_eq!(err.api_errors()[0].code, Some(1021));
    assert!(!losses.delete(id).await.unwrap());
}

#[tokio::test(flavor = "multi_thread")]
async fn create_without_store_is_rejected() {
    let c = client().await;
    let input = Loss::new().with_organization(Meta::entity(
        c.base_url(),
        MetaType::Organization,
        Uuid::from_u128(3),
    ));
    let err = c.loss().create(&input, None).await.unwrap_err();
    assert_eq!(err.status(), Some(412));
    assert_eq!(err.api_errors()[0].code, Some(3000));
}

#[tokio::test(flavor = "multi_thread")]
async fn list_all_walks_every_page() {
    let c = client_with(2).await;
    for n in 0..5 {
        c.loss().create(&new_loss(&c, &format!("loss {n}")), None).await.unwrap();
    }

    let first = c.loss().get_list(Some(Params::new().limit(2))).await.unwrap();
    assert_eq!(first.total(), 5);
    assert_eq!(first.rows.len(), 2);
    assert_eq!(first.next_offset(), Some(2));

    let all = c.loss().get_list_all(None).await.unwrap();
    let descriptions: Vec<String> = all.into_iter().filter_map(|l| l.description).collect();
    let expected: Vec<String> = (0..5).map(|n| format!("loss {n}")).collect();
    assert_eq!(descriptions, expected);

    let filtered = c
        .loss()
        .get_list(Some(Params::new().filter_equals("description", "loss 3")))
        .await
        .unwrap();
    assert_eq!(filtered.total(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn bulk_delete_reports_partial_failure() {
    let c = client().await;
    let a = c.loss().create(&new_loss(&c, "a"), None).await.unwrap();
    let b = c.loss().create(&new_loss(&c, "b"), None).await.unwrap();
    let missing = Uuid::from_u128(404);

    let report = c
        .loss()
        .delete_many(&[a.id.unwrap(), missing, b.id.unwrap()])
        .await
        .unwrap();
    assert_eq!(report.items().len(), 3);
    assert_eq!(report.success_count(), 2);
    assert!(!report.all_succeeded());
    let failures: Vec<usize> = report.failures().map(|(index, _)| index).collect();
    assert_eq!(failures, vec![1]);

    assert_eq!(c.loss().get_list(None).await.unwrap().total(), 0);
    assert!(c.loss().delete_many(&[]).await.unwrap().items().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn create_update_many_keeps_order() {
    let c = client().await;
    let existing = c.loss().create(&new_loss(&c, "old"), None).await.unwrap();

    let mut renamed = existing.clone();
    renamed.description = Some("renamed".to_string());
    let saved = c
        .loss()
        .create_update_many(&[renamed, new_loss(&c, "fresh")], None)
        .await
        .unwrap();
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[0].id, existing.id);
    assert_eq!(saved[0].description.as_deref(), Some("renamed"));
    assert_eq!(saved[1].description.as_deref(), Some("fresh"));
    assert_ne!(saved[1].id, existing.id);
}

#[tokio::test(flavor = "multi_thread")]
async fn metadata_template_and_sync_id() {
    let c = client().await;

    let metadata = c.loss().get_metadata().await.unwrap();
    assert_eq!(metadata.meta.kind, MetaType::Loss);
    assert_eq!(metadata.states.len(), 2);

    let sales_return = Meta::entity(c.base_url(), MetaType::SalesReturn, Uuid::from_u128(7));
    let based_on = LossTemplateArg {
        sales_return: Some(sales_return.clone().into()),
        inventory: None,
    };
    let draft = c.loss().template(&based_on).await.unwrap();
    assert_eq!(draft.sales_return.map(|r| r.meta), Some(sales_return));
    assert_eq!(draft.applicable, Some(true));

    let sync_id = Uuid::from_u128(0x5151);
    let mut input = new_loss(&c, "synced");
    input.sync_id = Some(sync_id);
    c.loss().create(&input, None).await.unwrap();
    let found = c.loss().get_by_sync_id(sync_id).await.unwrap();
    assert_eq!(found.description.as_deref(), Some("synced"));
    assert!(c.loss().delete_by_sync_id(sync_id).await.unwrap());
    assert!(!c.loss().delete_by_sync_id(sync_id).await.unwrap());

    let trashed = c.loss().create(&new_loss(&c, "trash"), None).await.unwrap();
    let id = trashed.id.unwrap();
    assert!(c.loss().remove(id).await.unwrap());
    assert!(!c.loss().remove(id).await.unwrap());
}

#[tokio::test(flavor = "multi_thread")]
async fn async_money_report_polls_to_completion() {
    let c = client().await;

    let mut job = c.report_money().get_money_async().await.unwrap();
    assert!(job.status_url().starts_with(c.base_url()));
    assert_eq!(job.result_url(), format!("{}/result", job.status_url()));
    let money = job.get().await.unwrap();
    assert_eq!(money.rows.len(), 2);
    assert_eq!(job.last_state(), Some(AsyncState::Done));

    let jobs = c.async_tasks().get_list(None).await.unwrap();
    assert_eq!(jobs.total(), 1);
    assert_eq!(jobs.rows[0].state, Some(AsyncState::Done));
}

#[tokio::test(flavor = "multi_thread")]
async fn async_plot_series_returns_series() {
    let c = client().await;
    let params = Params::new()
        .moment_from(Timestamp::parse("2024-01-01 00:00:00").unwrap())
        .moment_to(Timestamp::parse("2024-01-31 23:59:59").unwrap())
        .interval(Interval::Day);

    let mut job = c
        .report_money()
        .get_plot_series_async(Some(params.clone()))
        .await
        .unwrap();
    let series = job.get_timeout(Duration::from_secs(5)).await.unwrap();
    assert_eq!(series.series.len(), 2);
    assert_eq!(series.series[0].date, "2024-01-01 00:00:00.000");

    let sync = c.report_money().get_plot_series(Some(params)).await.unwrap();
    assert_eq!(sync.credit, series.credit);
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_async_report_fails_with_reason() {
    let c = client().await;

    let mut job = c.report_money().get_plot_series_async(None).await.unwrap();
    let err = job.get().await.unwrap_err();
    match err {
        Error::AsyncJobFailed { state, reason } => {
            assert_eq!(state, AsyncState::ApiError);
            assert!(reason.contains("[1035]"), "{reason}");
        }
        other => panic!("expected AsyncJobFailed, got {other:?}"),
    }

    let err = c.report_money().get_plot_series(None).await.unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_eq!(err.api_errors().len(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn cancelled_job_is_reported() {
    let c = client().await;

    let mut job = c.report_money().get_money_async().await.unwrap();
    job.cancel().await.unwrap();
    let err = job.get().await.unwrap_err();
    assert!(matches!(
        err,
        Error::AsyncJobFailed {
            state: AsyncState::Cancel,
            ..
        }
    ));

    let id = job.id().unwrap();
    let task = c.async_tasks().get_by_id(id).await.unwrap();
    assert_eq!(task.state, Some(AsyncState::Cancel));
    let err = c.async_tasks().cancel(id).await.unwrap_err();
    assert_eq!(err.status(), Some(400));
}

#[tokio::test(flavor = "multi_thread")]
async fn resumed_job_reads_result() {
    let c = client().await;

    let submitted = c.report_money().get_money_async().await.unwrap();
    let id = submitted.id().unwrap();
    drop(submitted);

    let mut resumed = c.async_tasks().resume::<moysklad_core::List<moysklad_core::Money>>(id);
    let money = resumed.get().await.unwrap();
    assert_eq!(money.total(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn payment_operations_narrow_by_kind() {
    let c = client().await;

    let payments = c.payment_in().get_list(None).await.unwrap();
    assert_eq!(payments.total(), 1);
    let id = payments.rows[0].id.unwrap();

    let payment = c.payment_in().get_by_id(id, None).await.unwrap();
    let operations = &payment.operations;
    assert_eq!(operations.len(), 4);

    let demands = operations.filter_demands();
    let addresses: Vec<&str> = demands
        .iter()
        .filter_map(|d| d.shipment_address.as_deref())
        .collect();
    assert_eq!(addresses, vec!["Казань, ул. Баумана, 7", "Самара, ул. Ленина, 1"]);

    let order = operations.as_slice()[0].as_customer_order().unwrap();
    assert_eq!(order.reserved_sum, Some(0.0));
    assert!(operations.as_slice()[0].as_demand().is_none());
    assert_eq!(operations.filter_invoices_out().len(), 1);
    assert!(operations.filter_supplies().is_empty());

    let linked: f64 = operations.iter().filter_map(|op| op.linked_sum).sum();
    assert_eq!(linked, 5500.0);
}

#[tokio::test(flavor = "multi_thread")]
async fn applications_list_and_get() {
    let c = client().await;

    let apps = c.application().get_list(None).await.unwrap();
    assert_eq!(apps.total(), 2);
    let id = apps.rows[1].id.unwrap();
    let app = c.application().get_by_id(id, None).await.unwrap();
    assert_eq!(app.name.as_deref(), Some("Телефония"));
    assert!(app.app_uid.is_some());

    let err = c
        .application()
        .get_by_id(Uuid::from_u128(1), None)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}
