//! In-memory stand-in for the subset of the MoySklad API the client uses.
//!
//! Resources are kept as JSON objects. Hrefs are built from the request's
//! `Host` header so a client pointed at `http://127.0.0.1:<port>` gets links
//! it can follow. Async jobs advance one state per status check: `PENDING`
//! on submit, `PROCESSING` on the first check, finished on the second.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const ACCOUNT_ID: Uuid = Uuid::from_u128(0x12a8b923_692c_11e6_8a84_bae500000001);
pub const PAYMENT_IN_ID: Uuid = Uuid::from_u128(0x0d1f7a5e_3b8c_11ef_0a80_000000000a01);
pub const APPLICATION_IDS: [Uuid; 2] = [
    Uuid::from_u128(0xe6e4d4f0_0d72_11ee_0a80_0c6b00000001),
    Uuid::from_u128(0xe6e4d4f0_0d72_11ee_0a80_0c6b00000002),
];

/// Maximum and default `limit` of list endpoints.
pub const MAX_LIMIT: usize = 1000;
/// Status checks after which a job leaves `PROCESSING`.
pub const CHECKS_UNTIL_FINISHED: u32 = 2;

const DEFAULT_BASE: &str = "http://localhost:3000";
const MEDIA_TYPE: &str = "application/json";
const NOW: &str = "2024-06-12 15:18:46.521";

struct LossRecord {
    id: Uuid,
    body: Map<String, Value>,
    positions: Vec<Map<String, Value>>,
}

#[derive(Clone, Copy, PartialEq)]
enum Report {
    MoneyByAccount,
    MoneyPlotSeries,
}

struct Job {
    id: Uuid,
    report: Report,
    query: HashMap<String, String>,
    request: String,
    state: &'static str,
    checks: u32,
    errors: Vec<Value>,
}

#[derive(Default)]
pub struct Db {
    losses: Vec<LossRecord>,
    jobs: Vec<Job>,
    numbering: u32,
}

pub type SharedDb = Arc<RwLock<Db>>;

pub fn app() -> Router {
    let db: SharedDb = Arc::new(RwLock::new(Db::default()));
    Router::new()
        .route("/entity/loss", get(list_losses).post(create_losses))
        .route("/entity/loss/delete", post(delete_many_losses))
        .route("/entity/loss/metadata", get(loss_metadata))
        .route("/entity/loss/new", put(loss_template))
        .route(
            "/entity/loss/syncid/{sync_id}",
            get(get_loss_by_sync_id).delete(delete_loss_by_sync_id),
        )
        .route(
            "/entity/loss/{id}",
            get(get_loss).put(update_loss).delete(delete_loss),
        )
        .route("/entity/loss/{id}/trash", post(delete_loss))
        .route(
            "/entity/loss/{id}/positions",
            get(list_positions).post(create_positions),
        )
        .route(
            "/entity/loss/{id}/positions/{position_id}",
            get(get_position).put(update_position).delete(delete_position),
        )
        .route("/entity/application", get(list_applications))
        .route("/entity/application/{id}", get(get_application))
        .route("/entity/paymentin", get(list_payments_in))
        .route("/entity/paymentin/{id}", get(get_payment_in))
        .route("/report/money/byaccount", get(money_by_account))
        .route("/report/money/plotseries", get(money_plot_series))
        .route("/async", get(list_jobs))
        .route("/async/{id}", get(job_status))
        .route("/async/{id}/result", get(job_result))
        .route("/async/{id}/cancel", put(cancel_job))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

// ---------------------------------------------------------------------------
// Shared rendering
// ---------------------------------------------------------------------------

fn base_url(headers: &HeaderMap) -> String {
    headers
        .get(header::HOST)
        .and_then(|host| host.to_str().ok())
        .map(|host| format!("http://{host}"))
        .unwrap_or_else(|| DEFAULT_BASE.to_string())
}

fn meta(href: String, kind: &str) -> Value {
    json!({"href": href, "type": kind, "mediaType": MEDIA_TYPE})
}

fn entity_meta(base: &str, kind: &str, id: Uuid) -> Value {
    meta(format!("{base}/entity/{kind}/{id}"), kind)
}

fn context(base: &str) -> Value {
    json!({"employee": {"meta": meta(format!("{base}/context/employee"), "employee")}})
}

fn api_error(status: StatusCode, code: u32, message: &str) -> Response {
    (status, Json(json!({"errors": [{"error": message, "code": code}]}))).into_response()
}

fn not_found() -> Response {
    api_error(StatusCode::NOT_FOUND, 1021, "Объект не найден")
}

fn page(
    base: &str,
    path: &str,
    kind: &str,
    rows: Vec<Value>,
    query: &HashMap<String, String>,
) -> Response {
    let limit = query
        .get("limit")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(MAX_LIMIT);
    if limit == 0 || limit > MAX_LIMIT {
        return api_error(
            StatusCode::BAD_REQUEST,
            1000,
            "Параметр 'limit' должен быть в диапазоне от 1 до 1000",
        );
    }
    let offset = query
        .get("offset")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    let size = rows.len();
    let rows: Vec<Value> = rows.into_iter().skip(offset).take(limit).collect();
    let mut meta = meta(format!("{base}{path}"), kind);
    meta["size"] = json!(size);
    meta["limit"] = json!(limit);
    meta["offset"] = json!(offset);
    Json(json!({"context": context(base), "meta": meta, "rows": rows})).into_response()
}

/// Keeps rows matching every `field=value` predicate of the `filter` query.
fn apply_filter(rows: Vec<Value>, query: &HashMap<String, String>) -> Vec<Value> {
    let Some(filter) = query.get("filter") else {
        return rows;
    };
    let predicates: Vec<(&str, &str)> = filter
        .split(';')
        .filter_map(|predicate| predicate.split_once('='))
        .collect();
    rows.into_iter()
        .filter(|row| {
            predicates
                .iter()
                .all(|(field, value)| row.get(*field).and_then(Value::as_str) == Some(*value))
        })
        .collect()
}

fn expands(query: &HashMap<String, String>, field: &str) -> bool {
    query
        .get("expand")
        .is_some_and(|expand| expand.split(',').any(|name| name == field))
}

fn id_from_meta(value: &Value) -> Option<Uuid> {
    value
        .get("meta")?
        .get("href")?
        .as_str()?
        .rsplit('/')
        .next()?
        .parse()
        .ok()
}

// ---------------------------------------------------------------------------
// Loss
// ---------------------------------------------------------------------------

const SERVER_FIELDS: [&str; 7] = ["id", "meta", "accountId", "sum", "created", "updated", "positions"];

fn positions_href(base: &str, id: Uuid) -> String {
    format!("{base}/entity/loss/{id}/positions")
}

fn render_position(base: &str, loss_id: Uuid, position: &Map<String, Value>) -> Value {
    let mut body = position.clone();
    let id = body.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
    body.insert("accountId".into(), json!(ACCOUNT_ID));
    body.insert(
        "meta".into(),
        meta(format!("{}/{id}", positions_href(base, loss_id)), "lossposition"),
    );
    Value::Object(body)
}

fn new_position(mut input: Map<String, Value>) -> Map<String, Value> {
    for field in ["meta", "accountId"] {
        input.remove(field);
    }
    input.insert("id".into(), json!(Uuid::new_v4()));
    input
}

fn position_rows(input: &mut Map<String, Value>) -> Option<Vec<Map<String, Value>>> {
    let rows = input.get_mut("positions")?.get_mut("rows")?.as_array_mut()?;
    Some(
        rows.drain(..)
            .filter_map(|row| match row {
                Value::Object(map) => Some(new_position(map)),
                _ => None,
            })
            .collect(),
    )
}

fn render_loss(base: &str, record: &LossRecord, with_positions: bool) -> Value {
    let mut body = record.body.clone();
    let sum: f64 = record
        .positions
        .iter()
        .map(|p| {
            let price = p.get("price").and_then(Value::as_f64).unwrap_or(0.0);
            let quantity = p.get("quantity").and_then(Value::as_f64).unwrap_or(0.0);
            price * quantity
        })
        .sum();
    let mut positions = json!({"meta": meta(positions_href(base, record.id), "lossposition")});
    positions["meta"]["size"] = json!(record.positions.len());
    positions["meta"]["limit"] = json!(MAX_LIMIT);
    positions["meta"]["offset"] = json!(0);
    if with_positions {
        positions["rows"] = record
            .positions
            .iter()
            .map(|p| render_position(base, record.id, p))
            .collect();
    }
    body.insert("meta".into(), entity_meta(base, "loss", record.id));
    body.insert("id".into(), json!(record.id));
    body.insert("accountId".into(), json!(ACCOUNT_ID));
    body.insert("created".into(), json!(NOW));
    body.insert("updated".into(), json!(NOW));
    body.insert("sum".into(), json!(sum));
    body.insert("positions".into(), positions);
    Value::Object(body)
}

fn missing_link(input: &Map<String, Value>) -> Option<&'static str> {
    ["organization", "store"]
        .into_iter()
        .find(|field| !input.contains_key(*field))
}

impl Db {
    fn loss(&self, id: Uuid) -> Option<&LossRecord> {
        self.losses.iter().find(|loss| loss.id == id)
    }

    fn loss_mut(&mut self, id: Uuid) -> Option<&mut LossRecord> {
        self.losses.iter_mut().find(|loss| loss.id == id)
    }

    fn remove_loss(&mut self, id: Uuid) -> bool {
        let before = self.losses.len();
        self.losses.retain(|loss| loss.id != id);
        self.losses.len() != before
    }

    fn insert_loss(&mut self, mut input: Map<String, Value>) -> Uuid {
        let positions = position_rows(&mut input).unwrap_or_default();
        for field in SERVER_FIELDS {
            input.remove(field);
        }
        self.numbering += 1;
        input
            .entry("name")
            .or_insert_with(|| json!(format!("{:05}", self.numbering)));
        input.entry("applicable").or_insert(json!(true));
        input.entry("moment").or_insert(json!(NOW));
        let id = Uuid::new_v4();
        self.losses.push(LossRecord {
            id,
            body: input,
            positions,
        });
        tracing::debug!(%id, "loss created");
        id
    }

    fn update_loss(&mut self, id: Uuid, mut input: Map<String, Value>) -> bool {
        let Some(record) = self.loss_mut(id) else {
            return false;
        };
        if let Some(positions) = position_rows(&mut input) {
            record.positions = positions;
        }
        for field in SERVER_FIELDS {
            input.remove(field);
        }
        record.body.extend(input);
        true
    }
}

async fn list_losses(
    State(db): State<SharedDb>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let base = base_url(&headers);
    let db = db.read().await;
    let with_positions = expands(&query, "positions");
    let rows = db
        .losses
        .iter()
        .map(|loss| render_loss(&base, loss, with_positions))
        .collect();
    page(&base, "/entity/loss", "loss", apply_filter(rows, &query), &query)
}

/// A single object creates one loss; an array creates or updates many.
async fn create_losses(
    State(db): State<SharedDb>,
    headers: HeaderMap,
    Json(input): Json<Value>,
) -> Response {
    let base = base_url(&headers);
    let mut db = db.write().await;
    match input {
        Value::Object(input) => {
            if let Some(field) = missing_link(&input) {
                return api_error(
                    StatusCode::PRECONDITION_FAILED,
                    3000,
                    &format!("Ошибка сохранения объекта: поле '{field}' не может быть пустым"),
                );
            }
            let id = db.insert_loss(input);
            let record = db.loss(id).map(|loss| render_loss(&base, loss, false));
            Json(record).into_response()
        }
        Value::Array(items) => {
            let mut saved = Vec::with_capacity(items.len());
            for item in items {
                let existing = id_from_meta(&item);
                let Value::Object(map) = item else {
                    return api_error(StatusCode::BAD_REQUEST, 2000, "Ошибка формата JSON");
                };
                let id = match existing {
                    Some(id) if db.update_loss(id, map.clone()) => id,
                    _ => db.insert_loss(map),
                };
                if let Some(loss) = db.loss(id) {
                    saved.push(render_loss(&base, loss, false));
                }
            }
            Json(saved).into_response()
        }
        _ => api_error(StatusCode::BAD_REQUEST, 2000, "Ошибка формата JSON"),
    }
}

async fn get_loss(
    State(db): State<SharedDb>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Path(id): Path<Uuid>,
) -> Response {
    let base = base_url(&headers);
    let db = db.read().await;
    match db.loss(id) {
        Some(loss) => Json(render_loss(&base, loss, expands(&query, "positions"))).into_response(),
        None => not_found(),
    }
}

async fn update_loss(
    State(db): State<SharedDb>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(input): Json<Value>,
) -> Response {
    let base = base_url(&headers);
    let Value::Object(input) = input else {
        return api_error(StatusCode::BAD_REQUEST, 2000, "Ошибка формата JSON");
    };
    let mut db = db.write().await;
    if !db.update_loss(id, input) {
        return not_found();
    }
    match db.loss(id) {
        Some(loss) => Json(render_loss(&base, loss, false)).into_response(),
        None => not_found(),
    }
}

async fn delete_loss(State(db): State<SharedDb>, Path(id): Path<Uuid>) -> Response {
    if db.write().await.remove_loss(id) {
        StatusCode::OK.into_response()
    } else {
        not_found()
    }
}

async fn delete_many_losses(State(db): State<SharedDb>, Json(items): Json<Vec<Value>>) -> Response {
    let mut db = db.write().await;
    let mut all_deleted = true;
    let report: Vec<Value> = items
        .iter()
        .map(|item| match id_from_meta(item) {
            Some(id) if db.remove_loss(id) => {
                json!({"info": format!("Удаление объекта {id} прошло успешно")})
            }
            _ => {
                all_deleted = false;
                json!({"errors": [{"error": "Объект не найден", "code": 1021}]})
            }
        })
        .collect();
    let status = if all_deleted {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(report)).into_response()
}

async fn loss_metadata(headers: HeaderMap) -> Json<Value> {
    let base = base_url(&headers);
    Json(json!({
        "meta": meta(format!("{base}/entity/loss/metadata"), "loss"),
        "attributes": [],
        "states": [
            {"id": Uuid::from_u128(0x51), "name": "Новый", "color": 15106326, "stateType": "Regular", "entityType": "loss"},
            {"id": Uuid::from_u128(0x52), "name": "Списано", "color": 8825440, "stateType": "Successful", "entityType": "loss"}
        ],
        "createShared": false
    }))
}

async fn loss_template(Json(input): Json<Value>) -> Json<Value> {
    let mut draft = json!({
        "applicable": true,
        "moment": NOW,
        "shared": false,
        "sum": 0.0
    });
    for field in ["salesReturn", "inventory"] {
        if let Some(document) = input.get(field) {
            draft[field] = document.clone();
        }
    }
    Json(draft)
}

async fn get_loss_by_sync_id(
    State(db): State<SharedDb>,
    headers: HeaderMap,
    Path(sync_id): Path<Uuid>,
) -> Response {
    let base = base_url(&headers);
    let db = db.read().await;
    let wanted = json!(sync_id);
    match db.losses.iter().find(|loss| loss.body.get("syncId") == Some(&wanted)) {
        Some(loss) => Json(render_loss(&base, loss, false)).into_response(),
        None => not_found(),
    }
}

async fn delete_loss_by_sync_id(State(db): State<SharedDb>, Path(sync_id): Path<Uuid>) -> Response {
    let mut db = db.write().await;
    let wanted = json!(sync_id);
    let found = db
        .losses
        .iter()
        .find(|loss| loss.body.get("syncId") == Some(&wanted))
        .map(|loss| loss.id);
    match found {
        Some(id) if db.remove_loss(id) => StatusCode::OK.into_response(),
        _ => not_found(),
    }
}

async fn list_positions(
    State(db): State<SharedDb>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Path(id): Path<Uuid>,
) -> Response {
    let base = base_url(&headers);
    let db = db.read().await;
    let Some(loss) = db.loss(id) else {
        return not_found();
    };
    let rows = loss
        .positions
        .iter()
        .map(|p| render_position(&base, id, p))
        .collect();
    let path = format!("/entity/loss/{id}/positions");
    page(&base, &path, "lossposition", rows, &query)
}

/// A single object answers with the created position, an array with all of them.
async fn create_positions(
    State(db): State<SharedDb>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(input): Json<Value>,
) -> Response {
    let base = base_url(&headers);
    let mut db = db.write().await;
    let Some(loss) = db.loss_mut(id) else {
        return not_found();
    };
    match input {
        Value::Object(map) => {
            let position = new_position(map);
            let rendered = render_position(&base, id, &position);
            loss.positions.push(position);
            Json(rendered).into_response()
        }
        Value::Array(items) => {
            let mut created = Vec::with_capacity(items.len());
            for item in items {
                if let Value::Object(map) = item {
                    let position = new_position(map);
                    created.push(render_position(&base, id, &position));
                    loss.positions.push(position);
                }
            }
            Json(created).into_response()
        }
        _ => api_error(StatusCode::BAD_REQUEST, 2000, "Ошибка формата JSON"),
    }
}

fn position_index(loss: &LossRecord, position_id: Uuid) -> Option<usize> {
    let wanted = json!(position_id);
    loss.positions.iter().position(|p| p.get("id") == Some(&wanted))
}

async fn get_position(
    State(db): State<SharedDb>,
    headers: HeaderMap,
    Path((id, position_id)): Path<(Uuid, Uuid)>,
) -> Response {
    let base = base_url(&headers);
    let db = db.read().await;
    let found = db
        .loss(id)
        .and_then(|loss| position_index(loss, position_id).map(|i| &loss.positions[i]));
    match found {
        Some(position) => Json(render_position(&base, id, position)).into_response(),
        None => not_found(),
    }
}

async fn update_position(
    State(db): State<SharedDb>,
    headers: HeaderMap,
    Path((id, position_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<Value>,
) -> Response {
    let base = base_url(&headers);
    let Value::Object(mut input) = input else {
        return api_error(StatusCode::BAD_REQUEST, 2000, "Ошибка формата JSON");
    };
    for field in ["id", "meta", "accountId"] {
        input.remove(field);
    }
    let mut db = db.write().await;
    let Some(loss) = db.loss_mut(id) else {
        return not_found();
    };
    let Some(index) = position_index(loss, position_id) else {
        return not_found();
    };
    loss.positions[index].extend(input);
    Json(render_position(&base, id, &loss.positions[index])).into_response()
}

async fn delete_position(
    State(db): State<SharedDb>,
    Path((id, position_id)): Path<(Uuid, Uuid)>,
) -> Response {
    let mut db = db.write().await;
    let Some(loss) = db.loss_mut(id) else {
        return not_found();
    };
    match position_index(loss, position_id) {
        Some(index) => {
            loss.positions.remove(index);
            StatusCode::OK.into_response()
        }
        None => not_found(),
    }
}

// ---------------------------------------------------------------------------
// Applications and payments (read-only fixtures)
// ---------------------------------------------------------------------------

fn applications(base: &str) -> Vec<Value> {
    let names = ["Обмен с маркетплейсами", "Телефония"];
    APPLICATION_IDS
        .iter()
        .zip(names)
        .enumerate()
        .map(|(n, (id, name))| {
            json!({
                "meta": entity_meta(base, "application", *id),
                "id": id,
                "accountId": ACCOUNT_ID,
                "name": name,
                "appUid": Uuid::from_u128(0xa000 + n as u128)
            })
        })
        .collect()
}

async fn list_applications(
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let base = base_url(&headers);
    page(&base, "/entity/application", "application", applications(&base), &query)
}

async fn get_application(headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    let base = base_url(&headers);
    applications(&base)
        .into_iter()
        .find(|app| app["id"] == json!(id))
        .map(|app| Json(app).into_response())
        .unwrap_or_else(not_found)
}

fn payment_in(base: &str) -> Value {
    let organization = entity_meta(base, "organization", Uuid::from_u128(0x3));
    json!({
        "meta": entity_meta(base, "paymentin", PAYMENT_IN_ID),
        "id": PAYMENT_IN_ID,
        "accountId": ACCOUNT_ID,
        "name": "00012",
        "moment": "2024-06-10 10:00:00.000",
        "applicable": true,
        "sum": 5500.0,
        "paymentPurpose": "Оплата по счету 00007",
        "organization": {"meta": organization},
        "operations": [
            {
                "meta": entity_meta(base, "customerorder", Uuid::from_u128(0xc1)),
                "id": Uuid::from_u128(0xc1),
                "name": "00007",
                "linkedSum": 2000.0,
                "deliveryPlannedMoment": "2024-06-20 12:00:00.000",
                "reservedSum": 0.0
            },
            {
                "meta": entity_meta(base, "demand", Uuid::from_u128(0xd1)),
                "id": Uuid::from_u128(0xd1),
                "name": "00031",
                "linkedSum": 1500.0,
                "shipmentAddress": "Казань, ул. Баумана, 7"
            },
            {
                "meta": entity_meta(base, "invoiceout", Uuid::from_u128(0xe1)),
                "id": Uuid::from_u128(0xe1),
                "name": "00007",
                "linkedSum": 1000.0,
                "paymentPlannedMoment": "2024-06-15 00:00:00.000"
            },
            {
                "meta": entity_meta(base, "demand", Uuid::from_u128(0xd2)),
                "id": Uuid::from_u128(0xd2),
                "name": "00032",
                "linkedSum": 1000.0,
                "shipmentAddress": "Самара, ул. Ленина, 1"
            }
        ]
    })
}

async fn list_payments_in(
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let base = base_url(&headers);
    page(&base, "/entity/paymentin", "paymentin", vec![payment_in(&base)], &query)
}

async fn get_payment_in(headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if id != PAYMENT_IN_ID {
        return not_found();
    }
    Json(payment_in(&base_url(&headers))).into_response()
}

// ---------------------------------------------------------------------------
// Money report and async jobs
// ---------------------------------------------------------------------------

fn money_rows(base: &str) -> Vec<Value> {
    let organization = json!({
        "meta": entity_meta(base, "organization", Uuid::from_u128(0x3)),
        "name": "ООО Ромашка"
    });
    vec![
        json!({
            "account": {
                "meta": meta(format!("{base}/entity/organization/{}/accounts/{}", Uuid::from_u128(0x3), Uuid::from_u128(0x4)), "account"),
                "name": "40702810900000000001"
            },
            "organization": organization.clone(),
            "balance": 125000.0
        }),
        json!({"organization": organization, "balance": 3400.5}),
    ]
}

fn money_by_account_body(base: &str) -> Response {
    page(
        base,
        "/report/money/byaccount",
        "money",
        money_rows(base),
        &HashMap::new(),
    )
}

/// Errors for a plot series request without its required parameters.
fn plot_series_errors(query: &HashMap<String, String>) -> Vec<Value> {
    ["momentFrom", "momentTo", "interval"]
        .into_iter()
        .filter(|name| !query.contains_key(*name))
        .map(|name| {
            json!({
                "error": format!("Не указан обязательный параметр '{name}'"),
                "code": 1035,
                "parameter": name
            })
        })
        .collect()
}

fn plot_series_body(base: &str, query: &HashMap<String, String>) -> Value {
    let from = query.get("momentFrom").cloned().unwrap_or_default();
    let to = query.get("momentTo").cloned().unwrap_or_default();
    json!({
        "context": context(base),
        "meta": meta(format!("{base}/report/money/plotseries"), "moneyplotseries"),
        "credit": 1000.0,
        "debit": 250.0,
        "series": [
            {"date": from, "credit": 600.0, "debit": 0.0, "balance": 600.0},
            {"date": to, "credit": 400.0, "debit": 250.0, "balance": 150.0}
        ]
    })
}

fn is_async(query: &HashMap<String, String>) -> bool {
    query.get("async").is_some_and(|v| v == "true")
}

async fn submit(db: &SharedDb, base: &str, report: Report, query: HashMap<String, String>) -> Response {
    let id = Uuid::new_v4();
    let path = match report {
        Report::MoneyByAccount => "/report/money/byaccount",
        Report::MoneyPlotSeries => "/report/money/plotseries",
    };
    let errors = match report {
        Report::MoneyByAccount => Vec::new(),
        Report::MoneyPlotSeries => plot_series_errors(&query),
    };
    db.write().await.jobs.push(Job {
        id,
        report,
        query,
        request: format!("{base}{path}?async=true"),
        state: "PENDING",
        checks: 0,
        errors,
    });
    tracing::info!(%id, path, "async job accepted");
    let status_url = format!("{base}/async/{id}");
    (
        StatusCode::ACCEPTED,
        [
            (header::LOCATION, status_url.clone()),
            (header::CONTENT_LOCATION, format!("{status_url}/result")),
        ],
    )
        .into_response()
}

async fn money_by_account(
    State(db): State<SharedDb>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let base = base_url(&headers);
    if is_async(&query) {
        return submit(&db, &base, Report::MoneyByAccount, query).await;
    }
    money_by_account_body(&base)
}

async fn money_plot_series(
    State(db): State<SharedDb>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let base = base_url(&headers);
    if is_async(&query) {
        return submit(&db, &base, Report::MoneyPlotSeries, query).await;
    }
    let errors = plot_series_errors(&query);
    if !errors.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({"errors": errors}))).into_response();
    }
    Json(plot_series_body(&base, &query)).into_response()
}

fn render_job(base: &str, job: &Job) -> Value {
    let mut body = json!({
        "id": job.id,
        "accountId": ACCOUNT_ID,
        "meta": meta(format!("{base}/async/{}", job.id), "async"),
        "owner": {"meta": entity_meta(base, "employee", Uuid::from_u128(0xe0))},
        "state": job.state,
        "request": job.request,
        "deletionDate": "2024-06-19 15:18:46.521"
    });
    if job.state == "DONE" {
        body["resultUrl"] = json!(format!("{base}/async/{}/result", job.id));
    }
    if job.state == "API_ERROR" {
        body["errors"] = json!(job.errors);
    }
    body
}

impl Job {
    fn advance(&mut self) {
        if !matches!(self.state, "PENDING" | "PROCESSING") {
            return;
        }
        self.checks += 1;
        self.state = if self.checks < CHECKS_UNTIL_FINISHED {
            "PROCESSING"
        } else if self.errors.is_empty() {
            "DONE"
        } else {
            "API_ERROR"
        };
    }
}

async fn list_jobs(
    State(db): State<SharedDb>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let base = base_url(&headers);
    let db = db.read().await;
    let rows = db.jobs.iter().map(|job| render_job(&base, job)).collect();
    page(&base, "/async", "async", rows, &query)
}

async fn job_status(
    State(db): State<SharedDb>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Response {
    let base = base_url(&headers);
    let mut db = db.write().await;
    let Some(job) = db.jobs.iter_mut().find(|job| job.id == id) else {
        return not_found();
    };
    job.advance();
    tracing::debug!(%id, state = job.state, "async job checked");
    Json(render_job(&base, job)).into_response()
}

async fn job_result(
    State(db): State<SharedDb>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Response {
    let base = base_url(&headers);
    let db = db.read().await;
    let Some(job) = db.jobs.iter().find(|job| job.id == id) else {
        return not_found();
    };
    if job.state != "DONE" {
        return api_error(
            StatusCode::BAD_REQUEST,
            1071,
            "Результат асинхронной задачи еще не готов",
        );
    }
    match job.report {
        Report::MoneyByAccount => money_by_account_body(&base),
        Report::MoneyPlotSeries => Json(plot_series_body(&base, &job.query)).into_response(),
    }
}

async fn cancel_job(State(db): State<SharedDb>, Path(id): Path<Uuid>) -> Response {
    let mut db = db.write().await;
    let Some(job) = db.jobs.iter_mut().find(|job| job.id == id) else {
        return not_found();
    };
    if !matches!(job.state, "PENDING" | "PROCESSING") {
        return api_error(
            StatusCode::BAD_REQUEST,
            1072,
            "Асинхронная задача уже завершена",
        );
    }
    job.state = "CANCEL";
    tracing::info!(%id, "async job cancelled");
    StatusCode::NO_CONTENT.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn job(errors: Vec<Value>) -> Job {
        Job {
            id: Uuid::nil(),
            report: Report::MoneyByAccount,
            query: HashMap::new(),
            request: String::new(),
            state: "PENDING",
            checks: 0,
            errors,
        }
    }

    #[test]
    fn job_finishes_after_two_checks() {
        let mut job = job(Vec::new());
        job.advance();
        assert_eq!(job.state, "PROCESSING");
        job.advance();
        assert_eq!(job.state, "DONE");
        job.advance();
        assert_eq!(job.state, "DONE");
        assert_eq!(job.checks, CHECKS_UNTIL_FINISHED);
    }

    #[test]
    fn job_with_errors_ends_in_api_error() {
        let mut job = job(vec![json!({"error": "x"})]);
        job.advance();
        job.advance();
        assert_eq!(job.state, "API_ERROR");
    }

    #[test]
    fn cancelled_job_does_not_advance() {
        let mut job = job(Vec::new());
        job.state = "CANCEL";
        job.advance();
        assert_eq!(job.state, "CANCEL");
        assert_eq!(job.checks, 0);
    }

    #[test]
    fn filter_matches_every_predicate() {
        let rows = vec![
            json!({"name": "00001", "description": "a"}),
            json!({"name": "00002", "description": "a"}),
            json!({"name": "00001", "description": "b"}),
        ];
        let kept = apply_filter(rows, &query(&[("filter", "name=00001;description=b")]));
        assert_eq!(kept, vec![json!({"name": "00001", "description": "b"})]);
    }

    #[test]
    fn plot_series_requires_period_and_interval() {
        let errors = plot_series_errors(&query(&[("momentFrom", "2024-01-01 00:00:00")]));
        let missing: Vec<&str> = errors.iter().filter_map(|e| e["parameter"].as_str()).collect();
        assert_eq!(missing, vec!["momentTo", "interval"]);
    }

    #[test]
    fn meta_href_is_parsed_back_to_id() {
        let id = Uuid::from_u128(77);
        let item = json!({"meta": entity_meta(DEFAULT_BASE, "loss", id)});
        assert_eq!(id_from_meta(&item), Some(id));
        assert_eq!(id_from_meta(&json!({"meta": {"href": "x/entity/loss/nope"}})), None);
    }

    #[test]
    fn loss_sum_follows_positions() {
        let mut db = Db::default();
        let mut input = Map::new();
        input.insert(
            "positions".into(),
            json!({"rows": [{"quantity": 2.0, "price": 150.0}, {"quantity": 1.0, "price": 50.0}]}),
        );
        let id = db.insert_loss(input);
        let rendered = render_loss(DEFAULT_BASE, db.loss(id).unwrap(), true);
        assert_eq!(rendered["sum"], 350.0);
        assert_eq!(rendered["name"], "00001");
        assert_eq!(rendered["positions"]["meta"]["size"], 2);
        assert_eq!(rendered["positions"]["rows"].as_array().map(Vec::len), Some(2));
    }
}
