//! Generic CRUD service shared by every entity endpoint.
//!
//! # Design
//! One `EntityService<E>` serves all entities; the endpoint path and the
//! discriminator come from the [`Entity`] impl of `E`. Position operations
//! exist only for `E: HasPositions`.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::http::{HttpMethod, HttpResponse};
use crate::list::{DeleteManyResponse, List, MetaArray};
use crate::meta::{Meta, MetaTyper, MetaWrapper};
use crate::params::Params;
use crate::request::{check_status, encode, Response};
use crate::types::Metadata;

/// A resource reachable at a fixed endpoint relative to the base URL.
pub trait Entity: MetaTyper + Serialize + DeserializeOwned + Send + Sync {
    const ENDPOINT: &'static str;
}

/// An entity whose line items live under `{endpoint}/{id}/positions`.
pub trait HasPositions: Entity {
    type Position: Serialize + DeserializeOwned + Send + Sync;
}

pub struct EntityService<'c, E> {
    client: &'c Client,
    _entity: PhantomData<fn() -> E>,
}

impl<'c, E: Entity> EntityService<'c, E> {
    pub(crate) fn new(client: &'c Client) -> Self {
        Self {
            client,
            _entity: PhantomData,
        }
    }

    pub fn endpoint(&self) -> &'static str {
        E::ENDPOINT
    }

    /// Reference to the entity `id`, as used in request bodies.
    pub fn meta_for(&self, id: Uuid) -> Meta {
        Meta::new(
            E::META_TYPE,
            format!("{}/{}/{id}", self.client.base_url(), E::ENDPOINT),
        )
    }

    /// One page of entities.
    pub async fn get_list(&self, params: Option<Params>) -> Result<List<E>> {
        self.client
            .request(E::ENDPOINT)
            .maybe_params(params)
            .get()
            .await
            .map(Response::into_data)
    }

    /// Every entity matching `params`, across all pages.
    pub async fn get_list_all(&self, params: Option<Params>) -> Result<Vec<E>> {
        self.client
            .request::<List<E>>(E::ENDPOINT)
            .maybe_params(params)
            .get_all()
            .await
    }

    pub async fn get_by_id(&self, id: Uuid, params: Option<Params>) -> Result<E> {
        self.client
            .request(format!("{}/{id}", E::ENDPOINT))
            .maybe_params(params)
            .get()
            .await
            .map(Response::into_data)
    }

    pub async fn create(&self, entity: &E, params: Option<Params>) -> Result<E> {
        self.client
            .request(E::ENDPOINT)
            .maybe_params(params)
            .post(entity)
            .await
            .map(Response::into_data)
    }

    /// Creates entities without `meta` and updates those with one, in one call.
    pub async fn create_update_many(&self, entities: &[E], params: Option<Params>) -> Result<Vec<E>> {
        self.client
            .request(E::ENDPOINT)
            .maybe_params(params)
            .post(entities)
            .await
            .map(Response::into_data)
    }

    pub async fn update(&self, id: Uuid, entity: &E, params: Option<Params>) -> Result<E> {
        self.client
            .request(format!("{}/{id}", E::ENDPOINT))
            .maybe_params(params)
            .put(entity)
            .await
            .map(Response::into_data)
    }

    /// Deletes the entity; `Ok(false)` when it did not exist.
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let response = self
            .client
            .request::<()>(format!("{}/{id}", E::ENDPOINT))
            .send_raw(HttpMethod::Delete, None)
            .await?;
        deleted(&response)
    }

    /// Moves the entity to the recycle bin.
    pub async fn remove(&self, id: Uuid) -> Result<bool> {
        let response = self
            .client
            .request::<()>(format!("{}/{id}/trash", E::ENDPOINT))
            .send_raw(HttpMethod::Post, None)
            .await?;
        deleted(&response)
    }

    /// Deletes several entities in one call.
    ///
    /// The report lists one outcome per id, in request order. It is returned
    /// even when the server answers non-2xx because some items failed.
    pub async fn delete_many(&self, ids: &[Uuid]) -> Result<DeleteManyResponse> {
        if ids.is_empty() {
            return Ok(DeleteManyResponse(Vec::new()));
        }
        let items: Vec<MetaWrapper> = ids.iter().map(|id| self.meta_for(*id).into()).collect();
        let response = self
            .client
            .request::<()>(format!("{}/delete", E::ENDPOINT))
            .send_raw(HttpMethod::Post, Some(encode(&items)?))
            .await?;
        match serde_json::from_str::<DeleteManyResponse>(&response.body) {
            Ok(report) => {
                tracing::debug!(
                    endpoint = E::ENDPOINT,
                    deleted = report.success_count(),
                    failed = report.failure_count(),
                    "bulk delete finished"
                );
                Ok(report)
            }
            Err(source) => {
                check_status(&response)?;
                Err(Error::Decode {
                    source,
                    body: response.body,
                })
            }
        }
    }

    /// Custom attribute definitions and workflow states of the entity.
    pub async fn get_metadata(&self) -> Result<Metadata> {
        self.client
            .request(format!("{}/metadata", E::ENDPOINT))
            .get()
            .await
            .map(Response::into_data)
    }

    pub async fn get_by_sync_id(&self, sync_id: Uuid) -> Result<E> {
        self.client
            .request(format!("{}/syncid/{sync_id}", E::ENDPOINT))
            .get()
            .await
            .map(Response::into_data)
    }

    pub async fn delete_by_sync_id(&self, sync_id: Uuid) -> Result<bool> {
        let response = self
            .client
            .request::<()>(format!("{}/syncid/{sync_id}", E::ENDPOINT))
            .send_raw(HttpMethod::Delete, None)
            .await?;
        deleted(&response)
    }

    /// Prefilled entity the server proposes for a new document, optionally
    /// based on other documents (e.g. [`crate::loss::LossTemplateArg`]).
    pub async fn template<A: Serialize + ?Sized>(&self, based_on: &A) -> Result<E> {
        self.client
            .request(format!("{}/new", E::ENDPOINT))
            .put(based_on)
            .await
            .map(Response::into_data)
    }
}

impl<'c, E: HasPositions> EntityService<'c, E> {
    fn positions_path(id: Uuid) -> String {
        format!("{}/{id}/positions", E::ENDPOINT)
    }

    /// First page of the positions of document `id`.
    pub async fn get_positions(
        &self,
        id: Uuid,
        params: Option<Params>,
    ) -> Result<MetaArray<E::Position>> {
        self.client
            .request(Self::positions_path(id))
            .maybe_params(params)
            .get()
            .await
            .map(Response::into_data)
    }

    pub async fn get_positions_all(
        &self,
        id: Uuid,
        params: Option<Params>,
    ) -> Result<Vec<E::Position>> {
        self.client
            .request::<List<E::Position>>(Self::positions_path(id))
            .maybe_params(params)
            .get_all()
            .await
    }

    pub async fn get_position_by_id(
        &self,
        id: Uuid,
        position_id: Uuid,
        params: Option<Params>,
    ) -> Result<E::Position> {
        self.client
            .request(format!("{}/{position_id}", Self::positions_path(id)))
            .maybe_params(params)
            .get()
            .await
            .map(Response::into_data)
    }

    pub async fn create_position(&self, id: Uuid, position: &E::Position) -> Result<E::Position> {
        self.client
            .request(Self::positions_path(id))
            .post(position)
            .await
            .map(Response::into_data)
    }

    pub async fn create_positions(
        &self,
        id: Uuid,
        positions: &[E::Position],
    ) -> Result<Vec<E::Position>> {
        self.client
            .request(Self::positions_path(id))
            .post(positions)
            .await
            .map(Response::into_data)
    }

    pub async fn update_position(
        &self,
        id: Uuid,
        position_id: Uuid,
        position: &E::Position,
        params: Option<Params>,
    ) -> Result<E::Position> {
        self.client
            .request(format!("{}/{position_id}", Self::positions_path(id)))
            .maybe_params(params)
            .put(position)
            .await
            .map(Response::into_data)
    }

    pub async fn delete_position(&self, id: Uuid, position_id: Uuid) -> Result<bool> {
        let response = self
            .client
            .request::<()>(format!("{}/{position_id}", Self::positions_path(id)))
            .send_raw(HttpMethod::Delete, None)
            .await?;
        deleted(&response)
    }
}

fn deleted(response: &HttpResponse) -> Result<bool> {
    if response.status == 404 {
        return Ok(false);
    }
    check_status(response)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::ClientConfig;
    use crate::loss::{Loss, LossPosition, LossTemplateArg};
    use crate::meta::MetaType;
    use crate::mock::MockTransport;

    const BASE: &str = "http://localhost:3000";

    fn client(transport: &MockTransport) -> Client {
        Client::new(ClientConfig::default().with_base_url(BASE), transport.clone())
    }

    fn loss_json(n: u128, name: &str) -> serde_json::Value {
        let id = Uuid::from_u128(n);
        json!({
            "meta": {"href": format!("{BASE}/entity/loss/{id}"), "type": "loss"},
            "id": id,
            "name": name
        })
    }

    fn body(request: &crate::http::HttpRequest) -> serde_json::Value {
        serde_json::from_str(request.body.as_deref().unwrap_or("null")).unwrap()
    }

    #[tokio::test]
    async fn get_by_id_targets_entity_path() {
        let transport = MockTransport::new();
        transport.push_json(200, loss_json(1, "00001"));
        let c = client(&transport);
        let loss = c
            .loss()
            .get_by_id(Uuid::from_u128(1), Some(Params::new().expand("positions")))
            .await
            .unwrap();
        assert_eq!(loss.name.as_deref(), Some("00001"));
        let sent = &transport.requests()[0];
        assert_eq!(sent.method, HttpMethod::Get);
        assert_eq!(
            sent.url,
            format!("{BASE}/entity/loss/{}?expand=positions", Uuid::from_u128(1))
        );
    }

    #[tokio::test]
    async fn create_posts_entity_body() {
        let transport = MockTransport::new();
        transport.push_json(200, loss_json(2, "00002"));
        let c = client(&transport);
        let created = c
            .loss()
            .create(&Loss::new().with_description("брак"), None)
            .await
            .unwrap();
        assert_eq!(created.id, Some(Uuid::from_u128(2)));
        let sent = &transport.requests()[0];
        assert_eq!(sent.method, HttpMethod::Post);
        assert_eq!(sent.url, format!("{BASE}/entity/loss"));
        assert_eq!(body(sent), json!({"description": "брак"}));
    }

    #[tokio::test]
    async fn create_update_many_posts_array() {
        let transport = MockTransport::new();
        transport.push_json(200, json!([loss_json(1, "00001"), loss_json(2, "00002")]));
        let c = client(&transport);
        let batch = vec![Loss::new().with_name("00001"), Loss::new().with_name("00002")];
        let saved = c.loss().create_update_many(&batch, None).await.unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(body(&transport.requests()[0]), json!([{"name": "00001"}, {"name": "00002"}]));
    }

    #[tokio::test]
    async fn update_puts_to_entity_path() {
        let transport = MockTransport::new();
        transport.push_json(200, loss_json(3, "00003"));
        let c = client(&transport);
        let id = Uuid::from_u128(3);
        c.loss().update(id, &Loss::new().with_name("00003"), None).await.unwrap();
        let sent = &transport.requests()[0];
        assert_eq!(sent.method, HttpMethod::Put);
        assert_eq!(sent.url, format!("{BASE}/entity/loss/{id}"));
    }

    #[tokio::test]
    async fn delete_reports_missing_entity_as_false() {
        let transport = MockTransport::new();
        transport.push(200, "");
        transport.push(404, r#"{"errors":[{"error":"Объект не найден","code":1021}]}"#);
        transport.push(500, "oops");
        let c = client(&transport);
        assert!(c.loss().delete(Uuid::from_u128(1)).await.unwrap());
        assert!(!c.loss().delete(Uuid::from_u128(1)).await.unwrap());
        assert_eq!(c.loss().delete(Uuid::from_u128(1)).await.unwrap_err().status(), Some(500));
        assert_eq!(transport.requests()[0].method, HttpMethod::Delete);
    }

    #[tokio::test]
    async fn delete_many_returns_per_item_report() {
        let transport = MockTransport::new();
        transport.push(
            400,
            r#"[
                {"info": "Удаление объекта прошло успешно"},
                {"errors": [{"error": "Объект не найден", "code": 1021}]},
                {"info": "Удаление объекта прошло успешно"}
            ]"#,
        );
        let c = client(&transport);
        let ids = [Uuid::from_u128(1), Uuid::from_u128(2), Uuid::from_u128(3)];
        let report = c.loss().delete_many(&ids).await.unwrap();
        assert_eq!(report.success_count(), 2);
        assert_eq!(report.failures().map(|(i, _)| i).collect::<Vec<_>>(), vec![1]);

        let sent = &transport.requests()[0];
        assert_eq!(sent.method, HttpMethod::Post);
        assert_eq!(sent.url, format!("{BASE}/entity/loss/delete"));
        let items = body(sent);
        assert_eq!(items.as_array().map(Vec::len), Some(3));
        assert_eq!(
            items[1]["meta"]["href"],
            format!("{BASE}/entity/loss/{}", Uuid::from_u128(2))
        );
        assert_eq!(items[1]["meta"]["type"], "loss");
    }

    #[tokio::test]
    async fn delete_many_surfaces_non_report_errors() {
        let transport = MockTransport::new();
        transport.push(403, r#"{"errors":[{"error":"Доступ запрещен","code":1016}]}"#);
        let c = client(&transport);
        let err = c.loss().delete_many(&[Uuid::from_u128(1)]).await.unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert_eq!(err.api_errors()[0].code, Some(1016));
    }

    #[tokio::test]
    async fn delete_many_without_ids_sends_nothing() {
        let transport = MockTransport::new();
        let c = client(&transport);
        let report = c.loss().delete_many(&[]).await.unwrap();
        assert!(report.items().is_empty());
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn sync_id_operations_use_syncid_path() {
        let transport = MockTransport::new();
        transport.push_json(200, loss_json(4, "00004"));
        transport.push(200, "");
        let c = client(&transport);
        let sync_id = Uuid::from_u128(44);
        c.loss().get_by_sync_id(sync_id).await.unwrap();
        assert!(c.loss().delete_by_sync_id(sync_id).await.unwrap());
        let urls: Vec<String> = transport.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(urls[0], format!("{BASE}/entity/loss/syncid/{sync_id}"));
        assert_eq!(urls[1], format!("{BASE}/entity/loss/syncid/{sync_id}"));
    }

    #[tokio::test]
    async fn metadata_decodes_states() {
        let transport = MockTransport::new();
        transport.push_json(
            200,
            json!({
                "meta": {"href": format!("{BASE}/entity/loss/metadata"), "type": "loss"},
                "states": [{"name": "Новый", "color": 15106326, "stateType": "Regular"}],
                "createShared": false
            }),
        );
        let c = client(&transport);
        let metadata = c.loss().get_metadata().await.unwrap();
        assert_eq!(metadata.states[0].name.as_deref(), Some("Новый"));
        assert_eq!(metadata.create_shared, Some(false));
        assert!(transport.requests()[0].url.ends_with("/entity/loss/metadata"));
    }

    #[tokio::test]
    async fn template_puts_base_documents() {
        let transport = MockTransport::new();
        transport.push_json(200, json!({"name": "", "applicable": false}));
        let c = client(&transport);
        let arg = LossTemplateArg {
            sales_return: None,
            inventory: Some(
                Meta::entity(BASE, MetaType::Inventory, Uuid::from_u128(9)).into(),
            ),
        };
        let draft = c.loss().template(&arg).await.unwrap();
        assert_eq!(draft.applicable, Some(false));
        let sent = &transport.requests()[0];
        assert_eq!(sent.method, HttpMethod::Put);
        assert_eq!(sent.url, format!("{BASE}/entity/loss/new"));
        assert_eq!(body(sent)["inventory"]["meta"]["type"], "inventory");
    }

    #[tokio::test]
    async fn position_operations_nest_under_document() {
        let transport = MockTransport::new();
        let id = Uuid::from_u128(1);
        let position_id = Uuid::from_u128(100);
        let position = json!({"id": position_id, "quantity": 2.0, "reason": "бой"});
        transport.push_json(
            200,
            json!({"meta": {"href": format!("{BASE}/entity/loss/{id}/positions"), "type": "lossposition", "size": 1}, "rows": [position.clone()]}),
        );
        transport.push_json(200, position.clone());
        transport.push_json(200, json!([position.clone()]));
        transport.push_json(200, position.clone());
        transport.push(200, "");

        let c = client(&transport);
        let service = c.loss();
        let page = service.get_positions(id, None).await.unwrap();
        assert_eq!(page.rows[0].reason.as_deref(), Some("бой"));
        let created = service
            .create_position(id, &LossPosition::new(Meta::entity(BASE, MetaType::Product, Uuid::nil()), 2.0))
            .await
            .unwrap();
        assert_eq!(created.id, Some(position_id));
        let many = service.create_positions(id, &[LossPosition::default()]).await.unwrap();
        assert_eq!(many.len(), 1);
        service
            .update_position(id, position_id, &LossPosition::default().with_reason("бой"), None)
            .await
            .unwrap();
        assert!(service.delete_position(id, position_id).await.unwrap());

        let sent: Vec<(HttpMethod, String)> = transport
            .requests()
            .into_iter()
            .map(|r| (r.method, r.url))
            .collect();
        let positions = format!("{BASE}/entity/loss/{id}/positions");
        assert_eq!(
            sent,
            vec![
                (HttpMethod::Get, positions.clone()),
                (HttpMethod::Post, positions.clone()),
                (HttpMethod::Post, positions.clone()),
                (HttpMethod::Put, format!("{positions}/{position_id}")),
                (HttpMethod::Delete, format!("{positions}/{position_id}")),
            ]
        );
    }

    #[tokio::test]
    async fn positions_all_pages_through_rows() {
        let transport = MockTransport::new();
        let id = Uuid::from_u128(1);
        let meta = |offset: u64| {
            json!({"href": format!("{BASE}/entity/loss/{id}/positions"), "type": "lossposition", "size": 3, "limit": 2, "offset": offset})
        };
        transport.push_json(200, json!({"meta": meta(0), "rows": [{"quantity": 1.0}, {"quantity": 2.0}]}));
        transport.push_json(200, json!({"meta": meta(2), "rows": [{"quantity": 3.0}]}));
        let c = client(&transport);
        let all = c
            .loss()
            .get_positions_all(id, Some(Params::new().limit(2)))
            .await
            .unwrap();
        let quantities: Vec<f64> = all.iter().filter_map(|p| p.quantity).collect();
        assert_eq!(quantities, vec![1.0, 2.0, 3.0]);
        assert_eq!(transport.request_count(), 2);
    }
}
