//! Server applications installed on the account (`entity/application`).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::meta::{Meta, MetaType, MetaTyper};
use crate::service::Entity;

/// Read-only: the API offers only list and get for applications.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_uid: Option<Uuid>,
}

impl MetaTyper for Application {
    const META_TYPE: MetaType = MetaType::Application;
}

impl Entity for Application {
    const ENDPOINT: &'static str = "entity/application";
}
