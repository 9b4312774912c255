//! Write-off document (`entity/loss`).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::list::MetaArray;
use crate::meta::{Meta, MetaType, MetaTyper, MetaWrapper};
use crate::service::{Entity, HasPositions};
use crate::types::{Attribute, EntityRef, Pack, Rate, Timestamp};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loss {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applicable: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_code: Option<String>,
    /// Attached files, at most 100.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<MetaArray<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moment: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub positions: Option<MetaArray<LossPosition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub printed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<EntityRef>,
    /// Total in minor currency units.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sum: Option<f64>,
    /// Immutable once set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<Timestamp>,
    /// Customer return this write-off was created from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sales_return: Option<EntityRef>,
}

impl Loss {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_organization(mut self, organization: Meta) -> Self {
        self.organization = Some(organization.into());
        self
    }

    pub fn with_store(mut self, store: Meta) -> Self {
        self.store = Some(store.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_positions(mut self, positions: Vec<LossPosition>) -> Self {
        self.positions = Some(MetaArray::from_rows(positions));
        self
    }
}

impl MetaTyper for Loss {
    const META_TYPE: MetaType = MetaType::Loss;
}

impl Entity for Loss {
    const ENDPOINT: &'static str = "entity/loss";
}

impl HasPositions for Loss {
    type Position = LossPosition;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LossPosition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<Uuid>,
    /// Product, service, batch or variant written off.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assortment: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pack: Option<Pack>,
    /// Unit price in minor currency units.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    /// Always equals the number of serial numbers for serial-tracked goods.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<EntityRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub things: Vec<String>,
}

impl LossPosition {
    pub fn new(assortment: Meta, quantity: f64) -> Self {
        Self {
            assortment: Some(assortment.into()),
            quantity: Some(quantity),
            ..Self::default()
        }
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

impl MetaTyper for LossPosition {
    const META_TYPE: MetaType = MetaType::LossPosition;
}

/// Documents a write-off template can be based on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LossTemplateArg {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sales_return: Option<MetaWrapper>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory: Option<MetaWrapper>,
}
