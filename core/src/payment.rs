//! Bank payments (`entity/paymentin`, `entity/paymentout`).
//!
//! Both carry an `operations` list of the documents they pay. These structs
//! spell out their fields instead of flattening [`crate::documents::DocumentFields`]:
//! operation envelopes must be decoded straight from the JSON text.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::meta::{Meta, MetaType, MetaTyper};
use crate::operation::{Operation, OperationIn, OperationOut, Operations};
use crate::service::Entity;
use crate::types::{Attribute, EntityRef, Rate, Timestamp};

/// Incoming payment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIn {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moment: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applicable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub printed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_account: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_account: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sales_channel: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vat_sum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incoming_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incoming_date: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
    #[serde(default, skip_serializing_if = "Operations::is_empty")]
    pub operations: Operations,
}

impl PaymentIn {
    /// Links `document` to this payment and returns the new envelope.
    pub fn push_operation<D: OperationIn>(&mut self, document: &D) -> Result<&mut Operation> {
        let operation = Operation::from_document(document)?;
        Ok(self.operations.push(operation))
    }
}

impl MetaTyper for PaymentIn {
    const META_TYPE: MetaType = MetaType::PaymentIn;
}

impl Entity for PaymentIn {
    const ENDPOINT: &'static str = "entity/paymentin";
}

/// Outgoing payment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOut {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moment: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applicable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub printed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_account: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_account: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sales_channel: Option<EntityRef>,
    /// Required by the API when creating.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expense_item: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vat_sum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
    #[serde(default, skip_serializing_if = "Operations::is_empty")]
    pub operations: Operations,
}

impl PaymentOut {
    /// Links `document` to this payment and returns the new envelope.
    pub fn push_operation<D: OperationOut>(&mut self, document: &D) -> Result<&mut Operation> {
        let operation = Operation::from_document(document)?;
        Ok(self.operations.push(operation))
    }
}

impl MetaTyper for PaymentOut {
    const META_TYPE: MetaType = MetaType::PaymentOut;
}

impl Entity for PaymentOut {
    const ENDPOINT: &'static str = "entity/paymentout";
}
