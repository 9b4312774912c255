//! Trade documents a payment can be linked to.
//!
//! Each kind shares the header fields in [`DocumentFields`] and adds its own.
//! Documents paid through incoming payments implement [`OperationIn`];
//! documents paid through outgoing payments implement [`OperationOut`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::list::MetaArray;
use crate::meta::{Meta, MetaType, MetaTyper};
use crate::operation::{OperationIn, OperationOut};
use crate::service::{Entity, HasPositions};
use crate::types::{Attribute, EntityRef, Pack, Rate, Timestamp};

/// Header fields common to every trade document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFields {
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
    pub store: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payed_sum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vat_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vat_included: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vat_sum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
}

/// Line item of a trade document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPosition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assortment: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    /// Percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vat: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vat_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pack: Option<Pack>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserve: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipped: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub things: Vec<String>,
}

impl DocumentPosition {
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
}

macro_rules! document {
    ($ty:ty, $kind:expr, $endpoint:literal) => {
        impl MetaTyper for $ty {
            const META_TYPE: MetaType = $kind;
        }

        impl Entity for $ty {
            const ENDPOINT: &'static str = $endpoint;
        }
    };
    ($ty:ty, $kind:expr, $endpoint:literal, positions) => {
        document!($ty, $kind, $endpoint);

        impl HasPositions for $ty {
            type Position = DocumentPosition;
        }
    };
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerOrder {
    #[serde(flatten)]
    pub document: DocumentFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub positions: Option<MetaArray<DocumentPosition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_planned_moment: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserved_sum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipped_sum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoiced_sum: Option<f64>,
}

document!(CustomerOrder, MetaType::CustomerOrder, "entity/customerorder", positions);
impl OperationIn for CustomerOrder {}

/// Return to supplier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReturn {
    #[serde(flatten)]
    pub document: DocumentFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub positions: Option<MetaArray<DocumentPosition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supply: Option<EntityRef>,
}

document!(PurchaseReturn, MetaType::PurchaseReturn, "entity/purchasereturn", positions);
impl OperationIn for PurchaseReturn {}

/// Shipment to a customer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Demand {
    #[serde(flatten)]
    pub document: DocumentFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub positions: Option<MetaArray<DocumentPosition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_order: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipment_address: Option<String>,
}

document!(Demand, MetaType::Demand, "entity/demand", positions);
impl OperationIn for Demand {}

/// Invoice issued to a customer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceOut {
    #[serde(flatten)]
    pub document: DocumentFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub positions: Option<MetaArray<DocumentPosition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_order: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_planned_moment: Option<Timestamp>,
}

document!(InvoiceOut, MetaType::InvoiceOut, "entity/invoiceout", positions);
impl OperationIn for InvoiceOut {}

/// Commission agent report received from the agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionReportIn {
    #[serde(flatten)]
    pub document: DocumentFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub positions: Option<MetaArray<DocumentPosition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission_period_start: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission_period_end: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commitent_sum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward_percent: Option<f64>,
}

document!(
    CommissionReportIn,
    MetaType::CommissionReportIn,
    "entity/commissionreportin",
    positions
);
impl OperationIn for CommissionReportIn {}

/// Cash register shift; has no positions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetailShift {
    #[serde(flatten)]
    pub document: DocumentFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retail_store: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_date: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proceeds_cash: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proceeds_no_cash: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_cash: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_no_cash: Option<f64>,
}

document!(RetailShift, MetaType::RetailShift, "entity/retailshift");
impl OperationIn for RetailShift {}

/// Return from a customer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesReturn {
    #[serde(flatten)]
    pub document: DocumentFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub positions: Option<MetaArray<DocumentPosition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demand: Option<EntityRef>,
}

document!(SalesReturn, MetaType::SalesReturn, "entity/salesreturn", positions);
impl OperationOut for SalesReturn {}

/// Goods receipt from a supplier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supply {
    #[serde(flatten)]
    pub document: DocumentFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub positions: Option<MetaArray<DocumentPosition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incoming_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incoming_date: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_order: Option<EntityRef>,
}

document!(Supply, MetaType::Supply, "entity/supply", positions);
impl OperationOut for Supply {}

/// Invoice received from a supplier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceIn {
    #[serde(flatten)]
    pub document: DocumentFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub positions: Option<MetaArray<DocumentPosition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incoming_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incoming_date: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_planned_moment: Option<Timestamp>,
}

document!(InvoiceIn, MetaType::InvoiceIn, "entity/invoicein", positions);
impl OperationOut for InvoiceIn {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrder {
    #[serde(flatten)]
    pub document: DocumentFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub positions: Option<MetaArray<DocumentPosition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_planned_moment: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoiced_sum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipped_sum: Option<f64>,
}

document!(PurchaseOrder, MetaType::PurchaseOrder, "entity/purchaseorder", positions);
impl OperationOut for PurchaseOrder {}

/// Commission agent report issued to the principal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionReportOut {
    #[serde(flatten)]
    pub document: DocumentFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub positions: Option<MetaArray<DocumentPosition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission_period_start: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission_period_end: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commitent_sum: Option<f64>,
}

document!(
    CommissionReportOut,
    MetaType::CommissionReportOut,
    "entity/commissionreportout",
    positions
);
impl OperationOut for CommissionReportOut {}
