//! The operation envelope: a reference to one of several document kinds.
//!
//! # Design
//! A payment lists the documents it pays as `operations`. Each element may be
//! any of a dozen kinds, distinguished only by `meta.type`. [`Operation`]
//! decodes the shared fields and retains the exact JSON text it was decoded
//! from. Narrowing to a concrete kind compares discriminators first and then
//! re-decodes that retained text, so every field of the concrete type is seen
//! even though the envelope itself keeps only a few.
//!
//! The raw text is captured with `serde_json::value::RawValue`, which needs a
//! serde_json deserializer (`from_str`, `from_slice`, `from_reader` or
//! `from_value`). Containers of `Operation` must not use `#[serde(flatten)]`,
//! which buffers the input and loses the raw text, and other formats cannot
//! produce one.

use std::collections::BTreeMap;

use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::value::RawValue;
use uuid::Uuid;

use crate::documents::{
    CommissionReportIn, CommissionReportOut, CustomerOrder, Demand, InvoiceIn, InvoiceOut,
    PurchaseOrder, PurchaseReturn, RetailShift, SalesReturn, Supply,
};
use crate::error::{Error, Result};
use crate::loss::Loss;
use crate::meta::{Meta, MetaType, MetaTyper};
use crate::types::EntityRef;

/// Documents that incoming payments (`paymentin`, `cashin`) can pay.
pub trait OperationIn: MetaTyper + Serialize {}

/// Documents that outgoing payments (`paymentout`, `cashout`) can pay.
pub trait OperationOut: MetaTyper + Serialize {}

/// Payment linked to an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedPayment {
    pub meta: Meta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_sum: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Amount of this payment allotted to the document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_sum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub payments: Vec<LinkedPayment>,
    #[serde(skip)]
    raw: Option<Box<RawValue>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationFields {
    group: Option<EntityRef>,
    meta: Option<Meta>,
    name: Option<String>,
    linked_sum: Option<f64>,
    account_id: Option<Uuid>,
    id: Option<Uuid>,
    #[serde(default)]
    payments: Vec<LinkedPayment>,
}

impl Operation {
    /// Envelope pointing at `meta` with no retained payload.
    pub fn new(meta: Meta) -> Self {
        Self {
            meta: Some(meta),
            ..Self::default()
        }
    }

    /// Decodes the shared fields of `raw` and keeps `raw` for narrowing.
    pub fn from_raw(raw: Box<RawValue>) -> serde_json::Result<Self> {
        let fields: OperationFields = serde_json::from_str(raw.get())?;
        Ok(Self {
            group: fields.group,
            meta: fields.meta,
            name: fields.name,
            linked_sum: fields.linked_sum,
            account_id: fields.account_id,
            id: fields.id,
            payments: fields.payments,
            raw: Some(raw),
        })
    }

    /// Wraps a concrete document; its full serialized form becomes the payload.
    pub fn from_document<D: MetaTyper + Serialize>(document: &D) -> Result<Self> {
        let raw = serde_json::value::to_raw_value(document).map_err(Error::Encode)?;
        Self::from_raw(raw).map_err(Error::Encode)
    }

    pub fn with_linked_sum(mut self, linked_sum: f64) -> Self {
        self.linked_sum = Some(linked_sum);
        self
    }

    pub fn meta_type(&self) -> Option<MetaType> {
        self.meta.as_ref().map(|meta| meta.kind)
    }

    /// The JSON text this envelope was decoded from.
    pub fn raw(&self) -> Option<&[u8]> {
        self.raw.as_deref().map(|raw| raw.get().as_bytes())
    }

    pub fn raw_json(&self) -> Option<&str> {
        self.raw.as_deref().map(RawValue::get)
    }

    pub fn is<T: MetaTyper>(&self) -> bool {
        self.meta_type() == Some(T::META_TYPE)
    }

    /// Re-decodes the payload as `T` when the discriminators match.
    ///
    /// `Ok(None)` on a mismatch or when there is no retained payload; `Err`
    /// when the tags match but the payload does not fit `T`.
    pub fn try_narrow<T: MetaTyper + DeserializeOwned>(&self) -> serde_json::Result<Option<T>> {
        if !self.is::<T>() {
            return Ok(None);
        }
        match self.raw_json() {
            Some(raw) => serde_json::from_str(raw).map(Some),
            None => Ok(None),
        }
    }

    /// Like [`Operation::try_narrow`], logging and discarding decode failures.
    pub fn narrow<T: MetaTyper + DeserializeOwned>(&self) -> Option<T> {
        self.try_narrow().unwrap_or_else(|err| {
            let kind = T::META_TYPE;
            tracing::warn!(%kind, error = %err, "operation payload does not decode as its own kind");
            None
        })
    }

    pub fn as_customer_order(&self) -> Option<CustomerOrder> {
        self.narrow()
    }

    pub fn as_purchase_return(&self) -> Option<PurchaseReturn> {
        self.narrow()
    }

    pub fn as_demand(&self) -> Option<Demand> {
        self.narrow()
    }

    pub fn as_invoice_out(&self) -> Option<InvoiceOut> {
        self.narrow()
    }

    pub fn as_commission_report_in(&self) -> Option<CommissionReportIn> {
        self.narrow()
    }

    pub fn as_retail_shift(&self) -> Option<RetailShift> {
        self.narrow()
    }

    pub fn as_sales_return(&self) -> Option<SalesReturn> {
        self.narrow()
    }

    pub fn as_supply(&self) -> Option<Supply> {
        self.narrow()
    }

    pub fn as_invoice_in(&self) -> Option<InvoiceIn> {
        self.narrow()
    }

    pub fn as_purchase_order(&self) -> Option<PurchaseOrder> {
        self.narrow()
    }

    pub fn as_commission_report_out(&self) -> Option<CommissionReportOut> {
        self.narrow()
    }

    pub fn as_loss(&self) -> Option<Loss> {
        self.narrow()
    }
}

impl<'de> Deserialize<'de> for Operation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Box::<RawValue>::deserialize(deserializer)?;
        Operation::from_raw(raw).map_err(de::Error::custom)
    }
}

impl PartialEq for Operation {
    fn eq(&self, other: &Self) -> bool {
        self.group == other.group
            && self.meta == other.meta
            && self.name == other.name
            && self.linked_sum == other.linked_sum
            && self.account_id == other.account_id
            && self.id == other.id
            && self.payments == other.payments
    }
}

/// Ordered list of operation envelopes, as found on payments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Operations(Vec<Operation>);

impl Operations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, operation: Operation) -> &mut Operation {
        self.0.push(operation);
        let last = self.0.len() - 1;
        &mut self.0[last]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Operation> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Operation] {
        &self.0
    }

    /// Envelopes tagged `kind`, in list order.
    pub fn of_kind(&self, kind: MetaType) -> impl Iterator<Item = &Operation> {
        self.0.iter().filter(move |op| op.meta_type() == Some(kind))
    }

    /// Every envelope of kind `T` narrowed to `T`, in list order.
    pub fn filter<T: MetaTyper + DeserializeOwned>(&self) -> Vec<T> {
        self.0.iter().filter_map(Operation::narrow).collect()
    }

    /// Groups envelopes by discriminator, keeping list order inside each group.
    ///
    /// Envelopes without `meta` are left out.
    pub fn partition(&self) -> BTreeMap<MetaType, Vec<&Operation>> {
        let mut groups: BTreeMap<MetaType, Vec<&Operation>> = BTreeMap::new();
        for op in &self.0 {
            if let Some(kind) = op.meta_type() {
                groups.entry(kind).or_default().push(op);
            }
        }
        groups
    }

    pub fn filter_customer_orders(&self) -> Vec<CustomerOrder> {
        self.filter()
    }

    pub fn filter_purchase_returns(&self) -> Vec<PurchaseReturn> {
        self.filter()
    }

    pub fn filter_demands(&self) -> Vec<Demand> {
        self.filter()
    }

    pub fn filter_invoices_out(&self) -> Vec<InvoiceOut> {
        self.filter()
    }

    pub fn filter_commission_reports_in(&self) -> Vec<CommissionReportIn> {
        self.filter()
    }

    pub fn filter_retail_shifts(&self) -> Vec<RetailShift> {
        self.filter()
    }

    pub fn filter_sales_returns(&self) -> Vec<SalesReturn> {
        self.filter()
    }

    pub fn filter_supplies(&self) -> Vec<Supply> {
        self.filter()
    }

    pub fn filter_invoices_in(&self) -> Vec<InvoiceIn> {
        self.filter()
    }

    pub fn filter_purchase_orders(&self) -> Vec<PurchaseOrder> {
        self.filter()
    }

    pub fn filter_commission_reports_out(&self) -> Vec<CommissionReportOut> {
        self.filter()
    }
}

impl From<Vec<Operation>> for Operations {
    fn from(operations: Vec<Operation>) -> Self {
        Self(operations)
    }
}

impl FromIterator<Operation> for Operations {
    fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Operations {
    type Item = Operation;
    type IntoIter = std::vec::IntoIter<Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Operations {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
