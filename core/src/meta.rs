//! Resource descriptors and the discriminator registry.
//!
//! # Design
//! Every resource embeds a `meta` object whose `type` field names the
//! resource kind. [`MetaType`] is the closed set of kinds this crate knows;
//! the mapping to and from the wire strings is one static table, so decode
//! and dispatch can never disagree. A discriminator missing from the table
//! fails to decode instead of being coerced to a fallback kind.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

pub const MEDIA_TYPE_JSON: &str = "application/json";

/// Resource kind discriminator (the `meta.type` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetaType {
    Account,
    Application,
    Assortment,
    Async,
    AttributeMetadata,
    BonusProgram,
    BonusTransaction,
    Bundle,
    CashIn,
    CashOut,
    CommissionReportIn,
    CommissionReportInPosition,
    CommissionReportOut,
    CommissionReportOutPosition,
    CompanySettings,
    Consignment,
    Contract,
    Counterparty,
    Country,
    Currency,
    CustomEntity,
    CustomerOrder,
    CustomerOrderPosition,
    Demand,
    DemandPosition,
    Employee,
    Enter,
    ExpenseItem,
    Files,
    Group,
    Inventory,
    InvoiceIn,
    InvoiceOut,
    InvoicePosition,
    Loss,
    LossPosition,
    Move,
    Organization,
    PaymentIn,
    PaymentOut,
    PriceType,
    Processing,
    Product,
    ProductFolder,
    Project,
    Publication,
    PurchaseOrder,
    PurchaseOrderPosition,
    PurchaseReturn,
    PurchaseReturnPosition,
    Region,
    ReportMoney,
    ReportMoneyPlotSeries,
    RetailDemand,
    RetailSalesReturn,
    RetailShift,
    RetailStore,
    SalesChannel,
    SalesReturn,
    SalesReturnPosition,
    Service,
    Slot,
    State,
    Store,
    Supply,
    SupplyPosition,
    Task,
    Uom,
    Variant,
    Webhook,
}

const REGISTRY: &[(MetaType, &str)] = &[
    (MetaType::Account, "account"),
    (MetaType::Application, "application"),
    (MetaType::Assortment, "assortment"),
    (MetaType::Async, "async"),
    (MetaType::AttributeMetadata, "attributemetadata"),
    (MetaType::BonusProgram, "bonusprogram"),
    (MetaType::BonusTransaction, "bonustransaction"),
    (MetaType::Bundle, "bundle"),
    (MetaType::CashIn, "cashin"),
    (MetaType::CashOut, "cashout"),
    (MetaType::CommissionReportIn, "commissionreportin"),
    (MetaType::CommissionReportInPosition, "commissionreportinposition"),
    (MetaType::CommissionReportOut, "commissionreportout"),
    (MetaType::CommissionReportOutPosition, "commissionreportoutposition"),
    (MetaType::CompanySettings, "companysettings"),
    (MetaType::Consignment, "consignment"),
    (MetaType::Contract, "contract"),
    (MetaType::Counterparty, "counterparty"),
    (MetaType::Country, "country"),
    (MetaType::Currency, "currency"),
    (MetaType::CustomEntity, "customentity"),
    (MetaType::CustomerOrder, "customerorder"),
    (MetaType::CustomerOrderPosition, "customerorderposition"),
    (MetaType::Demand, "demand"),
    (MetaType::DemandPosition, "demandposition"),
    (MetaType::Employee, "employee"),
    (MetaType::Enter, "enter"),
    (MetaType::ExpenseItem, "expenseitem"),
    (MetaType::Files, "files"),
    (MetaType::Group, "group"),
    (MetaType::Inventory, "inventory"),
    (MetaType::InvoiceIn, "invoicein"),
    (MetaType::InvoiceOut, "invoiceout"),
    (MetaType::InvoicePosition, "invoiceposition"),
    (MetaType::Loss, "loss"),
    (MetaType::LossPosition, "lossposition"),
    (MetaType::Move, "move"),
    (MetaType::Organization, "organization"),
    (MetaType::PaymentIn, "paymentin"),
    (MetaType::PaymentOut, "paymentout"),
    (MetaType::PriceType, "pricetype"),
    (MetaType::Processing, "processing"),
    (MetaType::Product, "product"),
    (MetaType::ProductFolder, "productfolder"),
    (MetaType::Project, "project"),
    (MetaType::Publication, "operationpublication"),
    (MetaType::PurchaseOrder, "purchaseorder"),
    (MetaType::PurchaseOrderPosition, "purchaseorderposition"),
    (MetaType::PurchaseReturn, "purchasereturn"),
    (MetaType::PurchaseReturnPosition, "purchasereturnposition"),
    (MetaType::Region, "region"),
    (MetaType::ReportMoney, "money"),
    (MetaType::ReportMoneyPlotSeries, "moneyplotseries"),
    (MetaType::RetailDemand, "retaildemand"),
    (MetaType::RetailSalesReturn, "retailsalesreturn"),
    (MetaType::RetailShift, "retailshift"),
    (MetaType::RetailStore, "retailstore"),
    (MetaType::SalesChannel, "saleschannel"),
    (MetaType::SalesReturn, "salesreturn"),
    (MetaType::SalesReturnPosition, "salesreturnposition"),
    (MetaType::Service, "service"),
    (MetaType::Slot, "slot"),
    (MetaType::State, "state"),
    (MetaType::Store, "store"),
    (MetaType::Supply, "supply"),
    (MetaType::SupplyPosition, "supplyposition"),
    (MetaType::Task, "task"),
    (MetaType::Uom, "uom"),
    (MetaType::Variant, "variant"),
    (MetaType::Webhook, "webhook"),
];

impl MetaType {
    /// Every known kind, in registry order.
    pub fn all() -> impl Iterator<Item = MetaType> {
        REGISTRY.iter().map(|(kind, _)| *kind)
    }

    /// Finds the kind for a wire discriminator.
    pub fn lookup(tag: &str) -> Option<MetaType> {
        REGISTRY
            .iter()
            .find(|(_, name)| *name == tag)
            .map(|(kind, _)| *kind)
    }

    pub fn as_str(&self) -> &'static str {
        REGISTRY
            .iter()
            .find(|(kind, _)| kind == self)
            .map(|(_, name)| *name)
            .unwrap_or_default()
    }
}

impl fmt::Display for MetaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown meta type `{0}`")]
pub struct UnknownMetaType(pub String);

impl FromStr for MetaType {
    type Err = UnknownMetaType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetaType::lookup(s).ok_or_else(|| UnknownMetaType(s.to_string()))
    }
}

impl Serialize for MetaType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MetaType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        tag.parse().map_err(serde::de::Error::custom)
    }
}

/// Implemented by types that always carry one discriminator.
pub trait MetaTyper {
    const META_TYPE: MetaType;
}

/// Resource descriptor: kind plus location.
///
/// On collections the same object also carries the paging context
/// (`size`, `limit`, `offset`, `nextHref`, `previousHref`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub href: String,
    #[serde(rename = "type")]
    pub kind: MetaType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_href: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid_href: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_href: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_href: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_href: Option<String>,
}

impl Meta {
    pub fn new(kind: MetaType, href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            kind,
            metadata_href: None,
            media_type: Some(MEDIA_TYPE_JSON.to_string()),
            uuid_href: None,
            download_href: None,
            size: None,
            limit: None,
            offset: None,
            next_href: None,
            previous_href: None,
        }
    }

    /// Reference to the entity `id` of `kind` under `base_url`.
    pub fn entity(base_url: &str, kind: MetaType, id: Uuid) -> Self {
        Self::new(kind, format!("{base_url}/entity/{kind}/{id}"))
    }

    /// The trailing UUID of `href`, if it has one.
    pub fn id(&self) -> Option<Uuid> {
        self.href
            .split('?')
            .next()
            .and_then(|path| path.rsplit('/').next())
            .and_then(|last| last.parse().ok())
    }
}

/// `{"meta": …}` reference used in request bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaWrapper {
    pub meta: Meta,
}

impl From<Meta> for MetaWrapper {
    fn from(meta: Meta) -> Self {
        Self { meta }
    }
}

/// `{"meta": …, "name": …}` reference used by reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaNameWrapper {
    pub meta: Meta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}
