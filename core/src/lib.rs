//! Typed async client core for the MoySklad JSON API (remap 1.2).
//!
//! # Overview
//! Maps the API's JSON resources onto typed structs and exposes CRUD, report
//! and async-job operations per entity. The network round-trip is delegated
//! to a caller-supplied [`Transport`]; the core builds `HttpRequest` values,
//! hands them over, and parses the `HttpResponse` it gets back.
//!
//! # Design
//! - `Client` holds immutable configuration and a shared transport, so it is
//!   cheap to clone and safe to use from many tasks at once.
//! - Every request goes through one [`RequestBuilder`]; entity services are a
//!   single generic [`EntityService`] parameterized by the [`Entity`] trait.
//! - Long-running reports return an [`AsyncResult`] that polls the job with
//!   `tokio::time` sleeps in the caller's task and never spawns.
//! - Polymorphic document links decode into an [`Operation`] envelope that
//!   keeps its raw JSON and narrows to a concrete document on demand.
//! - Resource kinds form the closed [`MetaType`] registry; an unknown kind is
//!   a decode error.

pub mod application;
pub mod async_result;
pub mod client;
pub mod config;
pub mod documents;
pub mod error;
pub mod http;
pub mod list;
pub mod loss;
pub mod meta;
pub mod operation;
pub mod params;
pub mod payment;
pub mod report_money;
pub mod request;
#[cfg(feature = "reqwest")]
pub mod reqwest_transport;
pub mod service;
pub mod types;

#[cfg(test)]
mod mock;

pub use application::Application;
pub use async_result::{AsyncResult, AsyncService, AsyncState, AsyncTask};
pub use client::Client;
pub use config::{ClientConfig, Credentials, PollPolicy};
pub use documents::{
    CommissionReportIn, CommissionReportOut, CustomerOrder, Demand, DocumentFields,
    DocumentPosition, InvoiceIn, InvoiceOut, PurchaseOrder, PurchaseReturn, RetailShift,
    SalesReturn, Supply,
};
pub use error::{ApiErrorDetail, Error, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};
pub use list::{Context, DeleteManyItem, DeleteManyResponse, List, MetaArray};
pub use loss::{Loss, LossPosition, LossTemplateArg};
pub use meta::{Meta, MetaNameWrapper, MetaType, MetaTyper, MetaWrapper, UnknownMetaType};
pub use operation::{LinkedPayment, Operation, OperationIn, OperationOut, Operations};
pub use params::{Direction, Filter, FilterOperator, Interval, Params};
pub use payment::{PaymentIn, PaymentOut};
pub use report_money::{Money, MoneyPlotSeries, PlotSeriesElement, ReportMoneyService};
pub use request::{RequestBuilder, Response};
#[cfg(feature = "reqwest")]
pub use reqwest_transport::ReqwestTransport;
pub use service::{Entity, EntityService, HasPositions};
pub use types::{Attribute, EntityRef, Metadata, Pack, Rate, State, Timestamp};
