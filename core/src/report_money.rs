//! Money report: balances by account and cash flow series.

use serde::{Deserialize, Serialize};

use crate::async_result::AsyncResult;
use crate::client::Client;
use crate::error::Result;
use crate::list::{Context, List};
use crate::meta::{Meta, MetaNameWrapper, MetaType, MetaTyper};
use crate::params::Params;
use crate::request::Response;

pub const ENDPOINT_PLOT_SERIES: &str = "report/money/plotseries";
pub const ENDPOINT_BY_ACCOUNT: &str = "report/money/byaccount";

/// Balance of one bank account or cash desk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Money {
    /// Absent for the cash desk; an organization has only one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<MetaNameWrapper>,
    pub organization: MetaNameWrapper,
    pub balance: f64,
}

impl MetaTyper for Money {
    const META_TYPE: MetaType = MetaType::ReportMoney;
}

/// Cash flow over a period, bucketed by `interval`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoneyPlotSeries {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
    pub meta: Meta,
    #[serde(default)]
    pub series: Vec<PlotSeriesElement>,
    pub credit: f64,
    pub debit: f64,
}

impl MetaTyper for MoneyPlotSeries {
    const META_TYPE: MetaType = MetaType::ReportMoneyPlotSeries;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotSeriesElement {
    pub date: String,
    pub credit: f64,
    pub debit: f64,
    /// `credit - debit` for the bucket.
    pub balance: f64,
}

pub struct ReportMoneyService<'c> {
    client: &'c Client,
}

impl<'c> ReportMoneyService<'c> {
    pub(crate) fn new(client: &'c Client) -> Self {
        Self { client }
    }

    /// Expects `momentFrom`, `momentTo` and `interval` in `params`.
    pub async fn get_plot_series(&self, params: Option<Params>) -> Result<MoneyPlotSeries> {
        self.client
            .request(ENDPOINT_PLOT_SERIES)
            .maybe_params(params)
            .get()
            .await
            .map(Response::into_data)
    }

    pub async fn get_money(&self) -> Result<List<Money>> {
        self.client
            .request(ENDPOINT_BY_ACCOUNT)
            .get()
            .await
            .map(Response::into_data)
    }

    pub async fn get_plot_series_async(
        &self,
        params: Option<Params>,
    ) -> Result<AsyncResult<MoneyPlotSeries>> {
        self.client
            .request(ENDPOINT_PLOT_SERIES)
            .maybe_params(params)
            .get_async()
            .await
    }

    pub async fn get_money_async(&self) -> Result<AsyncResult<List<Money>>> {
        self.client.request(ENDPOINT_BY_ACCOUNT).get_async().await
    }
}
