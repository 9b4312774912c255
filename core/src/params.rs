//! Query parameters shared by every endpoint.
//!
//! # Design
//! `Params` is a plain value. Builder methods and [`Params::merge`] follow
//! last-write-wins for scalar keys (`limit`, `offset`, `search`, …); filters
//! accumulate, ordering by an already-ordered field replaces its direction,
//! and expansions accumulate without duplicates. [`Params::to_query`] renders
//! the pairs in a stable order.

use crate::types::Timestamp;

/// Comparison used by a filter predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Greater,
    GreaterOrEquals,
    Lesser,
    LesserOrEquals,
    /// Substring match.
    Like,
    /// Prefix match.
    Prefix,
    /// Suffix match.
    Suffix,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Equals => "=",
            FilterOperator::NotEquals => "!=",
            FilterOperator::Greater => ">",
            FilterOperator::GreaterOrEquals => ">=",
            FilterOperator::Lesser => "<",
            FilterOperator::LesserOrEquals => "<=",
            FilterOperator::Like => "~",
            FilterOperator::Prefix => "~=",
            FilterOperator::Suffix => "=~",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub field: String,
    pub operator: FilterOperator,
    pub value: String,
}

impl Filter {
    fn render(&self) -> String {
        format!("{}{}{}", self.field, self.operator.as_str(), self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

/// Bucket size of report series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Hour,
    Day,
    Month,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Hour => "hour",
            Interval::Day => "day",
            Interval::Month => "month",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    pub limit: Option<u32>,
    pub offset: Option<u64>,
    pub filters: Vec<Filter>,
    pub order: Vec<(String, Direction)>,
    pub expand: Vec<String>,
    pub search: Option<String>,
    pub moment_from: Option<Timestamp>,
    pub moment_to: Option<Timestamp>,
    pub interval: Option<Interval>,
    pub is_async: bool,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn filter(mut self, field: &str, operator: FilterOperator, value: impl ToString) -> Self {
        self.filters.push(Filter {
            field: field.to_string(),
            operator,
            value: value.to_string(),
        });
        self
    }

    pub fn filter_equals(self, field: &str, value: impl ToString) -> Self {
        self.filter(field, FilterOperator::Equals, value)
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        match self.order.iter_mut().find(|(name, _)| name == field) {
            Some(existing) => existing.1 = direction,
            None => self.order.push((field.to_string(), direction)),
        }
        self
    }

    pub fn expand(mut self, field: &str) -> Self {
        if !self.expand.iter().any(|name| name == field) {
            self.expand.push(field.to_string());
        }
        self
    }

    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn moment_from(mut self, moment: Timestamp) -> Self {
        self.moment_from = Some(moment);
        self
    }

    pub fn moment_to(mut self, moment: Timestamp) -> Self {
        self.moment_to = Some(moment);
        self
    }

    pub fn interval(mut self, interval: Interval) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn with_async(mut self) -> Self {
        self.is_async = true;
        self
    }

    /// Applies `other` on top of `self`.
    pub fn merge(mut self, other: Params) -> Self {
        if other.limit.is_some() {
            self.limit = other.limit;
        }
        if other.offset.is_some() {
            self.offset = other.offset;
        }
        self.filters.extend(other.filters);
        for (field, direction) in other.order {
            self = self.order_by(&field, direction);
        }
        for field in other.expand {
            self = self.expand(&field);
        }
        if other.search.is_some() {
            self.search = other.search;
        }
        if other.moment_from.is_some() {
            self.moment_from = other.moment_from;
        }
        if other.moment_to.is_some() {
            self.moment_to = other.moment_to;
        }
        if other.interval.is_some() {
            self.interval = other.interval;
        }
        self.is_async |= other.is_async;
        self
    }

    /// Renders the non-empty keys as unencoded query pairs.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(limit) = self.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            query.push(("offset", offset.to_string()));
        }
        if !self.filters.is_empty() {
            let filter = self.filters.iter().map(Filter::render).collect::<Vec<_>>();
            query.push(("filter", filter.join(";")));
        }
        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|(field, direction)| format!("{field},{}", direction.as_str()))
                .collect::<Vec<_>>();
            query.push(("order", order.join(";")));
        }
        if !self.expand.is_empty() {
            query.push(("expand", self.expand.join(",")));
        }
        if let Some(search) = &self.search {
            query.push(("search", search.clone()));
        }
        if let Some(moment) = self.moment_from {
            query.push(("momentFrom", moment.to_string()));
        }
        if let Some(moment) = self.moment_to {
            query.push(("momentTo", moment.to_string()));
        }
        if let Some(interval) = self.interval {
            query.push(("interval", interval.as_str().to_string()));
        }
        if self.is_async {
            query.push(("async", "true".to_string()));
        }
        query
    }
}
