//! Feed query composition.
//!
//! Every user-supplied value is bound as a parameter; the only text spliced
//! into the SQL comes from the closed [`SortBy`] / [`SortOrder`] enums. One
//! [`QueryBuilder`] numbers all placeholders so filters and the trailing
//! `LIMIT` / `OFFSET` share a single counter.

use std::str::FromStr;

use sqlx::{Postgres, QueryBuilder};
use thiserror::Error;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

const SELECT_LISTINGS: &str = "SELECT l.id, l.user_id, l.title, l.description, l.image_url, \
     l.price, l.created_at, u.login AS author_login \
     FROM listings l JOIN users u ON u.id = l.user_id";

const COUNT_LISTINGS: &str = "SELECT COUNT(*) FROM listings l";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
    #[default]
    CreatedAt,
    Price,
}

impl FromStr for SortBy {
    type Err = FeedQueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "createdAt" => Ok(SortBy::CreatedAt),
            "price" => Ok(SortBy::Price),
            _ => Err(FeedQueryError::InvalidSortBy),
        }
    }
}

impl SortBy {
    pub fn column(self) -> &'static str {
        match self {
            SortBy::CreatedAt => "l.created_at",
            SortBy::Price => "l.price",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = FeedQueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(FeedQueryError::InvalidSortOrder),
        }
    }
}

impl SortOrder {
    pub fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FeedQueryError {
    #[error("page must be a whole number of at least 1")]
    InvalidPage,

    #[error("limit must be a whole number between 1 and 100")]
    InvalidLimit,

    #[error("sortBy must be createdAt or price")]
    InvalidSortBy,

    #[error("sortOrder must be asc or desc")]
    InvalidSortOrder,

    #[error("prices must be whole numbers")]
    InvalidPrice,

    #[error("prices must not be negative")]
    NegativePrice,

    #[error("maxPrice must not be less than minPrice")]
    InvalidPriceRange,
}

/// Parameters of one feed page. A price bound of 0 means "no bound".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    pub caller: Option<i64>,
    pub page: i64,
    pub limit: i64,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub min_price: i64,
    pub max_price: i64,
}

impl FeedQuery {
    pub fn new(page: i64, limit: i64) -> Result<Self, FeedQueryError> {
        if page < 1 {
            return Err(FeedQueryError::InvalidPage);
        }
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(FeedQueryError::InvalidLimit);
        }
        Ok(Self {
            caller: None,
            page,
            limit,
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
            min_price: 0,
            max_price: 0,
        })
    }

    pub fn sort(mut self, sort_by: SortBy, sort_order: SortOrder) -> Self {
        self.sort_by = sort_by;
        self.sort_order = sort_order;
        self
    }

    pub fn price_range(mut self, min_price: i64, max_price: i64) -> Result<Self, FeedQueryError> {
        if min_price < 0 || max_price < 0 {
            return Err(FeedQueryError::NegativePrice);
        }
        if min_price > 0 && max_price > 0 && max_price < min_price {
            return Err(FeedQueryError::InvalidPriceRange);
        }
        self.min_price = min_price;
        self.max_price = max_price;
        Ok(self)
    }

    /// Only positive ids identify a caller.
    pub fn for_caller(mut self, caller: Option<i64>) -> Self {
        self.caller = caller.filter(|id| *id > 0);
        self
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn is_owner(&self, user_id: i64) -> bool {
        self.caller == Some(user_id)
    }

    /// `SELECT ... WHERE ... ORDER BY ... LIMIT $n OFFSET $n+1`.
    pub fn page_query(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(SELECT_LISTINGS);
        self.push_filters(&mut qb);
        qb.push(" ORDER BY ")
            .push(self.sort_by.column())
            .push(" ")
            .push(self.sort_order.keyword())
            .push(", l.id ")
            .push(self.sort_order.keyword());
        qb.push(" LIMIT ").push_bind(self.limit);
        qb.push(" OFFSET ").push_bind(self.offset());
        qb
    }

    /// Rows matching the same filters, across all pages.
    pub fn count_query(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(COUNT_LISTINGS);
        self.push_filters(&mut qb);
        qb
    }

    fn push_filters(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        let mut sep = " WHERE ";
        if self.min_price > 0 {
            qb.push(sep).push("l.price >= ").push_bind(self.min_price);
            sep = " AND ";
        }
        if self.max_price > 0 {
            qb.push(sep).push("l.price <= ").push_bind(self.max_price);
        }
    }
}
