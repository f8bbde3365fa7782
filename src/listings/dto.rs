use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use crate::{
    error::ValidationError,
    listings::{
        query::{FeedQuery, FeedQueryError, SortBy, SortOrder, DEFAULT_LIMIT, DEFAULT_PAGE},
        repo_types::NewListing,
    },
};

pub const MAX_PRICE: i64 = 100_000_000_000;

fn is_valid_image_url(url: &str) -> bool {
    lazy_static! {
        static ref URL_RE: Regex = Regex::new(r"^https?://[^\s/$.?#][^\s]*$").unwrap();
    }
    URL_RE.is_match(url)
}

/// Request body for creating a listing.
#[derive(Debug, Deserialize)]
pub struct CreateListingRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub image_url: String,
    pub price: i64,
}

impl CreateListingRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let title = self.title.chars().count();
        if !(5..=200).contains(&title) {
            return Err(ValidationError::new("title must be 5 to 200 characters"));
        }
        if self.description.chars().count() > 1000 {
            return Err(ValidationError::new("description must be at most 1000 characters"));
        }
        if !is_valid_image_url(&self.image_url) {
            return Err(ValidationError::new("image_url must be an http(s) URL"));
        }
        if !(1..=MAX_PRICE).contains(&self.price) {
            return Err(ValidationError::new("price must be between 1 and 100000000000"));
        }
        Ok(())
    }

    pub fn into_new_listing(self) -> NewListing {
        NewListing {
            title: self.title,
            description: self.description,
            image_url: self.image_url,
            price: self.price,
        }
    }
}

/// `GET /listing/feed` query string. Values stay raw so that an empty
/// parameter (`?page=`) counts as absent and falls back to its default.
#[derive(Debug, Default, Deserialize)]
pub struct FeedParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    #[serde(rename = "sortOrder")]
    pub sort_order: Option<String>,
    #[serde(rename = "minPrice")]
    pub min_price: Option<String>,
    #[serde(rename = "maxPrice")]
    pub max_price: Option<String>,
}

fn present(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_or<T: FromStr>(
    raw: &Option<String>,
    default: T,
    invalid: FeedQueryError,
) -> Result<T, FeedQueryError> {
    match present(raw) {
        Some(s) => s.parse().map_err(|_| invalid),
        None => Ok(default),
    }
}

impl FeedParams {
    pub fn into_query(self, caller: Option<i64>) -> Result<FeedQuery, FeedQueryError> {
        let page = parse_or(&self.page, DEFAULT_PAGE, FeedQueryError::InvalidPage)?;
        let limit = parse_or(&self.limit, DEFAULT_LIMIT, FeedQueryError::InvalidLimit)?;
        let sort_by: SortBy = present(&self.sort_by).map_or(Ok(SortBy::default()), str::parse)?;
        let sort_order: SortOrder = present(&self.sort_order).map_or(Ok(SortOrder::default()), str::parse)?;
        let min_price = parse_or(&self.min_price, 0, FeedQueryError::InvalidPrice)?;
        let max_price = parse_or(&self.max_price, 0, FeedQueryError::InvalidPrice)?;

        Ok(FeedQuery::new(page, limit)?
            .sort(sort_by, sort_order)
            .price_range(min_price, max_price)?
            .for_caller(caller))
    }
}
