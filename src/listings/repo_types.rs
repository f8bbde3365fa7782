use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// Listing row joined with its author's login.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Listing {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub price: i64, // minor units
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub author_login: String,
    // computed per query
    #[sqlx(default)]
    pub is_owner: bool,
}

#[derive(Debug, Clone)]
pub struct NewListing {
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub price: i64,
}

/// One page of the feed plus the number of matching listings overall.
#[derive(Debug, Clone, Serialize)]
pub struct ListingsFeed {
    pub listings: Vec<Listing>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}
