use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::{AuthUser, MaybeAuthUser},
    error::ApiError,
    listings::{
        dto::{CreateListingRequest, FeedParams},
        repo_types::{Listing, ListingsFeed},
        services::ListingService,
    },
    state::AppState,
};

pub fn listing_routes() -> Router<AppState> {
    Router::new()
        .route("/listing", post(create_listing))
        .route("/listing/feed", get(feed))
}

#[instrument(skip_all, fields(user_id = caller.user_id))]
pub async fn create_listing(
    State(listings): State<ListingService>,
    caller: AuthUser,
    payload: Result<Json<CreateListingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Listing>), ApiError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let listing = listings
        .create(caller.user_id, payload.into_new_listing())
        .await?;
    Ok((StatusCode::CREATED, Json(listing)))
}

#[instrument(skip(listings, params))]
pub async fn feed(
    State(listings): State<ListingService>,
    MaybeAuthUser(caller): MaybeAuthUser,
    params: Result<Query<FeedParams>, QueryRejection>,
) -> Result<Json<ListingsFeed>, ApiError> {
    let Query(params) = params?;
    let query = params.into_query(caller)?;

    let feed = listings.feed(&query).await?;
    Ok(Json(feed))
}
