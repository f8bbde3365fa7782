use anyhow::Context;
use tracing::{info, instrument};

use crate::{
    listings::{
        query::FeedQuery,
        repo_types::{Listing, ListingsFeed, NewListing},
    },
    metrics::Metrics,
    store::Store,
};

#[derive(Clone)]
pub struct ListingService {
    store: Store,
    metrics: Metrics,
}

impl ListingService {
    pub fn new(store: Store, metrics: Metrics) -> Self {
        Self { store, metrics }
    }

    #[instrument(skip(self, new), fields(price = new.price))]
    pub async fn create(&self, user_id: i64, new: NewListing) -> anyhow::Result<Listing> {
        let listing = self
            .store
            .run_in_transaction::<_, anyhow::Error, _>(move |db| {
                Box::pin(async move {
                    let listing = Listing::create(db, user_id, &new)
                        .await
                        .context("insert listing")?;
                    Ok(listing)
                })
            })
            .await?;

        self.metrics.listing_created();
        info!(listing_id = listing.id, "listing created");
        Ok(listing)
    }

    #[instrument(skip(self))]
    pub async fn feed(&self, query: &FeedQuery) -> anyhow::Result<ListingsFeed> {
        Listing::feed(&mut self.store.db(), query)
            .await
            .context("load listings feed")
    }
}
