use crate::{
    listings::{
        query::FeedQuery,
        repo_types::{Listing, ListingsFeed, NewListing},
    },
    store::{Db, StoreError},
};

impl Listing {
    /// Inserts and reads back the row with the author's login in one round trip.
    pub async fn create(db: &mut Db<'_>, user_id: i64, new: &NewListing) -> Result<Listing, StoreError> {
        let mut listing = db
            .fetch_one(
                sqlx::query_as::<_, Listing>(
                    r#"
                    WITH inserted AS (
                        INSERT INTO listings (user_id, title, description, image_url, price)
                        VALUES ($1, $2, $3, $4, $5)
                        RETURNING id, user_id, title, description, image_url, price, created_at
                    )
                    SELECT i.id, i.user_id, i.title, i.description, i.image_url, i.price,
                           i.created_at, u.login AS author_login
                    FROM inserted i
                    JOIN users u ON u.id = i.user_id
                    "#,
                )
                .bind(user_id)
                .bind(&new.title)
                .bind(&new.description)
                .bind(&new.image_url)
                .bind(new.price),
            )
            .await?;
        listing.is_owner = true;
        Ok(listing)
    }

    /// Page and total are read in one unit of work so they agree.
    pub async fn feed(db: &mut Db<'_>, query: &FeedQuery) -> Result<ListingsFeed, StoreError> {
        let query = query.clone();
        db.run_in_transaction::<_, StoreError, _>(move |db| {
            Box::pin(async move {
                let mut count = query.count_query();
                let total = db.fetch_scalar(count.build_query_scalar::<i64>()).await?;

                let mut page = query.page_query();
                let mut listings = db.fetch_all(page.build_query_as::<Listing>()).await?;
                for listing in &mut listings {
                    listing.is_owner = query.is_owner(listing.user_id);
                }

                Ok(ListingsFeed {
                    listings,
                    total,
                    page: query.page,
                    limit: query.limit,
                })
            })
        })
        .await
    }
}
