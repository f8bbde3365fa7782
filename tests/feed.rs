use std::time::Duration;

use anyhow::Result;
use sqlx::PgPool;

use marketplace::{
    auth::AuthService,
    config::{HashConfig, JwtConfig},
    listings::{
        query::{FeedQuery, SortBy, SortOrder},
        repo_types::NewListing,
        ListingService,
    },
    metrics::Metrics,
    store::Store,
};

struct Services {
    auth: AuthService,
    listings: ListingService,
    metrics: Metrics,
}

fn services(pool: PgPool) -> Services {
    let store = Store::new(pool, Duration::from_secs(5));
    let metrics = Metrics::new("marketplace").expect("collectors register");
    Services {
        auth: AuthService::new(
            store.clone(),
            &JwtConfig {
                secret: "integration-secret".into(),
                ttl_minutes: 60,
            },
            HashConfig {
                memory_kib: 1024,
                iterations: 1,
                parallelism: 1,
            },
        ),
        listings: ListingService::new(store, metrics.clone()),
        metrics,
    }
}

fn listing(title: &str, price: i64) -> NewListing {
    NewListing {
        title: title.into(),
        description: "integration fixture".into(),
        image_url: "https://img.example.com/item.jpg".into(),
        price,
    }
}

async fn seed(s: &Services, owner: i64, prices: impl IntoIterator<Item = i64>) -> Result<()> {
    for (i, price) in prices.into_iter().enumerate() {
        s.listings.create(owner, listing(&format!("Item number {i}"), price)).await?;
    }
    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires database"]
async fn pagination_reports_the_full_total(pool: PgPool) -> Result<()> {
    let s = services(pool);
    let owner = s.auth.register("seller", "password123").await?;
    seed(&s, owner.id, (1..=15).map(|i| i * 10)).await?;

    let first = s.listings.feed(&FeedQuery::new(1, 10)?).await?;
    assert_eq!(first.listings.len(), 10);
    assert_eq!(first.total, 15);

    let second = s.listings.feed(&FeedQuery::new(2, 10)?).await?;
    assert_eq!(second.listings.len(), 5);
    assert_eq!(second.total, 15);
    assert_eq!((second.page, second.limit), (2, 10));

    let past_end = s.listings.feed(&FeedQuery::new(3, 10)?).await?;
    assert!(past_end.listings.is_empty());
    assert_eq!(past_end.total, 15);
    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires database"]
async fn price_range_and_sorting(pool: PgPool) -> Result<()> {
    let s = services(pool);
    let owner = s.auth.register("seller", "password123").await?;
    seed(&s, owner.id, [50, 100, 150, 200, 250]).await?;

    let query = FeedQuery::new(1, 10)?
        .sort(SortBy::Price, SortOrder::Asc)
        .price_range(100, 200)?;
    let feed = s.listings.feed(&query).await?;
    let prices: Vec<i64> = feed.listings.iter().map(|l| l.price).collect();
    assert_eq!(prices, vec![100, 150, 200]);
    assert_eq!(feed.total, 3);

    let desc = FeedQuery::new(1, 10)?
        .sort(SortBy::Price, SortOrder::Desc)
        .price_range(0, 150)?;
    let prices: Vec<i64> = s
        .listings
        .feed(&desc)
        .await?
        .listings
        .iter()
        .map(|l| l.price)
        .collect();
    assert_eq!(prices, vec![150, 100, 50]);
    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires database"]
async fn newest_first_by_default(pool: PgPool) -> Result<()> {
    let s = services(pool);
    let owner = s.auth.register("seller", "password123").await?;
    seed(&s, owner.id, [10, 20, 30]).await?;

    let feed = s.listings.feed(&FeedQuery::new(1, 10)?).await?;
    let ids: Vec<i64> = feed.listings.iter().map(|l| l.id).collect();
    let mut sorted = ids.clone();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    assert_eq!(ids, sorted);
    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires database"]
async fn ownership_depends_on_the_caller(pool: PgPool) -> Result<()> {
    let s = services(pool);
    let owner = s.auth.register("seller", "password123").await?;
    let other = s.auth.register("buyer", "password123").await?;
    seed(&s, owner.id, [100]).await?;

    let as_owner = s.listings.feed(&FeedQuery::new(1, 10)?.for_caller(Some(owner.id))).await?;
    assert!(as_owner.listings[0].is_owner);
    assert_eq!(as_owner.listings[0].author_login, "seller");

    let as_other = s.listings.feed(&FeedQuery::new(1, 10)?.for_caller(Some(other.id))).await?;
    assert!(!as_other.listings[0].is_owner);

    let anonymous = s.listings.feed(&FeedQuery::new(1, 10)?).await?;
    assert!(!anonymous.listings[0].is_owner);
    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires database"]
async fn alice_sees_her_own_listing(pool: PgPool) -> Result<()> {
    let s = services(pool);
    s.auth.register("alice", "password123").await?;
    let (_, token) = s.auth.login("alice", "password123").await?;
    let alice = s.auth.validate_token(&token).await?;

    let created = s.listings.create(alice, listing("Vintage bike", 150_000)).await?;
    assert!(created.is_owner);
    assert_eq!(created.author_login, "alice");

    let feed = s.listings.feed(&FeedQuery::new(1, 10)?.for_caller(Some(alice))).await?;
    assert_eq!(feed.total, 1);
    let mine = &feed.listings[0];
    assert_eq!(mine.id, created.id);
    assert_eq!(mine.price, 150_000);
    assert!(mine.is_owner);
    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires database"]
async fn only_stored_listings_are_counted(pool: PgPool) -> Result<()> {
    let s = services(pool);
    let owner = s.auth.register("seller", "password123").await?;
    seed(&s, owner.id, [10, 20]).await?;

    // unknown owner: the insert fails and nothing is counted
    assert!(s.listings.create(owner.id + 1000, listing("Orphan lamp", 5)).await.is_err());

    let text = s.metrics.render()?;
    assert!(text.contains("marketplace_listings_created_total 2"), "{text}");
    Ok(())
}
