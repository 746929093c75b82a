//! Integration tests for `DieselRepository` against embedded PostgreSQL.
//!
//! The same repository contract the in-memory adapter is held to, run
//! through rendered SQL on a real database. Tests are synchronous and drive
//! the adapter on a dedicated Tokio runtime, because the embedded cluster
//! must be bootstrapped outside any runtime.

use std::sync::Arc;

use mockable::Clock;
use pagination::PageRequest;
use pg_embedded_setup_unpriv::TemporaryDatabase;
use rstest::{fixture, rstest};
use tokio::runtime::Runtime;

use storefront::domain::entity::{Entity, EntityId, FieldValue, Patch};
use storefront::domain::filter::{Condition, Direction, FilterSpec, QuerySpec};
use storefront::domain::ports::{Repository, RepositoryError};
use storefront::domain::{NewProduct, NewUser, Product, ProductField, User};
use storefront::outbound::persistence::{DbPool, DieselRepository, PoolConfig};
use storefront::test_support::MutableClock;

#[path = "support/embedded_postgres.rs"]
mod embedded_postgres;

use embedded_postgres::{handle_cluster_setup_failure, migrated_database};

struct TestContext {
    runtime: Runtime,
    clock: Arc<MutableClock>,
    products: DieselRepository<Product>,
    users: DieselRepository<User>,
    _database: TemporaryDatabase,
}

fn setup_context() -> Result<TestContext, String> {
    let runtime = Runtime::new().map_err(|err| err.to_string())?;
    let database = migrated_database(&runtime)?;
    let database_url = database.url().to_string();

    let config = PoolConfig::new(&database_url)
        .with_max_size(2)
        .with_min_idle(Some(1));
    let pool = runtime
        .block_on(async { DbPool::new(config).await })
        .map_err(|err| err.to_string())?;

    let clock = Arc::new(MutableClock::at_epoch());
    let products = DieselRepository::new(pool.clone(), clock.clone());
    let users = DieselRepository::new(pool, clock.clone());

    Ok(TestContext {
        runtime,
        clock,
        products,
        users,
        _database: database,
    })
}

#[fixture]
fn context() -> Option<TestContext> {
    match setup_context() {
        Ok(ctx) => Some(ctx),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

fn draft(name: &str, price: f64) -> NewProduct {
    NewProduct {
        name: name.to_owned(),
        description: Some(format!("{name} description")),
        price,
    }
}

fn user(email: &str) -> NewUser {
    NewUser {
        name: "Ada".into(),
        email: email.into(),
        password_hash: "$2b$04$hash".into(),
    }
}

fn id(raw: i64) -> EntityId {
    EntityId::new(raw).expect("positive id")
}

async fn seed(repo: &DieselRepository<Product>, count: usize) -> Vec<Product> {
    let drafts = (1..=count)
        .map(|n| draft(&format!("Product {n:02}"), n as f64))
        .collect();
    repo.create(drafts).await.expect("seed products")
}

#[rstest]
fn create_then_get_by_ids_round_trips(context: Option<TestContext>) {
    let Some(ctx) = context else {
        eprintln!("SKIP-TEST-CLUSTER: create_then_get_by_ids_round_trips skipped");
        return;
    };
    let drafts = vec![
        draft("Widget", 9.99),
        NewProduct {
            name: "Gadget".into(),
            description: None,
            price: 0.0,
        },
    ];

    ctx.runtime.block_on(async {
        let created = ctx.products.create(drafts.clone()).await.expect("create");
        let ids: Vec<EntityId> = created.iter().map(Entity::id).collect();
        let fetched = ctx.products.get_by_ids(&ids).await.expect("fetch");

        assert_eq!(fetched, created);
        for (product, draft) in fetched.iter().zip(&drafts) {
            assert!(product.id().get() > 0);
            assert_eq!(product.name(), draft.name);
            assert_eq!(product.description(), draft.description.as_deref());
            assert_eq!(product.price(), draft.price);
            assert_eq!(product.timestamps().created_at, ctx.clock.utc());
            assert_eq!(product.timestamps().updated_at, ctx.clock.utc());
            assert!(!product.timestamps().is_deleted());
        }
    });
}

#[rstest]
fn get_by_ids_is_strict(context: Option<TestContext>) {
    let Some(ctx) = context else {
        eprintln!("SKIP-TEST-CLUSTER: get_by_ids_is_strict skipped");
        return;
    };

    ctx.runtime.block_on(async {
        seed(&ctx.products, 2).await;

        let empty = ctx.products.get_by_ids(&[]).await.expect_err("empty request");
        assert!(matches!(empty, RepositoryError::InvalidArgument { .. }));

        let missing = ctx
            .products
            .get_by_ids(&[id(1), id(9)])
            .await
            .expect_err("unknown id");
        assert_eq!(missing, RepositoryError::not_found("product not found: 9"));
    });
}

#[rstest]
fn range_filters_are_inclusive_and_totals_follow_filters(context: Option<TestContext>) {
    let Some(ctx) = context else {
        eprintln!("SKIP-TEST-CLUSTER: range_filters_are_inclusive skipped");
        return;
    };
    let spec = QuerySpec {
        filters: FilterSpec::new().with("price", Condition::between(2.0, 4.0)),
        columns: vec!["id".into(), "price".into()],
        ..QuerySpec::default()
    };

    ctx.runtime.block_on(async {
        seed(&ctx.products, 7).await;

        let page = ctx.products.get_all(&spec).await.expect("filtered page");

        let prices: Vec<FieldValue> = page
            .items
            .iter()
            .filter_map(|record| record.get("price").cloned())
            .collect();
        assert_eq!(
            prices,
            vec![
                FieldValue::Float(2.0),
                FieldValue::Float(3.0),
                FieldValue::Float(4.0)
            ]
        );
        assert_eq!(page.info.total, 3);
        assert_eq!(ctx.products.count(&spec).await.expect("count"), 3);
        assert_eq!(
            page.items[0].columns().collect::<Vec<_>>(),
            vec!["id", "price"]
        );
    });
}

#[rstest]
#[case(1)]
#[case(3)]
#[case(7)]
#[case(10)]
fn pages_partition_the_result_set(context: Option<TestContext>, #[case] limit: u32) {
    let Some(ctx) = context else {
        eprintln!("SKIP-TEST-CLUSTER: pages_partition_the_result_set skipped");
        return;
    };
    let spec_for = |page: u32| QuerySpec {
        page: PageRequest::new(page, limit).expect("page"),
        order_by: vec![("price".into(), Direction::Desc)],
        ..QuerySpec::default()
    };

    ctx.runtime.block_on(async {
        seed(&ctx.products, 7).await;
        let first = ctx.products.get_all(&spec_for(1)).await.expect("first page");

        let mut seen = Vec::new();
        for page in 1..=u32::try_from(first.info.total_page).expect("page count") {
            let result = ctx.products.get_all(&spec_for(page)).await.expect("page");
            assert!(result.items.len() <= limit as usize);
            seen.extend(
                result
                    .items
                    .iter()
                    .filter_map(|record| record.get("id").cloned()),
            );
        }

        assert_eq!(first.info.total, 7);
        let expected: Vec<FieldValue> = (1..=7).rev().map(FieldValue::Integer).collect();
        assert_eq!(seen, expected);
    });
}

#[rstest]
fn updated_at_strictly_increases_even_when_the_clock_stalls(context: Option<TestContext>) {
    let Some(ctx) = context else {
        eprintln!("SKIP-TEST-CLUSTER: updated_at_strictly_increases skipped");
        return;
    };

    ctx.runtime.block_on(async {
        let created = seed(&ctx.products, 1).await;
        let mut previous = created[0].timestamps().updated_at;

        for price in [10.0, 20.0] {
            let mut tx = ctx.products.begin().await.expect("begin");
            let updated = ctx
                .products
                .update(
                    &mut tx,
                    vec![Patch::for_id(id(1)).set(ProductField::Price, price)],
                )
                .await
                .expect("update");
            ctx.products.commit(&mut tx).await.expect("commit");

            let stamp = updated[0].timestamps().updated_at;
            assert!(stamp > previous, "{stamp} should follow {previous}");
            previous = stamp;
        }

        ctx.clock.advance_seconds(60);
        let mut tx = ctx.products.begin().await.expect("begin");
        ctx.products
            .update(
                &mut tx,
                vec![Patch::for_id(id(1)).set(ProductField::Name, "Renamed")],
            )
            .await
            .expect("update");
        ctx.products.commit(&mut tx).await.expect("commit");

        let stored = ctx
            .products
            .find_by_id(id(1))
            .await
            .expect("lookup")
            .expect("present");
        assert_eq!(stored.timestamps().updated_at, ctx.clock.utc());
        assert_eq!(stored.timestamps().created_at, created[0].timestamps().created_at);
        assert_eq!(stored.price(), 20.0);
        assert_eq!(stored.name(), "Renamed");
    });
}

#[rstest]
fn duplicate_emails_are_conflicts(context: Option<TestContext>) {
    let Some(ctx) = context else {
        eprintln!("SKIP-TEST-CLUSTER: duplicate_emails_are_conflicts skipped");
        return;
    };

    ctx.runtime.block_on(async {
        ctx.users
            .create(vec![user("ada@example.com")])
            .await
            .expect("first user");

        let repeated = ctx
            .users
            .create(vec![user("ada@example.com")])
            .await
            .expect_err("duplicate email");
        assert!(matches!(repeated, RepositoryError::Conflict { .. }));

        let batch = ctx
            .users
            .create(vec![user("grace@example.com"), user("grace@example.com")])
            .await
            .expect_err("duplicate within batch");
        assert!(matches!(batch, RepositoryError::Conflict { .. }));

        assert_eq!(
            ctx.users.count(&QuerySpec::default()).await.expect("count"),
            1
        );
    });
}

#[rstest]
fn rollback_discards_staged_writes(context: Option<TestContext>) {
    let Some(ctx) = context else {
        eprintln!("SKIP-TEST-CLUSTER: rollback_discards_staged_writes skipped");
        return;
    };

    ctx.runtime.block_on(async {
        seed(&ctx.products, 1).await;

        let mut tx = ctx.products.begin().await.expect("begin");
        ctx.products
            .insert(&mut tx, vec![draft("Discarded", 3.0)])
            .await
            .expect("insert");
        ctx.products
            .update(
                &mut tx,
                vec![Patch::for_id(id(1)).set(ProductField::Price, 99.0)],
            )
            .await
            .expect("update");
        ctx.products.rollback(&mut tx).await.expect("rollback");

        assert_eq!(
            ctx.products.count(&QuerySpec::default()).await.expect("count"),
            1
        );
        let kept = ctx
            .products
            .find_by_id(id(1))
            .await
            .expect("lookup")
            .expect("present");
        assert_eq!(kept.price(), 1.0);
    });
}

#[rstest]
fn soft_deleted_rows_leave_listings_but_stay_addressable(context: Option<TestContext>) {
    let Some(ctx) = context else {
        eprintln!("SKIP-TEST-CLUSTER: soft_deleted_rows_leave_listings skipped");
        return;
    };

    ctx.runtime.block_on(async {
        seed(&ctx.products, 2).await;

        let mut tx = ctx.products.begin().await.expect("begin");
        ctx.products
            .update(
                &mut tx,
                vec![Patch::for_id(id(1)).set(ProductField::DeletedAt, ctx.clock.utc())],
            )
            .await
            .expect("soft delete");
        ctx.products.commit(&mut tx).await.expect("commit");

        let listed = ctx.products.get_all(&QuerySpec::default()).await.expect("list");
        assert_eq!(listed.info.total, 1);
        assert!(
            ctx.products
                .find_by_id(id(1))
                .await
                .expect("lookup")
                .is_some()
        );

        let all = ctx
            .products
            .get_all(&QuerySpec {
                include_deleted: true,
                ..QuerySpec::default()
            })
            .await
            .expect("list");
        assert_eq!(all.info.total, 2);
    });
}

#[rstest]
fn backslashes_in_patterns_match_themselves(context: Option<TestContext>) {
    let Some(ctx) = context else {
        eprintln!("SKIP-TEST-CLUSTER: backslashes_in_patterns_match_themselves skipped");
        return;
    };
    let spec = QuerySpec {
        filters: FilterSpec::new().with("name", Condition::exact(r"%h\t%")),
        columns: vec!["name".into()],
        ..QuerySpec::default()
    };

    ctx.runtime.block_on(async {
        ctx.products
            .create(vec![draft(r"Path\to", 1.0), draft("Pathto", 2.0)])
            .await
            .expect("create");

        let page = ctx.products.get_all(&spec).await.expect("filtered page");

        let names: Vec<FieldValue> = page
            .items
            .iter()
            .filter_map(|record| record.get("name").cloned())
            .collect();
        assert_eq!(names, vec![FieldValue::Text(r"Path\to".into())]);
    });
}
