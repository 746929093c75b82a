//! Behavioural coverage of the repository contract on the in-memory
//! adapter.

use super::*;
use crate::domain::entity::Record;
use crate::domain::filter::{Condition, FilterSpec, QuerySpec};
use crate::domain::product::{NewProduct, Product, ProductField};
use crate::domain::user::{NewUser, User};
use crate::test_support::MutableClock;
use chrono::{TimeZone, Utc};
use pagination::PageRequest;
use rstest::{fixture, rstest};

#[fixture]
fn clock() -> Arc<MutableClock> {
    Arc::new(MutableClock::new(
        Utc.timestamp_opt(1_700_000_000, 0).single().expect("timestamp"),
    ))
}

fn draft(name: &str, price: f64) -> NewProduct {
    NewProduct {
        name: name.to_owned(),
        description: Some(format!("{name} description")),
        price,
    }
}

fn id(raw: i64) -> EntityId {
    EntityId::new(raw).expect("positive id")
}

async fn seeded(clock: Arc<MutableClock>, count: usize) -> InMemoryRepository<Product> {
    let repo = InMemoryRepository::<Product>::new(clock);
    let drafts = (1..=count)
        .map(|n| draft(&format!("Product {n:02}"), n as f64))
        .collect();
    repo.create(drafts).await.expect("seed products");
    repo
}

#[rstest]
#[tokio::test]
async fn create_then_get_by_ids_round_trips(clock: Arc<MutableClock>) {
    let repo = InMemoryRepository::<Product>::new(clock);
    let drafts = vec![draft("Widget", 9.99), draft("Gadget", 0.0)];

    let created = repo.create(drafts.clone()).await.expect("create");
    let ids: Vec<EntityId> = created.iter().map(Entity::id).collect();
    let fetched = repo.get_by_ids(&ids).await.expect("fetch");

    assert_eq!(fetched.len(), drafts.len());
    for (product, draft) in fetched.iter().zip(&drafts) {
        assert!(product.id().get() > 0);
        assert_eq!(product.name(), draft.name);
        assert_eq!(product.description(), draft.description.as_deref());
        assert_eq!(product.price(), draft.price);
    }
}

#[rstest]
#[tokio::test]
async fn identifiers_are_never_reused(clock: Arc<MutableClock>) {
    let repo = seeded(clock, 2).await;
    let mut tx = repo.begin().await.expect("begin");
    let removed = repo.delete(&mut tx, &[id(2)]).await.expect("delete");
    repo.commit(&mut tx).await.expect("commit");
    assert!(removed);

    let created = repo.create(vec![draft("Fresh", 1.0)]).await.expect("create");
    assert_eq!(created[0].id(), id(3));
}

#[rstest]
#[case(1)]
#[case(3)]
#[case(4)]
#[case(10)]
#[tokio::test]
async fn pages_partition_the_result_set(clock: Arc<MutableClock>, #[case] limit: u32) {
    let repo = seeded(clock, 7).await;
    let first = repo
        .get_all(&QuerySpec {
            page: PageRequest::new(1, limit).expect("page"),
            ..QuerySpec::default()
        })
        .await
        .expect("first page");

    let mut seen = Vec::new();
    for page in 1..=u32::try_from(first.info.total_page).expect("page count") {
        let spec = QuerySpec {
            page: PageRequest::new(page, limit).expect("page"),
            order_by: vec![("price".into(), Direction::Desc)],
            ..QuerySpec::default()
        };
        let result = repo.get_all(&spec).await.expect("page");
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
}

#[rstest]
#[tokio::test]
async fn range_filters_are_inclusive_and_totals_follow_filters(clock: Arc<MutableClock>) {
    let repo = seeded(clock, 7).await;
    let spec = QuerySpec {
        filters: FilterSpec::new().with("price", Condition::between(2.0, 4.0)),
        columns: vec!["id".into(), "price".into()],
        ..QuerySpec::default()
    };

    let page = repo.get_all(&spec).await.expect("filtered page");

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
    assert_eq!(repo.count(&spec).await.expect("count"), 3);
    assert_eq!(
        page.items[0].columns().collect::<Vec<_>>(),
        vec!["id", "price"]
    );
}

#[rstest]
#[tokio::test]
async fn get_by_ids_is_strict(clock: Arc<MutableClock>) {
    let repo = seeded(clock, 2).await;

    let empty = repo.get_by_ids(&[]).await.expect_err("empty request");
    assert!(matches!(empty, RepositoryError::InvalidArgument { .. }));

    let missing = repo
        .get_by_ids(&[id(1), id(9)])
        .await
        .expect_err("unknown id");
    assert_eq!(missing, RepositoryError::not_found("product not found: 9"));

    let duplicates = repo
        .get_by_ids(&[id(2), id(2), id(1)])
        .await
        .expect("duplicates collapse");
    assert_eq!(duplicates.len(), 2);
}

#[rstest]
#[tokio::test]
async fn get_by_id_projects_requested_fields(clock: Arc<MutableClock>) {
    let repo = seeded(clock, 1).await;

    let record = repo
        .get_by_id(id(1), Some(&["name".to_owned()]))
        .await
        .expect("lookup")
        .expect("present");
    assert_eq!(record.columns().collect::<Vec<_>>(), vec!["name"]);

    let err = repo
        .get_by_id(id(1), Some(&["sku".to_owned()]))
        .await
        .expect_err("unknown field");
    assert_eq!(err, RepositoryError::invalid_field("sku"));

    assert_eq!(repo.get_by_id(id(5), None).await.expect("lookup"), None);
}

#[rstest]
#[tokio::test]
async fn update_merges_only_supplied_fields(clock: Arc<MutableClock>) {
    let repo = seeded(clock.clone(), 1).await;
    let before = repo.find_by_id(id(1)).await.expect("lookup").expect("present");

    let mut tx = repo.begin().await.expect("begin");
    let updated = repo
        .update(
            &mut tx,
            vec![Patch::for_id(id(1)).set(ProductField::Price, 42.0)],
        )
        .await
        .expect("update");
    repo.commit(&mut tx).await.expect("commit");

    let after = repo.find_by_id(id(1)).await.expect("lookup").expect("present");
    assert_eq!(updated, vec![after.clone()]);
    assert_eq!(after.price(), 42.0);
    assert_eq!(after.name(), before.name());
    assert_eq!(after.description(), before.description());
    assert_eq!(after.timestamps().created_at, before.timestamps().created_at);
    assert!(after.timestamps().updated_at > before.timestamps().updated_at);
}

#[rstest]
#[tokio::test]
async fn update_skips_unresolvable_patches(clock: Arc<MutableClock>) {
    let repo = seeded(clock, 1).await;
    let anonymous = Patch {
        id: None,
        changes: vec![(ProductField::Price, FieldValue::Float(1.0))],
    };

    let mut tx = repo.begin().await.expect("begin");
    let updated = repo
        .update(
            &mut tx,
            vec![
                anonymous,
                Patch::for_id(id(99)).set(ProductField::Price, 2.0),
            ],
        )
        .await
        .expect("update");
    repo.commit(&mut tx).await.expect("commit");

    assert!(updated.is_empty());
}

#[rstest]
#[tokio::test]
async fn rollback_discards_staged_writes(clock: Arc<MutableClock>) {
    let repo = seeded(clock, 1).await;

    let mut tx = repo.begin().await.expect("begin");
    repo.insert(&mut tx, vec![draft("Discarded", 3.0)])
        .await
        .expect("insert");
    repo.rollback(&mut tx).await.expect("rollback");

    assert_eq!(repo.count(&QuerySpec::default()).await.expect("count"), 1);
}

#[rstest]
#[tokio::test]
async fn soft_deleted_rows_leave_listings_but_stay_addressable(clock: Arc<MutableClock>) {
    let repo = seeded(clock.clone(), 2).await;
    let mut tx = repo.begin().await.expect("begin");
    repo.update(
        &mut tx,
        vec![Patch::for_id(id(1)).set(ProductField::DeletedAt, clock.utc())],
    )
    .await
    .expect("soft delete");
    repo.commit(&mut tx).await.expect("commit");

    let listed = repo.get_all(&QuerySpec::default()).await.expect("list");
    assert_eq!(listed.info.total, 1);
    assert!(repo.find_by_id(id(1)).await.expect("lookup").is_some());

    let all = repo
        .get_all(&QuerySpec {
            include_deleted: true,
            ..QuerySpec::default()
        })
        .await
        .expect("list");
    assert_eq!(all.info.total, 2);
}

#[rstest]
#[tokio::test]
async fn unique_fields_reject_duplicates_atomically(clock: Arc<MutableClock>) {
    let repo = InMemoryRepository::<User>::new(clock);
    let user = |email: &str| NewUser {
        name: "Ada".into(),
        email: email.into(),
        password_hash: "hash".into(),
    };

    let err = repo
        .create(vec![user("ada@example.com"), user("ada@example.com")])
        .await
        .expect_err("duplicate email");
    assert!(matches!(err, RepositoryError::Conflict { .. }));

    let records: Vec<Record> = repo
        .get_all(&QuerySpec::default())
        .await
        .expect("list")
        .items;
    assert!(records.is_empty());
}
