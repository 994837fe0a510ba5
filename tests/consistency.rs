mod common;

use common::{article, setup, user};
use conduit_relations::relation::{CounterReport, FAVORITED_USERS, RelationError};
use tokio_test::assert_ok;

#[tokio::test]
async fn test_check_reports_consistent_counter() {
    let (_, relations) = setup(3, 1).await;
    let mut a = article(1, 1);

    for id in 1..=3 {
        assert_ok!(relations.favorites.add_favorite(&mut a, &user(id)).await);
    }

    let report = relations.checker.check(&FAVORITED_USERS, a.id).await.unwrap();
    assert_eq!(
        report,
        CounterReport {
            owner: 1,
            stored: 3,
            actual: 3
        }
    );
    assert!(report.is_consistent());
}

#[tokio::test]
async fn test_check_detects_overwritten_counter() {
    let (storage, relations) = setup(2, 1).await;
    let mut a = article(1, 1);
    assert_ok!(relations.favorites.add_favorite(&mut a, &user(1)).await);

    storage
        .overwrite_counter(&FAVORITED_USERS, a.id, 5)
        .await
        .unwrap();

    let report = relations.checker.check(&FAVORITED_USERS, a.id).await.unwrap();
    assert!(!report.is_consistent());
    assert_eq!(report.stored, 5);
    assert_eq!(report.actual, 1);
}

#[tokio::test]
async fn test_snapshot_trusts_stored_counter() {
    let (storage, relations) = setup(1, 1).await;
    storage
        .overwrite_counter(&FAVORITED_USERS, 1, 4)
        .await
        .unwrap();

    let snapshot = relations
        .checker
        .snapshot(&FAVORITED_USERS, 1, None)
        .await
        .unwrap();

    assert_eq!(snapshot.count, 4);
    // read paths never repair the counter
    let report = relations.checker.check(&FAVORITED_USERS, 1).await.unwrap();
    assert_eq!(report.stored, 4);
}

#[tokio::test]
async fn test_scan_lists_drifted_articles() {
    let (storage, relations) = setup(2, 3).await;
    let mut first = article(1, 1);
    let mut second = article(2, 1);
    assert_ok!(relations.favorites.add_favorite(&mut first, &user(1)).await);
    assert_ok!(relations.favorites.add_favorite(&mut second, &user(2)).await);

    assert!(relations.checker.scan(&FAVORITED_USERS).await.unwrap().is_empty());

    storage
        .overwrite_counter(&FAVORITED_USERS, 3, 2)
        .await
        .unwrap();

    let drifted = relations.checker.scan(&FAVORITED_USERS).await.unwrap();
    assert_eq!(
        drifted,
        vec![CounterReport {
            owner: 3,
            stored: 2,
            actual: 0
        }]
    );
}

#[tokio::test]
async fn test_check_missing_article_is_a_read_error() {
    let (_, relations) = setup(1, 1).await;

    let result = relations.checker.check(&FAVORITED_USERS, 42).await;

    assert!(matches!(result, Err(RelationError::Read(_))));
}
