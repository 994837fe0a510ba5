mod common;

use std::sync::Arc;

use common::{article, setup, user};
use conduit_relations::relation::{FAVORITED_USERS, MemoryStorage, RelationError, Relations};
use tokio_test::assert_ok;

#[tokio::test]
async fn test_add_favorite_marks_and_counts() {
    let (_, relations) = setup(2, 1).await;
    let mut a = article(1, 2);
    let u = user(1);

    assert_ok!(relations.favorites.add_favorite(&mut a, &u).await);

    assert!(relations.favorites.is_favorited(&a, &u).await.unwrap());
    assert_eq!(a.favorites_count, 1);
    let report = relations.checker.check(&FAVORITED_USERS, a.id).await.unwrap();
    assert_eq!(report.stored, 1);
    assert!(report.is_consistent());
}

#[tokio::test]
async fn test_add_favorite_twice_is_idempotent() {
    let (_, relations) = setup(1, 1).await;
    let mut a = article(1, 1);
    let u = user(1);

    assert_ok!(relations.favorites.add_favorite(&mut a, &u).await);
    assert_ok!(relations.favorites.add_favorite(&mut a, &u).await);

    assert_eq!(a.favorites_count, 1);
    let report = relations.checker.check(&FAVORITED_USERS, a.id).await.unwrap();
    assert_eq!(report.stored, 1);
    assert_eq!(report.actual, 1);
}

#[tokio::test]
async fn test_remove_missing_favorite_is_noop() {
    let (_, relations) = setup(1, 1).await;
    let mut a = article(1, 1);
    let u = user(1);

    assert_ok!(relations.favorites.remove_favorite(&mut a, &u).await);

    assert_eq!(a.favorites_count, 0);
    assert!(!relations.favorites.is_favorited(&a, &u).await.unwrap());
    let report = relations.checker.check(&FAVORITED_USERS, a.id).await.unwrap();
    assert_eq!(report.stored, 0);
    assert!(report.is_consistent());
}

#[tokio::test]
async fn test_stale_article_takes_committed_count() {
    let (_, relations) = setup(1, 1).await;
    let mut stale = article(1, 1);
    let mut fresh = article(1, 1);
    let u = user(1);

    assert_ok!(relations.favorites.add_favorite(&mut fresh, &u).await);
    assert_ok!(relations.favorites.remove_favorite(&mut stale, &u).await);

    assert_eq!(stale.favorites_count, 0);
    let report = relations.checker.check(&FAVORITED_USERS, 1).await.unwrap();
    assert_eq!(report.stored, 0);
    assert!(report.is_consistent());
}

#[tokio::test]
async fn test_stale_article_add_reflects_other_favorites() {
    let (_, relations) = setup(2, 1).await;
    let mut stale = article(1, 1);
    let mut fresh = article(1, 1);
    let first = user(1);
    let second = user(2);

    assert_ok!(relations.favorites.add_favorite(&mut fresh, &first).await);
    assert_ok!(relations.favorites.add_favorite(&mut stale, &second).await);

    assert_eq!(fresh.favorites_count, 1);
    assert_eq!(stale.favorites_count, 2);
}

#[tokio::test]
async fn test_add_then_remove_restores_count() {
    let (_, relations) = setup(2, 1).await;
    let mut a = article(1, 1);
    let other = user(1);
    let u = user(2);

    assert_ok!(relations.favorites.add_favorite(&mut a, &other).await);
    let before = a.favorites_count;

    assert_ok!(relations.favorites.add_favorite(&mut a, &u).await);
    assert_ok!(relations.favorites.remove_favorite(&mut a, &u).await);

    assert_eq!(a.favorites_count, before);
    assert!(!relations.favorites.is_favorited(&a, &u).await.unwrap());
    let report = relations.checker.check(&FAVORITED_USERS, a.id).await.unwrap();
    assert_eq!(report.stored, i64::from(before));
    assert!(report.is_consistent());
}

#[tokio::test]
async fn test_favorites_scenario() {
    let (_, relations) = setup(2, 1).await;
    let mut a = article(1, 1);
    let u1 = user(1);
    let u2 = user(2);

    assert_ok!(relations.favorites.add_favorite(&mut a, &u1).await);
    assert_eq!(a.favorites_count, 1);
    assert!(relations.favorites.is_favorited(&a, &u1).await.unwrap());

    assert_ok!(relations.favorites.add_favorite(&mut a, &u2).await);
    assert_eq!(a.favorites_count, 2);

    assert_ok!(relations.favorites.remove_favorite(&mut a, &u1).await);
    assert_eq!(a.favorites_count, 1);
    assert!(!relations.favorites.is_favorited(&a, &u1).await.unwrap());
    assert!(relations.favorites.is_favorited(&a, &u2).await.unwrap());

    let snapshot = relations
        .checker
        .snapshot(&FAVORITED_USERS, a.id, Some(u2.id))
        .await
        .unwrap();
    assert!(snapshot.related);
    assert_eq!(snapshot.count, 1);
}

#[tokio::test]
async fn test_anonymous_snapshot_is_never_related() {
    let (_, relations) = setup(1, 1).await;
    let mut a = article(1, 1);

    assert_ok!(relations.favorites.add_favorite(&mut a, &user(1)).await);

    let snapshot = relations
        .checker
        .snapshot(&FAVORITED_USERS, a.id, None)
        .await
        .unwrap();
    assert!(!snapshot.related);
    assert_eq!(snapshot.count, 1);
}

#[tokio::test]
async fn test_favorited_among_filters_to_user_favorites() {
    let (_, relations) = setup(1, 3).await;
    let u = user(1);
    let mut first = article(1, 1);
    let mut third = article(3, 1);

    assert_ok!(relations.favorites.add_favorite(&mut first, &u).await);
    assert_ok!(relations.favorites.add_favorite(&mut third, &u).await);

    let mut favorited = relations
        .favorites
        .favorited_among(u.id, &[1, 2, 3])
        .await
        .unwrap();
    favorited.sort();
    assert_eq!(favorited, vec![1, 3]);

    let none = relations.favorites.favorited_among(u.id, &[]).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_favorites_lose_no_updates() {
    const N: i32 = 64;

    let (_, relations) = setup(N, 1).await;
    let relations = Arc::new(relations);

    let handles: Vec<_> = (1..=N)
        .map(|i| {
            let relations = relations.clone();
            tokio::spawn(async move {
                let mut a = article(1, 1);
                let u = user(i);
                relations.favorites.add_favorite(&mut a, &u).await
            })
        })
        .collect();

    for handle in handles {
        assert_ok!(handle.await.expect("task should not panic"));
    }

    let report = relations.checker.check(&FAVORITED_USERS, 1).await.unwrap();
    assert_eq!(report.stored, i64::from(N));
    assert_eq!(report.actual, i64::from(N));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_toggles_keep_counter_consistent() {
    const N: i32 = 32;

    let (_, relations) = setup(N, 1).await;
    let relations = Arc::new(relations);

    let handles: Vec<_> = (1..=N)
        .map(|i| {
            let relations = relations.clone();
            tokio::spawn(async move { toggle(&relations, i).await })
        })
        .collect();

    for handle in handles {
        assert_ok!(handle.await.expect("task should not panic"));
    }

    let report = relations.checker.check(&FAVORITED_USERS, 1).await.unwrap();
    assert_eq!(report.actual, i64::from(N));
    assert!(report.is_consistent());
}

/// Favorites article 1 for user `i`; even users unfavorite and favorite again.
async fn toggle(relations: &Relations<MemoryStorage>, i: i32) -> Result<(), RelationError> {
    let mut a = article(1, 1);
    let u = user(i);

    relations.favorites.add_favorite(&mut a, &u).await?;
    if i % 2 == 0 {
        relations.favorites.remove_favorite(&mut a, &u).await?;
    }
    relations.favorites.add_favorite(&mut a, &u).await
}
