mod common;

use common::{article, setup, user};
use conduit_relations::relation::{
    FAVORITED_USERS, FOLLOWS, Fault, RelationError, Stage, StorageError, TxPhase,
};
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn test_counter_failure_rolls_back_association() {
    let (storage, relations) = setup(1, 1).await;
    let mut a = article(1, 1);
    let u = user(1);
    storage.inject_fault(Fault::AdjustCounter).await;

    let error = assert_err!(relations.favorites.add_favorite(&mut a, &u).await);

    assert_eq!(error.stage(), Some(Stage::Counter));
    assert!(!relations.favorites.is_favorited(&a, &u).await.unwrap());
    assert_eq!(a.favorites_count, 0);
    let report = relations.checker.check(&FAVORITED_USERS, a.id).await.unwrap();
    assert_eq!(report.stored, 0);
    assert_eq!(report.actual, 0);
}

#[tokio::test]
async fn test_counter_failure_on_remove_restores_row() {
    let (storage, relations) = setup(1, 1).await;
    let mut a = article(1, 1);
    let u = user(1);
    assert_ok!(relations.favorites.add_favorite(&mut a, &u).await);

    storage.inject_fault(Fault::AdjustCounter).await;
    let error = assert_err!(relations.favorites.remove_favorite(&mut a, &u).await);

    assert!(matches!(error, RelationError::Counter { .. }));
    assert!(relations.favorites.is_favorited(&a, &u).await.unwrap());
    assert_eq!(a.favorites_count, 1);
    let report = relations.checker.check(&FAVORITED_USERS, a.id).await.unwrap();
    assert_eq!(report.stored, 1);
    assert!(report.is_consistent());
}

#[tokio::test]
async fn test_failed_rollback_reports_original_stage() {
    let (storage, relations) = setup(1, 1).await;
    let mut a = article(1, 1);
    let u = user(1);
    storage.inject_fault(Fault::AdjustCounter).await;
    storage.inject_fault(Fault::Rollback).await;

    let error = assert_err!(relations.favorites.add_favorite(&mut a, &u).await);

    assert_eq!(error.stage(), Some(Stage::Counter));
    assert!(!relations.favorites.is_favorited(&a, &u).await.unwrap());
    assert_eq!(a.favorites_count, 0);
    let report = relations.checker.check(&FAVORITED_USERS, a.id).await.unwrap();
    assert_eq!(report.stored, 0);
    assert!(report.is_consistent());
}

#[tokio::test]
async fn test_association_failure_leaves_counter_untouched() {
    let (storage, relations) = setup(1, 1).await;
    let mut a = article(1, 1);
    let u = user(1);
    storage.inject_fault(Fault::InsertLink).await;

    let error = assert_err!(relations.favorites.add_favorite(&mut a, &u).await);

    assert_eq!(error.stage(), Some(Stage::Association));
    assert_eq!(a.favorites_count, 0);
    let report = relations.checker.check(&FAVORITED_USERS, a.id).await.unwrap();
    assert_eq!(report.stored, 0);
    assert!(report.is_consistent());
}

#[tokio::test]
async fn test_missing_member_is_an_association_error() {
    let (_, relations) = setup(1, 1).await;
    let mut a = article(1, 1);
    let ghost = user(99);

    let error = assert_err!(relations.favorites.add_favorite(&mut a, &ghost).await);

    assert!(matches!(
        error,
        RelationError::Association {
            source: StorageError::Constraint(_),
            ..
        }
    ));
    assert_eq!(a.favorites_count, 0);
}

#[tokio::test]
async fn test_commit_failure_applies_nothing() {
    let (storage, relations) = setup(1, 1).await;
    let mut a = article(1, 1);
    let u = user(1);
    storage.inject_fault(Fault::Commit).await;

    let error = assert_err!(relations.favorites.add_favorite(&mut a, &u).await);

    assert!(matches!(
        error,
        RelationError::Transaction {
            phase: TxPhase::Commit,
            ..
        }
    ));
    assert_eq!(error.stage(), None);
    assert!(!relations.favorites.is_favorited(&a, &u).await.unwrap());
    assert_eq!(a.favorites_count, 0);
    let report = relations.checker.check(&FAVORITED_USERS, a.id).await.unwrap();
    assert_eq!(report.stored, 0);
}

#[tokio::test]
async fn test_begin_failure_is_a_transaction_error() {
    let (storage, relations) = setup(2, 0).await;
    storage.inject_fault(Fault::Begin).await;

    let error = assert_err!(relations.follows.follow(&user(1), &user(2)).await);

    assert!(matches!(
        error,
        RelationError::Transaction {
            phase: TxPhase::Begin,
            ..
        }
    ));
    assert!(!relations.follows.is_following(&user(1), &user(2)).await.unwrap());
}

#[tokio::test]
async fn test_failed_change_can_be_retried_by_caller() {
    let (storage, relations) = setup(1, 1).await;
    let mut a = article(1, 1);
    let u = user(1);
    storage.inject_fault(Fault::AdjustCounter).await;

    assert_err!(relations.favorites.add_favorite(&mut a, &u).await);
    assert_ok!(relations.favorites.add_favorite(&mut a, &u).await);

    assert_eq!(a.favorites_count, 1);
    let report = relations.checker.check(&FAVORITED_USERS, a.id).await.unwrap();
    assert_eq!(report.stored, 1);
    assert!(report.is_consistent());
}

#[tokio::test]
async fn test_uncounted_relation_never_touches_counter() {
    let (storage, relations) = setup(2, 0).await;
    let alice = user(1);
    let bob = user(2);

    // follows are uncounted, so an armed counter fault never fires
    storage.inject_fault(Fault::AdjustCounter).await;
    assert_ok!(relations.follows.follow(&alice, &bob).await);

    assert!(relations.follows.is_following(&alice, &bob).await.unwrap());
    assert!(matches!(
        relations.checker.check(&FOLLOWS, alice.id).await,
        Err(RelationError::Uncounted("Follows"))
    ));
}
