#![allow(dead_code)]

use conduit_relations::{
    models::{Article, User},
    relation::{
        MemoryStorage, Relations,
        association::{ARTICLES, USERS},
    },
};
use time::macros::datetime;

pub fn user(id: i32) -> User {
    User {
        id,
        username: format!("user{id}"),
        email: format!("user{id}@example.com"),
        bio: String::new(),
        image: String::new(),
        created_at: datetime!(2024-01-15 10:30:00 UTC),
        updated_at: datetime!(2024-01-15 10:30:00 UTC),
    }
}

pub fn article(id: i32, author_id: i32) -> Article {
    Article {
        id,
        slug: format!("article-{id}"),
        title: format!("Article {id}"),
        description: String::new(),
        body: "body".to_string(),
        author_id,
        favorites_count: 0,
        created_at: datetime!(2024-01-15 10:30:00 UTC),
        updated_at: datetime!(2024-01-15 10:30:00 UTC),
    }
}

/// In-memory storage holding users `1..=users` and articles `1..=articles`.
pub async fn seeded_storage(users: i32, articles: i32) -> MemoryStorage {
    let storage = MemoryStorage::new();
    for id in 1..=users {
        storage.insert_row(USERS, id).await;
    }
    for id in 1..=articles {
        storage.insert_row(ARTICLES, id).await;
    }
    storage
}

pub async fn setup(users: i32, articles: i32) -> (MemoryStorage, Relations<MemoryStorage>) {
    let storage = seeded_storage(users, articles).await;
    let relations = Relations::new(storage.clone());
    (storage, relations)
}
