pub const ARTICLES: &str = "articles";
pub const USERS: &str = "users";

/// Describes one many-to-many relation: the join table holding its rows and,
/// when the relation is counted, the column on the owning row that mirrors
/// the number of members.
///
/// Descriptors are compile-time constants; their identifiers are spliced into
/// SQL and must never come from user input.
#[derive(Debug, PartialEq, Eq)]
pub struct Association {
    pub name: &'static str,
    pub table: &'static str,
    pub owner_table: &'static str,
    pub owner_column: &'static str,
    pub member_table: &'static str,
    pub member_column: &'static str,
    pub counter_column: Option<&'static str>,
}

impl Association {
    pub fn is_counted(&self) -> bool {
        self.counter_column.is_some()
    }
}

/// Articles (owner) favorited by users (member), mirrored in `articles.favorites_count`.
pub static FAVORITED_USERS: Association = Association {
    name: "FavoritedUsers",
    table: "favorites",
    owner_table: ARTICLES,
    owner_column: "article_id",
    member_table: USERS,
    member_column: "user_id",
    counter_column: Some("favorites_count"),
};

/// Follower (owner) to followed user (member). Not counted.
pub static FOLLOWS: Association = Association {
    name: "Follows",
    table: "follows",
    owner_table: USERS,
    owner_column: "follower_id",
    member_table: USERS,
    member_column: "followed_id",
    counter_column: None,
};
