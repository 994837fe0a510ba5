mod articles;
mod health;
mod profiles;

pub use articles::{favorite_article, get_article, unfavorite_article};
pub use health::health_check;
pub use profiles::{follow_user, get_profile, unfollow_user};
