mod article;
mod user;

pub use article::{Article, ArticleDto, ArticleResponse};
pub use user::{ProfileDto, ProfileResponse, User};
