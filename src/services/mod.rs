mod article;
mod auth;
mod profile;

pub use article::ArticleService;
pub use auth::{AuthService, Claims};
pub use profile::ProfileService;
