mod article;
mod user;

pub use article::ArticleRepository;
pub use user::UserRepository;
