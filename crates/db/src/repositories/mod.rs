//! Repository layer: one unit struct per table group, each method taking a
//! `&PgPool` and returning `sqlx::Error`.

pub mod comment_repo;
pub mod image_repo;
pub mod label_repo;

pub use comment_repo::CommentRepo;
pub use image_repo::ImageRepo;
pub use label_repo::LabelRepo;
