pub mod defs;
pub mod store;

pub use defs::{Article, ArticleStatus, Source, Summary};
pub use store::{ArticleStore, StoreError, StoreResult};
