pub mod apply;
pub mod condition;
pub mod config;
pub mod error;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use apply::{apply_operation, execute_raw};
pub use condition::{Predicate, ToPredicate, build};
pub use config::StoreConfig;
pub use error::StorageError;
pub use sqlite::{SqliteConnectionFactory, SqliteProjectInitializer};
pub use traits::*;
