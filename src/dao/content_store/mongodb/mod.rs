mod config;
mod connection;
mod error;
mod models;
mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoContentStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::InvalidId { .. } | MongoDaoError::Decode { .. } => {
                StorageError::corrupt(err.to_string(), err)
            }
            _ => StorageError::unavailable(err.to_string(), err),
        }
    }
}
