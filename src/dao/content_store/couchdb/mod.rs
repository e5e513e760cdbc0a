mod config;
mod error;
mod models;
mod store;

pub use config::CouchConfig;
pub use error::CouchDaoError;
pub use store::CouchContentStore;

use crate::dao::storage::StorageError;

impl From<CouchDaoError> for StorageError {
    fn from(err: CouchDaoError) -> Self {
        match err {
            CouchDaoError::DecodeDocument { .. } => StorageError::corrupt(err.to_string(), err),
            _ => StorageError::unavailable(err.to_string(), err),
        }
    }
}
