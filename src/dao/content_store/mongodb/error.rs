//! Error types shared by the MongoDB storage implementation.

use mongodb::error::{Error as MongoError, ErrorKind};
use thiserror::Error;

/// Convenient result alias returning [`MongoDaoError`] failures.
pub type MongoResult<T> = Result<T, MongoDaoError>;

/// Failures that can occur while interacting with MongoDB.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("missing MongoDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to write `{id}` into collection `{collection}`")]
    Save {
        collection: &'static str,
        id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to read from collection `{collection}`")]
    Load {
        collection: &'static str,
        #[source]
        source: MongoError,
    },
    /// A stored document no longer deserializes into its model.
    #[error("undecodable document in collection `{collection}`")]
    Decode {
        collection: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to delete `{id}` from collection `{collection}`")]
    Delete {
        collection: &'static str,
        id: String,
        #[source]
        source: MongoError,
    },
    #[error("stored document `{id}` in `{collection}` has an invalid identifier")]
    InvalidId {
        collection: &'static str,
        id: String,
    },
}

impl MongoDaoError {
    /// Classify a read failure: BSON deserialization errors mean corrupt data, anything else a failed read.
    pub fn load(collection: &'static str, source: MongoError) -> Self {
        if matches!(*source.kind, ErrorKind::BsonDeserialization(..)) {
            MongoDaoError::Decode { collection, source }
        } else {
            MongoDaoError::Load { collection, source }
        }
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::{deserialize_from_document as from_document, doc};
    use serde::Deserialize;

    use super::*;
    use crate::dao::storage::StorageError;

    #[derive(Debug, Deserialize)]
    struct Stored {
        #[allow(dead_code)]
        code: String,
    }

    #[test]
    fn bson_decode_failures_are_corrupt_records() {
        let decode = from_document::<Stored>(doc! { "other": 1 }).unwrap_err();
        let err = MongoDaoError::load("snippets", MongoError::from(decode));

        assert!(matches!(err, MongoDaoError::Decode { .. }));
        assert!(matches!(
            StorageError::from(err),
            StorageError::Corrupt { .. }
        ));
    }
}
