//! Connection level collection bindings

use bson::{doc, Document};
use mongodb::options::IndexOptions;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::level::ConnectionLevel;

/// Collection name for connection levels
pub const LEVEL_COLLECTION: &str = "connection_levels";

impl IntoIndexes for ConnectionLevel {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // One record per unordered pair
            (
                doc! { "pair_key": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("pair_key_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "user1": 1 },
                Some(IndexOptions::builder().name("user1_index".to_string()).build()),
            ),
            (
                doc! { "user2": 1 },
                Some(IndexOptions::builder().name("user2_index".to_string()).build()),
            ),
        ]
    }
}

impl MutMetadata for ConnectionLevel {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
