//! User document schema
//!
//! Only the identity and connection-state fields the leveling service reads
//! and writes. Credentials and profile data belong to the account service.

use bson::{doc, oid::ObjectId, Document};
use chrono::{DateTime, Utc};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// Where a user stands in the connection handshake
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    None,
    PendingSent,
    PendingReceived,
    Connected,
}

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Lowercase unique handle
    pub username: String,

    #[serde(default)]
    pub display_name: String,

    pub email: String,

    #[serde(default)]
    pub connection_status: ConnectionStatus,

    /// Partner, set only while connected
    #[serde(default)]
    pub connected_to: Option<ObjectId>,

    #[serde(default)]
    pub connected_at: Option<DateTime<Utc>>,
}

impl UserDoc {
    pub fn new(username: &str, display_name: &str, email: &str) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            username: username.trim().to_lowercase(),
            display_name: display_name.trim().to_string(),
            email: email.trim().to_lowercase(),
            connection_status: ConnectionStatus::None,
            connected_to: None,
            connected_at: None,
        }
    }

    /// The partner's id if this user is in an established connection
    pub fn partner(&self) -> Option<ObjectId> {
        match self.connection_status {
            ConnectionStatus::Connected => self.connected_to,
            _ => None,
        }
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "username": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("username_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "email": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("email_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
