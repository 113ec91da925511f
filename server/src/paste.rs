use chrono::{DateTime, Utc};
use fadebin_common::ID_LENGTH;
use serde::{Deserialize, Serialize};

use crate::short_code::ShortCode;

pub type PasteId = ShortCode<ID_LENGTH>;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PasteRecord {
    pub id: PasteId,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_views: Option<u32>,
    pub view_count: u32,
}

impl PasteRecord {
    pub fn new(
        id: PasteId,
        title: String,
        content: String,
        created_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
        max_views: Option<u32>,
    ) -> Self {
        Self {
            id,
            title,
            content,
            created_at,
            expires_at,
            max_views,
            view_count: 0,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}
