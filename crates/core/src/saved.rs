//! Saved news: a user's bookmark on an article, independent of authorship.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{NewsId, SavedNewsId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedNews {
    pub id: SavedNewsId,
    pub user_id: UserId,
    pub news_id: NewsId,
    pub created_at: DateTime<Utc>,
}

impl SavedNews {
    pub fn new(user_id: UserId, news_id: NewsId, now: DateTime<Utc>) -> Self {
        Self {
            id: SavedNewsId::new(),
            user_id,
            news_id,
            created_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }
}
