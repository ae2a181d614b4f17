//! News articles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DomainError, DomainResult, NewsId, UserId};

const MAX_TITLE_CHARS: usize = 200;
const MAX_TAGS: usize = 10;

/// A published news article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct News {
    pub id: NewsId,
    pub author_id: UserId,
    pub title: String,
    pub tags: Vec<String>,
    pub body: String,
    /// Object key of the thumbnail, if any.
    pub file_name: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl News {
    pub fn publish(author_id: UserId, draft: NewsDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: NewsId::new(),
            author_id,
            title: draft.title,
            tags: draft.tags,
            body: draft.body,
            file_name: None,
            image_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the editable fields, keeping identity and authorship.
    pub fn revise(&mut self, draft: NewsDraft, now: DateTime<Utc>) {
        self.title = draft.title;
        self.tags = draft.tags;
        self.body = draft.body;
        self.updated_at = now;
    }

    pub fn is_authored_by(&self, user_id: UserId) -> bool {
        self.author_id == user_id
    }
}

/// Editable part of an article, as submitted by its author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsDraft {
    pub title: String,
    pub tags: Vec<String>,
    pub body: String,
}

impl NewsDraft {
    /// Build a draft from raw form fields (`tags` is comma-separated).
    pub fn new(title: &str, tags: &str, body: &str) -> DomainResult<Self> {
        let draft = Self {
            title: title.trim().to_string(),
            tags: parse_tags(tags)?,
            body: body.trim().to_string(),
        };
        draft.validate()?;
        Ok(draft)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.title.is_empty() {
            return Err(DomainError::validation("title must not be empty"));
        }
        if self.title.chars().count() > MAX_TITLE_CHARS {
            return Err(DomainError::validation(format!(
                "title must be at most {MAX_TITLE_CHARS} characters"
            )));
        }
        if self.body.is_empty() {
            return Err(DomainError::validation("body must not be empty"));
        }
        if self.tags.len() > MAX_TAGS {
            return Err(DomainError::validation(format!("at most {MAX_TAGS} tags are allowed")));
        }
        Ok(())
    }
}

/// Split a comma-separated tag list.
///
/// Tags are trimmed and lowercased; empty entries and repeats are dropped,
/// first occurrence wins.
pub fn parse_tags(raw: &str) -> DomainResult<Vec<String>> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.split(',') {
        let tag = tag.trim().to_lowercase();
        if tag.is_empty() || tags.contains(&tag) {
            continue;
        }
        tags.push(tag);
    }

    if tags.len() > MAX_TAGS {
        return Err(DomainError::validation(format!("at most {MAX_TAGS} tags are allowed")));
    }
    Ok(tags)
}
