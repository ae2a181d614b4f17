use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use factha_core::{News, NewsId, SavedNews, SavedNewsId, User, UserId};

use super::{NewsRepository, RepositoryError, SavedNewsRepository, UserRepository};

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<UserId, User>,
    news: HashMap<NewsId, News>,
    saved: HashMap<SavedNewsId, SavedNews>,
}

/// In-memory repositories for tests/dev.
///
/// One shared state backs all three traits so that deleting an article also
/// drops its bookmarks, like the `ON DELETE CASCADE` in Postgres.
#[derive(Debug, Default)]
pub struct InMemoryRepositories {
    inner: RwLock<MemoryState>,
}

impl InMemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>, RepositoryError> {
        self.inner
            .read()
            .map_err(|_| RepositoryError::Backend("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState>, RepositoryError> {
        self.inner
            .write()
            .map_err(|_| RepositoryError::Backend("in-memory store lock poisoned".to_string()))
    }
}

fn newest_first(news: &mut [News]) {
    news.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

#[async_trait]
impl UserRepository for InMemoryRepositories {
    async fn insert(&self, user: &User) -> Result<(), RepositoryError> {
        let mut state = self.write()?;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::Conflict("email already registered".to_string()));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let mut users: Vec<User> = self.read()?.users.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn update(&self, user: &User) -> Result<(), RepositoryError> {
        let mut state = self.write()?;
        if !state.users.contains_key(&user.id) {
            return Err(RepositoryError::NotFound);
        }
        if state
            .users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(RepositoryError::Conflict("email already registered".to_string()));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }
}

#[async_trait]
impl NewsRepository for InMemoryRepositories {
    async fn insert(&self, news: &News) -> Result<(), RepositoryError> {
        let mut state = self.write()?;
        if !state.users.contains_key(&news.author_id) {
            return Err(RepositoryError::NotFound);
        }
        state.news.insert(news.id, news.clone());
        Ok(())
    }

    async fn get(&self, id: NewsId) -> Result<Option<News>, RepositoryError> {
        Ok(self.read()?.news.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<News>, RepositoryError> {
        let mut news: Vec<News> = self.read()?.news.values().cloned().collect();
        newest_first(&mut news);
        Ok(news)
    }

    async fn search(&self, keyword: &str) -> Result<Vec<News>, RepositoryError> {
        let needle = keyword.to_lowercase();
        let mut news: Vec<News> = self
            .read()?
            .news
            .values()
            .filter(|n| {
                n.title.to_lowercase().contains(&needle) || n.body.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        newest_first(&mut news);
        Ok(news)
    }

    async fn update(&self, news: &News) -> Result<(), RepositoryError> {
        let mut state = self.write()?;
        match state.news.get_mut(&news.id) {
            Some(slot) => {
                *slot = news.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn delete(&self, id: NewsId) -> Result<(), RepositoryError> {
        let mut state = self.write()?;
        if state.news.remove(&id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        state.saved.retain(|_, s| s.news_id != id);
        Ok(())
    }
}

#[async_trait]
impl SavedNewsRepository for InMemoryRepositories {
    async fn insert(&self, saved: &SavedNews) -> Result<(), RepositoryError> {
        let mut state = self.write()?;
        if !state.news.contains_key(&saved.news_id) || !state.users.contains_key(&saved.user_id) {
            return Err(RepositoryError::NotFound);
        }
        if state
            .saved
            .values()
            .any(|s| s.user_id == saved.user_id && s.news_id == saved.news_id)
        {
            return Err(RepositoryError::Conflict("news already saved".to_string()));
        }
        state.saved.insert(saved.id, saved.clone());
        Ok(())
    }

    async fn get(&self, id: SavedNewsId) -> Result<Option<SavedNews>, RepositoryError> {
        Ok(self.read()?.saved.get(&id).cloned())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<SavedNews>, RepositoryError> {
        let mut saved: Vec<SavedNews> = self
            .read()?
            .saved
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        saved.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(saved)
    }

    async fn delete(&self, id: SavedNewsId) -> Result<(), RepositoryError> {
        match self.write()?.saved.remove(&id) {
            Some(_) => Ok(()),
            None => Err(RepositoryError::NotFound),
        }
    }
}
