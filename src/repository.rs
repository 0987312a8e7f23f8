//! Post lookups over a data source
//!
//! Slugs are derived from titles and never stored, so lookups by slug go
//! through an in-memory slug → id index. A stale entry rebuilds the index
//! right away; an unknown slug rebuilds it at most once per refresh interval.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use crate::content::{generate_slug, PostId, StoredPost};
use crate::error::{Error, QueryFailure, Result};
use crate::source::{decode_records, DataSource, FilterOp, Query, Record};

/// Exact slug → post id mapping
#[derive(Debug, Default)]
pub struct SlugIndex {
    ids: HashMap<String, PostId>,
}

impl SlugIndex {
    /// Build from posts ordered newest first; on slug collisions the first post wins
    pub fn build<'a, I>(posts: I) -> Self
    where
        I: IntoIterator<Item = &'a StoredPost>,
    {
        let mut ids = HashMap::new();
        for post in posts {
            let slug = generate_slug(&post.title);
            if slug.is_empty() {
                tracing::debug!("Post {} has no usable slug", post.id);
                continue;
            }
            if let Some(existing) = ids.get(&slug) {
                tracing::debug!(
                    "Slug {:?} of post {} already taken by post {}",
                    slug,
                    post.id,
                    existing
                );
                continue;
            }
            ids.insert(slug, post.id.clone());
        }
        Self { ids }
    }

    pub fn get(&self, slug: &str) -> Option<&PostId> {
        self.ids.get(slug)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Access to the posts table
pub struct PostRepository {
    source: Arc<dyn DataSource>,
    table: String,
    slugs: RwLock<SlugIndex>,
    refresh_interval: Duration,
    last_refresh: Mutex<Option<Instant>>,
}

impl PostRepository {
    /// Repository whose slug index is rebuilt on every miss
    pub fn new(source: Arc<dyn DataSource>, table: &str) -> Self {
        Self {
            source,
            table: table.to_string(),
            slugs: RwLock::new(SlugIndex::default()),
            refresh_interval: Duration::ZERO,
            last_refresh: Mutex::new(None),
        }
    }

    /// Rebuild the slug index for unknown slugs at most once per `interval`
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Raw rows, newest `created_at` first
    pub fn list_records(&self, limit: Option<usize>) -> Result<Vec<Record>> {
        let mut query = Query::new().order_by("created_at", false);
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        Ok(self.source.query(&self.table, &query)?)
    }

    /// Typed posts, newest `created_at` first
    pub fn list_created(&self, limit: usize) -> Result<Vec<StoredPost>> {
        Ok(decode_records(self.list_records(Some(limit))?))
    }

    /// Typed posts, newest `published_on` first
    pub fn list_published(&self, limit: Option<usize>) -> Result<Vec<StoredPost>> {
        let mut query = Query::new().order_by("published_on", false);
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        Ok(self.query_posts(&query)?)
    }

    pub fn find_by_id(&self, id: &str) -> Result<StoredPost> {
        let query = Query::new().filter("id", FilterOp::Eq, id).limit(1);
        self.query_posts(&query)?
            .into_iter()
            .next()
            .ok_or(Error::NotFound)
    }

    /// Post whose title slugs exactly to `slug`
    pub fn find_by_slug(&self, slug: &str) -> Result<StoredPost> {
        if let Some(id) = self.cached_id(slug) {
            match self.find_by_id(&id.to_string()) {
                Ok(post) if generate_slug(&post.title) == slug => return Ok(post),
                Ok(_) | Err(Error::NotFound) => {
                    tracing::debug!("Slug index entry for {:?} is stale", slug);
                    *self.lock_last_refresh() = Some(Instant::now());
                    return self.find_after_refresh(slug);
                }
                Err(e) => return Err(e),
            }
        }

        if !self.claim_refresh() {
            tracing::debug!("Slug {:?} not indexed; index rebuilt recently", slug);
            return Err(Error::NotFound);
        }
        self.find_after_refresh(slug)
    }

    fn find_after_refresh(&self, slug: &str) -> Result<StoredPost> {
        let posts = self.refresh_slugs()?;
        let id = self.cached_id(slug).ok_or(Error::NotFound)?;
        posts
            .into_iter()
            .find(|post| post.id == id)
            .ok_or(Error::NotFound)
    }

    /// Whether a miss may rebuild the index now; marks the rebuild as taken
    fn claim_refresh(&self) -> bool {
        let mut last = self.lock_last_refresh();
        let due = last.map_or(true, |at| at.elapsed() >= self.refresh_interval);
        if due {
            *last = Some(Instant::now());
        }
        due
    }

    fn lock_last_refresh(&self) -> std::sync::MutexGuard<'_, Option<Instant>> {
        self.last_refresh
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Rebuild the slug index from the whole table; returns the posts read
    pub fn refresh_slugs(&self) -> Result<Vec<StoredPost>> {
        let posts = self.list_published(None)?;
        let index = SlugIndex::build(&posts);
        tracing::debug!(
            "Slug index rebuilt from {} source with {} entries",
            self.source.name(),
            index.len()
        );
        if let Ok(mut slugs) = self.slugs.write() {
            *slugs = index;
        }
        Ok(posts)
    }

    fn cached_id(&self, slug: &str) -> Option<PostId> {
        self.slugs.read().ok()?.get(slug).cloned()
    }

    /// Rows that fail to decode are logged and left out
    fn query_posts(&self, query: &Query) -> std::result::Result<Vec<StoredPost>, QueryFailure> {
        Ok(decode_records(self.source.query(&self.table, query)?))
    }
}
