use crate::api::RedditApiClient;
use crate::listing::{extract_records, ActivityItem, PageRequest, RedditListing};
use async_trait::async_trait;
use history_core::{Category, CoreError, Record, SortOrder, MAX_PAGE_SIZE};
use oauth2::AccessToken;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Anything that can serve one page of a user listing.
#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch_page(
        &self,
        request: &PageRequest,
    ) -> Result<RedditListing<ActivityItem>, CoreError>;
}

/// The live API, bound to the bearer token from the password grant.
#[derive(Debug)]
pub struct AuthorizedListingSource {
    client: RedditApiClient,
    access_token: AccessToken,
}

impl AuthorizedListingSource {
    pub fn new(client: RedditApiClient, access_token: AccessToken) -> Self {
        Self {
            client,
            access_token,
        }
    }

    pub fn client(&self) -> &RedditApiClient {
        &self.client
    }
}

#[async_trait]
impl ListingSource for AuthorizedListingSource {
    async fn fetch_page(
        &self,
        request: &PageRequest,
    ) -> Result<RedditListing<ActivityItem>, CoreError> {
        self.client.fetch_listing(&self.access_token, request).await
    }
}

#[derive(Debug, Clone)]
pub struct PaginationLimits {
    pub page_size: u32,
    /// Stop after this many pages even if a cursor is still returned.
    pub max_pages: Option<u32>,
    /// Stop once this much time has passed since the first request.
    pub deadline: Option<Duration>,
}

impl Default for PaginationLimits {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            max_pages: Some(1000),
            deadline: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    pub number: u32,
    pub records: Vec<Record>,
    pub after: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkState {
    Ready,
    Exhausted,
    Truncated,
}

/// Walks one category listing page by page until the cursor runs out or a
/// limit is hit.
pub struct ListingWalker<'a, S: ListingSource + ?Sized> {
    source: &'a S,
    user: String,
    category: Category,
    sort: SortOrder,
    limits: PaginationLimits,
    cursor: Option<String>,
    pages_fetched: u32,
    started: Option<Instant>,
    state: WalkState,
}

impl<'a, S: ListingSource + ?Sized> ListingWalker<'a, S> {
    pub fn new(
        source: &'a S,
        user: impl Into<String>,
        category: Category,
        sort: SortOrder,
        limits: PaginationLimits,
    ) -> Self {
        Self {
            source,
            user: user.into(),
            category,
            sort,
            limits,
            cursor: None,
            pages_fetched: 0,
            started: None,
            state: WalkState::Ready,
        }
    }

    /// Fetches the next page, or `None` once the walk is over.
    pub async fn next_page(&mut self) -> Result<Option<ListingPage>, CoreError> {
        if self.state != WalkState::Ready {
            return Ok(None);
        }

        if let Some(max_pages) = self.limits.max_pages {
            if self.pages_fetched >= max_pages {
                warn!(
                    "Stopping {} after {} pages; more results remain",
                    self.category, self.pages_fetched
                );
                self.state = WalkState::Truncated;
                return Ok(None);
            }
        }

        if let (Some(deadline), Some(started)) = (self.limits.deadline, self.started) {
            if started.elapsed() >= deadline {
                warn!(
                    "Stopping {} after {:?}; more results remain",
                    self.category, deadline
                );
                self.state = WalkState::Truncated;
                return Ok(None);
            }
        }

        self.started.get_or_insert_with(Instant::now);

        let request = PageRequest {
            user: self.user.clone(),
            category: self.category,
            sort: self.sort,
            limit: self.limits.page_size,
            after: self.cursor.clone(),
        };
        let listing = self.source.fetch_page(&request).await?;

        self.pages_fetched += 1;
        self.cursor = listing.data.after.clone();
        info!("{}: fetch count = {}", self.category, self.pages_fetched);
        debug!("after = {:?}", self.cursor);

        if self.cursor.is_none() {
            self.state = WalkState::Exhausted;
        }

        Ok(Some(ListingPage {
            number: self.pages_fetched,
            after: self.cursor.clone(),
            records: extract_records(listing),
        }))
    }

    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == WalkState::Exhausted
    }

    /// True when a limit stopped the walk while the API still had pages.
    pub fn is_truncated(&self) -> bool {
        self.state == WalkState::Truncated
    }
}
