pub mod api;
pub mod auth;
pub mod listing;
pub mod pagination;
pub mod rate_limiter;


pub use api::RedditApiClient;
pub use auth::{parse_token_response, Authenticator, PasswordGrant};
pub use listing::{ActivityItem, CommentData, PageRequest, RedditListing, SubmissionData};
pub use pagination::{
    AuthorizedListingSource, ListingPage, ListingSource, ListingWalker, PaginationLimits,
};
pub use rate_limiter::{RateLimitConfig, RateLimitHeaders, RateLimiter};
