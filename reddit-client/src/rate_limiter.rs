use reqwest::header::HeaderMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Minimum spacing between the start of two requests.
    pub request_delay: Duration,
}

impl RateLimitConfig {
    pub fn reddit_oauth() -> Self {
        Self {
            // 100 requests per minute for OAuth clients, with a little headroom
            request_delay: Duration::from_millis(1050),
        }
    }

    pub fn with_delay(request_delay: Duration) -> Self {
        Self { request_delay }
    }
}

/// Fixed-interval pacer shared by every request a client makes.
///
/// Not adaptive: the `X-Ratelimit-*` headers are recorded for logging only.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Mutex<PacerState>,
}

#[derive(Debug, Default)]
struct PacerState {
    last_request: Option<Instant>,
    requests_made: u64,
    last_headers: Option<RateLimitHeaders>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: Mutex::new(PacerState::default()),
        }
    }

    pub async fn acquire_permit(&self) -> RateLimitPermit {
        let start_time = Instant::now();
        let mut state = self.state.lock().await;

        if let Some(last) = state.last_request {
            let ready_at = last + self.config.request_delay;
            let now = Instant::now();
            if ready_at > now {
                let wait_time = ready_at - now;
                debug!("Pacing request, waiting {:?}", wait_time);
                sleep(wait_time).await;
            }
        }

        state.last_request = Some(Instant::now());
        state.requests_made += 1;

        RateLimitPermit {
            queue_wait_time: start_time.elapsed(),
        }
    }

    pub async fn record_headers(&self, headers: RateLimitHeaders) {
        let mut state = self.state.lock().await;
        state.last_headers = Some(headers);
    }

    pub async fn get_rate_limit_status(&self) -> RateLimitStatus {
        let state = self.state.lock().await;
        RateLimitStatus {
            request_delay: self.config.request_delay,
            requests_made: state.requests_made,
            last_headers: state.last_headers.clone(),
        }
    }
}

#[derive(Debug)]
pub struct RateLimitPermit {
    pub queue_wait_time: Duration,
}

#[derive(Debug, Clone)]
pub struct RateLimitStatus {
    pub request_delay: Duration,
    pub requests_made: u64,
    pub last_headers: Option<RateLimitHeaders>,
}

/// Values of the `X-Ratelimit-*` response headers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateLimitHeaders {
    pub remaining: Option<f64>,
    pub used: Option<u32>,
    pub reset_seconds: Option<u64>,
}

impl RateLimitHeaders {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        fn header<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
        }

        Self {
            remaining: header(headers, "x-ratelimit-remaining"),
            used: header(headers, "x-ratelimit-used"),
            reset_seconds: header(headers, "x-ratelimit-reset"),
        }
    }

    pub fn log(&self) {
        debug!("rate remaining : {:?}", self.remaining);
        debug!("rate used : {:?}", self.used);
        debug!("rate reset : {:?}", self.reset_seconds);
    }
}
