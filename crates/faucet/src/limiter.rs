//! Per-client claim rate limiting

use axum::http::HeaderMap;
use dashmap::{mapref::entry::Entry, DashMap};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tracing::debug;

pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Admits at most one claim per client key per interval.
///
/// Entries are never evicted: one is kept for every key ever admitted.
/// `None` marks a key whose next eligibility lies beyond what `Instant`
/// can represent, so it is never admitted again.
#[derive(Debug)]
pub struct RateLimiter {
    next_eligible: DashMap<String, Option<Instant>>,
    interval: Duration,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            next_eligible: DashMap::new(),
            interval,
        }
    }

    /// Record a claim for `key` at `now` if it is eligible.
    pub fn admit(&self, key: &str, now: Instant) -> bool {
        self.check(key, now).is_ok()
    }

    /// Like [`admit`](Self::admit), but reports how long the caller still has to wait.
    ///
    /// The lookup and the update happen under the same shard lock, so two
    /// concurrent calls for one key cannot both succeed.
    pub fn check(&self, key: &str, now: Instant) -> Result<(), Duration> {
        match self.next_eligible.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                match *entry.get() {
                    Some(eligible_at) if now < eligible_at => return Err(eligible_at - now),
                    None => return Err(Duration::MAX),
                    Some(_) => {}
                }
                entry.insert(now.checked_add(self.interval));
            }
            Entry::Vacant(entry) => {
                entry.insert(now.checked_add(self.interval));
            }
        }
        debug!(client = key, "claim admitted by rate limiter");
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of client keys being tracked.
    pub fn len(&self) -> usize {
        self.next_eligible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.next_eligible.is_empty()
    }
}

/// Derive the rate-limit identity of a request.
///
/// With `proxy_count` trusted reverse proxies in front of the server, the
/// client is the `proxy_count`-th entry from the right of `X-Forwarded-For`.
/// A missing or too short chain falls back to the peer address.
pub fn client_key(headers: &HeaderMap, remote: SocketAddr, proxy_count: usize) -> String {
    if proxy_count > 0 {
        if let Some(chain) = headers
            .get(FORWARDED_FOR_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            let hops: Vec<&str> = chain
                .split(',')
                .map(str::trim)
                .filter(|hop| !hop.is_empty())
                .collect();
            if hops.len() >= proxy_count {
                return hops[hops.len() - proxy_count].to_string();
            }
        }
    }
    remote.ip().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use std::sync::Arc;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    #[test]
    fn test_admit_within_and_after_interval() {
        let limiter = RateLimiter::new(DAY);
        let t = Instant::now();

        assert!(limiter.admit("1.2.3.4", t));
        assert!(!limiter.admit("1.2.3.4", t + Duration::from_millis(1)));
        assert!(limiter.admit("1.2.3.4", t + DAY));
    }

    #[test]
    fn test_rejection_leaves_state_unchanged() {
        let limiter = RateLimiter::new(Duration::from_secs(60));
        let t = Instant::now();

        assert!(limiter.admit("k", t));
        assert_eq!(
            limiter.check("k", t + Duration::from_secs(20)),
            Err(Duration::from_secs(40))
        );
        // The failed attempt must not have pushed the deadline back.
        assert!(limiter.admit("k", t + Duration::from_secs(60)));
    }

    #[test]
    fn test_unrepresentable_interval_admits_once() {
        let limiter = RateLimiter::new(Duration::MAX);
        let t = Instant::now();

        assert!(limiter.admit("1.2.3.4", t));
        assert_eq!(
            limiter.check("1.2.3.4", t + Duration::from_secs(3600)),
            Err(Duration::MAX)
        );
        assert!(limiter.admit("5.6.7.8", t));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new(DAY);
        let t = Instant::now();

        assert!(limiter.admit("a", t));
        assert!(limiter.admit("b", t));
        assert!(!limiter.admit("a", t));
        assert_eq!(limiter.len(), 2);
    }

    #[test]
    fn test_concurrent_admits_for_same_key() {
        let limiter = Arc::new(RateLimiter::new(DAY));
        let t = Instant::now();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || limiter.admit("10.0.0.1", t))
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(admitted, 1);
    }

    fn remote() -> SocketAddr {
        "192.0.2.10:40000".parse().unwrap()
    }

    fn forwarded(chain: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR_HEADER, HeaderValue::from_str(chain).unwrap());
        headers
    }

    #[test]
    fn test_client_key_without_proxies_ignores_header() {
        let headers = forwarded("6.6.6.6");
        assert_eq!(client_key(&headers, remote(), 0), "192.0.2.10");
    }

    #[test]
    fn test_client_key_picks_nth_from_right() {
        let headers = forwarded("6.6.6.6, 1.2.3.4, 10.0.0.2");
        assert_eq!(client_key(&headers, remote(), 1), "10.0.0.2");
        assert_eq!(client_key(&headers, remote(), 2), "1.2.3.4");
        assert_eq!(client_key(&headers, remote(), 3), "6.6.6.6");
    }

    #[test]
    fn test_client_key_short_chain_falls_back() {
        let headers = forwarded("1.2.3.4");
        assert_eq!(client_key(&headers, remote(), 2), "192.0.2.10");
        assert_eq!(client_key(&HeaderMap::new(), remote(), 1), "192.0.2.10");
    }
}
