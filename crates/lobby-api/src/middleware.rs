use std::collections::HashMap;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

/// Fixed rate-limit window.
pub const WINDOW: Duration = Duration::from_secs(5 * 60);
/// Requests allowed per client per window.
pub const MAX_REQUESTS: u32 = 100;

/// Sweep expired buckets once the map holds this many clients.
const SWEEP_THRESHOLD: usize = 4096;

const REJECT_BODY: &str = "Too many requests, please try again later.";

/// Fixed-window request counter keyed by client address. IPv4 clients are
/// counted per address, IPv6 clients per /56 prefix.
pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    buckets: Mutex<HashMap<IpAddr, Bucket>>,
}

struct Bucket {
    window_start: Instant,
    hits: u32,
}

/// Outcome of a limiter check.
pub enum Verdict {
    Allowed,
    Limited { retry_after: Duration },
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Count a hit for `key` and decide whether it may proceed.
    pub fn check(&self, key: IpAddr) -> Verdict {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: IpAddr, now: Instant) -> Verdict {
        let mut buckets = match self.buckets.lock() {
            Ok(guard) => guard,
            // Fail open on a poisoned lock.
            Err(poisoned) => poisoned.into_inner(),
        };

        if buckets.len() >= SWEEP_THRESHOLD {
            let window = self.window;
            buckets.retain(|_, b| now.duration_since(b.window_start) < window);
        }

        let bucket = buckets.entry(key).or_insert_with(|| Bucket {
            window_start: now,
            hits: 0,
        });
        if now.duration_since(bucket.window_start) >= self.window {
            bucket.window_start = now;
            bucket.hits = 0;
        }

        bucket.hits += 1;
        if bucket.hits > self.max_requests {
            Verdict::Limited {
                retry_after: self.window - now.duration_since(bucket.window_start),
            }
        } else {
            Verdict::Allowed
        }
    }
}

/// Reject clients that exceed the request budget for the current window.
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Response {
    let key = client_key(req.headers(), peer.ip());

    match limiter.check(key) {
        Verdict::Allowed => next.run(req).await,
        Verdict::Limited { retry_after } => {
            debug!("rate limit tripped for {}", key);
            let retry = retry_after.as_secs().max(1).to_string();
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry)],
                REJECT_BODY,
            )
                .into_response()
        }
    }
}

/// Resolve the limiter key for a request: the last `X-Forwarded-For` entry
/// when one parses (a single trusted proxy hop appends the real client
/// there), otherwise the socket peer address.
pub fn client_key(headers: &HeaderMap, peer: IpAddr) -> IpAddr {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.rsplit(',').next())
        .and_then(|v| v.trim().parse::<IpAddr>().ok());

    normalize(forwarded.unwrap_or(peer))
}

/// Canonicalize v4-mapped addresses to IPv4 and truncate real IPv6 to its
/// /56 prefix.
fn normalize(addr: IpAddr) -> IpAddr {
    match addr {
        IpAddr::V4(v4) => IpAddr::V4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(mask_ipv6(v6, 56)),
        },
    }
}

/// Zero every bit below the leading `prefix` bits.
fn mask_ipv6(addr: Ipv6Addr, prefix: u32) -> Ipv6Addr {
    let mut octets = addr.octets();
    for (i, octet) in octets.iter_mut().enumerate() {
        let bit_index = (i as u32) * 8;
        if bit_index >= prefix {
            *octet = 0;
        } else if bit_index + 8 > prefix {
            let keep = prefix - bit_index;
            *octet &= 0xff << (8 - keep);
        }
    }
    Ipv6Addr::from(octets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn v4(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn full_budget_is_allowed_then_the_next_request_is_limited() {
        let limiter = RateLimiter::new(WINDOW, MAX_REQUESTS);
        let now = Instant::now();
        let key = v4("203.0.113.9");

        for _ in 0..MAX_REQUESTS {
            assert!(matches!(limiter.check_at(key, now), Verdict::Allowed));
        }
        match limiter.check_at(key, now) {
            Verdict::Limited { retry_after } => assert!(retry_after <= WINDOW),
            Verdict::Allowed => panic!("request over budget was allowed"),
        }
    }

    #[test]
    fn budget_resets_once_the_window_elapses() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 2);
        let start = Instant::now();
        let key = v4("203.0.113.9");

        assert!(matches!(limiter.check_at(key, start), Verdict::Allowed));
        assert!(matches!(limiter.check_at(key, start), Verdict::Allowed));
        assert!(matches!(
            limiter.check_at(key, start),
            Verdict::Limited { .. }
        ));

        let later = start + Duration::from_secs(61);
        assert!(matches!(limiter.check_at(key, later), Verdict::Allowed));
    }

    #[test]
    fn distinct_clients_have_independent_budgets() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 1);
        let now = Instant::now();

        assert!(matches!(
            limiter.check_at(v4("203.0.113.9"), now),
            Verdict::Allowed
        ));
        assert!(matches!(
            limiter.check_at(v4("203.0.113.10"), now),
            Verdict::Allowed
        ));
        assert!(matches!(
            limiter.check_at(v4("203.0.113.9"), now),
            Verdict::Limited { .. }
        ));
    }

    #[test]
    fn retry_after_never_exceeds_the_window() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 1);
        let start = Instant::now();
        let key = v4("203.0.113.9");

        limiter.check_at(key, start);
        let at = start + Duration::from_secs(20);
        match limiter.check_at(key, at) {
            Verdict::Limited { retry_after } => {
                assert!(retry_after <= Duration::from_secs(40));
                assert!(retry_after > Duration::ZERO);
            }
            Verdict::Allowed => panic!("second request should be limited"),
        }
    }

    #[test]
    fn ipv6_clients_share_a_slash56_bucket() {
        let a: IpAddr = "2001:db8:aaaa:bb01::1".parse().unwrap();
        let b: IpAddr = "2001:db8:aaaa:bb02::2".parse().unwrap();
        let c: IpAddr = "2001:db8:aaaa:cc01::1".parse().unwrap();

        assert_eq!(normalize(a), normalize(b));
        assert_ne!(normalize(a), normalize(c));
        assert_eq!(
            normalize(a),
            "2001:db8:aaaa:bb00::".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn mapped_v4_collapses_to_plain_v4() {
        let mapped: IpAddr = "::ffff:192.0.2.1".parse().unwrap();
        assert_eq!(normalize(mapped), v4("192.0.2.1"));
    }

    #[test]
    fn forwarded_header_last_entry_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("198.51.100.7, 203.0.113.9"),
        );
        assert_eq!(client_key(&headers, v4("10.0.0.1")), v4("203.0.113.9"));
    }

    #[test]
    fn unparseable_forwarded_header_falls_back_to_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("not-an-ip"));
        assert_eq!(client_key(&headers, v4("10.0.0.1")), v4("10.0.0.1"));
    }

    #[test]
    fn absent_forwarded_header_uses_peer() {
        assert_eq!(client_key(&HeaderMap::new(), v4("10.0.0.1")), v4("10.0.0.1"));
    }
}
