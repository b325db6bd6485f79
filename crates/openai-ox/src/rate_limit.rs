use std::time::Duration;

use reqwest::header::HeaderMap;

const LIMIT_REQUESTS: &str = "x-ratelimit-limit-requests";
const LIMIT_TOKENS: &str = "x-ratelimit-limit-tokens";
const REMAINING_REQUESTS: &str = "x-ratelimit-remaining-requests";
const REMAINING_TOKENS: &str = "x-ratelimit-remaining-tokens";
const RESET_REQUESTS: &str = "x-ratelimit-reset-requests";
const RESET_TOKENS: &str = "x-ratelimit-reset-tokens";

/// Rate-limit state reported in the `x-ratelimit-*` response headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimit {
    pub requests_limit: Option<u64>,
    pub requests_remaining: Option<u64>,
    pub requests_reset: Option<Duration>,
    pub tokens_limit: Option<u64>,
    pub tokens_remaining: Option<u64>,
    pub tokens_reset: Option<Duration>,
}

impl RateLimit {
    /// Reads the rate-limit headers; missing or malformed values are left unset.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let text = |name: &str| headers.get(name).and_then(|value| value.to_str().ok());
        let number = |name: &str| text(name).and_then(|value| value.trim().parse().ok());
        let duration = |name: &str| text(name).and_then(parse_reset);

        Self {
            requests_limit: number(LIMIT_REQUESTS),
            requests_remaining: number(REMAINING_REQUESTS),
            requests_reset: duration(RESET_REQUESTS),
            tokens_limit: number(LIMIT_TOKENS),
            tokens_remaining: number(REMAINING_TOKENS),
            tokens_reset: duration(RESET_TOKENS),
        }
    }

    /// Whether any rate-limit header was present.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Parses reset intervals such as `1s`, `20ms`, `6m0s` or `1h2m3.5s`.
fn parse_reset(value: &str) -> Option<Duration> {
    let mut rest = value.trim();
    if rest.is_empty() {
        return None;
    }

    let mut total = Duration::ZERO;
    while !rest.is_empty() {
        let split = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(split);
        let amount: f64 = number.parse().ok()?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_len);
        let micros_per_unit = match unit {
            "ms" => 1e3,
            "s" => 1e6,
            "m" => 60e6,
            "h" => 3600e6,
            _ => return None,
        };
        total += Duration::from_micros((amount * micros_per_unit).round() as u64);
        rest = next;
    }
    Some(total)
}
