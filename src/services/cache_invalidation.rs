//! Cache invalidation webhook logic: constant-time secret compare, a fixed
//! window rate limit, then a wildcard Redis key sweep.

use std::time::{Duration, Instant};

use deadpool_redis::redis::AsyncCommands;
use tokio::sync::Mutex;

use discogsography_core::error::{AppError, Result};

const WINDOW: Duration = Duration::from_secs(60);
const MAX_CALLS_PER_WINDOW: u32 = 10;

/// Fixed-window limiter for the webhook endpoint. One shared instance per
/// process is enough — this endpoint has a single caller (the webhook
/// source), not per-client traffic.
pub struct RateLimiter {
    state: Mutex<(Instant, u32)>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            state: Mutex::new((Instant::now(), 0)),
        }
    }

    pub async fn check(&self) -> Result<()> {
        let mut guard = self.state.lock().await;
        let (window_start, count) = &mut *guard;
        if window_start.elapsed() >= WINDOW {
            *window_start = Instant::now();
            *count = 0;
        }
        if *count >= MAX_CALLS_PER_WINDOW {
            return Err(AppError::RateLimitExceeded {
                retry_after: Some((WINDOW - window_start.elapsed()).as_secs()),
            });
        }
        *count += 1;
        Ok(())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Validate the caller's secret against the configured webhook secret.
/// Returns `ServiceUnavailable` if no secret is configured (503), and
/// `InvalidCredentials` on mismatch (401) — matching the webhook's status
/// contract.
pub fn check_secret(configured: Option<&str>, provided: &str) -> Result<()> {
    let Some(configured) = configured else {
        return Err(AppError::ServiceUnavailable);
    };
    if constant_time_eq(configured, provided) {
        Ok(())
    } else {
        Err(AppError::InvalidCredentials)
    }
}

/// Delete every Redis key matching `pattern` (Redis glob wildcards), using
/// `SCAN` rather than `KEYS` so a large keyspace doesn't block the server.
pub async fn invalidate_pattern(redis_pool: &deadpool_redis::Pool, pattern: &str) -> Result<u64> {
    let mut conn = redis_pool.get().await.map_err(|e| AppError::RedisOperationFailed(e.to_string()))?;

    let mut deleted = 0u64;
    let mut cursor: u64 = 0;
    loop {
        let (next_cursor, keys): (u64, Vec<String>) = deadpool_redis::redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(200)
            .query_async(&mut conn)
            .await
            .map_err(AppError::from)?;

        if !keys.is_empty() {
            let removed: u64 = conn.del(&keys).await.map_err(AppError::from)?;
            deleted += removed;
        }

        cursor = next_cursor;
        if cursor == 0 {
            break;
        }
    }

    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_secret_configured_is_service_unavailable() {
        let err = check_secret(None, "anything").unwrap_err();
        assert!(matches!(err, AppError::ServiceUnavailable));
    }

    #[test]
    fn mismatched_secret_is_invalid_credentials() {
        let err = check_secret(Some("correct"), "wrong").unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[test]
    fn matching_secret_succeeds() {
        assert!(check_secret(Some("correct"), "correct").is_ok());
    }
}
