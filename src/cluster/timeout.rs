use super::ClusterError;
use std::future::Future;
use std::time::Duration;

/// Longest timeout accepted for a single cluster call
pub const MAX_TIMEOUT: Duration = Duration::from_secs(168 * 3_600);

/// Parse a kubectl-style timeout string into a Duration
///
/// The string is a sequence of `<n><unit>` parts with units `ms`, `s`, `m`
/// and `h`, e.g. `30s`, `10m0s`, `1h30m`, `500ms`. The total must be
/// non-zero and at most [`MAX_TIMEOUT`].
///
/// Missing units, unknown units and signs return `None`.
pub fn parse_duration(duration_str: &str) -> Option<Duration> {
    let mut rest = duration_str.trim();
    if rest.is_empty() {
        return None;
    }

    let mut total = Duration::ZERO;
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits == 0 {
            return None;
        }
        let number: u64 = rest[..digits].parse().ok()?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let part = match &rest[..unit_len] {
            "ms" => Duration::from_millis(number),
            "s" => Duration::from_secs(number),
            "m" => Duration::from_secs(number.checked_mul(60)?),
            "h" => Duration::from_secs(number.checked_mul(3_600)?),
            _ => return None,
        };
        rest = &rest[unit_len..];

        total = total.checked_add(part)?;
    }

    if total.is_zero() || total > MAX_TIMEOUT {
        return None;
    }
    Some(total)
}

/// Run a cluster call, bounded by the caller's timeout if one was given
///
/// # Errors
/// `InvalidTimeout` if the string does not parse, `TimedOut` if the call
/// outlives it, otherwise whatever the call returns.
pub async fn with_timeout<T, F>(timeout: Option<&str>, call: F) -> Result<T, ClusterError>
where
    F: Future<Output = Result<T, ClusterError>>,
{
    let Some(raw) = timeout else {
        return call.await;
    };

    let limit = parse_duration(raw).ok_or_else(|| ClusterError::InvalidTimeout(raw.to_string()))?;

    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| ClusterError::TimedOut(raw.to_string()))?
}
