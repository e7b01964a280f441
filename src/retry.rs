use std::fmt::Display;

use tracing::warn;

/// Runs `op` up to `attempts` times (at least once), stopping at the first
/// success.
///
/// Every failed attempt is logged with its number. The error of the final
/// attempt is returned as is; mapping it into a caller-facing error kind is
/// the caller's job.
pub fn with_retries<T, E, F>(what: &str, attempts: u32, mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Result<T, E>,
    E: Display,
{
    let attempts = attempts.max(1);

    for attempt in 1..attempts {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(e) => warn!(
                attempt,
                attempts,
                error = %e,
                "{} failed, retrying {}/{} ...",
                what,
                attempt,
                attempts
            ),
        }
    }

    op(attempts).map_err(|e| {
        warn!(attempt = attempts, attempts, error = %e, "{} failed, giving up", what);
        e
    })
}
