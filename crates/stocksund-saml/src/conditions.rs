#![forbid(unsafe_code)]

//! Audience restriction and validity window.

use crate::assertion::Assertion;
use crate::error::{ErrorKind, Rejection};
use chrono::{DateTime, SecondsFormat, Utc};
use url::Url;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock stuck at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Accept the assertion if any `Audience` in any `AudienceRestriction`
/// equals `audience` as a parsed URI.
pub fn validate_audience(assertion: &Assertion, audience: &str) -> Result<(), Rejection> {
    if audience.trim().is_empty() {
        return Err(Rejection::new(
            ErrorKind::ConfigurationError,
            "no audience configured",
        ));
    }
    let expected = Url::parse(audience).map_err(|e| {
        Rejection::new(
            ErrorKind::ConfigurationError,
            format!("configured audience is not an absolute URI: {e}"),
        )
    })?;

    let mut seen = 0usize;
    for candidate in assertion.conditions.audiences() {
        seen += 1;
        match Url::parse(candidate) {
            Ok(url) if url == expected => return Ok(()),
            Ok(_) => {}
            Err(e) => tracing::debug!(error = %e, "skipping audience that is not an absolute URI"),
        }
    }

    let detail = if seen == 0 {
        "assertion names no audience".to_owned()
    } else {
        format!("none of {seen} audiences matches {expected}")
    };
    Err(Rejection::new(ErrorKind::AudienceMismatch, detail))
}

/// Require `not_before < now < not_on_or_after`. No skew is applied.
pub fn validate_window(assertion: &Assertion, now: DateTime<Utc>) -> Result<(), Rejection> {
    let conditions = &assertion.conditions;
    let not_on_or_after = conditions
        .not_on_or_after
        .ok_or_else(|| Rejection::malformed("Conditions/@NotOnOrAfter is missing"))?;
    let not_before = conditions
        .not_before
        .ok_or_else(|| Rejection::malformed("Conditions/@NotBefore is missing"))?;

    if now >= not_on_or_after {
        return Err(Rejection::new(
            ErrorKind::TokenExpired,
            format!(
                "NotOnOrAfter {} is not after now {}",
                rfc3339(not_on_or_after),
                rfc3339(now)
            ),
        ));
    }
    if now <= not_before {
        return Err(Rejection::new(
            ErrorKind::TokenNotYetValid,
            format!(
                "NotBefore {} is not before now {}",
                rfc3339(not_before),
                rfc3339(now)
            ),
        ));
    }
    Ok(())
}

fn rfc3339(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
