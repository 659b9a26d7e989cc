//! Status classification for check outcomes.

use crate::probe::CheckOutcome;
use crate::store::{ResourceKind, ResourceStatus};

/// Consecutive failures before an http/https resource is classified down.
pub const DOWN_THRESHOLD: u32 = 3;

/// Whether an outcome counts as a successful check for the given kind.
pub fn outcome_success(kind: ResourceKind, outcome: &CheckOutcome) -> bool {
    if !outcome.reached {
        return false;
    }
    match kind {
        ResourceKind::Http | ResourceKind::Https => {
            !outcome.gateway_error
                && outcome
                    .http_status
                    .is_some_and(|s| (200..300).contains(&s))
        }
        // Any response short of a server error means the host is alive.
        ResourceKind::Ping => outcome.http_status.is_some_and(|s| s < 500),
    }
}

/// Map an outcome plus the prior failure streak to a new status and streak.
///
/// A single transient failure leaves an http resource in `Warning`; the
/// `Down` classification requires [`DOWN_THRESHOLD`] consecutive failures.
/// Ping has no partial-failure signal, so any failure is immediately `Down`.
pub fn classify(
    kind: ResourceKind,
    outcome: &CheckOutcome,
    prior_failures: u32,
) -> (ResourceStatus, u32) {
    if outcome_success(kind, outcome) {
        return (ResourceStatus::Up, 0);
    }

    let failures = prior_failures.saturating_add(1);
    let threshold = match kind {
        ResourceKind::Ping => 1,
        _ => DOWN_THRESHOLD,
    };

    if failures >= threshold {
        (ResourceStatus::Down, failures)
    } else {
        (ResourceStatus::Warning, failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_outcome(status: u16) -> CheckOutcome {
        CheckOutcome {
            reached: true,
            http_status: Some(status),
            response_time_ms: 10,
            gateway_error: false,
        }
    }

    fn unreachable() -> CheckOutcome {
        CheckOutcome {
            reached: false,
            http_status: None,
            response_time_ms: 10_000,
            gateway_error: false,
        }
    }

    #[test]
    fn test_success_resets_streak() {
        let (status, failures) = classify(ResourceKind::Http, &ok_outcome(200), 7);
        assert_eq!(status, ResourceStatus::Up);
        assert_eq!(failures, 0);
    }

    #[test]
    fn test_http_debounce_to_down() {
        let out = unreachable();
        assert_eq!(
            classify(ResourceKind::Http, &out, 0),
            (ResourceStatus::Warning, 1)
        );
        assert_eq!(
            classify(ResourceKind::Http, &out, 1),
            (ResourceStatus::Warning, 2)
        );
        assert_eq!(
            classify(ResourceKind::Http, &out, 2),
            (ResourceStatus::Down, 3)
        );
        // stays down once past the threshold
        assert_eq!(
            classify(ResourceKind::Http, &out, 3),
            (ResourceStatus::Down, 4)
        );
    }

    #[test]
    fn test_ping_bypasses_warning() {
        assert_eq!(
            classify(ResourceKind::Ping, &unreachable(), 0),
            (ResourceStatus::Down, 1)
        );
    }

    #[test]
    fn test_ping_tolerates_client_errors() {
        assert!(outcome_success(ResourceKind::Ping, &ok_outcome(404)));
        assert!(!outcome_success(ResourceKind::Ping, &ok_outcome(503)));
        assert!(!outcome_success(ResourceKind::Ping, &unreachable()));
    }

    #[test]
    fn test_http_requires_2xx() {
        assert!(outcome_success(ResourceKind::Https, &ok_outcome(204)));
        assert!(!outcome_success(ResourceKind::Http, &ok_outcome(301)));
        assert!(!outcome_success(ResourceKind::Http, &ok_outcome(404)));
        assert!(!outcome_success(ResourceKind::Http, &ok_outcome(500)));
    }

    #[test]
    fn test_gateway_error_is_failure_even_with_2xx() {
        let mut out = ok_outcome(200);
        out.gateway_error = true;
        assert!(!outcome_success(ResourceKind::Http, &out));
        assert_eq!(
            classify(ResourceKind::Http, &out, 2),
            (ResourceStatus::Down, 3)
        );
    }

    #[test]
    fn test_streak_saturates() {
        let (status, failures) = classify(ResourceKind::Http, &unreachable(), u32::MAX);
        assert_eq!(status, ResourceStatus::Down);
        assert_eq!(failures, u32::MAX);
    }
}
