//! Post-checkout purchase confirmation polling.
//!
//! After the payment redirect the client cannot know whether the webhook
//! has landed yet, so it asks us to watch the purchased set until it
//! grows past its pre-checkout size. The loop has a fixed attempt budget
//! with exponential backoff and dies with the request future if the
//! caller disconnects - it can never run forever.

use std::collections::BTreeSet;
use std::time::Duration;

use paperstack_core::FileId;
use tracing::instrument;

use crate::catalog::CatalogClient;

/// Polling schedule for one confirmation request.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 15,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
        }
    }
}

/// Result of one confirmation poll.
#[derive(Debug, Clone)]
pub struct ConfirmOutcome {
    /// Whether the purchased set grew within the attempt budget.
    pub confirmed: bool,
    /// Attempts actually spent.
    pub attempts: u32,
    /// The most recent purchased set observed.
    pub purchased: BTreeSet<FileId>,
}

/// Poll the catalog until the user's purchased set grows beyond
/// `initial_count`, or the attempt budget runs out.
///
/// Individual fetch failures are logged and count as attempts; the loop
/// keeps going until the budget is spent.
#[instrument(skip(catalog, email))]
pub async fn await_purchases(
    catalog: &CatalogClient,
    email: &str,
    initial_count: usize,
    policy: PollPolicy,
) -> ConfirmOutcome {
    let mut delay = policy.initial_delay;
    let mut latest = BTreeSet::new();

    for attempt in 1..=policy.max_attempts {
        match catalog.find_user_by_email(email).await {
            Ok(Some(user)) => {
                let ids = user.purchased_file_ids();
                if ids.len() > initial_count {
                    tracing::info!(attempt, "Purchase confirmed");
                    return ConfirmOutcome {
                        confirmed: true,
                        attempts: attempt,
                        purchased: ids,
                    };
                }
                latest = ids;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, attempt, "Confirmation poll fetch failed");
            }
        }

        if attempt < policy.max_attempts {
            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(policy.max_delay);
        }
    }

    tracing::info!(
        attempts = policy.max_attempts,
        "Confirmation budget exhausted without observing fulfillment"
    );

    ConfirmOutcome {
        confirmed: false,
        attempts: policy.max_attempts,
        purchased: latest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_bounded() {
        let policy = PollPolicy::default();
        assert_eq!(policy.max_attempts, 15);
        assert!(policy.initial_delay < policy.max_delay);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = PollPolicy::default();
        let mut delay = policy.initial_delay;
        let mut total = Duration::ZERO;
        for _ in 1..policy.max_attempts {
            total += delay;
            delay = (delay * 2).min(policy.max_delay);
        }
        assert_eq!(delay, policy.max_delay);
        // The whole budget stays around the two minute mark
        assert!(total < Duration::from_secs(120));
    }
}
