//! Session-scoped user profile.

use std::collections::BTreeSet;

use paperstack_core::{Email, FileId};
use serde::{Deserialize, Serialize};

/// The visitor's synced profile, stored in the session.
///
/// A projection of the catalog user record taken at the last successful
/// sync. `purchased` holds file-storage ids (what the client needs to
/// unlock downloads) with set semantics: duplicates never accumulate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionProfile {
    /// Address the identity provider attested.
    pub email: Email,
    /// Identity-provider user id.
    pub identity_id: String,
    /// Blocked users never keep a session; the flag only ever reads
    /// `false` here because a blocked sync tears the session down.
    pub blocked: bool,
    /// File ids of everything the user has bought.
    pub purchased: BTreeSet<FileId>,
}

impl SessionProfile {
    /// Profile for a user the catalog has never seen: empty library,
    /// unblocked.
    #[must_use]
    pub const fn first_time(email: Email, identity_id: String) -> Self {
        Self {
            email,
            identity_id,
            blocked: false,
            purchased: BTreeSet::new(),
        }
    }

    /// Number of purchased items (the confirmation poll watches this grow).
    #[must_use]
    pub fn purchased_count(&self) -> usize {
        self.purchased.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_first_time_profile_is_empty_and_unblocked() {
        let profile = SessionProfile::first_time(
            Email::parse("buyer@example.com").unwrap(),
            "idp_123".to_string(),
        );
        assert!(!profile.blocked);
        assert_eq!(profile.purchased_count(), 0);
    }

    #[test]
    fn test_purchased_set_deduplicates() {
        let mut profile = SessionProfile::first_time(
            Email::parse("buyer@example.com").unwrap(),
            "idp_123".to_string(),
        );
        profile.purchased.insert(FileId::from("file-a"));
        profile.purchased.insert(FileId::from("file-a"));
        profile.purchased.insert(FileId::from("file-b"));
        assert_eq!(profile.purchased_count(), 2);
    }
}
