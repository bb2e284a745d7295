//! Team-member privilege registry.
//!
//! The identity that creates the registry is its first member. Membership
//! only grows: members may add members, nobody can be removed, so the set
//! is never empty.

use std::collections::BTreeSet;

use crate::error::AccessError;
use crate::types::Identity;

/// Set of identities holding the team-member privilege.
#[derive(Debug, Clone)]
pub struct AccessRegistry {
    members: BTreeSet<Identity>,
    founder: Identity,
}

impl AccessRegistry {
    /// Create a registry whose only member is `founder`.
    pub fn new(founder: Identity) -> Self {
        let mut members = BTreeSet::new();
        members.insert(founder);
        Self { members, founder }
    }

    /// Whether `identity` is a team member.
    pub fn is_member(&self, identity: &Identity) -> bool {
        self.members.contains(identity)
    }

    /// Fail with [`AccessError::Unauthorized`] unless `caller` is a member.
    pub fn ensure_member(&self, caller: &Identity) -> Result<(), AccessError> {
        if self.is_member(caller) {
            Ok(())
        } else {
            Err(AccessError::Unauthorized(*caller))
        }
    }

    /// Add `identity` on behalf of `caller`.
    ///
    /// Returns `true` if the identity was newly added, `false` if it already
    /// was a member. Re-adding is a successful no-op.
    pub fn add_member(
        &mut self,
        identity: Identity,
        caller: &Identity,
    ) -> Result<bool, AccessError> {
        self.ensure_member(caller)?;
        Ok(self.members.insert(identity))
    }

    /// The identity the registry was created with.
    pub fn founder(&self) -> &Identity {
        &self.founder
    }

    /// All members in ascending byte order.
    pub fn members(&self) -> impl Iterator<Item = &Identity> {
        self.members.iter()
    }

    /// Number of members. Always at least one.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
