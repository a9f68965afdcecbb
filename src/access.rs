use std::{collections::HashSet, fmt};

use crate::{auth::Identity, error::AccessError, models::Role};

/// RoleSet
///
/// The roles permitted on a route. Membership is exact: there is no hierarchy,
/// so a set of `{MANAGER}` does not admit an ADMIN.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSet(HashSet<Role>);

impl RoleSet {
    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Roles in a stable order, for logs and docs.
    pub fn sorted(&self) -> Vec<Role> {
        Role::ALL.into_iter().filter(|role| self.contains(*role)).collect()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        RoleSet(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[Role; N]> for RoleSet {
    fn from(roles: [Role; N]) -> Self {
        roles.into_iter().collect()
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<&str> = self.sorted().iter().map(Role::as_str).collect();
        write!(f, "{{{}}}", labels.join(", "))
    }
}

/// authorize
///
/// The role predicate. Without an identity the caller is `Unauthenticated`
/// (never `Forbidden`); with one, the role must be in `permitted`.
pub fn authorize(identity: Option<&Identity>, permitted: &RoleSet) -> Result<(), AccessError> {
    let identity = identity.ok_or(AccessError::Unauthenticated)?;
    if permitted.contains(identity.role) {
        Ok(())
    } else {
        Err(AccessError::Forbidden)
    }
}
