use std::collections::HashSet;

use crate::{config::Config, model::role::Role, models::normalize_email};

/// Decides who may perform administrative operations.
///
/// A principal is an administrator when its token carries the admin role or
/// its email is on the configured allow-list. Allow-listed accounts are also
/// protected from deletion.
#[derive(Debug, Clone, Default)]
pub struct AdminPolicy {
    allow_list: HashSet<String>,
}

impl AdminPolicy {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allow_list: emails
                .into_iter()
                .map(|e| normalize_email(e.as_ref()))
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.admin_emails)
    }

    pub fn is_allow_listed(&self, email: &str) -> bool {
        self.allow_list.contains(&normalize_email(email))
    }

    pub fn is_admin(&self, email: &str, role: Role) -> bool {
        role == Role::Admin || self.is_allow_listed(email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_or_allow_list_grants_admin() {
        let policy = AdminPolicy::new(["Warden@Mess.in"]);
        assert!(policy.is_admin("warden@mess.in", Role::Member));
        assert!(policy.is_admin(" WARDEN@mess.in ", Role::Member));
        assert!(policy.is_admin("cook@mess.in", Role::Admin));
        assert!(!policy.is_admin("asha@hostel.in", Role::Member));
    }

    #[test]
    fn empty_policy_only_trusts_the_role() {
        let policy = AdminPolicy::default();
        assert!(!policy.is_allow_listed(""));
        assert!(!policy.is_admin("warden@mess.in", Role::Member));
        assert!(policy.is_admin("warden@mess.in", Role::Admin));
    }
}
