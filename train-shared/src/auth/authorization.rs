/// Capability-based authorization
///
/// Every protected operation names the [`Capability`] it needs, and
/// [`UserRole::grants`] is the single table mapping roles to capabilities.
/// Ownership of individual resources (a client reviewing only their own
/// tasks' submissions) is checked separately with [`require_ownership`].
///
/// # Permission Table
///
/// | Capability | user | client | admin |
/// |---|---|---|---|
/// | SubmitWork | ✓ | | |
/// | Withdraw | ✓ | | |
/// | PostTasks | | ✓ | |
/// | ReviewSubmissions | | ✓ | |
/// | ViewClientDashboard | | ✓ | |
/// | ManageMonetization | | | ✓ |
/// | ViewPlatformAnalytics | | | ✓ |
/// | SettlePayouts | | | ✓ |
///
/// # Example
///
/// ```
/// use train_shared::auth::authorization::{require_capability, Capability};
/// use train_shared::auth::middleware::AuthContext;
/// use train_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// let auth = AuthContext {
///     user_id: Uuid::new_v4(),
///     email: "client@example.com".to_string(),
///     role: UserRole::Client,
/// };
///
/// assert!(require_capability(&auth, Capability::PostTasks).is_ok());
/// assert!(require_capability(&auth, Capability::Withdraw).is_err());
/// ```

use uuid::Uuid;

use super::middleware::AuthContext;
use crate::models::user::UserRole;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Role lacks the capability
    #[error("Role {role} is not allowed to {capability}")]
    MissingCapability {
        role: UserRole,
        capability: Capability,
    },

    /// Caller does not own the resource
    #[error("Not authorized to access this resource")]
    NotAuthorized,
}

/// An action that requires a specific role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Submit work on a task
    SubmitWork,

    /// Request a payout of available earnings
    Withdraw,

    /// Create tasks in the marketplace
    PostTasks,

    /// Approve or reject submissions on owned tasks
    ReviewSubmissions,

    /// View the client dashboard and task list
    ViewClientDashboard,

    /// Toggle and configure monetization strategies
    ManageMonetization,

    /// View platform revenue, users and plans
    ViewPlatformAnalytics,

    /// Mark pending payouts completed or failed
    SettlePayouts,
}

impl Capability {
    /// Human-readable action name used in error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::SubmitWork => "submit work",
            Capability::Withdraw => "withdraw earnings",
            Capability::PostTasks => "post tasks",
            Capability::ReviewSubmissions => "review submissions",
            Capability::ViewClientDashboard => "view the client dashboard",
            Capability::ManageMonetization => "manage monetization",
            Capability::ViewPlatformAnalytics => "view platform analytics",
            Capability::SettlePayouts => "settle payouts",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl UserRole {
    /// Whether this role holds the capability
    pub fn grants(&self, capability: Capability) -> bool {
        use Capability::*;

        match self {
            UserRole::User => matches!(capability, SubmitWork | Withdraw),
            UserRole::Client => matches!(capability, PostTasks | ReviewSubmissions | ViewClientDashboard),
            UserRole::Admin => matches!(
                capability,
                ManageMonetization | ViewPlatformAnalytics | SettlePayouts
            ),
        }
    }
}

/// Requires the authenticated role to grant `capability`
pub fn require_capability(auth: &AuthContext, capability: Capability) -> Result<(), AuthzError> {
    if !auth.role.grants(capability) {
        return Err(AuthzError::MissingCapability {
            role: auth.role,
            capability,
        });
    }

    Ok(())
}

/// Requires the authenticated user to own the resource
pub fn require_ownership(auth: &AuthContext, resource_owner_id: Uuid) -> Result<(), AuthzError> {
    if auth.user_id != resource_owner_id {
        return Err(AuthzError::NotAuthorized);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(role: UserRole) -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            email: "someone@example.com".to_string(),
            role,
        }
    }

    #[test]
    fn test_trainer_capabilities() {
        let role = UserRole::User;
        assert!(role.grants(Capability::SubmitWork));
        assert!(role.grants(Capability::Withdraw));
        assert!(!role.grants(Capability::PostTasks));
        assert!(!role.grants(Capability::ReviewSubmissions));
        assert!(!role.grants(Capability::ManageMonetization));
    }

    #[test]
    fn test_client_capabilities() {
        let role = UserRole::Client;
        assert!(role.grants(Capability::PostTasks));
        assert!(role.grants(Capability::ReviewSubmissions));
        assert!(role.grants(Capability::ViewClientDashboard));
        assert!(!role.grants(Capability::SubmitWork));
        assert!(!role.grants(Capability::Withdraw));
        assert!(!role.grants(Capability::SettlePayouts));
    }

    #[test]
    fn test_admin_capabilities() {
        let role = UserRole::Admin;
        assert!(role.grants(Capability::ManageMonetization));
        assert!(role.grants(Capability::ViewPlatformAnalytics));
        assert!(role.grants(Capability::SettlePayouts));
        assert!(!role.grants(Capability::ReviewSubmissions));
        assert!(!role.grants(Capability::Withdraw));
    }

    #[test]
    fn test_require_capability_error_names_role_and_action() {
        let err = require_capability(&context(UserRole::User), Capability::PostTasks).unwrap_err();
        assert_eq!(err.to_string(), "Role user is not allowed to post tasks");
    }

    #[test]
    fn test_require_ownership() {
        let auth = context(UserRole::Client);

        assert!(require_ownership(&auth, auth.user_id).is_ok());
        assert!(matches!(
            require_ownership(&auth, Uuid::new_v4()),
            Err(AuthzError::NotAuthorized)
        ));
    }
}
