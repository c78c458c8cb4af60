use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Privilege tier carried by a verified credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Sees every property and all data
    Superadmin,
    /// Manages the properties they own
    Admin,
    /// Property owner with read access to their listings and revenue
    Owner,
    /// Guest account; own bookings and profile only
    User,
}

/// Guarded operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ViewAllProperties,
    ViewOwnedProperties,
    ViewRevenue,
    ManageContent,
    ManageUsers,
    ClearCache,
    ViewOwnBookings,
}

/// Single permission check used by every command
pub fn is_allowed(role: Role, action: Action) -> bool {
    use Action::*;

    match role {
        Role::Superadmin => true,
        Role::Admin => matches!(
            action,
            ViewOwnedProperties | ViewRevenue | ManageContent | ClearCache | ViewOwnBookings
        ),
        Role::Owner => matches!(action, ViewOwnedProperties | ViewRevenue | ViewOwnBookings),
        Role::User => matches!(action, ViewOwnBookings),
    }
}
