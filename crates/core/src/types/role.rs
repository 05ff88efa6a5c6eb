//! User roles.

use serde::{Deserialize, Serialize};

/// Role of a storefront user.
///
/// Every account starts as a `Customer`. Staff roles unlock parts of the
/// admin panel:
///
/// | Role       | Shop | Manage products | Manage users |
/// |------------|------|-----------------|--------------|
/// | `customer` | yes  | no              | no           |
/// | `employee` | yes  | yes             | no           |
/// | `admin`    | yes  | yes             | yes          |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access, including user management.
    Admin,
    /// Store staff: catalog and inventory management.
    Employee,
    /// Regular shopper.
    #[default]
    Customer,
}

impl Role {
    /// All roles, in the order they are offered in admin filters.
    pub const ALL: [Self; 3] = [Self::Admin, Self::Employee, Self::Customer];

    /// Whether this role may create products and adjust inventory.
    #[must_use]
    pub const fn can_manage_products(self) -> bool {
        matches!(self, Self::Admin | Self::Employee)
    }

    /// Whether this role may list users and change their roles.
    #[must_use]
    pub const fn can_manage_users(self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Stable lowercase name (matches the database enum label).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Employee => "employee",
            Self::Customer => "customer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "employee" => Ok(Self::Employee),
            // Older seed files call customers "user"
            "customer" | "user" => Ok(Self::Customer),
            other => Err(format!("invalid role: {other}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_permissions() {
        assert!(Role::Admin.can_manage_users());
        assert!(Role::Admin.can_manage_products());
        assert!(Role::Employee.can_manage_products());
        assert!(!Role::Employee.can_manage_users());
        assert!(!Role::Customer.can_manage_products());
        assert!(!Role::Customer.can_manage_users());
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("Employee".parse::<Role>().unwrap(), Role::Employee);
        assert_eq!("user".parse::<Role>().unwrap(), Role::Customer);
        assert!("manager".parse::<Role>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        for role in Role::ALL {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
    }
}
