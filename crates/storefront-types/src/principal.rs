//! Authenticated caller identity.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Role of an authenticated user.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (role IN ('customer', 'admin'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Customer => write!(f, "customer"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "customer" => Ok(Role::Customer),
            "admin" => Ok(Role::Admin),
            other => Err(format!("invalid role: '{other}'")),
        }
    }
}

/// The user on whose behalf a request or connection runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub user_id: i64,
    pub role: Role,
}

impl Principal {
    pub fn customer(user_id: i64) -> Self {
        Self {
            user_id,
            role: Role::Customer,
        }
    }

    pub fn admin(user_id: i64) -> Self {
        Self {
            user_id,
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_display_and_parse() {
        assert_eq!(Role::Admin.to_string(), "admin");
        assert_eq!("Customer".parse::<Role>().unwrap(), Role::Customer);
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn test_principal_serializes_camel_case() {
        let json = serde_json::to_value(Principal::admin(3)).unwrap();
        assert_eq!(json["userId"], 3);
        assert_eq!(json["role"], "admin");
    }
}
