//! # Access Policy
//!
//! Which role may perform which action, and over how wide a scope.
//!
//! ## Permission Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  "pay_transaction:org"                                                  │
//! │   ───────┬─────── ─┬─                                                   │
//! │       action     scope                                                  │
//! │                                                                         │
//! │  org → only inside the principal's own business                         │
//! │  any → across every business (platform staff)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The policy is built once at startup ([`AccessPolicy::standard`]) and
//! handed to services; it is never mutated afterwards.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};

// =============================================================================
// Roles, Actions, Scopes
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Superadmin,
    Owner,
    Manager,
    Cashier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ReadProduct,
    CreateTransaction,
    ReadTransaction,
    UpdateTransaction,
    PayTransaction,
    CancelTransaction,
    CreateCategory,
    ReadCategory,
    SortCategory,
}

impl Action {
    const ALL: [Action; 9] = [
        Action::ReadProduct,
        Action::CreateTransaction,
        Action::ReadTransaction,
        Action::UpdateTransaction,
        Action::PayTransaction,
        Action::CancelTransaction,
        Action::CreateCategory,
        Action::ReadCategory,
        Action::SortCategory,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Action::ReadProduct => "read_product",
            Action::CreateTransaction => "create_transaction",
            Action::ReadTransaction => "read_transaction",
            Action::UpdateTransaction => "update_transaction",
            Action::PayTransaction => "pay_transaction",
            Action::CancelTransaction => "cancel_transaction",
            Action::CreateCategory => "create_category",
            Action::ReadCategory => "read_category",
            Action::SortCategory => "sort_category",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Org,
    Any,
}

impl Scope {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Scope::Org => "org",
            Scope::Any => "any",
        }
    }
}

// =============================================================================
// Permission
// =============================================================================

/// An action paired with the scope it is granted over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Permission {
    pub action: Action,
    pub scope: Scope,
}

impl Permission {
    pub const fn org(action: Action) -> Self {
        Permission {
            action,
            scope: Scope::Org,
        }
    }

    pub const fn any(action: Action) -> Self {
        Permission {
            action,
            scope: Scope::Any,
        }
    }

    /// The org- and any-scoped forms of an action, the usual "required" list.
    pub const fn either(action: Action) -> [Permission; 2] {
        [Permission::org(action), Permission::any(action)]
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.action.as_str(), self.scope.as_str())
    }
}

impl FromStr for Permission {
    type Err = ValidationError;

    /// Parses `action:scope`; the scope is whatever follows the last ':'.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidFormat {
            field: "permission".to_string(),
            reason: format!("unknown permission '{}'", s),
        };

        let (action, scope) = s.rsplit_once(':').ok_or_else(invalid)?;
        let action = Action::ALL
            .into_iter()
            .find(|a| a.as_str() == action)
            .ok_or_else(invalid)?;
        let scope = match scope {
            "org" => Scope::Org,
            "any" => Scope::Any,
            _ => return Err(invalid()),
        };

        Ok(Permission { action, scope })
    }
}

// =============================================================================
// Principal
// =============================================================================

/// The authenticated caller, as extracted from a token by the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: String,
    pub role: Role,
    /// Absent for platform staff.
    pub business_id: Option<String>,
}

// =============================================================================
// Access Policy
// =============================================================================

/// Immutable role → permission table.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    grants: HashMap<Role, Vec<Permission>>,
}

impl AccessPolicy {
    /// Builds a policy from explicit grants.
    pub fn new(grants: HashMap<Role, Vec<Permission>>) -> Self {
        AccessPolicy { grants }
    }

    /// The default grant table.
    ///
    /// ```text
    ///              read_product  create/read/pay_tx  update/cancel_tx  categories
    /// superadmin       any              any                any          any
    /// owner            org              org                org          org
    /// manager          org              org                org          org
    /// cashier          org              org                 -           read:org
    /// ```
    pub fn standard() -> Self {
        use Action::*;

        let every = |scope: fn(Action) -> Permission| -> Vec<Permission> {
            Action::ALL.into_iter().map(scope).collect()
        };

        let mut grants = HashMap::new();
        grants.insert(Role::Superadmin, every(Permission::any));
        grants.insert(Role::Owner, every(Permission::org));
        grants.insert(Role::Manager, every(Permission::org));
        grants.insert(
            Role::Cashier,
            [
                ReadProduct,
                CreateTransaction,
                ReadTransaction,
                PayTransaction,
                ReadCategory,
            ]
            .into_iter()
            .map(Permission::org)
            .collect(),
        );

        AccessPolicy { grants }
    }

    /// Returns the first permission granted to `role` that appears in
    /// `required`, or `None` if the role holds none of them.
    pub fn is_allowed(&self, role: Role, required: &[Permission]) -> Option<Permission> {
        self.grants
            .get(&role)?
            .iter()
            .find(|granted| required.contains(granted))
            .copied()
    }

    /// Checks that `principal` may act on `business_id`.
    ///
    /// ## Rules
    /// - No matching permission → `Forbidden`
    /// - Org scope and the principal belongs to another business (or none)
    ///   → `Forbidden`
    /// - Any scope → allowed for every business
    pub fn authorize(
        &self,
        principal: &Principal,
        required: &[Permission],
        business_id: &str,
    ) -> CoreResult<Permission> {
        let forbidden = || CoreError::Forbidden {
            permission: required
                .first()
                .map(ToString::to_string)
                .unwrap_or_default(),
        };

        let granted = self.is_allowed(principal.role, required).ok_or_else(forbidden)?;

        if granted.scope == Scope::Org && principal.business_id.as_deref() != Some(business_id) {
            return Err(forbidden());
        }

        Ok(granted)
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        AccessPolicy::standard()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
