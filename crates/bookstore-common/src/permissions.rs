//! Role-based permissions.
//!
//! Every staff account has exactly one [`Role`]; each role maps to a fixed
//! [`Permissions`] bitfield. Handlers check the bits, never the role name.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Staff role stored on the user record and embedded in session tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Head office. Sees and manages every branch.
    SuperAdmin,
    /// Runs a single branch: customers, catalog, stock.
    BranchAdmin,
    /// Maintains stock levels of one branch.
    StockManager,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::BranchAdmin => "branch_admin",
            Self::StockManager => "stock_manager",
        }
    }

    pub fn permissions(&self) -> Permissions {
        match self {
            Self::SuperAdmin => Permissions::all(),
            Self::BranchAdmin => {
                Permissions::VIEW_CATALOG
                    | Permissions::MANAGE_CATALOG
                    | Permissions::MANAGE_STOCK
                    | Permissions::MANAGE_CUSTOMERS
            }
            Self::StockManager => Permissions::VIEW_CATALOG | Permissions::MANAGE_STOCK,
        }
    }

    /// Roles below super admin must belong to a branch.
    pub fn requires_branch(&self) -> bool {
        !matches!(self, Self::SuperAdmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Self::SuperAdmin),
            "branch_admin" => Ok(Self::BranchAdmin),
            "stock_manager" => Ok(Self::StockManager),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Permissions: u32 {
        /// Read catalog, customers and summaries
        const VIEW_CATALOG      = 1 << 0;
        /// Publications, classes, zones, cities, transports
        const MANAGE_CATALOG    = 1 << 1;
        /// Books and stationery items, including stock levels
        const MANAGE_STOCK      = 1 << 2;
        const MANAGE_CUSTOMERS  = 1 << 3;
        const MANAGE_BRANCHES   = 1 << 4;
        /// Create and edit staff accounts
        const MANAGE_STAFF      = 1 << 5;
        /// Bypass branch scoping
        const VIEW_ALL_BRANCHES = 1 << 6;
    }
}

impl Permissions {
    pub fn has(&self, required: Permissions) -> bool {
        self.contains(required)
    }

    /// Name of the first missing bit, for error messages.
    pub fn missing_name(&self, required: Permissions) -> String {
        (required - *self)
            .iter_names()
            .next()
            .map(|(name, _)| name.to_string())
            .unwrap_or_default()
    }
}
