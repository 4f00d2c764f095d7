//! Branch model: a retail outlet and tenant unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::validation::{validate_branch_code, validate_db_name};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Branch {
    pub id: Uuid,

    pub name: String,

    /// Short unique tag, e.g. `BR-01`
    pub code: String,

    /// Dedicated database for this branch, if it has one
    pub db_name: Option<String>,

    pub address: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,

    pub is_active: bool,

    #[serde(serialize_with = "crate::serde_util::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "crate::serde_util::timestamp")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreateBranchRequest {
    #[validate(length(min = 2, max = 100, message = "Branch name must be 2-100 characters"))]
    pub name: String,

    #[validate(length(max = 16, message = "Branch code must be at most 16 characters"))]
    #[validate(custom(function = "validate_branch_code"))]
    pub code: String,

    #[validate(custom(function = "validate_db_name"))]
    pub db_name: Option<String>,

    #[validate(length(max = 300))]
    pub address: Option<String>,

    #[validate(length(max = 100))]
    pub city: Option<String>,

    #[validate(length(max = 32))]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct UpdateBranchRequest {
    #[validate(length(min = 2, max = 100, message = "Branch name must be 2-100 characters"))]
    pub name: Option<String>,

    #[validate(custom(function = "validate_db_name"))]
    pub db_name: Option<String>,

    #[validate(length(max = 300))]
    pub address: Option<String>,

    #[validate(length(max = 100))]
    pub city: Option<String>,

    #[validate(length(max = 32))]
    pub phone: Option<String>,

    pub is_active: Option<bool>,
}
