//! Shared reference data: publications, classes, zones, cities, transports.
//!
//! These tables are not branch scoped. Update bodies skip absent fields when
//! serialized so only the provided columns get written; an explicit `null` on a
//! nullable column is kept and clears it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::serde_util::nullable;

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreatePublicationRequest {
    #[validate(length(min = 1, max = 150, message = "Publication name must be 1-150 characters"))]
    pub name: String,
    #[validate(length(max = 100))]
    pub contact_person: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct UpdatePublicationRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 150, message = "Publication name must be 1-150 characters"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100))]
    pub contact_person: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 32))]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100))]
    pub city: Option<Option<String>>,
}

/// A school class / grade that books are assigned to.
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreateClassRequest {
    #[validate(length(min = 1, max = 50, message = "Class name must be 1-50 characters"))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct UpdateClassRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 50, message = "Class name must be 1-50 characters"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500))]
    pub description: Option<Option<String>>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreateZoneRequest {
    #[validate(length(min = 1, max = 100, message = "Zone name must be 1-100 characters"))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct UpdateZoneRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100, message = "Zone name must be 1-100 characters"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500))]
    pub description: Option<Option<String>>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreateCityRequest {
    #[validate(length(min = 1, max = 100, message = "City name must be 1-100 characters"))]
    pub name: String,
    pub zone_id: Option<Uuid>,
    #[validate(length(max = 100))]
    pub state: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct UpdateCityRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100, message = "City name must be 1-100 characters"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100))]
    pub state: Option<Option<String>>,
}

/// A carrier used to ship stock between publishers and branches.
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreateTransportRequest {
    #[validate(length(min = 1, max = 150, message = "Transport name must be 1-150 characters"))]
    pub name: String,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 32))]
    pub vehicle_number: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct UpdateTransportRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 150, message = "Transport name must be 1-150 characters"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 32))]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100))]
    pub city: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 32))]
    pub vehicle_number: Option<Option<String>>,
}
