//! Column schemas for every table exposed through the generic document endpoints.
//!
//! Query parameters and request bodies name columns by string. Only names listed
//! here ever reach SQL text; values are always bound as parameters, typed by
//! the column's [`ColumnKind`].

use bookstore_common::error::BookstoreError;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Uuid,
    Text,
    Integer,
    Float,
    Bool,
    Timestamp,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    /// Accepted in create/update bodies
    pub writable: bool,
}

const fn col(name: &'static str, kind: ColumnKind) -> Column {
    Column {
        name,
        kind,
        writable: true,
    }
}

const fn read_only(name: &'static str, kind: ColumnKind) -> Column {
    Column {
        name,
        kind,
        writable: false,
    }
}

const ID: Column = read_only("id", ColumnKind::Uuid);
const CREATED_AT: Column = read_only("created_at", ColumnKind::Timestamp);
const UPDATED_AT: Column = read_only("updated_at", ColumnKind::Timestamp);

#[derive(Debug)]
pub struct Schema {
    pub table: &'static str,
    /// Human name used in error messages
    pub resource: &'static str,
    pub columns: &'static [Column],
    /// Column compared against the caller's branch when the caller is branch scoped
    pub scope_column: Option<&'static str>,
}

impl Schema {
    pub fn column(&self, name: &str) -> Result<&Column, BookstoreError> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| {
                BookstoreError::validation(format!(
                    "Unknown field '{name}' for {}",
                    self.resource.to_lowercase()
                ))
            })
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }
}

pub static BRANCHES: Schema = Schema {
    table: "branches",
    resource: "Branch",
    columns: &[
        ID,
        col("name", ColumnKind::Text),
        col("code", ColumnKind::Text),
        col("db_name", ColumnKind::Text),
        col("address", ColumnKind::Text),
        col("city", ColumnKind::Text),
        col("phone", ColumnKind::Text),
        col("is_active", ColumnKind::Bool),
        CREATED_AT,
        UPDATED_AT,
    ],
    scope_column: Some("id"),
};

/// Staff accounts. `password_hash` is deliberately absent.
pub static USERS: Schema = Schema {
    table: "users",
    resource: "User",
    columns: &[
        ID,
        col("name", ColumnKind::Text),
        col("email", ColumnKind::Text),
        col("role", ColumnKind::Text),
        col("branch_id", ColumnKind::Uuid),
        col("is_active", ColumnKind::Bool),
        CREATED_AT,
        UPDATED_AT,
    ],
    scope_column: Some("branch_id"),
};

pub static CUSTOMERS: Schema = Schema {
    table: "customers",
    resource: "Customer",
    columns: &[
        ID,
        col("branch_id", ColumnKind::Uuid),
        col("name", ColumnKind::Text),
        col("phone", ColumnKind::Text),
        col("email", ColumnKind::Text),
        col("address", ColumnKind::Text),
        col("city_id", ColumnKind::Uuid),
        col("zone_id", ColumnKind::Uuid),
        CREATED_AT,
        UPDATED_AT,
    ],
    scope_column: Some("branch_id"),
};

pub static BOOKS: Schema = Schema {
    table: "books",
    resource: "Book",
    columns: &[
        ID,
        col("branch_id", ColumnKind::Uuid),
        col("title", ColumnKind::Text),
        col("isbn", ColumnKind::Text),
        col("author", ColumnKind::Text),
        col("subject", ColumnKind::Text),
        col("publication_id", ColumnKind::Uuid),
        col("class_id", ColumnKind::Uuid),
        col("price", ColumnKind::Float),
        col("stock", ColumnKind::Integer),
        CREATED_AT,
        UPDATED_AT,
    ],
    scope_column: Some("branch_id"),
};

pub static STATIONERY_ITEMS: Schema = Schema {
    table: "stationery_items",
    resource: "Stationery item",
    columns: &[
        ID,
        col("branch_id", ColumnKind::Uuid),
        col("name", ColumnKind::Text),
        col("category", ColumnKind::Text),
        col("price", ColumnKind::Float),
        col("stock", ColumnKind::Integer),
        CREATED_AT,
        UPDATED_AT,
    ],
    scope_column: Some("branch_id"),
};

pub static PUBLICATIONS: Schema = Schema {
    table: "publications",
    resource: "Publication",
    columns: &[
        ID,
        col("name", ColumnKind::Text),
        col("contact_person", ColumnKind::Text),
        col("phone", ColumnKind::Text),
        col("email", ColumnKind::Text),
        col("city", ColumnKind::Text),
        CREATED_AT,
        UPDATED_AT,
    ],
    scope_column: None,
};

pub static CLASSES: Schema = Schema {
    table: "classes",
    resource: "Class",
    columns: &[
        ID,
        col("name", ColumnKind::Text),
        col("description", ColumnKind::Text),
        CREATED_AT,
        UPDATED_AT,
    ],
    scope_column: None,
};

pub static ZONES: Schema = Schema {
    table: "zones",
    resource: "Zone",
    columns: &[
        ID,
        col("name", ColumnKind::Text),
        col("description", ColumnKind::Text),
        CREATED_AT,
        UPDATED_AT,
    ],
    scope_column: None,
};

pub static CITIES: Schema = Schema {
    table: "cities",
    resource: "City",
    columns: &[
        ID,
        col("name", ColumnKind::Text),
        col("zone_id", ColumnKind::Uuid),
        col("state", ColumnKind::Text),
        CREATED_AT,
        UPDATED_AT,
    ],
    scope_column: None,
};

pub static TRANSPORTS: Schema = Schema {
    table: "transports",
    resource: "Transport",
    columns: &[
        ID,
        col("name", ColumnKind::Text),
        col("phone", ColumnKind::Text),
        col("city", ColumnKind::Text),
        col("vehicle_number", ColumnKind::Text),
        CREATED_AT,
        UPDATED_AT,
    ],
    scope_column: None,
};

/// Every countable resource, keyed by its URL segment.
pub static RESOURCES: &[(&str, &Schema)] = &[
    ("branches", &BRANCHES),
    ("users", &USERS),
    ("customers", &CUSTOMERS),
    ("books", &BOOKS),
    ("stationery", &STATIONERY_ITEMS),
    ("publications", &PUBLICATIONS),
    ("classes", &CLASSES),
    ("zones", &ZONES),
    ("cities", &CITIES),
    ("transports", &TRANSPORTS),
];

pub fn resource_by_name(name: &str) -> Option<&'static Schema> {
    RESOURCES
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, schema)| *schema)
}

/// A typed value ready to bind. `None` binds SQL NULL of the column's type.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Uuid(Option<Uuid>),
    Text(Option<String>),
    Integer(Option<i64>),
    Float(Option<f64>),
    Bool(Option<bool>),
    Timestamp(Option<DateTime<Utc>>),
}

impl BindValue {
    /// Parse a query-string value for `column`.
    pub fn parse(column: &Column, raw: &str) -> Result<Self, BookstoreError> {
        let invalid = || {
            BookstoreError::validation(format!("Invalid value '{raw}' for '{}'", column.name))
        };
        Ok(match column.kind {
            ColumnKind::Uuid => Self::Uuid(Some(raw.parse().map_err(|_| invalid())?)),
            ColumnKind::Text => Self::Text(Some(raw.to_string())),
            ColumnKind::Integer => Self::Integer(Some(raw.trim().parse().map_err(|_| invalid())?)),
            ColumnKind::Float => Self::Float(Some(raw.trim().parse().map_err(|_| invalid())?)),
            ColumnKind::Bool => Self::Bool(Some(raw.trim().parse().map_err(|_| invalid())?)),
            ColumnKind::Timestamp => Self::Timestamp(Some(parse_timestamp(raw).ok_or_else(invalid)?)),
        })
    }

    /// Convert a JSON body value for `column`.
    pub fn from_json(column: &Column, value: &Value) -> Result<Self, BookstoreError> {
        let invalid = || {
            BookstoreError::validation(format!("Invalid value for '{}'", column.name))
        };
        if value.is_null() {
            return Ok(Self::null(column.kind));
        }
        Ok(match column.kind {
            ColumnKind::Uuid => Self::Uuid(Some(
                value
                    .as_str()
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(invalid)?,
            )),
            ColumnKind::Text => Self::Text(Some(value.as_str().ok_or_else(invalid)?.to_string())),
            ColumnKind::Integer => Self::Integer(Some(value.as_i64().ok_or_else(invalid)?)),
            ColumnKind::Float => Self::Float(Some(value.as_f64().ok_or_else(invalid)?)),
            ColumnKind::Bool => Self::Bool(Some(value.as_bool().ok_or_else(invalid)?)),
            ColumnKind::Timestamp => Self::Timestamp(Some(
                value.as_str().and_then(parse_timestamp).ok_or_else(invalid)?,
            )),
        })
    }

    fn null(kind: ColumnKind) -> Self {
        match kind {
            ColumnKind::Uuid => Self::Uuid(None),
            ColumnKind::Text => Self::Text(None),
            ColumnKind::Integer => Self::Integer(None),
            ColumnKind::Float => Self::Float(None),
            ColumnKind::Bool => Self::Bool(None),
            ColumnKind::Timestamp => Self::Timestamp(None),
        }
    }

    pub fn push(self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            Self::Uuid(v) => qb.push_bind(v),
            Self::Text(v) => qb.push_bind(v),
            Self::Integer(v) => qb.push_bind(v),
            Self::Float(v) => qb.push_bind(v),
            Self::Bool(v) => qb.push_bind(v),
            Self::Timestamp(v) => qb.push_bind(v),
        };
    }
}

/// RFC 3339 timestamps, or plain `YYYY-MM-DD` dates taken as midnight UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Postgres rendering of `serde_util::format_timestamp`, applied to a UTC timestamp.
const TIMESTAMP_FORMAT: &str = r#"'YYYY-MM-DD"T"HH24:MI:SS.US"Z"'"#;

/// `jsonb_build_object('id', id, 'name', name, ...)`. Timestamp columns are
/// formatted like the typed rows serialize them.
pub(crate) fn push_document(
    qb: &mut QueryBuilder<'_, Postgres>,
    schema: &Schema,
    columns: &[&'static str],
) {
    qb.push("jsonb_build_object(");
    let mut separated = qb.separated(", ");
    for name in columns {
        let is_timestamp = schema
            .columns
            .iter()
            .any(|c| c.name == *name && c.kind == ColumnKind::Timestamp);
        if is_timestamp {
            separated.push(format!(
                "'{name}', to_char({name} AT TIME ZONE 'UTC', {TIMESTAMP_FORMAT})"
            ));
        } else {
            separated.push(format!("'{name}', {name}"));
        }
    }
    qb.push(")");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_column_is_rejected() {
        let err = BOOKS.column("password").unwrap_err();
        assert_eq!(err.to_string(), "Validation failed: Unknown field 'password' for book");
    }

    #[test]
    fn test_users_never_expose_password_hash() {
        assert!(USERS.column("password_hash").is_err());
    }

    #[test]
    fn test_parse_by_kind() {
        let price = BOOKS.column("price").unwrap();
        assert_eq!(BindValue::parse(price, "100").unwrap(), BindValue::Float(Some(100.0)));
        assert!(BindValue::parse(price, "cheap").is_err());

        let stock = BOOKS.column("stock").unwrap();
        assert_eq!(BindValue::parse(stock, " 7 ").unwrap(), BindValue::Integer(Some(7)));

        let active = BRANCHES.column("is_active").unwrap();
        assert_eq!(BindValue::parse(active, "true").unwrap(), BindValue::Bool(Some(true)));
    }

    #[test]
    fn test_parse_timestamp_accepts_dates() {
        let created = BOOKS.column("created_at").unwrap();
        let BindValue::Timestamp(Some(ts)) = BindValue::parse(created, "2024-03-01").unwrap() else {
            panic!("expected timestamp");
        };
        assert_eq!(ts.to_rfc3339(), "2024-03-01T00:00:00+00:00");
    }

    #[test]
    fn test_from_json() {
        let branch = BOOKS.column("branch_id").unwrap();
        assert_eq!(BindValue::from_json(branch, &Value::Null).unwrap(), BindValue::Uuid(None));
        assert!(BindValue::from_json(branch, &json!("not-a-uuid")).is_err());

        let stock = BOOKS.column("stock").unwrap();
        assert!(BindValue::from_json(stock, &json!(2.5)).is_err());
    }

    #[test]
    fn test_document_timestamps_are_formatted() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        push_document(&mut qb, &ZONES, &["id", "created_at"]);
        assert_eq!(
            qb.sql(),
            "SELECT jsonb_build_object('id', id, 'created_at', \
             to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD\"T\"HH24:MI:SS.US\"Z\"'))"
        );
    }

    #[test]
    fn test_resource_lookup() {
        assert_eq!(resource_by_name("stationery").unwrap().table, "stationery_items");
        assert!(resource_by_name("orders").is_none());
    }
}
