//! Catalog CRUD: books, stationery, customers and the shared reference tables.
//!
//! Every resource exposes the same five endpoints; a [`CatalogResource`] impl
//! names its path, table schema, request bodies and the permission needed to write.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    middleware,
    routing::get,
    Json, Router,
};
use bookstore_common::{
    error::{BookstoreError, BookstoreResult},
    ids,
    models::{
        CreateBookRequest, CreateCityRequest, CreateClassRequest, CreateCustomerRequest,
        CreatePublicationRequest, CreateStationeryRequest, CreateTransportRequest,
        CreateZoneRequest, UpdateBookRequest, UpdateCityRequest, UpdateClassRequest,
        UpdateCustomerRequest, UpdatePublicationRequest, UpdateStationeryRequest,
        UpdateTransportRequest, UpdateZoneRequest,
    },
    permissions::Permissions,
    query::ApiFeatures,
    validation::validate_request,
};
use bookstore_db::{
    listing::ListQuery,
    repository::documents,
    schema::{self, Schema},
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::{middleware::AuthContext, AppState};

pub trait CatalogResource: Send + Sync + 'static {
    /// URL segment under `/api/v1`
    const PATH: &'static str;
    /// Needed for create, update and delete
    const WRITE: Permissions;

    type Create: DeserializeOwned + Serialize + Validate + Send + 'static;
    type Update: DeserializeOwned + Serialize + Validate + Send + 'static;

    fn schema() -> &'static Schema;
}

macro_rules! catalog_resource {
    ($marker:ident, $path:literal, $schema:path, $write:expr, $create:ty, $update:ty) => {
        pub struct $marker;

        impl CatalogResource for $marker {
            const PATH: &'static str = $path;
            const WRITE: Permissions = $write;
            type Create = $create;
            type Update = $update;

            fn schema() -> &'static Schema {
                &$schema
            }
        }
    };
}

catalog_resource!(Books, "books", schema::BOOKS, Permissions::MANAGE_STOCK, CreateBookRequest, UpdateBookRequest);
catalog_resource!(Stationery, "stationery", schema::STATIONERY_ITEMS, Permissions::MANAGE_STOCK, CreateStationeryRequest, UpdateStationeryRequest);
catalog_resource!(Customers, "customers", schema::CUSTOMERS, Permissions::MANAGE_CUSTOMERS, CreateCustomerRequest, UpdateCustomerRequest);
catalog_resource!(Publications, "publications", schema::PUBLICATIONS, Permissions::MANAGE_CATALOG, CreatePublicationRequest, UpdatePublicationRequest);
catalog_resource!(Classes, "classes", schema::CLASSES, Permissions::MANAGE_CATALOG, CreateClassRequest, UpdateClassRequest);
catalog_resource!(Zones, "zones", schema::ZONES, Permissions::MANAGE_CATALOG, CreateZoneRequest, UpdateZoneRequest);
catalog_resource!(Cities, "cities", schema::CITIES, Permissions::MANAGE_CATALOG, CreateCityRequest, UpdateCityRequest);
catalog_resource!(Transports, "transports", schema::TRANSPORTS, Permissions::MANAGE_CATALOG, CreateTransportRequest, UpdateTransportRequest);

/// Catalog router (all routes require authentication).
pub fn router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .merge(resource_routes::<Books>())
        .merge(resource_routes::<Stationery>())
        .merge(resource_routes::<Customers>())
        .merge(resource_routes::<Publications>())
        .merge(resource_routes::<Classes>())
        .merge(resource_routes::<Zones>())
        .merge(resource_routes::<Cities>())
        .merge(resource_routes::<Transports>())
        .route_layer(middleware::from_fn_with_state(
            state,
            crate::middleware::auth_middleware,
        ))
}

fn resource_routes<R: CatalogResource>() -> Router<Arc<AppState>> {
    Router::new()
        .route(&format!("/{}", R::PATH), get(list::<R>).post(create::<R>))
        .route(
            &format!("/{}/{{id}}", R::PATH),
            get(get_one::<R>).patch(update::<R>).delete(delete::<R>),
        )
}

/// Body of every list endpoint.
#[derive(Serialize)]
pub struct ListResponse {
    pub status: &'static str,
    /// Documents on this page
    pub results: usize,
    /// Documents matching the filters across all pages
    pub total: i64,
    pub page: u64,
    pub limit: u64,
    pub data: Vec<Value>,
}

#[derive(Serialize)]
pub struct DocumentResponse {
    pub status: &'static str,
    pub data: Value,
}

/// Run a list query for `schema` in the caller's scope.
pub async fn list_documents(
    state: &AppState,
    auth: &AuthContext,
    schema: &'static Schema,
    params: Vec<(String, String)>,
) -> BookstoreResult<ListResponse> {
    let features = ApiFeatures::from_query(params, state.config.limits.max_page_size)?;
    let page = ListQuery::new(schema, &features, auth.scope())?
        .fetch(&state.db.pool)
        .await?;

    Ok(ListResponse {
        status: "success",
        results: page.data.len(),
        total: page.total,
        page: features.page,
        limit: features.limit,
        data: page.data,
    })
}

/// Serialize a validated body into column/value pairs.
fn into_fields<T: Serialize>(body: &T) -> BookstoreResult<Map<String, Value>> {
    match serde_json::to_value(body).map_err(|e| BookstoreError::Internal(e.into()))? {
        Value::Object(map) => Ok(map),
        _ => Err(BookstoreError::validation("Request body must be a JSON object")),
    }
}

/// Pin `branch_id` for branch-scoped tables: callers bound to a branch always
/// write to their own, everyone else has to name one.
fn resolve_branch(
    schema: &Schema,
    auth: &AuthContext,
    fields: &mut Map<String, Value>,
) -> BookstoreResult<()> {
    if schema.scope_column != Some("branch_id") {
        fields.remove("branch_id");
        return Ok(());
    }

    match auth.scope().branch_id {
        Some(own) => {
            fields.insert("branch_id".into(), Value::String(own.to_string()));
        }
        None => {
            if fields.get("branch_id").is_none_or(Value::is_null) {
                return Err(BookstoreError::validation("branch_id is required"));
            }
        }
    }
    Ok(())
}

/// GET /api/v1/{resource}
async fn list<R: CatalogResource>(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
) -> BookstoreResult<Json<ListResponse>> {
    auth.require(Permissions::VIEW_CATALOG)?;
    Ok(Json(list_documents(&state, &auth, R::schema(), params).await?))
}

/// POST /api/v1/{resource}
async fn create<R: CatalogResource>(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<R::Create>,
) -> BookstoreResult<(StatusCode, Json<DocumentResponse>)> {
    auth.require(R::WRITE)?;
    validate_request(&body)?;

    let schema = R::schema();
    let mut fields = into_fields(&body)?;
    resolve_branch(schema, &auth, &mut fields)?;

    let id = ids::generate_id();
    let data = documents::insert(&state.db.pool, schema, id, &fields).await?;

    tracing::info!(resource = R::PATH, %id, user_id = %auth.user_id, "Created");

    Ok((
        StatusCode::CREATED,
        Json(DocumentResponse {
            status: "success",
            data,
        }),
    ))
}

/// GET /api/v1/{resource}/{id}
async fn get_one<R: CatalogResource>(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> BookstoreResult<Json<DocumentResponse>> {
    auth.require(Permissions::VIEW_CATALOG)?;

    let schema = R::schema();
    let data = documents::find_by_id(&state.db.pool, schema, id, auth.scope())
        .await?
        .ok_or_else(|| BookstoreError::not_found(schema.resource))?;

    Ok(Json(DocumentResponse {
        status: "success",
        data,
    }))
}

/// PATCH /api/v1/{resource}/{id}
async fn update<R: CatalogResource>(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<R::Update>,
) -> BookstoreResult<Json<DocumentResponse>> {
    auth.require(R::WRITE)?;
    validate_request(&body)?;

    let schema = R::schema();
    let fields = into_fields(&body)?;
    let data = documents::update(&state.db.pool, schema, id, &fields, auth.scope())
        .await?
        .ok_or_else(|| BookstoreError::not_found(schema.resource))?;

    Ok(Json(DocumentResponse {
        status: "success",
        data,
    }))
}

/// DELETE /api/v1/{resource}/{id}
async fn delete<R: CatalogResource>(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> BookstoreResult<StatusCode> {
    auth.require(R::WRITE)?;

    let schema = R::schema();
    if !documents::delete(&state.db.pool, schema, id, auth.scope()).await? {
        return Err(BookstoreError::not_found(schema.resource));
    }

    tracing::info!(resource = R::PATH, %id, user_id = %auth.user_id, "Deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookstore_common::permissions::Role;
    use serde_json::json;

    fn ctx(role: Role, branch_id: Option<Uuid>) -> AuthContext {
        AuthContext {
            user_id: Uuid::now_v7(),
            role,
            branch_id,
        }
    }

    fn fields(value: Value) -> Map<String, Value> {
        into_fields(&value).unwrap()
    }

    #[test]
    fn test_branch_users_write_to_their_own_branch() {
        let own = Uuid::now_v7();
        let mut body = fields(json!({ "title": "Algebra", "branch_id": Uuid::now_v7() }));
        resolve_branch(&schema::BOOKS, &ctx(Role::StockManager, Some(own)), &mut body).unwrap();
        assert_eq!(body["branch_id"], json!(own.to_string()));
    }

    #[test]
    fn test_super_admin_must_name_a_branch() {
        let admin = ctx(Role::SuperAdmin, None);
        let mut missing = fields(json!({ "title": "Algebra", "branch_id": null }));
        assert!(resolve_branch(&schema::BOOKS, &admin, &mut missing).is_err());

        let branch = Uuid::now_v7();
        let mut named = fields(json!({ "title": "Algebra", "branch_id": branch }));
        resolve_branch(&schema::BOOKS, &admin, &mut named).unwrap();
        assert_eq!(named["branch_id"], json!(branch.to_string()));
    }

    #[test]
    fn test_shared_tables_drop_branch_id() {
        let mut body = fields(json!({ "name": "North", "branch_id": Uuid::now_v7() }));
        resolve_branch(&schema::ZONES, &ctx(Role::BranchAdmin, Some(Uuid::now_v7())), &mut body).unwrap();
        assert!(!body.contains_key("branch_id"));
    }

    #[test]
    fn test_update_bodies_only_carry_given_fields() {
        let update = UpdateBookRequest {
            title: None,
            isbn: None,
            author: None,
            subject: None,
            publication_id: None,
            class_id: None,
            price: None,
            stock: Some(4),
        };
        assert_eq!(into_fields(&update).unwrap(), fields(json!({ "stock": 4 })));
    }

    #[test]
    fn test_explicit_null_clears_nullable_columns() {
        let update: UpdateBookRequest =
            serde_json::from_value(json!({ "isbn": null, "author": "Rao" })).unwrap();
        validate_request(&update).unwrap();
        assert_eq!(
            into_fields(&update).unwrap(),
            fields(json!({ "isbn": null, "author": "Rao" }))
        );

        let update: UpdateCustomerRequest =
            serde_json::from_value(json!({ "email": null, "city_id": null })).unwrap();
        assert_eq!(
            into_fields(&update).unwrap(),
            fields(json!({ "email": null, "city_id": null }))
        );
    }

    #[test]
    fn test_set_values_are_still_validated() {
        let update: UpdateBookRequest = serde_json::from_value(json!({ "isbn": "123" })).unwrap();
        assert!(validate_request(&update).is_err());
    }
}
