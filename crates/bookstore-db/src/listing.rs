//! Render [`ApiFeatures`] into SQL for one table.
//!
//! Rows come back as JSON documents (`jsonb_build_object`) so a projection can
//! drop columns without a dedicated row type per field combination.

use bookstore_common::{
    error::BookstoreError,
    query::{ApiFeatures, Comparison, Projection},
};
use serde::Serialize;
use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::schema::{push_document, BindValue, Schema};

/// Restricts a query to one branch. `None` sees every branch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scope {
    pub branch_id: Option<Uuid>,
}

impl Scope {
    pub const ALL: Scope = Scope { branch_id: None };

    pub fn branch(branch_id: Uuid) -> Self {
        Self {
            branch_id: Some(branch_id),
        }
    }

    /// `(column, branch)` when `schema` has a scope column and this scope is restricted.
    pub(crate) fn condition(&self, schema: &Schema) -> Option<(&'static str, Uuid)> {
        schema.scope_column.zip(self.branch_id)
    }
}

/// One page of documents plus the number of rows matching the filters.
#[derive(Debug, Serialize)]
pub struct Page {
    pub total: i64,
    pub data: Vec<Value>,
}

/// A checked, ready-to-render list query.
#[derive(Debug, Clone)]
pub struct ListQuery {
    schema: &'static Schema,
    conditions: Vec<(&'static str, Comparison, BindValue)>,
    order: Vec<(&'static str, bool)>,
    columns: Vec<&'static str>,
    limit: i64,
    offset: i64,
}

impl ListQuery {
    /// Check every field named by `features` against `schema` and type the filter values.
    pub fn new(
        schema: &'static Schema,
        features: &ApiFeatures,
        scope: Scope,
    ) -> Result<Self, BookstoreError> {
        let mut conditions = Vec::with_capacity(features.filters.len() + 1);
        if let Some((column, branch_id)) = scope.condition(schema) {
            conditions.push((column, Comparison::Eq, BindValue::Uuid(Some(branch_id))));
        }
        for filter in &features.filters {
            let column = schema.column(&filter.field)?;
            conditions.push((column.name, filter.op, BindValue::parse(column, &filter.value)?));
        }

        let order = features
            .sort
            .iter()
            .map(|key| Ok((schema.column(&key.field)?.name, key.descending)))
            .collect::<Result<Vec<_>, BookstoreError>>()?;

        let columns = match &features.projection {
            Projection::All => schema.column_names().collect(),
            Projection::Include(fields) => {
                let mut columns = vec!["id"];
                for field in fields {
                    let name = schema.column(field)?.name;
                    if !columns.contains(&name) {
                        columns.push(name);
                    }
                }
                columns
            }
            Projection::Exclude(fields) => {
                for field in fields {
                    schema.column(field)?;
                }
                schema
                    .column_names()
                    .filter(|name| *name == "id" || !fields.iter().any(|f| f == name))
                    .collect()
            }
        };

        Ok(Self {
            schema,
            conditions,
            order,
            columns,
            limit: i64::try_from(features.limit).unwrap_or(i64::MAX),
            offset: i64::try_from(features.offset()).unwrap_or(i64::MAX),
        })
    }

    /// `SELECT jsonb_build_object(..) FROM t WHERE .. ORDER BY .. LIMIT .. OFFSET ..`
    pub fn select(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT ");
        push_document(&mut qb, self.schema, &self.columns);
        qb.push(" FROM ").push(self.schema.table);
        self.push_where(&mut qb);

        qb.push(" ORDER BY ");
        for (name, descending) in &self.order {
            qb.push(*name).push(if *descending { " DESC, " } else { " ASC, " });
        }
        // id is time ordered; it breaks ties so pages never overlap
        qb.push("id DESC");

        qb.push(" LIMIT ").push_bind(self.limit);
        qb.push(" OFFSET ").push_bind(self.offset);
        qb
    }

    /// `SELECT COUNT(*) FROM t WHERE ..` with the same conditions as [`select`](Self::select).
    pub fn count(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM ");
        qb.push(self.schema.table);
        self.push_where(&mut qb);
        qb
    }

    fn push_where(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        for (i, (name, op, value)) in self.conditions.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            qb.push(*name).push(" ").push(op.sql_operator()).push(" ");
            value.clone().push(qb);
        }
    }

    pub async fn fetch(&self, pool: &PgPool) -> Result<Page, sqlx::Error> {
        let total: i64 = self.count().build_query_scalar().fetch_one(pool).await?;
        let data: Vec<Value> = self.select().build_query_scalar().fetch_all(pool).await?;
        Ok(Page { total, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{BOOKS, PUBLICATIONS};

    fn features(pairs: &[(&str, &str)]) -> ApiFeatures {
        let params = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiFeatures::from_query(params, 1000).unwrap()
    }

    #[test]
    fn test_default_listing() {
        let query = ListQuery::new(&PUBLICATIONS, &features(&[]), Scope::ALL).unwrap();
        assert_eq!(
            query.select().sql(),
            "SELECT jsonb_build_object('id', id, 'name', name, 'contact_person', contact_person, \
             'phone', phone, 'email', email, 'city', city, \
             'created_at', to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD\"T\"HH24:MI:SS.US\"Z\"'), \
             'updated_at', to_char(updated_at AT TIME ZONE 'UTC', 'YYYY-MM-DD\"T\"HH24:MI:SS.US\"Z\"')) \
             FROM publications ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        );
    }

    #[test]
    fn test_comparison_filters_are_bound() {
        let query = ListQuery::new(
            &BOOKS,
            &features(&[("price[gte]", "100"), ("subject", "Math")]),
            Scope::ALL,
        )
        .unwrap();
        assert_eq!(
            query.count().sql(),
            "SELECT COUNT(*) FROM books WHERE price >= $1 AND subject = $2"
        );
        assert_eq!(query.conditions[0].2, BindValue::Float(Some(100.0)));
    }

    #[test]
    fn test_pagination_window() {
        let query = ListQuery::new(&BOOKS, &features(&[("page", "2"), ("limit", "10")]), Scope::ALL).unwrap();
        assert_eq!((query.limit, query.offset), (10, 10));
    }

    #[test]
    fn test_branch_scope_comes_first() {
        let branch = Uuid::now_v7();
        let query = ListQuery::new(&BOOKS, &features(&[("stock[lt]", "5")]), Scope::branch(branch)).unwrap();
        assert_eq!(
            query.count().sql(),
            "SELECT COUNT(*) FROM books WHERE branch_id = $1 AND stock < $2"
        );
    }

    #[test]
    fn test_scope_ignored_for_shared_tables() {
        let query = ListQuery::new(&PUBLICATIONS, &features(&[]), Scope::branch(Uuid::now_v7())).unwrap();
        assert_eq!(query.count().sql(), "SELECT COUNT(*) FROM publications");
    }

    #[test]
    fn test_projection_always_keeps_id() {
        let include = ListQuery::new(&BOOKS, &features(&[("fields", "title,price,title")]), Scope::ALL).unwrap();
        assert_eq!(include.columns, vec!["id", "title", "price"]);

        let exclude = ListQuery::new(&BOOKS, &features(&[("fields", "-id,-isbn,-author")]), Scope::ALL).unwrap();
        assert!(exclude.columns.contains(&"id"));
        assert!(!exclude.columns.contains(&"isbn"));
        assert!(!exclude.columns.contains(&"author"));
    }

    #[test]
    fn test_sort_order() {
        let query = ListQuery::new(&BOOKS, &features(&[("sort", "-price,title")]), Scope::ALL).unwrap();
        assert!(query
            .select()
            .sql()
            .contains("ORDER BY price DESC, title ASC, id DESC"));
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        assert!(ListQuery::new(&BOOKS, &features(&[("colour", "red")]), Scope::ALL).is_err());
        assert!(ListQuery::new(&BOOKS, &features(&[("sort", "colour")]), Scope::ALL).is_err());
        assert!(ListQuery::new(&BOOKS, &features(&[("fields", "colour")]), Scope::ALL).is_err());
        assert!(ListQuery::new(&BOOKS, &features(&[("price[gt]", "lots")]), Scope::ALL).is_err());
    }
}
