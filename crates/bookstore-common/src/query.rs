//! Query features: turn list-endpoint query parameters into a structured query.
//!
//! `GET /books?price[gte]=100&sort=-price,title&fields=title,price&page=2&limit=10`
//! becomes a set of [`Filter`]s, [`SortKey`]s, a [`Projection`] and a page window.
//! The steps run in a fixed order: reserved-parameter exclusion, operator
//! rewriting, sort, projection, pagination. Field names are not checked here;
//! the SQL renderer checks them against the table's column list.

use crate::error::BookstoreError;

/// Parameters that steer the query and never become filters.
pub const RESERVED_PARAMS: [&str; 4] = ["page", "sort", "limit", "fields"];

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 100;

/// Newest first.
pub const DEFAULT_SORT_FIELD: &str = "created_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Comparison {
    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            _ => None,
        }
    }

    pub fn sql_operator(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }
}

/// One `field <op> value` condition. The value stays raw until the column type is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub field: String,
    pub op: Comparison,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

/// Which columns a list response carries. `id` is always returned.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Projection {
    #[default]
    All,
    Include(Vec<String>),
    Exclude(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct ApiFeatures {
    params: Vec<(String, String)>,
    pub filters: Vec<Filter>,
    pub sort: Vec<SortKey>,
    pub projection: Projection,
    pub page: u64,
    pub limit: u64,
}

impl ApiFeatures {
    /// Wrap raw query pairs. Nothing is interpreted until the steps run.
    pub fn new(params: Vec<(String, String)>) -> Self {
        Self {
            params,
            filters: Vec::new(),
            sort: default_sort(),
            projection: Projection::All,
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }

    /// Run every step in order. `max_limit` caps the page size.
    pub fn from_query(
        params: Vec<(String, String)>,
        max_limit: u64,
    ) -> Result<Self, BookstoreError> {
        Ok(Self::new(params)
            .filter()?
            .sort()
            .limit_fields()?
            .paginate(max_limit))
    }

    /// Every non-reserved parameter becomes a filter. `field[gte]=v` style keys
    /// become comparisons, bare keys equality.
    pub fn filter(mut self) -> Result<Self, BookstoreError> {
        let mut filters = Vec::new();
        for (key, value) in &self.params {
            if RESERVED_PARAMS.contains(&key.as_str()) {
                continue;
            }
            let (field, op) = split_operator(key)?;
            filters.push(Filter {
                field: field.to_string(),
                op,
                value: value.clone(),
            });
        }
        self.filters = filters;
        Ok(self)
    }

    /// `sort=price,-title`. A leading `-` sorts descending. Defaults to newest first.
    pub fn sort(mut self) -> Self {
        let keys: Vec<SortKey> = self
            .last_param("sort")
            .map(|raw| {
                split_list(raw)
                    .map(|item| match item.strip_prefix('-') {
                        Some(field) => SortKey {
                            field: field.to_string(),
                            descending: true,
                        },
                        None => SortKey {
                            field: item.trim_start_matches('+').to_string(),
                            descending: false,
                        },
                    })
                    .filter(|key| !key.field.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        self.sort = if keys.is_empty() { default_sort() } else { keys };
        self
    }

    /// `fields=title,price` keeps only those columns, `fields=-isbn` drops one.
    /// Mixing both forms is rejected.
    pub fn limit_fields(mut self) -> Result<Self, BookstoreError> {
        let Some(raw) = self.last_param("fields") else {
            return Ok(self);
        };

        let (excluded, included): (Vec<&str>, Vec<&str>) =
            split_list(raw).partition(|item| item.starts_with('-'));

        self.projection = match (included.is_empty(), excluded.is_empty()) {
            (true, true) => Projection::All,
            (false, true) => Projection::Include(included.into_iter().map(String::from).collect()),
            (true, false) => Projection::Exclude(
                excluded
                    .into_iter()
                    .map(|f| f.trim_start_matches('-').to_string())
                    .collect(),
            ),
            (false, false) => {
                return Err(BookstoreError::validation(
                    "fields cannot mix included and excluded columns",
                ));
            }
        };
        Ok(self)
    }

    /// `page` and `limit`, falling back to 1 and 100 when missing, non-numeric or zero.
    pub fn paginate(mut self, max_limit: u64) -> Self {
        self.page = self
            .last_param("page")
            .and_then(parse_positive)
            .unwrap_or(DEFAULT_PAGE);
        self.limit = self
            .last_param("limit")
            .and_then(parse_positive)
            .unwrap_or(DEFAULT_LIMIT)
            .min(max_limit.max(1));
        self
    }

    /// Rows skipped before the current page.
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    fn last_param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

fn default_sort() -> Vec<SortKey> {
    vec![SortKey {
        field: DEFAULT_SORT_FIELD.to_string(),
        descending: true,
    }]
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_positive(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|n| *n > 0)
}

/// `price[gte]` -> (`price`, Gte); `price` -> (`price`, Eq).
fn split_operator(key: &str) -> Result<(&str, Comparison), BookstoreError> {
    let Some(open) = key.find('[') else {
        return Ok((key, Comparison::Eq));
    };

    let field = &key[..open];
    let suffix = key[open + 1..]
        .strip_suffix(']')
        .ok_or_else(|| BookstoreError::validation(format!("Malformed query parameter '{key}'")))?;

    let op = Comparison::from_suffix(suffix).ok_or_else(|| {
        BookstoreError::validation(format!("Unsupported operator '{suffix}' on '{field}'"))
    })?;

    if field.is_empty() {
        return Err(BookstoreError::validation(format!(
            "Malformed query parameter '{key}'"
        )));
    }
    Ok((field, op))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_reserved_params_are_not_filters() {
        let features = ApiFeatures::from_query(
            params(&[("page", "2"), ("sort", "title"), ("limit", "5"), ("fields", "title"), ("subject", "Math")]),
            1000,
        )
        .unwrap();
        assert_eq!(
            features.filters,
            vec![Filter {
                field: "subject".into(),
                op: Comparison::Eq,
                value: "Math".into()
            }]
        );
    }

    #[test]
    fn test_operator_rewriting() {
        let features = ApiFeatures::from_query(
            params(&[("price[gte]", "100"), ("price[lt]", "500"), ("stock[gt]", "0")]),
            1000,
        )
        .unwrap();
        let ops: Vec<_> = features
            .filters
            .iter()
            .map(|f| (f.field.as_str(), f.op.sql_operator(), f.value.as_str()))
            .collect();
        assert_eq!(
            ops,
            vec![("price", ">=", "100"), ("price", "<", "500"), ("stock", ">", "0")]
        );
    }

    #[test]
    fn test_unknown_operator_is_rejected() {
        assert!(ApiFeatures::from_query(params(&[("price[ne]", "1")]), 1000).is_err());
        assert!(ApiFeatures::from_query(params(&[("price[gte", "1")]), 1000).is_err());
        assert!(ApiFeatures::from_query(params(&[("[gte]", "1")]), 1000).is_err());
    }

    #[test]
    fn test_default_sort_is_newest_first() {
        let features = ApiFeatures::from_query(Vec::new(), 1000).unwrap();
        assert_eq!(
            features.sort,
            vec![SortKey {
                field: "created_at".into(),
                descending: true
            }]
        );
        assert_eq!(features.projection, Projection::All);
        assert_eq!((features.page, features.limit, features.offset()), (1, 100, 0));
    }

    #[test]
    fn test_sort_list() {
        let features = ApiFeatures::from_query(params(&[("sort", "-price, title,")]), 1000).unwrap();
        assert_eq!(
            features.sort,
            vec![
                SortKey {
                    field: "price".into(),
                    descending: true
                },
                SortKey {
                    field: "title".into(),
                    descending: false
                },
            ]
        );
    }

    #[test]
    fn test_projection() {
        let include = ApiFeatures::from_query(params(&[("fields", "title,price")]), 1000).unwrap();
        assert_eq!(
            include.projection,
            Projection::Include(vec!["title".into(), "price".into()])
        );

        let exclude = ApiFeatures::from_query(params(&[("fields", "-isbn")]), 1000).unwrap();
        assert_eq!(exclude.projection, Projection::Exclude(vec!["isbn".into()]));

        assert!(ApiFeatures::from_query(params(&[("fields", "title,-isbn")]), 1000).is_err());
    }

    #[test]
    fn test_pagination() {
        let features = ApiFeatures::from_query(params(&[("page", "2"), ("limit", "10")]), 1000).unwrap();
        assert_eq!((features.page, features.limit, features.offset()), (2, 10, 10));
    }

    #[test]
    fn test_pagination_falls_back_to_defaults() {
        let features =
            ApiFeatures::from_query(params(&[("page", "0"), ("limit", "lots")]), 1000).unwrap();
        assert_eq!((features.page, features.limit), (1, 100));

        let negative = ApiFeatures::from_query(params(&[("page", "-3")]), 1000).unwrap();
        assert_eq!(negative.page, 1);
    }

    #[test]
    fn test_limit_is_capped() {
        let features = ApiFeatures::from_query(params(&[("limit", "5000")]), 250).unwrap();
        assert_eq!(features.limit, 250);
    }

    #[test]
    fn test_last_value_wins_for_reserved_params() {
        let features = ApiFeatures::from_query(params(&[("page", "2"), ("page", "3")]), 1000).unwrap();
        assert_eq!(features.page, 3);
    }
}
