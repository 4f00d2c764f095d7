//! Criterion microbenchmarks for bookstore-api hot paths.
//!
//! Run with:
//!   cargo bench -p bookstore-api
//!
//! HTML reports are written to `target/criterion/`.

use bookstore_api::auth::{generate_token, hash_password, verify_password};
use bookstore_common::{
    auth::validate_token,
    config::AuthConfig,
    models::user::User,
    permissions::Role,
    query::ApiFeatures,
};
use bookstore_db::{
    listing::{ListQuery, Scope},
    schema,
};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

fn params(raw: &[(&str, &str)]) -> Vec<(String, String)> {
    raw.iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn book_query() -> Vec<(String, String)> {
    params(&[
        ("subject", "Mathematics"),
        ("price[gte]", "100"),
        ("price[lt]", "750.5"),
        ("stock[gt]", "0"),
        ("sort", "-price,title"),
        ("fields", "title,isbn,price,stock"),
        ("page", "3"),
        ("limit", "25"),
    ])
}

// ── Query features ────────────────────────────────────────────────────────────

fn bench_features_parse(c: &mut Criterion) {
    let query = book_query();
    c.bench_function("features/parse", |b| {
        b.iter(|| ApiFeatures::from_query(black_box(query.clone()), 1000).unwrap())
    });
}

/// Parsing cost as the number of filters grows.
fn bench_features_filter_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("features/filter_scaling");

    for count in [1usize, 4, 16, 64] {
        let query: Vec<(String, String)> = (0..count)
            .map(|i| (format!("field{i}[gte]"), i.to_string()))
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(count), &query, |b, q| {
            b.iter(|| ApiFeatures::from_query(black_box(q.clone()), 1000).unwrap())
        });
    }

    group.finish();
}

// ── SQL rendering ─────────────────────────────────────────────────────────────

fn bench_list_query_render(c: &mut Criterion) {
    let features = ApiFeatures::from_query(book_query(), 1000).unwrap();
    let scope = Scope::branch(uuid::Uuid::now_v7());

    c.bench_function("listing/render_select", |b| {
        b.iter(|| {
            let query = ListQuery::new(&schema::BOOKS, black_box(&features), scope).unwrap();
            query.select().sql().len()
        })
    });

    c.bench_function("listing/render_count", |b| {
        b.iter(|| {
            let query = ListQuery::new(&schema::BOOKS, black_box(&features), scope).unwrap();
            query.count().sql().len()
        })
    });
}

// ── Auth ──────────────────────────────────────────────────────────────────────

fn bench_argon2(c: &mut Criterion) {
    let hash = hash_password("hunter2-password-bench").unwrap();

    c.bench_function("auth/argon2_hash", |b| {
        b.iter(|| hash_password(black_box("hunter2-password-bench")).unwrap())
    });

    c.bench_function("auth/argon2_verify", |b| {
        b.iter(|| verify_password(black_box("hunter2-password-bench"), &hash).unwrap())
    });
}

fn bench_jwt(c: &mut Criterion) {
    let config = AuthConfig {
        jwt_secret: "bench-secret-key-32-bytes-padded!!".into(),
        jwt_expire_secs: 3600,
        cookie_expire_days: 90,
    };
    let user = User {
        id: uuid::Uuid::now_v7(),
        name: "Bench".into(),
        email: "bench@example.com".into(),
        password_hash: String::new(),
        role: Role::BranchAdmin,
        branch_id: Some(uuid::Uuid::now_v7()),
        is_active: true,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    };
    let token = generate_token(&user, &config).unwrap();

    c.bench_function("auth/jwt_encode", |b| {
        b.iter(|| generate_token(black_box(&user), &config).unwrap())
    });

    c.bench_function("auth/jwt_decode", |b| {
        b.iter(|| validate_token(black_box(&token), &config.jwt_secret).unwrap())
    });
}

// ── criterion entrypoints ─────────────────────────────────────────────────────

criterion_group!(
    listing,
    bench_features_parse,
    bench_features_filter_scaling,
    bench_list_query_render,
);

criterion_group!(auth, bench_argon2, bench_jwt);

criterion_main!(listing, auth);
