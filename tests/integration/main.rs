//! Live database tests for the PostgreSQL stores
//!
//! Run with: DATABASE_URL=postgres://... cargo test --test integration -- --ignored

mod repository_tests;
