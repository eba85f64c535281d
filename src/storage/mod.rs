//! Storage layer for taskhub.
//!
//! Provides Postgres access via SQLx; the schema is applied from
//! migrations embedded into the binary.

mod models;
mod repository;

pub use repository::{
    create_pool, run_migrations, TaskChanges, TaskFilter, TaskhubRepository,
};
