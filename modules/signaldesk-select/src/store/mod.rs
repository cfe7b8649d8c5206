//! Production collaborators backed by Postgres.

pub mod postgres;

pub use postgres::PgStore;
