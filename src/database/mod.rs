//! Database access
//!
//! SQL is executed through the [`SqlExecutor`] trait. [`RedshiftConnection`]
//! implements it with sqlx over the Postgres wire protocol;
//! [`RecordingExecutor`] records statements for dry runs and tests.

mod executor;
mod postgres;
mod recording;
mod reflect;

pub use executor::{Row, SqlExecutor};
pub use postgres::RedshiftConnection;
pub use recording::RecordingExecutor;
pub use reflect::{reflect_table, TableInfo, DEFAULT_SCHEMA};

#[cfg(test)]
mod tests;
