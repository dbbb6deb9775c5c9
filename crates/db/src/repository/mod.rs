//! Repository functions — one function per database operation.
//!
//! Every function takes a `&MySqlPool` (reads, single statements) or a
//! `&mut MySqlConnection` (writes that may share a transaction) and returns a
//! `Result<T, DbError>`. No business logic, no defaulting — pure SQL.

pub mod directory;
pub mod requests;
