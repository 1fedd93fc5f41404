//! A low-level, asynchronous client library for MySQL and MariaDB.
//!
//! This crate implements the client side of the MySQL wire protocol:
//! packet framing, the connection handshake, the text (`COM_QUERY`) and
//! prepared-statement (`COM_STMT_*`) sub-protocols, and a connection pool.
//!
//! It deliberately stops below the ORM layer. Rows are delivered as a
//! mapping from column name to [`MySqlValue`]; anything fancier (derives,
//! query builders) belongs in a crate built on top of this one.
//!
//! ```no_run
//! use mysql_wire::{MySqlConnectOptions, MySqlConnection};
//!
//! # async fn example() -> Result<(), mysql_wire::Error> {
//! let options = MySqlConnectOptions::new()
//!     .host("localhost")
//!     .username("root")
//!     .password("password")
//!     .database("shop");
//!
//! let mut conn = MySqlConnection::connect(&options).await?;
//!
//! let mut results = conn.query("SELECT id, name FROM users").await?;
//! while let Some(row) = results.next().await? {
//!     let id = row.get("id").unwrap().as_i64()?;
//!     println!("user {id}");
//! }
//! # Ok(())
//! # }
//! ```

#[macro_use]
mod error;

mod arguments;
mod connection;
mod io;
mod options;
mod pool;
mod protocol;
mod row;
mod statement;
mod type_info;
mod value;

pub use arguments::MySqlArguments;
pub use connection::{MySqlConnection, ResultSet};
pub use error::{Error, MySqlDatabaseError, Result};
pub use options::{MySqlConnectOptions, TlsConfig, TlsMode, TlsVerify};
pub use pool::{Pool, PoolConnection, PoolOptions};
pub use protocol::column::MySqlColumn;
pub use row::MySqlRow;
pub use statement::MySqlStatement;
pub use type_info::MySqlTypeInfo;
pub use value::{MySqlDate, MySqlDateTime, MySqlTime, MySqlValue, QueryResult};
