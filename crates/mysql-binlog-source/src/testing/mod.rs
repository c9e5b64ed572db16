//! Testing utilities for the MySQL binlog source
//!
//! Docker container management for a binlog-enabled MySQL server.

pub mod container;

pub use container::MySQLContainer;
