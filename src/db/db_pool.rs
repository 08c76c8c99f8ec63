use crate::config::DatabaseConfig;
use duckdb::{AccessMode, Config, Connection};
use r2d2::{ManageConnection, Pool};

pub const IN_MEMORY: &str = ":memory:";

/// Hands out DuckDB connections. File databases are opened read-only so the
/// analytics path can never write, whatever SQL reaches it.
pub struct DuckDBConnectionManager {
    connection_string: String,
}

impl DuckDBConnectionManager {
    pub fn new(connection_string: String) -> Self {
        Self { connection_string }
    }
}

impl ManageConnection for DuckDBConnectionManager {
    type Connection = Connection;
    type Error = duckdb::Error;

    fn connect(&self) -> Result<Self::Connection, Self::Error> {
        if self.connection_string == IN_MEMORY {
            return Connection::open_in_memory();
        }
        let config = Config::default().access_mode(AccessMode::ReadOnly)?;
        Connection::open_with_flags(&self.connection_string, config)
    }

    fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        conn.execute("SELECT 1", [])?;
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

pub fn build_pool(config: &DatabaseConfig) -> Result<Pool<DuckDBConnectionManager>, r2d2::Error> {
    let manager = DuckDBConnectionManager::new(config.connection_string.clone());
    Pool::builder()
        .max_size(config.pool_size.max(1) as u32)
        .build(manager)
}
