use crate::error::DbResult;
use crate::ident::Ident;

/// Schema that holds the IAM tables unless configured otherwise.
pub const DEFAULT_SCHEMA: &str = "zitadel";

/// Default maximum number of pooled connections.
pub const DEFAULT_POOL_MAX_SIZE: usize = 16;

/// Configuration for repositories and the connection pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Schema prefix for every table a repository touches.
    pub schema: Ident,
    /// Maximum pooled connections.
    pub pool_max_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            schema: Ident::trusted(DEFAULT_SCHEMA),
            pool_max_size: DEFAULT_POOL_MAX_SIZE,
        }
    }
}

impl StoreConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the schema. The name is validated as an SQL identifier.
    pub fn schema(mut self, schema: &str) -> DbResult<Self> {
        self.schema = Ident::parse(schema)?;
        Ok(self)
    }

    /// Set the maximum pool size.
    pub fn pool_max_size(mut self, max_size: usize) -> Self {
        self.pool_max_size = max_size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = StoreConfig::new();
        assert_eq!(config.schema.to_sql(), "zitadel");
        assert_eq!(config.pool_max_size, DEFAULT_POOL_MAX_SIZE);
    }

    #[test]
    fn schema_is_validated() {
        assert!(StoreConfig::new().schema("tenant; DROP SCHEMA x").is_err());
        let config = StoreConfig::new().schema("iam_test").unwrap().pool_max_size(4);
        assert_eq!(config.schema.name(), "iam_test");
        assert_eq!(config.pool_max_size, 4);
    }
}
