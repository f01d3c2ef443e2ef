//! Connection settings loadable from application configuration.

use serde::{Deserialize, Serialize};

use crate::store::MongoDbStoreBuilder;

fn default_dsn() -> String {
    "mongodb://localhost:27017".to_string()
}

/// Where a [`MongoDbStore`](crate::MongoDbStore) connects.
///
/// ```ignore
/// let config: MongoDbConfig = settings.get("storage")?;
/// let backend = config.into_builder().build().await?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MongoDbConfig {
    /// Connection string.
    #[serde(default = "default_dsn")]
    pub dsn: String,
    /// Database every collection lives in.
    pub database: String,
}

impl MongoDbConfig {
    pub fn into_builder(self) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::from(self)
    }
}

impl From<MongoDbConfig> for MongoDbStoreBuilder {
    fn from(config: MongoDbConfig) -> Self {
        MongoDbStoreBuilder::new(&config.dsn, &config.database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{Bson, de::deserialize_from_bson, doc};

    #[test]
    fn dsn_defaults_to_localhost() {
        let config: MongoDbConfig = deserialize_from_bson(Bson::Document(doc! { "database": "app" })).unwrap();

        assert_eq!(
            config,
            MongoDbConfig {
                dsn: "mongodb://localhost:27017".to_string(),
                database: "app".to_string(),
            },
        );
    }
}
