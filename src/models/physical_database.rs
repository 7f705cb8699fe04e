use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// PhysicalDatabase is a concrete connection target: the thing a migration
/// actually copies from or to.
///
/// Identity for orchestration purposes is the connection descriptor
/// (driver, url, username, password), never the row id: freshly created
/// records share a default id of 0 until persistence assigns a real one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PhysicalDatabase {
    pub physical_database_id: i64,
    pub driver: String,
    pub url: String,
    pub username: String,
    pub password: String,
}

impl PhysicalDatabase {
    /// Create an unpersisted physical database (id 0 until persisted).
    pub fn new(
        driver: impl Into<String>,
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            physical_database_id: 0,
            driver: driver.into(),
            url: url.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Structural equality of the connection descriptor. Two records with
    /// different ids but the same driver/url/username/password point at the
    /// same physical database.
    pub fn same_connection(&self, other: &PhysicalDatabase) -> bool {
        self.driver == other.driver
            && self.url == other.url
            && self.username == other.username
            && self.password == other.password
    }
}

impl fmt::Display for PhysicalDatabase {
    /// Printable connection identity. The password never appears here.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} ({})", self.username, self.url, self.driver)
    }
}
