/// Layer identifiers are random v4 UUIDs, minted at placement time.
pub type LayerId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
