// SPDX-License-Identifier: AGPL-3.0-or-later

/// `SqlStore` errors.
#[derive(thiserror::Error, Debug)]
pub enum SqlStorageError {
    /// Error returned from the database driver.
    #[error("SQL query failed: {0}")]
    Transaction(String),

    /// Error which occurs when a row could not be converted into a domain type.
    #[error("Could not deserialize row from table {0}: {1}")]
    Deserialization(String, String),

    /// Error which occurs when an insertion did not affect the expected rows.
    #[error("Insertion into table {0} failed")]
    Insertion(String),
}

impl From<sqlx::Error> for SqlStorageError {
    fn from(err: sqlx::Error) -> Self {
        Self::Transaction(err.to_string())
    }
}
