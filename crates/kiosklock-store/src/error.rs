//! Error types for the store layer.

use kiosklock_protocol::TokenId;

/// Errors that can occur while reading or writing the backing file.
///
/// Read-side problems never surface through [`StoreError`] in normal
/// operation — `load` degrades to an empty store instead. The write side
/// does report, so callers can decide between strict (`save`) and
/// lenient (`persist`) handling.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing file could not be written.
    #[error("failed to write token store: {0}")]
    Write(#[from] std::io::Error),

    /// The in-memory collection could not be serialized. This indicates
    /// a bug rather than an environmental problem.
    #[error("failed to serialize token store: {0}")]
    Serialize(#[from] serde_json::Error),

    /// An insert would have violated the id-unique-forever invariant.
    #[error("token id {0} already exists in the store")]
    DuplicateId(TokenId),
}
