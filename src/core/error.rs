/// Failures reported by the entry store.
///
/// `Unavailable` is the only variant that signals an infrastructure problem;
/// the others are business conditions meant to be shown to the caller as-is.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Tracking is already started. Use /stop before starting a new one.")]
    AlreadyActive,

    #[error("There is no active entry currently.")]
    NoActiveEntry,

    #[error("Storage unavailable: {0}")]
    Unavailable(#[from] rusqlite::Error),
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}
