use gather_shared::error::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Failed to look up recipients: {0}")]
    RecipientLookupFailed(#[from] StoreError),

    #[error("Failed to send email: {0}")]
    SendFailed(String),

    #[error("Unsupported message type: {0}")]
    UnsupportedType(String),
}
