//! Collaborators the booking flow reads from and writes to.

use async_trait::async_trait;

use crate::models::{BookingRecord, BookingSettings, Professional};

/// Failures reported by settings, directory and booking backends.
///
/// The `Display` text is what end customers see, so keep it readable.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum PortError {
    #[error("booking settings not found")]
    NotFound,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl From<anyhow::Error> for PortError {
    fn from(e: anyhow::Error) -> Self {
        PortError::Storage(e.to_string())
    }
}

#[async_trait]
pub trait SettingsSource: Send + Sync {
    async fn fetch_booking_settings(&self, card_id: &str) -> Result<BookingSettings, PortError>;
}

#[async_trait]
pub trait ProfessionalDirectory: Send + Sync {
    async fn fetch_professionals(&self, owner_id: &str) -> Result<Vec<Professional>, PortError>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Appends a booking to the owner's collection and returns its id.
    ///
    /// A record whose idempotency key was already stored yields the id of the
    /// earlier booking instead of a second row.
    async fn create_booking(
        &self,
        owner_id: &str,
        record: &BookingRecord,
    ) -> Result<String, PortError>;
}
