use crate::models::{BookingSettings, Professional};
use crate::services::ports::PortError;

/// Resolution of the card's booking settings. Every state but `Loading` and
/// `Ready` ends the flow.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsState {
    Loading,
    Error { message: String },
    Disabled,
    NoServices,
    Ready(BookingSettings),
}

impl SettingsState {
    pub fn from_fetch(result: Result<BookingSettings, PortError>) -> Self {
        match result {
            Err(PortError::NotFound) => SettingsState::Error {
                message: "Booking is not set up for this card.".to_string(),
            },
            Err(e) => SettingsState::Error {
                message: format!("Could not load booking settings: {e}"),
            },
            Ok(settings) if !settings.enabled => SettingsState::Disabled,
            Ok(settings) if settings.services.is_empty() => SettingsState::NoServices,
            Ok(settings) => SettingsState::Ready(settings),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingsState::Loading => "loading",
            SettingsState::Error { .. } => "error",
            SettingsState::Disabled => "disabled",
            SettingsState::NoServices => "no_services",
            SettingsState::Ready(_) => "ready",
        }
    }

    pub fn settings(&self) -> Option<&BookingSettings> {
        match self {
            SettingsState::Ready(settings) => Some(settings),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SettingsState::Error { .. } | SettingsState::Disabled | SettingsState::NoServices
        )
    }

    /// Text shown in place of the steps when the flow cannot start.
    pub fn message(&self) -> Option<String> {
        match self {
            SettingsState::Error { message } => Some(message.clone()),
            SettingsState::Disabled => Some("Online booking is currently disabled.".to_string()),
            SettingsState::NoServices => {
                Some("No services are available for booking yet.".to_string())
            }
            SettingsState::Loading | SettingsState::Ready(_) => None,
        }
    }
}

/// The professional directory, fetched only when the card allows choosing one.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfessionalsState {
    NotRequested,
    Loading,
    Error { message: String },
    Ready(Vec<Professional>),
}

impl ProfessionalsState {
    pub fn from_fetch(result: Result<Vec<Professional>, PortError>) -> Self {
        match result {
            Ok(list) => ProfessionalsState::Ready(list),
            Err(e) => ProfessionalsState::Error {
                message: format!(
                    "Could not load professionals ({e}). You can still book without choosing one."
                ),
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProfessionalsState::NotRequested => "not_requested",
            ProfessionalsState::Loading => "loading",
            ProfessionalsState::Error { .. } => "error",
            ProfessionalsState::Ready(_) => "ready",
        }
    }

    /// True only for a successfully loaded, non-empty directory.
    pub fn step_available(&self) -> bool {
        matches!(self, ProfessionalsState::Ready(list) if !list.is_empty())
    }

    pub fn list(&self) -> &[Professional] {
        match self {
            ProfessionalsState::Ready(list) => list,
            _ => &[],
        }
    }

    pub fn warning(&self) -> Option<&str> {
        match self {
            ProfessionalsState::Error { message } => Some(message),
            _ => None,
        }
    }
}
