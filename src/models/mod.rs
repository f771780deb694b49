pub mod booking;
pub mod professional;
pub mod session;
pub mod settings;

pub use booking::{Booking, BookingRecord, BookingStatus, PaymentStatus};
pub use professional::Professional;
pub use session::{BookingSession, InitialData, SessionEdit};
pub use settings::{AvailabilityWindow, BookingService, BookingSettings, WeeklyAvailability};
