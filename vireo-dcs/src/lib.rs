pub mod boarding;
pub mod checkin;
pub mod seatpick;

pub use boarding::SimpleBoardingPassIssuer;
pub use checkin::{BatchCheckInOutcome, CheckInError, CheckInOrchestrator, CheckInRequest, CheckInWindow};
pub use seatpick::SeatPicker;
