use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreResult;

/// Everything the pass issuer needs about one checked-in passenger/segment.
/// Barcode byte layout is the issuer's concern, not modelled here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardingPassInput {
    pub locator: String,
    pub passenger_name: String,
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub departure: DateTime<Utc>,
    pub seat: String,
    pub booking_class: char,
    /// Service annotations carried onto the pass (wheelchair, meal, ...).
    pub remarks: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardingPass {
    pub locator: String,
    pub passenger_name: String,
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub departure: DateTime<Utc>,
    pub seat: String,
    pub booking_class: char,
    /// Boarding sequence on the flight, 1-based.
    pub sequence: u32,
    pub remarks: Vec<String>,
    pub issued_at: DateTime<Utc>,
}

pub trait BoardingPassIssuer: Send + Sync {
    fn issue(&self, input: BoardingPassInput) -> CoreResult<BoardingPass>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_serializes_round_trip() {
        let pass = BoardingPass {
            locator: "KX8P2Q".to_string(),
            passenger_name: "CHAPMAN/LAURA".to_string(),
            flight_number: "VX101".to_string(),
            origin: "LHR".to_string(),
            destination: "JFK".to_string(),
            departure: Utc::now(),
            seat: "14A".to_string(),
            booking_class: 'Y',
            sequence: 12,
            remarks: vec!["WCHR".to_string()],
            issued_at: Utc::now(),
        };

        let json = serde_json::to_string(&pass).unwrap();
        let back: BoardingPass = serde_json::from_str(&json).unwrap();
        assert_eq!(back.seat, "14A");
        assert_eq!(back.sequence, 12);
    }
}
