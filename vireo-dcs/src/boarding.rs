use chrono::Utc;
use std::sync::atomic::{AtomicU32, Ordering};
use vireo_core::boarding::{BoardingPass, BoardingPassInput, BoardingPassIssuer};
use vireo_core::CoreResult;

/// Issues structured boarding passes with a process-local boarding
/// sequence. Barcode rendering belongs to downstream delivery channels.
pub struct SimpleBoardingPassIssuer {
    sequence: AtomicU32,
}

impl SimpleBoardingPassIssuer {
    pub fn new() -> Self {
        Self {
            sequence: AtomicU32::new(1),
        }
    }
}

impl Default for SimpleBoardingPassIssuer {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardingPassIssuer for SimpleBoardingPassIssuer {
    fn issue(&self, input: BoardingPassInput) -> CoreResult<BoardingPass> {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        Ok(BoardingPass {
            locator: input.locator,
            passenger_name: input.passenger_name,
            flight_number: input.flight_number,
            origin: input.origin,
            destination: input.destination,
            departure: input.departure,
            seat: input.seat,
            booking_class: input.booking_class,
            sequence,
            remarks: input.remarks,
            issued_at: Utc::now(),
        })
    }
}
