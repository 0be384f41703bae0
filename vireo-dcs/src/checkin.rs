use chrono::{DateTime, Duration, Months, Utc};
use std::sync::Arc;
use vireo_catalog::airports;
use vireo_catalog::inventory::{InventoryError, InventoryLedger};
use vireo_catalog::seatmap::Seat;
use vireo_core::apis::{ApisAdapter, ApisAddress, ApisError, ApisPassenger, ApisRecord};
use vireo_core::boarding::{BoardingPass, BoardingPassInput, BoardingPassIssuer};
use vireo_core::CoreError;
use vireo_pnr::models::{AirSegment, CouponStatus, Pnr, PnrStatus, SeatAssignment, TravelDocument};
use vireo_pnr::repository::{BookingStore, StoreError};

use crate::seatpick::SeatPicker;

/// Retries when an auto-picked seat is snatched between the pick and the
/// ledger reservation.
const PICK_ATTEMPTS: usize = 3;

/// Acceptance window relative to departure. Both bounds are terminal for
/// the attempt: the caller re-invokes later or not at all, there is no
/// waiting built in.
#[derive(Debug, Clone)]
pub struct CheckInWindow {
    pub opens_before: Duration,
    pub closes_before: Duration,
}

impl Default for CheckInWindow {
    fn default() -> Self {
        Self {
            opens_before: Duration::hours(24),
            closes_before: Duration::minutes(45),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CheckInRequest {
    pub locator: String,
    pub passenger_id: u32,
    pub segment_number: u32,
    /// Caller-requested seat; None falls back to a prior assignment, then
    /// to the auto-picker.
    pub requested_seat: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CheckInError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Booking {0} not found")]
    BookingNotFound(String),

    #[error("Booking is not ticketed")]
    NotTicketed,

    #[error("No passenger {0} in this booking")]
    UnknownPassenger(u32),

    #[error("No segment {0} in this booking")]
    UnknownSegment(u32),

    #[error("Segment {0} is a surface segment")]
    NotAnAirSegment(u32),

    #[error("No ticket for passenger {0}")]
    NoTicket(u32),

    #[error("No coupon for passenger {passenger_id} on segment {segment_number}")]
    NoCoupon {
        passenger_id: u32,
        segment_number: u32,
    },

    #[error("Passenger is already checked in")]
    AlreadyCheckedIn,

    #[error("Coupon cannot be checked in from status {0:?}")]
    CouponNotOpen(CouponStatus),

    #[error("Coupon is not checked in (status {0:?})")]
    NotCheckedIn(CouponStatus),

    #[error("Check-in is not yet open; opens at {opens_at}")]
    WindowNotOpen { opens_at: DateTime<Utc> },

    #[error("Check-in closed at {closed_at}")]
    WindowClosed { closed_at: DateTime<Utc> },

    #[error("No travel document on file for passenger {0}")]
    NoTravelDocument(u32),

    #[error("Travel document expires {expiry}, inside the six month validity floor")]
    DocumentExpiring { expiry: chrono::NaiveDate },

    #[error(transparent)]
    Apis(#[from] ApisError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error("Invalid seat designator: {0}")]
    BadSeat(String),

    #[error("Seat {seat} is not in the {class} cabin")]
    SeatNotInCabin { seat: String, class: char },

    #[error("No seat map for aircraft type {0}")]
    NoSeatMap(String),

    #[error("No seat available in the cabin")]
    NoSeatAvailable,

    #[error("No segment for flight {0} in this booking")]
    FlightNotInBooking(String),

    #[error(transparent)]
    Pass(#[from] CoreError),
}

/// Per-passenger failure inside a batch check-in.
#[derive(Debug)]
pub struct CheckInFailure {
    pub passenger_id: u32,
    pub error: CheckInError,
}

/// Batch result: individual failures ride alongside the successes instead
/// of aborting the whole flight.
#[derive(Debug, Default)]
pub struct BatchCheckInOutcome {
    pub passes: Vec<BoardingPass>,
    pub failures: Vec<CheckInFailure>,
}

/// Drives a coupon through Open -> CheckedIn -> Used, with CheckedIn ->
/// Open as the only reversal. Validates documents and the time window,
/// resolves a physical seat through the inventory ledger, and records the
/// outcome on the booking.
pub struct CheckInOrchestrator {
    ledger: Arc<InventoryLedger>,
    store: Arc<dyn BookingStore>,
    apis: Arc<dyn ApisAdapter>,
    passes: Arc<dyn BoardingPassIssuer>,
    picker: SeatPicker,
    window: CheckInWindow,
}

impl CheckInOrchestrator {
    pub fn new(
        ledger: Arc<InventoryLedger>,
        store: Arc<dyn BookingStore>,
        apis: Arc<dyn ApisAdapter>,
        passes: Arc<dyn BoardingPassIssuer>,
    ) -> Self {
        Self {
            ledger,
            store,
            apis,
            passes,
            picker: SeatPicker::new(),
            window: CheckInWindow::default(),
        }
    }

    pub fn with_picker(mut self, picker: SeatPicker) -> Self {
        self.picker = picker;
        self
    }

    pub fn with_window(mut self, window: CheckInWindow) -> Self {
        self.window = window;
        self
    }

    /// Checks one passenger in on one segment. `now` is explicit so the
    /// window check is the caller's clock, not the host's.
    pub async fn check_in(
        &self,
        request: &CheckInRequest,
        now: DateTime<Utc>,
    ) -> Result<BoardingPass, CheckInError> {
        let mut pnr = self.load(&request.locator).await?;
        let pass = self
            .check_in_passenger(
                &mut pnr,
                request.passenger_id,
                request.segment_number,
                request.requested_seat.as_deref(),
                now,
            )
            .await?;
        self.store.save(&pnr).await?;
        Ok(pass)
    }

    /// Checks every passenger in on the named flight, aggregating failures
    /// instead of aborting the batch.
    pub async fn check_in_all(
        &self,
        locator: &str,
        flight_number: &str,
        now: DateTime<Utc>,
    ) -> Result<BatchCheckInOutcome, CheckInError> {
        let mut pnr = self.load(locator).await?;
        let segment_number = pnr
            .air_segments()
            .find(|a| a.flight_number == flight_number)
            .map(|a| a.number)
            .ok_or_else(|| CheckInError::FlightNotInBooking(flight_number.to_string()))?;

        let passenger_ids: Vec<u32> = pnr.passengers.iter().map(|p| p.id).collect();
        let mut outcome = BatchCheckInOutcome::default();
        for passenger_id in passenger_ids {
            match self
                .check_in_passenger(&mut pnr, passenger_id, segment_number, None, now)
                .await
            {
                Ok(pass) => outcome.passes.push(pass),
                Err(error) => {
                    tracing::warn!(passenger_id, %error, "batch check-in failure");
                    outcome.failures.push(CheckInFailure {
                        passenger_id,
                        error,
                    });
                }
            }
        }

        // Whoever made it through stays checked in.
        self.store.save(&pnr).await?;
        Ok(outcome)
    }

    /// CheckedIn -> Open. The seat stays assigned; re-checking-in reuses
    /// it.
    pub async fn cancel_check_in(
        &self,
        locator: &str,
        passenger_id: u32,
        segment_number: u32,
    ) -> Result<(), CheckInError> {
        let mut pnr = self.load(locator).await?;
        let coupon = self.coupon_mut(&mut pnr, passenger_id, segment_number)?;
        if coupon.status != CouponStatus::CheckedIn {
            return Err(CheckInError::NotCheckedIn(coupon.status));
        }
        coupon.status = CouponStatus::Open;
        pnr.add_osi(format!(
            "CKIN CANCELLED PAX {passenger_id} SEG {segment_number}"
        ));
        self.store.save(&pnr).await?;
        Ok(())
    }

    /// CheckedIn -> Used at the gate. Terminal.
    pub async fn board(
        &self,
        locator: &str,
        passenger_id: u32,
        segment_number: u32,
        now: DateTime<Utc>,
    ) -> Result<(), CheckInError> {
        let mut pnr = self.load(locator).await?;
        let coupon = self.coupon_mut(&mut pnr, passenger_id, segment_number)?;
        if coupon.status != CouponStatus::CheckedIn {
            return Err(CheckInError::NotCheckedIn(coupon.status));
        }
        coupon.status = CouponStatus::Used;
        pnr.add_osi(format!(
            "BOARDED PAX {passenger_id} SEG {segment_number} AT {}",
            now.format("%Y-%m-%dT%H:%MZ")
        ));
        self.store.save(&pnr).await?;
        Ok(())
    }

    async fn check_in_passenger(
        &self,
        pnr: &mut Pnr,
        passenger_id: u32,
        segment_number: u32,
        requested_seat: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<BoardingPass, CheckInError> {
        if pnr.status != PnrStatus::Ticketed {
            return Err(CheckInError::NotTicketed);
        }

        let air = pnr
            .segment(segment_number)
            .ok_or(CheckInError::UnknownSegment(segment_number))?
            .as_air()
            .ok_or(CheckInError::NotAnAirSegment(segment_number))?
            .clone();
        let passenger = pnr
            .passenger(passenger_id)
            .ok_or(CheckInError::UnknownPassenger(passenger_id))?
            .clone();

        match self.coupon_status(pnr, passenger_id, segment_number)? {
            CouponStatus::Open => {}
            CouponStatus::CheckedIn => return Err(CheckInError::AlreadyCheckedIn),
            other => return Err(CheckInError::CouponNotOpen(other)),
        }

        self.check_window(&air, now)?;
        let document = self.check_documents(&passenger.documents, &air, passenger_id)?;

        if airports::is_international(&air.origin, &air.destination) {
            let record = self.build_apis_record(pnr, &passenger.surname, document, &air, passenger_id);
            if !self.apis.validate(&record).await? {
                return Err(CheckInError::Apis(ApisError::Rejected(
                    "validation refused".to_string(),
                )));
            }
            if !self.apis.submit(&record).await? {
                return Err(CheckInError::Apis(ApisError::Rejected(
                    "submission refused".to_string(),
                )));
            }
        }

        let (seat, newly_assigned) = self
            .resolve_seat(pnr, &air, passenger_id, requested_seat)
            .await?;

        if let Some(coupon) = pnr
            .ticket_for_mut(passenger_id)
            .and_then(|t| t.coupon_for_segment_mut(segment_number))
        {
            coupon.status = CouponStatus::CheckedIn;
        }
        if newly_assigned {
            pnr.seat_assignments.retain(|sa| {
                !(sa.passenger_id == passenger_id && sa.segment_number == segment_number)
            });
            pnr.seat_assignments.push(SeatAssignment {
                passenger_id,
                segment_number,
                seat: seat.to_string(),
            });
        }

        let remarks: Vec<String> = pnr
            .ssrs_for(passenger_id)
            .filter(|ssr| ssr.code != "DOCS" && ssr.code != "DOCA")
            .map(|ssr| format!("{} {}", ssr.code, ssr.text).trim().to_string())
            .collect();

        let pass = self.passes.issue(BoardingPassInput {
            locator: pnr.locator.clone().unwrap_or_default(),
            passenger_name: passenger.display_name(),
            flight_number: air.flight_number.clone(),
            origin: air.origin.clone(),
            destination: air.destination.clone(),
            departure: air.departure,
            seat: seat.to_string(),
            booking_class: air.booking_class,
            remarks,
        })?;

        pnr.add_osi(format!(
            "CKIN PAX {passenger_id} SEG {segment_number} SEAT {seat} AT {}",
            now.format("%Y-%m-%dT%H:%MZ")
        ));
        tracing::info!(
            locator = %pass.locator,
            passenger_id,
            %seat,
            "passenger checked in"
        );
        Ok(pass)
    }

    fn check_window(&self, air: &AirSegment, now: DateTime<Utc>) -> Result<(), CheckInError> {
        let opens_at = air.departure - self.window.opens_before;
        let closed_at = air.departure - self.window.closes_before;
        if now < opens_at {
            return Err(CheckInError::WindowNotOpen { opens_at });
        }
        if now > closed_at {
            return Err(CheckInError::WindowClosed { closed_at });
        }
        Ok(())
    }

    /// The longest-lived document decides. It must outlast departure by
    /// six months.
    fn check_documents<'a>(
        &self,
        documents: &'a [TravelDocument],
        air: &AirSegment,
        passenger_id: u32,
    ) -> Result<&'a TravelDocument, CheckInError> {
        let document = documents
            .iter()
            .max_by_key(|d| d.expiry)
            .ok_or(CheckInError::NoTravelDocument(passenger_id))?;

        let departure_date = air.departure.date_naive();
        let floor = departure_date
            .checked_add_months(Months::new(6))
            .unwrap_or(departure_date);
        if document.expiry < floor {
            return Err(CheckInError::DocumentExpiring {
                expiry: document.expiry,
            });
        }
        Ok(document)
    }

    fn build_apis_record(
        &self,
        pnr: &Pnr,
        surname: &str,
        document: &TravelDocument,
        air: &AirSegment,
        passenger_id: u32,
    ) -> ApisRecord {
        let given_name = pnr
            .passenger(passenger_id)
            .map(|p| p.given_name.clone())
            .unwrap_or_default();

        // DOCA free text: country/line/city/postal.
        let address = pnr
            .ssrs_for(passenger_id)
            .find(|ssr| ssr.code == "DOCA")
            .map(|ssr| parse_doca(&ssr.text))
            .unwrap_or_default();

        ApisRecord {
            flight_number: air.flight_number.clone(),
            origin: air.origin.clone(),
            destination: air.destination.clone(),
            departure_date: air.departure.date_naive(),
            passenger: ApisPassenger {
                surname: surname.to_string(),
                given_name,
                nationality: document.nationality.clone(),
                date_of_birth: document.date_of_birth,
                document_number: document.number.clone(),
                document_expiry: document.expiry,
            },
            destination_address: address,
        }
    }

    /// Seat resolution order: requested seat, then an existing assignment,
    /// then the scoring auto-picker.
    async fn resolve_seat(
        &self,
        pnr: &Pnr,
        air: &AirSegment,
        passenger_id: u32,
        requested: Option<&str>,
    ) -> Result<(Seat, bool), CheckInError> {
        let flight = air.flight_date();
        let existing = pnr.seat_for(passenger_id, air.number).cloned();

        if let Some(designator) = requested {
            let seat: Seat = designator
                .parse()
                .map_err(|_| CheckInError::BadSeat(designator.to_string()))?;
            if let Some(ref held) = existing {
                if held.seat == seat.to_string() {
                    return Ok((seat, false));
                }
            }

            let cabin = self.cabin_for(air)?;
            if !cabin.contains(&seat) {
                return Err(CheckInError::SeatNotInCabin {
                    seat: seat.to_string(),
                    class: air.booking_class,
                });
            }
            self.ledger.assign_seat(&flight, seat)?;
            if let Some(held) = existing {
                if let Ok(old) = held.seat.parse::<Seat>() {
                    self.ledger.release_seat(&flight, old)?;
                }
            }
            return Ok((seat, true));
        }

        if let Some(held) = existing {
            let seat: Seat = held
                .seat
                .parse()
                .map_err(|_| CheckInError::BadSeat(held.seat.clone()))?;
            return Ok((seat, false));
        }

        let cabin = self.cabin_for(air)?;
        for _ in 0..PICK_ATTEMPTS {
            let occupied = self.ledger.occupied_seats(&flight);
            let Some(seat) = self.picker.pick(cabin, &occupied) else {
                return Err(CheckInError::NoSeatAvailable);
            };
            match self.ledger.assign_seat(&flight, seat) {
                Ok(()) => return Ok((seat, true)),
                // Lost the race for this seat; pick again from a fresh
                // snapshot.
                Err(InventoryError::SeatOccupied(_)) => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Err(CheckInError::NoSeatAvailable)
    }

    fn cabin_for(&self, air: &AirSegment) -> Result<&vireo_catalog::seatmap::Cabin, CheckInError> {
        self.ledger
            .seat_maps()
            .get(&air.aircraft_type)
            .ok_or_else(|| CheckInError::NoSeatMap(air.aircraft_type.clone()))?
            .cabin_for_class(air.booking_class)
            .ok_or(CheckInError::NoSeatAvailable)
    }

    fn coupon_status(
        &self,
        pnr: &Pnr,
        passenger_id: u32,
        segment_number: u32,
    ) -> Result<CouponStatus, CheckInError> {
        let ticket = pnr
            .ticket_for(passenger_id)
            .ok_or(CheckInError::NoTicket(passenger_id))?;
        let coupon = ticket
            .coupon_for_segment(segment_number)
            .ok_or(CheckInError::NoCoupon {
                passenger_id,
                segment_number,
            })?;
        Ok(coupon.status)
    }

    fn coupon_mut<'a>(
        &self,
        pnr: &'a mut Pnr,
        passenger_id: u32,
        segment_number: u32,
    ) -> Result<&'a mut vireo_pnr::models::Coupon, CheckInError> {
        pnr.ticket_for_mut(passenger_id)
            .ok_or(CheckInError::NoTicket(passenger_id))?
            .coupon_for_segment_mut(segment_number)
            .ok_or(CheckInError::NoCoupon {
                passenger_id,
                segment_number,
            })
    }

    async fn load(&self, locator: &str) -> Result<Pnr, CheckInError> {
        self.store
            .get_by_locator(locator)
            .await?
            .ok_or_else(|| CheckInError::BookingNotFound(locator.to_string()))
    }
}

fn parse_doca(text: &str) -> ApisAddress {
    let mut parts = text.split('/');
    ApisAddress {
        country: parts.next().unwrap_or_default().trim().to_string(),
        line: parts.next().unwrap_or_default().trim().to_string(),
        city: parts.next().unwrap_or_default().trim().to_string(),
        postal_code: parts.next().unwrap_or_default().trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_doca() {
        let address = parse_doca("US/123 MAPLE AVE/NEW YORK/10001");
        assert_eq!(address.country, "US");
        assert_eq!(address.line, "123 MAPLE AVE");
        assert_eq!(address.city, "NEW YORK");
        assert_eq!(address.postal_code, "10001");

        let partial = parse_doca("US/123 MAPLE AVE");
        assert_eq!(partial.city, "");
    }

    #[test]
    fn test_window_bounds() {
        let window = CheckInWindow::default();
        assert_eq!(window.opens_before, Duration::hours(24));
        assert_eq!(window.closes_before, Duration::minutes(45));
    }
}
