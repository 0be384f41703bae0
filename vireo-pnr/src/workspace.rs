use chrono::{DateTime, Utc};
use std::sync::Arc;
use vireo_catalog::fares::{FareEngine, FareError, FareSelection};
use vireo_catalog::inventory::{InventoryError, InventoryLedger};
use vireo_catalog::seatmap::Seat;
use vireo_shared::PassengerType;

use crate::commit::{CommitError, CommitValidator, LocatorGenerator};
use crate::models::{
    Agency, AirSegment, Contact, FormOfPayment, Passenger, Pnr, PnrStatus, SeatAssignment, Segment,
    SegmentStatus, Ssr, SurfaceSegment, TicketingArrangement, TravelDocument,
};
use crate::repository::{BookingStore, StoreError};

/// Attempts at drawing an unused locator before the commit gives up.
const LOCATOR_ATTEMPTS: u32 = 16;

#[derive(Debug, Clone)]
pub struct NameInput {
    pub surname: String,
    pub given_name: String,
    pub title: Option<String>,
    pub passenger_type: PassengerType,
}

/// Long-sell request: fully specified flight, no search-result side channel.
#[derive(Debug, Clone)]
pub struct SellSegment {
    pub flight_number: String,
    pub aircraft_type: String,
    pub origin: String,
    pub destination: String,
    pub departure: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
    pub booking_class: char,
    pub quantity: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Commit(#[from] CommitError),

    #[error(transparent)]
    Fare(#[from] FareError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("No passenger {0} in this booking")]
    UnknownPassenger(u32),

    #[error("No segment {0} in this booking")]
    UnknownSegment(u32),

    #[error("Segment {0} is a surface segment")]
    NotAnAirSegment(u32),

    #[error("Contact must carry a phone or an email")]
    EmptyContact,

    #[error("Invalid seat designator: {0}")]
    BadSeat(String),

    #[error("Seat {seat} is not in the {class} cabin")]
    SeatNotInCabin { seat: String, class: char },

    #[error("Booking already priced; reprice to discard the existing fares")]
    AlreadyPriced,

    #[error("Booking has no fares to store")]
    NotPriced,

    #[error("Booking {0} not found")]
    NotFound(String),

    #[error("No workspace owned by session {0}")]
    NoSessionWorkspace(String),

    #[error("Could not allocate an unused locator after {0} attempts")]
    LocatorExhausted(u32),

    #[error("{resource} could not be released: {reason}")]
    ReleaseFailed { resource: String, reason: String },
}

/// Owns the in-progress booking for a session. Every operation takes the
/// aggregate explicitly and applies one field-level change; failures leave
/// it untouched. Segment operations go through the inventory ledger
/// synchronously.
pub struct WorkspaceService {
    ledger: Arc<InventoryLedger>,
    store: Arc<dyn BookingStore>,
    locators: LocatorGenerator,
    fares: FareEngine,
}

impl WorkspaceService {
    pub fn new(ledger: Arc<InventoryLedger>, store: Arc<dyn BookingStore>) -> Self {
        Self {
            ledger,
            store,
            locators: LocatorGenerator::new(),
            fares: FareEngine,
        }
    }

    /// Deterministic locator drawing, for tests.
    pub fn with_locator_seed(
        ledger: Arc<InventoryLedger>,
        store: Arc<dyn BookingStore>,
        seed: u64,
    ) -> Self {
        Self {
            ledger,
            store,
            locators: LocatorGenerator::seeded(seed),
            fares: FareEngine,
        }
    }

    pub fn ledger(&self) -> &InventoryLedger {
        &self.ledger
    }

    pub fn create_workspace(&self, session_id: &str) -> Pnr {
        tracing::debug!(session = session_id, "opening workspace");
        Pnr::new(session_id)
    }

    /// Adds a passenger and returns the assigned sequence id.
    pub fn add_passenger(&self, pnr: &mut Pnr, name: NameInput) -> u32 {
        let id = pnr.next_passenger_id();
        pnr.passengers.push(Passenger {
            id,
            surname: name.surname,
            given_name: name.given_name,
            title: name.title,
            passenger_type: name.passenger_type,
            documents: Vec::new(),
        });
        pnr.touch();
        id
    }

    pub fn add_document(
        &self,
        pnr: &mut Pnr,
        passenger_id: u32,
        document: TravelDocument,
    ) -> Result<(), WorkspaceError> {
        let passenger = pnr
            .passenger_mut(passenger_id)
            .ok_or(WorkspaceError::UnknownPassenger(passenger_id))?;
        passenger.documents.push(document);
        pnr.touch();
        Ok(())
    }

    /// Sells quantity seats in a class on a flight. The ledger is debited
    /// first; a rejection means no segment is appended.
    pub fn sell_segment(&self, pnr: &mut Pnr, sell: SellSegment) -> Result<u32, WorkspaceError> {
        let flight = vireo_catalog::FlightDate::new(
            sell.flight_number.clone(),
            sell.departure.date_naive(),
        );
        self.ledger
            .decrement(&flight, sell.booking_class, sell.quantity)?;

        let number = pnr.next_segment_number();
        pnr.segments.push(Segment::Air(AirSegment {
            number,
            flight_number: sell.flight_number,
            aircraft_type: sell.aircraft_type,
            origin: sell.origin,
            destination: sell.destination,
            departure: sell.departure,
            arrival: sell.arrival,
            booking_class: sell.booking_class,
            quantity: sell.quantity,
            status: SegmentStatus::Holding,
        }));
        pnr.touch();
        Ok(number)
    }

    pub fn add_surface_segment(&self, pnr: &mut Pnr) -> u32 {
        let number = pnr.next_segment_number();
        pnr.segments.push(Segment::Surface(SurfaceSegment { number }));
        pnr.touch();
        number
    }

    /// Removes a segment, returning its class quantity to the ledger and
    /// releasing any seats assigned on it.
    pub fn remove_segment(&self, pnr: &mut Pnr, number: u32) -> Result<(), WorkspaceError> {
        let position = pnr
            .segments
            .iter()
            .position(|s| s.number() == number)
            .ok_or(WorkspaceError::UnknownSegment(number))?;

        if let Segment::Air(air) = &pnr.segments[position] {
            let flight = air.flight_date();
            for assignment in pnr
                .seat_assignments
                .iter()
                .filter(|sa| sa.segment_number == number)
            {
                let seat: Seat = assignment
                    .seat
                    .parse()
                    .map_err(|_| WorkspaceError::BadSeat(assignment.seat.clone()))?;
                self.ledger.release_seat(&flight, seat)?;
            }
            self.ledger
                .increment(&flight, air.booking_class, air.quantity)?;
        }

        pnr.segments.remove(position);
        pnr.seat_assignments.retain(|sa| sa.segment_number != number);
        pnr.touch();
        Ok(())
    }

    pub fn add_contact(
        &self,
        pnr: &mut Pnr,
        phone: Option<String>,
        email: Option<String>,
    ) -> Result<(), WorkspaceError> {
        if phone.is_none() && email.is_none() {
            return Err(WorkspaceError::EmptyContact);
        }
        pnr.contact = Some(Contact { phone, email });
        pnr.touch();
        Ok(())
    }

    /// Passenger references are validated at commit, not here, so remarks
    /// can be entered in any order.
    pub fn add_ssr(&self, pnr: &mut Pnr, code: &str, passenger_id: u32, text: &str) {
        pnr.ssrs.push(Ssr {
            code: code.to_string(),
            passenger_id,
            text: text.to_string(),
        });
        pnr.touch();
    }

    pub fn add_osi(&self, pnr: &mut Pnr, text: &str) {
        pnr.add_osi(text);
    }

    pub fn set_form_of_payment(&self, pnr: &mut Pnr, fop: FormOfPayment) {
        pnr.form_of_payment = Some(fop);
        pnr.touch();
    }

    pub fn set_ticketing_arrangement(
        &self,
        pnr: &mut Pnr,
        time_limit: DateTime<Utc>,
        validating_carrier: &str,
    ) {
        pnr.ticketing = Some(TicketingArrangement {
            time_limit,
            validating_carrier: validating_carrier.to_string(),
        });
        pnr.touch();
    }

    pub fn set_agency(&self, pnr: &mut Pnr, iata_code: &str, office_id: Option<String>) {
        pnr.agency = Some(Agency {
            iata_code: iata_code.to_string(),
            office_id,
        });
        pnr.touch();
    }

    /// Advance seat assignment. Validates the seat against the segment's
    /// cabin, reserves it in the ledger, and releases any previously held
    /// seat for the same passenger/segment.
    pub fn assign_seat(
        &self,
        pnr: &mut Pnr,
        passenger_id: u32,
        segment_number: u32,
        seat: &str,
    ) -> Result<(), WorkspaceError> {
        if pnr.passenger(passenger_id).is_none() {
            return Err(WorkspaceError::UnknownPassenger(passenger_id));
        }
        let air = pnr
            .segment(segment_number)
            .ok_or(WorkspaceError::UnknownSegment(segment_number))?
            .as_air()
            .ok_or(WorkspaceError::NotAnAirSegment(segment_number))?;

        let parsed: Seat = seat
            .parse()
            .map_err(|_| WorkspaceError::BadSeat(seat.to_string()))?;
        self.check_cabin(air, parsed)?;

        let flight = air.flight_date();
        let previous = pnr.seat_for(passenger_id, segment_number).cloned();
        if let Some(ref held) = previous {
            if held.seat == parsed.to_string() {
                return Ok(());
            }
        }

        self.ledger.assign_seat(&flight, parsed)?;
        if let Some(held) = previous {
            let old: Seat = held
                .seat
                .parse()
                .map_err(|_| WorkspaceError::BadSeat(held.seat.clone()))?;
            self.ledger.release_seat(&flight, old)?;
            pnr.seat_assignments
                .retain(|sa| !(sa.passenger_id == passenger_id && sa.segment_number == segment_number));
        }

        pnr.seat_assignments.push(SeatAssignment {
            passenger_id,
            segment_number,
            seat: parsed.to_string(),
        });
        pnr.touch();
        Ok(())
    }

    fn check_cabin(&self, air: &AirSegment, seat: Seat) -> Result<(), WorkspaceError> {
        let Some(config) = self.ledger.seat_maps().get(&air.aircraft_type) else {
            // Unknown aircraft types surface from the ledger on assignment.
            return Ok(());
        };
        let in_cabin = config
            .cabin_for_class(air.booking_class)
            .map(|cabin| cabin.contains(&seat))
            .unwrap_or(false);
        if !in_cabin {
            return Err(WorkspaceError::SeatNotInCabin {
                seat: seat.to_string(),
                class: air.booking_class,
            });
        }
        Ok(())
    }

    /// Quotes a fare record per passenger. `reprice` discards every
    /// existing record first; there is no incremental re-price.
    pub fn quote_fares(
        &self,
        pnr: &mut Pnr,
        currency: &str,
        reprice: bool,
    ) -> Result<(), WorkspaceError> {
        if reprice {
            pnr.fares.clear();
        } else if !pnr.fares.is_empty() {
            return Err(WorkspaceError::AlreadyPriced);
        }

        let classes: Vec<char> = pnr.air_segments().map(|a| a.booking_class).collect();
        let mut quotes = Vec::with_capacity(pnr.passengers.len());
        for passenger in &pnr.passengers {
            quotes.push(self.fares.quote(
                passenger.id,
                passenger.passenger_type,
                &classes,
                currency,
            )?);
        }

        pnr.fares = quotes;
        pnr.touch();
        Ok(())
    }

    pub fn store_fares(
        &self,
        pnr: &mut Pnr,
        selection: &FareSelection,
    ) -> Result<(), WorkspaceError> {
        if pnr.fares.is_empty() {
            return Err(WorkspaceError::NotPriced);
        }
        // Validate the whole batch before mutating any record.
        let mut staged = pnr.fares.clone();
        for quote in &mut staged {
            self.fares.store_selection(quote, selection)?;
        }
        pnr.fares = staged;
        pnr.touch();
        Ok(())
    }

    /// Validates the invariant set and persists. The first successful
    /// commit draws the locator and confirms held segments.
    pub async fn commit(&self, pnr: &mut Pnr) -> Result<String, WorkspaceError> {
        CommitValidator::validate(pnr)?;

        if pnr.locator.is_none() {
            pnr.locator = Some(self.allocate_locator().await?);
        }
        for segment in &mut pnr.segments {
            if let Segment::Air(air) = segment {
                air.status = SegmentStatus::Confirmed;
            }
        }
        if pnr.status == PnrStatus::Pending {
            pnr.status = PnrStatus::Confirmed;
        }
        pnr.session_id = None;
        pnr.session_opened_at = None;
        pnr.touch();

        self.store.save(pnr).await?;
        let locator = pnr.locator.clone().unwrap_or_default();
        tracing::info!(%locator, booking = %pnr.id, "booking committed");
        Ok(locator)
    }

    async fn allocate_locator(&self) -> Result<String, WorkspaceError> {
        for _ in 0..LOCATOR_ATTEMPTS {
            let candidate = self.locators.draw();
            if self.store.get_by_locator(&candidate).await?.is_none() {
                return Ok(candidate);
            }
        }
        Err(WorkspaceError::LocatorExhausted(LOCATOR_ATTEMPTS))
    }

    /// Discards an uncommitted working copy without persisting anything.
    pub fn ignore(&self, pnr: Pnr) {
        tracing::debug!(booking = %pnr.id, "workspace ignored");
        drop(pnr);
    }

    pub async fn retrieve(&self, locator: &str) -> Result<Pnr, WorkspaceError> {
        self.store
            .get_by_locator(locator)
            .await?
            .ok_or_else(|| WorkspaceError::NotFound(locator.to_string()))
    }

    pub async fn retrieve_by_session(&self, session_id: &str) -> Result<Pnr, WorkspaceError> {
        self.store
            .get_by_session(session_id)
            .await?
            .ok_or_else(|| WorkspaceError::NoSessionWorkspace(session_id.to_string()))
    }

    /// Deletes a booking. Order matters: release seats, then return class
    /// quantities, then remove the record. The first failing release aborts
    /// the whole operation naming the resource, so inventory never leaks
    /// silently.
    pub async fn delete(&self, locator: &str) -> Result<(), WorkspaceError> {
        let pnr = self.retrieve(locator).await?;

        for assignment in &pnr.seat_assignments {
            let air = pnr
                .air_segment(assignment.segment_number)
                .ok_or(WorkspaceError::UnknownSegment(assignment.segment_number))?;
            let seat: Seat = assignment
                .seat
                .parse()
                .map_err(|_| WorkspaceError::BadSeat(assignment.seat.clone()))?;
            self.ledger
                .release_seat(&air.flight_date(), seat)
                .map_err(|err| WorkspaceError::ReleaseFailed {
                    resource: format!("seat {} on {}", assignment.seat, air.flight_date()),
                    reason: err.to_string(),
                })?;
        }

        for air in pnr.air_segments() {
            self.ledger
                .increment(&air.flight_date(), air.booking_class, air.quantity)
                .map_err(|err| WorkspaceError::ReleaseFailed {
                    resource: format!("class {} on {}", air.booking_class, air.flight_date()),
                    reason: err.to_string(),
                })?;
        }

        self.store.remove(pnr.id).await?;
        tracing::info!(%locator, "booking deleted, inventory returned");
        Ok(())
    }
}
