use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

use crate::models::{Pnr, Segment};

/// Every way a commit can be refused, named so the caller can prompt for
/// the specific fix.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommitError {
    #[error("Booking has no passengers")]
    NoPassengers,

    #[error("Booking has no segments")]
    NoSegments,

    #[error("Passenger {0} is missing a name")]
    IncompleteName(u32),

    #[error("Segment {0} is missing required fields")]
    IncompleteSegment(u32),

    #[error("Segments {first} and {second} do not connect: {arrival} then {departure}")]
    BrokenItinerary {
        first: u32,
        second: u32,
        arrival: String,
        departure: String,
    },

    #[error("Segment {second} departs before segment {first} arrives")]
    NegativeConnection { first: u32, second: u32 },

    #[error("No phone or email contact on file")]
    MissingContact,

    #[error("No ticketing time limit on file")]
    MissingTimeLimit,

    #[error("No agency on file")]
    MissingAgency,

    #[error("SSR {code} references unknown passenger {passenger_id}")]
    OrphanSsr { code: String, passenger_id: u32 },
}

/// Runs the full cross-field invariant set. Nothing here mutates the
/// aggregate; invariants are deliberately not enforced mid-edit so a
/// booking can be built up incrementally.
pub struct CommitValidator;

impl CommitValidator {
    pub fn validate(pnr: &Pnr) -> Result<(), CommitError> {
        Self::check_passengers(pnr)?;
        Self::check_segments(pnr)?;
        Self::check_itinerary_chain(pnr)?;
        Self::check_contact_and_arrangements(pnr)?;
        Self::check_ssr_references(pnr)?;
        Ok(())
    }

    fn check_passengers(pnr: &Pnr) -> Result<(), CommitError> {
        if pnr.passengers.is_empty() {
            return Err(CommitError::NoPassengers);
        }
        for passenger in &pnr.passengers {
            if passenger.surname.trim().is_empty() || passenger.given_name.trim().is_empty() {
                return Err(CommitError::IncompleteName(passenger.id));
            }
        }
        Ok(())
    }

    fn check_segments(pnr: &Pnr) -> Result<(), CommitError> {
        if pnr.segments.is_empty() {
            return Err(CommitError::NoSegments);
        }
        for segment in &pnr.segments {
            if let Segment::Air(air) = segment {
                let incomplete = air.flight_number.trim().is_empty()
                    || air.origin.trim().is_empty()
                    || air.destination.trim().is_empty()
                    || air.quantity == 0;
                if incomplete {
                    return Err(CommitError::IncompleteSegment(air.number));
                }
            }
        }
        Ok(())
    }

    /// Adjacent air segments must chain city-wise with positive connection
    /// time. A surface segment on either side breaks the requirement.
    fn check_itinerary_chain(pnr: &Pnr) -> Result<(), CommitError> {
        for pair in pnr.segments.windows(2) {
            let (Segment::Air(a), Segment::Air(b)) = (&pair[0], &pair[1]) else {
                continue;
            };
            if a.destination != b.origin {
                return Err(CommitError::BrokenItinerary {
                    first: a.number,
                    second: b.number,
                    arrival: a.destination.clone(),
                    departure: b.origin.clone(),
                });
            }
            if b.departure <= a.arrival {
                return Err(CommitError::NegativeConnection {
                    first: a.number,
                    second: b.number,
                });
            }
        }
        Ok(())
    }

    fn check_contact_and_arrangements(pnr: &Pnr) -> Result<(), CommitError> {
        let has_contact = pnr
            .contact
            .as_ref()
            .map(|c| !c.is_empty())
            .unwrap_or(false);
        if !has_contact {
            return Err(CommitError::MissingContact);
        }
        if pnr.ticketing.is_none() {
            return Err(CommitError::MissingTimeLimit);
        }
        if pnr.agency.is_none() {
            return Err(CommitError::MissingAgency);
        }
        Ok(())
    }

    fn check_ssr_references(pnr: &Pnr) -> Result<(), CommitError> {
        for ssr in &pnr.ssrs {
            if pnr.passenger(ssr.passenger_id).is_none() {
                return Err(CommitError::OrphanSsr {
                    code: ssr.code.clone(),
                    passenger_id: ssr.passenger_id,
                });
            }
        }
        Ok(())
    }
}

/// Record locator alphabet: A-Z and 2-9 with the lookalikes (I, O, 0, 1)
/// left out, as printed on itineraries.
const LOCATOR_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const LOCATOR_LEN: usize = 6;

/// Draws candidate locators. Seedable so collision-retry paths are
/// reproducible under test.
pub struct LocatorGenerator {
    rng: Mutex<StdRng>,
}

impl LocatorGenerator {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn draw(&self) -> String {
        let mut rng = self.rng.lock().expect("locator rng poisoned");
        (0..LOCATOR_LEN)
            .map(|_| {
                let i = rng.gen_range(0..LOCATOR_ALPHABET.len());
                LOCATOR_ALPHABET[i] as char
            })
            .collect()
    }
}

impl Default for LocatorGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::*;
    use chrono::{Duration, TimeZone, Utc};
    use vireo_shared::PassengerType;

    fn passenger(id: u32) -> Passenger {
        Passenger {
            id,
            surname: "CHAPMAN".to_string(),
            given_name: "LAURA".to_string(),
            title: Some("MRS".to_string()),
            passenger_type: PassengerType::Adult,
            documents: Vec::new(),
        }
    }

    fn air(number: u32, origin: &str, destination: &str, dep_hour: u32) -> Segment {
        let departure = Utc.with_ymd_and_hms(2026, 10, 1, dep_hour, 0, 0).unwrap();
        Segment::Air(AirSegment {
            number,
            flight_number: "VX101".to_string(),
            aircraft_type: "B738".to_string(),
            origin: origin.to_string(),
            destination: destination.to_string(),
            departure,
            arrival: departure + Duration::hours(2),
            booking_class: 'Y',
            quantity: 1,
            status: SegmentStatus::Holding,
        })
    }

    fn valid_pnr() -> Pnr {
        let mut pnr = Pnr::new("S1");
        pnr.passengers.push(passenger(1));
        pnr.segments.push(air(1, "LHR", "JFK", 9));
        pnr.contact = Some(Contact {
            phone: Some("+442071234567".to_string()),
            email: None,
        });
        pnr.ticketing = Some(TicketingArrangement {
            time_limit: Utc.with_ymd_and_hms(2026, 9, 20, 12, 0, 0).unwrap(),
            validating_carrier: "VX".to_string(),
        });
        pnr.agency = Some(Agency {
            iata_code: "91234565".to_string(),
            office_id: None,
        });
        pnr
    }

    #[test]
    fn test_valid_booking_passes() {
        assert_eq!(CommitValidator::validate(&valid_pnr()), Ok(()));
    }

    #[test]
    fn test_each_missing_piece_is_named() {
        let mut pnr = valid_pnr();
        pnr.passengers.clear();
        assert_eq!(
            CommitValidator::validate(&pnr),
            Err(CommitError::NoPassengers)
        );

        let mut pnr = valid_pnr();
        pnr.segments.clear();
        assert_eq!(CommitValidator::validate(&pnr), Err(CommitError::NoSegments));

        let mut pnr = valid_pnr();
        pnr.contact = None;
        assert_eq!(
            CommitValidator::validate(&pnr),
            Err(CommitError::MissingContact)
        );

        let mut pnr = valid_pnr();
        pnr.ticketing = None;
        assert_eq!(
            CommitValidator::validate(&pnr),
            Err(CommitError::MissingTimeLimit)
        );

        let mut pnr = valid_pnr();
        pnr.agency = None;
        assert_eq!(
            CommitValidator::validate(&pnr),
            Err(CommitError::MissingAgency)
        );
    }

    #[test]
    fn test_broken_chain_detected() {
        let mut pnr = valid_pnr();
        // JFK arrival followed by a BOS departure: no connection.
        pnr.segments.push(air(2, "BOS", "ORD", 14));

        assert!(matches!(
            CommitValidator::validate(&pnr),
            Err(CommitError::BrokenItinerary { first: 1, second: 2, .. })
        ));
    }

    #[test]
    fn test_negative_connection_detected() {
        let mut pnr = valid_pnr();
        // Departs JFK before the inbound arrives.
        pnr.segments.push(air(2, "JFK", "ORD", 10));

        assert!(matches!(
            CommitValidator::validate(&pnr),
            Err(CommitError::NegativeConnection { first: 1, second: 2 })
        ));
    }

    #[test]
    fn test_surface_segment_breaks_the_chain_requirement() {
        let mut pnr = valid_pnr();
        pnr.segments.push(Segment::Surface(SurfaceSegment { number: 2 }));
        // EWR does not connect from JFK, but the ARNK in between allows it.
        pnr.segments.push(air(3, "EWR", "LHR", 20));

        assert_eq!(CommitValidator::validate(&pnr), Ok(()));
    }

    #[test]
    fn test_orphan_ssr_detected() {
        let mut pnr = valid_pnr();
        pnr.ssrs.push(Ssr {
            code: "WCHR".to_string(),
            passenger_id: 9,
            text: String::new(),
        });

        assert!(matches!(
            CommitValidator::validate(&pnr),
            Err(CommitError::OrphanSsr { passenger_id: 9, .. })
        ));
    }

    #[test]
    fn test_locator_shape() {
        let generator = LocatorGenerator::seeded(7);
        for _ in 0..100 {
            let locator = generator.draw();
            assert_eq!(locator.len(), LOCATOR_LEN);
            assert!(locator
                .bytes()
                .all(|b| LOCATOR_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_seeded_generator_is_reproducible() {
        let a = LocatorGenerator::seeded(42);
        let b = LocatorGenerator::seeded(42);
        for _ in 0..10 {
            assert_eq!(a.draw(), b.draw());
        }
    }
}
