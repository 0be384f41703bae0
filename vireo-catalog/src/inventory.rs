use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::seatmap::{Seat, SeatMapCatalog};

/// Inventory key: one flight number on one departure date.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlightDate {
    pub flight_number: String,
    pub date: NaiveDate,
}

impl FlightDate {
    pub fn new(flight_number: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            flight_number: flight_number.into(),
            date,
        }
    }
}

impl std::fmt::Display for FlightDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.flight_number, self.date)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Flight {0} is not open for sale")]
    UnknownFlight(String),

    #[error("Class {class} is not offered on {flight}")]
    UnknownClass { flight: String, class: char },

    #[error("Insufficient seats in {class}: requested {requested}, remaining {remaining}")]
    InsufficientSeats {
        class: char,
        requested: u32,
        remaining: u32,
    },

    #[error("No seat map for aircraft type {0}")]
    UnknownAircraft(String),

    #[error("Seat {0} is not a valid seat on this aircraft")]
    InvalidSeat(String),

    #[error("Seat {0} is already occupied")]
    SeatOccupied(String),
}

struct FlightRecord {
    aircraft_type: String,
    classes: HashMap<char, u32>,
}

/// Single source of truth for what can be sold or assigned: per-flight
/// class counters and per-flight seat occupancy. All mutation goes through
/// the four operations below; each counter map and each occupancy set is
/// only ever touched under its lock, so concurrent bookings against the
/// same flight serialize here.
pub struct InventoryLedger {
    seat_maps: Arc<SeatMapCatalog>,
    flights: Mutex<HashMap<FlightDate, FlightRecord>>,
    occupied: Mutex<HashMap<FlightDate, HashSet<Seat>>>,
}

impl InventoryLedger {
    pub fn new(seat_maps: Arc<SeatMapCatalog>) -> Self {
        Self {
            seat_maps,
            flights: Mutex::new(HashMap::new()),
            occupied: Mutex::new(HashMap::new()),
        }
    }

    pub fn seat_maps(&self) -> &SeatMapCatalog {
        &self.seat_maps
    }

    /// Open a flight for sale with its class allocations.
    pub fn open_flight(
        &self,
        flight: FlightDate,
        aircraft_type: impl Into<String>,
        allocations: &[(char, u32)],
    ) {
        let mut flights = self.flights.lock().expect("inventory lock poisoned");
        flights.insert(
            flight,
            FlightRecord {
                aircraft_type: aircraft_type.into(),
                classes: allocations.iter().copied().collect(),
            },
        );
    }

    /// Atomic compare-and-subtract on a class counter. Not enough seats is
    /// an expected outcome the caller branches on, never a panic.
    pub fn decrement(
        &self,
        flight: &FlightDate,
        class: char,
        quantity: u32,
    ) -> Result<(), InventoryError> {
        let mut flights = self.flights.lock().expect("inventory lock poisoned");
        let record = flights
            .get_mut(flight)
            .ok_or_else(|| InventoryError::UnknownFlight(flight.to_string()))?;
        let remaining = record
            .classes
            .get_mut(&class)
            .ok_or(InventoryError::UnknownClass {
                flight: flight.to_string(),
                class,
            })?;

        if *remaining < quantity {
            tracing::debug!(%flight, %class, requested = quantity, remaining = *remaining, "sell rejected");
            return Err(InventoryError::InsufficientSeats {
                class,
                requested: quantity,
                remaining: *remaining,
            });
        }

        *remaining -= quantity;
        Ok(())
    }

    /// Unconditional inverse of `decrement`, used on segment removal and
    /// booking deletion.
    pub fn increment(
        &self,
        flight: &FlightDate,
        class: char,
        quantity: u32,
    ) -> Result<(), InventoryError> {
        let mut flights = self.flights.lock().expect("inventory lock poisoned");
        let record = flights
            .get_mut(flight)
            .ok_or_else(|| InventoryError::UnknownFlight(flight.to_string()))?;
        *record.classes.entry(class).or_insert(0) += quantity;
        Ok(())
    }

    /// Add-if-absent on the occupancy set, after validating the seat against
    /// the flight's aircraft configuration.
    pub fn assign_seat(&self, flight: &FlightDate, seat: Seat) -> Result<(), InventoryError> {
        self.validate_seat(flight, &seat)?;

        let mut occupied = self.occupied.lock().expect("occupancy lock poisoned");
        let seats = occupied.entry(flight.clone()).or_default();
        if !seats.insert(seat) {
            return Err(InventoryError::SeatOccupied(seat.to_string()));
        }
        Ok(())
    }

    /// Remove-if-present. Returns whether the seat was actually held.
    pub fn release_seat(&self, flight: &FlightDate, seat: Seat) -> Result<bool, InventoryError> {
        let mut occupied = self.occupied.lock().expect("occupancy lock poisoned");
        Ok(occupied
            .get_mut(flight)
            .map(|seats| seats.remove(&seat))
            .unwrap_or(false))
    }

    /// Validity plus non-occupancy.
    pub fn is_seat_available(&self, flight: &FlightDate, seat: Seat) -> Result<bool, InventoryError> {
        if self.validate_seat(flight, &seat).is_err() {
            return Ok(false);
        }
        let occupied = self.occupied.lock().expect("occupancy lock poisoned");
        Ok(!occupied
            .get(flight)
            .map(|seats| seats.contains(&seat))
            .unwrap_or(false))
    }

    /// Snapshot of the occupancy set, for seat-picking.
    pub fn occupied_seats(&self, flight: &FlightDate) -> HashSet<Seat> {
        let occupied = self.occupied.lock().expect("occupancy lock poisoned");
        occupied.get(flight).cloned().unwrap_or_default()
    }

    /// Remaining count for a class, if the flight and class are known.
    pub fn remaining(&self, flight: &FlightDate, class: char) -> Option<u32> {
        let flights = self.flights.lock().expect("inventory lock poisoned");
        flights
            .get(flight)
            .and_then(|record| record.classes.get(&class).copied())
    }

    pub fn aircraft_type(&self, flight: &FlightDate) -> Option<String> {
        let flights = self.flights.lock().expect("inventory lock poisoned");
        flights.get(flight).map(|record| record.aircraft_type.clone())
    }

    fn validate_seat(&self, flight: &FlightDate, seat: &Seat) -> Result<(), InventoryError> {
        let aircraft_type = self
            .aircraft_type(flight)
            .ok_or_else(|| InventoryError::UnknownFlight(flight.to_string()))?;
        let config = self
            .seat_maps
            .get(&aircraft_type)
            .ok_or(InventoryError::UnknownAircraft(aircraft_type))?;
        if !config.is_valid_seat(seat) {
            return Err(InventoryError::InvalidSeat(seat.to_string()));
        }
        Ok(())
    }
}
