use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// A physical seat: row plus letter, parsed from designators like "14A".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Seat {
    pub row: u32,
    pub letter: char,
}

impl Seat {
    pub fn new(row: u32, letter: char) -> Self {
        Self { row, letter }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row, self.letter)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid seat designator: {0}")]
pub struct SeatParseError(pub String);

impl FromStr for Seat {
    type Err = SeatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !s.is_ascii() {
            return Err(SeatParseError(s.to_string()));
        }
        let split = s.len().checked_sub(1).ok_or_else(|| SeatParseError(s.to_string()))?;
        let (digits, letter) = s.split_at(split);
        let letter = letter
            .chars()
            .next()
            .filter(|c| c.is_ascii_alphabetic())
            .ok_or_else(|| SeatParseError(s.to_string()))?;
        let row: u32 = digits.parse().map_err(|_| SeatParseError(s.to_string()))?;
        if row == 0 {
            return Err(SeatParseError(s.to_string()));
        }
        Ok(Seat::new(row, letter.to_ascii_uppercase()))
    }
}

/// One cabin's physical layout on an aircraft type. Reference data, never
/// mutated at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cabin {
    /// Booking classes sold into this cabin.
    pub booking_classes: Vec<char>,
    pub first_row: u32,
    pub last_row: u32,
    pub letters: Vec<char>,
    pub window_letters: Vec<char>,
    pub aisle_letters: Vec<char>,
    pub exit_rows: Vec<u32>,
    pub bulkhead_rows: Vec<u32>,
    pub galley_rows: Vec<u32>,
    /// Administratively blocked (crew rest, inoperative, weight and balance).
    pub blocked: Vec<Seat>,
}

impl Cabin {
    pub fn contains(&self, seat: &Seat) -> bool {
        seat.row >= self.first_row && seat.row <= self.last_row && self.letters.contains(&seat.letter)
    }

    pub fn is_blocked(&self, seat: &Seat) -> bool {
        self.blocked.contains(seat)
    }

    pub fn is_window(&self, letter: char) -> bool {
        self.window_letters.contains(&letter)
    }

    pub fn is_aisle(&self, letter: char) -> bool {
        self.aisle_letters.contains(&letter)
    }

    pub fn is_middle(&self, letter: char) -> bool {
        !self.is_window(letter) && !self.is_aisle(letter)
    }

    pub fn midpoint_row(&self) -> u32 {
        (self.first_row + self.last_row) / 2
    }

    /// Every seat position in the cabin, blocked ones included.
    pub fn seats(&self) -> impl Iterator<Item = Seat> + '_ {
        (self.first_row..=self.last_row)
            .flat_map(move |row| self.letters.iter().map(move |&letter| Seat::new(row, letter)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AircraftConfig {
    pub aircraft_type: String,
    pub cabins: Vec<Cabin>,
}

impl AircraftConfig {
    pub fn cabin_for_class(&self, booking_class: char) -> Option<&Cabin> {
        self.cabins
            .iter()
            .find(|c| c.booking_classes.contains(&booking_class))
    }

    pub fn cabin_containing(&self, seat: &Seat) -> Option<&Cabin> {
        self.cabins.iter().find(|c| c.contains(seat))
    }

    /// A seat is valid when some cabin holds it and it is not blocked.
    pub fn is_valid_seat(&self, seat: &Seat) -> bool {
        self.cabin_containing(seat)
            .map(|c| !c.is_blocked(seat))
            .unwrap_or(false)
    }
}

/// Read-only catalog of aircraft seat configurations, keyed by type code.
pub struct SeatMapCatalog {
    configs: HashMap<String, AircraftConfig>,
}

impl SeatMapCatalog {
    pub fn new() -> Self {
        Self {
            configs: HashMap::new(),
        }
    }

    pub fn insert(&mut self, config: AircraftConfig) {
        self.configs.insert(config.aircraft_type.clone(), config);
    }

    pub fn get(&self, aircraft_type: &str) -> Option<&AircraftConfig> {
        self.configs.get(aircraft_type)
    }

    /// A small two-type fleet used by tests and single-node deployments.
    pub fn with_standard_fleet() -> Self {
        let mut catalog = Self::new();

        catalog.insert(AircraftConfig {
            aircraft_type: "B738".to_string(),
            cabins: vec![
                Cabin {
                    booking_classes: vec!['J', 'C', 'D'],
                    first_row: 1,
                    last_row: 4,
                    letters: vec!['A', 'C', 'D', 'F'],
                    window_letters: vec!['A', 'F'],
                    aisle_letters: vec!['C', 'D'],
                    exit_rows: vec![],
                    bulkhead_rows: vec![1],
                    galley_rows: vec![],
                    blocked: vec![],
                },
                Cabin {
                    booking_classes: vec!['Y', 'B', 'M', 'K'],
                    first_row: 5,
                    last_row: 30,
                    letters: vec!['A', 'B', 'C', 'D', 'E', 'F'],
                    window_letters: vec!['A', 'F'],
                    aisle_letters: vec!['C', 'D'],
                    exit_rows: vec![14, 15],
                    bulkhead_rows: vec![5],
                    galley_rows: vec![29, 30],
                    blocked: vec![Seat::new(30, 'E'), Seat::new(30, 'F')],
                },
            ],
        });

        catalog.insert(AircraftConfig {
            aircraft_type: "B789".to_string(),
            cabins: vec![
                Cabin {
                    booking_classes: vec!['J', 'C', 'D'],
                    first_row: 1,
                    last_row: 8,
                    letters: vec!['A', 'D', 'G', 'K'],
                    window_letters: vec!['A', 'K'],
                    aisle_letters: vec!['D', 'G'],
                    exit_rows: vec![],
                    bulkhead_rows: vec![1],
                    galley_rows: vec![8],
                    blocked: vec![],
                },
                Cabin {
                    booking_classes: vec!['Y', 'B', 'M', 'K'],
                    first_row: 20,
                    last_row: 48,
                    letters: vec!['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K'],
                    window_letters: vec!['A', 'K'],
                    aisle_letters: vec!['C', 'D', 'G', 'H'],
                    exit_rows: vec![32, 33],
                    bulkhead_rows: vec![20],
                    galley_rows: vec![47, 48],
                    blocked: vec![Seat::new(48, 'A'), Seat::new(48, 'K')],
                },
            ],
        });

        catalog
    }
}

impl Default for SeatMapCatalog {
    fn default() -> Self {
        Self::with_standard_fleet()
    }
}
