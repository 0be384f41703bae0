pub mod airports;
pub mod fares;
pub mod inventory;
pub mod seatmap;

pub use fares::{FareEngine, FareQuote, FareSelection};
pub use inventory::{FlightDate, InventoryError, InventoryLedger};
pub use seatmap::{AircraftConfig, Cabin, Seat, SeatMapCatalog};
