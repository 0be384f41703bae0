pub mod saga;
pub mod tickets;

pub use saga::{MockGateway, TicketingError, TicketingSaga};
pub use tickets::TicketNumberGenerator;
