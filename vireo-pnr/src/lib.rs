pub mod commit;
pub mod models;
pub mod repository;
pub mod workspace;

pub use commit::{CommitError, CommitValidator, LocatorGenerator};
pub use models::{Pnr, PnrStatus};
pub use repository::{BookingStore, StoreError};
pub use workspace::{WorkspaceError, WorkspaceService};
