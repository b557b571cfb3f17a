//! SQLite collaborators for the backfill engine.
//!
//! - [`SqliteSource`]: a legacy table streamed in key order
//! - [`SqliteDestination`]: destination row counts for consistency reports
//! - [`CopyMigration`]: a migration unit copying columns between databases
//!
//! Connections are shared through `Rc`, so everything here is meant for a
//! single thread, like the engine itself.

pub mod copy;
pub mod destination;
pub mod error;
pub mod source;

pub use copy::CopyMigration;
pub use destination::SqliteDestination;
pub use error::{quote_identifier, Error, Result};
pub use source::SqliteSource;
