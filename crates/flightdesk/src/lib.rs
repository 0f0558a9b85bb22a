//! `flightdesk` - A console airline booking desk
//!
//! This library provides the flight schedule (a binary search tree keyed by
//! departure), the append-only booking ledger, a flat-file credential store,
//! simulated card payments, and the interactive console that ties them
//! together.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod console;
pub mod desk;
pub mod error;
pub mod flights;
pub mod ledger;
pub mod logging;
pub mod payment;
pub mod users;

pub use config::Config;
pub use desk::{Desk, Receipt};
pub use error::{Error, Result};
pub use flights::{Flight, FlightId, FlightIndex};
pub use ledger::{Booking, BookingId, BookingLedger};
pub use logging::init_logging;
pub use users::{Role, User, UserStore};
