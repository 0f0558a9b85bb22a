//! Error types for flightdesk.
//!
//! This module defines all error types used throughout the flightdesk crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

use crate::flights::FlightId;
use crate::ledger::BookingId;
use crate::users::Role;

/// The main error type for flightdesk operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Flight Index Errors ===
    /// No flight with the given id is scheduled.
    #[error("flight {id} not found")]
    FlightNotFound {
        /// The id that was looked up.
        id: FlightId,
    },

    /// A flight with this id is already in the index.
    #[error("flight {id} already exists")]
    DuplicateFlight {
        /// The conflicting id.
        id: FlightId,
    },

    /// The flight does not have enough free seats.
    #[error("not enough seats on flight {id}: requested {requested}, available {available}")]
    InsufficientSeats {
        /// The flight being booked.
        id: FlightId,
        /// Seats requested.
        requested: u32,
        /// Seats still available.
        available: u32,
    },

    /// A seat count of zero was requested.
    #[error("seat count must be at least 1")]
    InvalidSeatCount,

    /// Flight fields failed validation.
    #[error("invalid flight: {message}")]
    InvalidFlight {
        /// Description of the validation failure.
        message: String,
    },

    // === Ledger Errors ===
    /// No booking with the given id exists.
    #[error("booking {id} not found")]
    BookingNotFound {
        /// The id that was looked up.
        id: BookingId,
    },

    /// The booking already carries a payment.
    #[error("booking {id} is already paid")]
    AlreadyPaid {
        /// The booking that was paid twice.
        id: BookingId,
    },

    /// A booking was requested without any passenger names.
    #[error("at least one passenger name is required")]
    NoPassengers,

    // === Credential Errors ===
    /// The email address is malformed.
    #[error("invalid email address: {email}")]
    InvalidEmail {
        /// The rejected address.
        email: String,
    },

    /// The display name is blank.
    #[error("name must not be empty")]
    InvalidName,

    /// The password does not satisfy the password policy.
    #[error("password rejected: {reason}")]
    WeakPassword {
        /// Which rule was violated.
        reason: String,
    },

    /// A user with this email is already registered.
    #[error("a user with email {email} is already registered")]
    DuplicateUser {
        /// The conflicting email.
        email: String,
    },

    /// No user with this email is registered.
    #[error("no user registered with email {email}")]
    UserNotFound {
        /// The email that was looked up.
        email: String,
    },

    /// Unknown email or wrong password.
    #[error("incorrect email or password")]
    InvalidCredentials,

    /// The access key for a privileged role was wrong.
    #[error("access key rejected for role {role}")]
    AccessDenied {
        /// The role that was requested.
        role: Role,
    },

    // === Payment Errors ===
    /// A payment field failed its format check.
    #[error("payment rejected: {field} {message}")]
    PaymentRejected {
        /// Name of the offending field.
        field: &'static str,
        /// Description of the problem.
        message: String,
    },

    // === Console Errors ===
    /// The console input reached end of file.
    #[error("console input closed")]
    InputClosed,

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing the users file failed.
    #[error("users file {path}: {source}")]
    UsersFile {
        /// Path to the users file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for flightdesk operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a flight validation error.
    #[must_use]
    pub fn invalid_flight(message: impl Into<String>) -> Self {
        Self::InvalidFlight {
            message: message.into(),
        }
    }

    /// Create a password policy error.
    #[must_use]
    pub fn weak_password(reason: impl Into<String>) -> Self {
        Self::WeakPassword {
            reason: reason.into(),
        }
    }

    /// Create a payment field error.
    #[must_use]
    pub fn payment_rejected(field: &'static str, message: impl Into<String>) -> Self {
        Self::PaymentRejected {
            field,
            message: message.into(),
        }
    }

    /// Check if this error means a lookup missed.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::FlightNotFound { .. } | Self::BookingNotFound { .. } | Self::UserNotFound { .. }
        )
    }

    /// Check if this error was caused by user input rather than the environment.
    ///
    /// The console prints these and keeps the session going.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        !matches!(
            self,
            Self::InputClosed
                | Self::ConfigLoad(_)
                | Self::Io(_)
                | Self::DirectoryCreate { .. }
                | Self::UsersFile { .. }
                | Self::Internal(_)
        )
    }
}
