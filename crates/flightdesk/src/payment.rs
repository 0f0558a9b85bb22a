//! Simulated card payments.
//!
//! Card fields get a format check and the charge then always succeeds. Only
//! the last four digits and a BLAKE3 fingerprint of the card number are kept;
//! the full number and the CVV never leave [`PaymentDetails`].

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};

fn expiry_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(0[1-9]|1[0-2])/\d{2}$").expect("valid expiry regex"))
}

/// Card details as entered by the payer.
#[derive(Clone, PartialEq, Eq)]
pub struct PaymentDetails {
    /// Issuing bank.
    pub bank: String,
    /// Name printed on the card.
    pub cardholder: String,
    /// Card number; spaces and dashes are ignored.
    pub card_number: String,
    /// Expiry date as `MM/YY`.
    pub expiry: String,
    /// Three-digit security code.
    pub cvv: String,
}

// Keep card data out of logs and panic messages.
impl std::fmt::Debug for PaymentDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentDetails")
            .field("bank", &self.bank)
            .field("cardholder", &self.cardholder)
            .field("card_number", &"[REDACTED]")
            .field("expiry", &self.expiry)
            .field("cvv", &"[REDACTED]")
            .finish()
    }
}

impl PaymentDetails {
    /// The card number with separators removed.
    #[must_use]
    pub fn normalized_card_number(&self) -> String {
        normalize_card_number(&self.card_number)
    }

    /// Check every field's format.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PaymentRejected`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        if self.bank.trim().is_empty() {
            return Err(Error::payment_rejected("bank", "must not be empty"));
        }
        if self.cardholder.trim().is_empty() {
            return Err(Error::payment_rejected("cardholder", "must not be empty"));
        }
        validate_card_number(&self.normalized_card_number())?;
        validate_expiry(&self.expiry)?;
        validate_cvv(&self.cvv)
    }
}

/// Strip spaces and dashes from a typed card number.
#[must_use]
pub fn normalize_card_number(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}

/// Check that a card number is exactly 16 digits.
///
/// # Errors
///
/// Returns [`Error::PaymentRejected`] otherwise.
pub fn validate_card_number(number: &str) -> Result<()> {
    if number.len() == 16 && number.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(Error::payment_rejected("card number", "must be 16 digits"))
    }
}

/// Check that a CVV is exactly 3 digits.
///
/// # Errors
///
/// Returns [`Error::PaymentRejected`] otherwise.
pub fn validate_cvv(cvv: &str) -> Result<()> {
    let cvv = cvv.trim();
    if cvv.len() == 3 && cvv.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(Error::payment_rejected("cvv", "must be 3 digits"))
    }
}

/// Check that an expiry date looks like `MM/YY`.
///
/// # Errors
///
/// Returns [`Error::PaymentRejected`] otherwise.
pub fn validate_expiry(expiry: &str) -> Result<()> {
    if expiry_pattern().is_match(expiry.trim()) {
        Ok(())
    } else {
        Err(Error::payment_rejected("expiry", "must be MM/YY"))
    }
}

/// A completed payment, attached to the booking it paid for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Amount charged.
    pub amount: Decimal,
    /// Name of the person who paid.
    pub payer: String,
    /// Last four digits of the card.
    pub card_last4: String,
    /// BLAKE3 hex digest of the card number.
    pub card_fingerprint: String,
    /// When the charge went through.
    pub paid_at: DateTime<Utc>,
}

/// Compute the fingerprint stored in place of a card number.
#[must_use]
pub fn card_fingerprint(card_number: &str) -> String {
    blake3::hash(card_number.as_bytes()).to_hex().to_string()
}

/// Charge a card. Always succeeds once the details are well-formed.
///
/// # Errors
///
/// Returns [`Error::PaymentRejected`] if validation fails.
pub fn charge(details: &PaymentDetails, amount: Decimal, payer: &str) -> Result<Payment> {
    details.validate()?;
    let number = details.normalized_card_number();
    let card_last4 = number[number.len() - 4..].to_string();
    info!(payer, %amount, card_last4 = %card_last4, "Payment accepted");
    Ok(Payment {
        amount,
        payer: payer.trim().to_string(),
        card_fingerprint: card_fingerprint(&number),
        card_last4,
        paid_at: Utc::now(),
    })
}
