//! Validation errors.

use thiserror::Error;

/// A user-correctable problem with a field value.
///
/// The `Display` text is what the form shows next to the field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Ticket did not normalize to the required digit count.
    #[error("enter exactly 11 digits.")]
    TicketDigits {
        /// Digits found after stripping everything else.
        found: usize,
    },

    /// Required field left empty.
    #[error("this field is required.")]
    Required,
}
