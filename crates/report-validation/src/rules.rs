//! Field rules and value formatting helpers.

use crate::error::ValidationError;
use crate::field::FormField;

/// Digits a ticket number must normalize to.
pub const TICKET_DIGITS: usize = 11;

/// A check applied to one field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Must not be blank.
    Required,
    /// Must contain exactly [`TICKET_DIGITS`] digits once everything else
    /// is stripped.
    Ticket,
}

impl Rule {
    /// Checks a raw value against the rule.
    pub fn check(&self, value: &str) -> Result<(), ValidationError> {
        match self {
            Rule::Required => {
                if value.trim().is_empty() {
                    Err(ValidationError::Required)
                } else {
                    Ok(())
                }
            }
            Rule::Ticket => {
                let found = ticket_digits(value).len();
                if found == TICKET_DIGITS {
                    Ok(())
                } else {
                    Err(ValidationError::TicketDigits { found })
                }
            }
        }
    }
}

/// Strips every non-digit character.
pub fn ticket_digits(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Groups digits with a space every three from the right.
///
/// Non-digits are stripped first, so the result is stable when applied to
/// an already-grouped value.
pub fn format_number_with_spaces(value: &str) -> String {
    let digits = ticket_digits(value);
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(c);
    }
    out
}

/// Validates `field` against `rule`, updating its error display.
///
/// Returns true if the value passes.
pub fn validate_field(field: &mut FormField, rule: Rule) -> bool {
    match rule.check(field.value()) {
        Ok(()) => {
            field.clear_error();
            true
        }
        Err(e) => {
            field.mark_invalid(e.to_string());
            false
        }
    }
}
