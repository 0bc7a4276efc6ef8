//! Form fields and their transient error state.

use std::fmt;

/// Identifies a field of the report form.
///
/// Document order is defined by [`crate::ReportForm::field_keys`]: scalar
/// fields first, then each item's description followed by its evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKey {
    Department,
    Issue,
    Ticket,
    Date,
    Region,
    ItemDescription(usize),
    ItemEvaluation(usize),
}

impl FieldKey {
    /// Returns true for evaluation inputs, which are reformatted on blur.
    pub fn is_evaluation(&self) -> bool {
        matches!(self, FieldKey::ItemEvaluation(_))
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKey::Department => write!(f, "department_number"),
            FieldKey::Issue => write!(f, "issue_number"),
            FieldKey::Ticket => write!(f, "ticket_number"),
            FieldKey::Date => write!(f, "date"),
            FieldKey::Region => write!(f, "region"),
            FieldKey::ItemDescription(i) => write!(f, "items[{}].description", i),
            FieldKey::ItemEvaluation(i) => write!(f, "items[{}].evaluation", i),
        }
    }
}

/// Per-field error display state. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrorState {
    pub is_invalid: bool,
    pub message: String,
}

/// A single input and its current error display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormField {
    value: String,
    error: FieldErrorState,
}

impl FormField {
    /// Creates a field holding `value` with no error shown.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            error: FieldErrorState::default(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    pub fn error(&self) -> &FieldErrorState {
        &self.error
    }

    pub fn is_invalid(&self) -> bool {
        self.error.is_invalid
    }

    /// Shows `message` as the field's error.
    pub fn mark_invalid(&mut self, message: impl Into<String>) {
        self.error = FieldErrorState {
            is_invalid: true,
            message: message.into(),
        };
    }

    /// Hides the error display. Returns true if an error was showing.
    pub fn clear_error(&mut self) -> bool {
        let was_invalid = self.error.is_invalid;
        self.error = FieldErrorState::default();
        was_invalid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_and_clear() {
        let mut field = FormField::new("x");
        field.mark_invalid("bad");
        assert!(field.is_invalid());
        assert_eq!(field.error().message, "bad");

        assert!(field.clear_error());
        assert!(!field.is_invalid());
        assert!(field.error().message.is_empty());
        assert!(!field.clear_error());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(FieldKey::Ticket.to_string(), "ticket_number");
        assert_eq!(FieldKey::ItemEvaluation(2).to_string(), "items[2].evaluation");
    }
}
