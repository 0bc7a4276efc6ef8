//! Form model and validation for the report mini app.
//!
//! Validation is synchronous and stateless: each rule looks only at the
//! current field value. The observable side effect is the field's
//! [`FieldErrorState`], which a UI renders next to the input.
//!
//! Forms are plain values. Events are dispatched to a form explicitly and
//! listeners subscribe to the form they care about, so any number of forms
//! can live side by side and tests need no browser.
//!
//! # Example
//!
//! ```
//! use report_validation::{FieldKey, FormEvent, ReportForm, SubmitDecision};
//!
//! let mut form = ReportForm::new();
//! form.dispatch(FormEvent::Input(FieldKey::Ticket, "+7 (911) 234-56-78".into()));
//!
//! match form.dispatch(FormEvent::Submit) {
//!     Some(SubmitDecision::Rejected { first_invalid }) => {
//!         // department and issue are still empty
//!         assert_eq!(first_invalid, FieldKey::Department);
//!     }
//!     other => panic!("unexpected: {:?}", other),
//! }
//! ```

pub mod error;
pub mod field;
pub mod form;
pub mod rules;

pub use error::ValidationError;
pub use field::{FieldErrorState, FieldKey, FormField};
pub use form::{FormEvent, FormNotification, ReportForm, SubmitDecision, SubscriptionId};
pub use rules::{format_number_with_spaces, ticket_digits, validate_field, Rule, TICKET_DIGITS};
