//! Report form state and its event handling.

use report_models::{ReportItem, ReportPayload};
use tracing::debug;

use crate::field::{FieldKey, FormField};
use crate::rules::{format_number_with_spaces, ticket_digits, validate_field, Rule};

/// A user interaction delivered to a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
    /// The field's value changed.
    Input(FieldKey, String),
    /// The field gained focus.
    Focus(FieldKey),
    /// The field lost focus.
    Blur(FieldKey),
    /// The user pressed submit.
    Submit,
}

/// Something observable that happened to the form, delivered to
/// subscribers after the form state has been updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormNotification {
    /// A field's error display was shown.
    Invalid { key: FieldKey, message: String },
    /// A field's error display was removed.
    ErrorCleared(FieldKey),
    /// A field's value was rewritten by the form (evaluation grouping).
    Reformatted { key: FieldKey, value: String },
    /// A field received focus and was scrolled into view.
    Focused(FieldKey),
}

/// Outcome of a submit event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitDecision {
    /// Every check passed; the payload is ready to send.
    Accepted(ReportPayload),
    /// At least one check failed; focus moved to `first_invalid`.
    Rejected { first_invalid: FieldKey },
}

/// Handle returned by [`ReportForm::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(usize);

type Listener = Box<dyn FnMut(&FormNotification) + Send>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ItemFields {
    description: FormField,
    evaluation: FormField,
    photo_url: Option<String>,
}

/// The report form: scalar fields plus a dynamic list of items.
pub struct ReportForm {
    department: FormField,
    issue: FormField,
    ticket: FormField,
    date: FormField,
    region: FormField,
    items: Vec<ItemFields>,
    focused: Option<FieldKey>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: usize,
}

impl std::fmt::Debug for ReportForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportForm")
            .field("department", &self.department)
            .field("issue", &self.issue)
            .field("ticket", &self.ticket)
            .field("date", &self.date)
            .field("region", &self.region)
            .field("items", &self.items)
            .field("focused", &self.focused)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for ReportForm {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportForm {
    /// Creates an empty form with a single blank item.
    pub fn new() -> Self {
        Self {
            department: FormField::default(),
            issue: FormField::default(),
            ticket: FormField::default(),
            date: FormField::default(),
            region: FormField::default(),
            items: vec![ItemFields::default()],
            focused: None,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Creates a form pre-filled from a payload (items included as given).
    pub fn from_payload(payload: &ReportPayload) -> Self {
        let mut form = Self::new();
        form.department.set_value(payload.department_number.as_str());
        form.issue.set_value(payload.issue_number.as_str());
        form.ticket.set_value(payload.ticket_number.as_str());
        form.date.set_value(payload.date.as_str());
        form.region.set_value(payload.region.as_str());
        form.items = payload
            .items
            .iter()
            .map(|item| ItemFields {
                description: FormField::new(item.description.as_str()),
                evaluation: FormField::new(item.evaluation.as_str()),
                photo_url: item.photo_url.clone(),
            })
            .collect();
        form
    }

    /// Registers a listener for form notifications.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&FormNotification) + Send + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a listener. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _)| *sub != id);
        self.listeners.len() != before
    }

    fn notify(&mut self, notification: FormNotification) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(&notification);
        }
    }

    /// Appends a blank item and returns its index.
    pub fn add_item(&mut self) -> usize {
        self.items.push(ItemFields::default());
        self.items.len() - 1
    }

    /// Removes the item at `index`. Later items shift down by one.
    pub fn remove_item(&mut self, index: usize) -> bool {
        if index < self.items.len() {
            self.items.remove(index);
            true
        } else {
            false
        }
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// All field keys in document order.
    pub fn field_keys(&self) -> Vec<FieldKey> {
        let mut keys = vec![
            FieldKey::Department,
            FieldKey::Issue,
            FieldKey::Ticket,
            FieldKey::Date,
            FieldKey::Region,
        ];
        for i in 0..self.items.len() {
            keys.push(FieldKey::ItemDescription(i));
            keys.push(FieldKey::ItemEvaluation(i));
        }
        keys
    }

    pub fn field(&self, key: FieldKey) -> Option<&FormField> {
        match key {
            FieldKey::Department => Some(&self.department),
            FieldKey::Issue => Some(&self.issue),
            FieldKey::Ticket => Some(&self.ticket),
            FieldKey::Date => Some(&self.date),
            FieldKey::Region => Some(&self.region),
            FieldKey::ItemDescription(i) => self.items.get(i).map(|item| &item.description),
            FieldKey::ItemEvaluation(i) => self.items.get(i).map(|item| &item.evaluation),
        }
    }

    fn field_mut(&mut self, key: FieldKey) -> Option<&mut FormField> {
        match key {
            FieldKey::Department => Some(&mut self.department),
            FieldKey::Issue => Some(&mut self.issue),
            FieldKey::Ticket => Some(&mut self.ticket),
            FieldKey::Date => Some(&mut self.date),
            FieldKey::Region => Some(&mut self.region),
            FieldKey::ItemDescription(i) => {
                self.items.get_mut(i).map(|item| &mut item.description)
            }
            FieldKey::ItemEvaluation(i) => self.items.get_mut(i).map(|item| &mut item.evaluation),
        }
    }

    /// The rule a field is checked against, if any.
    pub fn rule_for(key: FieldKey) -> Option<Rule> {
        match key {
            FieldKey::Ticket => Some(Rule::Ticket),
            FieldKey::Department
            | FieldKey::Issue
            | FieldKey::ItemDescription(_)
            | FieldKey::ItemEvaluation(_) => Some(Rule::Required),
            FieldKey::Date | FieldKey::Region => None,
        }
    }

    /// The field that currently has focus.
    pub fn focused(&self) -> Option<FieldKey> {
        self.focused
    }

    /// First field in document order whose error is showing.
    pub fn first_invalid(&self) -> Option<FieldKey> {
        self.field_keys()
            .into_iter()
            .find(|key| self.field(*key).is_some_and(FormField::is_invalid))
    }

    /// Fields whose error is showing, with their messages, in document order.
    pub fn errors(&self) -> Vec<(FieldKey, String)> {
        self.field_keys()
            .into_iter()
            .filter_map(|key| {
                self.field(key)
                    .filter(|field| field.is_invalid())
                    .map(|field| (key, field.error().message.clone()))
            })
            .collect()
    }

    fn clear_field_error(&mut self, key: FieldKey) {
        let cleared = self
            .field_mut(key)
            .map(FormField::clear_error)
            .unwrap_or(false);
        if cleared {
            self.notify(FormNotification::ErrorCleared(key));
        }
    }

    fn focus(&mut self, key: FieldKey) {
        self.focused = Some(key);
        self.notify(FormNotification::Focused(key));
    }

    /// Applies one event to the form.
    ///
    /// Input and focus clear the field's error display whether or not the
    /// new value is valid. Blur regroups evaluation digits. Submit runs a
    /// full validation pass and returns the decision; every other event
    /// returns `None`. Events naming a field that does not exist are
    /// ignored.
    pub fn dispatch(&mut self, event: FormEvent) -> Option<SubmitDecision> {
        match event {
            FormEvent::Input(key, value) => {
                let Some(field) = self.field_mut(key) else {
                    debug!(field = %key, "input for unknown field ignored");
                    return None;
                };
                field.set_value(value);
                self.clear_field_error(key);
                None
            }
            FormEvent::Focus(key) => {
                if self.field(key).is_none() {
                    debug!(field = %key, "focus for unknown field ignored");
                    return None;
                }
                self.clear_field_error(key);
                self.focused = Some(key);
                None
            }
            FormEvent::Blur(key) => {
                if self.focused == Some(key) {
                    self.focused = None;
                }
                if key.is_evaluation() {
                    if let Some(field) = self.field_mut(key) {
                        let formatted = format_number_with_spaces(field.value());
                        if formatted != field.value() {
                            field.set_value(formatted.as_str());
                            self.notify(FormNotification::Reformatted {
                                key,
                                value: formatted,
                            });
                        }
                    }
                }
                None
            }
            FormEvent::Submit => Some(self.submit()),
        }
    }

    /// Validates one field against its rule, updating its error display.
    ///
    /// Fields without a rule (and unknown keys) always pass.
    pub fn validate_key(&mut self, key: FieldKey) -> bool {
        let Some(rule) = Self::rule_for(key) else {
            return true;
        };
        let Some(field) = self.field_mut(key) else {
            return true;
        };
        let valid = validate_field(field, rule);
        if !valid {
            let message = field.error().message.clone();
            self.notify(FormNotification::Invalid { key, message });
        }
        valid
    }

    /// Runs every field check, including each item's description and
    /// evaluation.
    ///
    /// All fields are checked so every error is shown at once. On failure
    /// the first invalid field in document order receives focus.
    pub fn validate_form(&mut self) -> bool {
        let mut valid = true;
        for key in self.field_keys() {
            valid &= self.validate_key(key);
        }
        if !valid {
            if let Some(first) = self.first_invalid() {
                self.focus(first);
            }
        }
        valid
    }

    fn submit(&mut self) -> SubmitDecision {
        if self.validate_form() {
            SubmitDecision::Accepted(self.to_payload())
        } else {
            // validate_form only fails when some field is marked invalid
            let first_invalid = self.first_invalid().unwrap_or(FieldKey::Department);
            SubmitDecision::Rejected { first_invalid }
        }
    }

    /// Builds the payload from the current values.
    ///
    /// The ticket is sent normalized to its digits.
    pub fn to_payload(&self) -> ReportPayload {
        ReportPayload {
            department_number: self.department.value().trim().to_string(),
            issue_number: self.issue.value().trim().to_string(),
            ticket_number: ticket_digits(self.ticket.value()),
            date: self.date.value().trim().to_string(),
            region: self.region.value().trim().to_string(),
            items: self
                .items
                .iter()
                .map(|item| {
                    let report_item = ReportItem::new(
                        item.description.value().trim(),
                        item.evaluation.value().trim(),
                    );
                    match &item.photo_url {
                        Some(url) => report_item.with_photo(url.as_str()),
                        None => report_item,
                    }
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn filled_form() -> ReportForm {
        let mut form = ReportForm::new();
        form.dispatch(FormEvent::Input(FieldKey::Department, "385".into()));
        form.dispatch(FormEvent::Input(FieldKey::Issue, "12".into()));
        form.dispatch(FormEvent::Input(FieldKey::Ticket, "8 (911) 234-56-78".into()));
        form.dispatch(FormEvent::Input(FieldKey::Date, "18.10.2026".into()));
        form.dispatch(FormEvent::Input(FieldKey::Region, "Курган".into()));
        form.dispatch(FormEvent::Input(
            FieldKey::ItemDescription(0),
            "Gold ring".into(),
        ));
        form.dispatch(FormEvent::Input(FieldKey::ItemEvaluation(0), "15000".into()));
        form
    }

    fn recorder(form: &mut ReportForm) -> Arc<Mutex<Vec<FormNotification>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        form.subscribe(move |n| sink.lock().unwrap().push(n.clone()));
        seen
    }

    #[test]
    fn test_valid_form_is_accepted() {
        let mut form = filled_form();
        match form.dispatch(FormEvent::Submit) {
            Some(SubmitDecision::Accepted(payload)) => {
                assert_eq!(payload.ticket_number, "89112345678");
                assert_eq!(payload.items.len(), 1);
                assert_eq!(payload.items[0].description, "Gold ring");
            }
            other => panic!("expected accepted, got {:?}", other),
        }
        assert!(form.errors().is_empty());
    }

    #[test]
    fn test_empty_form_rejects_and_focuses_first_invalid() {
        let mut form = ReportForm::new();
        let decision = form.dispatch(FormEvent::Submit);

        assert_eq!(
            decision,
            Some(SubmitDecision::Rejected {
                first_invalid: FieldKey::Department
            })
        );
        assert_eq!(form.focused(), Some(FieldKey::Department));

        let invalid: Vec<FieldKey> = form.errors().into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            invalid,
            vec![
                FieldKey::Department,
                FieldKey::Issue,
                FieldKey::Ticket,
                FieldKey::ItemDescription(0),
                FieldKey::ItemEvaluation(0),
            ]
        );
    }

    #[test]
    fn test_first_invalid_follows_document_order_across_items() {
        let mut form = filled_form();
        let second = form.add_item();
        form.dispatch(FormEvent::Input(FieldKey::ItemDescription(second), "Chain".into()));

        assert!(!form.validate_form());
        assert_eq!(form.focused(), Some(FieldKey::ItemEvaluation(second)));
    }

    #[test]
    fn test_bad_ticket_message() {
        let mut form = filled_form();
        form.dispatch(FormEvent::Input(FieldKey::Ticket, "12345".into()));

        assert!(!form.validate_form());
        let errors = form.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, FieldKey::Ticket);
        assert_eq!(errors[0].1, "enter exactly 11 digits.");
    }

    #[test]
    fn test_input_clears_error_even_if_still_invalid() {
        let mut form = filled_form();
        form.dispatch(FormEvent::Input(FieldKey::Ticket, "1".into()));
        form.validate_form();
        assert!(form.field(FieldKey::Ticket).unwrap().is_invalid());

        form.dispatch(FormEvent::Input(FieldKey::Ticket, "12".into()));
        assert!(!form.field(FieldKey::Ticket).unwrap().is_invalid());

        // The error only returns on the next explicit pass
        assert!(!form.validate_form());
        assert!(form.field(FieldKey::Ticket).unwrap().is_invalid());
    }

    #[test]
    fn test_focus_clears_error() {
        let mut form = ReportForm::new();
        form.validate_form();
        assert!(form.field(FieldKey::Issue).unwrap().is_invalid());

        let seen = recorder(&mut form);
        form.dispatch(FormEvent::Focus(FieldKey::Issue));

        assert!(!form.field(FieldKey::Issue).unwrap().is_invalid());
        assert_eq!(form.focused(), Some(FieldKey::Issue));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![FormNotification::ErrorCleared(FieldKey::Issue)]
        );
    }

    #[test]
    fn test_blur_regroups_evaluation() {
        let mut form = filled_form();
        let seen = recorder(&mut form);

        form.dispatch(FormEvent::Blur(FieldKey::ItemEvaluation(0)));

        assert_eq!(
            form.field(FieldKey::ItemEvaluation(0)).unwrap().value(),
            "15 000"
        );
        assert_eq!(
            *seen.lock().unwrap(),
            vec![FormNotification::Reformatted {
                key: FieldKey::ItemEvaluation(0),
                value: "15 000".into()
            }]
        );

        // Already grouped: no rewrite, no notification
        form.dispatch(FormEvent::Blur(FieldKey::ItemEvaluation(0)));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_blur_leaves_other_fields_alone() {
        let mut form = filled_form();
        form.dispatch(FormEvent::Input(FieldKey::Department, "38 5".into()));
        form.dispatch(FormEvent::Blur(FieldKey::Department));
        assert_eq!(form.field(FieldKey::Department).unwrap().value(), "38 5");
    }

    #[test]
    fn test_subscribers_see_invalid_and_focus() {
        let mut form = filled_form();
        form.dispatch(FormEvent::Input(FieldKey::Issue, "".into()));
        let seen = recorder(&mut form);

        form.dispatch(FormEvent::Submit);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                FormNotification::Invalid {
                    key: FieldKey::Issue,
                    message: "this field is required.".into()
                },
                FormNotification::Focused(FieldKey::Issue),
            ]
        );
    }

    #[test]
    fn test_unsubscribe() {
        let mut form = ReportForm::new();
        let seen = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&seen);
        let id = form.subscribe(move |_| *sink.lock().unwrap() += 1);

        assert!(form.unsubscribe(id));
        assert!(!form.unsubscribe(id));
        form.dispatch(FormEvent::Submit);
        assert_eq!(*seen.lock().unwrap(), 0);
    }

    #[test]
    fn test_forms_are_independent() {
        let mut a = ReportForm::new();
        let b = ReportForm::new();
        a.validate_form();
        assert!(a.first_invalid().is_some());
        assert!(b.first_invalid().is_none());
    }

    #[test]
    fn test_unknown_item_is_ignored() {
        let mut form = ReportForm::new();
        assert_eq!(
            form.dispatch(FormEvent::Input(FieldKey::ItemDescription(5), "x".into())),
            None
        );
        assert_eq!(form.item_count(), 1);
    }

    #[test]
    fn test_form_without_items_validates_scalars_only() {
        let mut form = filled_form();
        assert!(form.remove_item(0));
        assert!(!form.remove_item(0));
        assert!(form.validate_form());
    }

    #[test]
    fn test_from_payload_roundtrips_values() {
        let payload = filled_form().to_payload();
        let form = ReportForm::from_payload(&payload);
        assert_eq!(form.to_payload(), payload);
    }

    #[test]
    fn test_photo_urls_survive_validation() {
        let mut payload = filled_form().to_payload();
        payload.items[0] = payload.items[0].clone().with_photo("photos/ring.jpg");

        let mut form = ReportForm::from_payload(&payload);
        let Some(SubmitDecision::Accepted(accepted)) = form.dispatch(FormEvent::Submit) else {
            panic!("expected the form to be accepted");
        };
        assert_eq!(accepted.items[0].photo_url.as_deref(), Some("photos/ring.jpg"));
    }
}
