use serde::{Deserialize, Serialize};

/// Values a host may pre-seed when handing an inline flow over to a modal one.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InitialData {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub service_id: Option<String>,
    #[serde(default)]
    pub professional_id: Option<String>,
}

/// A batch of field edits, applied in declaration order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionEdit {
    #[serde(default)]
    pub service_id: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub professional_id: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
}

impl SessionEdit {
    pub fn is_empty(&self) -> bool {
        self.service_id.is_none()
            && self.date.is_none()
            && self.time.is_none()
            && self.professional_id.is_none()
            && self.customer_name.is_none()
            && self.customer_email.is_none()
    }
}

/// Selection state carried across the steps of one running flow.
///
/// Every field edit clears `form_error`. An empty string means "unset".
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BookingSession {
    selected_service_id: String,
    selected_date: String,
    selected_time: String,
    selected_professional_id: String,
    customer_name: String,
    customer_email: String,
    current_step: usize,
    form_error: Option<String>,
}

impl BookingSession {
    pub fn new(initial_step: usize, initial: &InitialData) -> Self {
        Self {
            selected_service_id: initial.service_id.clone().unwrap_or_default(),
            selected_date: initial.date.clone().unwrap_or_default(),
            selected_time: initial.time.clone().unwrap_or_default(),
            selected_professional_id: initial.professional_id.clone().unwrap_or_default(),
            customer_name: String::new(),
            customer_email: String::new(),
            current_step: initial_step.max(1),
            form_error: None,
        }
    }

    pub fn selected_service_id(&self) -> &str {
        &self.selected_service_id
    }

    pub fn selected_date(&self) -> &str {
        &self.selected_date
    }

    pub fn selected_time(&self) -> &str {
        &self.selected_time
    }

    pub fn selected_professional_id(&self) -> &str {
        &self.selected_professional_id
    }

    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    pub fn customer_email(&self) -> &str {
        &self.customer_email
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn form_error(&self) -> Option<&str> {
        self.form_error.as_deref()
    }

    pub fn set_service(&mut self, id: impl Into<String>) {
        self.selected_service_id = id.into();
        self.form_error = None;
    }

    pub fn set_date(&mut self, date: impl Into<String>) {
        self.selected_date = date.into();
        self.form_error = None;
    }

    pub fn set_time(&mut self, time: impl Into<String>) {
        self.selected_time = time.into();
        self.form_error = None;
    }

    pub fn set_professional(&mut self, id: impl Into<String>) {
        self.selected_professional_id = id.into();
        self.form_error = None;
    }

    pub fn set_customer_name(&mut self, name: impl Into<String>) {
        self.customer_name = name.into();
        self.form_error = None;
    }

    pub fn set_customer_email(&mut self, email: impl Into<String>) {
        self.customer_email = email.into();
        self.form_error = None;
    }

    pub fn apply(&mut self, edit: SessionEdit) {
        if let Some(v) = edit.service_id {
            self.set_service(v);
        }
        if let Some(v) = edit.date {
            self.set_date(v);
        }
        if let Some(v) = edit.time {
            self.set_time(v);
        }
        if let Some(v) = edit.professional_id {
            self.set_professional(v);
        }
        if let Some(v) = edit.customer_name {
            self.set_customer_name(v);
        }
        if let Some(v) = edit.customer_email {
            self.set_customer_email(v);
        }
    }

    pub(crate) fn clear_service(&mut self) {
        self.selected_service_id.clear();
    }

    pub(crate) fn set_step(&mut self, step: usize) {
        self.current_step = step;
    }

    pub(crate) fn set_error(&mut self, message: impl Into<String>) {
        self.form_error = Some(message.into());
    }

    pub(crate) fn clear_error(&mut self) {
        self.form_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_seeds_initial_data() {
        let initial = InitialData {
            date: Some("2030-01-02".to_string()),
            time: Some("10:00".to_string()),
            service_id: Some("svc1".to_string()),
            professional_id: None,
        };
        let session = BookingSession::new(0, &initial);
        assert_eq!(session.current_step(), 1);
        assert_eq!(session.selected_date(), "2030-01-02");
        assert_eq!(session.selected_time(), "10:00");
        assert_eq!(session.selected_service_id(), "svc1");
        assert_eq!(session.selected_professional_id(), "");
    }

    #[test]
    fn test_edits_clear_form_error() {
        let mut session = BookingSession::new(1, &InitialData::default());
        session.set_error("Please select a time.");
        session.set_time("09:30");
        assert!(session.form_error().is_none());

        session.set_error("Please enter your name and email.");
        session.apply(SessionEdit {
            customer_name: Some("Ana".to_string()),
            ..SessionEdit::default()
        });
        assert!(session.form_error().is_none());
        assert_eq!(session.customer_name(), "Ana");
    }

    #[test]
    fn test_empty_edit_keeps_error() {
        let mut session = BookingSession::new(1, &InitialData::default());
        session.set_error("Please select a date.");
        let edit = SessionEdit::default();
        assert!(edit.is_empty());
        session.apply(edit);
        assert_eq!(session.form_error(), Some("Please select a date."));
    }
}
