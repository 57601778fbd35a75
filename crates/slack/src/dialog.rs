use serde::{Deserialize, Serialize};

use tembea_core::validation::FieldError;

pub const REASON_MAX_LENGTH: usize = 100;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DialogOption {
    pub label: String,
    pub value: String,
}

impl DialogOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self { label: label.into(), value: value.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DialogElement {
    Text {
        label: String,
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        placeholder: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        hint: Option<String>,
        optional: bool,
    },
    Textarea {
        label: String,
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        placeholder: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
        optional: bool,
    },
    Select {
        label: String,
        name: String,
        options: Vec<DialogOption>,
        optional: bool,
    },
}

impl DialogElement {
    pub fn text(label: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Text {
            label: label.into(),
            name: name.into(),
            placeholder: None,
            hint: None,
            optional: false,
        }
    }

    pub fn textarea(label: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Textarea {
            label: label.into(),
            name: name.into(),
            placeholder: None,
            max_length: None,
            optional: false,
        }
    }

    pub fn select(
        label: impl Into<String>,
        name: impl Into<String>,
        options: Vec<DialogOption>,
    ) -> Self {
        Self::Select { label: label.into(), name: name.into(), options, optional: false }
    }

    pub fn placeholder(mut self, text: impl Into<String>) -> Self {
        match &mut self {
            Self::Text { placeholder, .. } | Self::Textarea { placeholder, .. } => {
                *placeholder = Some(text.into());
            }
            Self::Select { .. } => {}
        }
        self
    }

    pub fn hint(mut self, text: impl Into<String>) -> Self {
        if let Self::Text { hint, .. } = &mut self {
            *hint = Some(text.into());
        }
        self
    }

    pub fn max_length(mut self, length: usize) -> Self {
        if let Self::Textarea { max_length, .. } = &mut self {
            *max_length = Some(length);
        }
        self
    }

    pub fn optional(mut self) -> Self {
        match &mut self {
            Self::Text { optional, .. }
            | Self::Textarea { optional, .. }
            | Self::Select { optional, .. } => *optional = true,
        }
        self
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Text { name, .. } | Self::Textarea { name, .. } | Self::Select { name, .. } => {
                name
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SlackDialog {
    pub callback_id: String,
    pub title: String,
    pub submit_label: String,
    pub notify_on_cancel: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub elements: Vec<DialogElement>,
}

impl SlackDialog {
    pub fn new(
        callback_id: impl Into<String>,
        title: impl Into<String>,
        submit_label: impl Into<String>,
    ) -> Self {
        Self {
            callback_id: callback_id.into(),
            title: title.into(),
            submit_label: submit_label.into(),
            notify_on_cancel: false,
            state: None,
            elements: Vec::new(),
        }
    }

    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn element(mut self, element: DialogElement) -> Self {
        self.elements.push(element);
        self
    }
}

/// A per-field error shown under the dialog input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogError {
    pub name: String,
    pub error: String,
}

impl DialogError {
    pub fn new(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self { name: name.into(), error: error.into() }
    }
}

impl From<FieldError> for DialogError {
    fn from(error: FieldError) -> Self {
        Self { name: error.field, error: error.message }
    }
}

/// Body returned to Slack when a dialog submission is rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DialogErrorResponse {
    pub errors: Vec<DialogError>,
}

/// Single free-text reason, used by manager and operations approve/decline flows.
pub fn reason_dialog(
    callback_id: &str,
    state: &str,
    title: &str,
    submit_label: &str,
    field_name: &str,
) -> SlackDialog {
    SlackDialog::new(callback_id, title, submit_label).state(state).element(
        DialogElement::textarea("Reason", field_name)
            .placeholder(format!("Enter reason for {}", title.to_lowercase()))
            .max_length(REASON_MAX_LENGTH),
    )
}

pub fn route_approval_dialog(
    callback_id: &str,
    state: &str,
    providers: Vec<DialogOption>,
) -> SlackDialog {
    SlackDialog::new(callback_id, "Approve Route Request", "Approve")
        .state(state)
        .element(
            DialogElement::text("Route name", "routeName")
                .placeholder("Enter a name for the route"),
        )
        .element(DialogElement::text("Route capacity", "routeCapacity").placeholder("e.g 4"))
        .element(
            DialogElement::text("Take-off time", "takeOffTime")
                .placeholder("hh:mm")
                .hint("24 hour clock, e.g 17:30"),
        )
        .element(DialogElement::select("Provider", "provider", providers))
}

pub fn cab_and_driver_dialog(
    callback_id: &str,
    state: &str,
    cabs: Vec<DialogOption>,
    drivers: Vec<DialogOption>,
) -> SlackDialog {
    SlackDialog::new(callback_id, "Assign cab and driver", "Submit")
        .state(state)
        .element(DialogElement::select("Select A Driver", "driver", drivers))
        .element(DialogElement::select("Select A Cab", "cab", cabs))
}

pub fn trip_details_dialog(callback_id: &str, state: &str) -> SlackDialog {
    SlackDialog::new(callback_id, "Trip Details", "Submit")
        .state(state)
        .element(DialogElement::text("Date and Time", "dateTime").placeholder("dd/mm/yy hh:mm"))
        .element(DialogElement::text("Pickup location", "pickup"))
        .element(DialogElement::text("Destination", "destination"))
        .element(DialogElement::textarea("Reason", "reason").max_length(REASON_MAX_LENGTH))
        .element(DialogElement::text("Number of passengers", "noOfPassengers").placeholder("1"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use tembea_core::validation::FieldError;

    use super::{
        reason_dialog, route_approval_dialog, DialogError, DialogErrorResponse, DialogOption,
    };

    #[test]
    fn reason_dialog_carries_state_and_bounded_textarea() {
        let dialog = reason_dialog(
            "operations_route_declinedRequest",
            "{\"routeRequestId\":\"4\"}",
            "Decline",
            "Decline",
            "declineReason",
        );
        let value = serde_json::to_value(&dialog).expect("serialize");

        assert_eq!(value["callback_id"], "operations_route_declinedRequest");
        assert_eq!(value["state"], "{\"routeRequestId\":\"4\"}");
        assert_eq!(value["elements"][0]["type"], "textarea");
        assert_eq!(value["elements"][0]["name"], "declineReason");
        assert_eq!(value["elements"][0]["max_length"], 100);
    }

    #[test]
    fn route_approval_dialog_lists_providers() {
        let dialog = route_approval_dialog(
            "operations_route_approvedRequest",
            "{}",
            vec![DialogOption::new("Uber Kenya", "1")],
        );
        let names: Vec<_> = dialog.elements.iter().map(|element| element.name()).collect();
        assert_eq!(names, vec!["routeName", "routeCapacity", "takeOffTime", "provider"]);
    }

    #[test]
    fn field_errors_become_dialog_errors() {
        let response = DialogErrorResponse {
            errors: vec![FieldError::new("declineReason", "This field cannot be empty").into()],
        };
        assert_eq!(
            serde_json::to_value(&response).expect("serialize"),
            json!({
                "errors": [{ "name": "declineReason", "error": "This field cannot be empty" }]
            })
        );
        assert_eq!(
            response.errors[0],
            DialogError::new("declineReason", "This field cannot be empty")
        );
    }
}
