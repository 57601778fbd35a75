//! Legacy interactive messages: text plus attachments carrying fields and actions.
//!
//! Most of Tembea's conversation still runs on attachments, so this is the shape
//! every handler responds with. Block Kit content rides along in `blocks`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tembea_core::domain::trip::Trip;
use tembea_core::domain::user::User;

use crate::blocks::Block;

pub const GOODBYE: &str = "Thank you for using Tembea. See you again.";
pub const THANK_YOU: &str = "Thank you for using Tembea";
pub const UNABLE_TO_DO_THAT: &str = "Error:bangbang:: I was unable to do that.";
pub const SOMETHING_WENT_WRONG: &str = "Error:bangbang:: Something went wrong! Please try again.";
pub const UNSUCCESSFUL_REQUEST: &str = "Unsuccessful request. Kindly Try again";
pub const COULD_NOT_APPROVE: &str =
    "Error:bangbang: : This request could not be approved. Consult the administrator";
pub const COULD_NOT_COMPLETE: &str =
    "Error:bangbang: : We could not complete this process please try again.";
pub const TRIP_ALREADY_CANCELLED: &str = "The trip request has already been cancelled.";
pub const ASSIGNED_TO_ANOTHER_PROVIDER: &str =
    ":x: This trip has been assigned to another provider";

pub const WELCOME_CALLBACK: &str = "welcome_message";
pub const TRIP_DATE_FORMAT: &str = "%a, %b %-d %Y %H:%M";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    Ephemeral,
    InChannel,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SlackInteractiveMessage {
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<SlackAttachment>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_type: Option<ResponseType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replace_original: Option<bool>,
}

impl SlackInteractiveMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Self::default() }
    }

    pub fn attachment(mut self, attachment: SlackAttachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn attachments(mut self, attachments: Vec<SlackAttachment>) -> Self {
        self.attachments.extend(attachments);
        self
    }

    pub fn blocks(mut self, blocks: Vec<Block>) -> Self {
        self.blocks = blocks;
        self
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }

    pub fn replace_original(mut self, replace: bool) -> Self {
        self.replace_original = Some(replace);
        self
    }

    /// Every action across attachments, in display order.
    pub fn actions(&self) -> impl Iterator<Item = &AttachmentAction> {
        self.attachments.iter().flat_map(|attachment| attachment.actions.iter())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AttachmentField {
    pub title: String,
    pub value: String,
    pub short: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Button,
    Select,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStyle {
    Default,
    Primary,
    Danger,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub text: String,
    pub value: String,
}

impl SelectOption {
    pub fn new(text: impl Into<String>, value: impl Into<String>) -> Self {
        Self { text: text.into(), value: value.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActionConfirm {
    pub title: String,
    pub text: String,
    pub ok_text: String,
    pub dismiss_text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AttachmentAction {
    pub name: String,
    pub text: String,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<ActionStyle>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirm: Option<ActionConfirm>,
}

impl AttachmentAction {
    pub fn button(
        name: impl Into<String>,
        text: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            action_type: ActionType::Button,
            value: Some(value.into()),
            style: Some(ActionStyle::Default),
            options: Vec::new(),
            confirm: None,
        }
    }

    pub fn select(
        name: impl Into<String>,
        text: impl Into<String>,
        options: Vec<SelectOption>,
    ) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            action_type: ActionType::Select,
            value: None,
            style: None,
            options,
            confirm: None,
        }
    }

    pub fn cancel() -> Self {
        Self::button("cancel", "Cancel", "cancel")
            .style(ActionStyle::Danger)
            .confirm(ActionConfirm {
                title: "Are you sure?".to_owned(),
                text: "Do you really want to cancel".to_owned(),
                ok_text: "Yes".to_owned(),
                dismiss_text: "No".to_owned(),
            })
    }

    pub fn style(mut self, style: ActionStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn confirm(mut self, confirm: ActionConfirm) -> Self {
        self.confirm = Some(confirm);
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SlackAttachment {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<AttachmentField>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<AttachmentAction>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mrkdwn_in: Vec<String>,
}

impl SlackAttachment {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into(), mrkdwn_in: vec!["text".to_owned()], ..Self::default() }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn callback_id(mut self, callback_id: impl Into<String>) -> Self {
        self.callback_id = Some(callback_id.into());
        self.attachment_type.get_or_insert_with(|| "default".to_owned());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author_name = Some(author.into());
        self
    }

    pub fn image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn field(
        mut self,
        title: impl Into<String>,
        value: impl Into<String>,
        short: bool,
    ) -> Self {
        self.fields.push(AttachmentField { title: title.into(), value: value.into(), short });
        self
    }

    pub fn action(mut self, action: AttachmentAction) -> Self {
        self.actions.push(action);
        self
    }
}

pub fn welcome_message() -> SlackInteractiveMessage {
    let attachment = SlackAttachment::new("I am your trip operations assistant at Andela")
        .text("What would you like to do today?")
        .author("Tembea")
        .fallback("/fallback")
        .color("#3AA3E3")
        .callback_id(WELCOME_CALLBACK)
        .action(AttachmentAction::button("book", "Schedule a Trip", "book_new_trip"))
        .action(AttachmentAction::button("view", "See Trip Itinerary", "view_open_trips"))
        .action(AttachmentAction::button("view", "See Available Routes", "view_available_routes"))
        .action(AttachmentAction::cancel());

    SlackInteractiveMessage::new("Welcome to Tembea!").attachment(attachment)
}

pub fn goodbye_message() -> SlackInteractiveMessage {
    SlackInteractiveMessage::new(GOODBYE)
}

pub fn text_message(text: impl Into<String>) -> SlackInteractiveMessage {
    SlackInteractiveMessage::new(text)
}

/// The standard card describing a trip to managers, operations and providers.
pub fn trip_info_attachment(trip: &Trip, rider: &User, requester: &User) -> SlackAttachment {
    let mut attachment = SlackAttachment::new("Trip Information")
        .color("#3AA3E3")
        .field("Passenger", rider.mention(), true)
        .field("Requested By", requester.mention(), true)
        .field("Pickup Location", trip.origin.clone(), true)
        .field("Destination", trip.destination.clone(), true)
        .field("Departure Time", format_trip_date(trip.departure_time), true)
        .field("Trip Type", trip.trip_type.as_str(), true)
        .field("No. of Passengers", trip.no_of_passengers.to_string(), true);
    if let Some(reason) = trip.reason.as_deref().filter(|reason| !reason.trim().is_empty()) {
        attachment = attachment.field("Reason", reason, false);
    }
    attachment
}

pub fn format_trip_date(instant: DateTime<Utc>) -> String {
    instant.format(TRIP_DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use tembea_core::domain::ids::{TripId, UserId};
    use tembea_core::domain::trip::{Trip, TripStatus, TripType};
    use tembea_core::domain::user::User;

    use super::{trip_info_attachment, welcome_message, ActionType, WELCOME_CALLBACK};

    fn user(id: i64, slack_id: &str) -> User {
        User {
            id: UserId(id),
            name: "Rider".to_owned(),
            slack_id: slack_id.to_owned(),
            email: format!("{slack_id}@andela.com"),
            phone_no: None,
            default_homebase_id: None,
            route_batch_id: None,
        }
    }

    #[test]
    fn welcome_message_offers_four_actions_under_the_welcome_callback() {
        let message = welcome_message();
        assert_eq!(message.text, "Welcome to Tembea!");

        let attachment = &message.attachments[0];
        assert_eq!(attachment.callback_id.as_deref(), Some(WELCOME_CALLBACK));
        assert_eq!(attachment.color.as_deref(), Some("#3AA3E3"));

        let values: Vec<_> = message
            .actions()
            .filter_map(|action| action.value.as_deref())
            .collect();
        assert_eq!(
            values,
            vec!["book_new_trip", "view_open_trips", "view_available_routes", "cancel"]
        );
        assert!(message.actions().all(|action| action.action_type == ActionType::Button));
    }

    #[test]
    fn empty_collections_are_not_serialized() {
        let json = serde_json::to_value(super::goodbye_message()).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({ "text": "Thank you for using Tembea. See you again." })
        );
    }

    #[test]
    fn trip_card_mentions_rider_and_skips_blank_reason() {
        let trip = Trip {
            id: TripId(3),
            name: "From Epic Tower to JKIA".to_owned(),
            rider_id: UserId(1),
            requested_by_id: UserId(2),
            origin: "Epic Tower".to_owned(),
            destination: "JKIA".to_owned(),
            departure_time: Utc.with_ymd_and_hms(2019, 5, 8, 14, 30, 0).single().expect("date"),
            trip_type: TripType::Airport,
            no_of_passengers: 2,
            reason: Some("  ".to_owned()),
            status: TripStatus::Pending,
            provider_id: None,
            cab_id: None,
            driver_id: None,
            approved_by_id: None,
            manager_comment: None,
            operations_comment: None,
            created_at: Utc::now(),
        };

        let card = trip_info_attachment(&trip, &user(1, "URIDER"), &user(2, "UBOOKER"));
        assert_eq!(card.fields[0].value, "<@URIDER>");
        assert_eq!(card.fields[4].value, "Wed, May 8 2019 14:30");
        assert!(card.fields.iter().all(|field| field.title != "Reason"));
    }
}
