use tembea_core::domain::trip::Trip;
use tembea_core::domain::user::User;

use super::{Delivery, Notifier};
use crate::messages::{
    format_trip_date, trip_info_attachment, ActionStyle, AttachmentAction, SlackAttachment,
    SlackInteractiveMessage,
};

pub const TRIP_COMPLETION_CALLBACK: &str = "trip_completion";
pub const TRIP_TAKEN: &str = "trip_taken";
pub const TRIP_NOT_TAKEN: &str = "trip_not_taken";

pub fn trip_approved_message(
    trip: &Trip,
    rider: &User,
    requester: &User,
    manager: &User,
) -> SlackInteractiveMessage {
    let mut info = trip_info_attachment(trip, rider, requester);
    if let Some(comment) = trip.manager_comment.as_deref() {
        info = info.field("Manager's Comment", comment, false);
    }
    SlackInteractiveMessage::new(format!(
        "Hi {}, {} has approved your trip request :white_check_mark:",
        requester.mention(),
        manager.mention()
    ))
    .attachment(info)
}

pub fn trip_declined_message(
    trip: &Trip,
    rider: &User,
    requester: &User,
    manager: &User,
) -> SlackInteractiveMessage {
    let mut info = trip_info_attachment(trip, rider, requester).color("#ff0000");
    if let Some(comment) = trip.manager_comment.as_deref() {
        info = info.field("Reason", comment, false);
    }
    SlackInteractiveMessage::new(format!(
        "Hi {}, {} has declined your trip request :x:",
        requester.mention(),
        manager.mention()
    ))
    .attachment(info)
}

/// Sent to the rider some hours after departure.
pub fn trip_completion_prompt(trip: &Trip, rider: &User) -> SlackInteractiveMessage {
    let value = trip.id.to_string();
    let attachment = SlackAttachment::new(trip.name.clone())
        .callback_id(TRIP_COMPLETION_CALLBACK)
        .field("Departure Time", format_trip_date(trip.departure_time), true)
        .field("Destination", trip.destination.clone(), true)
        .action(
            AttachmentAction::button(TRIP_TAKEN, "Yes", value.clone()).style(ActionStyle::Primary),
        )
        .action(AttachmentAction::button(TRIP_NOT_TAKEN, "No", value).style(ActionStyle::Danger));
    SlackInteractiveMessage::new(format!("Hi {}, did you take this trip?", rider.mention()))
        .attachment(attachment)
}

pub fn trip_reminder_message(trip: &Trip, rider: &User) -> SlackInteractiveMessage {
    let attachment = SlackAttachment::new("*Trip Reminder*")
        .field("Pickup Location", trip.origin.clone(), true)
        .field("Destination", trip.destination.clone(), true)
        .field("Departure Time", format_trip_date(trip.departure_time), true);
    SlackInteractiveMessage::new(format!(
        "Hey, {}, this is a reminder of your upcoming trip",
        rider.mention()
    ))
    .attachment(attachment)
}

impl Notifier {
    pub async fn send_trip_decision(
        &self,
        trip: &Trip,
        rider: &User,
        requester: &User,
        manager: &User,
        approved: bool,
    ) -> Delivery {
        let message = if approved {
            trip_approved_message(trip, rider, requester, manager)
        } else {
            trip_declined_message(trip, rider, requester, manager)
        };
        self.send_dm(&requester.slack_id, &message).await
    }

    pub async fn send_trip_completion_prompt(&self, trip: &Trip, rider: &User) -> Delivery {
        self.send_dm(&rider.slack_id, &trip_completion_prompt(trip, rider)).await
    }

    pub async fn send_trip_reminder(&self, trip: &Trip, rider: &User) -> Delivery {
        self.send_dm(&rider.slack_id, &trip_reminder_message(trip, rider)).await
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{TimeZone, Utc};

    use tembea_core::domain::ids::{TripId, UserId};
    use tembea_core::domain::trip::{Trip, TripStatus, TripType};

    pub fn trip(status: TripStatus) -> Trip {
        Trip {
            id: TripId(12),
            name: "From Epic Tower to JKIA".to_owned(),
            rider_id: UserId(1),
            requested_by_id: UserId(2),
            origin: "Epic Tower".to_owned(),
            destination: "JKIA".to_owned(),
            departure_time: Utc.with_ymd_and_hms(2019, 4, 3, 14, 30, 0).unwrap(),
            trip_type: TripType::Airport,
            no_of_passengers: 1,
            reason: Some("Conference".to_owned()),
            status,
            provider_id: None,
            cab_id: None,
            driver_id: None,
            approved_by_id: None,
            manager_comment: Some("Safe travels".to_owned()),
            operations_comment: None,
            created_at: Utc.with_ymd_and_hms(2019, 4, 1, 9, 0, 0).unwrap(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use secrecy::SecretString;

    use tembea_core::domain::trip::TripStatus;

    use super::fixtures::trip;
    use super::{trip_completion_prompt, trip_declined_message, TRIP_COMPLETION_CALLBACK};
    use crate::client::RecordingSlackApi;
    use crate::notifications::route::fixtures::user;
    use crate::notifications::{Delivery, Notifier};

    #[test]
    fn decline_names_the_manager_and_reason() {
        let message = trip_declined_message(
            &trip(TripStatus::DeclinedByManager),
            &user(1, "URIDER"),
            &user(2, "UREQUESTER"),
            &user(3, "UMANAGER"),
        );

        assert_eq!(
            message.text,
            "Hi <@UREQUESTER>, <@UMANAGER> has declined your trip request :x:"
        );
        let reason = message.attachments[0].fields.last().expect("reason field");
        assert_eq!((reason.title.as_str(), reason.value.as_str()), ("Reason", "Safe travels"));
    }

    #[test]
    fn completion_prompt_carries_the_trip_id() {
        let message = trip_completion_prompt(&trip(TripStatus::Confirmed), &user(1, "URIDER"));
        let attachment = &message.attachments[0];

        assert_eq!(attachment.callback_id.as_deref(), Some(TRIP_COMPLETION_CALLBACK));
        assert!(attachment.actions.iter().all(|action| action.value.as_deref() == Some("12")));
        assert_eq!(attachment.fields[0].value, "Wed, Apr 3 2019 14:30");
    }

    #[tokio::test]
    async fn decision_goes_to_the_requester() {
        let api = Arc::new(RecordingSlackApi::new());
        let notifier = Notifier::new(api.clone(), SecretString::from("xoxb-test".to_owned()));

        let delivery = notifier
            .send_trip_decision(
                &trip(TripStatus::Approved),
                &user(1, "URIDER"),
                &user(2, "UREQUESTER"),
                &user(3, "UMANAGER"),
                true,
            )
            .await;

        assert_eq!(delivery, Delivery::Sent);
        assert_eq!(api.posted_messages().await[0].0, "DUREQUESTER");
    }
}
