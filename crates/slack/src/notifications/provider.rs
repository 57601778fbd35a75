use tembea_core::domain::fleet::{Cab, Driver, Provider};
use tembea_core::domain::route::RouteBatchDetails;
use tembea_core::domain::trip::Trip;
use tembea_core::domain::user::User;

use super::{Delivery, Notifier};
use crate::messages::{
    trip_info_attachment, ActionStyle, AttachmentAction, SelectOption, SlackAttachment,
    SlackInteractiveMessage,
};

pub const PROVIDER_ROUTE_CALLBACK: &str = "provider_actions_route";
pub const PROVIDER_APPROVAL: &str = "provider_approval";
pub const PROVIDER_TRIP_CALLBACK: &str = "provider_actions";
pub const ASSIGN_CAB: &str = "assign-cab";
pub const REASSIGN_DRIVER_CALLBACK: &str = "reassign_driver";
pub const REASSIGN_CAB_CALLBACK: &str = "reassign_cab";

pub const DRIVER_UPDATE_COMPLETE: &str = "Driver update complete. Thank you! :smiley:";
pub const CAB_UPDATE_COMPLETE: &str = "The Cab has been updated successfully! Thank you! :smiley:";

const COMPLETED_COLOR: &str = "#3AAF85";

fn batch_fields(attachment: SlackAttachment, details: &RouteBatchDetails) -> SlackAttachment {
    attachment
        .field("Route", details.display_name(), true)
        .field("Destination", details.destination.address.clone(), true)
        .field("Take Off Time", details.batch.take_off_label(), true)
        .field("Capacity", details.batch.capacity.to_string(), true)
}

fn fleet_fields(attachment: SlackAttachment, cab: &Cab, driver: &Driver) -> SlackAttachment {
    attachment
        .field("Driver Name", driver.driver_name.clone(), true)
        .field("Driver Contact", driver.driver_phone_no.clone(), true)
        .field("Cab Model", cab.model.clone(), true)
        .field("Cab Registration Number", cab.reg_number.clone(), true)
}

/// Asks the provider to staff a newly approved route batch.
pub fn route_assignment_message(
    provider: &Provider,
    details: &RouteBatchDetails,
) -> SlackInteractiveMessage {
    let attachment = SlackAttachment::new("Assign driver and cab")
        .callback_id(PROVIDER_ROUTE_CALLBACK)
        .action(
            AttachmentAction::button(PROVIDER_APPROVAL, "Accept", details.batch.id.to_string())
                .style(ActionStyle::Primary),
        );
    SlackInteractiveMessage::new(format!(
        "A route has been assigned to *{}*, please assign a cab and a driver",
        provider.name
    ))
    .attachment(batch_fields(attachment, details))
}

pub fn trip_assignment_message(
    provider: &Provider,
    provider_slack_id: &str,
    trip: &Trip,
    rider: &User,
    requester: &User,
) -> SlackInteractiveMessage {
    let actions = SlackAttachment::default()
        .callback_id(PROVIDER_TRIP_CALLBACK)
        .action(
            AttachmentAction::button(ASSIGN_CAB, "Accept", trip.id.to_string())
                .style(ActionStyle::Primary),
        );
    SlackInteractiveMessage::new(format!(
        "Hello <@{provider_slack_id}>\nA trip has been assigned to *{}*, \
         please assign a driver and a cab",
        provider.name
    ))
    .attachment(trip_info_attachment(trip, rider, requester))
    .attachment(actions)
}

pub fn trip_completion_update(
    provider: &Provider,
    trip: &Trip,
    rider: &User,
    requester: &User,
    cab: &Cab,
    driver: &Driver,
) -> SlackInteractiveMessage {
    let complete = fleet_fields(
        SlackAttachment::new("Trip request complete").color(COMPLETED_COLOR),
        cab,
        driver,
    );
    SlackInteractiveMessage::new(format!(
        "Thank you *{}* for completing this trip request",
        provider.name
    ))
    .attachment(trip_info_attachment(trip, rider, requester))
    .attachment(complete)
}

pub fn route_completion_update(
    details: &RouteBatchDetails,
    cab: &Cab,
    driver: &Driver,
) -> SlackInteractiveMessage {
    let attachment = fleet_fields(
        batch_fields(
            SlackAttachment::new("Route assignment complete").color(COMPLETED_COLOR),
            details,
        ),
        cab,
        driver,
    );
    SlackInteractiveMessage::new(
        "Thank you for assigning a cab and driver. :smiley: *`This is a recurring trip.`*",
    )
    .attachment(attachment)
}

/// One select per affected batch; the action name is the batch id.
pub fn reassign_driver_message(
    deleted: &Driver,
    batches: &[RouteBatchDetails],
    drivers: &[Driver],
) -> SlackInteractiveMessage {
    let options: Vec<_> = drivers
        .iter()
        .filter(|driver| driver.id != deleted.id)
        .map(|driver| SelectOption::new(driver.driver_name.clone(), driver.id.to_string()))
        .collect();
    let attachments = batches
        .iter()
        .map(|details| {
            let select = AttachmentAction::select(
                details.batch.id.to_string(),
                "Select Driver",
                options.clone(),
            );
            batch_fields(
                SlackAttachment::new("Assign another driver to route")
                    .callback_id(REASSIGN_DRIVER_CALLBACK)
                    .action(select),
                details,
            )
        })
        .collect();
    SlackInteractiveMessage::new(format!(
        "Your driver *{}* has been deleted by the Operations team.:slightly_frowning_face:",
        deleted.driver_name
    ))
    .attachments(attachments)
}

pub fn reassign_cab_message(
    provider: &Provider,
    deleted: &Cab,
    batches: &[RouteBatchDetails],
    cabs: &[Cab],
) -> SlackInteractiveMessage {
    let options: Vec<_> = cabs
        .iter()
        .filter(|cab| cab.id != deleted.id)
        .map(|cab| {
            SelectOption::new(format!("{} - {}", cab.model, cab.reg_number), cab.id.to_string())
        })
        .collect();
    let attachments = batches
        .iter()
        .map(|details| {
            let select = AttachmentAction::select(
                details.batch.id.to_string(),
                "Select Cab",
                options.clone(),
            );
            batch_fields(
                SlackAttachment::new("Please assign another cab")
                    .callback_id(REASSIGN_CAB_CALLBACK)
                    .action(select),
                details,
            )
        })
        .collect();
    SlackInteractiveMessage::new(format!(
        "Hi *{}*, a vehicle of model *{}* and a Registration Number: *{}* \
         has been deleted by Andela Operations team.*",
        provider.name, deleted.model, deleted.reg_number
    ))
    .attachments(attachments)
}

impl Notifier {
    pub async fn send_route_assignment(
        &self,
        provider: &Provider,
        provider_slack_id: &str,
        details: &RouteBatchDetails,
    ) -> Delivery {
        let message = route_assignment_message(provider, details);
        self.send_to_provider(provider, provider_slack_id, &message).await
    }

    pub async fn send_trip_assignment(
        &self,
        provider: &Provider,
        provider_slack_id: &str,
        trip: &Trip,
        rider: &User,
        requester: &User,
    ) -> Delivery {
        let message = trip_assignment_message(provider, provider_slack_id, trip, rider, requester);
        self.send_to_provider(provider, provider_slack_id, &message).await
    }

    pub async fn send_reassign_driver(
        &self,
        provider: &Provider,
        provider_slack_id: &str,
        deleted: &Driver,
        batches: &[RouteBatchDetails],
        drivers: &[Driver],
    ) -> Delivery {
        let message = reassign_driver_message(deleted, batches, drivers);
        self.send_to_provider(provider, provider_slack_id, &message).await
    }

    pub async fn send_reassign_cab(
        &self,
        provider: &Provider,
        provider_slack_id: &str,
        deleted: &Cab,
        batches: &[RouteBatchDetails],
        cabs: &[Cab],
    ) -> Delivery {
        let message = reassign_cab_message(provider, deleted, batches, cabs);
        self.send_to_provider(provider, provider_slack_id, &message).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use secrecy::SecretString;

    use tembea_core::domain::fleet::Driver;
    use tembea_core::domain::ids::{DriverId, ProviderId};

    use super::{reassign_driver_message, route_assignment_message, PROVIDER_ROUTE_CALLBACK};
    use crate::client::RecordingSlackApi;
    use crate::messages::ActionType;
    use crate::notifications::route::fixtures::batch_details;
    use crate::notifications::{Delivery, Notifier};

    fn driver(id: i64, name: &str) -> Driver {
        Driver {
            id: DriverId(id),
            driver_name: name.to_owned(),
            driver_phone_no: format!("+25470000000{id}"),
            driver_number: format!("DRV-{id}"),
            email: None,
            provider_id: ProviderId(1),
            user_id: None,
        }
    }

    #[test]
    fn route_assignment_asks_provider_to_accept_the_batch() {
        let details = batch_details();
        let provider = details.provider.clone().expect("provider");
        let message = route_assignment_message(&provider, &details);

        assert_eq!(
            message.text,
            "A route has been assigned to *Uber Kenya*, please assign a cab and a driver"
        );
        let attachment = &message.attachments[0];
        assert_eq!(attachment.callback_id.as_deref(), Some(PROVIDER_ROUTE_CALLBACK));
        assert_eq!(attachment.actions[0].name, "provider_approval");
        assert_eq!(attachment.actions[0].value.as_deref(), Some("7"));
    }

    #[test]
    fn reassign_driver_offers_remaining_drivers_per_batch() {
        let deleted = driver(4, "James Kamau");
        let drivers = vec![deleted.clone(), driver(5, "Mary Wanjiru")];
        let message = reassign_driver_message(&deleted, &[batch_details()], &drivers);

        assert!(message.text.starts_with("Your driver *James Kamau* has been deleted"));
        let select = &message.attachments[0].actions[0];
        assert_eq!(select.action_type, ActionType::Select);
        assert_eq!(select.name, "7");
        assert_eq!(select.options.len(), 1);
        assert_eq!(select.options[0].value, "5");
    }

    #[tokio::test]
    async fn route_assignment_goes_to_provider_dm() {
        let api = Arc::new(RecordingSlackApi::new());
        let notifier = Notifier::new(api.clone(), SecretString::from("xoxb-test".to_owned()));
        let details = batch_details();
        let provider = details.provider.clone().expect("provider");

        let delivery = notifier.send_route_assignment(&provider, "UPROVIDER", &details).await;

        assert_eq!(delivery, Delivery::Sent);
        assert_eq!(api.posted_messages().await[0].0, "DUPROVIDER");
    }
}
