use tembea_core::domain::ids::BatchUseRecordId;
use tembea_core::domain::route::RouteBatchDetails;
use tembea_core::domain::route_request::RouteRequestDetails;
use tembea_core::domain::user::User;

use super::{Delivery, Notifier};
use crate::messages::{AttachmentAction, ActionStyle, SlackAttachment, SlackInteractiveMessage};

pub const CONFIRM_ROUTE_USE_CALLBACK: &str = "confirm_route_use";
pub const ROUTE_TAKEN: &str = "taken";
pub const ROUTE_NOT_TAKEN: &str = "not_taken";
pub const ROUTE_STILL_ON_TRIP: &str = "still_on_trip";

const NOT_AVAILABLE: &str = "N/A";

fn driver_name(details: &RouteBatchDetails) -> String {
    details
        .driver
        .as_ref()
        .map(|driver| driver.driver_name.clone())
        .unwrap_or_else(|| NOT_AVAILABLE.to_owned())
}

fn driver_phone(details: &RouteBatchDetails) -> String {
    details
        .driver
        .as_ref()
        .map(|driver| driver.driver_phone_no.clone())
        .unwrap_or_else(|| NOT_AVAILABLE.to_owned())
}

fn cab_reg_number(details: &RouteBatchDetails) -> String {
    details
        .cab
        .as_ref()
        .map(|cab| cab.reg_number.clone())
        .unwrap_or_else(|| NOT_AVAILABLE.to_owned())
}

/// Tells a rider their batch changed, or that it is gone.
pub fn route_update_message(
    details: &RouteBatchDetails,
    deactivated: bool,
) -> SlackInteractiveMessage {
    let address = &details.destination.address;
    if deactivated {
        return SlackInteractiveMessage::new(format!(
            "Sorry, Your route to *{address}* is no longer available :disappointed:"
        ));
    }

    let attachment = SlackAttachment::new("Updated Route Details")
        .color("#3c58d7")
        .field("Take Off Time", details.batch.take_off_label(), true)
        .field("Route Name", details.route.name.clone(), true)
        .field("Destination", address.clone(), true)
        .field("Driver's name", driver_name(details), true)
        .field("Driver's Phone Number", driver_phone(details), true);
    SlackInteractiveMessage::new(format!("Your route to *{address}* has been updated."))
        .attachment(attachment)
}

pub fn route_use_confirmation_message(
    rider: &User,
    details: &RouteBatchDetails,
    record_id: BatchUseRecordId,
) -> SlackInteractiveMessage {
    let value = record_id.to_string();
    let attachment = SlackAttachment::default()
        .callback_id(CONFIRM_ROUTE_USE_CALLBACK)
        .action(AttachmentAction::button(ROUTE_TAKEN, "Yes", value.clone()))
        .action(AttachmentAction::button(ROUTE_STILL_ON_TRIP, "Still on trip", value.clone()))
        .action(AttachmentAction::button(ROUTE_NOT_TAKEN, "No", value).style(ActionStyle::Danger))
        .field("Batch", details.batch.batch.clone(), true)
        .field("Took Off At", details.batch.take_off_label(), true)
        .field("Cab Reg No", cab_reg_number(details), true)
        .field("Driver Name", driver_name(details), true)
        .field("Driver Phone Number", driver_phone(details), true);

    SlackInteractiveMessage::new(format!(
        "Hi! {} Did you take the trip for route {}?",
        rider.mention(),
        details.route.name
    ))
    .attachment(attachment)
}

pub fn take_off_reminder_message(
    rider: &User,
    details: &RouteBatchDetails,
) -> SlackInteractiveMessage {
    let attachment = SlackAttachment::new("*Trip Reminder*")
        .field("Route Name", details.route.name.clone(), true)
        .field("Take Off Time", details.batch.take_off_label(), true);
    SlackInteractiveMessage::new(format!(
        "Hey, {}, this is a reminder of your upcoming trip",
        rider.mention()
    ))
    .attachment(attachment)
}

fn route_request_fields(
    attachment: SlackAttachment,
    request: &RouteRequestDetails,
) -> SlackAttachment {
    let distance = request
        .request
        .distance
        .map(|distance| format!("{distance:.1}km"))
        .unwrap_or_else(|| NOT_AVAILABLE.to_owned());
    attachment
        .field("Fellow", request.fellow.mention(), true)
        .field("Home", request.home.address.clone(), true)
        .field("Bus Stop", request.bus_stop.address.clone(), true)
        .field("Distance", distance, true)
}

fn assigned_route_fields(
    attachment: SlackAttachment,
    details: &RouteBatchDetails,
) -> SlackAttachment {
    attachment
        .field("Route Name", details.display_name(), true)
        .field("Take Off Time", details.batch.take_off_label(), true)
        .field("Route Capacity", details.batch.capacity.to_string(), true)
        .field("Cab Reg No", cab_reg_number(details), true)
        .field("Driver Name", driver_name(details), true)
}

pub fn route_approved_manager_message(
    request: &RouteRequestDetails,
    details: &RouteBatchDetails,
) -> SlackInteractiveMessage {
    let attachment = SlackAttachment::new("Route Request Approved")
        .text(":white_check_mark: The operations team approved this route request")
        .color("#3c58d7");
    let attachment = assigned_route_fields(route_request_fields(attachment, request), details);
    SlackInteractiveMessage::new(format!(
        "Hi, the route request you confirmed for {} has been approved",
        request.fellow.mention()
    ))
    .attachment(attachment)
}

pub fn route_approved_fellow_message(
    request: &RouteRequestDetails,
    details: &RouteBatchDetails,
) -> SlackInteractiveMessage {
    let attachment = SlackAttachment::new("Your Route Request Has Been Approved")
        .text(":white_check_mark: Welcome aboard!")
        .color("#3c58d7");
    let attachment = assigned_route_fields(attachment, details);
    SlackInteractiveMessage::new(format!(
        "Hi {}, your route request has been approved :smiley:",
        request.fellow.mention()
    ))
    .attachment(attachment)
}

impl Notifier {
    /// Notifies every rider of a changed batch. Clearing riders off a deactivated
    /// batch is the caller's job.
    pub async fn notify_route_riders(
        &self,
        riders: &[User],
        details: &RouteBatchDetails,
        deactivated: bool,
    ) -> Vec<Delivery> {
        let message = route_update_message(details, deactivated);
        let mut deliveries = Vec::with_capacity(riders.len());
        for rider in riders {
            deliveries.push(self.send_dm(&rider.slack_id, &message).await);
        }
        deliveries
    }

    pub async fn send_route_use_confirmation(
        &self,
        rider: &User,
        details: &RouteBatchDetails,
        record_id: BatchUseRecordId,
    ) -> Delivery {
        let message = route_use_confirmation_message(rider, details, record_id);
        self.send_dm(&rider.slack_id, &message).await
    }

    pub async fn send_take_off_reminder(
        &self,
        rider: &User,
        details: &RouteBatchDetails,
    ) -> Delivery {
        self.send_dm(&rider.slack_id, &take_off_reminder_message(rider, details)).await
    }

    pub async fn send_route_approval_to_manager(
        &self,
        request: &RouteRequestDetails,
        details: &RouteBatchDetails,
    ) -> Delivery {
        let Some(manager) = request.manager.as_ref() else {
            return Delivery::Failed;
        };
        self.send_dm(&manager.slack_id, &route_approved_manager_message(request, details)).await
    }

    pub async fn send_route_approval_to_fellow(
        &self,
        request: &RouteRequestDetails,
        details: &RouteBatchDetails,
    ) -> Delivery {
        let message = route_approved_fellow_message(request, details);
        self.send_dm(&request.fellow.slack_id, &message).await
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{NaiveTime, Utc};

    use tembea_core::domain::fleet::{Cab, Driver, Provider};
    use tembea_core::domain::ids::{
        AddressId, CabId, DriverId, ProviderId, RouteBatchId, RouteId, RouteRequestId, UserId,
    };
    use tembea_core::domain::location::Address;
    use tembea_core::domain::route::{Route, RouteBatch, RouteBatchDetails};
    use tembea_core::domain::route_request::{RouteRequest, RouteRequestDetails, RouteRequestStatus};
    use tembea_core::domain::user::User;
    use tembea_core::domain::EntityStatus;

    pub fn user(id: i64, slack_id: &str) -> User {
        User {
            id: UserId(id),
            name: format!("User {id}"),
            slack_id: slack_id.to_owned(),
            email: format!("{}@andela.com", slack_id.to_lowercase()),
            phone_no: None,
            default_homebase_id: None,
            route_batch_id: None,
        }
    }

    fn address(id: i64, text: &str) -> Address {
        Address { id: AddressId(id), address: text.to_owned(), latitude: -1.28, longitude: 36.82 }
    }

    pub fn batch_details() -> RouteBatchDetails {
        RouteBatchDetails {
            batch: RouteBatch {
                id: RouteBatchId(7),
                route_id: RouteId(2),
                provider_id: Some(ProviderId(1)),
                cab_id: Some(CabId(3)),
                driver_id: Some(DriverId(4)),
                take_off: NaiveTime::from_hms_opt(17, 30, 0).expect("time"),
                capacity: 4,
                batch: "A".to_owned(),
                status: EntityStatus::Active,
            },
            route: Route {
                id: RouteId(2),
                name: "Ngong".to_owned(),
                image_url: None,
                destination_id: AddressId(1),
            },
            destination: address(1, "Ngong Road"),
            provider: Some(Provider {
                id: ProviderId(1),
                name: "Uber Kenya".to_owned(),
                provider_user_id: UserId(9),
                is_direct_message: true,
                channel_id: None,
            }),
            cab: Some(Cab {
                id: CabId(3),
                reg_number: "KCA 545".to_owned(),
                model: "Toyota Noah".to_owned(),
                capacity: 4,
                provider_id: ProviderId(1),
            }),
            driver: Some(Driver {
                id: DriverId(4),
                driver_name: "James Kamau".to_owned(),
                driver_phone_no: "+254700000001".to_owned(),
                driver_number: "DRV-1".to_owned(),
                email: None,
                provider_id: ProviderId(1),
                user_id: None,
            }),
        }
    }

    pub fn request_details(status: RouteRequestStatus) -> RouteRequestDetails {
        let now = Utc::now();
        RouteRequestDetails {
            request: RouteRequest {
                id: RouteRequestId(5),
                fellow_id: UserId(1),
                manager_id: Some(UserId(2)),
                ops_reviewer_id: Some(UserId(3)),
                home_id: AddressId(10),
                bus_stop_id: AddressId(11),
                route_image_url: None,
                distance: Some(2.5),
                manager_comment: Some("Approved by manager".to_owned()),
                ops_comment: None,
                status,
                created_at: now,
                updated_at: now,
            },
            fellow: user(1, "UFELLOW"),
            manager: Some(user(2, "UMANAGER")),
            ops_reviewer: Some(user(3, "UOPS")),
            home: address(10, "Kilimani"),
            bus_stop: address(11, "Yaya Centre"),
        }
    }
}
