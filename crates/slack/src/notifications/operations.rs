use tembea_core::domain::route_request::{RouteRequestDetails, RouteRequestStatus};

use super::{Delivery, Notifier};
use crate::messages::{ActionStyle, AttachmentAction, SlackAttachment, SlackInteractiveMessage};

pub const OPS_ROUTE_CALLBACK: &str = "operations_route_actions";
pub const OPS_APPROVE: &str = "approve";
pub const OPS_DECLINE: &str = "decline";

const APPROVED_COLOR: &str = "#3c58d7";
const DECLINED_COLOR: &str = "#ff0000";

fn request_fields(attachment: SlackAttachment, details: &RouteRequestDetails) -> SlackAttachment {
    let manager = details.manager.as_ref().map(|manager| manager.mention()).unwrap_or_default();
    let distance = details
        .request
        .distance
        .map(|distance| format!("{distance:.1}km"))
        .unwrap_or_else(|| "N/A".to_owned());
    let mut attachment = attachment
        .field("Fellow", details.fellow.mention(), true)
        .field("Manager", manager, true)
        .field("Home", details.home.address.clone(), true)
        .field("Bus Stop", details.bus_stop.address.clone(), true)
        .field("Distance", distance, true);
    if let Some(comment) = details.request.manager_comment.as_deref() {
        attachment = attachment.field("Manager Comment", comment, false);
    }
    if let Some(url) = details.request.route_image_url.as_deref() {
        attachment = attachment.image(url);
    }
    attachment
}

fn reviewer_mention(details: &RouteRequestDetails) -> String {
    details.ops_reviewer.as_ref().map(|reviewer| reviewer.mention()).unwrap_or_default()
}

/// The card posted to the operations channel once a manager confirms a request.
pub fn ops_route_request_message(details: &RouteRequestDetails) -> SlackInteractiveMessage {
    let value = details.request.id.to_string();
    let attachment = SlackAttachment::new("Route Request")
        .callback_id(OPS_ROUTE_CALLBACK)
        .action(
            AttachmentAction::button(OPS_APPROVE, "Approve", value.clone())
                .style(ActionStyle::Primary),
        )
        .action(AttachmentAction::button(OPS_DECLINE, "Decline", value).style(ActionStyle::Danger));
    SlackInteractiveMessage::new(format!(
        "Hey, {} has just requested to join a route.",
        details.fellow.mention()
    ))
    .attachment(request_fields(attachment, details))
}

pub fn ops_approved_update(details: &RouteRequestDetails) -> SlackInteractiveMessage {
    let attachment = SlackAttachment::new("Route Request Approved")
        .text(":white_check_mark: You have approved this route request")
        .color(APPROVED_COLOR);
    SlackInteractiveMessage::new(format!(
        "{} has just approved {}'s route request",
        reviewer_mention(details),
        details.fellow.mention()
    ))
    .attachment(request_fields(attachment, details))
}

pub fn ops_declined_update(details: &RouteRequestDetails) -> SlackInteractiveMessage {
    let attachment = SlackAttachment::new("Route Request Declined")
        .text(format!(":x: {} has declined this route request", reviewer_mention(details)))
        .color(DECLINED_COLOR);
    let mut attachment = request_fields(attachment, details);
    if let Some(comment) = details.request.ops_comment.as_deref() {
        attachment = attachment.field("Reason", comment, false);
    }
    SlackInteractiveMessage::new(format!(
        "{} has just declined {}'s route request",
        reviewer_mention(details),
        details.fellow.mention()
    ))
    .attachment(attachment)
}

/// Completed-state rendering of the ops card. `None` while the request is unprocessed.
pub fn ops_status_update(details: &RouteRequestDetails) -> Option<SlackInteractiveMessage> {
    match details.request.status {
        RouteRequestStatus::Approved => Some(ops_approved_update(details)),
        RouteRequestStatus::Declined => Some(ops_declined_update(details)),
        RouteRequestStatus::Pending | RouteRequestStatus::Confirmed => None,
    }
}

pub fn decline_to_fellow_message(details: &RouteRequestDetails) -> SlackInteractiveMessage {
    let reason = details.request.ops_comment.clone().unwrap_or_default();
    let attachment = SlackAttachment::new("Route Request Declined")
        .color(DECLINED_COLOR)
        .field("Reason", reason, false);
    SlackInteractiveMessage::new(format!(
        "Hi {}, your route request has been declined by the operations team :disappointed:",
        details.fellow.mention()
    ))
    .attachment(request_fields(attachment, details))
}

pub fn decline_to_manager_message(details: &RouteRequestDetails) -> SlackInteractiveMessage {
    let reason = details.request.ops_comment.clone().unwrap_or_default();
    let attachment = SlackAttachment::new("Route Request Declined")
        .color(DECLINED_COLOR)
        .field("Reason", reason, false);
    SlackInteractiveMessage::new(format!(
        "Hi, the route request you confirmed for {} has been declined by the operations team",
        details.fellow.mention()
    ))
    .attachment(request_fields(attachment, details))
}

impl Notifier {
    /// Tells the fellow, then the manager (when there is one), that operations declined.
    pub async fn send_route_decline(&self, details: &RouteRequestDetails) -> Vec<Delivery> {
        let mut deliveries = vec![
            self.send_dm(&details.fellow.slack_id, &decline_to_fellow_message(details)).await,
        ];
        if let Some(manager) = details.manager.as_ref() {
            let message = decline_to_manager_message(details);
            deliveries.push(self.send_dm(&manager.slack_id, &message).await);
        }
        deliveries
    }

    pub async fn send_ops_route_request(
        &self,
        ops_channel: &str,
        details: &RouteRequestDetails,
    ) -> Delivery {
        self.send_to_channel(ops_channel, &ops_route_request_message(details)).await
    }

    /// Rewrites the ops card to its approved or declined state. Also used when an
    /// operator clicks a request somebody else already processed.
    pub async fn update_ops_message(
        &self,
        channel: &str,
        ts: &str,
        details: &RouteRequestDetails,
    ) -> Delivery {
        match ops_status_update(details) {
            Some(message) => self.update(channel, ts, &message).await,
            None => Delivery::Failed,
        }
    }
}
