//! Booking a trip from the Slack blocks, plus the rider's answers to trip prompts.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::info;

use tembea_core::cache::{trip_booking_key, ConversationCache};
use tembea_core::domain::ids::TripId;
use tembea_core::domain::trip::{NewTrip, TripType};
use tembea_core::validation::{validate_reason, FieldError, Violations};
use tembea_core::TripStatus;
use tembea_slack::blocks::{
    USER_TRIP_CANCEL, USER_TRIP_FOR_ME, USER_TRIP_FOR_SOMEONE, USER_TRIP_START_BLOCK,
};
use tembea_slack::dialog::{trip_details_dialog, DialogElement};
use tembea_slack::messages::{goodbye_message, text_message, THANK_YOU};
use tembea_slack::notifications::trip::{TRIP_COMPLETION_CALLBACK, TRIP_NOT_TAKEN, TRIP_TAKEN};
use tembea_slack::{
    HandlerError, HandlerOutcome, InteractionHandler, InteractionPayload, InteractionRouter,
    Responder, RouteKey,
};

use super::{open_dialog, parse, rejected, team_id, unknown_action};
use crate::state::Services;

pub const VIEW_NEW_TRIP_CALLBACK: &str = "view_new_trip";
pub const VIEW_DONE: &str = "done";
pub const TRIP_DETAILS_CALLBACK: &str = "trip_details";
pub const FOR_ME_FIELD: &str = "forMe";
pub const RIDER_FIELD: &str = "rider";
pub const DATE_TIME_FORMAT: &str = "%d/%m/%y %H:%M";
pub const TRIP_REQUESTED: &str =
    "Your trip request has been submitted. Your manager will review it shortly.";
pub const TRIP_COMPLETED_REPLY: &str = "Thank you for confirming the trip. :smiley:";
pub const TRIP_NOT_TAKEN_REPLY: &str = "Noted. The trip has been marked as not taken.";

const DATE_TIME_INVALID: &str = "Date and time must be in the format dd/mm/yy hh:mm";
const PASSENGERS_INVALID: &str = "Number of passengers must be a number greater than zero";

pub fn register(
    router: &mut InteractionRouter,
    services: &Arc<Services>,
    cache: ConversationCache,
) {
    router.register(RouteKey::callback(VIEW_NEW_TRIP_CALLBACK), ViewTripHandler);
    router.register(
        RouteKey::callback(TRIP_COMPLETION_CALLBACK),
        TripCompletionHandler { services: Arc::clone(services) },
    );
    router.register(
        RouteKey::action(USER_TRIP_START_BLOCK, USER_TRIP_CANCEL),
        CancelBookingHandler { cache: cache.clone() },
    );
    for (action, for_me) in [(USER_TRIP_FOR_ME, true), (USER_TRIP_FOR_SOMEONE, false)] {
        router.register(
            RouteKey::action(USER_TRIP_START_BLOCK, action),
            TripForHandler { services: Arc::clone(services), cache: cache.clone(), for_me },
        );
    }
    router.register(
        RouteKey::callback(TRIP_DETAILS_CALLBACK),
        TripDetailsHandler { services: Arc::clone(services), cache },
    );
}

/// `Done` on the trip summary card.
pub struct ViewTripHandler;

#[async_trait]
impl InteractionHandler for ViewTripHandler {
    async fn handle(
        &self,
        payload: &InteractionPayload,
        respond: &dyn Responder,
    ) -> Result<HandlerOutcome, HandlerError> {
        match payload.action_value() {
            Some(VIEW_DONE) => {
                respond.respond(text_message(THANK_YOU)).await?;
                Ok(HandlerOutcome::Handled)
            }
            other => Err(unknown_action(other)),
        }
    }
}

/// The rider says whether a confirmed trip actually happened.
pub struct TripCompletionHandler {
    services: Arc<Services>,
}

#[async_trait]
impl InteractionHandler for TripCompletionHandler {
    async fn handle(
        &self,
        payload: &InteractionPayload,
        respond: &dyn Responder,
    ) -> Result<HandlerOutcome, HandlerError> {
        let trip_id: TripId = parse(payload.action_value(), "trip id")?;
        let (status, reply) = match payload.action_name() {
            Some(TRIP_TAKEN) => (TripStatus::Completed, TRIP_COMPLETED_REPLY),
            Some(TRIP_NOT_TAKEN) => (TripStatus::Cancelled, TRIP_NOT_TAKEN_REPLY),
            other => return Err(unknown_action(other)),
        };

        let mut trip = self.services.trips.get_by_id(trip_id).await?;
        trip.status = status;
        self.services.trips.update_trip(&trip).await?;
        info!(
            event_name = "trips.completion.answered",
            trip_id = trip.id.0,
            status = %trip.status,
            "rider answered"
        );
        respond.respond(text_message(reply)).await?;
        Ok(HandlerOutcome::Handled)
    }
}

/// `Cancel` on the "who is this trip for" card.
pub struct CancelBookingHandler {
    cache: ConversationCache,
}

#[async_trait]
impl InteractionHandler for CancelBookingHandler {
    async fn handle(
        &self,
        payload: &InteractionPayload,
        respond: &dyn Responder,
    ) -> Result<HandlerOutcome, HandlerError> {
        self.cache.delete(&trip_booking_key(&payload.user.id));
        respond.respond(goodbye_message()).await?;
        Ok(HandlerOutcome::Handled)
    }
}

/// `For Me` / `For Someone`: remember the choice and ask for the trip details.
pub struct TripForHandler {
    services: Arc<Services>,
    cache: ConversationCache,
    for_me: bool,
}

#[async_trait]
impl InteractionHandler for TripForHandler {
    async fn handle(
        &self,
        payload: &InteractionPayload,
        _respond: &dyn Responder,
    ) -> Result<HandlerOutcome, HandlerError> {
        self.cache.save(&trip_booking_key(&payload.user.id), FOR_ME_FIELD, self.for_me);

        let mut dialog = trip_details_dialog(TRIP_DETAILS_CALLBACK, "");
        if !self.for_me {
            let rider =
                DialogElement::text("Rider's Slack ID", RIDER_FIELD).placeholder("@someone");
            dialog = dialog.element(rider);
        }
        open_dialog(&self.services, payload, &dialog).await?;
        Ok(HandlerOutcome::Handled)
    }
}

/// Fields of the trip details dialog once validated.
#[derive(Clone, Debug, PartialEq)]
struct TripDetails {
    departure_time: DateTime<Utc>,
    origin: String,
    destination: String,
    reason: String,
    no_of_passengers: u32,
    rider_slack_id: Option<String>,
}

fn parse_departure(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), DATE_TIME_FORMAT).ok().map(|naive| naive.and_utc())
}

/// `<@U123>`, `@U123` and `U123` all name the same Slack user.
fn slack_mention(raw: &str) -> String {
    raw.trim().trim_start_matches("<@").trim_start_matches('@').trim_end_matches('>').to_string()
}

fn trip_details(
    payload: &InteractionPayload,
    for_me: bool,
    now: DateTime<Utc>,
) -> Result<TripDetails, Vec<FieldError>> {
    let field = |name: &str| payload.submission_value(name).unwrap_or_default();
    let (date_time, origin, destination, reason, passengers) = (
        field("dateTime"),
        field("pickup"),
        field("destination"),
        field("reason"),
        field("noOfPassengers"),
    );
    let departure_time = parse_departure(&date_time);
    let no_of_passengers = passengers.parse::<u32>().ok().filter(|count| *count > 0);
    let rider = payload
        .submission_value(RIDER_FIELD)
        .map(|raw| slack_mention(&raw))
        .filter(|id| !id.is_empty());
    let in_future = departure_time.map_or(true, |time| time > now);

    let mut violations = Violations::new();
    violations
        .check(departure_time.is_some(), "dateTime", DATE_TIME_INVALID)
        .check(in_future, "dateTime", "Date cannot be in the past")
        .require("pickup", &origin)
        .require("destination", &destination)
        .extend(validate_reason("reason", &reason))
        .check(no_of_passengers.is_some(), "noOfPassengers", PASSENGERS_INVALID);
    if !for_me {
        violations.require_some(RIDER_FIELD, rider.as_ref());
    }
    violations.finish()?;

    match (departure_time, no_of_passengers) {
        (Some(departure_time), Some(no_of_passengers)) => Ok(TripDetails {
            departure_time,
            origin,
            destination,
            reason,
            no_of_passengers,
            rider_slack_id: if for_me { None } else { rider },
        }),
        _ => Err(vec![FieldError::new("dateTime", "Invalid trip details")]),
    }
}

/// Stores the trip the dialog describes.
pub struct TripDetailsHandler {
    services: Arc<Services>,
    cache: ConversationCache,
}

#[async_trait]
impl InteractionHandler for TripDetailsHandler {
    async fn handle(
        &self,
        payload: &InteractionPayload,
        respond: &dyn Responder,
    ) -> Result<HandlerOutcome, HandlerError> {
        let key = trip_booking_key(&payload.user.id);
        let for_me = self
            .cache
            .fetch_field(&key, FOR_ME_FIELD)
            .and_then(|value| value.as_bool())
            .unwrap_or(true);
        let details = match trip_details(payload, for_me, Utc::now()) {
            Ok(details) => details,
            Err(errors) => return Ok(rejected(errors)),
        };

        let team_id = team_id(payload);
        let users = &self.services.users;
        let requester = users.find_or_create_by_slack_id(&payload.user.id, team_id).await?;
        let rider = match details.rider_slack_id.as_deref() {
            Some(slack_id) => users.find_or_create_by_slack_id(slack_id, team_id).await?,
            None => requester.clone(),
        };
        let trip = self
            .services
            .trips
            .create_trip(NewTrip {
                name: format!("From {} to {}", details.origin, details.destination),
                rider_id: rider.id,
                requested_by_id: requester.id,
                origin: details.origin,
                destination: details.destination,
                departure_time: details.departure_time,
                trip_type: TripType::Regular,
                no_of_passengers: details.no_of_passengers,
                reason: Some(details.reason),
                provider_id: None,
            })
            .await?;
        self.cache.save(&key, "tripId", Value::from(trip.id.0));
        respond.respond(text_message(TRIP_REQUESTED)).await?;
        Ok(HandlerOutcome::Handled)
    }
}
