use async_trait::async_trait;

use tembea_slack::blocks::trip_start_message;
use tembea_slack::messages::{
    goodbye_message, text_message, welcome_message, THANK_YOU, WELCOME_CALLBACK,
};
use tembea_slack::{
    HandlerError, HandlerOutcome, InteractionHandler, InteractionPayload, InteractionRouter,
    Responder, RouteKey,
};

pub const BACK_TO_LAUNCH: &str = "back_to_launch";
pub const BOOK_NEW_TRIP: &str = "book_new_trip";
pub const CANCEL: &str = "cancel";

pub fn register(router: &mut InteractionRouter) {
    router.register(RouteKey::callback(WELCOME_CALLBACK), LaunchHandler);
}

/// Buttons on the welcome card.
pub struct LaunchHandler;

#[async_trait]
impl InteractionHandler for LaunchHandler {
    async fn handle(
        &self,
        payload: &InteractionPayload,
        respond: &dyn Responder,
    ) -> Result<HandlerOutcome, HandlerError> {
        let reply = match payload.action_value() {
            Some(BACK_TO_LAUNCH) => welcome_message(),
            Some(CANCEL) => goodbye_message(),
            Some(BOOK_NEW_TRIP) => trip_start_message().into(),
            _ => text_message(THANK_YOU),
        };
        respond.respond(reply).await?;
        Ok(HandlerOutcome::Handled)
    }
}

#[cfg(test)]
mod tests {
    use tembea_slack::messages::{GOODBYE, THANK_YOU};
    use tembea_slack::respond::RecordingResponder;
    use tembea_slack::DispatchOutcome;

    use crate::interactions::test_support::{button, harness};

    #[tokio::test]
    async fn welcome_buttons_pick_their_reply() {
        let harness = harness().await;
        let respond = RecordingResponder::new();

        for value in ["back_to_launch", "cancel", "view_open_trips"] {
            let outcome = harness
                .router
                .dispatch(&button("welcome_message", "U1", "view", value), &respond)
                .await
                .expect("dispatch");
            assert_eq!(outcome, DispatchOutcome::Handled);
        }

        let texts = respond.texts().await;
        assert_eq!(
            texts,
            vec!["Welcome to Tembea!".to_string(), GOODBYE.to_string(), THANK_YOU.to_string()]
        );
    }

    #[tokio::test]
    async fn booking_starts_with_who_the_trip_is_for() {
        let harness = harness().await;
        let respond = RecordingResponder::new();

        harness
            .router
            .dispatch(&button("welcome_message", "U1", "book", "book_new_trip"), &respond)
            .await
            .expect("dispatch");

        let messages = respond.messages().await;
        assert_eq!(messages[0].text, "Who is this trip for?");
        assert!(!messages[0].blocks.is_empty());
    }
}
