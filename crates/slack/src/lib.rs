//! Slack Integration - interactive bot interface
//!
//! This crate provides the Slack side of Tembea:
//! - **Payloads** (`payload`) - incoming interactions posted to `/slack/actions`
//! - **Router** (`router`) - routes actions and dialog submissions to handlers
//! - **Messages** (`messages`, `blocks`, `dialog`) - attachments, Block Kit and dialogs
//! - **Web API** (`client`) - `chat.postMessage`, `dialog.open` and friends
//! - **Notifications** (`notifications`) - best-effort DMs and channel posts
//! - **Signatures** (`signature`) - `X-Slack-Signature` verification
//!
//! # Architecture
//!
//! ```text
//! Slack → /slack/actions → InteractionRouter → Handlers → Services → DB
//!                                 ↓
//!                Responder (response_url) ← SlackInteractiveMessage
//! ```
//!
//! # Key Types
//!
//! - `InteractionRouter` - typed-key lookup table of interaction handlers
//! - `SlackWebApi` - Web API seam; `HttpSlackClient` in production
//! - `Notifier` - composes and sends notifications with one team's token

pub mod blocks;
pub mod client;
pub mod dialog;
pub mod messages;
pub mod notifications;
pub mod payload;
pub mod respond;
pub mod router;
pub mod signature;

pub use client::{HttpSlackClient, SlackApiError, SlackWebApi};
pub use messages::SlackInteractiveMessage;
pub use notifications::{Delivery, Notifier};
pub use payload::InteractionPayload;
pub use respond::{Responder, ResponseUrlResponder};
pub use router::{
    DispatchOutcome, HandlerError, HandlerOutcome, InteractionHandler, InteractionRouter, RouteKey,
};
pub use signature::SignatureVerifier;
