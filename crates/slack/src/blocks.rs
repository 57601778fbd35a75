use serde::Serialize;

use crate::messages::SlackInteractiveMessage;

pub const USER_TRIP_START_BLOCK: &str = "user_trip_start";
pub const USER_TRIP_FOR_ME: &str = "user_trip_for_me";
pub const USER_TRIP_FOR_SOMEONE: &str = "user_trip_for_someone";
pub const USER_TRIP_CANCEL: &str = "user_trip_cancel";
pub const USER_TRIP_BACK: &str = "user_trip_back";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    #[serde(rename = "plain_text")]
    Plain { text: String },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Danger,
}

/// "Are you sure?" prompt shown before a button's action is sent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConfirmDialog {
    pub title: TextObject,
    pub text: TextObject,
    pub confirm: TextObject,
    pub deny: TextObject,
}

impl ConfirmDialog {
    pub fn new(
        title: impl Into<String>,
        text: impl Into<String>,
        confirm: impl Into<String>,
        deny: impl Into<String>,
    ) -> Self {
        Self {
            title: TextObject::plain(title),
            text: TextObject::mrkdwn(text),
            confirm: TextObject::plain(confirm),
            deny: TextObject::plain(deny),
        }
    }

    pub fn cancel() -> Self {
        Self::new("Are you sure?", "Do you really want to cancel", "Yes", "No")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ButtonElement {
    #[serde(rename = "type")]
    pub element_type: &'static str,
    pub action_id: String,
    pub text: TextObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<ButtonStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirm: Option<ConfirmDialog>,
}

impl ButtonElement {
    pub fn new(action_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            element_type: "button",
            action_id: action_id.into(),
            text: TextObject::plain(label),
            style: None,
            value: None,
            confirm: None,
        }
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn confirm(mut self, confirm: ConfirmDialog) -> Self {
        self.confirm = Some(confirm);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section { block_id: String, text: TextObject },
    Actions { block_id: String, elements: Vec<ButtonElement> },
    Context { block_id: String, elements: Vec<TextObject> },
    Divider,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

impl From<MessageTemplate> for SlackInteractiveMessage {
    fn from(template: MessageTemplate) -> Self {
        SlackInteractiveMessage::new(template.fallback_text).blocks(template.blocks)
    }
}

pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks: Vec::new() }
    }

    pub fn section<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Section { block_id: block_id.into(), text: builder.build() });
        self
    }

    pub fn actions<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ActionsBuilder),
    {
        let mut builder = ActionsBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Actions { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn context<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ContextBuilder),
    {
        let mut builder = ContextBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Context { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn divider(mut self) -> Self {
        self.blocks.push(Block::Divider);
        self
    }

    pub fn block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { fallback_text: self.fallback_text, blocks: self.blocks }
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
}

impl SectionBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> TextObject {
        self.text.unwrap_or_else(|| TextObject::plain(""))
    }
}

#[derive(Default)]
pub struct ActionsBuilder {
    elements: Vec<ButtonElement>,
}

impl ActionsBuilder {
    pub fn button(&mut self, button: ButtonElement) -> &mut Self {
        self.elements.push(button);
        self
    }

    fn build(self) -> Vec<ButtonElement> {
        self.elements
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    elements: Vec<TextObject>,
}

impl ContextBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> Vec<TextObject> {
        self.elements
    }
}

/// `< Back` plus a `Cancel` that asks for confirmation first.
pub fn nav_buttons(back_action_id: &str, back_value: &str) -> Vec<ButtonElement> {
    vec![
        ButtonElement::new(back_action_id, "< Back").value(back_value),
        ButtonElement::new(USER_TRIP_CANCEL, "Cancel")
            .style(ButtonStyle::Danger)
            .value("cancel")
            .confirm(ConfirmDialog::cancel()),
    ]
}

pub fn nav_block(block_id: &str, back_action_id: &str, back_value: &str) -> Block {
    Block::Actions {
        block_id: block_id.to_owned(),
        elements: nav_buttons(back_action_id, back_value),
    }
}

/// First step of booking a trip: is it for the user or someone else?
pub fn trip_start_message() -> MessageTemplate {
    MessageBuilder::new("Who is this trip for?")
        .section("user_trip_start_header", |section| {
            section.mrkdwn("*Who is this trip for?*");
        })
        .divider()
        .actions(USER_TRIP_START_BLOCK, |actions| {
            actions
                .button(
                    ButtonElement::new(USER_TRIP_FOR_ME, "For Me")
                        .style(ButtonStyle::Primary)
                        .value("forMe"),
                )
                .button(
                    ButtonElement::new(USER_TRIP_FOR_SOMEONE, "For Someone").value("forSomeone"),
                )
                .button(
                    ButtonElement::new(USER_TRIP_CANCEL, "Cancel")
                        .style(ButtonStyle::Danger)
                        .value("cancel")
                        .confirm(ConfirmDialog::cancel()),
                );
        })
        .build()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{nav_block, trip_start_message, Block, MessageBuilder, USER_TRIP_START_BLOCK};
    use crate::messages::SlackInteractiveMessage;

    #[test]
    fn nav_block_serializes_back_and_confirmed_cancel() {
        let block = nav_block("trip_nav", "user_trip_back", "back_to_launch");
        let value = serde_json::to_value(&block).expect("serialize");

        assert_eq!(value["type"], "actions");
        assert_eq!(value["block_id"], "trip_nav");
        assert_eq!(value["elements"][0]["text"], json!({ "type": "plain_text", "text": "< Back" }));
        assert_eq!(value["elements"][0]["value"], "back_to_launch");
        assert_eq!(value["elements"][1]["style"], "danger");
        assert_eq!(value["elements"][1]["confirm"]["title"]["text"], "Are you sure?");
        assert_eq!(value["elements"][1]["type"], "button");
    }

    #[test]
    fn divider_is_a_bare_typed_block() {
        let template = MessageBuilder::new("hi").divider().build();
        assert_eq!(template.blocks, vec![Block::Divider]);
        assert_eq!(
            serde_json::to_value(&template.blocks[0]).expect("serialize"),
            json!({ "type": "divider" })
        );
    }

    #[test]
    fn trip_start_message_converts_into_block_message() {
        let message: SlackInteractiveMessage = trip_start_message().into();

        assert_eq!(message.text, "Who is this trip for?");
        let actions = message.blocks.iter().find_map(|block| match block {
            Block::Actions { block_id, elements } if block_id == USER_TRIP_START_BLOCK => {
                Some(elements.len())
            }
            _ => None,
        });
        assert_eq!(actions, Some(3));
    }
}
