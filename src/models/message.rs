use serde::{Deserialize, Serialize};

/// Quick-reply text sent back when the entity stays in.
pub const ANSWER_STAYING_IN: &str = "家で食べる";
/// Quick-reply text sent back when the entity eats out.
pub const ANSWER_EATING_OUT: &str = "外で食べる";

/// Outbound message in the messaging API's JSON shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    Text {
        text: String,
    },
    Template {
        #[serde(rename = "altText")]
        alt_text: String,
        template: Template,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Template {
    Confirm { text: String, actions: [Action; 2] },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    Message { label: String, text: String },
}

impl Message {
    pub fn text(text: impl Into<String>) -> Self {
        Message::Text { text: text.into() }
    }

    /// Yes/no prompt whose buttons answer with [`ANSWER_STAYING_IN`] and
    /// [`ANSWER_EATING_OUT`].
    pub fn eat_out_prompt(question: impl Into<String>) -> Self {
        Message::Template {
            alt_text: "this is a confirm template".to_string(),
            template: Template::Confirm {
                text: question.into(),
                actions: [
                    Action::Message {
                        label: ANSWER_STAYING_IN.to_string(),
                        text: ANSWER_STAYING_IN.to_string(),
                    },
                    Action::Message {
                        label: ANSWER_EATING_OUT.to_string(),
                        text: ANSWER_EATING_OUT.to_string(),
                    },
                ],
            },
        }
    }

    /// Plain text of the message, or the prompt question for templates.
    pub fn body(&self) -> &str {
        match self {
            Message::Text { text } => text,
            Message::Template {
                template: Template::Confirm { text, .. },
                ..
            } => text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_message_uses_wire_shape() {
        let value = serde_json::to_value(Message::text("hello")).unwrap();
        assert_eq!(value, json!({"type": "text", "text": "hello"}));
    }

    #[test]
    fn prompt_serializes_as_confirm_template_with_two_actions() {
        let value = serde_json::to_value(Message::eat_out_prompt("今日は外で食べる？")).unwrap();
        assert_eq!(value["type"], "template");
        assert_eq!(value["altText"], "this is a confirm template");
        assert_eq!(value["template"]["type"], "confirm");
        assert_eq!(value["template"]["text"], "今日は外で食べる？");
        let actions = value["template"]["actions"].as_array().unwrap();
        assert_eq!(actions.len(), 2);
        assert_eq!(
            actions[0],
            json!({"type": "message", "label": ANSWER_STAYING_IN, "text": ANSWER_STAYING_IN})
        );
        assert_eq!(actions[1]["text"], ANSWER_EATING_OUT);
    }
}
