//! Prompt templates with a history slot and a new-message slot.
//!
//! The template is split once at parse time, so `build` is plain
//! concatenation: substituted text is never scanned for placeholders and
//! nothing is escaped or truncated.

/// Placeholder replaced by the assembled conversation history.
pub const HISTORY_SLOT: &str = "{history}";
/// Placeholder replaced by the inbound message.
pub const MESSAGE_SLOT: &str = "{message}";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template is missing the {0} placeholder")]
    Missing(&'static str),

    #[error("template uses the {placeholder} placeholder {count} times, expected once")]
    Repeated {
        placeholder: &'static str,
        count: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    History,
    Message,
}

/// Instruction text with exactly one `{history}` and one `{message}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    head: String,
    first: Slot,
    middle: String,
    second: Slot,
    tail: String,
}

impl PromptTemplate {
    pub fn parse(text: &str) -> Result<Self, TemplateError> {
        let history_at = locate_once(text, HISTORY_SLOT)?;
        let message_at = locate_once(text, MESSAGE_SLOT)?;

        let (first, first_at, first_len, second, second_at, second_len) =
            if history_at < message_at {
                (
                    Slot::History,
                    history_at,
                    HISTORY_SLOT.len(),
                    Slot::Message,
                    message_at,
                    MESSAGE_SLOT.len(),
                )
            } else {
                (
                    Slot::Message,
                    message_at,
                    MESSAGE_SLOT.len(),
                    Slot::History,
                    history_at,
                    HISTORY_SLOT.len(),
                )
            };

        Ok(Self {
            head: text[..first_at].to_string(),
            first,
            middle: text[first_at + first_len..second_at].to_string(),
            second,
            tail: text[second_at + second_len..].to_string(),
        })
    }

    /// Interpolate `history` and `message` into the template.
    pub fn build(&self, history: &str, message: &str) -> String {
        let fill = |slot: Slot| match slot {
            Slot::History => history,
            Slot::Message => message,
        };
        let mut out = String::with_capacity(
            self.head.len() + self.middle.len() + self.tail.len() + history.len() + message.len(),
        );
        out.push_str(&self.head);
        out.push_str(fill(self.first));
        out.push_str(&self.middle);
        out.push_str(fill(self.second));
        out.push_str(&self.tail);
        out
    }
}

fn locate_once(text: &str, placeholder: &'static str) -> Result<usize, TemplateError> {
    let count = text.matches(placeholder).count();
    match count {
        0 => Err(TemplateError::Missing(placeholder)),
        1 => Ok(text.find(placeholder).unwrap_or_default()),
        count => Err(TemplateError::Repeated { placeholder, count }),
    }
}
