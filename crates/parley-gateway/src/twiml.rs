//! TwiML messaging envelope: `<Response><Message>…</Message></Response>`.

use axum::{
    http::header,
    response::{IntoResponse, Response},
};

/// A TwiML reply carrying one outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagingResponse {
    message: String,
}

impl MessagingResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn to_xml(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><Response><Message>{}</Message></Response>"#,
            escape_xml(&self.message)
        )
    }
}

impl IntoResponse for MessagingResponse {
    fn into_response(self) -> Response {
        (
            [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
            self.to_xml(),
        )
            .into_response()
    }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_message_in_envelope() {
        let xml = MessagingResponse::new("Olá!").to_xml();
        assert_eq!(
            xml,
            r#"<?xml version="1.0" encoding="UTF-8"?><Response><Message>Olá!</Message></Response>"#
        );
    }

    #[test]
    fn escapes_markup_characters() {
        let xml = MessagingResponse::new(r#"a < b & "c" > 'd'"#).to_xml();
        assert!(xml.contains(
            "<Message>a &lt; b &amp; &quot;c&quot; &gt; &apos;d&apos;</Message>"
        ));
    }

    #[test]
    fn keeps_newlines() {
        let xml = MessagingResponse::new("line 1\nline 2").to_xml();
        assert!(xml.contains("<Message>line 1\nline 2</Message>"));
    }
}
