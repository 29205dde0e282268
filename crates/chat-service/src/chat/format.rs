//! Server-to-client chat lines.

/// `"<identity> joins the chat"`
pub fn join_notice(identity: &str) -> String {
    format!("{identity} joins the chat")
}

/// `"<identity> leaves the chat"`
pub fn leave_notice(identity: &str) -> String {
    format!("{identity} leaves the chat")
}

/// `"<identity>: <body>"`
pub fn chat_line(identity: &str, body: &str) -> String {
    format!("{identity}: {body}")
}
