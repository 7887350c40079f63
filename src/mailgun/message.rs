//! Outbound message assembly.
//!
//! A [`MessageTemplate`] carries the fields that stay fixed for a handler's
//! lifetime. [`MessageTemplate::build`] classifies the rendered content and
//! produces an immutable [`OutboundMessage`] ready for dispatch.

use thiserror::Error;

use super::content::{BodyKind, classify_content};
use super::url_encoding::form_body;

/// Returned when a recipient list normalizes to nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("at least one recipient address is required")]
pub struct NoRecipients;

/// Ordered, de-duplicated, non-empty list of recipient addresses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecipientSet {
    addresses: Vec<String>,
}

impl RecipientSet {
    /// Normalize `entries` into a recipient set.
    ///
    /// Every entry is one address and is never split, so display names such
    /// as `"Ops, Team" <ops@x.com>` survive intact. Entries are trimmed of
    /// whitespace and stray outer commas, empty entries are dropped and exact
    /// repeats removed, keeping first occurrence order. Address syntax is not
    /// checked. Use [`split_address_list`] to turn a comma-separated string
    /// into entries first.
    ///
    /// # Errors
    ///
    /// Returns [`NoRecipients`] if nothing remains after normalization.
    pub fn new<I, S>(entries: I) -> Result<Self, NoRecipients>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut addresses: Vec<String> = Vec::new();
        for entry in entries {
            let address = entry
                .as_ref()
                .trim_matches(|c: char| c == ',' || c.is_whitespace());
            if !address.is_empty() && !addresses.iter().any(|a| a == address) {
                addresses.push(address.to_owned());
            }
        }
        if addresses.is_empty() {
            return Err(NoRecipients);
        }
        Ok(Self { addresses })
    }

    /// Build a set holding one address.
    pub fn single(address: &str) -> Result<Self, NoRecipients> {
        Self::new([address])
    }

    /// Build a set from a comma-separated list, see [`split_address_list`].
    pub fn from_list(list: &str) -> Result<Self, NoRecipients> {
        Self::new(split_address_list(list))
    }

    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Always `false`; the set is non-empty by construction.
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Comma-joined form used in the `to` field.
    pub fn joined(&self) -> String {
        self.addresses.join(",")
    }
}

/// Split a comma-separated address list into trimmed, non-empty entries.
///
/// Commas inside double-quoted display names do not separate entries, and a
/// backslash inside quotes escapes the next character.
pub fn split_address_list(list: &str) -> Vec<String> {
    let mut entries = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;
    for ch in list.chars() {
        match ch {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                entries.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    entries.push(current);
    entries
        .into_iter()
        .map(|entry| entry.trim().to_owned())
        .filter(|entry| !entry.is_empty())
        .collect()
}

/// Message body tagged with how it is sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageBody {
    Html(String),
    Text(String),
}

impl MessageBody {
    fn new(content: &str, kind: BodyKind) -> Self {
        match kind {
            BodyKind::Html => MessageBody::Html(content.to_owned()),
            BodyKind::Plain => MessageBody::Text(content.to_owned()),
        }
    }

    pub fn kind(&self) -> BodyKind {
        match self {
            MessageBody::Html(_) => BodyKind::Html,
            MessageBody::Text(_) => BodyKind::Plain,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            MessageBody::Html(content) | MessageBody::Text(content) => content,
        }
    }
}

/// A complete message as sent to the provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundMessage {
    from: String,
    to: String,
    subject: String,
    body: MessageBody,
}

impl OutboundMessage {
    pub fn sender(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body(&self) -> &MessageBody {
        &self.body
    }

    pub fn html(&self) -> Option<&str> {
        match &self.body {
            MessageBody::Html(content) => Some(content),
            MessageBody::Text(_) => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.body {
            MessageBody::Text(content) => Some(content),
            MessageBody::Html(_) => None,
        }
    }

    /// Populated fields in wire order: `from`, `to`, `subject`, then exactly
    /// one of `html` or `text`.
    pub fn form_fields(&self) -> [(&'static str, &str); 4] {
        [
            ("from", self.from.as_str()),
            ("to", self.to.as_str()),
            ("subject", self.subject.as_str()),
            (self.body.kind().field_name(), self.body.content()),
        ]
    }

    /// URL-encoded request body.
    pub fn to_form(&self) -> String {
        form_body(self.form_fields())
    }
}

/// Assemble a message from its parts and a classifier verdict.
///
/// Sender and subject are copied verbatim.
pub fn build_message(
    sender: &str,
    recipients: &RecipientSet,
    subject: &str,
    content: &str,
    kind: BodyKind,
) -> OutboundMessage {
    OutboundMessage {
        from: sender.to_owned(),
        to: recipients.joined(),
        subject: subject.to_owned(),
        body: MessageBody::new(content, kind),
    }
}

/// Fields fixed for the lifetime of a handler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageTemplate {
    sender: String,
    recipients: RecipientSet,
    subject: String,
}

impl MessageTemplate {
    pub fn new(sender: impl Into<String>, recipients: RecipientSet, subject: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            recipients,
            subject: subject.into(),
        }
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn recipients(&self) -> &RecipientSet {
        &self.recipients
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Classify `content` and build the message carrying it.
    pub fn build(&self, content: &str) -> OutboundMessage {
        build_message(
            &self.sender,
            &self.recipients,
            &self.subject,
            content,
            classify_content(content),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn template() -> MessageTemplate {
        let recipients = RecipientSet::new(["b@x.com", "c@x.com"]).expect("recipients");
        MessageTemplate::new("a@x.com", recipients, "S")
    }

    #[rstest]
    fn plain_content_becomes_text(template: MessageTemplate) {
        let message = template.build("hello");
        assert_eq!(message.sender(), "a@x.com");
        assert_eq!(message.to(), "b@x.com,c@x.com");
        assert_eq!(message.subject(), "S");
        assert_eq!(message.text(), Some("hello"));
        assert_eq!(message.html(), None);
    }

    #[rstest]
    fn html_document_becomes_html(template: MessageTemplate) {
        let content = "<!DOCTYPE html><html><body>hi</body></html>";
        let message = template.build(content);
        assert_eq!(message.html(), Some(content));
        assert_eq!(message.text(), None);
        assert_eq!(message.form_fields()[3], ("html", content));
    }

    #[rstest]
    fn building_is_deterministic(template: MessageTemplate) {
        assert_eq!(template.build("same"), template.build("same"));
    }

    #[rstest]
    fn empty_content_still_builds(template: MessageTemplate) {
        let message = template.build("");
        assert_eq!(message.text(), Some(""));
    }

    #[rstest]
    fn form_body_omits_the_unused_part(template: MessageTemplate) {
        let form = template.build("disk at 95%").to_form();
        assert_eq!(
            form,
            "from=a%40x.com&to=b%40x.com%2Cc%40x.com&subject=S&text=disk+at+95%25"
        );
        assert!(!form.contains("html="));
    }

    #[rstest]
    #[case(vec!["ops@x.com"], "ops@x.com")]
    #[case(vec!["ops@x.com,"], "ops@x.com")]
    #[case(vec![" a@x.com ", "b@x.com", "a@x.com"], "a@x.com,b@x.com")]
    #[case(vec!["a@x.com", "  ", "b@x.com"], "a@x.com,b@x.com")]
    fn recipients_join_without_stray_separators(#[case] input: Vec<&str>, #[case] joined: &str) {
        let set = RecipientSet::new(input).expect("recipients");
        assert_eq!(set.joined(), joined);
    }

    #[rstest]
    #[case(vec![])]
    #[case(vec![""])]
    #[case(vec![" , ,"])]
    fn recipients_require_an_address(#[case] input: Vec<&str>) {
        assert_eq!(RecipientSet::new(input), Err(NoRecipients));
    }

    #[rstest]
    fn quoted_display_names_are_kept_whole() {
        let set = RecipientSet::new([
            "\"Ops, Team\" <ops@x.com>",
            "\"Ops, Night\" <night@x.com>",
            "\"Ops, Team\" <ops@x.com>",
        ])
        .expect("recipients");
        assert_eq!(
            set.addresses(),
            ["\"Ops, Team\" <ops@x.com>", "\"Ops, Night\" <night@x.com>"]
        );
        assert_eq!(
            set.joined(),
            "\"Ops, Team\" <ops@x.com>,\"Ops, Night\" <night@x.com>"
        );
    }

    #[rstest]
    #[case("a@x.com, b@x.com", vec!["a@x.com", "b@x.com"])]
    #[case("a@x.com,,b@x.com,", vec!["a@x.com", "b@x.com"])]
    #[case("\"Ops, Team\" <ops@x.com>, b@x.com", vec!["\"Ops, Team\" <ops@x.com>", "b@x.com"])]
    #[case("\"Say \\\"hi, there\\\"\" <s@x.com>", vec!["\"Say \\\"hi, there\\\"\" <s@x.com>"])]
    #[case(" , ", vec![])]
    fn address_lists_split_outside_quotes(#[case] list: &str, #[case] expected: Vec<&str>) {
        assert_eq!(split_address_list(list), expected);
    }

    #[rstest]
    fn list_constructor_normalizes() {
        let set = RecipientSet::from_list("a@x.com, b@x.com, a@x.com").expect("recipients");
        assert_eq!(set.len(), 2);
        assert!(!set.is_empty());
    }
}
