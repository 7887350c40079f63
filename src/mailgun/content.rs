//! Decides whether a rendered body is sent as HTML or plain text.

/// MIME disposition of a message body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BodyKind {
    Html,
    Plain,
}

impl BodyKind {
    /// Form field the body is sent under.
    pub fn field_name(self) -> &'static str {
        match self {
            BodyKind::Html => "html",
            BodyKind::Plain => "text",
        }
    }
}

const HTML_MARKERS: [&str; 2] = ["<!doctype html", "<html"];

/// Classify `content` by looking for an HTML document marker.
///
/// Content counts as HTML when it contains `<!DOCTYPE html` or `<html`, in any
/// case, anywhere in the body. A marker does not have to lead the content, so
/// a text preamble before the document still yields `Html`. This is a
/// heuristic, not a parser: fragments without a marker are sent as plain text.
pub fn classify_content(content: &str) -> BodyKind {
    let lowered = content.trim().to_ascii_lowercase();
    if HTML_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        BodyKind::Html
    } else {
        BodyKind::Plain
    }
}
