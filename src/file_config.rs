//! INI configuration for Mailgun handlers.
//!
//! A section (default `[mailgun]`) maps onto [`MailgunHandlerBuilder`]:
//!
//! ```ini
//! [mailgun]
//! api_key_env = MAILGUN_API_KEY
//! domain = mg.example.com
//! from = alerts@example.com
//! to = ops@example.com, oncall@example.com
//! subject = Application error
//! level = error
//! retry_mode = transient
//! ```
//!
//! Values are parsed with `rust-ini`; validation happens in the builder.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use ini::{Ini, ParseOption, Properties};
use log::warn;

use crate::formatter::FormatterKind;
use crate::handlers::mailgun_builder::BackoffOverrides;
use crate::handlers::{HandlerBuildError, MailgunHandlerBuilder};
use crate::level::Level;
use crate::mailgun::RetryMode;

/// Section read when the caller does not name one.
pub const DEFAULT_SECTION: &str = "mailgun";

const KNOWN_KEYS: &[&str] = &[
    "api_key",
    "api_key_env",
    "domain",
    "from",
    "to",
    "subject",
    "level",
    "bubble",
    "base_url",
    "max_retries",
    "retry_mode",
    "connect_timeout_ms",
    "request_timeout_ms",
    "backoff_base_ms",
    "backoff_cap_ms",
    "formatter",
];

/// Read `path` and configure a builder from `section`.
///
/// # Errors
///
/// [`HandlerBuildError::Io`] if the file cannot be read, and
/// [`HandlerBuildError::InvalidConfig`] if it is empty, malformed, or lacks
/// the section.
pub fn builder_from_file(
    path: impl AsRef<Path>,
    section: &str,
) -> Result<MailgunHandlerBuilder, HandlerBuildError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => HandlerBuildError::InvalidConfig(format!(
            "{} doesn't exist",
            path.display()
        )),
        _ => HandlerBuildError::Io(err),
    })?;
    if text.trim().is_empty() {
        return Err(HandlerBuildError::InvalidConfig(format!(
            "{} is an empty file",
            path.display()
        )));
    }
    builder_from_str(&text, section)
}

/// Configure a builder from INI `text`.
pub fn builder_from_str(
    text: &str,
    section: &str,
) -> Result<MailgunHandlerBuilder, HandlerBuildError> {
    // Quotes and backslashes stay literal so display names reach the builder.
    let options = ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..ParseOption::default()
    };
    let ini = Ini::load_from_str_opt(text, options)
        .map_err(|err| HandlerBuildError::InvalidConfig(format!("invalid INI: {err}")))?;
    let props = ini.section(Some(section)).ok_or_else(|| {
        HandlerBuildError::InvalidConfig(format!("missing section [{section}]"))
    })?;
    builder_from_properties(props)
}

fn builder_from_properties(props: &Properties) -> Result<MailgunHandlerBuilder, HandlerBuildError> {
    for (key, _) in props.iter() {
        if !KNOWN_KEYS.contains(&key) {
            warn!("ignoring unknown mailgun config key '{key}'");
        }
    }

    let mut builder = MailgunHandlerBuilder::new();
    if let Some(api_key) = resolve_api_key(props)? {
        builder = builder.with_api_key(api_key);
    }
    if let Some(domain) = props.get("domain") {
        builder = builder.with_domain(domain);
    }
    if let Some(from) = props.get("from") {
        builder = builder.with_from(from);
    }
    if let Some(to) = props.get("to") {
        builder = builder.with_to_list(to);
    }
    if let Some(subject) = props.get("subject") {
        builder = builder.with_subject(subject);
    }
    if let Some(level) = parse_value::<Level, _>(props, "level")? {
        builder = builder.with_level(level);
    }
    if let Some(bubble) = props.get("bubble") {
        builder = builder.with_bubble(parse_bool(bubble)?);
    }
    if let Some(base_url) = props.get("base_url") {
        builder = builder.with_base_url(base_url.trim());
    }
    if let Some(max_retries) = parse_value::<u32, _>(props, "max_retries")? {
        builder = builder.with_max_retries(max_retries);
    }
    if let Some(mode) = parse_value::<RetryMode, _>(props, "retry_mode")? {
        builder = builder.with_retry_mode(mode);
    }
    if let Some(ms) = parse_value::<u64, _>(props, "connect_timeout_ms")? {
        builder = builder.with_connect_timeout_ms(ms);
    }
    if let Some(ms) = parse_value::<u64, _>(props, "request_timeout_ms")? {
        builder = builder.with_request_timeout_ms(ms);
    }
    let backoff = BackoffOverrides {
        base_ms: parse_value(props, "backoff_base_ms")?,
        cap_ms: parse_value(props, "backoff_cap_ms")?,
    };
    builder = builder.with_backoff(backoff);
    if let Some(kind) = parse_value::<FormatterKind, _>(props, "formatter")? {
        builder = builder.with_formatter(kind);
    }
    Ok(builder)
}

fn resolve_api_key(props: &Properties) -> Result<Option<String>, HandlerBuildError> {
    match (props.get("api_key"), props.get("api_key_env")) {
        (Some(_), Some(_)) => Err(HandlerBuildError::InvalidConfig(
            "set only one of api_key and api_key_env".into(),
        )),
        (Some(key), None) => Ok(Some(key.to_owned())),
        (None, Some(var)) => {
            let var = var.trim();
            std::env::var(var).map(Some).map_err(|_| {
                HandlerBuildError::InvalidConfig(format!(
                    "environment variable {var} named by api_key_env is not set"
                ))
            })
        }
        (None, None) => Ok(None),
    }
}

fn parse_value<T, E>(props: &Properties, key: &str) -> Result<Option<T>, HandlerBuildError>
where
    T: std::str::FromStr<Err = E>,
    E: std::fmt::Display,
{
    props
        .get(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|err| {
                HandlerBuildError::InvalidConfig(format!("invalid {key} '{raw}': {err}"))
            })
        })
        .transpose()
}

fn parse_bool(raw: &str) -> Result<bool, HandlerBuildError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(HandlerBuildError::InvalidConfig(format!(
            "invalid bubble '{raw}': expected a boolean"
        ))),
    }
}
