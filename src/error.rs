//! Error types for mail delivery.
//!
//! [`AttemptError`] describes why a single HTTP attempt failed and
//! [`DeliveryError`] is what `deliver` surfaces once the retry loop gives up.
//! Neither type ever carries credentials.

use thiserror::Error;

/// Longest provider response body, in bytes, kept on a rejection.
pub(crate) const MAX_REJECTION_BODY: usize = 512;

/// Failure of a single dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError {
    /// Network, TLS, or timeout failure before a response arrived.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The provider answered with a non-2xx status.
    #[error("provider rejected the message with HTTP {status}: {body}")]
    ProviderRejection {
        /// HTTP status returned by the provider.
        status: u16,
        /// Response body, truncated.
        body: String,
    },
}

impl AttemptError {
    /// Rejection whose body is cut to at most [`MAX_REJECTION_BODY`] bytes,
    /// backing off to a char boundary, with `...` marking the cut.
    pub(crate) fn rejection(status: u16, body: &str) -> Self {
        let body = body.trim();
        let body = if body.len() > MAX_REJECTION_BODY {
            let mut cut = MAX_REJECTION_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            format!("{}...", &body[..cut])
        } else {
            body.to_owned()
        };
        Self::ProviderRejection { status, body }
    }

    /// HTTP status for provider rejections.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(_) => None,
            Self::ProviderRejection { status, .. } => Some(*status),
        }
    }
}

/// Terminal outcome of a delivery call that did not reach the provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// Every permitted attempt failed.
    #[error("delivery failed after {attempts} attempts: {last}")]
    ExhaustedRetries {
        attempts: u32,
        #[source]
        last: AttemptError,
    },
    /// The provider rejected the message with a status the retry mode treats
    /// as permanent.
    #[error("delivery rejected after {attempts} attempts: {source}")]
    Rejected {
        attempts: u32,
        #[source]
        source: AttemptError,
    },
}

impl DeliveryError {
    /// Number of HTTP attempts made before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::ExhaustedRetries { attempts, .. } | Self::Rejected { attempts, .. } => *attempts,
        }
    }

    /// The failure of the final attempt.
    pub fn last_attempt(&self) -> &AttemptError {
        match self {
            Self::ExhaustedRetries { last, .. } => last,
            Self::Rejected { source, .. } => source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_truncates_long_bodies() {
        let body = "x".repeat(MAX_REJECTION_BODY + 100);
        let AttemptError::ProviderRejection { body, status } = AttemptError::rejection(500, &body)
        else {
            panic!("expected rejection");
        };
        assert_eq!(status, 500);
        assert_eq!(body.len(), MAX_REJECTION_BODY + 3);
        assert!(body.ends_with("..."));
    }

    #[test]
    fn rejection_truncation_respects_char_boundaries() {
        // Three-byte chars: 512 is not a boundary, so the cut backs off to 510.
        let body = "€".repeat(200);
        let AttemptError::ProviderRejection { body, status } = AttemptError::rejection(400, &body)
        else {
            panic!("expected rejection");
        };
        assert_eq!(status, 400);
        assert_eq!(body, format!("{}...", "€".repeat(170)));
        assert!(body.len() <= MAX_REJECTION_BODY + 3);
    }

    #[test]
    fn short_bodies_are_kept_whole() {
        let exact = "x".repeat(MAX_REJECTION_BODY);
        let AttemptError::ProviderRejection { body, .. } = AttemptError::rejection(503, &exact)
        else {
            panic!("expected rejection");
        };
        assert_eq!(body, exact);
    }

    #[test]
    fn exhausted_retries_reports_attempts_and_cause() {
        let err = DeliveryError::ExhaustedRetries {
            attempts: 3,
            last: AttemptError::Transport("connection refused".into()),
        };
        assert_eq!(err.attempts(), 3);
        assert_eq!(
            err.to_string(),
            "delivery failed after 3 attempts: transport failure: connection refused"
        );
        assert_eq!(err.last_attempt().status(), None);
    }
}
