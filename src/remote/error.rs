use std::time::Duration;

/// Errors that can occur while talking to the document cloud.
#[derive(Debug)]
pub enum RemoteError {
    /// No device token configured
    NotConfigured,
    /// Transport-level failure (connect, timeout, TLS, body read)
    Http(reqwest::Error),
    /// The cloud answered with a non-success status
    Status { status: u16, body: String },
    /// The listing could not be decoded
    Decode(String),
    /// The whole fetch exceeded its deadline
    Timeout(Duration),
}

impl RemoteError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Http(e) => e.is_timeout() || e.is_connect(),
            RemoteError::Status { status, .. } => *status == 429 || (500..=599).contains(status),
            RemoteError::NotConfigured | RemoteError::Decode(_) | RemoteError::Timeout(_) => false,
        }
    }

    pub fn is_auth_failure(&self) -> bool {
        matches!(self, RemoteError::Status { status: 401 | 403, .. })
    }
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteError::NotConfigured => write!(
                f,
                "Remote credentials not configured. Set remote.device_token in config."
            ),
            RemoteError::Http(e) => write!(f, "Request failed: {}", e),
            RemoteError::Status { status, body } if *status == 401 || *status == 403 => {
                write!(f, "Authentication failed (HTTP {}): {}", status, body)
            }
            RemoteError::Status { status, body } => {
                write!(f, "Remote returned HTTP {}: {}", status, body)
            }
            RemoteError::Decode(e) => write!(f, "Failed to decode document listing: {}", e),
            RemoteError::Timeout(after) => {
                write!(f, "Remote fetch timed out after {}s", after.as_secs())
            }
        }
    }
}

impl std::error::Error for RemoteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RemoteError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            RemoteError::Decode(e.to_string())
        } else {
            RemoteError::Http(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transience() {
        let status = |status| RemoteError::Status {
            status,
            body: String::new(),
        };
        assert!(status(429).is_transient());
        assert!(status(503).is_transient());
        assert!(!status(401).is_transient());
        assert!(!status(404).is_transient());
        assert!(!RemoteError::NotConfigured.is_transient());
        assert!(!RemoteError::Decode("bad".into()).is_transient());
    }

    #[test]
    fn test_auth_failure_display() {
        let err = RemoteError::Status {
            status: 401,
            body: "invalid token".into(),
        };
        assert!(err.is_auth_failure());
        assert!(err.to_string().starts_with("Authentication failed"));
    }
}
