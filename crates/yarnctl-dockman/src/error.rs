//! Error types for the dockman client.

/// Result type alias using [`DockmanError`].
pub type DockmanResult<T> = Result<T, DockmanError>;

/// Errors returned by the dockman API or the transport underneath it.
#[derive(Debug, thiserror::Error)]
pub enum DockmanError {
    /// The API rejected the credentials (HTTP 401).
    #[error("Connection error: 401 Unauthorized.\nPlease ensure that the password is correct.")]
    Unauthorized,

    /// The API refused the request (HTTP 403), usually because microservices
    /// are disabled on the appliance.
    #[error("Connection error: 403 Forbidden.\nPlease ensure that microservices are enabled.")]
    Forbidden,

    /// Any other non-success status.
    #[error("Code ({code}) for URL ({url})")]
    Status {
        /// HTTP status code.
        code: u16,
        /// Request URL, including the query string.
        url: String,
        /// Response body, kept for diagnostics.
        body: String,
    },

    /// The API kept redirecting past the hop limit.
    #[error("Too many redirects, last URL ({url})")]
    TooManyRedirects {
        /// Last URL the API redirected to.
        url: String,
    },

    /// The request did not complete in time.
    #[error("Connection error: timeout.")]
    Timeout,

    /// The API host could not be reached.
    #[error("Connection error: Host unreachable.")]
    Unreachable(#[source] reqwest::Error),

    /// A response body could not be decoded.
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Any other transport failure.
    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),
}

impl DockmanError {
    /// Create a status error.
    #[must_use]
    pub fn status(code: u16, url: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Status {
            code,
            url: url.into(),
            body: body.into(),
        }
    }

    /// Create a not-found status error for `url`.
    #[must_use]
    pub fn not_found(url: impl Into<String>) -> Self {
        Self::status(404, url, "")
    }

    /// Create a conflict status error for `url`.
    #[must_use]
    pub fn conflict(url: impl Into<String>) -> Self {
        Self::status(409, url, "")
    }

    /// HTTP status code carried by this error, if any.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::Forbidden => Some(403),
            Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether the API reported the resource as absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    /// Whether the API reported the resource as already present.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.status_code() == Some(409)
    }

    /// Errors that make any further request pointless: bad credentials,
    /// disabled microservices, or no route to the API.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized | Self::Forbidden | Self::Timeout | Self::Unreachable(_)
        )
    }
}

impl From<reqwest::Error> for DockmanError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Unreachable(err)
        } else {
            Self::Http(err)
        }
    }
}
