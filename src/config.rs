//! Configuration options for the posterkit client

use std::time::Duration;

/// Default image host for contact-bar strips.
pub const DEFAULT_IMAGES_BASE: &str = "https://practiceguru.pro/images";

/// Contact-bar strip shown to non-entitled users.
pub const DEFAULT_CONTACT_BAR: &str = "yourfirmcontactbartaxprofessional.png";

/// Watermark rendered when the backend does not supply one.
pub const DEFAULT_WATERMARK: &str = "OneClick Branding";

/// Default base URL of the identity provider.
pub const DEFAULT_IDENTITY_BASE: &str = "https://identitytoolkit.googleapis.com";

/// Configuration options for the posterkit client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Whether to mirror the session into the configured session store
    pub persist_session: bool,

    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// Base URL of the identity provider (sign-in, sign-up, token refresh)
    pub identity_base: String,

    /// Base URL of the host serving contact-bar images
    pub images_base: String,

    /// Contact-bar image used when the account has none, or when not entitled
    pub default_contact_bar: String,

    /// Watermark text used when the backend does not supply one
    pub default_watermark: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            persist_session: true,
            request_timeout: Some(Duration::from_secs(30)),
            identity_base: DEFAULT_IDENTITY_BASE.to_string(),
            images_base: DEFAULT_IMAGES_BASE.to_string(),
            default_contact_bar: DEFAULT_CONTACT_BAR.to_string(),
            default_watermark: DEFAULT_WATERMARK.to_string(),
        }
    }
}

impl ClientOptions {
    /// Set whether to persist the session
    pub fn with_persist_session(mut self, value: bool) -> Self {
        self.persist_session = value;
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the identity provider base URL
    pub fn with_identity_base(mut self, value: &str) -> Self {
        self.identity_base = value.to_string();
        self
    }

    /// Set the contact-bar image host
    pub fn with_images_base(mut self, value: &str) -> Self {
        self.images_base = value.to_string();
        self
    }

    /// Set the fallback contact-bar image
    pub fn with_default_contact_bar(mut self, value: &str) -> Self {
        self.default_contact_bar = value.to_string();
        self
    }

    /// Set the fallback watermark text
    pub fn with_default_watermark(mut self, value: &str) -> Self {
        self.default_watermark = value.to_string();
        self
    }
}
