//! PosterKit Rust Client Library
//!
//! A Rust client library for the OneClickBranding poster service,
//! covering authentication and session lifecycle, category entitlement,
//! poster browsing and search, and the poster composition/share flow.

pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod fetch;
pub mod profile;
pub mod share;
pub mod subscriptions;

use reqwest::Client;
use std::sync::Arc;

use crate::auth::{Auth, SessionStore};
use crate::catalog::Catalog;
use crate::config::ClientOptions;
use crate::profile::Profile;
use crate::share::Composer;
use crate::subscriptions::Subscriptions;

/// The main entry point for the PosterKit client
pub struct PosterKit {
    /// The base URL for the poster backend
    pub url: String,
    /// HTTP client used for requests
    pub http_client: Client,
    /// Auth client for sign-in, sign-up, and session management
    pub auth: Auth,
    /// Client options
    pub options: ClientOptions,
}

impl PosterKit {
    /// Create a new PosterKit client
    ///
    /// # Arguments
    ///
    /// * `api_url` - The base URL of the poster backend
    /// * `identity_key` - The API key for the identity provider
    ///
    /// # Example
    ///
    /// ```
    /// use posterkit::PosterKit;
    ///
    /// let client = PosterKit::new("https://oneclickbranding.ai", "your-identity-key");
    /// ```
    pub fn new(api_url: &str, identity_key: &str) -> Self {
        Self::new_with_options(api_url, identity_key, ClientOptions::default(), None)
    }

    /// Create a new PosterKit client with custom options and an optional
    /// session store for on-device persistence
    ///
    /// # Example
    ///
    /// ```
    /// use posterkit::{PosterKit, config::ClientOptions};
    ///
    /// let options = ClientOptions::default().with_persist_session(false);
    /// let client = PosterKit::new_with_options(
    ///     "https://oneclickbranding.ai",
    ///     "your-identity-key",
    ///     options,
    ///     None,
    /// );
    /// ```
    pub fn new_with_options(
        api_url: &str,
        identity_key: &str,
        options: ClientOptions,
        store: Option<Arc<dyn SessionStore>>,
    ) -> Self {
        let http_client = Client::new();

        let auth = Auth::new(api_url, identity_key, http_client.clone(), options.clone(), store);

        Self {
            url: api_url.trim_end_matches('/').to_string(),
            http_client,
            auth,
            options,
        }
    }

    /// Get a reference to the auth client for sign-in and session management
    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    /// Create a subscriptions client for category entitlement operations
    pub fn subscriptions(&self) -> Subscriptions {
        Subscriptions::new(
            &self.url,
            self.http_client.clone(),
            self.auth.clone(),
            self.options.clone(),
        )
    }

    /// Create a catalog client for poster browsing and search
    pub fn catalog(&self) -> Catalog {
        Catalog::new(&self.url, self.http_client.clone(), self.auth.clone())
    }

    /// Create a profile client for account data and FAQs
    pub fn profile(&self) -> Profile {
        Profile::new(&self.url, self.http_client.clone(), self.auth.clone())
    }

    /// Create a composer that resolves poster clicks into share
    /// compositions
    pub fn composer(&self) -> Composer {
        Composer::new(self.auth.clone(), self.subscriptions(), self.options.clone())
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::auth::{Session, SessionStore};
    pub use crate::config::ClientOptions;
    pub use crate::error::Error;
    pub use crate::share::{ShareState, ShareTarget};
    pub use crate::PosterKit;
}
