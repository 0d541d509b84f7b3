//! Authentication and session lifecycle
//!
//! Sign-in is a two-step flow: the identity provider verifies the
//! credentials and issues a short-lived bearer token, then the backend
//! `login` endpoint is called with that token to fetch the profile
//! snapshot and the subscribed/non-subscribed category lists. Tokens are
//! refreshed before every privileged call and never cached or coalesced.

mod session;
mod types;

use reqwest::Client;
use std::sync::Arc;

use crate::config::ClientOptions;
use crate::error::{AuthErrorKind, Error};
use crate::fetch::{parse_trimmed, Fetch};

pub use session::*;
pub use types::*;

/// Client for authentication against the identity provider and the
/// poster backend.
#[derive(Clone)]
pub struct Auth {
    /// The base URL for the poster backend
    api_base: String,

    /// API key for the identity provider
    key: String,

    /// HTTP client used for requests
    http_client: Client,

    /// The current session
    holder: SessionHolder,

    /// Optional on-device persistence for the session
    store: Option<Arc<dyn SessionStore>>,

    /// Client options
    options: ClientOptions,
}

impl Auth {
    /// Create a new Auth client
    pub(crate) fn new(
        api_base: &str,
        key: &str,
        http_client: Client,
        options: ClientOptions,
        store: Option<Arc<dyn SessionStore>>,
    ) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            key: key.to_string(),
            http_client,
            holder: SessionHolder::new(),
            store,
            options,
        }
    }

    /// The session holder shared with the other sub-clients.
    pub(crate) fn holder(&self) -> &SessionHolder {
        &self.holder
    }

    /// Snapshot of the current session, if signed in.
    pub fn current_session(&self) -> Option<Session> {
        self.holder.get()
    }

    /// Whether a session is currently held.
    pub fn is_signed_in(&self) -> bool {
        self.holder.get().is_some()
    }

    /// Reload a previously persisted session from the session store.
    ///
    /// Called at process start so the authenticated screen graph can be
    /// mounted without a fresh sign-in.
    pub fn restore_session(&self) -> Result<Option<Session>, Error> {
        let Some(store) = &self.store else {
            return Ok(None);
        };
        let session = store.load()?;
        if let Some(session) = &session {
            self.holder.set(session.clone());
            tracing::info!(email = %session.email, "session restored from store");
        }
        Ok(session)
    }

    /// Sign in with email and password.
    ///
    /// Verifies the credentials with the identity provider, then calls
    /// the backend `login` endpoint with the fresh token to populate the
    /// session.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, Error> {
        let tokens = self.identity_password_call("signInWithPassword", email, password).await?;
        self.complete_login(tokens, email).await
    }

    /// Register a new account.
    ///
    /// Creates the account at the identity provider, registers it with
    /// the backend, then runs the normal login step so the caller ends up
    /// signed in.
    pub async fn sign_up(&self, email: &str, password: &str, mobile: &str) -> Result<Session, Error> {
        let tokens = self.identity_password_call("signUp", email, password).await?;

        // The registration endpoint replies with a plain-text success
        // marker rather than the usual JSON envelope.
        let url = format!("{}/register_user.php", self.api_base);
        let body = Fetch::post(&self.http_client, &url)
            .form(&[
                ("email", email),
                ("password", password),
                ("mobile", mobile),
                ("firebase_uid", &tokens.local_id),
                ("idToken", &tokens.id_token),
            ])
            .execute_text()
            .await?;
        tracing::debug!(response = %body.trim(), "user registered");

        self.complete_login(tokens, email).await
    }

    /// Mint a fresh bearer token from the held refresh token.
    ///
    /// Every privileged backend call goes through this first; the backend
    /// rejects stale tokens and no token is reused across calls.
    pub async fn refresh_token(&self) -> Result<String, Error> {
        let session = self
            .holder
            .get()
            .ok_or_else(|| Error::auth(AuthErrorKind::MissingToken, "no session held"))?;

        let url = format!("{}/v1/token?key={}", self.options.identity_base, self.key);
        let response = self
            .http_client
            .post(&url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", session.refresh_token.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(identity_error(&body, AuthErrorKind::MissingToken));
        }

        let refreshed: RefreshedTokens = parse_trimmed(&body)?;
        self.holder
            .update_tokens(&refreshed.id_token, &refreshed.refresh_token);
        self.persist_current()?;

        Ok(refreshed.id_token)
    }

    /// Sign out, clearing the session holder and the session store.
    ///
    /// After this call no subscribed-category data survives into a new
    /// sign-in and the caller is back on the unauthenticated screen graph.
    pub fn sign_out(&self) -> Result<(), Error> {
        self.holder.clear();
        if let Some(store) = &self.store {
            store.clear()?;
        }
        tracing::info!("signed out");
        Ok(())
    }

    /// Password-grant call against the identity provider.
    async fn identity_password_call(
        &self,
        action: &str,
        email: &str,
        password: &str,
    ) -> Result<IdentityTokens, Error> {
        let url = format!(
            "{}/v1/accounts:{}?key={}",
            self.options.identity_base, action, self.key
        );

        let payload = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });

        let response = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(identity_error(&body, AuthErrorKind::Provider));
        }

        let tokens: IdentityTokens = parse_trimmed(&body)?;
        Ok(tokens)
    }

    /// Backend `login` call: exchanges the fresh token for the profile
    /// snapshot and category lists, then installs the session.
    async fn complete_login(&self, tokens: IdentityTokens, email: &str) -> Result<Session, Error> {
        let url = format!("{}/login_api_app.php", self.api_base);
        let login: LoginResponse = Fetch::post(&self.http_client, &url)
            .form(&[("idToken", tokens.id_token.as_str())])
            .execute()
            .await?;

        if !login.success {
            return Err(Error::api(
                login.message.unwrap_or_else(|| "login failed".to_string()),
            ));
        }

        let session = Session {
            email: login
                .email
                .or(tokens.email)
                .unwrap_or_else(|| email.to_string()),
            id_token: tokens.id_token,
            refresh_token: tokens.refresh_token,
            created_at: login.created_at.unwrap_or_default(),
            contact_bar_image: login
                .contactbar
                .unwrap_or_else(|| self.options.default_contact_bar.clone()),
            subscribed: login.subscribed_categories,
            non_subscribed: login.non_subscribed_categories,
        };

        self.holder.set(session.clone());
        self.persist_current()?;
        tracing::info!(email = %session.email, "signed in");

        Ok(session)
    }

    fn persist_current(&self) -> Result<(), Error> {
        if !self.options.persist_session {
            return Ok(());
        }
        if let (Some(store), Some(session)) = (&self.store, self.holder.get()) {
            store.save(&session)?;
        }
        Ok(())
    }
}

/// Map an identity-provider failure body onto a distinguished auth error.
///
/// The provider reports failures as `{ "error": { "message": "CODE" } }`;
/// unknown codes fall back to the given default kind with the raw code as
/// the user-facing message.
fn identity_error(body: &str, default_kind: AuthErrorKind) -> Error {
    let code = parse_trimmed::<IdentityErrorBody>(body)
        .map(|parsed| parsed.error.message)
        .unwrap_or_else(|_| body.trim().to_string());

    let kind = if code.starts_with("WEAK_PASSWORD") {
        AuthErrorKind::WeakPassword
    } else {
        match code.as_str() {
            "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS"
            | "USER_DISABLED" => AuthErrorKind::InvalidCredentials,
            "EMAIL_EXISTS" => AuthErrorKind::DuplicateAccount,
            "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" | "USER_NOT_FOUND" => {
                AuthErrorKind::MissingToken
            }
            _ => default_kind,
        }
    };

    Error::auth(kind, code)
}
