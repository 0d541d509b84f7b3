//! Types for authentication, sessions, and the backend login envelope

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A content category the account is not currently subscribed to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: i64,
    pub category_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

/// A category subscription with its validity window.
///
/// A subscription is active when `end_date` is on or after the evaluation
/// date; see [`crate::subscriptions::is_entitled`]. Dates are calendar
/// dates with no timezone normalization, matching the backend contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub category_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// The profile snapshot held for the signed-in account.
///
/// Created by sign-in/sign-up, read by every downstream client, cleared on
/// sign-out. The `id_token` is short-lived; privileged calls refresh it
/// through [`crate::auth::Auth::refresh_token`] rather than reusing this
/// value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub email: String,
    /// Short-lived bearer token issued by the identity provider
    pub id_token: String,
    /// Long-lived token used to mint fresh bearer tokens
    pub refresh_token: String,
    pub created_at: String,
    /// Contact-bar image filename associated with the account
    pub contact_bar_image: String,
    pub subscribed: Vec<Subscription>,
    pub non_subscribed: Vec<CategoryRef>,
}

/// Token bundle returned by the identity provider on sign-in/sign-up.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityTokens {
    pub id_token: String,
    pub refresh_token: String,
    pub local_id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Identity-provider token refresh response (snake_case wire format).
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshedTokens {
    pub id_token: String,
    pub refresh_token: String,
}

/// Identity-provider failure body: `{ "error": { "message": "CODE" } }`.
#[derive(Debug, Deserialize)]
pub(crate) struct IdentityErrorBody {
    pub error: IdentityErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IdentityErrorDetail {
    pub message: String,
}

/// Backend `login` response.
#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub contactbar: Option<String>,
    #[serde(default)]
    pub subscribed_categories: Vec<Subscription>,
    #[serde(default)]
    pub non_subscribed_categories: Vec<CategoryRef>,
}
