//! Category gate: subscription details and entitlement decisions
//!
//! Entitlement is evaluated twice in the observed flow, once when the
//! category list is rendered and once when a poster is clicked. Both
//! paths go through [`is_entitled`] so they cannot disagree: a
//! subscription is active iff its end date is on or after the evaluation
//! date, compared as plain calendar dates.

use chrono::{Local, NaiveDate};
use reqwest::Client;
use serde::Deserialize;

use crate::auth::{Auth, CategoryRef, Session, Subscription};
use crate::config::ClientOptions;
use crate::error::Error;
use crate::fetch::Fetch;

/// Which asset pool a poster URL is served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetPool {
    /// Entitled pool, no promotional watermarking baked in
    Paid,
    /// Promotional pool for non-entitled users
    NotPaid,
}

impl AssetPool {
    /// Pool for an entitlement decision.
    pub fn for_entitled(entitled: bool) -> Self {
        if entitled {
            AssetPool::Paid
        } else {
            AssetPool::NotPaid
        }
    }

    /// URL path segment of this pool.
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetPool::Paid => "paid",
            AssetPool::NotPaid => "notpaid",
        }
    }
}

/// A subscription is active iff its end date has not passed.
///
/// Calendar-date comparison, no timezone normalization. This is the only
/// entitlement comparison in the crate; the listing path and the
/// poster-click path both call it.
pub fn is_entitled(subscription: &Subscription, on: NaiveDate) -> bool {
    subscription.end_date >= on
}

/// Entitlement for a category id within a session snapshot.
///
/// A category missing from the subscribed list is promotional even if it
/// was subscribed historically.
pub fn entitlement_for(session: &Session, category_id: i64, on: NaiveDate) -> bool {
    session
        .subscribed
        .iter()
        .find(|subscription| subscription.id == category_id)
        .map(|subscription| is_entitled(subscription, on))
        .unwrap_or(false)
}

/// Subscribed and non-subscribed category lists for the account.
#[derive(Debug, Clone)]
pub struct SubscriptionDetails {
    pub subscribed: Vec<Subscription>,
    pub non_subscribed: Vec<CategoryRef>,
}

/// Per-category subscription status at poster-click time.
#[derive(Debug, Clone)]
pub struct SubscriptionStatus {
    pub is_subscribed: bool,
    /// Contact-bar image filename, backend value or the stock fallback
    pub contact_bar_image: String,
    /// Watermark text, backend value or the stock fallback
    pub watermark: String,
}

#[derive(Debug, Deserialize)]
struct SubscriptionDetailsResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    subscribed_categories: Vec<Subscription>,
    #[serde(default)]
    non_subscribed_categories: Vec<CategoryRef>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionStatusResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "isSubscribed")]
    is_subscribed: bool,
    #[serde(default)]
    contactbar: Option<String>,
    #[serde(default)]
    watermark: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContactBarResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    contactbar: Option<String>,
    #[serde(default)]
    watermark: Option<String>,
}

/// Client for subscription details and per-category status.
pub struct Subscriptions {
    api_base: String,
    http_client: Client,
    auth: Auth,
    options: ClientOptions,
}

impl Subscriptions {
    pub(crate) fn new(api_base: &str, http_client: Client, auth: Auth, options: ClientOptions) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            http_client,
            auth,
            options,
        }
    }

    /// Fetch the subscribed/non-subscribed category lists and update the
    /// session holder.
    ///
    /// Refreshes the bearer token first. Overlapping calls are allowed;
    /// a response that arrives after a newer one has already been applied
    /// is discarded from the holder (the fetched lists are still
    /// returned to the caller).
    pub async fn subscription_details(&self) -> Result<SubscriptionDetails, Error> {
        let token = self.auth.refresh_token().await?;
        let ticket = self.auth.holder().begin_categories_refresh();

        let url = format!("{}/subscriptiondetails.php", self.api_base);
        let response: SubscriptionDetailsResponse = Fetch::post(&self.http_client, &url)
            .form(&[("idToken", token.as_str())])
            .execute()
            .await?;

        if !response.success {
            return Err(Error::api(
                response
                    .message
                    .unwrap_or_else(|| "failed to fetch subscription details".to_string()),
            ));
        }

        let details = SubscriptionDetails {
            subscribed: response.subscribed_categories,
            non_subscribed: response.non_subscribed_categories,
        };

        self.auth.holder().apply_categories(
            ticket,
            details.subscribed.clone(),
            details.non_subscribed.clone(),
        );

        Ok(details)
    }

    /// Per-category subscription status, with the stock contact bar and
    /// watermark substituted when the backend sends none.
    pub async fn subscription_status(&self, category_id: i64) -> Result<SubscriptionStatus, Error> {
        let token = self.auth.refresh_token().await?;
        let category_id = category_id.to_string();

        let url = format!("{}/subscription_status.php", self.api_base);
        let response: SubscriptionStatusResponse = Fetch::post(&self.http_client, &url)
            .form(&[("idToken", token.as_str()), ("categoryId", category_id.as_str())])
            .execute()
            .await?;

        if !response.success {
            return Err(Error::api(
                response
                    .message
                    .unwrap_or_else(|| "failed to fetch subscription status".to_string()),
            ));
        }

        Ok(SubscriptionStatus {
            is_subscribed: response.is_subscribed,
            contact_bar_image: response
                .contactbar
                .unwrap_or_else(|| self.options.default_contact_bar.clone()),
            watermark: response
                .watermark
                .unwrap_or_else(|| self.options.default_watermark.clone()),
        })
    }

    /// Contact-bar image and watermark for an entitled category.
    pub async fn contact_bar(&self, category_id: i64) -> Result<(String, String), Error> {
        let token = self.auth.refresh_token().await?;
        let category_id = category_id.to_string();

        let url = format!("{}/fetch_contactbar.php", self.api_base);
        let response: ContactBarResponse = Fetch::post(&self.http_client, &url)
            .form(&[("idToken", token.as_str()), ("categoryId", category_id.as_str())])
            .execute()
            .await?;

        match response {
            ContactBarResponse {
                success: true,
                contactbar: Some(contactbar),
                watermark,
                ..
            } => Ok((
                contactbar,
                watermark.unwrap_or_else(|| self.options.default_watermark.clone()),
            )),
            ContactBarResponse { message, .. } => Err(Error::api(
                message.unwrap_or_else(|| "contact bar not found".to_string()),
            )),
        }
    }

    /// Absolute poster URL for an image name, resolved at click time from
    /// the entitlement decision.
    pub fn poster_url(&self, pool: AssetPool, image_name: &str) -> String {
        format!("{}/posters/{}/{}", self.api_base, pool.as_str(), image_name)
    }

    /// Absolute contact-bar URL; non-entitled users always get the stock
    /// strip regardless of the account asset.
    pub fn contact_bar_url(&self, entitled: bool, image_name: &str) -> String {
        let name = if entitled {
            image_name
        } else {
            self.options.default_contact_bar.as_str()
        };
        format!("{}/{}", self.options.images_base, name)
    }

    /// Entitlement for a category in the current session, evaluated today.
    pub fn is_entitled_now(&self, category_id: i64) -> bool {
        let today = Local::now().date_naive();
        self.auth
            .current_session()
            .map(|session| entitlement_for(&session, category_id, today))
            .unwrap_or(false)
    }
}
