//! Account profile, profile editing, and FAQs
//!
//! These endpoints authenticate differently from the rest of the API:
//! `latestsubscription` takes the bearer token in the Authorization
//! header as well as in a JSON body, `edit_profile` takes a multipart
//! form with an `idToken` field, and `fetch_faqs` takes a JSON body.
//! The per-endpoint styles are part of the backend contract and are
//! preserved rather than unified.

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;

use crate::auth::{Auth, Subscription};
use crate::error::Error;
use crate::fetch::{parse_trimmed, Fetch};

/// Profile snapshot returned by `latestsubscription`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub mobile: String,
    #[serde(default)]
    pub photo: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub contactbar: String,
    #[serde(default)]
    pub subscribed_categories: Vec<Subscription>,
}

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(flatten)]
    data: ProfileData,
}

/// One FAQ entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Faq {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Deserialize)]
struct FaqsResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    faqs: Vec<Faq>,
}

#[derive(Debug, Deserialize)]
struct EditProfileResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

/// A photo picked for the profile, sent as a multipart file part.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Client for profile and support endpoints.
pub struct Profile {
    api_base: String,
    http_client: Client,
    auth: Auth,
}

impl Profile {
    pub(crate) fn new(api_base: &str, http_client: Client, auth: Auth) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            http_client,
            auth,
        }
    }

    /// Fetch the profile snapshot and latest subscription data.
    ///
    /// This endpoint takes the bearer token in the Authorization header
    /// and echoes it in a JSON body.
    pub async fn latest_subscription(&self) -> Result<ProfileData, Error> {
        let token = self.auth.refresh_token().await?;

        let url = format!("{}/latestsubscription.php", self.api_base);
        let response: ProfileResponse = Fetch::post(&self.http_client, &url)
            .bearer_auth(&token)
            .json(&serde_json::json!({ "idToken": token }))?
            .execute()
            .await?;

        if !response.success {
            return Err(Error::api(
                response
                    .message
                    .unwrap_or_else(|| "failed to fetch profile".to_string()),
            ));
        }

        Ok(response.data)
    }

    /// Update the profile name, mobile number, and optionally the photo.
    ///
    /// Returns the backend's confirmation message. The caller is expected
    /// to sign in again afterwards to refresh the session snapshot.
    pub async fn edit_profile(
        &self,
        name: &str,
        mobile: &str,
        photo: Option<PhotoUpload>,
    ) -> Result<String, Error> {
        let token = self.auth.refresh_token().await?;

        let mut form = Form::new()
            .text("name", name.to_string())
            .text("mobile", mobile.to_string())
            .text("idToken", token);

        if let Some(photo) = photo {
            let part = Part::bytes(photo.bytes)
                .file_name(photo.file_name)
                .mime_str(&photo.mime_type)
                .map_err(Error::Http)?;
            form = form.part("photo", part);
        }

        let url = format!("{}/edit_profile.php", self.api_base);
        let response = self
            .http_client
            .post(&url)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::general(format!(
                "Request failed with status {}: {}",
                status, body
            )));
        }

        let parsed: EditProfileResponse = parse_trimmed(&body)?;
        if !parsed.success {
            return Err(Error::api(
                parsed
                    .message
                    .unwrap_or_else(|| "failed to update profile".to_string()),
            ));
        }

        Ok(parsed
            .message
            .unwrap_or_else(|| "Profile updated".to_string()))
    }

    /// Fetch the FAQ list.
    pub async fn faqs(&self) -> Result<Vec<Faq>, Error> {
        let token = self.auth.refresh_token().await?;

        let url = format!("{}/fetch_faqs.php", self.api_base);
        let response: FaqsResponse = Fetch::post(&self.http_client, &url)
            .json(&serde_json::json!({ "idToken": token }))?
            .execute()
            .await?;

        if !response.success {
            return Err(Error::api(
                response
                    .message
                    .unwrap_or_else(|| "failed to fetch FAQs".to_string()),
            ));
        }

        Ok(response.faqs)
    }
}
