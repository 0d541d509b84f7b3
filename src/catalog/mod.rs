//! Content browser: poster types, poster lists, and search
//!
//! Poster content lives in per-type backend tables. The table name is
//! derived from the poster type's display name, except for the type
//! literally named "Marketing Posters", which maps to the selected
//! category's own table instead. That special case is an asymmetry in
//! the backend's data layout, not a general convention.

use reqwest::Client;
use serde::Deserialize;

use crate::auth::Auth;
use crate::error::Error;
use crate::fetch::Fetch;

/// Poster type literal that routes to the category's own table.
const MARKETING_POSTERS: &str = "Marketing Posters";

/// A grouping of posters within a category.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PosterType {
    pub id: i64,
    pub poster_type_name: String,
}

/// A shareable poster template.
///
/// `poster_image_url` is a relative image name; the absolute URL is
/// resolved at click time from the entitlement decision, not at fetch
/// time. See [`crate::subscriptions::Subscriptions::poster_url`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Poster {
    pub id: i64,
    pub poster_name: String,
    pub poster_image_url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: String,
}

#[derive(Debug, Deserialize)]
struct PosterTypesResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    poster_types: Vec<PosterType>,
}

#[derive(Debug, Deserialize)]
struct PostersResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    posters: Vec<Poster>,
}

/// Lowercase a display name and collapse whitespace runs to underscores.
fn normalize(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Derive the backend table name for a poster type within a category.
///
/// Total and idempotent over already-derived names. "Marketing Posters"
/// maps to `{category}_posters` regardless of category casing or
/// spacing; every other type maps to its own normalized name.
pub fn table_name(poster_type: &str, category_name: &str) -> String {
    if poster_type == MARKETING_POSTERS {
        format!("{}_posters", normalize(category_name))
    } else {
        normalize(poster_type)
    }
}

/// Case-insensitive substring match over description and keywords,
/// OR semantics between the two fields.
///
/// This is the contract the backend's search endpoint implements;
/// exposed so callers can filter an already-fetched list the same way.
pub fn matches_search(poster: &Poster, term: &str) -> bool {
    let term = term.to_lowercase();
    poster.description.to_lowercase().contains(&term)
        || poster.keywords.to_lowercase().contains(&term)
}

/// Client for browsing poster content.
pub struct Catalog {
    api_base: String,
    http_client: Client,
    auth: Auth,
}

impl Catalog {
    pub(crate) fn new(api_base: &str, http_client: Client, auth: Auth) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            http_client,
            auth,
        }
    }

    /// List the poster types available to the account.
    pub async fn poster_types(&self) -> Result<Vec<PosterType>, Error> {
        let token = self.auth.refresh_token().await?;

        let url = format!("{}/fetch_posters_types.php", self.api_base);
        let response: PosterTypesResponse = Fetch::post(&self.http_client, &url)
            .form(&[("idToken", token.as_str())])
            .execute()
            .await?;

        if !response.success {
            return Err(Error::api(
                response
                    .message
                    .unwrap_or_else(|| "failed to fetch poster types".to_string()),
            ));
        }

        Ok(response.poster_types)
    }

    /// List the posters in a content table.
    ///
    /// The table name comes from [`table_name`]; the returned image paths
    /// are relative and pool-agnostic.
    pub async fn posters(&self, table: &str) -> Result<Vec<Poster>, Error> {
        let token = self.auth.refresh_token().await?;

        let url = format!("{}/fetch_posters_list.php", self.api_base);
        let response: PostersResponse = Fetch::post(&self.http_client, &url)
            .form(&[("idToken", token.as_str()), ("tableName", table)])
            .execute()
            .await?;

        if !response.success {
            return Err(Error::api(
                response
                    .message
                    .unwrap_or_else(|| "failed to fetch posters".to_string()),
            ));
        }

        tracing::debug!(table, count = response.posters.len(), "posters fetched");
        Ok(response.posters)
    }

    /// Server-side poster search within a category.
    ///
    /// Case-insensitive substring match over description and keywords
    /// with OR semantics; see [`matches_search`] for the local predicate.
    pub async fn search(&self, category_name: &str, term: &str) -> Result<Vec<Poster>, Error> {
        let token = self.auth.refresh_token().await?;

        let url = format!("{}/search_posters.php", self.api_base);
        let response: PostersResponse = Fetch::post(&self.http_client, &url)
            .form(&[
                ("idToken", token.as_str()),
                ("searchTerm", term),
                ("categoryName", category_name),
            ])
            .execute()
            .await?;

        if !response.success {
            return Err(Error::api(
                response
                    .message
                    .unwrap_or_else(|| "search failed".to_string()),
            ));
        }

        Ok(response.posters)
    }
}
