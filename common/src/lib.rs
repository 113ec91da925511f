#![warn(clippy::nursery, clippy::pedantic)]

//! Contains common functions and structures used by multiple projects

use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
pub use serde_json::Number;
use thiserror::Error;
pub use url::Url;

pub const API_ENDPOINT: &str = "/api";

/// Length of a paste id.
pub const ID_LENGTH: usize = 10;
/// Largest accepted paste body, in bytes.
pub const MAX_CONTENT_BYTES: usize = 10 * 1024 * 1024;
/// Longest accepted title, in characters.
pub const MAX_TITLE_CHARS: usize = 255;
/// One year, in hours.
pub const MAX_EXPIRES_IN_HOURS: i64 = 8760;
pub const MAX_VIEWS_LIMIT: i64 = 1_000_000;
pub const DEFAULT_TITLE: &str = "Untitled";

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreatePasteRequest {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Hours until the paste expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_views: Option<Number>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreatedPaste {
    pub id: String,
    pub title: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FetchedPaste {
    pub id: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub view_count: u32,
    pub max_views: Option<u32>,
    pub is_last_view: bool,
}

impl FetchedPaste {
    /// A human readable summary of how long this paste will stick around.
    #[must_use]
    pub fn lifetime_notice(&self) -> String {
        if self.is_last_view {
            return "This was the final view. The paste has been deleted.".to_string();
        }

        let views = self.max_views.map(|max| {
            format!(
                "{} of {max} views remaining",
                max.saturating_sub(self.view_count)
            )
        });
        let expiry = self
            .expires_at
            .map(|time| time.format("expires on %A, %B %-d, %Y at %T %Z").to_string());

        match (views, expiry) {
            (None, None) => "This paste will not expire.".to_string(),
            (Some(views), None) => format!("This paste has {views}."),
            (None, Some(expiry)) => format!("This paste {expiry}."),
            (Some(views), Some(expiry)) => format!("This paste has {views} and {expiry}."),
        }
    }
}

/// Machine readable error codes returned in the `error` member of a failed
/// response.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    PasteNotFound,
    PasteExpired,
    InternalError,
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::PasteNotFound => "PASTE_NOT_FOUND",
            Self::PasteExpired => "PASTE_EXPIRED",
            Self::InternalError => "INTERNAL_ERROR",
        })
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Error, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// The `{success, data | error}` wrapper every paste endpoint responds with.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl<T> Envelope<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub const fn failure(error: ApiError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }

    /// Unwraps the envelope into its payload.
    ///
    /// # Errors
    ///
    /// Returns the carried error for failed responses, or an internal error if
    /// the envelope is missing its payload.
    pub fn into_result(self) -> Result<T, ApiError> {
        match (self.data, self.error) {
            (_, Some(error)) => Err(error),
            (Some(data), None) if self.success => Ok(data),
            _ => Err(ApiError::new(
                ErrorCode::InternalError,
                "Malformed response from server",
            )),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub success: bool,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthReport {
    #[must_use]
    pub fn healthy(timestamp: DateTime<Utc>) -> Self {
        Self {
            success: true,
            status: "healthy".to_string(),
            timestamp: Some(timestamp),
            database: Some("connected".to_string()),
            error: None,
        }
    }

    #[must_use]
    pub fn unhealthy() -> Self {
        Self {
            success: false,
            status: "unhealthy".to_string(),
            timestamp: None,
            database: None,
            error: Some("Database connection failed".to_string()),
        }
    }
}

/// Points `server` at `path` under the API root, dropping any query or
/// fragment.
#[must_use]
pub fn api_url(server: &Url, path: &str) -> Url {
    let mut url = server.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.set_path(&format!("{API_ENDPOINT}/{path}"));
    url
}

/// Builds the link handed out to users for a paste.
#[must_use]
pub fn share_url(base: &str, id: &str) -> String {
    format!("{base}?id={id}")
}

/// A share link, split into the instance it points to and the paste id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShareLink {
    pub server: Url,
    pub id: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseShareLinkError {
    #[error("The provided url was bad")]
    BadUrl,
    #[error("Missing paste id")]
    NeedId,
}

impl ShareLink {
    /// The API location of this paste on its server.
    #[must_use]
    pub fn api_url(&self) -> Url {
        api_url(&self.server, &format!("pastes/{}", self.id))
    }
}

impl FromStr for ShareLink {
    type Err = ParseShareLinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut url = Url::from_str(s).map_err(|_| ParseShareLinkError::BadUrl)?;
        let id = url
            .query_pairs()
            .find(|(k, _)| k == "id")
            .map(|(_, v)| v.into_owned())
            .filter(|id| !id.is_empty())
            .ok_or(ParseShareLinkError::NeedId)?;

        url.set_query(None);
        url.set_fragment(None);

        Ok(Self { server: url, id })
    }
}

impl Display for ShareLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let base = self.server.as_str();
        f.write_str(&share_url(base, &self.id))
    }
}
