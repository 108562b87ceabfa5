//! Google Keep client.
//!
//! Notes are created through `POST {base_url}/notes`. The Keep API only
//! accepts service accounts acting for a user of their Workspace domain, so
//! every call first exchanges a signed assertion for an access token:
//!
//! 1. Build an RS256 JWT with the service account as issuer, the impersonated
//!    user as subject, the Keep scope, and the token endpoint as audience.
//! 2. POST it to the token endpoint as a `jwt-bearer` grant.
//! 3. Use the returned bearer token for the notes request.
//!
//! Rejections at either step surface as [`KeepError::Authorization`].

use crate::config::KeepConfig;
use crate::credentials::ServiceAccountKey;
use crate::encode::NoteBody;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

pub const KEEP_SCOPE: &str = "https://www.googleapis.com/auth/keep";
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime of a signed assertion; Google caps it at one hour.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

#[derive(Error, Debug)]
pub enum KeepError {
    #[error("No user to act for: set keep.impersonated_user or pass --impersonate")]
    NoImpersonatedUser,
    #[error("Google rejected the credentials: {0}")]
    Authorization(String),
    #[error("Cannot sign the service account assertion: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
    #[error("Keep request failed with {status}: {message}")]
    Remote { status: StatusCode, message: String },
    #[error("Keep request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Request body for `POST /notes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNote {
    pub title: String,
    pub body: NoteBody,
}

/// The part of the created note the caller reports back.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedNote {
    /// Resource name, `notes/{id}`.
    pub name: String,
    #[serde(default)]
    pub title: String,
}

/// Anything that can store a note.
pub trait NoteService {
    fn create_note(&self, note: &NewNote) -> Result<CreatedNote, KeepError>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub sub: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

pub struct KeepClient {
    http: Client,
    base_url: String,
    key: ServiceAccountKey,
    subject: String,
}

impl KeepClient {
    pub fn new(
        key: ServiceAccountKey,
        subject: Option<&str>,
        config: &KeepConfig,
    ) -> Result<Self, KeepError> {
        let subject = subject
            .filter(|s| !s.trim().is_empty())
            .ok_or(KeepError::NoImpersonatedUser)?;
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            key,
            subject: subject.to_string(),
        })
    }

    pub fn claims(&self, now: DateTime<Utc>) -> AssertionClaims {
        let iat = now.timestamp();
        AssertionClaims {
            iss: self.key.client_email.clone(),
            sub: self.subject.clone(),
            scope: KEEP_SCOPE.to_string(),
            aud: self.key.token_uri.clone(),
            iat,
            exp: (now + ChronoDuration::seconds(ASSERTION_LIFETIME_SECS)).timestamp(),
        }
    }

    /// Signed JWT for the bearer grant.
    pub fn assertion(&self, now: DateTime<Utc>) -> Result<String, KeepError> {
        let key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())?;
        let token = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &self.claims(now), &key)?;
        Ok(token)
    }

    /// Exchange a fresh assertion for an access token.
    pub fn access_token(&self) -> Result<String, KeepError> {
        let assertion = self.assertion(Utc::now())?;
        debug!(token_uri = %self.key.token_uri, subject = %self.subject, "requesting access token");
        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()?;
        let status = response.status();
        if status.is_client_error() {
            return Err(KeepError::Authorization(error_message(response)));
        }
        let token: TokenResponse = check_status(response)?.json()?;
        Ok(token.access_token)
    }
}

impl NoteService for KeepClient {
    fn create_note(&self, note: &NewNote) -> Result<CreatedNote, KeepError> {
        let token = self.access_token()?;
        let url = format!("{}/notes", self.base_url);
        info!(%url, title = %note.title, "creating note");
        let response = self.http.post(&url).bearer_auth(token).json(note).send()?;
        let created: CreatedNote = check_status(response)?.json()?;
        debug!(name = %created.name, "note created");
        Ok(created)
    }
}

fn check_status(response: Response) -> Result<Response, KeepError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = error_message(response);
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(KeepError::Authorization(message));
    }
    Err(KeepError::Remote { status, message })
}

/// Human-readable message from a Google error body.
///
/// Token errors look like `{"error": "invalid_grant", "error_description": ..}`,
/// API errors like `{"error": {"message": ..}}`; anything else is returned raw.
fn error_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().unwrap_or_default();
    let parsed: Option<Value> = serde_json::from_str(&body).ok();
    let message = parsed.as_ref().and_then(|v| {
        let error = v.get("error")?;
        match error {
            Value::String(code) => Some(match v.get("error_description").and_then(Value::as_str) {
                Some(desc) => format!("{code}: {desc}"),
                None => code.clone(),
            }),
            _ => error.get("message").and_then(Value::as_str).map(str::to_string),
        }
    });
    match message {
        Some(message) => message,
        None if body.trim().is_empty() => status.to_string(),
        None => body,
    }
}
