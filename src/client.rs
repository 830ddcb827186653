//! Blocking HTTP client for the hosted backend (auth + PostgREST tables).
//!
//! - Blocking client using `ureq` (no async); status codes are inspected by hand.
//! - Auth: password grant and sign-up against `/auth/v1`, refresh grant when the
//!   access token is about to expire.
//! - Tables: `/rest/v1/<table>` with filters rendered by [`crate::query::Query`].
//!
//! No request is ever retried; a failed call is reported to the caller as-is.

use http::StatusCode;
use log::{debug, warn};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::cell::RefCell;
use std::time::{Duration, Instant};

use crate::backend::{Backend, BackendError};
use crate::config::Config;
use crate::models::Identity;
use crate::query::{Filter, Query};

const AUTH_PATH: &str = "/auth/v1";
const REST_PATH: &str = "/rest/v1";
const REFRESH_MARGIN: Duration = Duration::from_secs(30);

#[derive(Debug)]
struct AuthToken {
    access_token: SecretString,
    expires_at: Instant,
    refresh_token: Option<SecretString>,
}

impl AuthToken {
    fn due_for_refresh(&self, now: Instant) -> bool {
        now + REFRESH_MARGIN >= self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: SecretString,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    refresh_token: Option<SecretString>,
    user: Identity,
}

impl TokenResponse {
    fn into_parts(self) -> (AuthToken, Identity) {
        let token = AuthToken {
            access_token: self.access_token,
            expires_at: Instant::now() + Duration::from_secs(self.expires_in.unwrap_or(3600)),
            refresh_token: self.refresh_token,
        };
        (token, self.user)
    }
}

/// Sign-up answers with a bare user when email confirmation is on, or with a
/// full session when it is off.
#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session { user: Identity },
    User(Identity),
}

impl SignUpResponse {
    fn identity(self) -> Identity {
        match self {
            SignUpResponse::Session { user } => user,
            SignUpResponse::User(user) => user,
        }
    }
}

pub struct SupabaseClient {
    agent: ureq::Agent,
    base_url: String,
    api_key: SecretString,
    token: RefCell<Option<AuthToken>>,
}

impl SupabaseClient {
    pub fn new(config: Config) -> Self {
        let agent_config = ureq::Agent::config_builder().http_status_as_error(false).build();
        SupabaseClient {
            agent: ureq::Agent::new_with_config(agent_config),
            base_url: config.supabase_url,
            api_key: config.supabase_key,
            token: RefCell::new(None),
        }
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, AUTH_PATH, path)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}{}/{}", self.base_url, REST_PATH, table)
    }

    fn with_headers<B>(&self, req: ureq::RequestBuilder<B>, bearer: &SecretString) -> ureq::RequestBuilder<B> {
        req.header("apikey", self.api_key.expose_secret())
            .header("Authorization", format!("Bearer {}", bearer.expose_secret()))
            .header("Accept", "application/json")
    }

    /// Headers for table calls: the signed-in user's token, refreshed when
    /// close to expiry, or the API key when nobody is signed in.
    fn authorized<B>(&self, req: ureq::RequestBuilder<B>) -> Result<ureq::RequestBuilder<B>, BackendError> {
        self.refresh_if_due()?;
        let slot = self.token.borrow();
        let bearer = slot.as_ref().map(|t| &t.access_token).unwrap_or(&self.api_key);
        Ok(self.with_headers(req, bearer))
    }

    fn refresh_if_due(&self) -> Result<(), BackendError> {
        let body = {
            let slot = self.token.borrow();
            match slot.as_ref() {
                Some(t) if t.due_for_refresh(Instant::now()) => match &t.refresh_token {
                    Some(refresh) => serde_json::json!({ "refresh_token": refresh.expose_secret() }),
                    None => return Ok(()),
                },
                _ => return Ok(()),
            }
        };
        debug!("Access token close to expiry; refreshing");
        let result = self
            .post_auth("/token", Some("refresh_token"), body)
            .and_then(read_token);
        apply_refresh(&mut self.token.borrow_mut(), result)
    }

    fn post_auth(&self, path: &str, grant: Option<&str>, body: Value) -> Result<http::Response<ureq::Body>, BackendError> {
        let mut req = self
            .with_headers(self.agent.post(&self.auth_url(path)), &self.api_key)
            .header("Content-Type", "application/json");
        if let Some(g) = grant {
            req = req.query("grant_type", g);
        }
        req.send_json(body).map_err(transport)
    }
}

impl Backend for SupabaseClient {
    fn sign_in_with_password(&self, email: &str, password: &SecretString) -> Result<Identity, BackendError> {
        let resp = self.post_auth(
            "/token",
            Some("password"),
            serde_json::json!({ "email": email, "password": password.expose_secret() }),
        )?;
        let (token, identity) = read_token(resp)?.into_parts();
        *self.token.borrow_mut() = Some(token);
        Ok(identity)
    }

    fn sign_up(&self, email: &str, password: &SecretString) -> Result<Identity, BackendError> {
        // The caller's token is kept: follow-up writes run as the caller.
        let resp = self.post_auth(
            "/signup",
            None,
            serde_json::json!({ "email": email, "password": password.expose_secret() }),
        )?;
        Ok(read_json::<SignUpResponse>(resp)?.identity())
    }

    fn sign_out(&self) {
        self.token.borrow_mut().take();
    }

    fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, BackendError> {
        let mut req = self.authorized(self.agent.get(&self.table_url(table)))?;
        for (k, v) in query.to_params() {
            req = req.query(k, v);
        }
        read_json(req.call().map_err(transport)?)
    }

    fn insert(&self, table: &str, row: Value) -> Result<Vec<Value>, BackendError> {
        let resp = self
            .authorized(self.agent.post(&self.table_url(table)))?
            .header("Content-Type", "application/json")
            .header("Prefer", "return=representation")
            .send_json(row)
            .map_err(transport)?;
        read_json(resp)
    }

    fn update(&self, table: &str, filters: &[Filter], patch: Value) -> Result<Vec<Value>, BackendError> {
        let mut req = self
            .authorized(self.agent.patch(&self.table_url(table)))?
            .header("Content-Type", "application/json")
            .header("Prefer", "return=representation");
        for (k, v) in filters.iter().map(Filter::to_param) {
            req = req.query(k, v);
        }
        read_json(req.send_json(patch).map_err(transport)?)
    }
}

fn transport(e: ureq::Error) -> BackendError {
    BackendError::Transport(e.to_string())
}

fn read_json<T: DeserializeOwned>(mut resp: http::Response<ureq::Body>) -> Result<T, BackendError> {
    let status = resp.status();
    let body = resp.body_mut().read_to_string().map_err(transport)?;
    decode_body(status, &body)
}

fn read_token(mut resp: http::Response<ureq::Body>) -> Result<TokenResponse, BackendError> {
    let status = resp.status();
    let body = resp.body_mut().read_to_string().map_err(transport)?;
    token_grant_result(status, &body)
}

/// Password and refresh grants answer 400 (or 401) for rejected credentials.
fn token_grant_result(status: StatusCode, body: &str) -> Result<TokenResponse, BackendError> {
    if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
        return Err(BackendError::InvalidCredentials);
    }
    decode_body(status, body)
}

/// A rejected refresh token empties the slot; later calls then go out with
/// the API key instead of retrying the dead token.
fn apply_refresh(slot: &mut Option<AuthToken>, result: Result<TokenResponse, BackendError>) -> Result<(), BackendError> {
    match result {
        Ok(resp) => {
            *slot = Some(resp.into_parts().0);
            Ok(())
        }
        Err(BackendError::InvalidCredentials) => {
            warn!("Refresh token rejected; dropping the stored session token");
            *slot = None;
            Err(BackendError::SessionExpired)
        }
        Err(e) => Err(e),
    }
}

fn decode_body<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T, BackendError> {
    if status.is_success() {
        let mut de = serde_json::Deserializer::from_str(body);
        return Ok(serde_path_to_error::deserialize(&mut de)?);
    }
    let message = error_message(body);
    if status == StatusCode::NOT_FOUND {
        Err(BackendError::NotFound(message))
    } else {
        Err(BackendError::Http {
            status: status.as_u16(),
            message,
        })
    }
}

/// Best human-readable message from an auth or PostgREST error body.
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        msg: Option<String>,
        #[serde(default)]
        error_description: Option<String>,
        #[serde(default)]
        error: Option<String>,
    }
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(e) => e
            .message
            .or(e.msg)
            .or(e.error_description)
            .or(e.error)
            .unwrap_or_else(|| body.to_string()),
        Err(_) if body.trim().is_empty() => String::from("<no body>"),
        Err(_) => body.to_string(),
    }
}
