//! Cookie-backed session against the platform's admin web tier.
//!
//! The session owns its cookie jar and the HTTP client bound to it; requests
//! that need the session borrow the client through [`Session::http`] instead of
//! relying on any process-wide HTTP state.

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::blocking::Client;
use reqwest::cookie::Jar;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::config::{ClientConfig, Endpoints};
use crate::error::{Error, Result};

pub const BOOTSTRAP_RESOURCE: &str = "empty.html";
pub const LOGIN_CHECK_RESOURCE: &str = "j_security_check";

/// Username/password pair. `Debug` never prints the password.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Value for an `Authorization` header using HTTP Basic.
    pub fn basic_authorization(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.username, self.password));
        format!("Basic {token}")
    }

    fn login_form(&self) -> [(&'static str, &str); 2] {
        [
            ("j_username", self.username.as_str()),
            ("j_password", self.password.as_str()),
        ]
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

pub struct Session {
    credentials: Credentials,
    endpoints: Endpoints,
    http: Client,
    authenticated: bool,
}

impl Session {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let http = Client::builder()
            .cookie_provider(jar)
            .timeout(config.timeout)
            .build()
            .map_err(|err| Error::config(format!("failed to build admin HTTP client: {err}")))?;
        Ok(Self {
            credentials: Credentials::new(&config.username, &config.password),
            endpoints: config.endpoints()?,
            http,
            authenticated: false,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// HTTP client carrying this session's cookies.
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Forget the authenticated state so the next protected call logs in again.
    pub fn invalidate(&mut self) {
        if self.authenticated {
            debug!("invalidating platform session");
        }
        self.authenticated = false;
    }

    /// Run the login handshake unless the session is already authenticated.
    pub fn ensure_authenticated(&mut self) -> Result<()> {
        if self.authenticated {
            return Ok(());
        }

        let bootstrap = self.endpoints.admin(BOOTSTRAP_RESOURCE)?;
        debug!(url = %bootstrap, "opening platform session");
        self.http
            .get(bootstrap.clone())
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|err| {
                error!(url = %bootstrap, error = %err, "connection failed");
                Error::connectivity(bootstrap.as_str(), err)
            })?;

        let login = self.endpoints.admin(LOGIN_CHECK_RESOURCE)?;
        debug!(url = %login, username = %self.credentials.username, "sending credentials");
        let body = self
            .http
            .post(login.clone())
            .form(&self.credentials.login_form())
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.bytes())
            .map_err(|err| {
                error!(url = %login, error = %err, "connection failed");
                Error::connectivity(login.as_str(), err)
            })?;

        if let Some(message) = login_rejection(&body) {
            error!(%message, "authorization failed");
            return Err(Error::Authentication { message });
        }

        debug!("authorization OK");
        info!(username = %self.credentials.username, "session authenticated");
        self.authenticated = true;
        Ok(())
    }
}

/// The login check answers with a JSON `{"error": ...}` object on rejection and
/// with an empty or HTML body on success.
pub fn login_rejection(body: &[u8]) -> Option<String> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => map.get("error").map(|value| match value {
            Value::String(message) => message.clone(),
            other => other.to_string(),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_key_rejects_login() {
        assert_eq!(
            login_rejection(br#"{"error":"bad credentials"}"#).as_deref(),
            Some("bad credentials")
        );
    }

    #[test]
    fn empty_html_and_unrelated_json_bodies_are_accepted() {
        assert_eq!(login_rejection(b""), None);
        assert_eq!(login_rejection(b"<html><body>welcome</body></html>"), None);
        assert_eq!(login_rejection(br#"{"status":"ok"}"#), None);
    }

    #[test]
    fn basic_authorization_encodes_user_and_password() {
        let credentials = Credentials::new("admin", "changeme");
        assert_eq!(
            credentials.basic_authorization(),
            "Basic YWRtaW46Y2hhbmdlbWU="
        );
    }

    #[test]
    fn debug_output_redacts_password() {
        let rendered = format!("{:?}", Credentials::new("admin", "changeme"));
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("changeme"));
    }

    #[test]
    fn new_session_starts_unauthenticated() {
        let cfg = ClientConfig::new("apg.example", "admin", "changeme", ".");
        let session = Session::new(&cfg).unwrap();
        assert!(!session.is_authenticated());
    }
}
