use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

pub const ADMIN_PORT: u16 = 58080;
pub const SOAP_PORT: u16 = 48443;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const SOAP_TOOL_PATH: &str = "Tools/Administration-Tool/Default?disableSSLValidation=true";

/// Connection settings handed once to the session and the protocol client.
/// `Debug` never prints the password.
#[derive(Clone)]
pub struct ClientConfig {
    pub hostname: String,
    pub username: String,
    pub password: String,
    pub reports_path: PathBuf,
    pub timeout: Duration,
    /// Skip TLS certificate validation on the SOAP gateway. The platform ships
    /// self-signed certificates, so deployments normally have to opt in.
    pub accept_invalid_certs: bool,
    pub admin_url: Option<Url>,
    pub soap_url: Option<Url>,
}

impl ClientConfig {
    pub fn new(
        hostname: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        reports_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            username: username.into(),
            password: password.into(),
            reports_path: reports_path.into(),
            timeout: DEFAULT_TIMEOUT,
            accept_invalid_certs: false,
            admin_url: None,
            soap_url: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    pub fn with_admin_url(mut self, url: Url) -> Self {
        self.admin_url = Some(url);
        self
    }

    pub fn with_soap_url(mut self, url: Url) -> Self {
        self.soap_url = Some(url);
        self
    }

    /// Resolve the admin and SOAP URLs, falling back to the platform's port
    /// conventions for the configured hostname.
    pub fn endpoints(&self) -> Result<Endpoints> {
        let admin_base = match &self.admin_url {
            Some(url) => url.clone(),
            None => {
                if self.hostname.is_empty() {
                    return Err(Error::config("hostname is empty"));
                }
                parse_url(&format!("http://{}:{ADMIN_PORT}/APG/", self.hostname))?
            }
        };
        let soap = match &self.soap_url {
            Some(url) => url.clone(),
            None => parse_url(&format!(
                "https://{}:{SOAP_PORT}/{SOAP_TOOL_PATH}",
                self.hostname
            ))?,
        };
        Ok(Endpoints {
            admin_base: with_trailing_slash(admin_base),
            soap,
        })
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("hostname", &self.hostname)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("reports_path", &self.reports_path)
            .field("timeout", &self.timeout)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("admin_url", &self.admin_url)
            .field("soap_url", &self.soap_url)
            .finish()
    }
}

/// Concrete URLs of the two web tiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    admin_base: Url,
    soap: Url,
}

impl Endpoints {
    pub fn admin(&self, resource: &str) -> Result<Url> {
        self.admin_base
            .join(resource)
            .map_err(|err| Error::config(format!("invalid admin resource `{resource}`: {err}")))
    }

    pub fn soap(&self) -> &Url {
        &self.soap
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|err| Error::config(format!("`{raw}` is not a valid URL: {err}")))
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
