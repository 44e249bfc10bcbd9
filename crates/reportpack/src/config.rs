use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reportpack_core::ClientConfig;
use reportpack_core::config::DEFAULT_TIMEOUT;
use serde::Deserialize;
use serde_yaml_bw as serde_yaml;
use url::Url;

/// On-disk layout of the credentials file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsFile {
    #[serde(default)]
    pub credentials: CredentialsSection,
    #[serde(default)]
    pub reports: ReportsSection,
    #[serde(default)]
    pub http: HttpSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialsSection {
    pub hostname: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportsSection {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpSection {
    /// Per-request timeout, e.g. `30s` or `2m`.
    pub timeout: Option<String>,
    #[serde(default = "default_accept_invalid_certs")]
    pub accept_invalid_certs: bool,
    pub admin_url: Option<Url>,
    pub soap_url: Option<Url>,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            timeout: None,
            accept_invalid_certs: default_accept_invalid_certs(),
            admin_url: None,
            soap_url: None,
        }
    }
}

fn default_accept_invalid_certs() -> bool {
    true
}

/// Credential values given on the command line; they win over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub hostname: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl SettingsFile {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Load `path` if it exists; a missing file yields empty settings so the
    /// command line alone can supply everything.
    pub fn load_optional(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load_from_path(path)
        } else {
            tracing::debug!(path = %path.display(), "config file not found, relying on command line");
            Ok(Self::default())
        }
    }

    pub fn into_client_config(self, overrides: Overrides) -> Result<ClientConfig> {
        let credentials = self.credentials;
        let hostname = required(overrides.hostname.or(credentials.hostname), "hostname", "--host")?;
        let username = required(overrides.username.or(credentials.username), "username", "--user")?;
        let password = required(overrides.password.or(credentials.password), "password", "--pass")?;
        let reports_path = self.reports.path.unwrap_or_else(|| PathBuf::from("."));
        let timeout = match self.http.timeout.as_deref() {
            Some(raw) => parse_timeout(raw)?,
            None => DEFAULT_TIMEOUT,
        };

        let mut config = ClientConfig::new(hostname, username, password, reports_path)
            .with_timeout(timeout)
            .with_accept_invalid_certs(self.http.accept_invalid_certs);
        if let Some(url) = self.http.admin_url {
            config = config.with_admin_url(url);
        }
        if let Some(url) = self.http.soap_url {
            config = config.with_soap_url(url);
        }
        Ok(config)
    }
}

fn required(value: Option<String>, key: &str, flag: &str) -> Result<String> {
    value
        .filter(|value| !value.is_empty())
        .ok_or_else(|| anyhow!("{key} is not configured (set credentials.{key} or pass {flag})"))
}

fn parse_timeout(raw: &str) -> Result<Duration> {
    humantime::parse_duration(raw).with_context(|| format!("invalid http.timeout `{raw}`"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
credentials:
  hostname: apg.example
  username: admin
  password: changeme
reports:
  path: ./reports
http:
  timeout: 90s
"#;

    #[test]
    fn parses_full_file() {
        let settings: SettingsFile = serde_yaml::from_str(SAMPLE).unwrap();
        let config = settings.into_client_config(Overrides::default()).unwrap();
        assert_eq!(config.hostname, "apg.example");
        assert_eq!(config.username, "admin");
        assert_eq!(config.reports_path, PathBuf::from("./reports"));
        assert_eq!(config.timeout, Duration::from_secs(90));
        assert!(config.accept_invalid_certs);
    }

    #[test]
    fn command_line_overrides_file_credentials() {
        let settings: SettingsFile = serde_yaml::from_str(SAMPLE).unwrap();
        let config = settings
            .into_client_config(Overrides {
                hostname: Some("other.example".into()),
                username: None,
                password: Some("s3cret".into()),
            })
            .unwrap();
        assert_eq!(config.hostname, "other.example");
        assert_eq!(config.username, "admin");
        assert_eq!(config.password, "s3cret");
    }

    #[test]
    fn missing_password_is_reported() {
        let settings: SettingsFile =
            serde_yaml::from_str("credentials:\n  hostname: h\n  username: u\n").unwrap();
        let err = settings
            .into_client_config(Overrides::default())
            .unwrap_err();
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let settings = SettingsFile::load_optional(temp.path().join("absent.yaml")).unwrap();
        assert!(settings.credentials.hostname.is_none());
        assert!(settings.http.accept_invalid_certs);
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let settings: SettingsFile = serde_yaml::from_str(
            "credentials: {hostname: h, username: u, password: p}\nhttp:\n  timeout: soon\n",
        )
        .unwrap();
        assert!(settings.into_client_config(Overrides::default()).is_err());
    }
}
