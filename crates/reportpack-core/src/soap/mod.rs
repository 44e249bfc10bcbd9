//! SOAP access to the management web service.

use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, error, trace, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::session::Credentials;

pub use envelope::Envelope;
pub use response::XmlElement;

mod envelope;
mod response;

pub const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const MANAGEMENT_NS: &str = "http://www.watch4net.com/APG/Management/MasterAccessorService";
pub const SOAP_CONTENT_TYPE: &str = "text/xml;charset=UTF-8";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListReportPack,
    GetReportPack,
    CreateReportPack,
    DeleteReportPack,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Self::ListReportPack => "listReportPack",
            Self::GetReportPack => "getReportPack",
            Self::CreateReportPack => "createReportPack",
            Self::DeleteReportPack => "deleteReportPack",
        }
    }

    pub fn response_name(self) -> &'static str {
        match self {
            Self::ListReportPack => "listReportPackResponse",
            Self::GetReportPack => "getReportPackResponse",
            Self::CreateReportPack => "createReportPackResponse",
            Self::DeleteReportPack => "deleteReportPackResponse",
        }
    }
}

/// Parsed reply to a SOAP call.
#[derive(Debug, Clone)]
pub struct SoapResponse {
    operation: Operation,
    document: XmlElement,
}

impl SoapResponse {
    /// Any element of the management namespace, searched depth-first.
    pub fn find(&self, name: &str) -> Option<&XmlElement> {
        self.document.find(MANAGEMENT_NS, name)
    }

    /// The `<operation>Response` wrapper, required for every call.
    pub fn result(&self) -> Result<&XmlElement> {
        let name = self.operation.response_name();
        self.find(name).ok_or_else(|| {
            error!(operation = self.operation.name(), "`{name}` element missing from response");
            Error::protocol(self.operation.name(), format!("`{name}` element missing"))
        })
    }
}

/// HTTP Basic authenticated transport for management envelopes.
pub struct SoapGateway {
    url: Url,
    authorization: String,
    http: Client,
}

impl SoapGateway {
    pub fn new(config: &ClientConfig, credentials: &Credentials) -> Result<Self> {
        let url = config.endpoints()?.soap().clone();
        if config.accept_invalid_certs {
            warn!(url = %url, "TLS certificate validation disabled for the SOAP gateway");
        }
        let http = Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .timeout(config.timeout)
            .build()
            .map_err(|err| Error::config(format!("failed to build SOAP HTTP client: {err}")))?;
        Ok(Self {
            url,
            authorization: credentials.basic_authorization(),
            http,
        })
    }

    pub fn call(&self, envelope: &Envelope) -> Result<SoapResponse> {
        let operation = envelope.operation();
        let body = envelope.to_xml()?;
        debug!(operation = operation.name(), url = %self.url, bytes = body.len(), "sending SOAP request");

        let response = self
            .http
            .post(self.url.clone())
            .header(CONTENT_TYPE, SOAP_CONTENT_TYPE)
            .header(AUTHORIZATION, self.authorization.as_str())
            .body(body)
            .send()
            .map_err(|err| self.connection_failed(err))?;
        let status = response.status();
        let bytes = response.bytes().map_err(|err| self.connection_failed(err))?;
        trace!(operation = operation.name(), %status, response = %String::from_utf8_lossy(&bytes), "SOAP response");

        let document = match XmlElement::parse(&bytes, operation.name()) {
            Ok(document) => document,
            Err(_) if !status.is_success() => {
                return Err(self.connection_failed(format!("HTTP status {status}")));
            }
            Err(err) => {
                error!(operation = operation.name(), error = %err, "unparseable SOAP response");
                return Err(err);
            }
        };

        if let Some(fault) = document.find(SOAP_ENV_NS, "Fault") {
            let code = fault.child("faultcode").map(|el| el.text.clone()).unwrap_or_default();
            let message = fault
                .child("faultstring")
                .map(|el| el.text.clone())
                .unwrap_or_default();
            error!(operation = operation.name(), %code, %message, "SOAP fault");
            return Err(Error::Fault { code, message });
        }
        if !status.is_success() {
            return Err(self.connection_failed(format!("HTTP status {status}")));
        }

        Ok(SoapResponse {
            operation,
            document,
        })
    }

    fn connection_failed(&self, reason: impl ToString) -> Error {
        let reason = reason.to_string();
        error!(url = %self.url, error = %reason, "connection failed");
        Error::connectivity(self.url.as_str(), reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_names_follow_operation_names() {
        for op in [
            Operation::ListReportPack,
            Operation::GetReportPack,
            Operation::CreateReportPack,
            Operation::DeleteReportPack,
        ] {
            assert_eq!(op.response_name(), format!("{}Response", op.name()));
        }
    }

    #[test]
    fn missing_result_is_protocol_error() {
        let document = XmlElement::parse(
            format!("<S:Envelope xmlns:S=\"{SOAP_ENV_NS}\"><S:Body/></S:Envelope>").as_bytes(),
            "test",
        )
        .unwrap();
        let response = SoapResponse {
            operation: Operation::CreateReportPack,
            document,
        };
        assert!(matches!(response.result(), Err(Error::Protocol { .. })));
    }
}
