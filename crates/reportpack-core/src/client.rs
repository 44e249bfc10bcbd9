use std::fs;
use std::path::PathBuf;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, error, info, warn};

use crate::admin::{REPORTS_RESOURCE, parse_pinned};
use crate::archive::ARCHIVE_EXTENSION;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::facade::RemoteObjects;
use crate::model::{ReportPackSummary, StoredReportPack, parse_id, sort_by_id};
use crate::session::Session;
use crate::soap::{Envelope, Operation, SoapGateway, SoapResponse, XmlElement};

/// Talks to both web tiers of the platform: the cookie-authenticated admin
/// pages and the Basic-authenticated SOAP gateway.
pub struct RemoteClient {
    session: Session,
    gateway: SoapGateway,
    reports_path: PathBuf,
}

impl RemoteClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let session = Session::new(config)?;
        let gateway = SoapGateway::new(config, session.credentials())?;
        Ok(Self {
            session,
            gateway,
            reports_path: config.reports_path.clone(),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    fn call(&mut self, envelope: Envelope) -> Result<SoapResponse> {
        let result = self.gateway.call(&envelope);
        if let Err(err) = &result {
            if err.is_connectivity() {
                self.session.invalidate();
            }
        }
        result
    }
}

impl RemoteObjects for RemoteClient {
    fn list_pinned(&mut self) -> Result<Vec<ReportPackSummary>> {
        if let Err(err) = self.session.ensure_authenticated() {
            warn!(error = %err, "requesting admin page without an authenticated session");
        }

        let url = self.session.endpoints().admin(REPORTS_RESOURCE)?;
        let fetched = self
            .session
            .http()
            .get(url.clone())
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.text());
        let page = match fetched {
            Ok(page) => page,
            Err(err) => {
                error!(url = %url, error = %err, "connection failed");
                self.session.invalidate();
                return Err(Error::connectivity(url.as_str(), err));
            }
        };

        let packs = parse_pinned(&page)?;
        debug!(?packs, "complete list of pinned report packs");
        Ok(packs)
    }

    fn list_all(&mut self) -> Result<Vec<ReportPackSummary>> {
        let operation = Operation::ListReportPack;
        let response = self.call(Envelope::new(operation))?;
        let mut packs = response
            .result()?
            .children
            .iter()
            .map(|row| summary_from(row, operation))
            .collect::<Result<Vec<_>>>()?;
        sort_by_id(&mut packs);
        debug!(?packs, "complete list of report packs");
        Ok(packs)
    }

    fn fetch(&mut self, id: u64, name: &str) -> Result<PathBuf> {
        let operation = Operation::GetReportPack;
        let file_name = archive_file_name(name, operation)?;
        let response = self.call(Envelope::new(operation).with_reference(id, name))?;
        let file = response.find("file").ok_or_else(|| {
            error!(id, name, "report pack file not downloaded");
            Error::protocol(operation.name(), "`file` element missing")
        })?;
        let bytes = decode_payload(&file.text)
            .map_err(|err| Error::protocol(operation.name(), format!("invalid base64 payload: {err}")))?;

        fs::create_dir_all(&self.reports_path).map_err(|err| Error::io(&self.reports_path, err))?;
        let path = self.reports_path.join(file_name);
        info!(name, file = %path.display(), bytes = bytes.len(), "downloading report pack");
        fs::write(&path, bytes).map_err(|err| Error::io(&path, err))?;
        Ok(path)
    }

    fn store(&mut self, archive: &[u8]) -> Result<StoredReportPack> {
        let operation = Operation::CreateReportPack;
        let encoded = STANDARD.encode(archive);
        let response = self.call(Envelope::new(operation).with_file(encoded))?;
        let created = response.result()?.first_child().ok_or_else(|| {
            error!("report pack not uploaded");
            Error::protocol(operation.name(), "response carries no report pack")
        })?;
        let summary = summary_from(created, operation)?;
        info!(id = summary.id, name = %summary.name, "report pack uploaded");
        Ok(StoredReportPack {
            id: summary.id,
            name: summary.name,
        })
    }

    fn delete(&mut self, id: u64, name: &str) -> Result<u64> {
        let operation = Operation::DeleteReportPack;
        let response = self.call(Envelope::new(operation).with_reference(id, name))?;
        response.result()?;
        info!(id, name, "report pack deleted");
        Ok(id)
    }
}

fn summary_from(element: &XmlElement, operation: Operation) -> Result<ReportPackSummary> {
    let attribute = |key: &str| {
        element.attribute(key).ok_or_else(|| {
            Error::protocol(
                operation.name(),
                format!("`{}` element has no `{key}` attribute", element.name),
            )
        })
    };
    let id = parse_id(attribute("id")?, operation.name())?;
    Ok(ReportPackSummary::new(id, attribute("name")?))
}

/// Local file name for a downloaded pack; names that would escape the reports
/// directory are refused.
fn archive_file_name(name: &str, operation: Operation) -> Result<String> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(Error::protocol(
            operation.name(),
            format!("report pack name `{name}` cannot be used as a file name"),
        ));
    }
    Ok(format!("{name}.{ARCHIVE_EXTENSION}"))
}

fn decode_payload(text: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    let compact: String = text.chars().filter(|ch| !ch.is_ascii_whitespace()).collect();
    STANDARD.decode(compact)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_payloads_decode() {
        assert_eq!(decode_payload("UEsD\n  BBQA\r\n").unwrap(), b"PK\x03\x04\x14\x00");
    }

    #[test]
    fn path_like_names_are_refused() {
        assert!(archive_file_name("../etc", Operation::GetReportPack).is_err());
        assert!(archive_file_name("a\\b", Operation::GetReportPack).is_err());
        assert_eq!(
            archive_file_name("Exchange", Operation::GetReportPack).unwrap(),
            "Exchange.arp"
        );
    }

    #[test]
    fn rows_need_id_and_name() {
        let row = XmlElement {
            name: "report-pack".into(),
            attributes: vec![("id".into(), "4".into())],
            ..Default::default()
        };
        assert!(matches!(
            summary_from(&row, Operation::ListReportPack),
            Err(Error::Protocol { .. })
        ));
    }
}
