use std::io::Write;

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use super::{MANAGEMENT_NS, Operation, SOAP_ENV_NS};
use crate::error::{Error, Result};

/// SOAP 1.1 request for one management operation.
///
/// Every operation shares the same envelope; only the operation element and
/// its optional `report-pack` child vary. Attribute values and the file payload
/// are escaped by the XML writer, so names coming from the server or the user
/// cannot alter the document structure.
#[derive(Debug, Clone)]
pub struct Envelope {
    operation: Operation,
    report_pack: Option<ReportPackElement>,
}

#[derive(Debug, Clone, Default)]
struct ReportPackElement {
    attributes: Vec<(&'static str, String)>,
    file: Option<String>,
}

impl Envelope {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            report_pack: None,
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Address an existing report pack by id and name.
    pub fn with_reference(mut self, id: u64, name: &str) -> Self {
        let element = self.report_pack.get_or_insert_with(Default::default);
        element.attributes.push(("id", id.to_string()));
        element.attributes.push(("name", name.to_string()));
        self
    }

    /// Attach a base64-encoded archive.
    pub fn with_file(mut self, encoded: String) -> Self {
        self.report_pack
            .get_or_insert_with(Default::default)
            .file = Some(encoded);
        self
    }

    pub fn to_xml(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());

        let mut envelope = BytesStart::new("soapenv:Envelope");
        envelope.push_attribute(("xmlns:soapenv", SOAP_ENV_NS));
        emit(&mut writer, Event::Start(envelope))?;
        emit(&mut writer, Event::Empty(BytesStart::new("soapenv:Header")))?;
        emit(&mut writer, Event::Start(BytesStart::new("soapenv:Body")))?;

        let mut operation = BytesStart::new(self.operation.name());
        operation.push_attribute(("xmlns", MANAGEMENT_NS));
        match &self.report_pack {
            None => emit(&mut writer, Event::Empty(operation))?,
            Some(report_pack) => {
                emit(&mut writer, Event::Start(operation))?;
                write_report_pack(&mut writer, report_pack)?;
                emit(&mut writer, Event::End(BytesEnd::new(self.operation.name())))?;
            }
        }

        emit(&mut writer, Event::End(BytesEnd::new("soapenv:Body")))?;
        emit(&mut writer, Event::End(BytesEnd::new("soapenv:Envelope")))?;
        Ok(writer.into_inner())
    }
}

fn write_report_pack<W: Write>(writer: &mut Writer<W>, element: &ReportPackElement) -> Result<()> {
    let mut start = BytesStart::new("report-pack");
    for (key, value) in &element.attributes {
        start.push_attribute((*key, value.as_str()));
    }
    match &element.file {
        None => emit(writer, Event::Empty(start)),
        Some(encoded) => {
            emit(writer, Event::Start(start))?;
            emit(writer, Event::Start(BytesStart::new("file")))?;
            emit(writer, Event::Text(BytesText::new(encoded)))?;
            emit(writer, Event::End(BytesEnd::new("file")))?;
            emit(writer, Event::End(BytesEnd::new("report-pack")))
        }
    }
}

fn emit<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|err| Error::xml("SOAP request", err))
}
