use quick_xml::NsReader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};

use crate::error::{Error, Result};

/// Namespace-resolved element tree of a SOAP response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub namespace: Option<String>,
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    pub text: String,
}

impl XmlElement {
    /// Parse a whole document; `context` names it in error messages.
    pub fn parse(bytes: &[u8], context: &str) -> Result<Self> {
        let text = std::str::from_utf8(bytes).map_err(|err| Error::xml(context, err))?;
        let mut reader = NsReader::from_str(text);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root = None;
        loop {
            let (resolved, event) = reader
                .read_resolved_event()
                .map_err(|err| Error::xml(context, err))?;
            let namespace = match resolved {
                ResolveResult::Bound(Namespace(ns)) => Some(String::from_utf8_lossy(ns).into_owned()),
                _ => None,
            };
            match event {
                Event::Start(start) => stack.push(element_from(&start, namespace, context)?),
                Event::Empty(start) => {
                    let element = element_from(&start, namespace, context)?;
                    attach(&mut stack, &mut root, element);
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| Error::xml(context, "unbalanced end tag"))?;
                    attach(&mut stack, &mut root, element);
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        let unescaped = text.unescape().map_err(|err| Error::xml(context, err))?;
                        current.text.push_str(&unescaped);
                    }
                }
                Event::CData(cdata) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&cdata.into_inner()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }
        if !stack.is_empty() {
            return Err(Error::xml(context, "document ended inside an element"));
        }
        root.ok_or_else(|| Error::xml(context, "document has no root element"))
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is(&self, namespace: &str, name: &str) -> bool {
        self.name == name && self.namespace.as_deref() == Some(namespace)
    }

    /// Depth-first search of this element and its descendants.
    pub fn find(&self, namespace: &str, name: &str) -> Option<&XmlElement> {
        if self.is(namespace, name) {
            return Some(self);
        }
        self.children
            .iter()
            .find_map(|child| child.find(namespace, name))
    }

    /// Direct child by local name, whatever its namespace.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn first_child(&self) -> Option<&XmlElement> {
        self.children.first()
    }
}

fn element_from(start: &BytesStart<'_>, namespace: Option<String>, context: &str) -> Result<XmlElement> {
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|err| Error::xml(context, err))?;
        let raw_key = attr.key.as_ref();
        if raw_key == b"xmlns" || raw_key.starts_with(b"xmlns:") {
            continue;
        }
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| Error::xml(context, err))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(XmlElement {
        namespace,
        name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
        attributes,
        children: Vec::new(),
        text: String::new(),
    })
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0"?>
        <S:Envelope xmlns:S="http://schemas.xmlsoap.org/soap/envelope/">
          <S:Body>
            <ns2:listReportPackResponse xmlns:ns2="urn:test">
              <ns2:report-pack id="3" name="Storage &amp; SAN"/>
              <ns2:report-pack id="1" name="Exchange"/>
            </ns2:listReportPackResponse>
          </S:Body>
        </S:Envelope>"#;

    #[test]
    fn resolves_prefixed_namespaces() {
        let root = XmlElement::parse(DOC.as_bytes(), "test").unwrap();
        assert!(root.is("http://schemas.xmlsoap.org/soap/envelope/", "Envelope"));
        let response = root.find("urn:test", "listReportPackResponse").unwrap();
        assert_eq!(response.children.len(), 2);
        assert_eq!(response.children[0].attribute("name"), Some("Storage & SAN"));
        assert!(root.find("urn:other", "listReportPackResponse").is_none());
    }

    #[test]
    fn collects_text_and_cdata() {
        let root =
            XmlElement::parse(b"<a><file>QUJD</file><raw><![CDATA[x<y]]></raw></a>", "test").unwrap();
        assert_eq!(root.child("file").unwrap().text, "QUJD");
        assert_eq!(root.child("raw").unwrap().text, "x<y");
    }

    #[test]
    fn rejects_mismatched_tags() {
        let err = XmlElement::parse(b"<a><b></a>", "test").unwrap_err();
        assert!(matches!(err, Error::Xml { .. }));
    }

    #[test]
    fn rejects_empty_documents() {
        assert!(XmlElement::parse(b"", "test").is_err());
    }
}
