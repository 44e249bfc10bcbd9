use std::fs;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::{Reader, Writer};

use crate::error::{Error, Result};

const INDENT: usize = 2;

/// Re-indent an XML document.
///
/// Only element-only content is re-indented. An element holding non-blank
/// text or CDATA keeps its whole subtree byte for byte, so padded values and
/// mixed content survive. CDATA sections, comments, processing instructions
/// and the DOCTYPE are copied verbatim. Entity references stay unexpanded, so
/// external entities are never fetched or inlined.
pub fn pretty_print(input: &[u8], context: &str) -> Result<Vec<u8>> {
    let events = read_events(input, context)?;
    let verbatim = text_bearing_elements(&events);

    let mut writer = Writer::new(Vec::with_capacity(input.len()));
    let mut stack: Vec<Frame> = Vec::new();
    let mut started = false;
    for (index, event) in events.into_iter().enumerate() {
        if stack.last().is_some_and(|frame| frame.verbatim) {
            match &event {
                Event::Start(_) => stack.push(Frame::verbatim()),
                Event::End(_) => {
                    stack.pop();
                }
                _ => {}
            }
            write(&mut writer, event, context)?;
            continue;
        }

        match event {
            Event::Text(ref text) if is_blank(text) => {}
            Event::End(_) => {
                if stack.pop().is_some_and(|frame| frame.has_children) {
                    line_break(&mut writer, stack.len());
                }
                write(&mut writer, event, context)?;
            }
            event => {
                if let Some(parent) = stack.last_mut() {
                    parent.has_children = true;
                }
                if started {
                    line_break(&mut writer, stack.len());
                }
                started = true;
                let opens = matches!(event, Event::Start(_));
                write(&mut writer, event, context)?;
                if opens {
                    stack.push(Frame {
                        verbatim: verbatim[index],
                        has_children: false,
                    });
                }
            }
        }
    }

    let mut output = writer.into_inner();
    output.push(b'\n');
    Ok(output)
}

struct Frame {
    verbatim: bool,
    has_children: bool,
}

impl Frame {
    fn verbatim() -> Self {
        Self {
            verbatim: true,
            has_children: false,
        }
    }
}

fn read_events(input: &[u8], context: &str) -> Result<Vec<Event<'static>>> {
    let mut reader = Reader::from_reader(input);
    let mut events = Vec::new();
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut saw_root = false;
    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|err| Error::xml(context, format!("{err} at byte {}", reader.buffer_position())))?;
        match &event {
            Event::Eof => break,
            Event::Start(_) => {
                depth += 1;
                saw_root = true;
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Empty(_) => saw_root = true,
            _ => {}
        }
        events.push(event.into_owned());
        buf.clear();
    }

    if depth != 0 {
        return Err(Error::xml(context, "unexpected end of document inside an element"));
    }
    if !saw_root {
        return Err(Error::xml(context, "document has no root element"));
    }
    Ok(events)
}

/// Marks every `Start` event whose element directly holds non-blank text or
/// CDATA.
fn text_bearing_elements(events: &[Event<'_>]) -> Vec<bool> {
    let mut marks = vec![false; events.len()];
    let mut open = Vec::new();
    for (index, event) in events.iter().enumerate() {
        match event {
            Event::Start(_) => open.push(index),
            Event::End(_) => {
                open.pop();
            }
            Event::Text(text) if !is_blank(text) => {
                if let Some(&start) = open.last() {
                    marks[start] = true;
                }
            }
            Event::CData(_) => {
                if let Some(&start) = open.last() {
                    marks[start] = true;
                }
            }
            _ => {}
        }
    }
    marks
}

fn is_blank(text: &[u8]) -> bool {
    text.iter().all(u8::is_ascii_whitespace)
}

fn line_break(writer: &mut Writer<Vec<u8>>, depth: usize) {
    let out = writer.get_mut();
    out.push(b'\n');
    out.extend(std::iter::repeat_n(b' ', depth * INDENT));
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>, context: &str) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|err| Error::xml(context, err))
}

/// Pretty-print `path` in place.
pub fn pretty_print_file(path: &Path) -> Result<()> {
    let input = fs::read(path).map_err(|err| Error::io(path, err))?;
    let output = pretty_print(&input, &path.display().to_string())?;
    fs::write(path, output).map_err(|err| Error::io(path, err))
}
