use crate::domain::model::DescriptorFields;
use crate::domain::ports::SchemaValidator;
use crate::utils::error::{ImportError, Result};
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

pub const DESCRIPTOR_FILE_PATTERN: &str = r"[0-9]{11}D[0-9]{6}T[0-9]{8}\.xml";

pub const DESCRIPTOR_NAMESPACE: &str = "urn:document-schema";
pub const ROOT_ELEMENT: &str = "Document";
pub const IDENTITY_ELEMENT: &str = "NISS";
pub const FILE_NAME_ELEMENT: &str = "FileName";
pub const IMPORT_TASK_ELEMENT: &str = "ImportTask";
pub const MIME_TYPE_ELEMENT: &str = "MimeType";

const FIELD_ELEMENTS: [&str; 4] = [
    IDENTITY_ELEMENT,
    FILE_NAME_ELEMENT,
    IMPORT_TASK_ELEMENT,
    MIME_TYPE_ELEMENT,
];

static DESCRIPTOR_FILE_NAME: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(&format!("^{}$", DESCRIPTOR_FILE_PATTERN)));

/// Checks the descriptor's file name before anything reads it.
/// Returns the file name on success.
pub fn validate_file_name(path: &Path) -> Result<&str> {
    let pattern = DESCRIPTOR_FILE_NAME
        .as_ref()
        .map_err(|e| ImportError::Unexpected {
            message: format!("Invalid descriptor pattern: {}", e),
        })?;
    let file_name = path.file_name().and_then(|name| name.to_str()).unwrap_or("");
    if pattern.is_match(file_name) {
        Ok(file_name)
    } else {
        Err(ImportError::InvalidFileName {
            file_name: file_name.to_string(),
            pattern: DESCRIPTOR_FILE_PATTERN.to_string(),
        })
    }
}

fn in_descriptor_namespace(ns: &ResolveResult) -> bool {
    matches!(ns, ResolveResult::Bound(Namespace(uri)) if *uri == DESCRIPTOR_NAMESPACE.as_bytes())
}

/// Structural stand-in for the descriptor XSD: one `Document` root in the
/// descriptor namespace holding at most one of each known text field.
#[derive(Debug, Clone, Default)]
pub struct DocumentSchemaValidator;

impl DocumentSchemaValidator {
    pub fn new() -> Self {
        Self
    }

    fn invalid(reason: impl Into<String>) -> ImportError {
        ImportError::SchemaInvalid {
            reason: reason.into(),
        }
    }
}

impl SchemaValidator for DocumentSchemaValidator {
    fn validate(&self, content: &str) -> Result<()> {
        let mut reader = NsReader::from_str(content);
        reader.trim_text(true);

        let mut depth = 0usize;
        let mut root_seen = false;
        let mut seen_fields: Vec<String> = Vec::new();

        loop {
            let (ns, event) = match reader.read_resolved_event() {
                Ok(resolved) => resolved,
                Err(e) => {
                    return Err(Self::invalid(format!(
                        "Error at position {}: {}",
                        reader.buffer_position(),
                        e
                    )))
                }
            };

            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let local = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    match depth {
                        0 => {
                            if root_seen {
                                return Err(Self::invalid("More than one root element"));
                            }
                            if local != ROOT_ELEMENT || !in_descriptor_namespace(&ns) {
                                return Err(Self::invalid(format!(
                                    "Root element must be {{{}}}{}, found {}",
                                    DESCRIPTOR_NAMESPACE, ROOT_ELEMENT, local
                                )));
                            }
                            root_seen = true;
                        }
                        1 => {
                            if !in_descriptor_namespace(&ns) || !FIELD_ELEMENTS.contains(&local.as_str()) {
                                return Err(Self::invalid(format!("Unexpected element {}", local)));
                            }
                            if seen_fields.contains(&local) {
                                return Err(Self::invalid(format!("Element {} appears twice", local)));
                            }
                            seen_fields.push(local);
                        }
                        _ => {
                            return Err(Self::invalid(format!(
                                "Element {} is nested too deep",
                                local
                            )))
                        }
                    }
                    // self-closing elements do not open a level
                    if matches!(event, Event::Start(_)) {
                        depth += 1;
                    }
                }
                Event::End(_) => depth = depth.saturating_sub(1),
                Event::Text(_) | Event::CData(_) if depth < 2 => {
                    return Err(Self::invalid("Text content outside of a field element"));
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !root_seen {
            return Err(Self::invalid("Document is empty"));
        }
        if depth != 0 {
            return Err(Self::invalid("Unclosed element at end of document"));
        }
        Ok(())
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.contains(['/', '\\']) && Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name)
}

/// Reads `/Document/{NISS,FileName,ImportTask,MimeType}` out of a descriptor.
pub struct FieldExtractor;

impl FieldExtractor {
    /// All four fields or nothing: the first absent (or blank) one is reported.
    pub fn extract(content: &str) -> Result<DescriptorFields> {
        let mut values = Self::collect_values(content)?;
        let mut take = |element: &str| {
            values
                .remove(element)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| ImportError::MalformedDescriptor {
                    field: element.to_string(),
                })
        };

        let fields = DescriptorFields {
            identity: take(IDENTITY_ELEMENT)?,
            payload_file_name: take(FILE_NAME_ELEMENT)?,
            task_code: take(IMPORT_TASK_ELEMENT)?,
            mime_type: take(MIME_TYPE_ELEMENT)?,
        };

        // the payload must sit next to the descriptor
        if !is_plain_file_name(&fields.payload_file_name) {
            return Err(ImportError::MalformedDescriptor {
                field: FILE_NAME_ELEMENT.to_string(),
            });
        }
        Ok(fields)
    }

    fn collect_values(content: &str) -> Result<HashMap<String, String>> {
        let mut reader = NsReader::from_str(content);
        reader.trim_text(true);

        let mut path: Vec<(bool, String)> = Vec::new();
        let mut values: HashMap<String, String> = HashMap::new();

        loop {
            match reader.read_resolved_event()? {
                (ns, Event::Start(e)) => {
                    let local = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    path.push((in_descriptor_namespace(&ns), local));
                }
                (_, Event::End(_)) => {
                    path.pop();
                }
                (_, Event::Text(text)) => {
                    if let Some(field) = Self::field_at(&path) {
                        values
                            .entry(field.to_string())
                            .or_default()
                            .push_str(&text.unescape()?);
                    }
                }
                (_, Event::CData(data)) => {
                    if let Some(field) = Self::field_at(&path) {
                        values
                            .entry(field.to_string())
                            .or_default()
                            .push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                (_, Event::Eof) => break,
                _ => {}
            }
        }

        Ok(values)
    }

    fn field_at(path: &[(bool, String)]) -> Option<&str> {
        match path {
            [(true, root), (true, field)] if root == ROOT_ELEMENT => Some(field.as_str()),
            _ => None,
        }
    }
}
