//! Form bodies
//!
//! Fields keep their insertion order and a name may repeat; files are read
//! into memory when attached so a request can be sent more than once.

use indexmap::IndexMap;

/// A form field holding one value or several for a repeated name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Single(String),
    Multiple(Vec<String>),
}

impl FieldValue {
    pub fn values(&self) -> Vec<&str> {
        match self {
            FieldValue::Single(v) => vec![v.as_str()],
            FieldValue::Multiple(vs) => vs.iter().map(String::as_str).collect(),
        }
    }
}

/// A file to be uploaded with a multipart form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    /// Form field name
    pub field: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Form fields and files collected by request steps
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    fields: IndexMap<String, FieldValue>,
    files: Vec<FileAttachment>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field; a second value under the same name turns it into a list
    pub fn add_field(&mut self, name: &str, value: &str) {
        match self.fields.get_mut(name) {
            Some(FieldValue::Multiple(values)) => values.push(value.to_string()),
            Some(FieldValue::Single(first)) => {
                let first = std::mem::take(first);
                self.fields.insert(
                    name.to_string(),
                    FieldValue::Multiple(vec![first, value.to_string()]),
                );
            }
            None => {
                self.fields
                    .insert(name.to_string(), FieldValue::Single(value.to_string()));
            }
        }
    }

    /// Attach a file; the same field name replaces an earlier file
    pub fn add_file(&mut self, file: FileAttachment) {
        self.files.retain(|existing| existing.field != file.field);
        self.files.push(file);
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Fields flattened to (name, value) pairs, repeated names included
    pub fn pairs(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .flat_map(|(name, value)| {
                value
                    .values()
                    .into_iter()
                    .map(move |v| (name.clone(), v.to_string()))
            })
            .collect()
    }

    pub fn files(&self) -> &[FileAttachment] {
        &self.files
    }

    pub fn has_files(&self) -> bool {
        !self.files.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.files.is_empty()
    }

    /// `application/x-www-form-urlencoded` text of the fields
    pub fn to_urlencoded(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (name, value) in self.pairs() {
            serializer.append_pair(&name, &value);
        }
        serializer.finish()
    }
}
