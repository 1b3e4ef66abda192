//! `multipart/form-data` encoding for file uploads.
//!
//! A single file goes out under the field `file`; several files share the
//! repeated field `files`. Extra form values follow the files as plain text
//! fields, in the order given.

use uuid::Uuid;

/// One file to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FilePart {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }
}

/// One file or many; decides the form field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Files {
    One(FilePart),
    Many(Vec<FilePart>),
}

impl Files {
    pub fn field_name(&self) -> &'static str {
        match self {
            Files::One(_) => "file",
            Files::Many(_) => "files",
        }
    }

    pub fn parts(&self) -> &[FilePart] {
        match self {
            Files::One(part) => std::slice::from_ref(part),
            Files::Many(parts) => parts,
        }
    }
}

impl From<FilePart> for Files {
    fn from(part: FilePart) -> Self {
        Files::One(part)
    }
}

impl From<Vec<FilePart>> for Files {
    fn from(parts: Vec<FilePart>) -> Self {
        Files::Many(parts)
    }
}

/// An encoded form body plus the boundary that delimits it.
#[derive(Debug, Clone)]
pub struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn encode(files: &Files, additional_data: &[(String, String)]) -> Self {
        Self::with_boundary(
            format!("----claims-{}", Uuid::new_v4().simple()),
            files,
            additional_data,
        )
    }

    pub fn with_boundary(
        boundary: String,
        files: &Files,
        additional_data: &[(String, String)],
    ) -> Self {
        let mut body = Vec::new();
        let field = files.field_name();
        for part in files.parts() {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{field}\"; filename=\"{}\"\r\n",
                    escape_quoted(&part.file_name)
                )
                .as_bytes(),
            );
            body.extend_from_slice(
                format!("Content-Type: {}\r\n\r\n", header_value(&part.content_type)).as_bytes(),
            );
            body.extend_from_slice(&part.bytes);
            body.extend_from_slice(b"\r\n");
        }
        for (name, value) in additional_data {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                    escape_quoted(name)
                )
                .as_bytes(),
            );
            body.extend_from_slice(value.as_bytes());
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        Self { boundary, body }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

fn escape_quoted(value: &str) -> String {
    header_value(&value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Line breaks would end the part header early.
fn header_value(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}
