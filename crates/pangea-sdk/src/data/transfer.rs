use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// How file bytes travel between the caller, the service and object storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransferMethod {
    /// Bytes ride along with the JSON request in one `multipart/form-data` POST.
    Multipart,
    /// Presigned POST: form fields first, then the file.
    PostUrl,
    /// Presigned PUT: raw body.
    PutUrl,
    /// The service fetches the bytes from a URL itself.
    SourceUrl,
    /// The service writes the bytes to a URL itself.
    DestUrl,
}

impl TransferMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferMethod::Multipart => "multipart",
            TransferMethod::PostUrl => "post-url",
            TransferMethod::PutUrl => "put-url",
            TransferMethod::SourceUrl => "source-url",
            TransferMethod::DestUrl => "dest-url",
        }
    }

    /// Whether the caller sends the bytes itself.
    pub fn is_outgoing_upload(&self) -> bool {
        matches!(self, TransferMethod::Multipart | TransferMethod::PostUrl | TransferMethod::PutUrl)
    }

    /// Whether the bytes go to a presigned storage URL instead of the service host.
    pub fn is_presigned(&self) -> bool {
        matches!(self, TransferMethod::PostUrl | TransferMethod::PutUrl)
    }
}

impl fmt::Display for TransferMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for TransferMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multipart" => Ok(TransferMethod::Multipart),
            "post-url" => Ok(TransferMethod::PostUrl),
            "put-url" => Ok(TransferMethod::PutUrl),
            "source-url" => Ok(TransferMethod::SourceUrl),
            "dest-url" => Ok(TransferMethod::DestUrl),
            other => Err(format!("unknown transfer method: {other}")),
        }
    }
}

/// A caller-owned stream plus the metadata needed to upload it.
///
/// The stream is borrowed for the duration of a call: the SDK seeks it but
/// never closes it, and always leaves it at the offset it was handed over at.
pub struct FileData<R> {
    pub reader:      R,
    /// Logical file name sent as the `filename` of the file part.
    pub name:        String,
    /// Presigned POST form fields, in the order the storage backend expects.
    pub form_fields: Vec<(String, String)>,
}

impl<R: Read + Seek> FileData<R> {
    pub fn new(reader: R, name: impl Into<String>) -> Self {
        Self {
            reader,
            name: name.into(),
            form_fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn form_fields(mut self, fields: Vec<(String, String)>) -> Self {
        self.form_fields = fields;
        self
    }

    /// Read from the current offset to EOF, then seek back.
    pub fn read_all(&mut self) -> io::Result<Bytes> {
        let start = self.reader.stream_position()?;
        let mut buf = Vec::new();
        self.reader.read_to_end(&mut buf)?;
        self.reader.seek(SeekFrom::Start(start))?;
        Ok(Bytes::from(buf))
    }
}

impl<R> fmt::Debug for FileData<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileData")
            .field("name", &self.name)
            .field("form_fields", &self.form_fields)
            .field("reader", &"{ ... }")
            .finish()
    }
}
