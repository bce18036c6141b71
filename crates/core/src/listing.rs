//! Directory listing model
//!
//! Describes a listing request, the path and action it is signed over, and
//! the decoded result.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Usage API version sent with every action
pub const API_VERSION: &str = "1";

/// Default page size when the caller does not pick one
pub const DEFAULT_MAX_ENTRIES: u32 = 100;

/// Parameters of one listing call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    /// Account (CP) code every path is rooted at
    pub account_code: u32,

    /// Storage group, used to build the upload host name
    pub storage_group: String,

    /// Directory to list, relative to the account root
    pub path: String,

    /// Continuation token from a previous truncated listing
    pub resume: Option<String>,

    /// Maximum number of entries the server should return
    pub max_entries: u32,
}

impl ListRequest {
    /// List the root of an account in a storage group
    pub fn new(account_code: u32, storage_group: impl Into<String>) -> Self {
        Self {
            account_code,
            storage_group: storage_group.into(),
            path: String::new(),
            resume: None,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }

    /// Set the directory to list
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Continue from a resume token
    pub fn resume(mut self, token: impl Into<String>) -> Self {
        self.resume = Some(token.into());
        self
    }

    /// Set the page size
    pub fn max_entries(mut self, max_entries: u32) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Action string for a list call
    pub fn action(&self) -> String {
        format!(
            "version={API_VERSION}&action=list&format=xml&max_entries={}",
            self.max_entries
        )
    }

    /// Path the request is sent to and signed over.
    ///
    /// A non-empty resume token is used verbatim and has to be an absolute
    /// path such as `/123/dir/file`. Otherwise the path is rooted at the
    /// account code with a single leading `/` removed.
    pub fn relative_path(&self) -> String {
        match self.resume.as_deref() {
            Some(token) if !token.is_empty() => token.to_string(),
            _ => {
                let path = self.path.strip_prefix('/').unwrap_or(&self.path);
                format!("/{}/{}", self.account_code, path)
            }
        }
    }

    /// Host serving the usage API for this storage group
    pub fn host(&self, domain: &str) -> String {
        format!("{}-nsu.{}", self.storage_group, domain)
    }
}

/// Type of a listed entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    /// Any type this client does not know about
    Other(String),
}

impl EntryKind {
    pub fn as_str(&self) -> &str {
        match self {
            EntryKind::File => "file",
            EntryKind::Dir => "dir",
            EntryKind::Symlink => "symlink",
            EntryKind::Other(s) => s,
        }
    }
}

impl From<String> for EntryKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "file" => EntryKind::File,
            "dir" => EntryKind::Dir,
            "symlink" => EntryKind::Symlink,
            _ => EntryKind::Other(s),
        }
    }
}

impl From<EntryKind> for String {
    fn from(kind: EntryKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Entry type
    #[serde(rename = "type")]
    pub kind: EntryKind,

    /// Full path of the entry as reported by the server
    pub name: String,

    /// Size in bytes (0 when not reported)
    pub size: u64,

    /// Hex MD5 digest (empty when not reported)
    pub md5: String,

    /// Modification time in unix seconds
    pub mtime: i64,
}

impl FileEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }

    /// Modification time, if it is a representable timestamp
    pub fn modified(&self) -> Option<jiff::Timestamp> {
        jiff::Timestamp::from_second(self.mtime).ok()
    }
}

/// Result of a listing call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResult {
    /// Entries in server order
    pub entries: Vec<FileEntry>,

    /// Continuation token; empty when the listing is complete
    #[serde(default)]
    pub resume: String,
}

impl ListResult {
    /// Whether more entries are available
    pub fn is_truncated(&self) -> bool {
        !self.resume.is_empty()
    }

    /// Token to continue a truncated listing
    pub fn resume_token(&self) -> Option<&str> {
        if self.resume.is_empty() {
            None
        } else {
            Some(&self.resume)
        }
    }

    /// Request for the next page, or `None` when there is nothing left
    pub fn next_request(&self, previous: &ListRequest) -> Option<ListRequest> {
        self.resume_token()
            .map(|token| previous.clone().resume(token))
    }
}
