//!
//! flatcms document store
//! -----------------------
//! A flat directory of named files. Every document is a single file whose name
//! (extension included) is the document name; there is no metadata, index or
//! history next to it. The render mode of a document is inferred from its name.
//!
//! Writes go straight to the filesystem. Two concurrent writers to the same
//! name race at the OS level and the last one to write wins; nothing here
//! serializes them.

use std::borrow::Cow;
use std::{fs, io, path::{Path, PathBuf}};

use pulldown_cmark::{html, Options, Parser};
use serde::Serialize;
use tracing::debug;

use crate::error::{AppError, AppResult};

/// Inline message used when a create request carries no name.
pub const NAME_REQUIRED: &str = "A name is required";

/// Rendering mode of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Markdown,
    PlainText,
}

impl Kind {
    /// Infer the kind from a document name.
    ///
    /// The name is split on `.` and the token following the first dot is the
    /// extension token, so `about.md` is Markdown and `notes.txt`, `README` or
    /// `about.markdown` are plain text.
    pub fn from_name(name: &str) -> Self {
        match name.split('.').nth(1) {
            Some("md") => Kind::Markdown,
            _ => Kind::PlainText,
        }
    }
}

/// A document loaded from disk. Content is kept as the raw bytes of the file;
/// nothing requires it to be UTF-8.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub name: String,
    pub content: Vec<u8>,
    pub kind: Kind,
}

impl Document {
    /// Content as text, with invalid UTF-8 sequences replaced.
    pub fn text(&self) -> Cow<'_, str> { String::from_utf8_lossy(&self.content) }
}

/// Output of [`render`]. The HTTP layer picks the content type from the variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Html(String),
    PlainText(Vec<u8>),
}

/// Render document content for display. Plain text comes back byte for byte.
pub fn render(content: &[u8], kind: Kind) -> Rendered {
    match kind {
        Kind::Markdown => {
            let text = String::from_utf8_lossy(content);
            let mut options = Options::empty();
            options.insert(Options::ENABLE_TABLES);
            options.insert(Options::ENABLE_STRIKETHROUGH);
            let parser = Parser::new_ext(&text, options);
            let mut out = String::with_capacity(text.len() + text.len() / 2);
            html::push_html(&mut out, parser);
            Rendered::Html(out)
        }
        Kind::PlainText => Rendered::PlainText(content.to_vec()),
    }
}

/// Check that a name can be used to create a document.
///
/// A document name must map to exactly one file directly inside the storage
/// directory, so separators and the `.`/`..` pseudo-entries are refused.
pub fn validate_name(name: &str) -> AppResult<()> {
    if name.is_empty() {
        return Err(AppError::validation(NAME_REQUIRED));
    }
    if name == "." || name == ".." || name.contains(|c: char| matches!(c, '/' | '\\' | '\0')) {
        return Err(AppError::validation(format!("{name} is not a valid document name")));
    }
    Ok(())
}

/// Handle on the storage directory.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open<P: AsRef<Path>>(root: P) -> AppResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, name: &str) -> PathBuf { self.root.join(name) }

    /// All entry names in the storage directory, sorted.
    pub fn list(&self) -> AppResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => debug!(target: "flatcms::documents", "skipping non-utf8 entry {:?}", raw),
            }
        }
        names.sort();
        Ok(names)
    }

    /// True iff `name` is exactly one of the names returned by [`list`](Self::list).
    pub fn exists(&self, name: &str) -> AppResult<bool> {
        Ok(self.list()?.iter().any(|n| n == name))
    }

    fn ensure_exists(&self, name: &str) -> AppResult<()> {
        if self.exists(name)? { Ok(()) } else { Err(AppError::not_found(name)) }
    }

    pub fn read(&self, name: &str) -> AppResult<Document> {
        self.ensure_exists(name)?;
        let content = fs::read(self.path_for(name))?;
        Ok(Document { name: name.to_string(), kind: Kind::from_name(name), content })
    }

    /// Write a new document. An existing document with the same name is
    /// overwritten without complaint.
    pub fn create(&self, name: &str, content: impl AsRef<[u8]>) -> AppResult<()> {
        let content = content.as_ref();
        validate_name(name)?;
        fs::write(self.path_for(name), content)?;
        debug!(target: "flatcms::documents", "create: name='{}' bytes={}", name, content.len());
        Ok(())
    }

    /// Replace the full content of an existing document.
    pub fn update(&self, name: &str, content: impl AsRef<[u8]>) -> AppResult<()> {
        let content = content.as_ref();
        self.ensure_exists(name)?;
        fs::write(self.path_for(name), content)?;
        debug!(target: "flatcms::documents", "update: name='{}' bytes={}", name, content.len());
        Ok(())
    }

    pub fn delete(&self, name: &str) -> AppResult<()> {
        self.ensure_exists(name)?;
        match fs::remove_file(self.path_for(name)) {
            Ok(()) => {}
            // Removed by someone else between the check and here.
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(AppError::not_found(name)),
            Err(e) => return Err(e.into()),
        }
        debug!(target: "flatcms::documents", "delete: name='{}'", name);
        Ok(())
    }
}

#[cfg(test)]
#[path = "documents_tests.rs"]
mod documents_tests;
