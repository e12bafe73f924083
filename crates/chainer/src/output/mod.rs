// ABOUTME: Document assembler: the HTML envelope around chapter records and the deferred notes sink.
// ABOUTME: The output file is append-only; notes collected for the end are streamed through a temp file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::ChainError;

/// Blank paragraph written after every record.
pub const SPACER: &str = "<p>&nbsp;</p>\n";

/// Closing envelope.
pub const FOOTER: &str = "\n</body>\n</html>";

/// Opening envelope for a document titled `name`.
pub fn header(name: &str) -> String {
    format!(
        "<html>\n<head>\n<title>{}</title>\n<meta content='text/html; charset=UTF-8' http-equiv='Content-Type'>\n</head>\n<body>\n",
        html_escape::encode_text(name)
    )
}

/// One page's output unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterRecord {
    /// 1-based position in the chain.
    pub seq: u64,
    /// Plain-text title.
    pub title: String,
    /// Cleaned title fragment.
    pub title_html: String,
    /// Cleaned content fragment.
    pub content_html: String,
    pub is_notes: bool,
}

impl ChapterRecord {
    /// Serialized block: optional title fragment, content, spacer.
    pub fn render(&self, title_separate: bool) -> String {
        let mut out = String::with_capacity(
            self.title_html.len() + self.content_html.len() + SPACER.len(),
        );
        if title_separate {
            out.push_str(&self.title_html);
        }
        out.push_str(&self.content_html);
        out.push_str(SPACER);
        out
    }
}

/// Where a record goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Main,
    /// The deferred notes sink, merged before the footer.
    Notes,
}

/// Deferred notes on disk; the file is removed when this is dropped.
#[derive(Debug)]
struct NotesSink {
    path: PathBuf,
    file: File,
    records: usize,
}

impl Drop for NotesSink {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %err, "could not remove notes file");
            }
        }
    }
}

/// The output document being assembled.
#[derive(Debug)]
pub struct OutputDocument {
    path: PathBuf,
    file: File,
    notes: Option<NotesSink>,
    title_separate: bool,
}

impl OutputDocument {
    /// Replaces any file at `path`, writes the header and opens the notes
    /// sink when `notes_path` is given.
    pub fn create(
        path: &Path,
        name: &str,
        notes_path: Option<&Path>,
        title_separate: bool,
    ) -> Result<Self, ChainError> {
        let mut file = open_fresh(path)?;
        write_all(&mut file, path, header(name).as_bytes())?;

        let notes = match notes_path {
            Some(notes_path) => Some(NotesSink {
                path: notes_path.to_path_buf(),
                file: open_fresh(notes_path)?,
                records: 0,
            }),
            None => None,
        };

        debug!(path = %path.display(), deferred_notes = notes.is_some(), "output opened");
        Ok(Self {
            path: path.to_path_buf(),
            file,
            notes,
            title_separate,
        })
    }

    /// Appends `record` to the chosen sink. Without a notes sink every
    /// record goes to the main document.
    pub fn append(&mut self, record: &ChapterRecord, dest: Destination) -> Result<(), ChainError> {
        let block = record.render(self.title_separate);
        match (dest, self.notes.as_mut()) {
            (Destination::Notes, Some(notes)) => {
                write_all(&mut notes.file, &notes.path, block.as_bytes())?;
                notes.records += 1;
            }
            _ => write_all(&mut self.file, &self.path, block.as_bytes())?,
        }
        Ok(())
    }

    /// Merges deferred notes, writes the footer and closes the document.
    /// Returns the number of merged notes records, if a notes sink existed.
    pub fn finish(mut self) -> Result<Option<usize>, ChainError> {
        let merged = match self.notes.take() {
            Some(mut notes) => {
                notes
                    .file
                    .flush()
                    .map_err(|e| ChainError::io(notes.path.display().to_string(), "flush notes", e))?;
                let mut reader = File::open(&notes.path)
                    .map_err(|e| ChainError::io(notes.path.display().to_string(), "read notes", e))?;
                std::io::copy(&mut reader, &mut self.file)
                    .map_err(|e| ChainError::io(self.path.display().to_string(), "merge notes", e))?;
                Some(notes.records)
            }
            None => None,
        };

        write_all(&mut self.file, &self.path, FOOTER.as_bytes())?;
        self.file
            .flush()
            .map_err(|e| ChainError::io(self.path.display().to_string(), "flush output", e))?;
        debug!(path = %self.path.display(), "output finished");
        Ok(merged)
    }
}

fn open_fresh(path: &Path) -> Result<File, ChainError> {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(ChainError::io(path.display().to_string(), "remove old file", err)),
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| ChainError::io(path.display().to_string(), "open", e))
}

fn write_all(file: &mut File, path: &Path, bytes: &[u8]) -> Result<(), ChainError> {
    file.write_all(bytes)
        .map_err(|e| ChainError::io(path.display().to_string(), "write", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(seq: u64, body: &str, is_notes: bool) -> ChapterRecord {
        ChapterRecord {
            seq,
            title: format!("Title {}", seq),
            title_html: format!("<h1>Title {}</h1>", seq),
            content_html: format!("<div>{}</div>", body),
            is_notes,
        }
    }

    #[test]
    fn test_envelope_and_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.html");
        std::fs::write(&path, "old contents").unwrap();

        let mut doc = OutputDocument::create(&path, "Tom & Jerry", None, true).unwrap();
        doc.append(&record(1, "one", false), Destination::Main).unwrap();
        // without a notes sink, notes stay in place
        doc.append(&record(2, "two", true), Destination::Notes).unwrap();
        assert_eq!(doc.finish().unwrap(), None);

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            format!(
                "{}<h1>Title 1</h1><div>one</div>{}<h1>Title 2</h1><div>two</div>{}{}",
                header("Tom & Jerry"),
                SPACER,
                SPACER,
                FOOTER
            )
        );
        assert!(written.starts_with("<html>\n<head>\n<title>Tom &amp; Jerry</title>"));
    }

    #[test]
    fn test_notes_are_merged_before_footer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.html");
        let notes = dir.path().join("x-notes.html");

        let mut doc = OutputDocument::create(&path, "S", Some(&notes), false).unwrap();
        doc.append(&record(1, "story 1", false), Destination::Main).unwrap();
        doc.append(&record(2, "note A", true), Destination::Notes).unwrap();
        doc.append(&record(3, "story 2", false), Destination::Main).unwrap();
        doc.append(&record(4, "note B", true), Destination::Notes).unwrap();
        assert!(notes.exists());
        assert_eq!(doc.finish().unwrap(), Some(2));
        assert!(!notes.exists());

        let written = std::fs::read_to_string(&path).unwrap();
        let order: Vec<usize> = ["story 1", "story 2", "note A", "note B"]
            .iter()
            .map(|s| written.find(s).unwrap())
            .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]));
        assert!(written.ends_with(FOOTER));
        assert!(!written.contains("Title 1</h1>"));
    }

    #[test]
    fn test_dropping_unfinished_document_removes_notes_and_skips_footer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.html");
        let notes = dir.path().join("x-notes.html");

        let mut doc = OutputDocument::create(&path, "S", Some(&notes), false).unwrap();
        doc.append(&record(1, "note", true), Destination::Notes).unwrap();
        drop(doc);

        assert!(!notes.exists());
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(!written.contains("</html>"));
    }
}
