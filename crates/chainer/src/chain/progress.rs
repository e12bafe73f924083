// ABOUTME: Progress reporting for chain runs: a trait the driver calls and a console table printer.
// ABOUTME: The console printer writes one aligned row per page with download and processing times.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use crate::chain::RunSummary;

/// Title column width in the progress table.
pub const TITLE_WIDTH: usize = 45;

const SKIP_PREFIX: &str = "<Skipping> ";
const ELLIPSIS: char = '…';

/// One row of the progress table.
#[derive(Debug, Clone, PartialEq)]
pub struct PageReport {
    pub seq: u64,
    pub title: String,
    /// The page was a notes page dropped by the notes mode.
    pub skipped: bool,
    pub download: Duration,
    pub processing: Duration,
}

/// Receives run events from the driver.
pub trait Progress {
    fn started(&mut self, name: &str, output: &Path);
    fn page(&mut self, report: &PageReport);
    fn notes_merged(&mut self, records: usize, elapsed: Duration);
    fn finished(&mut self, summary: &RunSummary);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn started(&mut self, _name: &str, _output: &Path) {}
    fn page(&mut self, _report: &PageReport) {}
    fn notes_merged(&mut self, _records: usize, _elapsed: Duration) {}
    fn finished(&mut self, _summary: &RunSummary) {}
}

/// Title as shown in the table, truncated to fit the column.
pub fn display_title(title: &str, skipped: bool) -> String {
    let (prefix, room) = if skipped {
        (SKIP_PREFIX, TITLE_WIDTH - SKIP_PREFIX.chars().count() - 1)
    } else {
        ("", TITLE_WIDTH - 1)
    };
    let mut out = String::from(prefix);
    if title.chars().count() > room {
        out.extend(title.chars().take(room));
        out.push(ELLIPSIS);
    } else {
        out.push_str(title);
    }
    out
}

fn secs(d: Duration) -> String {
    format!("{:.3}", d.as_secs_f64())
}

/// Writes the progress table to a stream, stdout by default.
#[derive(Debug)]
pub struct ConsoleProgress<W: Write> {
    out: W,
}

impl ConsoleProgress<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self {
            out: std::io::stdout(),
        }
    }
}

impl<W: Write> ConsoleProgress<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

// Progress output is best effort; a closed stdout must not fail the run.
impl<W: Write> Progress for ConsoleProgress<W> {
    fn started(&mut self, name: &str, output: &Path) {
        let _ = writeln!(
            self.out,
            "Downloading '{}' to file '{}'...\n",
            name,
            output.display()
        );
        let _ = writeln!(
            self.out,
            "Count   Page Title{}Downloading   Processing",
            " ".repeat(37)
        );
    }

    fn page(&mut self, report: &PageReport) {
        let _ = writeln!(
            self.out,
            "{:>5}   {:<width$}   {} sec.   {} sec.",
            report.seq,
            display_title(&report.title, report.skipped),
            secs(report.download),
            secs(report.processing),
            width = TITLE_WIDTH
        );
        let _ = self.out.flush();
    }

    fn notes_merged(&mut self, _records: usize, elapsed: Duration) {
        let _ = writeln!(
            self.out,
            "{:>5}   {:<width$}{}{} sec.",
            "—",
            "<Appending Notes to story>",
            " ".repeat(16),
            secs(elapsed),
            width = TITLE_WIDTH
        );
    }

    fn finished(&mut self, summary: &RunSummary) {
        let _ = writeln!(
            self.out,
            "\nSerial '{}' complete? Stopped because {}.",
            summary.name, summary.termination
        );
        let _ = writeln!(
            self.out,
            "{} pages downloaded, {} kept, {} skipped.",
            summary.pages, summary.kept, summary.skipped
        );
        let _ = writeln!(self.out, "Total time: {} sec.", secs(summary.elapsed));
        let _ = self.out.flush();
    }
}
