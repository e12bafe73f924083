// ABOUTME: The chain driver: fetches pages one at a time, following each page's next link.
// ABOUTME: Each page is stored, parsed, extracted, cleaned and appended before the next fetch starts.

pub mod plan;
pub mod progress;
pub mod state;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{debug, info};
use url::Url;

use crate::cleanup::{self, PageContext};
use crate::error::ChainError;
use crate::extractors::{self, NextLink};
use crate::options::{ChainerBuilder, Options};
use crate::output::{ChapterRecord, Destination, OutputDocument};
use crate::page::ParsedPage;
use crate::profile::NotesMode;
use crate::resource::raw_store::{self, RawPageFile};
use crate::resource::{self, build_client, decode_body, FetchOptions, FetchedPage};

pub use plan::RunPlan;
pub use progress::{ConsoleProgress, NoProgress, PageReport, Progress};
pub use state::{ChainState, Step, Termination};

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Serial name.
    pub name: String,
    /// Path of the finished document.
    pub output: PathBuf,
    /// Pages fetched.
    pub pages: u64,
    /// Pages written to the document, including deferred notes.
    pub kept: u64,
    /// Notes pages dropped by the notes mode.
    pub skipped: u64,
    /// Notes pages merged at the end of the document.
    pub notes_appended: u64,
    pub termination: Termination,
    pub elapsed: Duration,
}

/// What processing one page produced.
struct PageOutcome {
    step: Step,
    title: String,
    record: Option<(ChapterRecord, Destination)>,
}

/// Serial downloader. Holds the HTTP client and engine options; each
/// `run` walks one chain.
#[derive(Debug, Clone)]
pub struct Chainer {
    opts: Options,
    http_client: reqwest::Client,
}

impl Chainer {
    /// Create a new ChainerBuilder for configuring a Chainer.
    pub fn builder() -> ChainerBuilder {
        ChainerBuilder::new()
    }

    pub fn new(opts: Options) -> Result<Self, ChainError> {
        let http_client = match opts.http_client.clone() {
            Some(client) => client,
            None => build_client(&opts.user_agent, opts.timeout)?,
        };
        Ok(Self { opts, http_client })
    }

    pub fn options(&self) -> &Options {
        &self.opts
    }

    /// Walks the chain described by `plan` and writes the output document.
    ///
    /// Any fetch or file failure aborts the run; the partial document is
    /// left without its closing tags.
    pub async fn run(
        &self,
        plan: &RunPlan,
        progress: &mut dyn Progress,
    ) -> Result<RunSummary, ChainError> {
        let started = Instant::now();
        let profile = plan.profile();
        let notes_mode = plan.notes_mode();
        let output = self.opts.out_dir.join(plan.output_file());
        let notes_path = (notes_mode == Some(NotesMode::Append))
            .then(|| raw_store::notes_path(&self.opts.work_dir, profile.id()));
        let delay = self.opts.delay.unwrap_or(plan.delay());
        let fetch_opts = FetchOptions {
            headers: self.opts.headers.clone(),
        };

        info!(profile = profile.id(), start = %plan.start_url(), output = %output.display(), "run started");
        progress.started(profile.name(), &output);

        let mut doc = OutputDocument::create(
            &output,
            profile.name(),
            notes_path.as_deref(),
            profile.title_separate(),
        )?;
        let mut state = ChainState::new(plan.start_url().to_string());
        let (mut kept, mut skipped) = (0u64, 0u64);

        let termination = loop {
            let Some((seq, link)) = state.begin_page() else {
                break Termination::NoNextLink;
            };

            let fetched = resource::fetch(&self.http_client, &link, &fetch_opts).await?;
            if fetched.final_url != link {
                state.mark_visited(&fetched.final_url);
            }
            let raw = RawPageFile::write(
                raw_store::raw_page_path(&self.opts.work_dir, profile.id(), seq),
                &fetched.body,
            )?;

            let processing = Instant::now();
            let outcome = self.process_page(plan, &state, seq, &link, &fetched, &raw)?;
            raw.discard();

            let was_skipped = outcome.record.is_none();
            if let Some((record, dest)) = outcome.record {
                doc.append(&record, dest)?;
                kept += 1;
            } else {
                skipped += 1;
            }

            progress.page(&PageReport {
                seq,
                title: outcome.title,
                skipped: was_skipped,
                download: fetched.elapsed,
                processing: processing.elapsed(),
            });

            match outcome.step {
                Step::Stop(reason) => break reason,
                Step::Advance(next) => {
                    state.advance(next);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        };

        let merging = Instant::now();
        let notes_appended = doc.finish()?.unwrap_or(0);
        if notes_appended > 0 {
            progress.notes_merged(notes_appended, merging.elapsed());
        }

        let summary = RunSummary {
            name: profile.name().to_string(),
            output,
            pages: state.seq(),
            kept,
            skipped,
            notes_appended: notes_appended as u64,
            termination,
            elapsed: started.elapsed(),
        };
        info!(pages = summary.pages, reason = %summary.termination, "run finished");
        progress.finished(&summary);
        Ok(summary)
    }

    /// Parses and processes one stored page. Kept synchronous so the parsed
    /// document never lives across an await point.
    fn process_page(
        &self,
        plan: &RunPlan,
        state: &ChainState,
        seq: u64,
        link: &str,
        fetched: &FetchedPage,
        raw: &RawPageFile,
    ) -> Result<PageOutcome, ChainError> {
        let profile = plan.profile();
        let markup = decode_body(&raw.read()?, fetched.content_type.as_deref());
        let page_url = Url::parse(&fetched.final_url)
            .or_else(|_| Url::parse(link))
            .map_err(|e| ChainError::invalid_url(link, "parse page", Some(e.into())))?;
        let page = ParsedPage::parse(page_url, &markup);

        let next = extractors::resolve_next(&page, profile);
        let step = state.classify(&next, self.opts.page_limit);
        if let NextLink::Follow(ref next) = next {
            debug!(seq, next = %next, "next link");
        }

        let found = extractors::extract(&page, profile);
        let title = extractors::title_text(found.title.as_ref());
        let is_notes = profile.is_notes(&title);

        let dest = match (is_notes, plan.notes_mode()) {
            (true, Some(NotesMode::Omit)) => {
                debug!(seq, title = %title, "skipping notes page");
                return Ok(PageOutcome {
                    step,
                    title,
                    record: None,
                });
            }
            (true, Some(NotesMode::Append)) => Destination::Notes,
            _ => Destination::Main,
        };

        let cleaned = cleanup::clean(
            found.title,
            found.content,
            profile,
            &PageContext {
                url: page.url(),
                is_first: seq == 1,
                is_last: step.is_last(),
            },
        );

        Ok(PageOutcome {
            step,
            record: Some((
                ChapterRecord {
                    seq,
                    title: title.clone(),
                    title_html: cleaned.title_html,
                    content_html: cleaned.content_html,
                    is_notes,
                },
                dest,
            )),
            title,
        })
    }
}
