// ABOUTME: Main library entry point for the serial chainer.
// ABOUTME: Re-exports the public API: Chainer, ChainerBuilder, RunPlan, profiles, ChainError and ErrorCode.

//! Serial chainer - downloads a web serial by following "next" links from
//! page to page and assembles the chapters into one HTML document.
//!
//! # Example
//!
//! ```no_run
//! use serial_chainer::{load_builtin_registry, Chainer, ConsoleProgress, RunPlan};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), serial_chainer::ChainError> {
//!     let registry = load_builtin_registry()?;
//!     let profile = registry.get("T5D").expect("built-in profile").clone();
//!     let plan = RunPlan::new(profile)?;
//!     let chainer = Chainer::builder().out_dir("books").build()?;
//!     let summary = chainer.run(&plan, &mut ConsoleProgress::stdout()).await?;
//!     println!("{} pages", summary.pages);
//!     Ok(())
//! }
//! ```

pub mod chain;
pub mod cleanup;
pub mod error;
pub mod extractors;
pub mod logging;
pub mod options;
pub mod output;
pub mod page;
pub mod profile;
pub mod resource;

pub use crate::chain::{
    Chainer, ConsoleProgress, NoProgress, PageReport, Progress, RunPlan, RunSummary, Termination,
};
pub use crate::error::{ChainError, ErrorCode};
pub use crate::options::{ChainerBuilder, Options, DEFAULT_USER_AGENT};
pub use crate::profile::compiled::CompiledProfile;
pub use crate::profile::loader::{load_builtin_registry, load_registry_file};
pub use crate::profile::{NotesMode, ProfileRegistry, SourceProfile};
