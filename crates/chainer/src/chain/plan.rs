// ABOUTME: RunPlan, the single immutable per-run configuration value.
// ABOUTME: Combines a compiled profile with the run's start URL, notes mode, output name and delay.

use std::time::Duration;

use chrono::{DateTime, Local};
use url::Url;

use crate::error::ChainError;
use crate::profile::compiled::CompiledProfile;
use crate::profile::{NotesMode, SourceProfile};

/// Output file name for an ad-hoc URL run started at `now`.
pub fn adhoc_output_file(now: DateTime<Local>) -> String {
    format!("Serial Downloaded {}.html", now.format("%Y-%m-%d %H-%M-%S"))
}

/// Everything a run needs besides the engine options.
#[derive(Debug, Clone)]
pub struct RunPlan {
    profile: CompiledProfile,
    start_url: Url,
    notes_mode: Option<NotesMode>,
    output_file: Option<String>,
    delay: Duration,
}

impl RunPlan {
    /// Plan for `profile` with its own start URL and default notes mode.
    pub fn new(profile: SourceProfile) -> Result<Self, ChainError> {
        Self::from_compiled(CompiledProfile::compile(profile)?)
    }

    pub fn from_compiled(profile: CompiledProfile) -> Result<Self, ChainError> {
        let delay = Duration::try_from_secs_f64(profile.delay_secs()).map_err(|e| {
            ChainError::profile(profile.id(), "plan run", Some(anyhow::anyhow!("delay_secs: {}", e)))
        })?;
        Ok(Self {
            start_url: profile.start_url().clone(),
            notes_mode: profile.default_notes_mode(),
            output_file: None,
            delay,
            profile,
        })
    }

    /// Plan for an unprofiled serial starting at `url`.
    pub fn adhoc(url: &str, now: DateTime<Local>) -> Result<Self, ChainError> {
        Url::parse(url).map_err(|e| {
            ChainError::invalid_url(url, "plan run", Some(anyhow::anyhow!("invalid start URL: {}", e)))
        })?;
        Self::new(SourceProfile::generic(url, adhoc_output_file(now)))
    }

    /// Starts the chain somewhere other than the profile's first page.
    pub fn with_start_url(mut self, url: &str) -> Result<Self, ChainError> {
        self.start_url = Url::parse(url).map_err(|e| {
            ChainError::invalid_url(url, "plan run", Some(anyhow::anyhow!("invalid start URL: {}", e)))
        })?;
        Ok(self)
    }

    /// Chooses the notes mode. Only valid for profiles that classify notes.
    pub fn with_notes_mode(mut self, mode: NotesMode) -> Result<Self, ChainError> {
        if !self.profile.has_notes() {
            return Err(ChainError::profile(
                self.profile.id(),
                "plan run",
                Some(anyhow::anyhow!(
                    "profile has no notes pages; --{} does not apply",
                    mode
                )),
            ));
        }
        self.notes_mode = Some(mode);
        Ok(self)
    }

    /// Overrides the output file name.
    pub fn with_output_file(mut self, name: impl Into<String>) -> Self {
        self.output_file = Some(name.into());
        self
    }

    pub fn profile(&self) -> &CompiledProfile {
        &self.profile
    }

    pub fn start_url(&self) -> &Url {
        &self.start_url
    }

    /// Active notes mode; `None` for profiles without notes pages.
    pub fn notes_mode(&self) -> Option<NotesMode> {
        self.notes_mode
    }

    pub fn output_file(&self) -> String {
        self.output_file
            .clone()
            .unwrap_or_else(|| self.profile.source().output_file_for(self.notes_mode))
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::profile::loader::load_builtin_registry;
    use chrono::TimeZone;

    fn builtin(id: &str) -> SourceProfile {
        load_builtin_registry()
            .expect("registry")
            .get(id)
            .expect("profile")
            .clone()
    }

    #[test]
    fn test_unsong_defaults_to_chronological() {
        let plan = RunPlan::new(builtin("Unsong")).unwrap();
        assert_eq!(plan.notes_mode(), Some(NotesMode::Interleave));
        assert_eq!(plan.output_file(), "Unsong-Notes_chronological.html");

        let plan = plan.with_notes_mode(NotesMode::Omit).unwrap();
        assert_eq!(plan.output_file(), "Unsong-Notes_omitted.html");
    }

    #[test]
    fn test_notes_mode_rejected_without_notes_policy() {
        let err = RunPlan::new(builtin("T5D"))
            .unwrap()
            .with_notes_mode(NotesMode::Append)
            .expect_err("T5D has no notes");
        assert_eq!(err.code, ErrorCode::Profile);
    }

    #[test]
    fn test_start_url_override() {
        let plan = RunPlan::new(builtin("T5D"))
            .unwrap()
            .with_start_url("https://thefifthdefiance.com/2016/01/05/chapter-9/")
            .unwrap();
        assert_eq!(
            plan.start_url().as_str(),
            "https://thefifthdefiance.com/2016/01/05/chapter-9/"
        );
        assert_eq!(plan.output_file(), "The Fifth Defiance.html");

        let err = RunPlan::new(builtin("T5D"))
            .unwrap()
            .with_start_url("not a url")
            .expect_err("bad url");
        assert_eq!(err.code, ErrorCode::InvalidUrl);
    }

    #[test]
    fn test_adhoc_plan() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let plan = RunPlan::adhoc("https://example.com/story/1", now).unwrap();
        assert_eq!(plan.profile().name(), "Serial");
        assert_eq!(plan.notes_mode(), None);
        assert_eq!(plan.output_file(), "Serial Downloaded 2024-03-09 14-05-07.html");

        let err = RunPlan::adhoc("::", now).expect_err("bad url");
        assert_eq!(err.code, ErrorCode::InvalidUrl);
    }
}
