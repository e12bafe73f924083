// ABOUTME: CLI binary for the serial chainer.
// ABOUTME: Selects a profile (or an ad-hoc URL), downloads the serial and prints a progress table.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{ArgGroup, Parser};
use serial_chainer::{
    load_builtin_registry, load_registry_file, logging, ChainError, Chainer, ConsoleProgress,
    NotesMode, ProfileRegistry, RunPlan,
};

const USAGE: &str = "Usage: chainer {SICP, T5D, Unsong [--append | --chrono[logical] | --omit], URL} [START_URL]";

#[derive(Parser, Debug)]
#[command(name = "chainer")]
#[command(about = "Download a web serial by following its next links into one HTML file")]
#[command(group(ArgGroup::new("notes_flags").args(["append", "chrono", "omit", "notes"])))]
struct Args {
    /// Profile id, or the URL of a serial's first page
    #[arg(value_name = "PROFILE|URL", required_unless_present = "list")]
    target: Option<String>,

    /// Start from this page instead of the profile's first page
    #[arg(value_name = "START_URL")]
    start_url: Option<String>,

    /// Collect notes pages at the end of the document
    #[arg(long)]
    append: bool,

    /// Keep notes pages in publication order
    #[arg(long, alias = "chronological")]
    chrono: bool,

    /// Leave notes pages out
    #[arg(long)]
    omit: bool,

    /// Notes mode by name: omit, append or chrono
    #[arg(long = "notes", value_name = "MODE")]
    notes: Option<NotesMode>,

    /// Load extra profiles from a JSON file (overrides built-ins with the same id)
    #[arg(long = "profiles", value_name = "FILE")]
    profiles: Option<PathBuf>,

    /// Directory for the output document
    #[arg(long = "out-dir", value_name = "DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Directory for temporary page files
    #[arg(long = "work-dir", value_name = "DIR")]
    work_dir: Option<PathBuf>,

    /// Seconds to wait between page fetches
    #[arg(long = "delay", value_name = "SECS")]
    delay: Option<f64>,

    /// Stop after this many pages
    #[arg(long = "max-pages", value_name = "N")]
    max_pages: Option<u64>,

    /// Output file name (inside --out-dir)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<String>,

    /// List available profiles and exit
    #[arg(long = "list")]
    list: bool,

    /// Verbose diagnostics on stderr
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

impl Args {
    fn notes_mode(&self) -> Option<NotesMode> {
        if let Some(mode) = self.notes {
            Some(mode)
        } else if self.append {
            Some(NotesMode::Append)
        } else if self.chrono {
            Some(NotesMode::Interleave)
        } else if self.omit {
            Some(NotesMode::Omit)
        } else {
            None
        }
    }
}

fn mode_flag(mode: NotesMode) -> &'static str {
    match mode {
        NotesMode::Omit => "--omit",
        NotesMode::Append => "--append",
        NotesMode::Interleave => "--chronological",
    }
}

fn is_web_url(target: &str) -> bool {
    url::Url::parse(target)
        .map(|u| u.scheme() == "http" || u.scheme() == "https")
        .unwrap_or(false)
}

fn load_registry(args: &Args) -> Result<ProfileRegistry, ChainError> {
    let mut registry = load_builtin_registry()?;
    if let Some(ref path) = args.profiles {
        load_registry_file(&mut registry, path)?;
    }
    Ok(registry)
}

/// Turns the command line into a run plan. Errors here are usage errors.
fn build_plan(args: &Args, registry: &ProfileRegistry, target: &str) -> Result<RunPlan, String> {
    let mode = args.notes_mode();

    let mut plan = if let Some(profile) = registry.get(target) {
        let plan = RunPlan::new(profile.clone()).map_err(|e| e.to_string())?;
        match (mode, plan.notes_mode()) {
            (Some(mode), _) => plan.with_notes_mode(mode).map_err(|e| e.detail())?,
            (None, Some(default)) => {
                println!("Defaulting to {}", mode_flag(default));
                plan
            }
            (None, None) => plan,
        }
    } else if is_web_url(target) {
        if mode.is_some() {
            return Err("notes options only apply to profiles with notes pages".to_string());
        }
        println!(
            "It is unlikely that '{}' is configured; using the generic next-link and content rules.",
            target
        );
        RunPlan::adhoc(target, chrono::Local::now()).map_err(|e| e.to_string())?
    } else {
        let known: Vec<&str> = registry.ids().collect();
        return Err(format!(
            "unknown profile '{}' (available: {})",
            target,
            known.join(", ")
        ));
    };

    if let Some(ref start) = args.start_url {
        plan = plan.with_start_url(start).map_err(|e| e.to_string())?;
    }
    if let Some(ref output) = args.output {
        plan = plan.with_output_file(output.clone());
    }
    Ok(plan)
}

fn build_chainer(args: &Args) -> Result<Chainer, String> {
    let mut builder = Chainer::builder().out_dir(&args.out_dir);
    if let Some(ref dir) = args.work_dir {
        builder = builder.work_dir(dir);
    }
    if let Some(secs) = args.delay {
        let delay = Duration::try_from_secs_f64(secs)
            .map_err(|e| format!("invalid --delay {}: {}", secs, e))?;
        builder = builder.delay(delay);
    }
    if let Some(pages) = args.max_pages {
        builder = builder.page_limit(pages);
    }
    builder.build().map_err(|e| e.to_string())
}

fn report_failure(err: &ChainError) {
    if err.is_transport() {
        eprintln!("Could not retrieve next page. Is this link broken?");
        eprintln!("{}", err.url);
        eprintln!("{}: {}", err.code, err.detail());
    } else {
        eprintln!("error: {}", err);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(err) = logging::init(args.verbose) {
        eprintln!("warning: {:#}", err);
    }

    let registry = match load_registry(&args) {
        Ok(registry) => registry,
        Err(err) => {
            eprintln!("error: {}", err);
            return ExitCode::from(2);
        }
    };

    if args.list {
        for profile in registry.iter() {
            println!("{:<10} {}", profile.id, profile.name);
        }
        return ExitCode::SUCCESS;
    }

    let Some(target) = args.target.as_deref() else {
        eprintln!("{}", USAGE);
        return ExitCode::from(2);
    };

    let plan = match build_plan(&args, &registry, target) {
        Ok(plan) => plan,
        Err(msg) => {
            eprintln!("error: {}", msg);
            eprintln!("{}", USAGE);
            return ExitCode::from(2);
        }
    };

    let chainer = match build_chainer(&args) {
        Ok(chainer) => chainer,
        Err(msg) => {
            eprintln!("error: {}", msg);
            return ExitCode::from(2);
        }
    };

    match chainer.run(&plan, &mut ConsoleProgress::stdout()).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            report_failure(&err);
            ExitCode::from(1)
        }
    }
}
