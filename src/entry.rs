use std::ffi::OsString;
use std::path::{Path, PathBuf};

use clap::{ArgMatches, CommandFactory, FromArgMatches};
use tracing::{error, info};

use crate::args::{Command, DEFAULT_CONFIG_FILES, RunArgs, ServeArgs, VolleyArgs};
use crate::error::{AppError, AppResult, ValidationError};
use crate::load::{HttpExecutor, LoadRunner, RequestSpec};

enum RunPlan {
    Run { args: RunArgs, matches: ArgMatches },
    Serve(ServeArgs),
}

impl RunPlan {
    const fn verbose(&self) -> bool {
        match self {
            Self::Run { args, .. } => args.verbose,
            Self::Serve(args) => args.verbose,
        }
    }
}

/// Parses the command line and runs the selected command to completion.
///
/// # Errors
///
/// Returns an error when arguments, the run file, or the run itself fail.
pub fn run() -> AppResult<()> {
    let plan = match parse_args()? {
        Some(plan) => plan,
        None => return Ok(()),
    };

    crate::logger::init_logging(plan.verbose());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::validation(ValidationError::RuntimeBuildFailed { source: err }))?;

    runtime.block_on(execute_plan(plan))
}

fn parse_args() -> AppResult<Option<RunPlan>> {
    let mut cmd = VolleyArgs::command();
    let raw_args: Vec<OsString> = std::env::args_os().collect();

    if should_show_help(&raw_args) {
        cmd.print_help()?;
        println!();
        return Ok(None);
    }

    let matches = cmd.get_matches_from(raw_args);
    let args = VolleyArgs::from_arg_matches(&matches)?;

    let plan = match args.command {
        Some(Command::Serve(serve_args)) => RunPlan::Serve(serve_args),
        Some(Command::Run(run_args)) => {
            let run_matches = matches
                .subcommand_matches("run")
                .cloned()
                .unwrap_or_else(|| matches.clone());
            RunPlan::Run {
                args: run_args,
                matches: run_matches,
            }
        }
        None => RunPlan::Run {
            args: args.run,
            matches,
        },
    };
    Ok(Some(plan))
}

/// A bare `volley` with nothing to run prints help instead of failing on a
/// missing URL.
fn should_show_help(raw_args: &[OsString]) -> bool {
    let treat_as_empty =
        matches!(raw_args, [] | [_]) || matches!(raw_args, [_, second] if second == "--");
    if !treat_as_empty {
        return false;
    }

    std::env::var_os("VOLLEY_URL").is_none() && !has_default_config()
}

fn has_default_config() -> bool {
    DEFAULT_CONFIG_FILES
        .iter()
        .any(|path| Path::new(path).exists())
}

async fn execute_plan(plan: RunPlan) -> AppResult<()> {
    match plan {
        RunPlan::Run { mut args, matches } => {
            if let Some(config) = crate::config::load_config(args.config.as_deref())? {
                crate::config::apply_config(&mut args, &matches, &config)?;
            }
            run_once(args).await
        }
        RunPlan::Serve(args) => crate::server::serve(&args).await,
    }
}

async fn run_once(args: RunArgs) -> AppResult<()> {
    let spec = build_spec(&args)?;
    let runner = LoadRunner::new(HttpExecutor::new()?);
    let report = runner.run(spec).await?;

    crate::output::print_report(&report, args.output_format)?;

    if let Some(path) = args.export_json.as_deref() {
        let path = PathBuf::from(path);
        crate::output::export_json(&path, &report).await?;
    }

    info!(
        "{} of {} requests succeeded",
        report.summary.success_count, report.summary.total_requests
    );
    Ok(())
}

fn build_spec(args: &RunArgs) -> AppResult<RequestSpec> {
    let Some(url) = args.url.clone() else {
        error!("Missing URL (set --url or provide in config).");
        return Err(AppError::validation(ValidationError::MissingUrl));
    };
    let spec = RequestSpec::new(url, args.method, args.requests, args.concurrency)?
        .with_auth_header(args.auth_header.clone());
    Ok(match args.payload.clone() {
        Some(payload) => spec.with_payload(payload),
        None => spec,
    })
}
