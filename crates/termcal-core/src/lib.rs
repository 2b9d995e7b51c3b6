pub mod calendar;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod error;
pub mod render;
pub mod term;

use std::ffi::OsString;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  Local,
  NaiveDate
};
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use calendar::{
  CalendarState,
  ListenerId,
  TermCalendar
};
pub use error::CalendarError;
pub use term::Term;

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting termcal"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.termcalrc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let terms_path =
    config::resolve_terms_path(
      &cfg,
      cli.terms.as_deref()
    )
    .context(
      "failed to resolve term file"
    )?;
  let terms =
    term::load_terms(&terms_path)?;

  let start = resolve_boundary(
    &cfg,
    cli.start.as_deref(),
    "--start",
    config::CALENDAR_START_KEY
  )?;
  let end = resolve_boundary(
    &cfg,
    cli.end.as_deref(),
    "--end",
    config::CALENDAR_END_KEY
  )?;

  let today = Local::now().date_naive();
  let at =
    datetime::parse_date_expr(
      &cli.at, today
    )
    .context("invalid --at value")?;

  let mut calendar =
    TermCalendar::new(terms, start, end)
      .context(
        "failed to build term calendar"
      )?
      .with_active_date(at);

  let mut renderer =
    render::Renderer::new(&cfg)?;
  let inv = cli::Invocation::parse(
    &cfg, cli.rest
  )?;

  commands::dispatch(
    &mut calendar,
    &mut renderer,
    inv,
    today
  )?;

  info!("done");
  Ok(())
}

fn resolve_boundary(
  cfg: &config::Config,
  flag_value: Option<&str>,
  flag: &str,
  key: &str
) -> anyhow::Result<NaiveDate> {
  if let Some(raw) = flag_value {
    return Ok(datetime::parse_date(
      flag, raw
    )?);
  }

  cfg.get_date(key)?.ok_or_else(|| {
    anyhow!(
      "calendar boundary missing; set \
       {key} or pass {flag}"
    )
  })
}
