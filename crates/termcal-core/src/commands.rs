use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use tracing::{debug, info, instrument};

use crate::calendar::{CalendarState, TermCalendar};
use crate::cli::Invocation;
use crate::datetime::parse_date_expr;
use crate::render::Renderer;
use crate::term::Term;

pub fn known_command_names() -> Vec<&'static str> {
    vec!["show", "terms", "weeks", "nav", "help", "version"]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

/// One navigation step of the `nav` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavStep {
    NextWeek,
    PrevWeek,
    NextCambridgeWeek,
    PrevCambridgeWeek,
    CambridgeWeekStart,
    NextTerm,
    PrevTerm,
    NextMonth,
    PrevMonth,
    Date(String),
}

impl FromStr for NavStep {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(prefix) = trimmed.get(..5)
            && prefix.eq_ignore_ascii_case("date:")
        {
            return Ok(Self::Date(trimmed[5..].trim().to_string()));
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "next-week" => Ok(Self::NextWeek),
            "prev-week" => Ok(Self::PrevWeek),
            "next-cweek" => Ok(Self::NextCambridgeWeek),
            "prev-cweek" => Ok(Self::PrevCambridgeWeek),
            "cweek-start" => Ok(Self::CambridgeWeekStart),
            "next-term" => Ok(Self::NextTerm),
            "prev-term" => Ok(Self::PrevTerm),
            "next-month" => Ok(Self::NextMonth),
            "prev-month" => Ok(Self::PrevMonth),
            other => Err(anyhow!(
                "unknown navigation step '{other}'; expected next-week, prev-week, \
                 next-cweek, prev-cweek, cweek-start, next-term, prev-term, \
                 next-month, prev-month or date:EXPR"
            )),
        }
    }
}

impl NavStep {
    pub fn apply(&self, calendar: &mut TermCalendar, today: NaiveDate) -> anyhow::Result<()> {
        match self {
            Self::NextWeek => calendar.go_to_next_week(),
            Self::PrevWeek => calendar.go_to_prev_week(),
            Self::NextCambridgeWeek => calendar.go_to_next_cambridge_week(),
            Self::PrevCambridgeWeek => calendar.go_to_prev_cambridge_week(),
            Self::CambridgeWeekStart => calendar.go_to_cambridge_week_start(),
            Self::NextTerm => calendar.go_to_next_term(),
            Self::PrevTerm => calendar.go_to_prev_term(),
            Self::NextMonth => calendar.go_to_next_month_first_thursday(),
            Self::PrevMonth => calendar.go_to_prev_month_first_thursday(),
            Self::Date(expr) => {
                let date = parse_date_expr(expr, today)?;
                calendar.set_active_date(date);
            }
        }
        Ok(())
    }
}

#[instrument(skip(calendar, renderer, inv), fields(command = %inv.command))]
pub fn dispatch(
    calendar: &mut TermCalendar,
    renderer: &mut Renderer,
    inv: Invocation,
    today: NaiveDate,
) -> anyhow::Result<()> {
    debug!(args = ?inv.command_args, "dispatching command");

    match inv.command.as_str() {
        "show" => renderer.print_state(calendar),
        "terms" => renderer.print_terms(calendar.terms(), calendar.active_term()),
        "weeks" => cmd_weeks(calendar, renderer, &inv.command_args),
        "nav" => cmd_nav(calendar, renderer, &inv.command_args, today),
        "help" => {
            print_help();
            Ok(())
        }
        "version" => {
            println!("termcal {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unsupported command: {other}")),
    }
}

fn cmd_weeks(
    calendar: &TermCalendar,
    renderer: &mut Renderer,
    args: &[String],
) -> anyhow::Result<()> {
    let term = select_term(calendar, args.first().map(String::as_str))?;
    renderer.print_weeks(term, calendar.active_date())
}

/// Named term, else the active term, else the next one.
pub fn select_term<'a>(calendar: &'a TermCalendar, name: Option<&str>) -> anyhow::Result<&'a Term> {
    if let Some(name) = name {
        return calendar
            .terms()
            .iter()
            .find(|term| term.name.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| anyhow!("no term named '{name}'"));
    }

    calendar
        .active_term()
        .or_else(|| calendar.next_term_for_date(calendar.active_date()))
        .ok_or_else(|| anyhow!("no active or upcoming term"))
}

#[instrument(skip(calendar, renderer, args))]
fn cmd_nav(
    calendar: &mut TermCalendar,
    renderer: &mut Renderer,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    let out = io::stdout().lock();
    run_nav(calendar, renderer, args, today, out)
}

/// Applies each step and writes one line per change. The temporary
/// listener is removed on every exit path.
fn run_nav<W: Write>(
    calendar: &mut TermCalendar,
    renderer: &Renderer,
    args: &[String],
    today: NaiveDate,
    mut out: W,
) -> anyhow::Result<()> {
    if args.is_empty() {
        return Err(anyhow!("nav needs at least one step"));
    }
    let steps = args
        .iter()
        .map(|arg| {
            arg.parse::<NavStep>()
                .with_context(|| format!("invalid nav step '{arg}'"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let changes: Rc<RefCell<Vec<CalendarState>>> = Rc::default();
    let sink = Rc::clone(&changes);
    let listener = calendar.on_change(move |state| sink.borrow_mut().push(state.clone()));

    let result = apply_nav_steps(calendar, renderer, &steps, args, today, &changes, &mut out);

    calendar.remove_listener(listener);
    result
}

fn apply_nav_steps<W: Write>(
    calendar: &mut TermCalendar,
    renderer: &Renderer,
    steps: &[NavStep],
    args: &[String],
    today: NaiveDate,
    changes: &RefCell<Vec<CalendarState>>,
    out: &mut W,
) -> anyhow::Result<()> {
    renderer.write_change(&mut *out, "start", calendar.state())?;
    for (step, raw) in steps.iter().zip(args) {
        step.apply(calendar, today)?;
        let drained: Vec<CalendarState> = changes.borrow_mut().drain(..).collect();
        if drained.is_empty() {
            info!(step = %raw, "navigation step left the active date unchanged");
            renderer.write_change(&mut *out, raw, calendar.state())?;
        }
        for state in &drained {
            renderer.write_change(&mut *out, raw, state)?;
        }
    }
    Ok(())
}

fn print_help() {
    println!(
        "usage: termcal [-v] [-q] [--terms FILE] [--start DATE] [--end DATE] \
         [--at EXPR] COMMAND [ARGS]\n\
         \n\
         commands:\n\
         \x20 show              derived state of the active date\n\
         \x20 terms             list configured terms\n\
         \x20 weeks [TERM]      Cambridge weeks of a term\n\
         \x20 nav STEP...       apply navigation steps and print each change\n\
         \x20 help              this message\n\
         \x20 version           print version"
    );
}
