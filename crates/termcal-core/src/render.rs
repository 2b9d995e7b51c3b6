use std::io::{self, IsTerminal, Write};

use anyhow::Context;
use chrono::NaiveDate;
use unicode_width::UnicodeWidthStr;

use crate::calendar::{CalendarState, TermCalendar};
use crate::config::Config;
use crate::datetime::{cambridge_week_start_for_date, format_date, shift_days};
use crate::term::Term;

pub const OUTSIDE_TERM: &str = "Outside term";

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color = cfg
            .get_bool("color")
            .context("invalid color setting")?
            .unwrap_or(true);

        Ok(Self { color })
    }

    #[tracing::instrument(skip(self, calendar))]
    pub fn print_state(&mut self, calendar: &TermCalendar) -> anyhow::Result<()> {
        let out = io::stdout().lock();
        self.write_state(out, calendar)
    }

    #[tracing::instrument(skip(self, terms))]
    pub fn print_terms(&mut self, terms: &[Term], active: Option<&Term>) -> anyhow::Result<()> {
        let out = io::stdout().lock();
        self.write_terms(out, terms, active)
    }

    #[tracing::instrument(skip(self, term))]
    pub fn print_weeks(&mut self, term: &Term, active_date: NaiveDate) -> anyhow::Result<()> {
        let out = io::stdout().lock();
        self.write_weeks(out, term, active_date)
    }

    pub fn write_change<W: Write>(
        &self,
        mut out: W,
        step: &str,
        state: &CalendarState,
    ) -> anyhow::Result<()> {
        writeln!(
            out,
            "{:<12} {}  {}",
            step,
            self.paint(&format_date(state.active_date), "33"),
            term_label(state)
        )?;
        Ok(())
    }

    pub fn write_state<W: Write>(&self, mut out: W, calendar: &TermCalendar) -> anyhow::Result<()> {
        let state = calendar.state();
        let week_start = cambridge_week_start_for_date(state.active_date);

        writeln!(
            out,
            "date        {} ({})",
            self.paint(&format_date(state.active_date), "33"),
            state.active_date.format("%A")
        )?;
        writeln!(out, "month       {}", state.active_month)?;
        writeln!(out, "term        {}", term_label(state))?;
        writeln!(
            out,
            "month term  {}",
            state
                .active_month_term
                .as_ref()
                .map(|term| term.name.as_str())
                .unwrap_or(OUTSIDE_TERM)
        )?;
        writeln!(
            out,
            "week        {} to {}",
            format_date(week_start),
            format_date(shift_days(week_start, 6))
        )?;
        writeln!(
            out,
            "boundaries  {} to {}",
            format_date(calendar.start()),
            format_date(calendar.end())
        )?;
        writeln!(
            out,
            "prev        week {}  month {}  term {}",
            enabled(calendar.can_go_to_prev_week()),
            enabled(calendar.can_go_to_prev_month()),
            enabled(calendar.can_go_to_prev_term())
        )?;
        writeln!(
            out,
            "next        week {}  month {}  term {}",
            enabled(calendar.can_go_to_next_week()),
            enabled(calendar.can_go_to_next_month()),
            enabled(calendar.can_go_to_next_term())
        )?;
        Ok(())
    }

    pub fn write_terms<W: Write>(
        &self,
        out: W,
        terms: &[Term],
        active: Option<&Term>,
    ) -> anyhow::Result<()> {
        let headers = vec!["Term".to_string(), "Start".to_string(), "End".to_string()];
        let rows = terms
            .iter()
            .map(|term| {
                let name = if active == Some(term) {
                    self.paint(&term.name, "1")
                } else {
                    term.name.clone()
                };
                vec![name, format_date(term.start), format_date(term.end())]
            })
            .collect();
        write_table(out, headers, rows)
    }

    pub fn write_weeks<W: Write>(
        &self,
        mut out: W,
        term: &Term,
        active_date: NaiveDate,
    ) -> anyhow::Result<()> {
        writeln!(out, "{}", term.name)?;
        let headers = vec![
            "Week".to_string(),
            "Thursday".to_string(),
            "Wednesday".to_string(),
        ];
        let rows = term
            .weeks()
            .into_iter()
            .map(|week| {
                let label = week.week.to_string();
                let label = if week.start <= active_date && active_date <= week.end {
                    self.paint(&label, "1")
                } else {
                    label
                };
                vec![label, format_date(week.start), format_date(week.end)]
            })
            .collect();
        write_table(out, headers, rows)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

/// `Michaelmas, week 4`, or `Outside term`.
pub fn term_label(state: &CalendarState) -> String {
    match (&state.active_term, state.active_week) {
        (Some(term), Some(week)) => format!("{}, week {week}", term.name),
        (Some(term), None) => term.name.clone(),
        _ => OUTSIDE_TERM.to_string(),
    }
}

fn enabled(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for (header, width) in headers.iter().zip(&widths) {
        write!(writer, "{header:width$} ", width = *width)?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (cell, width) in row.iter().zip(&widths) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = width.saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
