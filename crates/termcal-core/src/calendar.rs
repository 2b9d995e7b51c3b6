//! Term-aware calendar state: maps dates
//! onto the academic terms, keeps an
//! active date inside fixed boundaries
//! and notifies listeners as it moves.

use std::fmt;

use chrono::{
  Datelike,
  NaiveDate,
  Weekday
};
use tracing::{
  debug,
  instrument,
  trace
};

use crate::datetime::{
  cambridge_week_start_for_date,
  month_name,
  month_start_for_date,
  move_date_to_next_cambridge_week,
  move_date_to_next_month,
  move_date_to_next_week,
  move_date_to_prev_cambridge_week,
  move_date_to_prev_month,
  move_date_to_prev_week,
  parse_date,
  shift_days
};
use crate::error::CalendarError;
use crate::term::Term;

/// Everything derived from the active
/// date. Recomputed on every change,
/// never stored apart from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarState {
  pub active_date:       NaiveDate,
  pub active_term:       Option<Term>,
  pub active_week:       Option<u32>,
  pub active_month:      String,
  pub active_month_term: Option<Term>
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
)]
pub struct ListenerId(u64);

type Listener =
  Box<dyn FnMut(&CalendarState)>;

pub struct TermCalendar {
  terms:            Vec<Term>,
  start:            NaiveDate,
  end:              NaiveDate,
  state:            CalendarState,
  listeners:        Vec<(
    ListenerId,
    Listener
  )>,
  next_listener_id: u64
}

impl fmt::Debug for TermCalendar {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.debug_struct("TermCalendar")
      .field("terms", &self.terms)
      .field("start", &self.start)
      .field("end", &self.end)
      .field("state", &self.state)
      .field(
        "listeners",
        &self.listeners.len()
      )
      .finish()
  }
}

impl TermCalendar {
  /// The active date starts at `start`;
  /// no listener exists yet to hear it.
  #[instrument(skip(terms), fields(term_count = terms.len()))]
  pub fn new(
    terms: Vec<Term>,
    start: NaiveDate,
    end: NaiveDate
  ) -> Result<Self, CalendarError> {
    if start > end {
      return Err(
        CalendarError::InvalidRange {
          start,
          end
        }
      );
    }

    let state =
      derive_state(&terms, start);
    debug!(
      %start,
      %end,
      "created term calendar"
    );
    Ok(Self {
      terms,
      start,
      end,
      state,
      listeners: Vec::new(),
      next_listener_id: 0
    })
  }

  /// Boundaries as they arrive from the
  /// page's `data-start` / `data-end`
  /// attributes.
  pub fn from_data_attributes(
    terms: Vec<Term>,
    data_start: &str,
    data_end: &str
  ) -> Result<Self, CalendarError> {
    let start =
      parse_date("data-start", data_start)?;
    let end =
      parse_date("data-end", data_end)?;
    Self::new(terms, start, end)
  }

  #[must_use]
  pub fn with_active_date(
    mut self,
    date: NaiveDate
  ) -> Self {
    self.set_active_date(date);
    self
  }

  pub fn terms(&self) -> &[Term] {
    &self.terms
  }

  pub fn start(&self) -> NaiveDate {
    self.start
  }

  pub fn end(&self) -> NaiveDate {
    self.end
  }

  pub fn state(&self) -> &CalendarState {
    &self.state
  }

  pub fn active_date(&self) -> NaiveDate {
    self.state.active_date
  }

  pub fn active_term(
    &self
  ) -> Option<&Term> {
    self.state.active_term.as_ref()
  }

  pub fn active_week(&self) -> Option<u32> {
    self.state.active_week
  }

  pub fn active_month(&self) -> &str {
    &self.state.active_month
  }

  pub fn active_month_term(
    &self
  ) -> Option<&Term> {
    self.state.active_month_term.as_ref()
  }

  /// Registers a change listener.
  ///
  /// Listeners run synchronously, in
  /// registration order, once per
  /// effective move of the active date.
  pub fn on_change<F>(
    &mut self,
    listener: F
  ) -> ListenerId
  where
    F: FnMut(&CalendarState) + 'static
  {
    let id =
      ListenerId(self.next_listener_id);
    self.next_listener_id += 1;
    self
      .listeners
      .push((id, Box::new(listener)));
    trace!(?id, "registered listener");
    id
  }

  pub fn remove_listener(
    &mut self,
    id: ListenerId
  ) -> bool {
    let before = self.listeners.len();
    self
      .listeners
      .retain(|(existing, _)| {
        *existing != id
      });
    before != self.listeners.len()
  }

  pub fn listener_count(&self) -> usize {
    self.listeners.len()
  }

  #[must_use]
  pub fn clamp(
    &self,
    date: NaiveDate
  ) -> NaiveDate {
    date.clamp(self.start, self.end)
  }

  #[instrument(skip(self), fields(previous = %self.state.active_date))]
  pub fn set_active_date(
    &mut self,
    date: NaiveDate
  ) {
    let clamped = self.clamp(date);
    if clamped != date {
      debug!(
        requested = %date,
        %clamped,
        "clamped active date to boundaries"
      );
    }

    if clamped == self.state.active_date
    {
      trace!(
        "active date unchanged; \
         skipping notification"
      );
      return;
    }

    self.state =
      derive_state(&self.terms, clamped);
    debug!(
      active_date = %clamped,
      term = ?self.state.active_term.as_ref().map(|t| &t.name),
      week = ?self.state.active_week,
      "active date changed"
    );

    for (_, listener) in
      &mut self.listeners
    {
      listener(&self.state);
    }
  }

  pub fn is_date_within_boundaries(
    &self,
    date: NaiveDate
  ) -> bool {
    self.start <= date
      && date <= self.end
  }

  /// Compares Thursday-anchored week
  /// starts, so a boundary falling
  /// mid-week still admits its week.
  pub fn is_cambridge_week_within_boundaries(
    &self,
    date: NaiveDate
  ) -> bool {
    let week =
      cambridge_week_start_for_date(date);
    cambridge_week_start_for_date(
      self.start
    ) <= week
      && week
        <= cambridge_week_start_for_date(
          self.end
        )
  }

  pub fn is_month_within_boundaries(
    &self,
    date: NaiveDate
  ) -> bool {
    let month =
      month_start_for_date(date);
    month_start_for_date(self.start)
      <= month
      && month
        <= month_start_for_date(self.end)
  }

  /// Term whose eight weeks contain
  /// `date`. Overlapping terms resolve to
  /// the last match in iteration order.
  pub fn term_for_date(
    &self,
    date: NaiveDate
  ) -> Option<&Term> {
    term_for_date(&self.terms, date)
  }

  pub fn term_week_for_date(
    &self,
    date: NaiveDate
  ) -> Option<u32> {
    self
      .term_for_date(date)
      .and_then(|term| term.week_for(date))
  }

  /// Term owning any day of the month
  /// containing `date`; last match wins.
  pub fn term_for_month(
    &self,
    date: NaiveDate
  ) -> Option<&Term> {
    term_for_month(&self.terms, date)
  }

  /// Nearest term starting strictly after
  /// `date`, never the term containing it.
  /// Equal starts keep the first seen.
  pub fn next_term_for_date(
    &self,
    date: NaiveDate
  ) -> Option<&Term> {
    let current =
      term_index_for_date(&self.terms, date);
    let mut best: Option<&Term> = None;

    for (idx, term) in
      self.terms.iter().enumerate()
    {
      if Some(idx) == current
        || term.start <= date
      {
        continue;
      }
      match best {
        | Some(found)
          if found.start <= term.start => {}
        | _ => best = Some(term)
      }
    }

    best
  }

  pub fn prev_term_for_date(
    &self,
    date: NaiveDate
  ) -> Option<&Term> {
    let current =
      term_index_for_date(&self.terms, date);
    let mut best: Option<&Term> = None;

    for (idx, term) in
      self.terms.iter().enumerate()
    {
      if Some(idx) == current
        || term.start >= date
      {
        continue;
      }
      match best {
        | Some(found)
          if found.start >= term.start => {}
        | _ => best = Some(term)
      }
    }

    best
  }

  pub fn go_to_next_week(&mut self) {
    let target = move_date_to_next_week(
      self.active_date()
    );
    self.set_active_date(target);
  }

  pub fn go_to_prev_week(&mut self) {
    let target = move_date_to_prev_week(
      self.active_date()
    );
    self.set_active_date(target);
  }

  pub fn go_to_next_cambridge_week(
    &mut self
  ) {
    let target =
      move_date_to_next_cambridge_week(
        self.active_date()
      );
    self.set_active_date(target);
  }

  pub fn go_to_prev_cambridge_week(
    &mut self
  ) {
    let target =
      move_date_to_prev_cambridge_week(
        self.active_date()
      );
    self.set_active_date(target);
  }

  pub fn go_to_cambridge_week_start(
    &mut self
  ) {
    let target =
      cambridge_week_start_for_date(
        self.active_date()
      );
    self.set_active_date(target);
  }

  /// Moves to the same week of the next
  /// term. Outside a term the offset is
  /// week one. No-op without a next term.
  pub fn go_to_next_term(&mut self) {
    match self.next_term_target() {
      | Some(target) => {
        self.set_active_date(target)
      }
      | None => {
        debug!(
          active_date = %self.active_date(),
          "no next term"
        );
      }
    }
  }

  pub fn go_to_prev_term(&mut self) {
    match self.prev_term_target() {
      | Some(target) => {
        self.set_active_date(target)
      }
      | None => {
        debug!(
          active_date = %self.active_date(),
          "no previous term"
        );
      }
    }
  }

  /// First of the next month, snapped
  /// forward to its first Thursday.
  pub fn go_to_next_month_first_thursday(
    &mut self
  ) {
    let target = first_thursday_on_or_after(
      move_date_to_next_month(
        self.active_date()
      )
    );
    self.set_active_date(target);
  }

  /// Snaps forward too: the first
  /// Thursday of the previous month.
  pub fn go_to_prev_month_first_thursday(
    &mut self
  ) {
    let target = first_thursday_on_or_after(
      move_date_to_prev_month(
        self.active_date()
      )
    );
    self.set_active_date(target);
  }

  pub fn can_go_to_next_week(&self) -> bool {
    self.is_cambridge_week_within_boundaries(
      move_date_to_next_cambridge_week(
        self.active_date()
      )
    )
  }

  pub fn can_go_to_prev_week(&self) -> bool {
    self.is_cambridge_week_within_boundaries(
      move_date_to_prev_cambridge_week(
        self.active_date()
      )
    )
  }

  pub fn can_go_to_next_month(
    &self
  ) -> bool {
    self.is_month_within_boundaries(
      move_date_to_next_month(
        self.active_date()
      )
    )
  }

  pub fn can_go_to_prev_month(
    &self
  ) -> bool {
    self.is_month_within_boundaries(
      move_date_to_prev_month(
        self.active_date()
      )
    )
  }

  pub fn can_go_to_next_term(&self) -> bool {
    self
      .next_term_target()
      .is_some_and(|target| {
        self.is_date_within_boundaries(
          target
        )
      })
  }

  pub fn can_go_to_prev_term(&self) -> bool {
    self
      .prev_term_target()
      .is_some_and(|target| {
        self.is_date_within_boundaries(
          target
        )
      })
  }

  fn week_offset_days(&self) -> i64 {
    self
      .active_week()
      .map_or(0, |week| {
        i64::from(week.saturating_sub(1))
      })
      * 7
  }

  fn next_term_target(
    &self
  ) -> Option<NaiveDate> {
    let offset = self.week_offset_days();
    self
      .next_term_for_date(
        self.active_date()
      )
      .map(|term| {
        shift_days(term.start, offset)
      })
  }

  fn prev_term_target(
    &self
  ) -> Option<NaiveDate> {
    let offset = self.week_offset_days();
    self
      .prev_term_for_date(
        self.active_date()
      )
      .map(|term| {
        shift_days(term.start, offset)
      })
  }
}

fn term_index_for_date(
  terms: &[Term],
  date: NaiveDate
) -> Option<usize> {
  terms
    .iter()
    .enumerate()
    .filter(|(_, term)| {
      term.contains(date)
    })
    .map(|(idx, _)| idx)
    .last()
}

fn term_for_date(
  terms: &[Term],
  date: NaiveDate
) -> Option<&Term> {
  term_index_for_date(terms, date)
    .and_then(|idx| terms.get(idx))
}

fn term_for_month(
  terms: &[Term],
  date: NaiveDate
) -> Option<&Term> {
  terms
    .iter()
    .filter(|term| {
      term.owns_month_of(date)
    })
    .last()
}

fn first_thursday_on_or_after(
  date: NaiveDate
) -> NaiveDate {
  if date.weekday() == Weekday::Thu {
    date
  } else {
    move_date_to_next_cambridge_week(date)
  }
}

fn derive_state(
  terms: &[Term],
  date: NaiveDate
) -> CalendarState {
  let active_term =
    term_for_date(terms, date).cloned();
  let active_week = active_term
    .as_ref()
    .and_then(|term| term.week_for(date));
  CalendarState {
    active_date: date,
    active_term,
    active_week,
    active_month: month_name(date)
      .to_string(),
    active_month_term: term_for_month(
      terms, date
    )
    .cloned()
  }
}

#[cfg(test)]
mod tests {
  use std::cell::RefCell;
  use std::rc::Rc;

  use chrono::{
    Datelike,
    NaiveDate,
    Weekday
  };

  use super::{
    CalendarState,
    TermCalendar
  };
  use crate::error::CalendarError;
  use crate::term::Term;

  fn ymd(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  fn academic_year() -> TermCalendar {
    TermCalendar::new(
      vec![
        Term::new(
          "Michaelmas",
          ymd(2012, 10, 4)
        ),
        Term::new("Lent", ymd(2013, 1, 17)),
        Term::new(
          "Easter",
          ymd(2013, 4, 25)
        ),
      ],
      ymd(2012, 9, 1),
      ymd(2013, 8, 31)
    )
    .expect("valid calendar")
  }

  fn term_name(
    term: Option<&Term>
  ) -> Option<&str> {
    term.map(|t| t.name.as_str())
  }

  #[test]
  fn rejects_inverted_boundaries() {
    let err = TermCalendar::new(
      vec![],
      ymd(2013, 1, 1),
      ymd(2012, 1, 1)
    )
    .expect_err("inverted range");
    assert!(matches!(
      err,
      CalendarError::InvalidRange { .. }
    ));
  }

  #[test]
  fn rejects_malformed_data_attributes()
   {
    let err =
      TermCalendar::from_data_attributes(
        vec![],
        "2012-09-01",
        "31/08/2013"
      )
      .expect_err("bad end");
    assert!(matches!(
      err,
      CalendarError::InvalidDate { .. }
    ));
  }

  #[test]
  fn resolves_terms_and_weeks() {
    let cal = academic_year();
    assert_eq!(
      term_name(
        cal.term_for_date(ymd(2012, 10, 4))
      ),
      Some("Michaelmas")
    );
    assert_eq!(
      cal.term_week_for_date(ymd(
        2012, 10, 4
      )),
      Some(1)
    );
    assert_eq!(
      term_name(cal.term_for_date(ymd(
        2012, 10, 31
      ))),
      Some("Michaelmas")
    );
    assert_eq!(
      cal.term_week_for_date(ymd(
        2012, 10, 31
      )),
      Some(4)
    );
    assert_eq!(
      cal.term_for_date(ymd(2012, 11, 29)),
      None
    );
    assert_eq!(
      cal.term_week_for_date(ymd(
        2012, 11, 29
      )),
      None
    );
  }

  #[test]
  fn week_presence_matches_term_presence()
   {
    let cal = academic_year();
    let mut date = ymd(2012, 9, 1);
    while date <= ymd(2013, 8, 31) {
      assert_eq!(
        cal.term_for_date(date).is_some(),
        cal
          .term_week_for_date(date)
          .is_some(),
        "mismatch on {date}"
      );
      date = date.succ_opt().expect("next");
    }
  }

  #[test]
  fn month_resolution_differs_from_day_resolution()
   {
    let cal = academic_year();
    let date = ymd(2012, 10, 3);
    assert_eq!(
      cal.term_for_date(date),
      None
    );
    assert_eq!(
      term_name(cal.term_for_month(date)),
      Some("Michaelmas")
    );
    assert_eq!(
      cal.term_for_month(ymd(2012, 12, 15)),
      None
    );
  }

  #[test]
  fn overlapping_terms_resolve_to_last_match()
   {
    let cal = TermCalendar::new(
      vec![
        Term::new("First", ymd(2012, 10, 4)),
        Term::new(
          "Second",
          ymd(2012, 10, 11)
        ),
      ],
      ymd(2012, 9, 1),
      ymd(2013, 8, 31)
    )
    .expect("valid calendar");
    assert_eq!(
      term_name(cal.term_for_date(ymd(
        2012, 10, 20
      ))),
      Some("Second")
    );
    assert_eq!(
      cal.term_week_for_date(ymd(
        2012, 10, 20
      )),
      Some(2)
    );
    assert_eq!(
      term_name(cal.term_for_month(ymd(
        2012, 10, 1
      ))),
      Some("Second")
    );
  }

  #[test]
  fn finds_next_and_previous_terms() {
    let cal = academic_year();
    assert_eq!(
      term_name(cal.next_term_for_date(
        ymd(2011, 10, 4)
      )),
      Some("Michaelmas")
    );
    assert_eq!(
      term_name(cal.next_term_for_date(
        ymd(2012, 10, 4)
      )),
      Some("Lent")
    );
    assert_eq!(
      term_name(cal.prev_term_for_date(
        ymd(2013, 1, 17)
      )),
      Some("Michaelmas")
    );
    assert_eq!(
      term_name(cal.prev_term_for_date(
        ymd(2012, 12, 25)
      )),
      Some("Michaelmas")
    );
    assert_eq!(
      cal.next_term_for_date(ymd(
        2013, 5, 1
      )),
      None
    );
    assert_eq!(
      cal.prev_term_for_date(ymd(
        2012, 10, 4
      )),
      None
    );
  }

  #[test]
  fn equal_starts_keep_first_candidate()
   {
    let cal = TermCalendar::new(
      vec![
        Term::new("Alpha", ymd(2013, 1, 17)),
        Term::new("Beta", ymd(2013, 1, 17)),
      ],
      ymd(2012, 9, 1),
      ymd(2013, 8, 31)
    )
    .expect("valid calendar");
    assert_eq!(
      term_name(cal.next_term_for_date(
        ymd(2012, 12, 1)
      )),
      Some("Alpha")
    );
    assert_eq!(
      term_name(cal.prev_term_for_date(
        ymd(2013, 6, 1)
      )),
      Some("Alpha")
    );
  }

  #[test]
  fn set_active_date_clamps_idempotently()
   {
    let mut cal = academic_year();
    cal.set_active_date(ymd(2014, 1, 1));
    assert_eq!(
      cal.active_date(),
      ymd(2013, 8, 31)
    );
    cal.set_active_date(ymd(2014, 1, 1));
    assert_eq!(
      cal.active_date(),
      ymd(2013, 8, 31)
    );
    cal.set_active_date(ymd(2000, 1, 1));
    assert_eq!(
      cal.active_date(),
      ymd(2012, 9, 1)
    );
    cal.set_active_date(ymd(2012, 10, 31));
    assert_eq!(
      cal.active_date(),
      ymd(2012, 10, 31)
    );
  }

  #[test]
  fn derived_state_follows_active_date()
   {
    let mut cal = academic_year();
    cal.set_active_date(ymd(2012, 10, 31));
    assert_eq!(
      term_name(cal.active_term()),
      Some("Michaelmas")
    );
    assert_eq!(cal.active_week(), Some(4));
    assert_eq!(
      cal.active_month(),
      "October"
    );
    assert_eq!(
      term_name(cal.active_month_term()),
      Some("Michaelmas")
    );

    cal.set_active_date(ymd(2012, 12, 25));
    assert_eq!(cal.active_term(), None);
    assert_eq!(cal.active_week(), None);
    assert_eq!(
      cal.active_month(),
      "December"
    );
    assert_eq!(
      cal.active_month_term(),
      None
    );
  }

  #[test]
  fn boundary_checks_normalise_weeks_and_months()
   {
    let cal = TermCalendar::new(
      vec![],
      ymd(2012, 10, 9),
      ymd(2012, 11, 20)
    )
    .expect("valid calendar");
    assert!(
      !cal.is_date_within_boundaries(ymd(
        2012, 10, 5
      ))
    );
    assert!(
      cal.is_cambridge_week_within_boundaries(
        ymd(2012, 10, 5)
      )
    );
    assert!(
      !cal.is_cambridge_week_within_boundaries(
        ymd(2012, 10, 3)
      )
    );
    assert!(
      cal.is_cambridge_week_within_boundaries(
        ymd(2012, 11, 21)
      )
    );
    assert!(
      cal.is_month_within_boundaries(ymd(
        2012, 10, 1
      ))
    );
    assert!(
      cal.is_month_within_boundaries(ymd(
        2012, 11, 30
      ))
    );
    assert!(
      !cal.is_month_within_boundaries(ymd(
        2012, 12, 1
      ))
    );
  }

  #[test]
  fn term_navigation_preserves_week_offset()
   {
    let mut cal = academic_year();
    cal.set_active_date(ymd(2012, 10, 31));
    cal.go_to_next_term();
    assert_eq!(
      cal.active_date(),
      ymd(2013, 2, 7)
    );
    assert_eq!(
      term_name(cal.active_term()),
      Some("Lent")
    );
    assert_eq!(cal.active_week(), Some(4));

    cal.go_to_prev_term();
    assert_eq!(
      term_name(cal.active_term()),
      Some("Michaelmas")
    );
    assert_eq!(cal.active_week(), Some(4));
  }

  #[test]
  fn term_navigation_outside_term_lands_on_week_one()
   {
    let mut cal = academic_year();
    cal.set_active_date(ymd(2012, 12, 25));
    cal.go_to_next_term();
    assert_eq!(
      cal.active_date(),
      ymd(2013, 1, 17)
    );

    cal.set_active_date(ymd(2013, 7, 1));
    cal.go_to_next_term();
    assert_eq!(
      cal.active_date(),
      ymd(2013, 7, 1)
    );
    assert!(!cal.can_go_to_next_term());
    assert!(cal.can_go_to_prev_term());
  }

  #[test]
  fn week_navigation_moves_by_seven_days()
   {
    let mut cal = academic_year();
    cal.set_active_date(ymd(2012, 10, 9));
    cal.go_to_next_week();
    assert_eq!(
      cal.active_date(),
      ymd(2012, 10, 16)
    );
    cal.go_to_prev_cambridge_week();
    assert_eq!(
      cal.active_date(),
      ymd(2012, 10, 4)
    );
    cal.go_to_next_cambridge_week();
    assert_eq!(
      cal.active_date(),
      ymd(2012, 10, 11)
    );
    cal.go_to_prev_week();
    assert_eq!(
      cal.active_date(),
      ymd(2012, 10, 4)
    );

    cal.set_active_date(ymd(2012, 10, 14));
    cal.go_to_cambridge_week_start();
    assert_eq!(
      cal.active_date(),
      ymd(2012, 10, 11)
    );
  }

  #[test]
  fn month_navigation_snaps_forward_to_thursday()
   {
    let mut cal = academic_year();
    cal.set_active_date(ymd(2012, 10, 31));
    cal.go_to_next_month_first_thursday();
    assert_eq!(
      cal.active_date(),
      ymd(2012, 11, 1)
    );
    cal.go_to_next_month_first_thursday();
    assert_eq!(
      cal.active_date(),
      ymd(2012, 12, 6)
    );
    assert_eq!(
      cal.active_date().weekday(),
      Weekday::Thu
    );
    cal.go_to_prev_month_first_thursday();
    assert_eq!(
      cal.active_date(),
      ymd(2012, 11, 1)
    );
    cal.go_to_prev_month_first_thursday();
    assert_eq!(
      cal.active_date(),
      ymd(2012, 10, 4)
    );
  }

  #[test]
  fn navigation_is_clamped_at_boundaries()
   {
    let mut cal = academic_year();
    cal.set_active_date(ymd(2013, 8, 28));
    assert!(cal.can_go_to_prev_week());
    cal.go_to_next_week();
    assert_eq!(
      cal.active_date(),
      ymd(2013, 8, 31)
    );
    assert!(!cal.can_go_to_next_month());
    assert!(cal.can_go_to_prev_month());
    cal.go_to_next_month_first_thursday();
    assert_eq!(
      cal.active_date(),
      ymd(2013, 8, 31)
    );
  }

  #[test]
  fn listeners_fire_in_order_once_per_change()
   {
    let mut cal = academic_year();
    let seen: Rc<RefCell<Vec<String>>> =
      Rc::default();

    let first = Rc::clone(&seen);
    cal.on_change(
      move |state: &CalendarState| {
        first.borrow_mut().push(format!(
          "first:{}",
          state.active_date
        ));
      }
    );
    let second = Rc::clone(&seen);
    let second_id = cal.on_change(
      move |state: &CalendarState| {
        second.borrow_mut().push(format!(
          "second:{:?}",
          state.active_week
        ));
      }
    );

    cal.set_active_date(ymd(2012, 10, 31));
    cal.set_active_date(ymd(2012, 10, 31));
    assert_eq!(
      *seen.borrow(),
      vec![
        "first:2012-10-31".to_string(),
        "second:Some(4)".to_string(),
      ]
    );

    assert!(cal.remove_listener(second_id));
    assert!(!cal.remove_listener(second_id));
    cal.go_to_next_week();
    assert_eq!(seen.borrow().len(), 3);
    assert_eq!(
      seen.borrow()[2],
      "first:2012-11-07"
    );
  }

  #[test]
  fn clamped_repeat_does_not_notify() {
    let mut cal = academic_year();
    cal.set_active_date(ymd(2013, 8, 31));
    let count = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&count);
    cal.on_change(move |_| {
      *counter.borrow_mut() += 1;
    });
    cal.go_to_next_week();
    cal.go_to_next_term();
    assert_eq!(*count.borrow(), 0);
  }

  #[test]
  fn next_term_past_end_clamps_and_notifies()
   {
    let mut cal = TermCalendar::new(
      vec![
        Term::new(
          "Michaelmas",
          ymd(2012, 10, 4)
        ),
        Term::new("Lent", ymd(2013, 1, 17)),
        Term::new(
          "Easter",
          ymd(2013, 4, 25)
        ),
      ],
      ymd(2012, 9, 1),
      ymd(2013, 5, 31)
    )
    .expect("valid calendar")
    .with_active_date(ymd(2013, 3, 7));
    assert_eq!(cal.active_week(), Some(8));
    assert!(!cal.can_go_to_next_term());

    let count = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&count);
    cal.on_change(move |_| {
      *counter.borrow_mut() += 1;
    });
    cal.go_to_next_term();

    assert_eq!(
      cal.active_date(),
      ymd(2013, 5, 31)
    );
    assert_eq!(
      term_name(cal.active_term()),
      Some("Easter")
    );
    assert_eq!(cal.active_week(), Some(6));
    assert_eq!(*count.borrow(), 1);
    assert!(!cal.can_go_to_next_term());
  }
}
