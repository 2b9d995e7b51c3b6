use anyhow::{
  Context,
  anyhow
};
use chrono::{
  Datelike,
  Duration,
  Month,
  Months,
  NaiveDate,
  Weekday
};
use regex::Regex;

use crate::error::CalendarError;

/// Fixed wire format for term starts and
/// calendar boundaries.
pub const DATE_FORMAT: &str =
  "%Y-%m-%d";

const THURSDAY: u32 = 4;

pub fn parse_date(
  field: &str,
  value: &str
) -> Result<NaiveDate, CalendarError> {
  NaiveDate::parse_from_str(
    value.trim(),
    DATE_FORMAT
  )
  .map_err(|_| {
    CalendarError::InvalidDate {
      field: field.to_string(),
      value: value.to_string()
    }
  })
}

#[must_use]
pub fn format_date(
  date: NaiveDate
) -> String {
  date.format(DATE_FORMAT).to_string()
}

/// Most recent Thursday on or before
/// `date`. A Cambridge week runs
/// Thursday to Wednesday.
#[must_use]
pub fn cambridge_week_start_for_date(
  date: NaiveDate
) -> NaiveDate {
  let day =
    date.weekday().num_days_from_sunday();
  if day == THURSDAY {
    return date;
  }

  let back = if day >= THURSDAY {
    day - THURSDAY
  } else {
    7 - (THURSDAY - day)
  };
  shift_days(date, -i64::from(back))
}

#[must_use]
pub fn month_start_for_date(
  date: NaiveDate
) -> NaiveDate {
  NaiveDate::from_ymd_opt(
    date.year(),
    date.month(),
    1
  )
  .unwrap_or(date)
}

#[must_use]
pub fn move_date_to_next_week(
  date: NaiveDate
) -> NaiveDate {
  shift_days(date, 7)
}

#[must_use]
pub fn move_date_to_prev_week(
  date: NaiveDate
) -> NaiveDate {
  shift_days(date, -7)
}

#[must_use]
pub fn move_date_to_next_cambridge_week(
  date: NaiveDate
) -> NaiveDate {
  move_date_to_next_week(
    cambridge_week_start_for_date(date)
  )
}

#[must_use]
pub fn move_date_to_prev_cambridge_week(
  date: NaiveDate
) -> NaiveDate {
  move_date_to_prev_week(
    cambridge_week_start_for_date(date)
  )
}

#[must_use]
pub fn move_date_to_next_month(
  date: NaiveDate
) -> NaiveDate {
  let start = month_start_for_date(date);
  start
    .checked_add_months(Months::new(1))
    .unwrap_or(start)
}

#[must_use]
pub fn move_date_to_prev_month(
  date: NaiveDate
) -> NaiveDate {
  let start = month_start_for_date(date);
  start
    .checked_sub_months(Months::new(1))
    .unwrap_or(start)
}

/// English month name, e.g. `October`.
#[must_use]
pub fn month_name(
  date: NaiveDate
) -> &'static str {
  u8::try_from(date.month())
    .ok()
    .and_then(|m| {
      Month::try_from(m).ok()
    })
    .map_or("", |month| month.name())
}

/// Saturates at the edge of the
/// representable range.
pub(crate) fn shift_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  Duration::try_days(days)
    .and_then(|delta| {
      date.checked_add_signed(delta)
    })
    .unwrap_or(date)
}

#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_date_expr(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" | "now" => {
      return Ok(today);
    }
    | "tomorrow" => {
      return Ok(shift_days(today, 1));
    }
    | "yesterday" => {
      return Ok(shift_days(today, -1));
    }
    | _ => {}
  }

  if let Some(target_weekday) =
    parse_weekday_name(&lower)
  {
    return Ok(next_weekday_date(
      today,
      target_weekday
    ));
  }

  if let Some(target_month) =
    parse_month_name(&lower)
  {
    let this_year =
      NaiveDate::from_ymd_opt(
        today.year(),
        target_month,
        1
      )
      .ok_or_else(|| {
        anyhow!(
          "invalid month value: \
           {target_month}"
        )
      })?;
    if this_year > today {
      return Ok(this_year);
    }
    return NaiveDate::from_ymd_opt(
      today.year().saturating_add(1),
      target_month,
      1
    )
    .ok_or_else(|| {
      anyhow!(
        "invalid month/year candidate"
      )
    });
  }

  let rel_re = Regex::new(r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dw])$")
        .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;

  if let Some(caps) =
    rel_re.captures(&lower)
  {
    let num: i64 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    let days = match caps
      .name("unit")
      .map(|m| m.as_str())
    {
      | Some("d") => num,
      | Some("w") => {
        num.saturating_mul(7)
      }
      | other => {
        return Err(anyhow!(
          "unknown relative unit: \
           {other:?}"
        ));
      }
    };
    let negative = caps
      .name("sign")
      .is_some_and(|m| m.as_str() == "-");

    return Ok(shift_days(
      today,
      if negative { -days } else { days }
    ));
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token,
      DATE_FORMAT
    )
  {
    return Ok(date);
  }

  Err(anyhow!(
    "unrecognized date expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     today/tomorrow/yesterday, \
     weekday names (e.g. thursday), \
     month names (e.g. october), \
     +Nd/-Nd/+Nw/-Nw, YYYY-MM-DD"
  })
}

fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = from
    .weekday()
    .num_days_from_monday()
    as i64;
  let target_idx = target
    .num_days_from_monday()
    as i64;
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  shift_days(from, delta)
}

fn parse_month_name(
  token: &str
) -> Option<u32> {
  match token.trim() {
    | "january" | "jan" => Some(1),
    | "february" | "feb" => Some(2),
    | "march" | "mar" => Some(3),
    | "april" | "apr" => Some(4),
    | "may" => Some(5),
    | "june" | "jun" => Some(6),
    | "july" | "jul" => Some(7),
    | "august" | "aug" => Some(8),
    | "september" | "sep" | "sept" => {
      Some(9)
    }
    | "october" | "oct" => Some(10),
    | "november" | "nov" => Some(11),
    | "december" | "dec" => Some(12),
    | _ => None
  }
}
