//! Whether a habit is due on a given calendar day.
//!
//! This predicate is shared by the interpreter and the executor so the
//! preview's "scheduled" set and the executed set are computed identically.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::types::{date_key, Frequency, Habit};

/// English and Czech names for a weekday, lowercase.
fn weekday_names(day: Weekday) -> &'static [&'static str] {
    match day {
        Weekday::Mon => &["monday", "mon", "pondělí", "pondeli", "po"],
        Weekday::Tue => &["tuesday", "tue", "úterý", "utery", "út", "ut"],
        Weekday::Wed => &["wednesday", "wed", "středa", "streda", "st"],
        Weekday::Thu => &["thursday", "thu", "čtvrtek", "ctvrtek", "čt", "ct"],
        Weekday::Fri => &["friday", "fri", "pátek", "patek", "pá", "pa"],
        Weekday::Sat => &["saturday", "sat", "sobota", "so"],
        Weekday::Sun => &["sunday", "sun", "neděle", "nedele", "ne"],
    }
}

/// Precedence: daily, always-show, weekday selection for weekly/custom,
/// then explicit dates.
pub fn is_scheduled_for_day(habit: &Habit, date: NaiveDate) -> bool {
    if habit.frequency == Frequency::Daily {
        return true;
    }
    if habit.always_show {
        return true;
    }
    if matches!(habit.frequency, Frequency::Weekly | Frequency::Custom) {
        if let Some(selected) = &habit.selected_days {
            let names = weekday_names(date.weekday());
            if selected.days().iter().any(|d| names.contains(&d.as_str())) {
                return true;
            }
        }
    }
    let key = date_key(date);
    habit
        .selected_dates
        .iter()
        .any(|d| d.trim().get(..10).unwrap_or(d.trim()) == key)
}
