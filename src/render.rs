//! TUI rendering for calgrid types.
//!
//! This module provides extension traits that add colored terminal rendering
//! to calgrid-core types using owo_colors.

use calgrid_core::error::WriteOp;
use calgrid_core::screen::{CalendarScreen, CellAnnotation};
use calgrid_core::state::{Notice, WriteOutcome};
use calgrid_core::{CalendarInfo, Event};
use chrono::{Datelike, NaiveDate, Weekday};
use chrono_tz::Tz;
use console::Alignment;
use owo_colors::OwoColorize;

/// Width of one grid cell in characters.
const CELL_WIDTH: usize = 11;

/// Extension trait for TUI rendering with colors.
pub trait Render {
    fn render(&self) -> String;
}

impl Render for CalendarInfo {
    fn render(&self) -> String {
        let account = format!("{} · {}", self.account_name, self.account_type);
        format!(
            "📅 {} {} {}",
            self.name,
            format!("[{}]", self.id).dimmed(),
            account.dimmed()
        )
    }
}

impl Render for Notice {
    fn render(&self) -> String {
        match self {
            Notice::PermissionDenied => "Calendar access is required".red().to_string(),
            Notice::WriteRejected(op) => format!("The calendar rejected the {op}").red().to_string(),
            Notice::NoCalendar => "No calendar available. Load calendars first".yellow().to_string(),
            Notice::StoreFailure(msg) => format!("Calendar store error: {msg}").red().to_string(),
        }
    }
}

impl Render for WriteOutcome {
    fn render(&self) -> String {
        match self {
            WriteOutcome::Inserted(id) => format!("{} Added event {}", "+".green(), id),
            WriteOutcome::Updated(id) => format!("{} Updated event {}", "~".yellow(), id),
            WriteOutcome::Deleted(id) => format!("{} Deleted event {}", "-".red(), id),
            WriteOutcome::Rejected(op) => format!("{} {}", "!".red(), rejected_message(*op)),
            WriteOutcome::PermissionDenied => {
                format!("{} {}", "!".red(), "Calendar access is required")
            }
            WriteOutcome::Failed(msg) => format!("{} {}", "!".red(), msg.red()),
            WriteOutcome::Cancelled => "Cancelled".dimmed().to_string(),
        }
    }
}

fn rejected_message(op: WriteOp) -> &'static str {
    match op {
        WriteOp::Insert => "The event could not be added",
        WriteOp::Update => "No such event to update",
        WriteOp::Delete => "No such event to delete",
    }
}

/// One line for an event in a day list, e.g. ` 09:00-09:30  Standup  [4] Work`
pub fn render_event(event: &Event, tz: &Tz) -> String {
    let start = event.start.with_timezone(tz).format("%H:%M");
    let end = event.end.with_timezone(tz).format("%H:%M");
    let mut line = format!(
        "  {}  {}  {}",
        format!("{start}-{end}").dimmed(),
        event.title,
        format!("[{}]", event.id).dimmed()
    );

    if let Some(calendar) = event.calendar_name() {
        line.push_str(&format!(" {}", calendar.dimmed()));
    }
    if !event.description().is_empty() {
        line.push_str(&format!("\n      {}", event.description().dimmed()));
    }
    line
}

/// The event list of `date`.
pub fn render_day(date: NaiveDate, events: &[Event], tz: &Tz) -> String {
    let mut lines = vec![date.format("%a %b %-d, %Y").bold().to_string()];

    if events.is_empty() {
        lines.push(format!("  {}", "No events".dimmed()));
    } else {
        lines.extend(events.iter().map(|e| render_event(e, tz)));
    }

    lines.join("\n")
}

/// The month grid with the first event title of every day.
pub fn render_month(screen: &CalendarScreen) -> String {
    let grid = screen.grid();
    let cells = screen.cells();
    let mut lines = Vec::new();

    let title = grid.month().format("%B %Y").to_string();
    let total_width = CELL_WIDTH * 7;
    lines.push(format!("{:^total_width$}", title).bold().to_string());

    let header: String = grid
        .week_start()
        .columns()
        .iter()
        .map(|day| colorize_weekday(*day, &pad(&day.to_string(), CELL_WIDTH)))
        .collect();
    lines.push(header);

    for row in cells.chunks(7) {
        let mut days = String::new();
        let mut labels = String::new();
        let mut more = String::new();

        for cell in row {
            days.push_str(&render_day_number(cell));
            labels.push_str(&render_label(cell));
            more.push_str(&render_more(cell));
        }

        lines.push(days);
        lines.push(labels);
        if row.iter().any(|c| c.more > 0) {
            lines.push(more);
        }
    }

    lines.join("\n")
}

fn render_day_number(cell: &CellAnnotation) -> String {
    let number = format!("{:>2}", cell.date.day());

    let styled = if !cell.in_month {
        number.dimmed().to_string()
    } else {
        colorize_weekday(cell.date.weekday(), &number)
    };

    let styled = match (cell.selected, cell.today) {
        (true, _) => styled.reversed().to_string(),
        (false, true) => styled.underline().to_string(),
        _ => styled,
    };

    format!("{styled}{}", " ".repeat(CELL_WIDTH - 2))
}

fn render_label(cell: &CellAnnotation) -> String {
    let label = cell.label.as_deref().unwrap_or_default();
    let text = pad(&truncate(label, CELL_WIDTH - 1), CELL_WIDTH);
    if cell.in_month {
        text.cyan().to_string()
    } else {
        text.dimmed().to_string()
    }
}

fn render_more(cell: &CellAnnotation) -> String {
    if cell.more == 0 {
        return " ".repeat(CELL_WIDTH);
    }
    pad(&format!("+{} more", cell.more), CELL_WIDTH)
        .dimmed()
        .to_string()
}

/// Sunday red, Saturday blue.
fn colorize_weekday(day: Weekday, text: &str) -> String {
    match day {
        Weekday::Sun => text.red().to_string(),
        Weekday::Sat => text.blue().to_string(),
        _ => text.to_string(),
    }
}

/// Cut `text` to `width` terminal columns.
fn truncate(text: &str, width: usize) -> String {
    console::truncate_str(text, width, "…").into_owned()
}

/// Left-align `text` in `width` terminal columns.
fn pad(text: &str, width: usize) -> String {
    console::pad_str(text, width, Alignment::Left, None).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_keeps_width() {
        assert_eq!(truncate("Standup", 10), "Standup");
        assert_eq!(truncate("Quarterly planning", 10), "Quarterly…");
        assert_eq!(truncate("Quarterly planning", 10).chars().count(), 10);
    }

    #[test]
    fn test_pad() {
        assert_eq!(pad("ab", 4), "ab  ");
        assert_eq!(pad("abcdef", 4), "abcdef");
    }

    #[test]
    fn test_wide_titles_fit_the_cell() {
        // Hangul syllables take two columns each
        let label = pad(&truncate("주간 회의 준비", CELL_WIDTH - 1), CELL_WIDTH);
        assert_eq!(console::measure_text_width(&label), CELL_WIDTH);

        assert_eq!(pad("회의", 6), "회의  ");
    }
}
