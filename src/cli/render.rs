use ansi_term::Colour;
use chrono::{DateTime, Local, NaiveDate, Utc};

use crate::{
    engine::{
        aggregate::{ActivityDetail, TaskStats},
        entities::TaskEntity,
    },
    utils::percentage::{minutes_share, Percentage},
};

/// A colored marker for a task, derived from its stored `#rrggbb` color.
/// Falls back to a plain dot when the color string doesn't parse or the
/// terminal shouldn't be colored.
pub fn color_chip(hex: &str) -> String {
    match parse_hex(hex) {
        Some((r, g, b)) => Colour::RGB(r, g, b).paint("●").to_string(),
        None => "●".to_string(),
    }
}

fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

pub fn format_minutes(minutes: u64) -> String {
    if minutes >= 60 {
        format!("{}h{}m", minutes / 60, minutes % 60)
    } else {
        format!("{}m", minutes)
    }
}

fn format_instant(instant: DateTime<Utc>) -> String {
    instant.with_timezone(&Local).format("%x %H:%M").to_string()
}

pub fn print_tasks(tasks: &[TaskEntity]) {
    for task in tasks {
        println!(
            "{}\t{} {}\t{}",
            task.id,
            color_chip(&task.color),
            task.name,
            task.created_at.with_timezone(&Local).format("%x")
        );
    }
}

pub fn print_task(task: &TaskEntity) {
    println!("{}\t{} {}", task.id, color_chip(&task.color), task.name);
}

pub fn print_activity_details(details: &[ActivityDetail]) {
    for detail in details {
        let activity = &detail.activity;
        let when = match (activity.start_time, activity.end_time) {
            (Some(start), Some(end)) => {
                format!("{} - {}", format_instant(start), end.with_timezone(&Local).format("%H:%M"))
            }
            (Some(start), None) => format!("{} - running", format_instant(start)),
            _ => format!("{} (no time assigned)", format_instant(activity.logged_at)),
        };
        println!(
            "{}\t{} {}\t{}\t{}",
            activity.id,
            color_chip(&detail.task_color),
            detail.task_name,
            format_minutes(activity.duration_minutes as u64),
            when,
        );
    }
}

pub fn print_running(detail: &ActivityDetail, now: DateTime<Utc>) {
    let activity = &detail.activity;
    let elapsed = activity
        .start_time
        .map(|start| (now - start).num_minutes().max(0) as u64)
        .unwrap_or(0);
    println!(
        "{} {} running for {} (activity {})",
        color_chip(&detail.task_color),
        detail.task_name,
        format_minutes(elapsed),
        activity.id,
    );
}

pub fn print_days(days: impl IntoIterator<Item = NaiveDate>) {
    for day in days {
        println!("{}", day.format("%Y-%m-%d"));
    }
}

/// Histogram-style listing: share of the range total, hours, task. Tasks
/// under `min_share` of the total are dropped from the output.
pub fn print_stats(stats: &[TaskStats], min_share: Percentage) {
    let total: u64 = stats.iter().map(|s| s.total_minutes).sum();
    for entry in stats {
        let share = minutes_share(entry.total_minutes, total);
        if share < min_share {
            continue;
        }
        println!(
            "{}%\t{:.2}h\t{} {}",
            *share as i32,
            entry.total_hours,
            color_chip(&entry.task_color),
            entry.task_name,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{format_minutes, parse_hex};

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("#ff8000"), Some((255, 128, 0)));
        assert_eq!(parse_hex("ff8000"), None);
        assert_eq!(parse_hex("#ff80"), None);
        assert_eq!(parse_hex("#zzzzzz"), None);
    }

    #[test]
    fn test_format_minutes() {
        assert_eq!(format_minutes(45), "45m");
        assert_eq!(format_minutes(60), "1h0m");
        assert_eq!(format_minutes(95), "1h35m");
    }
}
