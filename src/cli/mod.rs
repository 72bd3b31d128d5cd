pub mod render;

use std::{fmt::Display, path::PathBuf, sync::Arc};

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate, Utc};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use tracing::level_filters::LevelFilter;

use crate::{
    engine::{recorder::TimeShape, Engine},
    utils::{
        clock::{Clock, SystemClock},
        dir::create_application_default_path,
        logging::{enable_logging, CLI_PREFIX},
        percentage::Percentage,
    },
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "Timetally", version, long_about = None)]
#[command(about = "Track time spent on named tasks", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Mirror logs to the terminal")]
    log: bool,
    #[arg(
        long,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(subcommand, about = "Create, list and delete tasks")]
    Task(TaskCommands),
    #[command(about = "Start a stopwatch for a task. Fails while another stopwatch runs")]
    Start { task_id: u64 },
    #[command(about = "Stop the running stopwatch")]
    Stop,
    #[command(about = "Show the running stopwatch, if any")]
    Status,
    #[command(about = "Log a finished entry: either --start with --end, or --minutes")]
    Log {
        task_id: u64,
        #[arg(long, help = "Start of the entry. Examples are \"yesterday\", \"1 hour ago\", \"12:00 16/03/2025\"")]
        start: Option<String>,
        #[arg(long, help = "End of the entry, same formats as --start")]
        end: Option<String>,
        #[arg(long, help = "Total duration in minutes, for entries without clock times")]
        minutes: Option<i64>,
        #[arg(long, help = "Instant the entry should be booked under. Defaults to the start time, or to now for duration-only entries")]
        at: Option<String>,
    },
    #[command(about = "Delete a logged entry by id")]
    Rm { activity_id: u64 },
    #[command(about = "List entries for a day or a date range")]
    List {
        #[arg(long, conflicts_with_all = ["from", "to"], help = "Single day to list. Defaults to today when no range is given")]
        day: Option<String>,
        #[arg(long, requires = "to", help = "Start of an inclusive date range")]
        from: Option<String>,
        #[arg(long, requires = "from", help = "End of an inclusive date range")]
        to: Option<String>,
    },
    #[command(about = "Show which days of a month have at least one entry")]
    Days {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
    },
    #[command(about = "Total hours per task over a date range, largest first")]
    Stats {
        #[arg(long, help = "Start of the range. Defaults to 30 days before the end")]
        from: Option<String>,
        #[arg(long, help = "End of the range. Defaults to today")]
        to: Option<String>,
        #[arg(long = "min-share", default_value_t = Percentage::new_opt(0.).unwrap(), help = "Hide tasks below this percentage of the range total")]
        min_share: Percentage,
    },
}

#[derive(Subcommand, Debug)]
enum TaskCommands {
    #[command(about = "Create a task. The color is assigned automatically")]
    Add { name: String },
    #[command(about = "List all tasks in creation order")]
    List,
    #[command(about = "Delete a task. Its logged entries stay behind")]
    Rm { id: u64 },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = args
        .dir
        .clone()
        .map_or_else(create_application_default_path, Ok)?;

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(CLI_PREFIX, &app_dir, logging_level, args.log)?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let engine = Engine::open(&app_dir.join("data"), clock.clone()).await?;

    let dialect: chrono_english::Dialect = args.date_style.into();

    match args.commands {
        Commands::Task(TaskCommands::Add { name }) => {
            let task = engine.tasks.create(&name).await?;
            render::print_task(&task);
            Ok(())
        }
        Commands::Task(TaskCommands::List) => {
            render::print_tasks(&engine.tasks.list().await);
            Ok(())
        }
        Commands::Task(TaskCommands::Rm { id }) => {
            engine.tasks.delete(id).await?;
            println!("Deleted task {id}");
            Ok(())
        }
        Commands::Start { task_id } => {
            let activity = engine.recorder.start_stopwatch(task_id).await?;
            let task = engine.tasks.get(task_id).await?;
            println!(
                "{} {} started (activity {})",
                render::color_chip(&task.color),
                task.name,
                activity.id
            );
            Ok(())
        }
        Commands::Stop => {
            let Some(running) = engine.activities.get_running().await else {
                println!("No stopwatch is running");
                return Ok(());
            };
            let stopped = engine.recorder.stop(running.id).await?;
            println!(
                "Stopped after {}",
                render::format_minutes(stopped.duration_minutes as u64)
            );
            Ok(())
        }
        Commands::Status => {
            match engine.aggregate.running_detail().await? {
                Some(detail) => render::print_running(&detail, clock.time()),
                None => println!("No stopwatch is running"),
            }
            Ok(())
        }
        Commands::Log {
            task_id,
            start,
            end,
            minutes,
            at,
        } => {
            let start = parse_instant_opt(start, dialect)?;
            let end = parse_instant_opt(end, dialect)?;
            let at = parse_instant_opt(at, dialect)?;
            let shape = TimeShape::from_parts(start, end, minutes)?;
            let entry = engine.recorder.log_manual(task_id, shape, at).await?;
            println!(
                "Logged {} (activity {})",
                render::format_minutes(entry.duration_minutes as u64),
                entry.id
            );
            Ok(())
        }
        Commands::Rm { activity_id } => {
            engine.recorder.delete_activity(activity_id).await?;
            println!("Deleted activity {activity_id}");
            Ok(())
        }
        Commands::List { day, from, to } => {
            let details = match (day, from, to) {
                (Some(day), _, _) => {
                    engine.aggregate.day_detail(parse_day(&day, dialect)?).await?
                }
                (None, Some(from), Some(to)) => {
                    let from = parse_day(&from, dialect)?;
                    let to = parse_day(&to, dialect)?;
                    engine.aggregate.range_detail(from, to).await?
                }
                // clap guarantees from and to come together.
                _ => {
                    engine
                        .aggregate
                        .day_detail(Local::now().date_naive())
                        .await?
                }
            };
            render::print_activity_details(&details);
            Ok(())
        }
        Commands::Days { year, month } => {
            let days = engine.aggregate.days_with_activity(year, month).await?;
            render::print_days(days);
            Ok(())
        }
        Commands::Stats {
            from,
            to,
            min_share,
        } => {
            let from = from.map(|v| parse_day(&v, dialect)).transpose()?;
            let to = to.map(|v| parse_day(&v, dialect)).transpose()?;
            let stats = engine.aggregate.stats_by_task(from, to).await?;
            render::print_stats(&stats, min_share);
            Ok(())
        }
    }
}

fn parse_instant_opt(
    text: Option<String>,
    dialect: chrono_english::Dialect,
) -> Result<Option<DateTime<Utc>>> {
    text.map(|text| parse_instant(&text, dialect)).transpose()
}

fn parse_instant(text: &str, dialect: chrono_english::Dialect) -> Result<DateTime<Utc>> {
    match parse_date_string(text, Local::now(), dialect) {
        Ok(v) => Ok(v.with_timezone(&Utc)),
        Err(e) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to parse date '{text}': {e}"),
            )
            .into()),
    }
}

fn parse_day(text: &str, dialect: chrono_english::Dialect) -> Result<NaiveDate> {
    Ok(parse_instant(text, dialect)?
        .with_timezone(&Local)
        .date_naive())
}
