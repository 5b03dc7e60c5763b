use chrono::NaiveDateTime;
use polars::prelude::{AnyValue, DataFrame};
use std::io::{self, Write};
use tidal_schedule::Schedule;
use tidal_schedule::persistence::{
    load_scenario_from_json, save_scenario_to_json, save_schedule_to_csv, save_schedule_to_json,
};
use tracing_subscriber::EnvFilter;

const TABLE_COLUMNS: [&str; 8] = [
    "id",
    "name",
    "start",
    "end",
    "duration_hours",
    "slack_hours",
    "is_critical",
    "constraints",
];

fn parse_time(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

fn cell_text(av: &AnyValue) -> String {
    match av {
        AnyValue::Null => String::new(),
        AnyValue::String(s) => s.to_string(),
        AnyValue::Float64(v) => format!("{v:.2}"),
        AnyValue::List(inner) => match inner.str() {
            Ok(ca) => ca.into_iter().flatten().collect::<Vec<_>>().join(","),
            Err(_) => av.to_string(),
        },
        _ => av.to_string(),
    }
}

fn render_df_as_text_table(df: &DataFrame) -> String {
    let columns = df.get_columns();
    let col_names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();
    let cells: Vec<Vec<String>> = columns
        .iter()
        .map(|col| {
            (0..df.height())
                .map(|row_idx| col.get(row_idx).map(|av| cell_text(&av)).unwrap_or_default())
                .collect()
        })
        .collect();

    let widths: Vec<usize> = col_names
        .iter()
        .zip(&cells)
        .map(|(name, column)| column.iter().map(String::len).fold(name.len(), usize::max))
        .collect();

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push('|');
    for (name, width) in col_names.iter().zip(&widths) {
        out.push_str(&format!(" {name:<width$} |"));
    }
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');

    for row_idx in 0..df.height() {
        out.push('|');
        for (column, width) in cells.iter().zip(&widths) {
            out.push_str(&format!(" {:<width$} |", column[row_idx]));
        }
        out.push('\n');
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn show(schedule: &Schedule) {
    match schedule
        .to_dataframe()
        .and_then(|df| Ok(df.select(TABLE_COLUMNS)?))
    {
        Ok(df) => println!("{}", render_df_as_text_table(&df)),
        Err(e) => println!("Error: {}", e),
    }
}

fn print_help() {
    println!(
        "Commands:\n  help                               Show this help\n  load <scenario.json>               Load a scenario\n  show                               Show current schedule\n  compute                            Forward + backward passes from project start\n  anchor <id|name> <YYYY-MM-DDTHH:MM>\n                                     Schedule around a pinned activity\n  sweep <id|name> <time,time,...>    Try several anchor times\n  critical                           List critical activities\n  warnings                           List warnings from the last run\n  shift <id|name>                    Hours relative to an activity's start\n  save <scenario|csv|json> <path>    Write scenario or computed schedule\n  quit|exit                          Exit"
    );
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let mut schedule: Option<Schedule> = None;
    if let Some(path) = std::env::args().nth(1) {
        match load_scenario_from_json(&path) {
            Ok(loaded) => {
                println!("Loaded {} activities from {}", loaded.activities().len(), path);
                schedule = Some(loaded);
            }
            Err(e) => println!("Load error: {}", e),
        }
    }

    println!("Tidal Schedule (CLI) - type 'help' for commands\n");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "load" => match parts.next() {
                Some(path) => match load_scenario_from_json(path) {
                    Ok(loaded) => {
                        println!("Loaded {} activities.", loaded.activities().len());
                        schedule = Some(loaded);
                    }
                    Err(e) => println!("Load error: {}", e),
                },
                None => println!("Usage: load <scenario.json>"),
            },
            _ => {
                let Some(current) = schedule.as_mut() else {
                    println!("No scenario loaded. Use 'load <scenario.json>'.");
                    continue;
                };
                run_command(current, cmd, parts.collect());
            }
        }
    }
}

fn run_command(schedule: &mut Schedule, cmd: &str, args: Vec<&str>) {
    match cmd {
        "show" => show(schedule),
        "compute" => match schedule.refresh() {
            Ok(summary) => {
                println!("Refreshed ({})", summary.to_cli_summary());
                show(schedule);
            }
            Err(e) => println!("Refresh error: {}", e),
        },
        "anchor" => match (args.first(), args.get(1).and_then(|s| parse_time(s))) {
            (Some(anchor), Some(at)) => match schedule.schedule_around(anchor, at) {
                Ok(summary) => {
                    println!("Anchored ({})", summary.to_cli_summary());
                    show(schedule);
                }
                Err(e) => println!("Anchor error: {}", e),
            },
            _ => println!("Usage: anchor <id|name> <YYYY-MM-DDTHH:MM>"),
        },
        "sweep" => {
            let times: Option<Vec<NaiveDateTime>> = args.get(1).and_then(|csv| {
                csv.split(',')
                    .map(|s| parse_time(s.trim()))
                    .collect::<Option<Vec<_>>>()
            });
            match (args.first(), times) {
                (Some(anchor), Some(times)) => {
                    for outcome in schedule.sweep_anchor_times(anchor, &times) {
                        match outcome.result {
                            Ok(summary) => println!("{}: {}", outcome.at, summary.to_cli_summary()),
                            Err(e) => println!("{}: error: {}", outcome.at, e),
                        }
                    }
                }
                _ => println!("Usage: sweep <id|name> <time,time,...>"),
            }
        }
        "critical" => {
            let path = schedule.critical_path();
            if path.is_empty() {
                println!("No critical activities (run 'compute' or 'anchor' first).");
            }
            for activity in path {
                println!(
                    "{} {} {} -> {}",
                    activity.id,
                    activity.name,
                    activity.start.map(|t| t.to_string()).unwrap_or_default(),
                    activity.end.map(|t| t.to_string()).unwrap_or_default()
                );
            }
        }
        "warnings" => {
            if schedule.warnings().is_empty() {
                println!("No warnings.");
            }
            for warning in schedule.warnings() {
                println!("{}", warning);
            }
        }
        "shift" => match args.first() {
            Some(zero) => match schedule.relative_hours(zero) {
                Ok(timings) => {
                    for timing in timings {
                        println!(
                            "{} {:+.2}h -> {:+.2}h",
                            timing.id, timing.start_hours, timing.end_hours
                        );
                    }
                }
                Err(e) => println!("Error: {}", e),
            },
            None => println!("Usage: shift <id|name>"),
        },
        "save" => {
            let result = match (args.first().copied(), args.get(1)) {
                (Some("scenario"), Some(path)) => save_scenario_to_json(schedule, path),
                (Some("csv"), Some(path)) => save_schedule_to_csv(schedule, path),
                (Some("json"), Some(path)) => save_schedule_to_json(schedule, path),
                _ => {
                    println!("Usage: save <scenario|csv|json> <path>");
                    return;
                }
            };
            match result {
                Ok(()) => println!("Saved."),
                Err(e) => println!("Save error: {}", e),
            }
        }
        _ => println!("Unknown command. Type 'help'."),
    }
}
