use game_scheduler::{
    AppConfig, EngineError, InMemoryStore, Scheduler, Session, SessionStatus, SqliteStore,
    parse_local_datetime, save_sessions_to_csv, save_sessions_to_json,
};
use std::io::{self, Write};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (ci, cell) in row.iter().enumerate() {
            if cell.len() > widths[ci] {
                widths[ci] = cell.len();
            }
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let render_row = |cells: Vec<&str>| {
        let mut line = String::from("|");
        for (ci, cell) in cells.iter().enumerate() {
            line.push(' ');
            line.push_str(cell);
            line.push_str(&" ".repeat(widths[ci].saturating_sub(cell.len())));
            line.push_str(" |");
        }
        line
    };

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_row(headers.to_vec()));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in rows {
        out.push_str(&render_row(row.iter().map(String::as_str).collect()));
        out.push('\n');
    }
    out.push_str(&sep);
    out
}

fn render_sessions(sessions: &[Session]) -> String {
    let rows: Vec<Vec<String>> = sessions
        .iter()
        .enumerate()
        .map(|(idx, s)| {
            vec![
                (idx + 1).to_string(),
                s.id.clone(),
                s.item_title.clone().unwrap_or_else(|| s.item_id.clone()),
                s.start.format("%Y-%m-%d %H:%M").to_string(),
                s.end.format("%H:%M").to_string(),
                s.status.to_string(),
            ]
        })
        .collect();
    render_table(&["#", "id", "game", "start", "end", "status"], &rows)
}

fn print_help() {
    println!(
        "Commands:\n  help                               Show this help\n  user <owner>                       Switch the active owner\n  game add <title...>                Add an unstarted game to the backlog\n  games                              List the backlog\n  fixed add <start> <end> <title...> Add a fixed event (YYYY-MM-DDTHH:MM)\n  fixed list                         List fixed events\n  generate                           Regenerate the play schedule\n  schedule                           Show generated sessions\n  complete <#|id>                    Mark a session completed\n  skip <#|id>                        Mark a session skipped\n  motivation                         Show points, rank and level\n  export <json|csv> <path>           Write the schedule to disk\n  quit|exit                          Exit"
    );
}

/// Accepts either a session id or its 1-based row number in `schedule`.
fn resolve_session_id(scheduler: &Scheduler, owner: &str, key: &str) -> Result<String, EngineError> {
    if let Ok(row) = key.parse::<usize>() {
        let sessions = scheduler.list_sessions(owner)?;
        if let Some(session) = row.checked_sub(1).and_then(|idx| sessions.get(idx)) {
            return Ok(session.id.clone());
        }
    }
    Ok(key.to_string())
}

fn transition(scheduler: &Scheduler, owner: &str, key: Option<&str>, status: SessionStatus) {
    let Some(key) = key else {
        println!("Usage: {} <#|id>", if status == SessionStatus::Completed { "complete" } else { "skip" });
        return;
    };
    let result = resolve_session_id(scheduler, owner, key)
        .and_then(|id| scheduler.update_owned_status(owner, &id, status));
    match result {
        Ok(update) => println!(
            "Session {} marked {}. points={} rank={} level={}",
            update.session.id,
            update.session.status,
            update.motivation.points,
            update.motivation.rank,
            update.motivation.level
        ),
        Err(err) => println!("Error: {err}"),
    }
}

fn build_scheduler(config: &AppConfig) -> Result<Scheduler, Box<dyn std::error::Error>> {
    Ok(match &config.server.database {
        Some(path) => Scheduler::with_store(Arc::new(SqliteStore::new(path)?), config.engine.clone()),
        None => Scheduler::with_store(Arc::new(InMemoryStore::new()), config.engine.clone()),
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let config = AppConfig::load()?;
    let scheduler = build_scheduler(&config)?;
    let mut owner = config.server.default_owner.clone();

    println!("Game Scheduler (CLI) - type 'help' for commands\n");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("[{owner}]> ");
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
        let Some(cmd) = parts.next() else {
            continue;
        };
        match cmd {
            "help" | "?" => print_help(),
            "quit" | "exit" => break,
            "user" => match parts.next() {
                Some(next) => {
                    owner = next.to_string();
                    println!("Active owner is now {owner}.");
                }
                None => println!("Usage: user <owner>"),
            },
            "game" => {
                if parts.next() != Some("add") {
                    println!("Usage: game add <title...>");
                    continue;
                }
                let title = parts.collect::<Vec<_>>().join(" ");
                match scheduler.create_backlog_item(&owner, &title, None) {
                    Ok(item) => println!("Added game '{}' ({}).", item.title, item.id),
                    Err(err) => println!("Error: {err}"),
                }
            }
            "games" => match scheduler.list_backlog(&owner) {
                Ok(items) => {
                    let rows: Vec<Vec<String>> = items
                        .iter()
                        .map(|item| vec![item.id.clone(), item.title.clone(), item.status.to_string()])
                        .collect();
                    println!("{}", render_table(&["id", "title", "status"], &rows));
                }
                Err(err) => println!("Error: {err}"),
            },
            "fixed" => match parts.next() {
                Some("add") => {
                    let (Some(start), Some(end)) = (parts.next(), parts.next()) else {
                        println!("Usage: fixed add <start> <end> <title...>");
                        continue;
                    };
                    let title = parts.collect::<Vec<_>>().join(" ");
                    let parsed = parse_local_datetime(start)
                        .and_then(|s| parse_local_datetime(end).map(|e| (s, e)))
                        .map_err(EngineError::InvalidInput);
                    match parsed.and_then(|(s, e)| scheduler.create_fixed_event(&owner, &title, s, e)) {
                        Ok(event) => println!(
                            "Added fixed event '{}' {} - {}.",
                            event.title, event.start, event.end
                        ),
                        Err(err) => println!("Error: {err}"),
                    }
                }
                Some("list") => match scheduler.list_fixed_events(&owner) {
                    Ok(events) => {
                        let rows: Vec<Vec<String>> = events
                            .iter()
                            .map(|e| {
                                vec![
                                    e.title.clone(),
                                    e.start.format("%Y-%m-%d %H:%M").to_string(),
                                    e.end.format("%Y-%m-%d %H:%M").to_string(),
                                ]
                            })
                            .collect();
                        println!("{}", render_table(&["title", "start", "end"], &rows));
                    }
                    Err(err) => println!("Error: {err}"),
                },
                _ => println!("Usage: fixed <add|list> ..."),
            },
            "generate" => match scheduler.generate_report(&owner) {
                Ok(report) if report.is_empty() => {
                    println!("No unstarted games to schedule.");
                }
                Ok(report) => {
                    println!("Schedule generated: {}", report.to_cli_summary());
                    println!("{}", render_sessions(&report.sessions));
                }
                Err(err) => println!("Error: {err}"),
            },
            "schedule" | "show" => match scheduler.list_sessions(&owner) {
                Ok(sessions) => println!("{}", render_sessions(&sessions)),
                Err(err) => println!("Error: {err}"),
            },
            "complete" => transition(&scheduler, &owner, parts.next(), SessionStatus::Completed),
            "skip" => transition(&scheduler, &owner, parts.next(), SessionStatus::Skipped),
            "motivation" => match scheduler.motivation(&owner) {
                Ok(record) => println!(
                    "points={} rank={} level={}",
                    record.points, record.rank, record.level
                ),
                Err(err) => println!("Error: {err}"),
            },
            "export" => {
                let (Some(fmt), Some(path)) = (parts.next(), parts.next()) else {
                    println!("Usage: export <json|csv> <path>");
                    continue;
                };
                let sessions = match scheduler.list_sessions(&owner) {
                    Ok(sessions) => sessions,
                    Err(err) => {
                        println!("Error: {err}");
                        continue;
                    }
                };
                let result = match fmt {
                    "json" => save_sessions_to_json(&owner, &sessions, path),
                    "csv" => save_sessions_to_csv(&sessions, path),
                    other => {
                        println!("Unknown export format '{other}' (use json or csv).");
                        continue;
                    }
                };
                match result {
                    Ok(()) => println!("Exported {} sessions to {path}.", sessions.len()),
                    Err(err) => println!("Error: {err}"),
                }
            }
            other => println!("Unknown command '{other}'. Type 'help'."),
        }
    }
    Ok(())
}
