//! Headless shell for `taskmate_core`.
//!
//! # Responsibility
//! - Verify core crate wiring without a desktop UI.
//! - Run the overdue monitor against a database from `TASKMATE_*` settings.
//!
//! Usage: `taskmate_cli [sweep|watch]` (default `sweep`).
//!
//! `watch` keeps the monitor running until a line or EOF arrives on stdin,
//! then stops it and closes the database.

use std::error::Error;
use std::io::BufRead;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use taskmate_core::{
    core_version, init_logging, ping, ChannelSink, Clock, CoreConfig, Database, OverdueMonitor,
    SystemClock,
};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("taskmate: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let config = CoreConfig::from_env()?;
    if let Some(log_dir) = &config.log_dir {
        init_logging(config.log_level()?, log_dir)?;
    }

    println!("taskmate_core ping={} version={}", ping(), core_version());

    let mode = std::env::args().nth(1).unwrap_or_else(|| "sweep".to_string());
    let db = Database::open(&config.db_path)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let (sink, notices) = ChannelSink::new();
    let monitor = OverdueMonitor::new(db.clone(), clock, Arc::new(sink))
        .with_interval(config.overdue_interval());

    match mode.as_str() {
        "sweep" => {
            let report = monitor.sweep()?;
            drop(monitor);
            for notice in notices.try_iter() {
                println!("overdue task={} {}", notice.task_id, notice.description);
            }
            println!(
                "scanned={} overdue={} parse_errors={} row_errors={}",
                report.scanned,
                report.overdue.len(),
                report.parse_errors.len(),
                report.row_errors.len()
            );
        }
        "watch" => {
            let handle = monitor.spawn()?;
            // Ends once the monitor thread drops the sink.
            let printer = thread::spawn(move || {
                for notice in notices {
                    println!("overdue task={} {}", notice.task_id, notice.description);
                }
            });

            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            handle.stop();
            if printer.join().is_err() {
                return Err("notice printer thread panicked".into());
            }
        }
        other => return Err(format!("unknown mode `{other}`; expected sweep|watch").into()),
    }

    db.close()?;
    Ok(())
}
