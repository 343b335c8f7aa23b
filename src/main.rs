use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use log::LevelFilter;
use log::Log;
use log::Metadata;
use log::Record;
use room_plan::cli;
use room_plan::cli::Args;
use std::io::Write;
use std::process::ExitCode;

/// Writes log lines to standard error so standard output stays a clean JSON or HTML response.
struct StderrLogger {
    level: LevelFilter,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let _ = writeln!(
                std::io::stderr().lock(),
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn init_logger(level: LevelFilter) -> Result<()> {
    log::set_boxed_logger(Box::new(StderrLogger { level })).context("Failed to install logger")?;
    log::set_max_level(level);
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    let result = init_logger(args.log_level()).and_then(|_| cli::run_with_args(args, &mut std::io::stdout().lock()));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::debug!("{:?}", e);
            println!("{}", serde_json::json!({ "error": format!("{:#}", e) }));
            ExitCode::FAILURE
        }
    }
}
