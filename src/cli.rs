use crate::auth::credentials::DEFAULT_USERNAME;
use crate::auth::remember_me::DEFAULT_REMEMBER_ME_SECRET;
use crate::auth::AuthError;
use crate::auth::Credentials;
use crate::auth::Session;
use crate::config::Settings;
use crate::config::DEFAULT_DATA_DIR;
use crate::config::DEFAULT_UPLOADS_DIR;
use crate::rooms::Floor;
use crate::service::Service;
use anyhow::Context;
use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use clap::Subcommand;
use log::LevelFilter;
use serde::Serialize;
use std::fs;
use std::io::BufRead;
use std::io::Write;
use std::path::PathBuf;

/// Command-line arguments of the `room-plan` binary.
#[derive(Parser, Debug)]
#[command(version, about = "Extract rooms from rent report workbooks for the floor plans.")]
pub struct Args {
    /// Directory holding rooms.json.
    #[arg(long, env = "ROOM_PLAN_DATA_DIR", default_value = DEFAULT_DATA_DIR, global = true)]
    data_dir: PathBuf,

    /// Directory archiving every uploaded workbook.
    #[arg(long, env = "ROOM_PLAN_UPLOADS_DIR", default_value = DEFAULT_UPLOADS_DIR, global = true)]
    uploads_dir: PathBuf,

    /// Key signing remember-me tokens.
    #[arg(long, env = "REMEMBER_ME_SECRET", default_value = DEFAULT_REMEMBER_ME_SECRET, hide_default_value = true, hide_env_values = true, global = true)]
    secret: String,

    /// Login of the account allowed to sign in.
    #[arg(long, env = "ROOM_PLAN_USER", default_value = DEFAULT_USERNAME, global = true)]
    user: String,

    /// Password of that account. Sign-in is disabled when unset.
    #[arg(long, env = "ROOM_PLAN_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,

    /// Remember-me token returned by `login`.
    #[arg(long, env = "ROOM_PLAN_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Log level (error, warn, info, debug, trace). Overrides -v.
    #[arg(long = "log", env = "ROOM_PLAN_LOG", global = true)]
    log_level: Option<LevelFilter>,

    /// More logging (repeatable).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Exchange the account credentials for a remember-me token.
    Login {
        username: String,
        /// Read from standard input when omitted.
        #[arg(value_name = "PASSWORD")]
        attempt: Option<String>,
    },

    /// Upload a .xls/.xlsx rent report and replace the room snapshot.
    Upload { file: PathBuf },

    /// Print the rooms of the last upload as JSON.
    Rooms,

    /// Look up one room, e.g. `find 19 floor-2 12а`.
    Find {
        /// Building number, optionally prefixed with `building-`.
        building: String,
        /// Floor as `floor-N` or `N`, 0 for the basement.
        floor: Floor,
        number: String,
    },

    /// Render the last uploaded workbook as an HTML page.
    Table {
        /// Write the page here instead of standard output.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Serialize)]
#[serde(untagged)]
enum LoginResponse<'a> {
    Success { success: bool, token: &'a str },
    Failure { success: bool, message: String },
}

impl Args {
    pub fn settings(&self) -> Settings {
        Settings {
            data_dir: self.data_dir.clone(),
            uploads_dir: self.uploads_dir.clone(),
            remember_me_secret: self.secret.clone(),
            credentials: Credentials::new(self.user.clone(), self.password.clone()),
        }
    }

    /// `--log` wins, otherwise warnings plus one level per `-v`.
    pub fn log_level(&self) -> LevelFilter {
        if let Some(level) = self.log_level {
            return level;
        }
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

/// Executes one command, writing its JSON or HTML response to `out`.
pub fn run_with_args<W: Write>(args: Args, out: &mut W) -> Result<()> {
    let settings = args.settings();
    let token = args.token.as_deref();

    match args.command {
        Command::Login { username, attempt } => {
            let password = match attempt {
                Some(password) => password,
                None => read_password()?,
            };
            login(&settings, &username, &password, out)?;
        }
        Command::Upload { file } => {
            let service = open_service(&settings, token)?;
            let name = file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let bytes = fs::read(&file).with_context(|| format!("Failed to read {}", file.display()))?;
            let outcome = service.upload(&name, bytes)?;
            writeln!(out, "{}", outcome.to_json()?)?;
        }
        Command::Rooms => {
            let service = open_service(&settings, token)?;
            writeln!(out, "{}", serde_json::to_string(&service.rooms())?)?;
        }
        Command::Find { building, floor, number } => {
            let service = open_service(&settings, token)?;
            let room = service.find(&building, floor, &number);
            writeln!(out, "{}", serde_json::to_string(&room)?)?;
        }
        Command::Table { output } => {
            let service = open_service(&settings, token)?;
            let html = service.table_html()?;
            match output {
                Some(path) => fs::write(&path, html).with_context(|| format!("Failed to write {}", path.display()))?,
                None => out.write_all(html.as_bytes())?,
            }
        }
    }
    Ok(())
}

/// Service for a caller holding a valid remember-me token
fn open_service(settings: &Settings, token: Option<&str>) -> Result<Service, AuthError> {
    let mut session = Session::default();
    session.restore(&settings.remember_me(), token, Utc::now());
    session.require()?;
    Ok(Service::new(settings))
}

fn login<W: Write>(settings: &Settings, username: &str, password: &str, out: &mut W) -> Result<()> {
    let mut session = Session::default();
    let response = match session.login(&settings.credentials, username, password) {
        Ok(()) => {
            let token = settings.remember_me().issue(username, Utc::now())?;
            serde_json::to_string(&LoginResponse::Success { success: true, token: &token })?
        }
        Err(e @ AuthError::InvalidCredentials) => serde_json::to_string(&LoginResponse::Failure {
            success: false,
            message: e.to_string(),
        })?,
        Err(e) => Err(e)?,
    };
    writeln!(out, "{}", response)?;
    Ok(())
}

fn read_password() -> Result<String> {
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password from standard input")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}
