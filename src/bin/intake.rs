//! Intake CLI - Command-line host for Vitals Intake
//!
//! Commands:
//! - upload: Ingest a batch file (health, heart-rate or emotions)
//! - emotion: Submit a single emotion record
//! - list: Page through stored samples
//! - doctor: Diagnose configuration and database health

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use vitals_intake::config::parse_offset;
use vitals_intake::error::{ConfigError, StoreError};
use vitals_intake::logging::{init_logging, LogConfig, LogLevel};
use vitals_intake::types::{Table, UserId};
use vitals_intake::{
    BatchUpload, IntakeConfig, IntakeRequest, IntakeResponse, IntakeService, ReadModel,
    SampleStore, SqliteStore, INTAKE_VERSION, PRODUCER_NAME,
};

/// Intake - Ingest and validate wearable health and emotion samples
#[derive(Parser)]
#[command(name = "intake")]
#[command(author = "Synheart AI Inc")]
#[command(version = INTAKE_VERSION)]
#[command(about = "Validate and store wearable sample uploads", long_about = None)]
struct Cli {
    /// SQLite database path (overrides INTAKE_DATABASE)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Target UTC offset for stored timestamps, e.g. "+05:30" (overrides INTAKE_TIMEZONE)
    #[arg(long, global = true)]
    timezone: Option<String>,

    /// Log debug events to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a batch file
    Upload {
        /// Batch route
        #[arg(value_enum)]
        kind: BatchRoute,

        /// Batch file path (use - for stdin)
        #[arg(short, long)]
        file: PathBuf,

        /// User id the samples belong to
        #[arg(long)]
        userid: Option<String>,
    },

    /// Submit a single emotion record
    Emotion {
        /// JSON body path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Page through stored samples
    List {
        /// Table to read
        #[arg(value_enum)]
        table: ListTable,

        /// Page number (lenient: invalid values fall back to the first or last page)
        #[arg(long)]
        page: Option<String>,

        /// Only show samples of this user
        #[arg(long)]
        user: Option<String>,
    },

    /// Diagnose configuration and database health
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BatchRoute {
    /// health_data_batch
    Health,
    /// heart_rate_batch
    HeartRate,
    /// emotion_batch
    Emotions,
}

#[derive(Clone, Copy, ValueEnum)]
enum ListTable {
    Health,
    HeartRate,
    Emotion,
}

impl From<ListTable> for Table {
    fn from(table: ListTable) -> Self {
        match table {
            ListTable::Health => Table::Health,
            ListTable::HeartRate => Table::HeartRate,
            ListTable::Emotion => Table::Emotion,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, IntakeCliError> {
    let mut log_config = LogConfig::from_env()?;
    if cli.verbose {
        log_config = log_config.with_level(LogLevel::Debug);
    }
    init_logging(&log_config)?;

    let mut config = IntakeConfig::from_env()?;
    if let Some(tz) = cli.timezone.as_deref() {
        config = config.with_target_offset(parse_offset(tz)?);
    }
    if let Some(path) = cli.database {
        config = config.with_database_path(path);
    }

    match cli.command {
        Commands::Upload { kind, file, userid } => {
            let upload = BatchUpload {
                file: Some(read_input(&file)?),
                user_id: userid,
            };
            let request = match kind {
                BatchRoute::Health => IntakeRequest::HealthBatch(upload),
                BatchRoute::HeartRate => IntakeRequest::HeartRateBatch(upload),
                BatchRoute::Emotions => IntakeRequest::EmotionBatch(upload),
            };
            cmd_submit(config, request)
        }

        Commands::Emotion { input } => {
            let body = read_input(&input)?;
            cmd_submit(config, IntakeRequest::Emotion(body))
        }

        Commands::List { table, page, user } => cmd_list(&config, table, page.as_deref(), user),

        Commands::Doctor { json } => cmd_doctor(&config, json),
    }
}

fn read_input(path: &Path) -> Result<Vec<u8>, IntakeCliError> {
    if path.to_string_lossy() == "-" {
        let mut buffer = Vec::new();
        io::stdin().read_to_end(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read(path)?)
    }
}

fn open_store(config: &IntakeConfig) -> Result<Arc<dyn SampleStore>, IntakeCliError> {
    Ok(Arc::new(SqliteStore::open(&config.database_path)?))
}

fn cmd_submit(config: IntakeConfig, request: IntakeRequest) -> Result<ExitCode, IntakeCliError> {
    let store = open_store(&config)?;
    let service = IntakeService::new(store, config);
    let response: IntakeResponse = service.handle(request);

    println!("{}", serde_json::to_string_pretty(&response)?);

    if response.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn cmd_list(
    config: &IntakeConfig,
    table: ListTable,
    page: Option<&str>,
    user: Option<String>,
) -> Result<ExitCode, IntakeCliError> {
    let model = ReadModel::new(open_store(config)?, config.page_size);
    let user = user.and_then(UserId::new);

    let output = match Table::from(table) {
        Table::Health => serde_json::to_string_pretty(&model.health_page(page, user.as_ref())?)?,
        Table::HeartRate => {
            serde_json::to_string_pretty(&model.heart_rate_page(page, user.as_ref())?)?
        }
        Table::Emotion => serde_json::to_string_pretty(&model.emotion_page(page, user.as_ref())?)?,
    };
    println!("{}", output);

    Ok(ExitCode::SUCCESS)
}

fn cmd_doctor(config: &IntakeConfig, json: bool) -> Result<ExitCode, IntakeCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "intake_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Intake version {}", INTAKE_VERSION),
    });

    checks.push(DoctorCheck {
        name: "config".to_string(),
        status: CheckStatus::Ok,
        message: format!(
            "Target zone {}, default user '{}', page size {}",
            config.target_offset, config.default_user_id, config.page_size
        ),
    });

    if !config.database_path.exists() {
        checks.push(DoctorCheck {
            name: "database".to_string(),
            status: CheckStatus::Warning,
            message: format!(
                "{} does not exist yet (created on first upload)",
                config.database_path.display()
            ),
        });
    } else {
        check_database(config, &mut checks);
    }

    // Uploads can be piped in with `--file -`
    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (ready for --file -)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: INTAKE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Intake Doctor Report");
        println!("====================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(IntakeCliError::DoctorFailed)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn check_database(config: &IntakeConfig, checks: &mut Vec<DoctorCheck>) {
    match SqliteStore::open(&config.database_path) {
        Ok(store) => {
            let counts: Result<Vec<String>, StoreError> =
                [Table::Health, Table::HeartRate, Table::Emotion]
                    .into_iter()
                    .map(|table| {
                        store
                            .count(table, None)
                            .map(|n| format!("{}={}", table.name(), n))
                    })
                    .collect();
            checks.push(match counts {
                Ok(counts) => DoctorCheck {
                    name: "database".to_string(),
                    status: CheckStatus::Ok,
                    message: format!(
                        "{} ({})",
                        config.database_path.display(),
                        counts.join(", ")
                    ),
                },
                Err(e) => DoctorCheck {
                    name: "database".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Cannot query database: {}", e),
                },
            });
        }
        Err(e) => checks.push(DoctorCheck {
            name: "database".to_string(),
            status: CheckStatus::Error,
            message: format!("Cannot open {}: {}", config.database_path.display(), e),
        }),
    }
}

// Error types

#[derive(Debug)]
enum IntakeCliError {
    Io(io::Error),
    Config(ConfigError),
    Store(StoreError),
    Json(serde_json::Error),
    DoctorFailed,
}

impl From<io::Error> for IntakeCliError {
    fn from(e: io::Error) -> Self {
        IntakeCliError::Io(e)
    }
}

impl From<ConfigError> for IntakeCliError {
    fn from(e: ConfigError) -> Self {
        IntakeCliError::Config(e)
    }
}

impl From<StoreError> for IntakeCliError {
    fn from(e: StoreError) -> Self {
        IntakeCliError::Store(e)
    }
}

impl From<serde_json::Error> for IntakeCliError {
    fn from(e: serde_json::Error) -> Self {
        IntakeCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<IntakeCliError> for CliError {
    fn from(e: IntakeCliError) -> Self {
        match e {
            IntakeCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            IntakeCliError::Config(e) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check INTAKE_* environment variables and flags".to_string()),
            },
            IntakeCliError::Store(e) => CliError {
                code: "STORE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'intake doctor' to check the database".to_string()),
            },
            IntakeCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            IntakeCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
