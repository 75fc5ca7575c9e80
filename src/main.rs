use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use reservation_tools::check;
use reservation_tools::config::CheckConfig;
use reservation_tools::detect::SharingPolicy;
use reservation_tools::io::{self, StoreFormat};
use reservation_tools::{Result, logging};

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(error) = logging::init(cli.verbose) {
        eprintln!("error: {error}");
        return ExitCode::FAILURE;
    }
    match run(cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Command::Check(args) => execute_check(args),
    }
}

fn execute_check(args: CheckArgs) -> Result<ExitCode> {
    let config = args.resolve_config()?;
    let store = io::open_store(
        &args.input,
        args.store.map(StoreFormat::from),
        &config.fields,
    )?;

    let report = check::run_check(store.as_ref(), &config)?;
    print!("{}", report.render_text());

    if let Some(path) = &args.json {
        check::export_json(&report, path)?;
    }
    if let Some(path) = &args.xlsx {
        check::export_workbook(&report, path)?;
    }

    if args.fail_on_conflict && report.has_conflicts() {
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Find reservations that double-book the same asset."
)]
struct Cli {
    /// Increase log output (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Report reservations that overlap on a shared resource.
    Check(CheckArgs),
}

#[derive(clap::Args)]
struct CheckArgs {
    /// Table store to read: an .xlsx workbook or a JSON record export.
    #[arg(long)]
    input: PathBuf,

    /// Store format, inferred from the file extension when omitted.
    #[arg(long, value_enum)]
    store: Option<StoreKind>,

    /// JSON configuration file with view, field names and policy.
    #[arg(long)]
    config: Option<PathBuf>,

    /// View (worksheet) holding the reservations.
    #[arg(long)]
    view: Option<String>,

    /// Field holding record ids.
    #[arg(long)]
    id_field: Option<String>,

    /// Link field naming the booked resources.
    #[arg(long)]
    resource_field: Option<String>,

    #[arg(long)]
    start_field: Option<String>,

    #[arg(long)]
    end_field: Option<String>,

    /// Field naming the member who made the reservation.
    #[arg(long)]
    person_field: Option<String>,

    /// How many resources two reservations must share to conflict.
    #[arg(long, value_enum)]
    sharing: Option<SharingKind>,

    /// strftime format for start and end columns.
    #[arg(long)]
    date_format: Option<String>,

    /// Also write the report as JSON to this path.
    #[arg(long)]
    json: Option<PathBuf>,

    /// Also write the report as an Excel workbook to this path.
    #[arg(long)]
    xlsx: Option<PathBuf>,

    /// Exit with status 2 when conflicts are found.
    #[arg(long)]
    fail_on_conflict: bool,
}

impl CheckArgs {
    /// Starts from the config file (or defaults) and applies flag overrides.
    fn resolve_config(&self) -> Result<CheckConfig> {
        let mut config = match &self.config {
            Some(path) => CheckConfig::load(path)?,
            None => CheckConfig::default(),
        };

        let overrides = [
            (&self.view, &mut config.view),
            (&self.id_field, &mut config.fields.id),
            (&self.resource_field, &mut config.fields.resources),
            (&self.start_field, &mut config.fields.start),
            (&self.end_field, &mut config.fields.end),
            (&self.person_field, &mut config.fields.person),
            (&self.date_format, &mut config.date_format),
        ];
        for (flag, target) in overrides {
            if let Some(value) = flag {
                *target = value.clone();
            }
        }
        if let Some(sharing) = self.sharing {
            config.sharing = sharing.into();
        }

        config.validate()?;
        Ok(config)
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum StoreKind {
    Xlsx,
    Json,
}

impl From<StoreKind> for StoreFormat {
    fn from(kind: StoreKind) -> Self {
        match kind {
            StoreKind::Xlsx => StoreFormat::Workbook,
            StoreKind::Json => StoreFormat::Json,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum SharingKind {
    AtLeastOne,
    ExactlyOne,
}

impl From<SharingKind> for SharingPolicy {
    fn from(kind: SharingKind) -> Self {
        match kind {
            SharingKind::AtLeastOne => SharingPolicy::AtLeastOne,
            SharingKind::ExactlyOne => SharingPolicy::ExactlyOne,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use reservation_tools::ToolError;
    use tempfile::tempdir;

    use super::*;

    fn check_args<const N: usize>(flags: [&str; N]) -> CheckArgs {
        let argv = ["reservation-tools", "check"].into_iter().chain(flags);
        match Cli::try_parse_from(argv).expect("arguments parsed").command {
            Command::Check(args) => args,
        }
    }

    #[test]
    fn flags_override_defaults() {
        let args = check_args([
            "--input",
            "bookings.xlsx",
            "--view",
            "All",
            "--start-field",
            "From",
            "--sharing",
            "exactly-one",
            "--date-format",
            "%H:%M",
        ]);
        let config = args.resolve_config().expect("config resolved");

        assert_eq!(config.view, "All");
        assert_eq!(config.fields.start, "From");
        assert_eq!(config.fields.end, "End Date/Time");
        assert_eq!(config.sharing, SharingPolicy::ExactlyOne);
        assert_eq!(config.date_format, "%H:%M");
    }

    #[test]
    fn flags_override_config_file() {
        let temp_dir = tempdir().expect("temporary directory");
        let config_path = temp_dir.path().join("config.json");
        fs::write(
            &config_path,
            r#"{"view": "Upcoming", "fields": {"resources": "Assets", "person": "Who"}, "sharing": "exactly-one"}"#,
        )
        .expect("config written");
        let config_arg = config_path.to_str().expect("utf-8 path");

        let args = check_args([
            "--input",
            "bookings.json",
            "--config",
            config_arg,
            "--person-field",
            "Owner",
            "--sharing",
            "at-least-one",
        ]);
        let config = args.resolve_config().expect("config resolved");

        assert_eq!(config.view, "Upcoming");
        assert_eq!(config.fields.resources, "Assets");
        assert_eq!(config.fields.person, "Owner");
        assert_eq!(config.sharing, SharingPolicy::AtLeastOne);
    }

    #[test]
    fn overrides_are_validated() {
        let args = check_args(["--input", "bookings.xlsx", "--end-field", "Start Date/Time"]);
        assert!(matches!(
            args.resolve_config(),
            Err(ToolError::InvalidConfig(_))
        ));
    }

    #[test]
    fn store_flag_maps_to_format() {
        let args = check_args(["--input", "bookings.dat", "--store", "json"]);
        assert_eq!(args.store.map(StoreFormat::from), Some(StoreFormat::Json));
    }
}
