use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use paf_policy_core::{Dictionary, Policy, ValidationError, extract_defaults};
use paf_policy_loader::{LoadConfig, LoadedPolicy, PolicyLoader};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Parser)]
#[command(name = "policy-check")]
#[command(about = "Inspect and validate PAF policy files")]
struct Cli {
    /// Log parse, include and validation progress to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the names defined by a policy file with their type and value count.
    Names(NamesArgs),
    /// Validate a policy file against a dictionary.
    Validate(ValidateArgs),
    /// List the defaults a dictionary provides.
    Defaults(DefaultsArgs),
    /// Run a YAML load configuration.
    Load(LoadArgs),
}

#[derive(Debug, Args)]
struct NamesArgs {
    /// Policy file to read.
    file: PathBuf,
    /// Only list top-level names.
    #[arg(long)]
    top_level: bool,
    /// Only list unresolved file references.
    #[arg(long)]
    files: bool,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    /// Policy file to validate.
    file: PathBuf,
    /// Dictionary to merge defaults from and validate against.
    #[arg(long)]
    dictionary: PathBuf,
    /// Directory file references are resolved against.
    #[arg(long)]
    repository: Option<PathBuf>,
    /// Drop malformed values and unreadable references instead of failing.
    #[arg(long)]
    lenient: bool,
    /// Print failures as a JSON object of name to error code.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct DefaultsArgs {
    /// Dictionary file to read.
    dictionary: PathBuf,
}

#[derive(Debug, Args)]
struct LoadArgs {
    /// Path to the load configuration YAML.
    config: PathBuf,
    /// Print failures as a JSON object of name to error code.
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Names(args) => run_names(args),
        Command::Validate(args) => run_validate(args),
        Command::Defaults(args) => run_defaults(args),
        Command::Load(args) => run_load(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn run_names(args: NamesArgs) -> Result<(), String> {
    let policy = Policy::from_file(&args.file).map_err(|err| err.to_string())?;

    if args.files {
        for name in policy.file_names(args.top_level) {
            let files = policy.get_file_array(&name).map_err(|err| err.to_string())?;
            let paths: Vec<String> = files
                .iter()
                .map(|file| file.path().display().to_string())
                .collect();
            println!("{name}\t{}", paths.join(" "));
        }
        return Ok(());
    }

    print_names(&policy, &policy.names(args.top_level));
    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<(), String> {
    let mut loader = PolicyLoader::new()
        .policy(&args.file)
        .dictionary(&args.dictionary)
        .strict(!args.lenient);
    if let Some(repository) = &args.repository {
        loader = loader.repository(repository);
    }

    let loaded = loader.load().map_err(|err| err.to_string())?;
    report_validation(&args.file, &loaded, args.json)
}

fn run_defaults(args: DefaultsArgs) -> Result<(), String> {
    let mut dictionary = Dictionary::from_file(&args.dictionary).map_err(|err| err.to_string())?;
    let repository = args
        .dictionary
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let loaded = dictionary
        .load_policy_files(&repository, true)
        .map_err(|err| err.to_string())?;
    debug!(files = loaded, "Loaded dictionary references");

    let mut errs = ValidationError::new();
    let defaults = extract_defaults(&dictionary, Some(&mut errs)).map_err(|err| err.to_string())?;
    print_names(&defaults, &defaults.param_names(false));

    if !errs.is_empty() {
        eprintln!("{}", errs.describe("invalid default for "));
        return Err(format!("{} default(s) could not be extracted", errs.param_count()));
    }
    Ok(())
}

fn run_load(args: LoadArgs) -> Result<(), String> {
    let config = LoadConfig::load(&args.config).map_err(|err| err.to_string())?;
    let loaded = PolicyLoader::from_config(&config)
        .and_then(|loader| loader.load())
        .map_err(|err| err.to_string())?;

    if !args.json {
        print_names(&loaded.policy, &loaded.policy.param_names(false));
    }
    report_validation(&config.resolve(&config.policy), &loaded, args.json)
}

fn print_names(policy: &Policy, names: &[String]) {
    for name in names {
        let kind = policy
            .value_type(name)
            .map_or_else(|| "-".to_string(), |kind| kind.to_string());
        println!("{name}\t{kind}\t{}", policy.value_count(name));
    }
}

fn report_validation(file: &Path, loaded: &LoadedPolicy, json: bool) -> Result<(), String> {
    if json {
        let raw = serde_json::to_string_pretty(&loaded.validation)
            .map_err(|err| format!("Failed to serialize validation errors: {err}"))?;
        println!("{raw}");
    } else if loaded.is_valid() {
        println!(
            "{} is valid ({} file(s) included).",
            file.display(),
            loaded.files_loaded
        );
    } else {
        eprintln!("{}", loaded.validation.describe(""));
    }

    if loaded.is_valid() {
        Ok(())
    } else {
        Err(format!(
            "{} parameter(s) failed validation",
            loaded.validation.param_count()
        ))
    }
}
