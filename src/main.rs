use clap::{Parser as ClapParser, Subcommand};
use object_query::cli::{self, CheckOptions, CheckResult, CliError, QueryOptions};
use std::io::{self, Read};
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "objq")]
#[command(about = "objq - evaluate filter expressions and query JSON records")]
#[command(version)]
struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an expression against a JSON record
    Eval {
        /// The expression to evaluate
        expression: String,

        /// JSON input (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Only check that an expression compiles
    Check {
        /// The expression to check
        expression: String,
    },

    /// Filter, reshape, and sort a JSON record or array of records
    Query {
        /// Keep array items for which this expression holds
        #[arg(short = 'w', long = "where")]
        filter: Option<String>,

        /// Comma-separated top-level fields to keep
        #[arg(short, long)]
        select: Option<String>,

        /// Comma-separated sort keys, each optionally followed by ASC or DESC
        #[arg(short, long)]
        order_by: Option<String>,

        /// JSON input (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(&cli.log_level) {
        eprintln!("{}", e);
        std::process::exit(2);
    }

    let result = match cli.command {
        Commands::Eval {
            expression,
            input,
            pretty,
        } => run_eval(expression, input, pretty),
        Commands::Check { expression } => run_check(expression),
        Commands::Query {
            filter,
            select,
            order_by,
            input,
            pretty,
        } => run_query(
            QueryOptions {
                filter,
                select,
                order_by,
                input: None,
            },
            input,
            pretty,
        ),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

/// Uses `RUST_LOG` if set, otherwise the `--log-level` value.
fn init_tracing(log_level: &str) -> Result<(), CliError> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level).map_err(|_| CliError::LogFilter(log_level.to_string()))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    Ok(())
}

/// The `--input` value, or stdin when it is piped.
fn read_input(input: Option<String>) -> Result<Option<String>, CliError> {
    match input {
        Some(s) => Ok(Some(s)),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(Some(buffer))
        }
        None => Ok(None),
    }
}

fn run_eval(expression: String, input: Option<String>, pretty: bool) -> Result<(), CliError> {
    let options = CheckOptions {
        expression,
        input: read_input(input)?,
        syntax_only: false,
    };

    if let CheckResult::Success(value) = cli::execute_check(&options)? {
        println!("{}", cli::render(&value, pretty)?);
    }
    Ok(())
}

fn run_check(expression: String) -> Result<(), CliError> {
    let options = CheckOptions {
        expression,
        input: None,
        syntax_only: true,
    };

    cli::execute_check(&options)?;
    println!("Syntax is valid");
    Ok(())
}

fn run_query(mut options: QueryOptions, input: Option<String>, pretty: bool) -> Result<(), CliError> {
    options.input = read_input(input)?;
    let value = cli::execute_query(&options)?;
    println!("{}", cli::render(&value, pretty)?);
    Ok(())
}
