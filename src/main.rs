use clap::{Parser as ClapParser, Subcommand, ValueEnum};
use std::io::{self, Read};
use strata::{
    FieldResolution,
    cli::{self, CliError, CompileOptions, RunOptions},
};
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "strata")]
#[command(about = "strata - compile and run SQL-like queries over JSON records")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a query and print its canonical form
    Compile {
        /// The query to compile
        query: String,

        /// Print the compiled tree instead
        #[arg(long)]
        tree: bool,
    },

    /// Run a query against JSON records
    Run {
        /// The query to run
        query: String,

        /// JSON object mapping resource names to arrays of records (reads
        /// from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// JSON array of values bound to `?` placeholders
        #[arg(long)]
        params: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// How unqualified fields resolve across joined resources
        #[arg(long, value_enum, default_value_t = Resolution::Reject)]
        resolution: Resolution,

        /// Skip records whose predicate fails to evaluate
        #[arg(long)]
        skip_errors: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Resolution {
    /// Fail when the field is present in more than one resource
    Reject,
    /// Take the first resource that has the field
    First,
}

impl From<Resolution> for FieldResolution {
    fn from(resolution: Resolution) -> Self {
        match resolution {
            Resolution::Reject => FieldResolution::Reject,
            Resolution::First => FieldResolution::FirstResource,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "strata=warn".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compile { query, tree } => {
            cli::execute_compile(&CompileOptions { query, tree }).map(|text| println!("{}", text))
        }
        Commands::Run {
            query,
            input,
            params,
            pretty,
            resolution,
            skip_errors,
        } => run(query, input, params, pretty, resolution, skip_errors),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run(
    query: String,
    input: Option<String>,
    params: Option<String>,
    pretty: bool,
    resolution: Resolution,
    skip_errors: bool,
) -> Result<(), CliError> {
    let input = match input {
        Some(s) => Some(s),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Some(buffer)
        }
        None => None,
    };

    let options = RunOptions {
        query,
        input,
        params,
        resolution: resolution.into(),
        skip_errors,
    };

    let output = cli::execute_run(&options)?;
    let json = if pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{}", json);
    Ok(())
}
