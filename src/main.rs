use clap::error::ErrorKind;
use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

mod commands;
mod error;
mod render;
mod status;
mod tokens;
mod version;
use commands::git;
use error::{PromptError, EXIT_HELP};
use version::{LOG_ENV, PROMPT_NAME, PROMPT_VERSION};

#[derive(Parser, Debug)]
#[command(name = PROMPT_NAME, version = PROMPT_VERSION)]
#[command(about = "Print a compact git status summary for shell prompts")]
#[command(after_help = "Tokens: prefix suffix separator branch nohead staged conflicts changed clean untracked ahead behind")]
struct Cli {
    /// Include submodule status (slow)
    #[arg(long)]
    submodules: bool,

    /// Print resolved tokens and debug logs before running
    #[arg(long)]
    debug: bool,

    /// Directory to inspect (defaults to current)
    #[arg(short = 'C', value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Token overrides, given as `name value` pairs
    #[arg(value_name = "OVERRIDE", trailing_var_arg = true, allow_hyphen_values = true)]
    overrides: Vec<String>,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                    EXIT_HELP
                }
                ErrorKind::DisplayVersion => 0,
                _ => PromptError::InvalidArgument(err.to_string()).exit_code(),
            };
            process::exit(code);
        }
    };

    init_logging(cli.debug);

    let config = tokens::config_path();
    match run(&cli, config.as_deref()) {
        Ok(prompt) => {
            if let Err(err) = write_prompt(&mut std::io::stdout(), &prompt) {
                log::warn!("Failed to write prompt: {}", err);
                process::exit(PromptError::EnvironmentError(err.to_string()).exit_code());
            }
        }
        Err(err) => {
            eprintln!("{}: {}", PROMPT_NAME, err);
            process::exit(err.exit_code());
        }
    }
}

fn write_prompt(out: &mut impl Write, prompt: &str) -> std::io::Result<()> {
    out.write_all(prompt.as_bytes())?;
    out.flush()
}

fn init_logging(debug: bool) {
    let env = env_logger::Env::new().filter_or(LOG_ENV, "warn");
    let mut builder = env_logger::Builder::from_env(env);
    if debug {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.format_timestamp(None).init();
}

fn run(cli: &Cli, config: Option<&Path>) -> Result<String, PromptError> {
    let tokens = tokens::load(config)
        .map_err(|err| PromptError::InvalidArgument(format!("{:#}", err)))?
        .with_args(&cli.overrides)?;

    if cli.debug {
        print!("{}", tokens.describe());
        println!("submodules: {}", cli.submodules);
    }

    let start = match &cli.dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()
            .map_err(|err| PromptError::EnvironmentError(err.to_string()))?,
    };

    let snapshot = git::snapshot(&start, cli.submodules)?;
    Ok(render::render(&snapshot.counters, &snapshot.branch, &tokens))
}
