mod error;
mod scenario;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use host::Direction;
use policy::{DEFAULT_POLICY, DEFAULT_POLICY_FILE, Policy};

use error::{Error, Result};
use scenario::{Operation, Scenario};

#[derive(Parser)]
#[command(name = "invlocker")]
#[command(about = "Inspect and explain InvLocker inventory protections", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default flag file
    Init {
        /// Flag file to write
        #[arg(short, long, default_value = DEFAULT_POLICY_FILE)]
        config: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective policy
    Show {
        /// Flag file to read; defaults apply when it does not exist
        #[arg(short, long, default_value = DEFAULT_POLICY_FILE)]
        config: PathBuf,
        /// Print JSON instead of TOML-style lines
        #[arg(long)]
        json: bool,
    },
    /// Show what happens to an item under the policy
    Explain {
        #[arg(short, long, default_value = DEFAULT_POLICY_FILE)]
        config: PathBuf,
        /// Only transfers in this direction
        #[arg(short, long, value_enum, conflicts_with_all = ["scrap", "take_all"])]
        direction: Option<DirectionArg>,
        /// Only scrapping
        #[arg(long, conflicts_with = "take_all")]
        scrap: bool,
        /// Only "take all"
        #[arg(long)]
        take_all: bool,
        /// The item is equipped
        #[arg(long)]
        equipped: bool,
        /// The item is favorited
        #[arg(long)]
        favorite: bool,
        /// The container is a dead actor
        #[arg(long)]
        corpse: bool,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DirectionArg {
    /// Player inventory into the container
    To,
    /// Container into the player inventory
    From,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::To => Direction::ToContainer,
            DirectionArg::From => Direction::FromContainer,
        }
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init { config, force } => cmd_init(&config, force),
        Commands::Show { config, json } => cmd_show(&config, json),
        Commands::Explain {
            config,
            direction,
            scrap,
            take_all,
            equipped,
            favorite,
            corpse,
            json,
        } => {
            let scenario = Scenario {
                equipped,
                favorite,
                corpse,
            };
            let operations = if scrap {
                vec![Operation::Scrap]
            } else if take_all {
                vec![Operation::TakeAll]
            } else if let Some(direction) = direction {
                Operation::transfers(Some(direction.into()))
            } else {
                let mut all = Operation::transfers(None);
                all.extend([Operation::Scrap, Operation::TakeAll]);
                all
            };
            cmd_explain(&config, scenario, &operations, json)
        }
    }
}

fn cmd_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::ConfigExists {
            path: path.to_path_buf(),
        });
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, DEFAULT_POLICY)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn cmd_show(path: &Path, json: bool) -> Result<()> {
    let (policy, origin) = load_policy(path)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&policy)?);
    } else {
        println!("# {origin}");
        print!("{policy}");
    }
    Ok(())
}

fn cmd_explain(path: &Path, scenario: Scenario, operations: &[Operation], json: bool) -> Result<()> {
    let (policy, _) = load_policy(path)?;
    let verdicts: Vec<_> = operations
        .iter()
        .map(|op| scenario.explain(&policy, *op))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&verdicts)?);
        return Ok(());
    }
    for verdict in verdicts {
        println!("{:<40}  {}", verdict.operation, verdict.outcome);
    }
    Ok(())
}

/// The policy at `path`, or the defaults when there is no file.
fn load_policy(path: &Path) -> Result<(Policy, String)> {
    if path.exists() {
        Ok((Policy::load(path)?, path.display().to_string()))
    } else {
        Ok((Policy::default(), "defaults (no flag file)".to_string()))
    }
}
