use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use mod_persistence::{ModPersistence, ModSource, PdataDb, PdataDefinitions};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "mod_persistence")]
#[command(about = "Rebuild a player's pdata for a set of active mods")]
struct Args {
    /// Path to the redb database (created if missing)
    db: PathBuf,

    /// Base schema definition (JSON)
    base_schema: PathBuf,

    /// Default pdata buffer new players start from
    default_pdata: PathBuf,

    /// Player id
    player: String,

    /// Pdiff definitions of the active mods, in load order
    pdiffs: Vec<PathBuf>,

    /// Output file (default: <player>.pdata)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

fn run(args: &Args) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let schema_text = std::fs::read_to_string(&args.base_schema)?;
    let default_baseline = std::fs::read(&args.default_pdata)?;
    let definitions = Arc::new(PdataDefinitions::load(&schema_text, default_baseline)?);

    let mods = args
        .pdiffs
        .iter()
        .map(|path| -> std::io::Result<ModSource> {
            let text = std::fs::read_to_string(path)?;
            Ok(ModSource::new(path.display().to_string(), Some(text)))
        })
        .collect::<std::io::Result<Vec<_>>>()?;

    let db = PdataDb::new(&args.db)?;
    if db.create_player(&args.player, definitions.default_baseline())? {
        info!(player = %args.player, "new player");
    }

    let persistence = ModPersistence::new(definitions, db);
    let buffer = persistence.build_for_mods(&args.player, &mods)?;

    let out = args
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{}.pdata", args.player)));
    std::fs::write(&out, &buffer)?;
    Ok(out)
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mod_persistence=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(out) => {
            info!(path = %out.display(), "wrote pdata");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "failed to build pdata");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_args_positional_and_trailing_pdiffs() {
        let args = Args::try_parse_from([
            "mod_persistence",
            "save.redb",
            "base.json",
            "default.pdata",
            "p1",
            "a.json",
            "b.json",
        ])
        .unwrap();
        assert_eq!(args.player, "p1");
        assert_eq!(args.pdiffs, vec![PathBuf::from("a.json"), PathBuf::from("b.json")]);
        assert!(args.out.is_none());
    }

    #[test]
    fn test_args_require_player() {
        assert!(Args::try_parse_from(["mod_persistence", "save.redb", "base.json"]).is_err());
    }
}
