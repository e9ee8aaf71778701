mod plot;
mod scores;
mod utils;

use clap::{Parser, Subcommand};
use plot::PlotArgs;
use scores::ScoresArgs;
use utils::UtilsArgs;
use wild::ArgsOs;

#[derive(Parser, Debug)]
#[command(
    author = env!("CARGO_PKG_AUTHORS"),
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
    long_about = None,)]
struct Cli {
    #[command(subcommand)]
    command: MainMenu,
}

#[derive(Subcommand, Debug)]
enum MainMenu {
    /// Ensemble fold score tables and filter significant variants.
    Scores {
        #[clap(flatten)]
        utils: UtilsArgs,
        #[clap(flatten)]
        args:  ScoresArgs,
    },

    /// Average fold tensors and draw one figure per variant.
    Plot {
        #[clap(flatten)]
        utils: UtilsArgs,
        #[clap(flatten)]
        args:  PlotArgs,
    },
}

fn main() -> anyhow::Result<()> {
    let args: ArgsOs = wild::args_os();
    let cli = Cli::parse_from(args);

    match cli.command {
        MainMenu::Scores { utils, args } => {
            utils.setup()?;
            args.run(&utils)?;
        },
        MainMenu::Plot { utils, args } => {
            utils.setup()?;
            args.run(&utils)?;
        },
    }
    Ok(())
}
