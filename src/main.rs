use clap::{Parser, Subcommand};
use std::process;
use tracing::{error, Level};

mod cmd;
mod reports;

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate KiCad keyboard PCBs from KLE layouts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(global = true, long, default_value_t = false)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate netlist, boards, BOM and user guide
    Build(cmd::build::BuildArgs),
    /// Print the key matrix and pin assignment without writing anything
    Inspect(cmd::inspect::InspectArgs),
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.debug { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    println!("\n🚀 KeyCad {}", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Commands::Build(args) => cmd::build::run(args),
        Commands::Inspect(args) => cmd::inspect::run(args),
    };

    if let Err(e) = result {
        error!("{}", e);
        eprintln!("\n❌ {}", e);
        process::exit(1);
    }
}
