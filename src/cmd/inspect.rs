use crate::reports;
use clap::Args;
use keycad::builder::BoardBuilder;
use keycad::config::BoardParams;
use keycad::error::KcResult;
use keycad::geometry::Layout;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    /// KLE JSON layout file
    pub layout: PathBuf,

    #[command(flatten)]
    pub board: BoardParams,
}

pub fn run(args: InspectArgs) -> KcResult<()> {
    println!("📂 Loading Layout: {}", args.layout.display());
    let layout = Layout::load_from_file(&args.layout)?;
    println!(
        "   {} keys in {} rows (widest row: {})",
        layout.key_count(),
        layout.row_count,
        layout.max_col_count
    );

    let board = BoardBuilder::new(args.board.to_build_options()?).build(&layout)?;

    reports::print_matrix_grid(&board);
    reports::print_pin_legend(&board);
    reports::print_bom(&board);
    Ok(())
}
