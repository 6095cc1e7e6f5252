use crate::reports;
use clap::Args;
use keycad::builder::BoardBuilder;
use keycad::config::{BoardParams, BuildParams};
use keycad::error::KcResult;
use keycad::geometry::Layout;
use keycad::output::{self, ExportSettings};
use keycad::{pcb, tools, util};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// KLE JSON layout file
    pub layout: PathBuf,

    #[command(flatten)]
    pub board: BoardParams,

    #[command(flatten)]
    pub build: BuildParams,
}

pub fn run(args: BuildArgs) -> KcResult<()> {
    // 1. Inputs
    println!("📂 Loading Layout: {}", args.layout.display());
    let layout = Layout::load_from_file(&args.layout)?;
    let digest = util::layout_digest(&args.layout)?;
    let descriptors = args.build.load_descriptors()?;
    let overrides = match &args.build.position_json {
        Some(path) => {
            println!("📌 Loading placement overrides: {}", path.display());
            pcb::load_overrides(path)?
        }
        None => BTreeMap::new(),
    };

    // 2. Board model
    let board = BoardBuilder::new(args.board.to_build_options()?)
        .with_overrides(overrides)
        .build(&layout)?;
    reports::print_pin_legend(&board);

    // 3. Artifacts
    let source_name = args
        .layout
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "layout.json".to_string());
    let settings = ExportSettings::builder()
        .out_dir(args.build.out_dir.clone())
        .output_prefix(args.build.output_prefix.clone())
        .descriptors(descriptors)
        .run_kicad_tools(args.build.run_kicad_tools)
        .tool_timeout(args.build.tool_timeout())
        .args(format!("build {} {}", source_name, args.board.to_arg_string()).trim_end().to_string())
        .layout_digest(Some(digest))
        .source_name(source_name)
        .build();

    let report = output::export_board(&board, &settings)?;
    reports::print_written_files(&report.files);

    if args.build.open {
        tools::open_board(&report.board_path);
    }
    println!("\n✅ Done.");
    Ok(())
}
