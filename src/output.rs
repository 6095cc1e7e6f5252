use crate::board::{self, Outline, UsbCutout};
use crate::builder::Board;
use crate::config::Descriptors;
use crate::error::KcResult;
use crate::manual;
use crate::netlist;
use crate::tools::ToolRunner;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;

pub const KINJECTOR_JSON_FILENAME: &str = "keycad-kinjector.json";

/// Files are written into a hidden directory inside `out_dir` and only moved
/// next to it by [`StagedOutput::commit`]. Dropping without committing
/// removes everything.
#[derive(Debug)]
pub struct StagedOutput {
    out_dir: PathBuf,
    staging: TempDir,
    files: Vec<String>,
    primary: Option<String>,
}

impl StagedOutput {
    pub fn new<P: AsRef<Path>>(out_dir: P) -> KcResult<Self> {
        let out_dir = out_dir.as_ref().to_path_buf();
        fs::create_dir_all(&out_dir)?;
        let staging = tempfile::Builder::new()
            .prefix(".keycad-staging-")
            .tempdir_in(&out_dir)?;
        debug!("staging artifacts in {}", staging.path().display());
        Ok(Self {
            out_dir,
            staging,
            files: Vec::new(),
            primary: None,
        })
    }

    pub fn staging_dir(&self) -> &Path {
        self.staging.path()
    }

    /// Path inside the staging dir for `name`; the file is committed later.
    pub fn file(&mut self, name: &str) -> PathBuf {
        if !self.files.iter().any(|f| f == name) {
            self.files.push(name.to_string());
        }
        self.staging.path().join(name)
    }

    /// Removes a scratch file so it is not committed.
    pub fn discard(&mut self, name: &str) -> KcResult<()> {
        self.files.retain(|f| f != name);
        let path = self.staging.path().join(name);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Registers `name` like [`StagedOutput::file`] and moves it last on commit.
    pub fn primary_file(&mut self, name: &str) -> PathBuf {
        self.primary = Some(name.to_string());
        self.file(name)
    }

    /// Moves every registered file into `out_dir`, the primary file last. If a
    /// move fails, files already moved go back to staging and are dropped with it.
    pub fn commit(self) -> KcResult<Vec<PathBuf>> {
        let primary = self.primary.as_deref();
        let order = self
            .files
            .iter()
            .filter(|name| Some(name.as_str()) != primary)
            .chain(self.files.iter().filter(|name| Some(name.as_str()) == primary));

        let mut moved: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(self.files.len());
        for name in order {
            let from = self.staging.path().join(name);
            let to = self.out_dir.join(name);
            if let Err(e) = fs::rename(&from, &to) {
                warn!("Could not move {} into place: {}; rolling back", name, e);
                for (from, to) in moved.iter().rev() {
                    if fs::rename(to, from).is_err() {
                        let _ = fs::remove_file(to);
                    }
                }
                return Err(e.into());
            }
            moved.push((from, to));
        }

        let committed: Vec<PathBuf> = moved.into_iter().map(|(_, to)| to).collect();
        info!("Committed {} files to {}", committed.len(), self.out_dir.display());
        Ok(committed)
    }
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct ExportSettings {
    pub out_dir: PathBuf,
    #[builder(default = "my-keyboard".to_string())]
    pub output_prefix: String,
    #[builder(default)]
    pub descriptors: Descriptors,
    #[builder(default = false)]
    pub run_kicad_tools: bool,
    #[builder(default = Duration::from_secs(120))]
    pub tool_timeout: Duration,
    /// Command line echoed into the user guide.
    #[builder(default)]
    pub args: String,
    #[builder(default)]
    pub layout_digest: Option<String>,
    #[builder(default = "layout.json".to_string())]
    pub source_name: String,
}

impl ExportSettings {
    pub fn pcb_filename(&self) -> String {
        format!("{}.kicad_pcb", self.output_prefix)
    }

    pub fn bottom_plate_filename(&self) -> String {
        format!("{}-bottom.kicad_pcb", self.output_prefix)
    }

    pub fn top_plate_filename(&self) -> String {
        format!("{}-top.kicad_pcb", self.output_prefix)
    }

    pub fn netlist_filename(&self) -> String {
        format!("{}.net", self.output_prefix)
    }

    pub fn user_guide_filename(&self) -> String {
        format!("{}-user-guide.md", self.output_prefix)
    }

    pub fn bom_filename(&self) -> String {
        format!("{}-bom.csv", self.output_prefix)
    }
}

#[derive(Debug, Clone)]
pub struct ExportReport {
    pub board_path: PathBuf,
    pub files: Vec<PathBuf>,
}

fn main_board_items(board: &Board, gnd_net_code: u32) -> Vec<String> {
    let (x, y, w, h) = board.outline_mm();
    let mut outline = Outline::new(x, y, w, h);
    let cutout_x = board.usb_cutout_x_mm();
    if let Some(center_x_mm) = cutout_x {
        outline = outline.with_usb_cutout(UsbCutout {
            center_x_mm,
            width_mm: board::USB_CUTOUT_WIDTH_MM,
            depth_mm: board::USB_CUTOUT_DEPTH_MM,
        });
    }

    let mut items = outline.to_sexprs();
    if let Some(cx) = cutout_x {
        items.extend(board::keepout_zones(
            cx - board::USB_CUTOUT_WIDTH_MM / 2.0,
            y,
            board::USB_CUTOUT_WIDTH_MM,
            board::USB_KEEPOUT_DEPTH_MM,
        ));
    }
    if board.schematic.find_net(crate::builder::GND_NET).is_some() {
        for layer in ["F.Cu", "B.Cu"] {
            items.push(board::ground_zone(gnd_net_code, layer, x, y, w, h));
        }
    }
    items.extend(board.labels().iter().map(|l| l.to_sexpr()));
    items
}

fn plate_items(board: &Board) -> Vec<String> {
    let (x, y, w, h) = board.outline_mm();
    Outline::new(x, y, w, h)
        .with_rounded_margin(board::PLATE_MARGIN_MM, board::PLATE_CORNER_RADIUS_MM)
        .to_sexprs()
}

/// Writes every artifact for `board`. Either all files land in `out_dir` or none do.
pub fn export_board(board: &Board, settings: &ExportSettings) -> KcResult<ExportReport> {
    let mut staged = StagedOutput::new(&settings.out_dir)?;

    // 1. Netlist + placements
    let netlist_name = settings.netlist_filename();
    let netlist_path = staged.file(&netlist_name);
    netlist::write_netlist(&board.schematic, &settings.source_name, &netlist_path)?;

    let kinjector_path = staged.file(KINJECTOR_JSON_FILENAME);
    board.pcb.write_kinjector_file(&kinjector_path)?;

    // 2. Main board
    let pcb_name = settings.pcb_filename();
    let pcb_path = staged.primary_file(&pcb_name);
    if settings.run_kicad_tools {
        let runner = ToolRunner::new(settings.tool_timeout);
        runner.generate_kicad_pcb(
            staged.staging_dir(),
            &netlist_name,
            KINJECTOR_JSON_FILENAME,
            &pcb_name,
        )?;
        board::append_to_board(&pcb_path, &main_board_items(board, 0))?;
        staged.discard(KINJECTOR_JSON_FILENAME)?;
    } else {
        board::write_standalone_board(&pcb_path, &main_board_items(board, 1))?;
    }

    // 3. Sandwich plates
    let plate = plate_items(board);
    board::write_standalone_board(staged.file(&settings.bottom_plate_filename()), &plate)?;
    board::write_standalone_board(staged.file(&settings.top_plate_filename()), &plate)?;

    // 4. BOM + user guide
    board.partstore.write_bom_csv(staged.file(&settings.bom_filename()))?;
    manual::write_manual(
        board,
        &settings.descriptors,
        &settings.args,
        settings.layout_digest.as_deref(),
        staged.file(&settings.user_guide_filename()),
    )?;

    let files = staged.commit()?;
    Ok(ExportReport {
        board_path: settings.out_dir.join(pcb_name),
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropped_stage_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut staged = StagedOutput::new(dir.path()).unwrap();
            fs::write(staged.file("a.txt"), "x").unwrap();
        }
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn commit_moves_registered_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut staged = StagedOutput::new(dir.path()).unwrap();
        fs::write(staged.file("keep.txt"), "x").unwrap();
        fs::write(staged.file("scratch.json"), "{}").unwrap();
        staged.discard("scratch.json").unwrap();

        let files = staged.commit().unwrap();
        assert_eq!(files, vec![dir.path().join("keep.txt")]);
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("keep.txt")]);
    }

    #[test]
    fn primary_file_is_committed_last() {
        let dir = tempfile::tempdir().unwrap();
        let mut staged = StagedOutput::new(dir.path()).unwrap();
        fs::write(staged.primary_file("board.kicad_pcb"), "(kicad_pcb)").unwrap();
        fs::write(staged.file("board.net"), "(export)").unwrap();

        let files = staged.commit().unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("board.net"), dir.path().join("board.kicad_pcb")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn failed_move_rolls_back_earlier_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut staged = StagedOutput::new(dir.path()).unwrap();
        fs::write(staged.file("board.net"), "(export)").unwrap();
        fs::write(staged.primary_file("board.kicad_pcb"), "(kicad_pcb)").unwrap();

        // A non-empty directory in the way makes the board rename fail.
        let blocker = dir.path().join("board.kicad_pcb");
        fs::create_dir(&blocker).unwrap();
        fs::write(blocker.join("keep"), "").unwrap();

        assert!(staged.commit().is_err());
        assert!(!dir.path().join("board.net").exists());
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("board.kicad_pcb")]);
    }
}
