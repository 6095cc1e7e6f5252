use crate::error::{KcResult, KeyCadError};
use crate::geometry::{Bounds, Key};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use strum_macros::Display;
use tracing::{debug, info};

/// KiCad internal units per millimeter.
pub const KC_TO_MM: f64 = 1_000_000.0;

pub fn mm_to_kc(mm: f64) -> i64 {
    (mm * KC_TO_MM).round() as i64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Side {
    Top,
    Bottom,
}

/// Final footprint position in KiCad internal units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub x: i64,
    pub y: i64,
    pub angle: f64,
    pub side: Side,
}

/// Partial position from a placement file; missing fields keep the computed value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionOverride {
    pub x: Option<i64>,
    pub y: Option<i64>,
    pub angle: Option<f64>,
    pub side: Option<Side>,
}

impl PositionOverride {
    fn apply(&self, p: &mut Placement) {
        if let Some(x) = self.x {
            p.x = x;
        }
        if let Some(y) = self.y {
            p.y = y;
        }
        if let Some(angle) = self.angle {
            p.angle = angle;
        }
        if let Some(side) = self.side {
            p.side = side;
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct KinjectorModule<P> {
    position: P,
}

#[derive(Debug, Serialize, Deserialize)]
struct KinjectorBoard<P> {
    modules: BTreeMap<String, KinjectorModule<P>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct KinjectorFile<P> {
    board: KinjectorBoard<P>,
}

/// Loads per-reference overrides from a kinjector-format JSON file.
pub fn load_overrides<P: AsRef<Path>>(path: P) -> KcResult<BTreeMap<String, PositionOverride>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let file: KinjectorFile<PositionOverride> = serde_json::from_str(&content).map_err(|e| {
        KeyCadError::Config(format!("invalid placement file '{}': {}", path.display(), e))
    })?;
    Ok(file
        .board
        .modules
        .into_iter()
        .map(|(reference, module)| (reference, module.position))
        .collect())
}

/// Footprint placement on the keyboard grid.
#[derive(Debug, Clone)]
pub struct Pcb {
    key_width_mm: f64,
    key_height_mm: f64,
    placements: BTreeMap<String, Placement>,
    overrides: BTreeMap<String, PositionOverride>,
}

impl Pcb {
    pub fn new(pitch_mm: (f64, f64), overrides: BTreeMap<String, PositionOverride>) -> Self {
        Self {
            key_width_mm: pitch_mm.0,
            key_height_mm: pitch_mm.1,
            placements: BTreeMap::new(),
            overrides,
        }
    }

    pub fn pitch_mm(&self) -> (f64, f64) {
        (self.key_width_mm, self.key_height_mm)
    }

    pub fn grid_to_mm(&self, x: f64, y: f64) -> (f64, f64) {
        (x * self.key_width_mm, y * self.key_height_mm)
    }

    /// Board rectangle (x, y, width, height) in millimeters. Footprint origins
    /// sit at key centers, so the edge is half a pitch outside the first key.
    pub fn bounds_mm(&self, bounds: &Bounds) -> (f64, f64, f64, f64) {
        let (x, y) = self.grid_to_mm(bounds.left - 0.5, bounds.top - 0.5);
        (x, y, bounds.width() * self.key_width_mm, bounds.height() * self.key_height_mm)
    }

    /// Places `reference` at grid point (x, y) shifted by `offset_mm`.
    pub fn place_on_grid(
        &mut self,
        reference: &str,
        x: f64,
        y: f64,
        offset_mm: (f64, f64),
        angle: f64,
        side: Side,
    ) -> Placement {
        let (x_mm, y_mm) = self.grid_to_mm(x, y);
        self.place_mm(reference, x_mm + offset_mm.0, y_mm + offset_mm.1, angle, side)
    }

    pub fn place_mm(&mut self, reference: &str, x_mm: f64, y_mm: f64, angle: f64, side: Side) -> Placement {
        let mut placement = Placement {
            x: mm_to_kc(x_mm),
            y: mm_to_kc(y_mm),
            angle,
            side,
        };
        if let Some(o) = self.overrides.get(reference) {
            debug!("pcb: applying placement override for {}", reference);
            o.apply(&mut placement);
        }
        self.placements.insert(reference.to_string(), placement);
        placement
    }

    pub fn place_keyswitch(&mut self, reference: &str, key: &Key) -> Placement {
        let (x, y) = key.position();
        self.place_on_grid(reference, x, y, (0.0, 0.0), 180.0, Side::Top)
    }

    pub fn place_diode(&mut self, reference: &str, key: &Key) -> Placement {
        let (x, y) = key.position();
        let offset = (5.0, -self.key_height_mm / 5.0);
        self.place_on_grid(reference, x, y, offset, 90.0, Side::Bottom)
    }

    pub fn place_led(&mut self, reference: &str, key: &Key) -> Placement {
        let (x, y) = key.position();
        let offset = (0.0, -self.key_height_mm / 4.0);
        self.place_on_grid(reference, x, y, offset, 0.0, Side::Bottom)
    }

    /// Places `reference` relative to the middle of the board's top edge.
    /// Positive y offsets point into the board.
    pub fn place_top_center(&mut self, reference: &str, bounds: &Bounds, offset_mm: (f64, f64), angle: f64, side: Side) -> Placement {
        let (x, y, w, _) = self.bounds_mm(bounds);
        self.place_mm(reference, x + w / 2.0 + offset_mm.0, y + offset_mm.1, angle, side)
    }

    pub fn get_part_position(&self, reference: &str) -> Option<Placement> {
        self.placements.get(reference).copied()
    }

    pub fn placements(&self) -> &BTreeMap<String, Placement> {
        &self.placements
    }

    pub fn write_kinjector_file<P: AsRef<Path>>(&self, path: P) -> KcResult<()> {
        let file = KinjectorFile {
            board: KinjectorBoard {
                modules: self
                    .placements
                    .iter()
                    .map(|(reference, placement)| {
                        (reference.clone(), KinjectorModule { position: *placement })
                    })
                    .collect(),
            },
        };
        let json = serde_json::to_string_pretty(&file)?;
        std::fs::write(path.as_ref(), json)?;
        info!(
            "Wrote {} placements to {}",
            self.placements.len(),
            path.as_ref().display()
        );
        Ok(())
    }
}
