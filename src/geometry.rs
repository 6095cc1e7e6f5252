pub mod kle;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::KcResult;

/// Legends that break KiCad (raw quote) or freerouting (raw backtick), or that
/// are too long for a part value, mapped to short alphanumeric names.
const SYMBOL_TO_ALNUM: &[(&str, &str)] = &[
    ("'", "QUOT"),
    ("`", "GRV"),
    ("↑", "UP"),
    ("↓", "DOWN"),
    ("←", "LEFT"),
    ("→", "RGHT"),
    ("", "SPC"),
    ("|", "BAR"),
    ("!", "EXCL"),
    ("@", "AT"),
    ("#", "HASH"),
    ("$", "DLR"),
    ("%", "PCT"),
    ("^", "CRT"),
    ("&", "AMP"),
    ("*", "AST"),
    ("(", "LPRN"),
    (")", "RPRN"),
    ("-", "MINS"),
    ("=", "EQL"),
    ("Caps Lock", "CAPS"),
    ("Shift", "SHFT"),
    ("Backspace", "BSPC"),
    ("Enter", "ENT"),
    ("[", "LBRC"),
    ("]", "RBRC"),
    ("Esc", "ESC"),
    ("\\", "BSLS"),
    (";", "SCLN"),
    (",", "COMM"),
    (".", "DOT"),
    ("/", "SLSH"),
    ("CTRL", "LCTRL"),
    ("WIN", "LGUI"),
];

/// One physical key, in keyboard grid units (1u = one standard key pitch).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Key {
    pub x: f64,
    pub y: f64,
    #[serde(default = "default_size")]
    pub width: f64,
    #[serde(default = "default_size")]
    pub height: f64,
    pub labels: Vec<String>,
    #[serde(default)]
    pub is_homing: bool,
}

fn default_size() -> f64 {
    1.0
}

impl Key {
    pub fn new(x: f64, y: f64, text: &str) -> Self {
        Self {
            x,
            y,
            width: 1.0,
            height: 1.0,
            labels: text.split('\n').map(str::to_string).collect(),
            is_homing: false,
        }
    }

    /// Geometric center of the key on the grid.
    pub fn position(&self) -> (f64, f64) {
        (
            self.x + (self.width - 1.0) / 2.0,
            self.y + (self.height - 1.0) / 2.0,
        )
    }

    pub fn primary_label(&self) -> &str {
        self.labels.first().map(String::as_str).unwrap_or("")
    }

    /// The legend used for part values and keycodes. KLE puts the shifted
    /// legend first, so a second legend wins when present.
    pub fn printable_label(&self) -> String {
        let label = match self.labels.get(1) {
            Some(second) => second.as_str(),
            None => self.primary_label(),
        };
        SYMBOL_TO_ALNUM
            .iter()
            .find(|(symbol, _)| *symbol == label)
            .map(|(_, alnum)| alnum.to_string())
            .unwrap_or_else(|| label.to_string())
    }

    pub fn qmk_keycode(&self) -> String {
        format!("KC_{}", self.printable_label().to_uppercase())
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{:.2} {:.2}]", self.primary_label(), self.x, self.y)
    }
}

/// Axis-aligned bounding box in grid units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Bounds {
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn center_x(&self) -> f64 {
        (self.left + self.right) / 2.0
    }

    fn include(&mut self, key: &Key) {
        self.left = self.left.min(key.x);
        self.top = self.top.min(key.y);
        self.right = self.right.max(key.x + key.width);
        self.bottom = self.bottom.max(key.y + key.height);
    }
}

/// Parsed keyboard: keys in source traversal order plus aggregate extents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Layout {
    #[serde(default)]
    pub name: Option<String>,
    pub keys: Vec<Key>,
    pub bounds: Bounds,
    pub row_count: usize,
    pub max_col_count: usize,
}

impl Layout {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> KcResult<Self> {
        let content = std::fs::read_to_string(path)?;
        kle::parse_kle_json(&content)
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub(crate) fn push_key(&mut self, key: Key) {
        if self.keys.is_empty() {
            self.bounds = Bounds {
                left: key.x,
                top: key.y,
                right: key.x + key.width,
                bottom: key.y + key.height,
            };
        } else {
            self.bounds.include(&key);
        }
        self.keys.push(key);
    }
}
