use super::{Key, Layout};
use crate::error::{KcResult, KeyCadError};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Every KLE row advances the cursor by one unit; row heights never vary.
const ROW_HEIGHT: f64 = 1.0;

/// Per-key modifiers carried by a KLE metadata object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyModifiers {
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub x_padding: Option<f64>,
    pub y_padding: Option<f64>,
    pub homing: bool,
}

/// A single element of a KLE row, classified once at parse time.
#[derive(Debug, Clone, PartialEq)]
pub enum RowToken {
    Metadata(KeyModifiers),
    KeyLabel(String),
}

impl RowToken {
    pub fn from_value(value: &Value, row: usize, token: usize) -> KcResult<Self> {
        match value {
            Value::String(label) => Ok(RowToken::KeyLabel(label.clone())),
            Value::Object(obj) => Ok(RowToken::Metadata(parse_modifiers(obj, row, token)?)),
            other => Err(KeyCadError::parse(
                row,
                token,
                format!("expected a key label or metadata object, found {}", other),
            )),
        }
    }
}

fn parse_modifiers(obj: &Map<String, Value>, row: usize, token: usize) -> KcResult<KeyModifiers> {
    let mut mods = KeyModifiers::default();

    for (field, value) in obj {
        match field.as_str() {
            "w" => mods.width = Some(positive(field, value, row, token)?),
            "h" => mods.height = Some(positive(field, value, row, token)?),
            "x" => mods.x_padding = Some(numeric(field, value, row, token)?),
            "y" => mods.y_padding = Some(numeric(field, value, row, token)?),
            "n" => mods.homing = true,
            // Legend alignment only matters to the KLE renderer.
            "a" => {}
            _ => debug!("ignoring KLE metadata field '{}'", field),
        }
    }

    Ok(mods)
}

fn numeric(field: &str, value: &Value, row: usize, token: usize) -> KcResult<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(KeyCadError::parse(
            row,
            token,
            format!("metadata '{}' must be numeric, got {}", field, value),
        )),
    }
}

fn positive(field: &str, value: &Value, row: usize, token: usize) -> KcResult<f64> {
    let v = numeric(field, value, row, token)?;
    if v <= 0.0 {
        return Err(KeyCadError::parse(
            row,
            token,
            format!("metadata '{}' must be greater than zero, got {}", field, v),
        ));
    }
    Ok(v)
}

/// Modifiers waiting for the next key token. They survive a row boundary.
#[derive(Debug, Clone)]
struct PendingKey {
    width: f64,
    height: f64,
    x_padding: f64,
    y_padding: f64,
    is_homing: bool,
}

impl Default for PendingKey {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 1.0,
            x_padding: 0.0,
            y_padding: 0.0,
            is_homing: false,
        }
    }
}

impl PendingKey {
    fn apply(&mut self, mods: &KeyModifiers) {
        if let Some(w) = mods.width {
            self.width = w;
        }
        if let Some(h) = mods.height {
            self.height = h;
        }
        if let Some(x) = mods.x_padding {
            self.x_padding = x;
        }
        if let Some(y) = mods.y_padding {
            self.y_padding = y;
        }
        if mods.homing {
            self.is_homing = true;
        }
    }
}

/// Cursor state for one parse. Created per call so nothing leaks between layouts.
struct KleParser {
    layout: Layout,
    cursor_x: f64,
    cursor_y: f64,
    pending: PendingKey,
}

impl KleParser {
    fn new() -> Self {
        Self {
            layout: Layout::default(),
            cursor_x: 0.0,
            cursor_y: 0.0,
            pending: PendingKey::default(),
        }
    }

    fn process_keyboard_metadata(&mut self, metadata: &Map<String, Value>) {
        if let Some(Value::String(name)) = metadata.get("name") {
            self.layout.name = Some(name.clone());
        }
    }

    fn process_row(&mut self, row_index: usize, row: &[Value]) -> KcResult<()> {
        self.cursor_x = 0.0;
        let mut keys_in_row = 0;

        for (token_index, value) in row.iter().enumerate() {
            match RowToken::from_value(value, row_index, token_index)? {
                RowToken::Metadata(mods) => self.pending.apply(&mods),
                RowToken::KeyLabel(label) => {
                    if keys_in_row == 0 {
                        self.cursor_y += self.pending.y_padding;
                    }
                    self.process_key(&label);
                    keys_in_row += 1;
                }
            }
        }

        if keys_in_row > 0 {
            self.layout.row_count += 1;
            self.layout.max_col_count = self.layout.max_col_count.max(keys_in_row);
        }
        self.cursor_y += ROW_HEIGHT;
        Ok(())
    }

    fn process_key(&mut self, label: &str) {
        let pending = std::mem::take(&mut self.pending);

        let mut key = Key::new(self.cursor_x + pending.x_padding, self.cursor_y, label);
        key.width = pending.width;
        key.height = pending.height;
        key.is_homing = pending.is_homing;

        debug!("processing key {}", key);
        self.layout.push_key(key);

        self.cursor_x += pending.width + pending.x_padding;
    }
}

/// Parses raw KLE JSON content into a [`Layout`].
pub fn parse_kle_json(content: &str) -> KcResult<Layout> {
    let json: Value = serde_json::from_str(content)?;
    parse_kle_value(&json)
}

pub fn parse_kle_value(json: &Value) -> KcResult<Layout> {
    let mut parser = KleParser::new();

    let rows = match json {
        Value::Array(rows) => rows,
        Value::Object(metadata) => {
            warn!("KLE document is a bare metadata object; layout has no keys");
            parser.process_keyboard_metadata(metadata);
            return Ok(parser.layout);
        }
        other => {
            return Err(KeyCadError::parse(
                0,
                0,
                format!("KLE JSON must be an array of rows, found {}", other),
            ))
        }
    };

    for (row_index, row_val) in rows.iter().enumerate() {
        match row_val {
            Value::Array(row) => parser.process_row(row_index, row)?,
            Value::Object(metadata) => parser.process_keyboard_metadata(metadata),
            other => {
                return Err(KeyCadError::parse(
                    row_index,
                    0,
                    format!("row must be an array, found {}", other),
                ))
            }
        }
    }

    Ok(parser.layout)
}
