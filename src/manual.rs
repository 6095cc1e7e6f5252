use crate::builder::{Board, PinAssignment};
use crate::config::Descriptors;
use crate::error::KcResult;
use crate::partstore::{BomEntry, SwitchType};
use minijinja::Environment;
use serde::Serialize;
use std::path::Path;
use tracing::info;

const MANUAL_TEMPLATE: &str = include_str!("templates/manual.md.j2");

#[derive(Debug, Serialize)]
struct KeyRow {
    label: String,
    identifier: String,
    keycode: String,
}

#[derive(Debug, Serialize)]
struct ManualContext<'a> {
    descriptors: &'a Descriptors,
    usb_vid: String,
    usb_pid: String,
    args: &'a str,
    key_count: usize,
    switch_name: &'static str,
    key_width_mm: String,
    key_height_mm: String,
    pcb_width_mm: String,
    pcb_height_mm: String,
    mcu_name: Option<&'static str>,
    matrix_mode: String,
    matrix_rows: usize,
    matrix_cols: usize,
    matrix_pins: &'a [PinAssignment],
    keys: Vec<KeyRow>,
    has_per_key_led: bool,
    led_count: usize,
    led_data_pin: Option<&'static str>,
    bom: Vec<BomEntry>,
    layout_digest: Option<&'a str>,
}

fn mm(v: f64) -> String {
    format!("{:.2}", v)
}

pub fn render_manual(
    board: &Board,
    descriptors: &Descriptors,
    args: &str,
    layout_digest: Option<&str>,
) -> KcResult<String> {
    let mut env = Environment::new();
    env.add_template("manual", MANUAL_TEMPLATE)?;

    let (key_w, key_h) = board.pcb.pitch_mm();
    let (_, _, pcb_w, pcb_h) = board.outline_mm();
    let keys = board
        .key_parts
        .iter()
        .map(|kp| {
            let key = &board.layout.keys[kp.key_index];
            KeyRow {
                label: key.printable_label(),
                identifier: kp.position.identifier(),
                keycode: key.qmk_keycode(),
            }
        })
        .collect();

    let ctx = ManualContext {
        descriptors,
        usb_vid: format!("0x{:04X}", descriptors.usb_vid),
        usb_pid: format!("0x{:04X}", descriptors.usb_pid),
        args,
        key_count: board.layout.key_count(),
        switch_name: match board.options.switch_type {
            SwitchType::Mx => "Cherry MX",
            SwitchType::Pg1350 => "Kailh Choc PG1350",
        },
        key_width_mm: mm(key_w),
        key_height_mm: mm(key_h),
        pcb_width_mm: mm(pcb_w),
        pcb_height_mm: mm(pcb_h),
        mcu_name: board.mcu.as_ref().map(|m| m.profile().value),
        matrix_mode: board.matrix.mode().to_string(),
        matrix_rows: board.matrix.row_count(),
        matrix_cols: board.matrix.col_count(),
        matrix_pins: &board.pin_legend,
        keys,
        has_per_key_led: board.options.per_key_rgb,
        led_count: board.chain.led_count(),
        led_data_pin: board.led_data_pin.map(|p| p.name),
        bom: board.partstore.bom(),
        layout_digest,
    };

    let rendered = env.get_template("manual")?.render(ctx)?;
    Ok(rendered)
}

pub fn write_manual<P: AsRef<Path>>(
    board: &Board,
    descriptors: &Descriptors,
    args: &str,
    layout_digest: Option<&str>,
    path: P,
) -> KcResult<()> {
    let text = render_manual(board, descriptors, args, layout_digest)?;
    std::fs::write(path.as_ref(), text)?;
    info!("Wrote user guide {}", path.as_ref().display());
    Ok(())
}
