use crate::board::Label;
use crate::chain::{self, ChainWiring, LedChain};
use crate::error::{KcResult, KeyCadError};
use crate::geometry::{Key, Layout};
use crate::matrix::{Matrix, MatrixAllocator, MatrixPosition};
use crate::mcu::{Mcu, McuModel, Pin};
use crate::partstore::{PartStore, SwitchType};
use crate::pcb::{Pcb, PositionOverride, Side, KC_TO_MM};
use crate::schematic::Schematic;
use itertools::Itertools;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};
use typed_builder::TypedBuilder;

pub const GND_NET: &str = "GND";
pub const VCC_NET: &str = "VCC";
pub const LED_DATA_NET: &str = "LED_DATA";
pub const RESET_NET: &str = "RST";

const SWITCH_COL_PIN: u32 = 1;
const SWITCH_DIODE_PIN: u32 = 2;
const DIODE_CATHODE_PIN: u32 = 1;
const DIODE_ANODE_PIN: u32 = 2;

const USB_GND_PINS: [&str; 4] = ["A1", "A12", "B1", "B12"];
const USB_VCC_PINS: [&str; 4] = ["A4", "A9", "B4", "B9"];
const USB_DP_PINS: [&str; 2] = ["A6", "B6"];
const USB_DM_PINS: [&str; 2] = ["A7", "B7"];

#[derive(Debug, Clone, PartialEq, TypedBuilder, Serialize)]
pub struct BuildOptions {
    #[builder(default)]
    pub mcu: Option<McuModel>,
    #[builder(default = false)]
    pub per_key_rgb: bool,
    #[builder(default)]
    pub switch_type: SwitchType,
    #[builder(default = true)]
    pub hotswap: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// One row of the pin legend: a matrix or LED net and the MCU pin driving it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PinAssignment {
    pub net: String,
    pub pin_no: u32,
    pub pin_name: &'static str,
}

/// Parts created for one key, in traversal order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyParts {
    pub key_index: usize,
    pub position: MatrixPosition,
    pub switch_ref: String,
    pub diode_ref: String,
    pub led_ref: Option<String>,
}

/// Everything known about a generated keyboard before any file is written.
#[derive(Debug)]
pub struct Board {
    pub layout: Layout,
    pub options: BuildOptions,
    pub matrix: Matrix,
    pub schematic: Schematic,
    pub pcb: Pcb,
    pub partstore: PartStore,
    pub mcu: Option<Mcu>,
    pub chain: ChainWiring,
    pub key_parts: Vec<KeyParts>,
    pub pin_legend: Vec<PinAssignment>,
    pub led_data_pin: Option<Pin>,
    pub usb_connector_ref: Option<String>,
}

impl Board {
    /// `ROW_1:C14 ROW_2:C15 ...`, printed on the silkscreen.
    pub fn legend_text(&self) -> String {
        self.pin_legend
            .iter()
            .map(|p| format!("{}:{}", p.net, p.pin_name))
            .join(" ")
    }

    /// (x, y, width, height) of the board edge in millimeters.
    pub fn outline_mm(&self) -> (f64, f64, f64, f64) {
        self.pcb.bounds_mm(&self.layout.bounds)
    }

    pub fn usb_cutout_x_mm(&self) -> Option<f64> {
        let reference = self.usb_connector_ref.as_deref()?;
        self.pcb
            .get_part_position(reference)
            .map(|p| p.x as f64 / KC_TO_MM)
    }

    /// Matrix identifier under every key plus the pin legend near the bottom edge.
    pub fn labels(&self) -> Vec<Label> {
        let (_, key_h) = self.pcb.pitch_mm();
        let mut labels: Vec<Label> = self
            .key_parts
            .iter()
            .map(|kp| {
                let (x, y) = self.layout.keys[kp.key_index].position();
                let (x_mm, y_mm) = self.pcb.grid_to_mm(x, y);
                Label {
                    text: kp.position.identifier(),
                    x_mm,
                    y_mm: y_mm + key_h / 2.0 - 2.0,
                }
            })
            .collect();

        if !self.pin_legend.is_empty() {
            let (x, y, w, h) = self.outline_mm();
            labels.push(Label {
                text: self.legend_text(),
                x_mm: x + w / 2.0,
                y_mm: y + h - 1.0,
            });
        }
        labels
    }

    pub fn key_for(&self, row: usize, col: usize) -> Option<&Key> {
        self.matrix.cell(row, col).map(|i| &self.layout.keys[i])
    }
}

/// Runs the pipeline in its fixed order: LED pin claim, matrix allocation,
/// per-key wiring, net pruning, MCU connection.
pub struct BoardBuilder {
    options: BuildOptions,
    overrides: BTreeMap<String, PositionOverride>,
}

impl BoardBuilder {
    pub fn new(options: BuildOptions) -> Self {
        Self {
            options,
            overrides: BTreeMap::new(),
        }
    }

    pub fn with_overrides(mut self, overrides: BTreeMap<String, PositionOverride>) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn build(&self, layout: &Layout) -> KcResult<Board> {
        info!(
            "Building board for {} keys ({:?})",
            layout.key_count(),
            self.options
        );

        // 1. The LED pin leaves the pool before the matrix sees the budget
        let mut mcu = self.options.mcu.map(Mcu::new);
        let led_data_pin = match (&mut mcu, self.options.per_key_rgb) {
            (Some(m), true) => Some(m.claim_led_din_pin()),
            _ => None,
        };
        let available = mcu.as_ref().map_or(usize::MAX, Mcu::gpio_count);

        // 2. Matrix shape
        let matrix = MatrixAllocator::allocate(layout, available)?;

        let mut board = Board {
            layout: layout.clone(),
            options: self.options.clone(),
            matrix,
            schematic: Schematic::new(),
            pcb: Pcb::new(self.options.switch_type.pitch_mm(), self.overrides.clone()),
            partstore: PartStore::new(),
            mcu: None,
            chain: ChainWiring::default(),
            key_parts: Vec::with_capacity(layout.key_count()),
            pin_legend: Vec::new(),
            led_data_pin,
            usb_connector_ref: None,
        };

        // 3. Nets and per-key parts
        board.schematic.net(GND_NET);
        board.schematic.net(VCC_NET);
        for r in 0..board.matrix.row_count() {
            board.schematic.net(&Matrix::row_net_name(r));
        }
        for c in 0..board.matrix.col_count() {
            board.schematic.net(&Matrix::col_net_name(c));
        }

        let mut led_chain = LedChain::new();
        for (index, key) in layout.keys.iter().enumerate() {
            add_key(&mut board, index, key, &mut led_chain)?;
        }
        board.chain = led_chain.finish();

        // 4. Empty rows/cols never consume a GPIO
        board.schematic.prune_empty_nets();

        // 5. Controller
        if let Some(mcu) = mcu {
            connect_mcu(&mut board, mcu)?;
        }

        info!(
            "Board ready: {} parts, {} nets",
            board.schematic.parts().len(),
            board.schematic.nets().len()
        );
        Ok(board)
    }
}

fn add_key(board: &mut Board, index: usize, key: &Key, led_chain: &mut LedChain) -> KcResult<()> {
    let position = board.matrix.position_of(index).ok_or_else(|| {
        KeyCadError::Config(format!("key {} has no matrix position", index))
    })?;
    let row_net = Matrix::row_net_name(position.row);
    let col_net = Matrix::col_net_name(position.col);

    let switch = board.partstore.get_keyswitch(
        &key.printable_label(),
        board.options.switch_type,
        board.options.hotswap,
    );
    let diode = board.partstore.get_diode();
    board.pcb.place_keyswitch(&switch.reference, key);
    board.pcb.place_diode(&diode.reference, key);

    // COL2ROW: column -> switch -> diode anode, cathode -> row
    let sch = &mut board.schematic;
    let switch_diode_net = format!("{}_{}", switch.reference, diode.reference);
    sch.connect_named(&col_net, &switch.reference, SWITCH_COL_PIN);
    sch.connect_named(&switch_diode_net, &switch.reference, SWITCH_DIODE_PIN);
    sch.connect_named(&switch_diode_net, &diode.reference, DIODE_ANODE_PIN);
    sch.connect_named(&row_net, &diode.reference, DIODE_CATHODE_PIN);

    debug!(
        "key {} -> {} ({} {}) {}/{}",
        key,
        position.identifier(),
        row_net,
        col_net,
        switch.reference,
        diode.reference
    );

    let led_ref = if board.options.per_key_rgb {
        let led = board.partstore.get_sk6812mini_e();
        board.pcb.place_led(&led.reference, key);
        sch.connect_named(VCC_NET, &led.reference, chain::LED_VCC_PIN);
        sch.connect_named(GND_NET, &led.reference, chain::LED_GND_PIN);
        if let Some(link) = led_chain.push(&led.reference) {
            sch.connect_named(&link.net_name, &link.upstream, chain::LED_DOUT_PIN);
            sch.connect_named(&link.net_name, &link.downstream, chain::LED_DIN_PIN);
        }
        let reference = led.reference.clone();
        sch.add_part(led);
        Some(reference)
    } else {
        None
    };

    board.key_parts.push(KeyParts {
        key_index: index,
        position,
        switch_ref: switch.reference.clone(),
        diode_ref: diode.reference.clone(),
        led_ref,
    });
    sch.add_part(switch);
    sch.add_part(diode);
    Ok(())
}

fn connect_mcu(board: &mut Board, mut mcu: Mcu) -> KcResult<()> {
    let part = board.partstore.get_mcu(mcu.profile());
    let u = part.reference.clone();
    let bounds = board.layout.bounds;
    let (_, key_h) = board.pcb.pitch_mm();
    board
        .pcb
        .place_top_center(&u, &bounds, (0.0, 1.5 * key_h), 0.0, Side::Top);
    board.schematic.add_part(part);

    for pin in mcu.get_gnd_pins() {
        board.schematic.connect_named(GND_NET, &u, pin.number);
    }
    for pin in mcu.get_vcc_pins() {
        board.schematic.connect_named(VCC_NET, &u, pin.number);
    }

    if let Some(pin) = board.led_data_pin {
        board.schematic.connect_named(LED_DATA_NET, &u, pin.number);
        if let Some(head) = board.chain.head.clone() {
            board
                .schematic
                .connect_named(LED_DATA_NET, &head, chain::LED_DIN_PIN);
        }
    }

    // Only nets that survived pruning are wired.
    let rows: Vec<String> = (0..board.matrix.row_count())
        .map(Matrix::row_net_name)
        .filter(|n| board.schematic.find_net(n).is_some())
        .collect();
    let cols: Vec<String> = (0..board.matrix.col_count())
        .map(Matrix::col_net_name)
        .filter(|n| board.schematic.find_net(n).is_some())
        .collect();

    if rows.len() + cols.len() > mcu.gpio_count() {
        return Err(KeyCadError::Capacity {
            mode: board.matrix.mode().to_string(),
            rows: rows.len(),
            cols: cols.len(),
            available: mcu.gpio_count(),
        });
    }

    for net in rows.iter().chain(cols.iter()) {
        let pin = mcu.claim_next_gpio(net)?;
        board.schematic.connect_named(net, &u, pin.number);
        board.pin_legend.push(PinAssignment {
            net: net.clone(),
            pin_no: pin.number,
            pin_name: pin.name,
        });
    }
    if let Some(pin) = board.led_data_pin {
        board.pin_legend.push(PinAssignment {
            net: LED_DATA_NET.to_string(),
            pin_no: pin.number,
            pin_name: pin.name,
        });
    }

    if mcu.profile().needs_reset_switch {
        if let Some(rst) = mcu.get_reset_pin() {
            add_reset_switch(board, &u, rst);
        }
    }
    if let Some((dp, dm)) = mcu.get_usb_pins() {
        add_usb_c_connector(board, &u, dp, dm);
    }

    info!(
        "{} ({}): {} GPIOs claimed, {} left",
        u,
        mcu.model(),
        mcu.claimed_pins().len(),
        mcu.gpio_count()
    );
    board.mcu = Some(mcu);
    Ok(())
}

fn add_reset_switch(board: &mut Board, mcu_ref: &str, rst: Pin) {
    let sw = board.partstore.get_reset_switch();
    let bounds = board.layout.bounds;
    let (_, key_h) = board.pcb.pitch_mm();
    board
        .pcb
        .place_top_center(&sw.reference, &bounds, (0.0, 2.5 * key_h), 180.0, Side::Bottom);

    let sch = &mut board.schematic;
    sch.connect_named(RESET_NET, mcu_ref, rst.number);
    sch.connect_named(RESET_NET, &sw.reference, 1);
    sch.connect_named(GND_NET, &sw.reference, 2);
    sch.add_part(sw);
}

fn add_usb_c_connector(board: &mut Board, mcu_ref: &str, dp: Pin, dm: Pin) {
    let j = board.partstore.get_usb_c_connector();
    let r1 = board.partstore.get_resistor("5K1");
    let r2 = board.partstore.get_resistor("5K1");

    // The receptacle sits on the top edge; its CC resistors just behind it.
    let bounds = board.layout.bounds;
    let pcb = &mut board.pcb;
    pcb.place_top_center(&j.reference, &bounds, (0.0, 3.0), 180.0, Side::Top);
    pcb.place_top_center(&r1.reference, &bounds, (-6.0, 8.0), 90.0, Side::Bottom);
    pcb.place_top_center(&r2.reference, &bounds, (6.0, 8.0), 90.0, Side::Bottom);

    let sch = &mut board.schematic;
    for pin in USB_GND_PINS {
        sch.connect_named(GND_NET, &j.reference, pin);
    }
    for pin in USB_VCC_PINS {
        sch.connect_named(VCC_NET, &j.reference, pin);
    }

    sch.connect_named("USB_DP", mcu_ref, dp.number);
    for pin in USB_DP_PINS {
        sch.connect_named("USB_DP", &j.reference, pin);
    }
    sch.connect_named("USB_DM", mcu_ref, dm.number);
    for pin in USB_DM_PINS {
        sch.connect_named("USB_DM", &j.reference, pin);
    }

    // 5.1k pull-downs on both CC lines advertise a sink
    sch.connect_named("CC1", &j.reference, "A5");
    sch.connect_named("CC1", &r1.reference, 1);
    sch.connect_named(GND_NET, &r1.reference, 2);
    sch.connect_named("CC2", &j.reference, "B5");
    sch.connect_named("CC2", &r2.reference, 1);
    sch.connect_named(GND_NET, &r2.reference, 2);

    board.usb_connector_ref = Some(j.reference.clone());
    sch.add_part(j);
    sch.add_part(r1);
    sch.add_part(r2);
}
