use crate::error::KcResult;
use crate::schematic::Part;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use strum_macros::Display;
use tracing::debug;

pub const LIBRARY: &str = "keycad";

/// Orderable parts. The Display string is the manufacturer part number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
pub enum PartKind {
    #[strum(serialize = "ProMicro")]
    ProMicro,
    #[strum(serialize = "BluePill")]
    BluePill,
    #[strum(serialize = "MX")]
    MxSwitch,
    #[strum(serialize = "Kailh_socket_MX")]
    MxHotswapSocket,
    #[strum(serialize = "PG1350")]
    ChocSwitch,
    #[strum(serialize = "Kailh_socket_PG1350")]
    ChocHotswapSocket,
    #[strum(serialize = "SK6812MINI-E")]
    Sk6812MiniE,
    #[strum(serialize = "1N4148")]
    Diode1N4148,
    #[strum(serialize = "5K1")]
    Resistor5K1,
    #[strum(serialize = "SKQGAKE010")]
    ResetSwitch,
    #[strum(serialize = "TYPE-C-31-M-14")]
    UsbC,
}

impl PartKind {
    pub fn description(&self) -> &'static str {
        match self {
            PartKind::ProMicro => "Arduino Pro Micro",
            PartKind::BluePill => "STM32F103C8 Blue Pill",
            PartKind::MxSwitch => "Cherry MX-compatible Switch",
            PartKind::MxHotswapSocket => "Kailh MX-compatible Hotswap Socket",
            PartKind::ChocSwitch => "Kailh Choc-compatible Switch",
            PartKind::ChocHotswapSocket => "Kailh Choc Hotswap Socket",
            PartKind::Sk6812MiniE => "SK6812 MINI-E RGB LED",
            PartKind::Diode1N4148 => "0805 1N4148 Diode",
            PartKind::Resistor5K1 => "0805 5.1k Resistor",
            PartKind::ResetSwitch => "Alps SPST SKQG SMT Switch",
            PartKind::UsbC => "Korean Hroparts TYPE-C-31-M-14 USB-C Connector",
        }
    }
}

/// Reference designator prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum RefPrefix {
    #[strum(serialize = "U")]
    Ic,
    #[strum(serialize = "D")]
    Diode,
    #[strum(serialize = "R")]
    Resistor,
    #[strum(serialize = "LED")]
    Led,
    #[strum(serialize = "K")]
    Keyswitch,
    #[strum(serialize = "SW")]
    Switch,
    #[strum(serialize = "J")]
    Connector,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SwitchType {
    #[default]
    Mx,
    Pg1350,
}

impl SwitchType {
    /// (width, height) of one grid unit in millimeters.
    pub fn pitch_mm(&self) -> (f64, f64) {
        match self {
            SwitchType::Mx => (19.05, 19.05),
            SwitchType::Pg1350 => (18.0, 17.0),
        }
    }

    fn footprint_suffix(&self) -> &'static str {
        match self {
            SwitchType::Mx => "MX",
            SwitchType::Pg1350 => "PG1350",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BomEntry {
    pub partno: String,
    pub description: String,
    pub quantity: usize,
}

/// Hands out reference designators and counts everything that goes on the BOM.
#[derive(Debug, Default)]
pub struct PartStore {
    counters: HashMap<RefPrefix, u32>,
    tally: Vec<(PartKind, usize)>,
}

impl PartStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_reference(&mut self, prefix: RefPrefix) -> String {
        let counter = self.counters.entry(prefix).or_insert(0);
        *counter += 1;
        format!("{}{}", prefix, counter)
    }

    /// Counts `quantity` of `kind`; new kinds append in first-seen order.
    pub fn record(&mut self, kind: PartKind, quantity: usize) {
        match self.tally.iter_mut().find(|(k, _)| *k == kind) {
            Some((_, count)) => *count += quantity,
            None => self.tally.push((kind, quantity)),
        }
    }

    pub fn quantity_of(&self, kind: PartKind) -> usize {
        self.tally
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, q)| *q)
            .unwrap_or(0)
    }

    pub fn bom(&self) -> Vec<BomEntry> {
        self.tally
            .iter()
            .map(|(kind, quantity)| BomEntry {
                partno: kind.to_string(),
                description: kind.description().to_string(),
                quantity: *quantity,
            })
            .collect()
    }

    pub fn write_bom_csv<P: AsRef<Path>>(&self, path: P) -> KcResult<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for entry in self.bom() {
            writer.serialize(entry)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn make(&mut self, prefix: RefPrefix, kind: PartKind, value: &str, symbol: &'static str, footprint: String) -> Part {
        self.record(kind, 1);
        let reference = self.next_reference(prefix);
        debug!("new part {} ({}) {}", reference, value, footprint);
        Part {
            reference,
            value: value.to_string(),
            library: LIBRARY,
            symbol,
            footprint,
            kind,
        }
    }

    /// A keyswitch; the hotswap socket (when used) is tallied alongside it.
    pub fn get_keyswitch(&mut self, value: &str, switch: SwitchType, hotswap: bool) -> Part {
        let (switch_kind, socket_kind) = match switch {
            SwitchType::Mx => (PartKind::MxSwitch, PartKind::MxHotswapSocket),
            SwitchType::Pg1350 => (PartKind::ChocSwitch, PartKind::ChocHotswapSocket),
        };
        let footprint_base = if hotswap { "Kailh_socket" } else { "SW" };
        let footprint = format!("{}:{}_{}", LIBRARY, footprint_base, switch.footprint_suffix());
        let part = self.make(RefPrefix::Keyswitch, switch_kind, value, "KEYSW", footprint);
        if hotswap {
            self.record(socket_kind, 1);
        }
        part
    }

    pub fn get_diode(&mut self) -> Part {
        let footprint = format!("{}:D_0805", LIBRARY);
        self.make(RefPrefix::Diode, PartKind::Diode1N4148, "1N4148", "D", footprint)
    }

    pub fn get_sk6812mini_e(&mut self) -> Part {
        let footprint = format!("{}:SK6812-MINI-E-BOTTOM", LIBRARY);
        self.make(RefPrefix::Led, PartKind::Sk6812MiniE, "SK6812MINI-E", "SK6812MINI-E", footprint)
    }

    pub fn get_resistor(&mut self, value: &str) -> Part {
        let footprint = format!("{}:R_0805", LIBRARY);
        self.make(RefPrefix::Resistor, PartKind::Resistor5K1, value, "R", footprint)
    }

    pub fn get_reset_switch(&mut self) -> Part {
        let footprint = format!("{}:SW_SPST_SKQG_WithStem", LIBRARY);
        self.make(RefPrefix::Switch, PartKind::ResetSwitch, "SKQGAKE010", "SW_Push", footprint)
    }

    pub fn get_usb_c_connector(&mut self) -> Part {
        let footprint = format!("{}:HRO_TYPE-C-31-M-12", LIBRARY);
        self.make(RefPrefix::Connector, PartKind::UsbC, "TYPE-C-31-M-14", "USB_C_Receptacle", footprint)
    }

    /// MCU parts use the fixed designator from their profile, not the counter.
    pub fn get_mcu(&mut self, profile: &crate::mcu::McuProfile) -> Part {
        let kind = match profile.model {
            crate::mcu::McuModel::ProMicro => PartKind::ProMicro,
            crate::mcu::McuModel::BluePill => PartKind::BluePill,
        };
        self.record(kind, 1);
        Part {
            reference: profile.reference.to_string(),
            value: profile.value.to_string(),
            library: LIBRARY,
            symbol: profile.symbol,
            footprint: profile.footprint.to_string(),
            kind,
        }
    }
}
