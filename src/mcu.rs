use crate::error::{KcResult, KeyCadError};
use serde::Serialize;
use std::collections::VecDeque;
use strum_macros::{Display, EnumString};
use tracing::debug;

/// Pin names that carry power, reset or USB data and never enter the GPIO pool.
const RESERVED_PIN_NAMES: &[&str] = &["GND", "VCC", "RST", "3V3", "RAW", "VBAT", "USB_DM", "USB_DP"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, Serialize)]
#[strum(serialize_all = "kebab-case")]
pub enum McuModel {
    ProMicro,
    BluePill,
}

/// Static description of a development board: its pin table in physical
/// order (pin numbers are 1-based) and the roles some of those pins play.
#[derive(Debug)]
pub struct McuProfile {
    pub model: McuModel,
    pub reference: &'static str,
    pub value: &'static str,
    pub symbol: &'static str,
    pub footprint: &'static str,
    pub pin_names: &'static [&'static str],
    pub gpio_pin_nos: &'static [u32],
    pub led_din_pin_no: u32,
    /// (D+, D-) when the board exposes raw USB data lines.
    pub usb_pin_nos: Option<(u32, u32)>,
    pub needs_reset_switch: bool,
}

static PRO_MICRO: McuProfile = McuProfile {
    model: McuModel::ProMicro,
    reference: "U1",
    value: "Pro Micro",
    symbol: "ProMicro",
    footprint: "keycad:ArduinoProMicro",
    pin_names: &[
        "D3", "D2", "GND", "GND", "D1", "D0", "D4", "C6", "D7", "E6", "B4", "B5", "B6", "B2",
        "B3", "B1", "F7", "F6", "F5", "F4", "VCC", "RST", "GND", "RAW",
    ],
    gpio_pin_nos: &[1, 2, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20],
    led_din_pin_no: 5,
    usb_pin_nos: None,
    needs_reset_switch: true,
};

static BLUE_PILL: McuProfile = McuProfile {
    model: McuModel::BluePill,
    reference: "U2",
    value: "Blue Pill",
    symbol: "BluePill_STM32F103C",
    footprint: "keycad:BluePill_STM32F103C",
    pin_names: &[
        // 1-8
        "VBAT", "LED1", "C14", "C15", "A0", "A1", "A2", "A3",
        // 9-16
        "A4", "A5", "A6", "A7", "B0", "B1", "B10", "B11",
        // 17-24
        "RST", "3V3", "GND", "GND", "B12", "B13", "B14", "B15",
        // 25-32
        "A8", "A9", "A10", "USB_DM", "USB_DP", "A15", "B3", "B4",
        // 33-40
        "B5", "B6", "B7", "B8", "B9", "VCC", "GND", "3V3",
    ],
    gpio_pin_nos: &[
        3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 21, 22, 23, 24, 25, 26, 27, 30, 31, 32,
        33, 34, 35, 36, 37,
    ],
    led_din_pin_no: 37,
    usb_pin_nos: Some((29, 28)),
    needs_reset_switch: false,
};

impl McuModel {
    pub fn profile(&self) -> &'static McuProfile {
        match self {
            McuModel::ProMicro => &PRO_MICRO,
            McuModel::BluePill => &BLUE_PILL,
        }
    }
}

impl McuProfile {
    pub fn pin_count(&self) -> usize {
        self.pin_names.len()
    }

    pub fn pin_name(&self, pin_no: u32) -> Option<&'static str> {
        let idx = (pin_no as usize).checked_sub(1)?;
        self.pin_names.get(idx).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Pin {
    pub number: u32,
    pub name: &'static str,
}

/// Per-build pin budget for one microcontroller. GPIOs are handed out FIFO
/// in profile order; a claimed pin never returns to the pool.
#[derive(Debug)]
pub struct Mcu {
    profile: &'static McuProfile,
    pool: VecDeque<u32>,
    gnd_pin_nos: Vec<u32>,
    vcc_pin_nos: Vec<u32>,
    reset_pin_no: Option<u32>,
    claimed: Vec<u32>,
}

impl Mcu {
    pub fn new(model: McuModel) -> Self {
        let profile = model.profile();

        let mut gnd_pin_nos = Vec::new();
        let mut vcc_pin_nos = Vec::new();
        let mut reset_pin_no = None;
        for pin_no in 1..=profile.pin_count() as u32 {
            match profile.pin_name(pin_no) {
                Some("GND") => gnd_pin_nos.push(pin_no),
                Some("VCC") => vcc_pin_nos.push(pin_no),
                Some("RST") => reset_pin_no = Some(pin_no),
                _ => {}
            }
        }

        let pool = profile
            .gpio_pin_nos
            .iter()
            .copied()
            .filter(|&no| {
                profile
                    .pin_name(no)
                    .is_some_and(|name| !RESERVED_PIN_NAMES.contains(&name))
            })
            .collect();

        Self {
            profile,
            pool,
            gnd_pin_nos,
            vcc_pin_nos,
            reset_pin_no,
            claimed: Vec::new(),
        }
    }

    pub fn profile(&self) -> &'static McuProfile {
        self.profile
    }

    pub fn model(&self) -> McuModel {
        self.profile.model
    }

    pub fn reference(&self) -> &'static str {
        self.profile.reference
    }

    fn pin(&self, number: u32) -> Pin {
        Pin {
            number,
            name: self.profile.pin_name(number).unwrap_or("?"),
        }
    }

    pub fn pin_name(&self, pin_no: u32) -> Option<&'static str> {
        self.profile.pin_name(pin_no)
    }

    pub fn gpio_count(&self) -> usize {
        self.pool.len()
    }

    pub fn gpio_pool(&self) -> impl Iterator<Item = u32> + '_ {
        self.pool.iter().copied()
    }

    pub fn claimed_pins(&self) -> &[u32] {
        &self.claimed
    }

    pub fn claim_next_gpio(&mut self, role: &str) -> KcResult<Pin> {
        let number = self
            .pool
            .pop_front()
            .ok_or_else(|| KeyCadError::ResourceExhausted {
                role: role.to_string(),
            })?;
        self.claimed.push(number);
        let pin = self.pin(number);
        debug!("{}: pin {} ({}) -> {}", self.reference(), number, pin.name, role);
        Ok(pin)
    }

    /// Takes the LED-capable pin out of the pool. Calling it again (or after
    /// the pin already left the pool) still returns the same pin.
    pub fn claim_led_din_pin(&mut self) -> Pin {
        let number = self.profile.led_din_pin_no;
        if let Some(idx) = self.pool.iter().position(|&no| no == number) {
            self.pool.remove(idx);
            self.claimed.push(number);
        }
        self.pin(number)
    }

    pub fn is_in_pool(&self, pin_no: u32) -> bool {
        self.pool.contains(&pin_no)
    }

    pub fn get_gnd_pins(&self) -> Vec<Pin> {
        self.gnd_pin_nos.iter().map(|&no| self.pin(no)).collect()
    }

    pub fn get_vcc_pins(&self) -> Vec<Pin> {
        self.vcc_pin_nos.iter().map(|&no| self.pin(no)).collect()
    }

    pub fn get_reset_pin(&self) -> Option<Pin> {
        self.reset_pin_no.map(|no| self.pin(no))
    }

    /// (D+, D-)
    pub fn get_usb_pins(&self) -> Option<(Pin, Pin)> {
        self.profile
            .usb_pin_nos
            .map(|(dp, dm)| (self.pin(dp), self.pin(dm)))
    }
}
