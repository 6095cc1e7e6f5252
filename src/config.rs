use crate::builder::BuildOptions;
use crate::error::{KcResult, KeyCadError};
use crate::mcu::McuModel;
use crate::partstore::SwitchType;
use clap::Args;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What goes on the board.
#[derive(Args, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardParams {
    /// Wire the matrix to an Arduino Pro Micro (adds a reset switch)
    #[arg(long, conflicts_with = "add_blue_pill")]
    pub add_pro_micro: bool,

    /// Wire the matrix to an STM32 Blue Pill (adds a USB-C connector)
    #[arg(long)]
    pub add_blue_pill: bool,

    /// Add a daisy-chained SK6812 MINI-E under every key
    #[arg(long)]
    pub add_per_key_rgb: bool,

    /// Kailh Choc (PG1350) switches instead of MX
    #[arg(long)]
    pub use_pg1350: bool,

    /// Solder the switches directly instead of using Kailh sockets
    #[arg(long)]
    pub no_hotswap: bool,
}

impl BoardParams {
    pub fn mcu(&self) -> Option<McuModel> {
        match (self.add_pro_micro, self.add_blue_pill) {
            (true, _) => Some(McuModel::ProMicro),
            (false, true) => Some(McuModel::BluePill),
            (false, false) => None,
        }
    }

    pub fn switch_type(&self) -> SwitchType {
        if self.use_pg1350 {
            SwitchType::Pg1350
        } else {
            SwitchType::Mx
        }
    }

    pub fn validate(&self) -> KcResult<()> {
        if self.add_pro_micro && self.add_blue_pill {
            return Err(KeyCadError::Config(
                "--add-pro-micro and --add-blue-pill are mutually exclusive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_build_options(&self) -> KcResult<BuildOptions> {
        self.validate()?;
        Ok(BuildOptions::builder()
            .mcu(self.mcu())
            .per_key_rgb(self.add_per_key_rgb)
            .switch_type(self.switch_type())
            .hotswap(!self.no_hotswap)
            .build())
    }

    /// The flags as they would be typed, for the user guide.
    pub fn to_arg_string(&self) -> String {
        [
            (self.add_pro_micro, "--add-pro-micro"),
            (self.add_blue_pill, "--add-blue-pill"),
            (self.add_per_key_rgb, "--add-per-key-rgb"),
            (self.use_pg1350, "--use-pg1350"),
            (self.no_hotswap, "--no-hotswap"),
        ]
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, flag)| *flag)
        .collect::<Vec<_>>()
        .join(" ")
    }
}

/// Where and how artifacts are written.
#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildParams {
    /// kinjector-format JSON overriding computed footprint positions
    #[arg(long)]
    pub position_json: Option<PathBuf>,

    #[arg(long, default_value = "output")]
    pub out_dir: PathBuf,

    #[arg(long, default_value = "my-keyboard")]
    pub output_prefix: String,

    /// JSON file with USB and firmware descriptors
    #[arg(long)]
    pub descriptors: Option<PathBuf>,

    /// Run kinet2pcb and kinjector to populate the main board
    #[arg(long)]
    pub run_kicad_tools: bool,

    /// Open the finished board with xdg-open
    #[arg(long)]
    pub open: bool,

    #[arg(long, default_value_t = 120)]
    pub tool_timeout_secs: u64,
}

impl Default for BuildParams {
    fn default() -> Self {
        Self {
            position_json: None,
            out_dir: PathBuf::from("output"),
            output_prefix: "my-keyboard".to_string(),
            descriptors: None,
            run_kicad_tools: false,
            open: false,
            tool_timeout_secs: 120,
        }
    }
}

impl BuildParams {
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    pub fn load_descriptors(&self) -> KcResult<Descriptors> {
        match &self.descriptors {
            Some(path) => Descriptors::load_from_file(path),
            None => Ok(Descriptors::default()),
        }
    }
}

/// USB and firmware identity of the keyboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Descriptors {
    pub family_id: String,
    pub identifier: String,
    pub usb_vid: u16,
    pub usb_pid: u16,
    pub usb_manufacturer: String,
    pub usb_product: String,
    pub usb_description: String,
}

impl Default for Descriptors {
    fn default() -> Self {
        Self {
            family_id: "keycad".to_string(),
            identifier: "generic_keyboard".to_string(),
            usb_vid: 0xFEED,
            usb_pid: 0x0001,
            usb_manufacturer: "Generic".to_string(),
            usb_product: "Generic".to_string(),
            usb_description: "A keyboard".to_string(),
        }
    }
}

impl Descriptors {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> KcResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            KeyCadError::Config(format!("invalid descriptors file '{}': {}", path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptors_fill_missing_fields() {
        let d: Descriptors = serde_json::from_str(r#"{"usb_product": "JD40"}"#).unwrap();
        assert_eq!(d.usb_product, "JD40");
        assert_eq!(d.usb_vid, 0xFEED);
        assert_eq!(d.identifier, "generic_keyboard");
    }

    #[test]
    fn both_mcus_is_a_config_error() {
        let params = BoardParams {
            add_pro_micro: true,
            add_blue_pill: true,
            ..Default::default()
        };
        assert!(matches!(params.validate(), Err(KeyCadError::Config(_))));
    }

    #[test]
    fn arg_string_lists_enabled_flags() {
        let params = BoardParams {
            add_blue_pill: true,
            add_per_key_rgb: true,
            ..Default::default()
        };
        assert_eq!(params.to_arg_string(), "--add-blue-pill --add-per-key-rgb");
    }
}
