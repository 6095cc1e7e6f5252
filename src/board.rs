//! KiCad 5 board fragments: Edge.Cuts outline, zones and silkscreen text.

use crate::error::{KcResult, KeyCadError};
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

pub const EDGE_WIDTH_MM: f64 = 0.15;
/// Notch cut into the top edge in front of a USB connector.
pub const USB_CUTOUT_DEPTH_MM: f64 = 2.0;
/// Korean Hroparts TYPE-C-31-M-14 shell width plus clearance.
pub const USB_CUTOUT_WIDTH_MM: f64 = 4.7 * 2.0;
pub const USB_KEEPOUT_DEPTH_MM: f64 = 6.1;
pub const PLATE_MARGIN_MM: f64 = 5.0;
pub const PLATE_CORNER_RADIUS_MM: f64 = 5.0;

fn fmt_mm(v: f64) -> String {
    let v = if v.abs() < 1e-9 { 0.0 } else { v };
    let s = format!("{:.4}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() || s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

fn gr_line(x1: f64, y1: f64, x2: f64, y2: f64) -> String {
    format!(
        "(gr_line (start {} {}) (end {} {}) (angle 90) (layer Edge.Cuts) (width {}))",
        fmt_mm(x1),
        fmt_mm(y1),
        fmt_mm(x2),
        fmt_mm(y2),
        fmt_mm(EDGE_WIDTH_MM)
    )
}

/// KiCad 5 arcs are stored as center (`start`), arc start (`end`) and sweep.
fn gr_arc(cx: f64, cy: f64, sx: f64, sy: f64, angle: f64) -> String {
    format!(
        "(gr_arc (start {} {}) (end {} {}) (angle {}) (layer Edge.Cuts) (width {}))",
        fmt_mm(cx),
        fmt_mm(cy),
        fmt_mm(sx),
        fmt_mm(sy),
        fmt_mm(angle),
        fmt_mm(EDGE_WIDTH_MM)
    )
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsbCutout {
    pub center_x_mm: f64,
    pub width_mm: f64,
    pub depth_mm: f64,
}

/// Rectangular board edge, optionally grown by a margin, rounded, and notched
/// for a USB connector on the top edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Outline {
    pub x_mm: f64,
    pub y_mm: f64,
    pub width_mm: f64,
    pub height_mm: f64,
    pub margin_mm: f64,
    pub corner_radius_mm: f64,
    pub usb_cutout: Option<UsbCutout>,
}

impl Outline {
    pub fn new(x_mm: f64, y_mm: f64, width_mm: f64, height_mm: f64) -> Self {
        Self {
            x_mm,
            y_mm,
            width_mm,
            height_mm,
            margin_mm: 0.0,
            corner_radius_mm: 0.0,
            usb_cutout: None,
        }
    }

    pub fn with_rounded_margin(mut self, margin_mm: f64, corner_radius_mm: f64) -> Self {
        self.margin_mm = margin_mm;
        self.corner_radius_mm = corner_radius_mm;
        self
    }

    pub fn with_usb_cutout(mut self, cutout: UsbCutout) -> Self {
        self.usb_cutout = Some(cutout);
        self
    }

    /// (left, top, right, bottom) of the cut edge.
    pub fn extents(&self) -> (f64, f64, f64, f64) {
        (
            self.x_mm - self.margin_mm,
            self.y_mm - self.margin_mm,
            self.x_mm + self.width_mm + self.margin_mm,
            self.y_mm + self.height_mm + self.margin_mm,
        )
    }

    pub fn to_sexprs(&self) -> Vec<String> {
        let (l, t, r, b) = self.extents();
        let cr = self.corner_radius_mm;
        let mut items = Vec::new();

        // Top edge, possibly split around the USB notch.
        match self.usb_cutout {
            Some(cut) if cut.width_mm > 0.0 => {
                let notch_l = cut.center_x_mm - cut.width_mm / 2.0;
                let notch_r = cut.center_x_mm + cut.width_mm / 2.0;
                let depth = t + cut.depth_mm;
                items.push(gr_line(l + cr, t, notch_l, t));
                items.push(gr_line(notch_l, t, notch_l, depth));
                items.push(gr_line(notch_l, depth, notch_r, depth));
                items.push(gr_line(notch_r, depth, notch_r, t));
                items.push(gr_line(notch_r, t, r - cr, t));
            }
            _ => items.push(gr_line(l + cr, t, r - cr, t)),
        }
        items.push(gr_line(r, t + cr, r, b - cr));
        items.push(gr_line(r - cr, b, l + cr, b));
        items.push(gr_line(l, b - cr, l, t + cr));

        if cr > 0.0 {
            items.push(gr_arc(l + cr, t + cr, l, t + cr, 90.0));
            items.push(gr_arc(r - cr, t + cr, r - cr, t, 90.0));
            items.push(gr_arc(r - cr, b - cr, r, b - cr, 90.0));
            items.push(gr_arc(l + cr, b - cr, l + cr, b, 90.0));
        }
        items
    }
}

fn polygon(x: f64, y: f64, w: f64, h: f64) -> String {
    format!(
        "(polygon (pts (xy {} {}) (xy {} {}) (xy {} {}) (xy {} {})))",
        fmt_mm(x),
        fmt_mm(y),
        fmt_mm(x + w),
        fmt_mm(y),
        fmt_mm(x + w),
        fmt_mm(y + h),
        fmt_mm(x),
        fmt_mm(y + h)
    )
}

/// Copper keepout on both layers, e.g. under the USB receptacle.
pub fn keepout_zones(x: f64, y: f64, w: f64, h: f64) -> Vec<String> {
    ["F.Cu", "B.Cu"]
        .iter()
        .map(|layer| {
            format!(
                "(zone (net 0) (net_name \"\") (layer {}) (tstamp 0) (hatch edge 0.508)\n    \
                 (connect_pads (clearance 0.508))\n    \
                 (min_thickness 0.254)\n    \
                 (keepout (tracks not_allowed) (vias not_allowed) (copperpour not_allowed))\n    \
                 (fill (arc_segments 32) (thermal_gap 0.508) (thermal_bridge_width 0.508))\n    \
                 {})",
                layer,
                polygon(x, y, w, h)
            )
        })
        .collect()
}

/// Unfilled GND pour. KiCad resolves the net by name when `net_code` is stale.
pub fn ground_zone(net_code: u32, layer: &str, x: f64, y: f64, w: f64, h: f64) -> String {
    format!(
        "(zone (net {}) (net_name GND) (layer {}) (tstamp 0) (hatch edge 0.508)\n    \
         (connect_pads (clearance 0.508))\n    \
         (min_thickness 0.254)\n    \
         (fill (arc_segments 32) (thermal_gap 0.508) (thermal_bridge_width 0.508))\n    \
         {})",
        net_code,
        layer,
        polygon(x, y, w, h)
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    pub x_mm: f64,
    pub y_mm: f64,
}

impl Label {
    pub fn to_sexpr(&self) -> String {
        format!(
            "(gr_text {} (at {} {}) (layer F.SilkS)\n    (effects (font (size 1 1) (thickness 0.15))))",
            quote(&self.text),
            fmt_mm(self.x_mm),
            fmt_mm(self.y_mm)
        )
    }
}

/// A complete KiCad 5 board containing only the given drawing items.
pub fn standalone_board(items: &[String]) -> String {
    let mut out = String::new();
    out.push_str("(kicad_pcb (version 20171130) (host keycad ");
    out.push_str(env!("CARGO_PKG_VERSION"));
    out.push_str(")\n\n  (general\n    (thickness 1.6)\n  )\n\n  (page A4)\n");
    out.push_str(
        "  (layers\n    (0 F.Cu signal)\n    (31 B.Cu signal)\n    (36 B.SilkS user)\n    \
         (37 F.SilkS user)\n    (38 B.Mask user)\n    (39 F.Mask user)\n    (44 Edge.Cuts user)\n  )\n\n",
    );
    out.push_str("  (net 0 \"\")\n  (net 1 GND)\n\n");
    for item in items {
        let _ = writeln!(out, "  {}", item);
    }
    out.push_str(")\n");
    out
}

pub fn write_standalone_board<P: AsRef<Path>>(path: P, items: &[String]) -> KcResult<()> {
    std::fs::write(path.as_ref(), standalone_board(items))?;
    info!("Wrote board {}", path.as_ref().display());
    Ok(())
}

/// Inserts items before the closing paren of an existing board file.
pub fn append_to_board<P: AsRef<Path>>(path: P, items: &[String]) -> KcResult<()> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let close = content.rfind(')').ok_or_else(|| {
        KeyCadError::Config(format!("'{}' is not a KiCad board file", path.display()))
    })?;

    let mut out = String::with_capacity(content.len() + items.len() * 96);
    out.push_str(content[..close].trim_end());
    out.push('\n');
    for item in items {
        let _ = writeln!(out, "  {}", item);
    }
    out.push_str(&content[close..]);
    std::fs::write(path, out)?;
    info!("Added {} items to {}", items.len(), path.display());
    Ok(())
}
