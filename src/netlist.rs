//! KiCad S-expression netlist export, the input `kinet2pcb` consumes.

use crate::error::KcResult;
use crate::schematic::{Part, Schematic};
use std::fmt::Write;
use std::path::Path;
use tracing::info;

fn escape_kicad_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// `K12` sorts after `K2`: alphabetic prefix first, then the numeric suffix.
fn reference_sort_key(reference: &str) -> (String, u64) {
    let split = reference
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(reference.len());
    let (prefix, number) = reference.split_at(split);
    (prefix.to_string(), number.parse().unwrap_or(0))
}

pub fn to_kicad_netlist(sch: &Schematic, source: &str) -> String {
    let mut components: Vec<&Part> = sch.parts().iter().collect();
    components.sort_by_key(|p| reference_sort_key(&p.reference));

    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(out, "(export (version D)");
    let _ = writeln!(out, "  (design");
    let _ = writeln!(out, "    (source \"{}\")", escape_kicad_string(source));
    let _ = writeln!(out, "    (date \"\")");
    let _ = writeln!(out, "    (tool \"keycad {}\"))", env!("CARGO_PKG_VERSION"));

    let _ = writeln!(out, "  (components");
    for part in &components {
        let _ = writeln!(out, "    (comp (ref \"{}\")", escape_kicad_string(&part.reference));
        let _ = writeln!(out, "      (value \"{}\")", escape_kicad_string(&part.value));
        let _ = writeln!(out, "      (footprint \"{}\")", escape_kicad_string(&part.footprint));
        let _ = writeln!(
            out,
            "      (libsource (lib \"{}\") (part \"{}\")))",
            part.library,
            escape_kicad_string(part.symbol)
        );
    }
    let _ = writeln!(out, "  )");

    let _ = writeln!(out, "  (nets");
    for (idx, net) in sch.nets().iter().enumerate() {
        let _ = write!(
            out,
            "    (net (code {}) (name \"{}\")",
            idx + 1,
            escape_kicad_string(&net.name)
        );
        for node in &net.nodes {
            let _ = write!(
                out,
                "\n      (node (ref \"{}\") (pin \"{}\"))",
                escape_kicad_string(&node.part),
                escape_kicad_string(&node.pin)
            );
        }
        let _ = writeln!(out, ")");
    }
    let _ = writeln!(out, "  )");
    let _ = writeln!(out, ")");
    out
}

pub fn write_netlist<P: AsRef<Path>>(sch: &Schematic, source: &str, path: P) -> KcResult<()> {
    std::fs::write(path.as_ref(), to_kicad_netlist(sch, source))?;
    info!(
        "Wrote netlist ({} parts, {} nets) to {}",
        sch.parts().len(),
        sch.nets().len(),
        path.as_ref().display()
    );
    Ok(())
}
