#![allow(dead_code)]

use keycad::geometry::kle::parse_kle_json;
use keycad::geometry::Layout;

/// The JD40 preset from keyboard-layout-editor.com: rows of 12, 11, 11 and 6 keys.
pub const JD40_JSON: &str = r#"[
["Esc","Q","W","E","R","T","Y","U","I","O","P","Back<br>Space"],
[{"w":1.25},"Tab","A","S","D","F","G","H","J","K","L",{"w":1.75},"Enter"],
[{"w":1.75},"Shift","Z","X","C","V","B","N","M","<\n.",{"w":1.25},"Shift","Fn"],
[{"w":1.25},"Hyper","Super","Meta",{"a":7,"w":6.25},"",{"a":4,"w":1.25},"Meta",{"w":1.25},"Super"]
]"#;

pub fn jd40() -> Layout {
    parse_kle_json(JD40_JSON).expect("JD40 fixture must parse")
}

/// KLE JSON with one row per entry of `row_lengths`, keys labelled `R<r>C<c>`.
pub fn rows_json(row_lengths: &[usize]) -> String {
    let rows: Vec<String> = row_lengths
        .iter()
        .enumerate()
        .map(|(r, &n)| {
            let keys: Vec<String> = (0..n).map(|c| format!("\"R{}C{}\"", r, c)).collect();
            format!("[{}]", keys.join(","))
        })
        .collect();
    format!("[{}]", rows.join(",\n"))
}

pub fn rows_layout(row_lengths: &[usize]) -> Layout {
    parse_kle_json(&rows_json(row_lengths)).expect("generated layout must parse")
}

/// 68 keys in the usual 65% shape: natural needs 5 rows + 15 cols = 20 pins.
pub fn sixty_eight_keys() -> Layout {
    rows_layout(&[15, 15, 14, 14, 10])
}
