use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use keycad::builder::Board;
use std::path::PathBuf;

/// Key legends laid out by matrix cell; empty cells stay blank.
pub fn print_matrix_grid(board: &Board) {
    let matrix = &board.matrix;
    println!(
        "\nMatrix: {} ({} rows x {} cols)",
        matrix.mode(),
        matrix.row_count(),
        matrix.col_count()
    );

    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let mut header = vec![Cell::new("").add_attribute(Attribute::Bold)];
    header.extend((0..matrix.col_count()).map(|c| {
        Cell::new(c)
            .add_attribute(Attribute::Bold)
            .set_alignment(CellAlignment::Center)
    }));
    table.set_header(header);

    for r in 0..matrix.row_count() {
        let letter = char::from_u32('A' as u32 + r as u32).unwrap_or('?');
        let mut cells = vec![Cell::new(letter).add_attribute(Attribute::Bold)];
        cells.extend((0..matrix.col_count()).map(|c| {
            let text = board
                .key_for(r, c)
                .map(|k| k.printable_label())
                .unwrap_or_default();
            Cell::new(text).set_alignment(CellAlignment::Center)
        }));
        table.add_row(cells);
    }
    println!("{}", table);
}

pub fn print_pin_legend(board: &Board) {
    let Some(mcu) = &board.mcu else {
        println!("\nℹ️  No controller selected; matrix nets are left unconnected.");
        return;
    };

    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Net").add_attribute(Attribute::Bold),
        Cell::new(format!("{} pin", mcu.profile().value)).add_attribute(Attribute::Bold),
        Cell::new("No.").add_attribute(Attribute::Bold),
    ]);

    for p in &board.pin_legend {
        let color = if p.net.starts_with("ROW") {
            Color::Cyan
        } else if p.net.starts_with("COL") {
            Color::Green
        } else {
            Color::Magenta
        };
        table.add_row(vec![
            Cell::new(&p.net).fg(color),
            Cell::new(p.pin_name),
            Cell::new(p.pin_no).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("\n{}", table);
    println!(
        "   {} of {} GPIOs left unclaimed",
        mcu.gpio_count(),
        mcu.gpio_count() + mcu.claimed_pins().len()
    );
}

pub fn print_bom(board: &Board) {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Part").add_attribute(Attribute::Bold),
        Cell::new("Description").add_attribute(Attribute::Bold),
        Cell::new("Qty").add_attribute(Attribute::Bold),
    ]);
    for entry in board.partstore.bom() {
        table.add_row(vec![
            Cell::new(entry.partno),
            Cell::new(entry.description),
            Cell::new(entry.quantity).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("\n{}", table);
}

pub fn print_written_files(files: &[PathBuf]) {
    println!("\n📦 Wrote {} files:", files.len());
    for f in files {
        println!("   {}", f.display());
    }
}
