mod common;

use keycad::builder::{BoardBuilder, BuildOptions};
use keycad::error::KeyCadError;
use keycad::geometry::kle::parse_kle_json;
use keycad::matrix::MatrixAllocator;
use keycad::mcu::McuModel;
use proptest::prelude::*;
use std::collections::HashSet;

// --- STRATEGIES ---

prop_compose! {
    fn arb_row_lengths()(
        rows in proptest::collection::vec(0usize..20, 0..9)
    ) -> Vec<usize> {
        rows
    }
}

fn arb_mcu() -> impl Strategy<Value = Option<McuModel>> {
    prop_oneof![
        Just(None),
        Just(Some(McuModel::ProMicro)),
        Just(Some(McuModel::BluePill)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_every_key_gets_a_unique_cell(rows in arb_row_lengths(), available in 0usize..40) {
        let layout = common::rows_layout(&rows);
        match MatrixAllocator::allocate(&layout, available) {
            Ok(matrix) => {
                let cells: HashSet<_> = matrix.positions().iter().copied().collect();
                prop_assert_eq!(cells.len(), layout.key_count());
                prop_assert_eq!(matrix.key_count(), layout.key_count());
                for (i, pos) in matrix.positions().iter().enumerate() {
                    prop_assert_eq!(matrix.cell(pos.row, pos.col), Some(i));
                }
                prop_assert!(matrix.pins_required() <= available);
            }
            Err(KeyCadError::Capacity { rows, cols, .. }) => {
                prop_assert!(rows + cols > available);
            }
            Err(other) => prop_assert!(false, "unexpected error {:?}", other),
        }
    }

    #[test]
    fn prop_allocation_is_deterministic(rows in arb_row_lengths(), available in 0usize..40) {
        let layout = common::rows_layout(&rows);
        let a = MatrixAllocator::allocate(&layout, available).ok();
        let b = MatrixAllocator::allocate(&layout, available).ok();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_claimed_pins_are_disjoint_and_budgeted(
        rows in arb_row_lengths(),
        mcu in arb_mcu(),
        rgb in any::<bool>(),
    ) {
        let layout = common::rows_layout(&rows);
        let options = BuildOptions::builder().mcu(mcu).per_key_rgb(rgb).build();
        let Ok(board) = BoardBuilder::new(options).build(&layout) else {
            return Ok(());
        };
        let Some(mcu) = &board.mcu else {
            prop_assert!(board.pin_legend.is_empty());
            return Ok(());
        };

        let claimed: HashSet<u32> = mcu.claimed_pins().iter().copied().collect();
        prop_assert_eq!(claimed.len(), mcu.claimed_pins().len(), "a pin was claimed twice");
        for pin in mcu.gpio_pool() {
            prop_assert!(!claimed.contains(&pin));
        }
        prop_assert_eq!(
            claimed.len() + mcu.gpio_count(),
            mcu.profile().gpio_pin_nos.len()
        );

        let mut reserved: Vec<u32> = mcu
            .get_gnd_pins()
            .iter()
            .chain(mcu.get_vcc_pins().iter())
            .map(|p| p.number)
            .collect();
        reserved.extend(mcu.get_reset_pin().map(|p| p.number));
        if let Some((dp, dm)) = mcu.get_usb_pins() {
            reserved.extend([dp.number, dm.number]);
        }
        for pin in &reserved {
            prop_assert!(!claimed.contains(pin), "reserved pin {} was claimed", pin);
            prop_assert!(!mcu.gpio_pool().any(|p| p == *pin), "reserved pin {} is in the pool", pin);
        }

        let legend_pins: HashSet<u32> = board.pin_legend.iter().map(|p| p.pin_no).collect();
        prop_assert_eq!(legend_pins.len(), board.pin_legend.len());
        for pin in &reserved {
            prop_assert!(!legend_pins.contains(pin));
        }
        // The LED pin is shared only by the LED_DATA legend entry.
        if let Some(led) = board.led_data_pin {
            prop_assert!(claimed.contains(&led.number));
            prop_assert!(board
                .pin_legend
                .iter()
                .filter(|p| p.pin_no == led.number)
                .all(|p| p.net == "LED_DATA"));
        }
    }

    #[test]
    fn prop_widths_never_shift_columns(widths in proptest::collection::vec(1u32..5, 1..12)) {
        let tokens: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(i, w)| format!("{{\"w\":{}}},\"K{}\"", w, i))
            .collect();
        let json = format!("[[{}]]", tokens.join(","));
        let layout = parse_kle_json(&json).unwrap();
        let matrix = MatrixAllocator::allocate(&layout, usize::MAX).unwrap();
        for i in 0..widths.len() {
            prop_assert_eq!(matrix.position_of(i).map(|p| p.col), Some(i));
        }
        let total: u32 = widths.iter().sum();
        prop_assert_eq!(layout.bounds.right, total as f64);
    }
}
