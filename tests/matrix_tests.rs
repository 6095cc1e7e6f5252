mod common;

use keycad::error::KeyCadError;
use keycad::geometry::kle::parse_kle_json;
use keycad::matrix::{MatrixAllocator, MatrixMode, MatrixPosition};
use rstest::rstest;

#[test]
fn test_two_by_two_is_natural() {
    let layout = parse_kle_json(r#"[["A","B"],["C","D"]]"#).unwrap();
    let matrix = MatrixAllocator::allocate(&layout, 20).unwrap();

    assert_eq!(matrix.mode(), MatrixMode::Natural);
    let expected = [(0, 0), (0, 1), (1, 0), (1, 1)];
    for (i, (row, col)) in expected.iter().enumerate() {
        assert_eq!(
            matrix.position_of(i),
            Some(MatrixPosition { row: *row, col: *col }),
            "key {}",
            layout.keys[i]
        );
    }
}

#[test]
fn test_wide_key_does_not_skip_columns() {
    let layout = parse_kle_json(r#"[[{"w":2},"A","B"]]"#).unwrap();
    let matrix = MatrixAllocator::allocate(&layout, 20).unwrap();
    assert_eq!(matrix.position_of(0), Some(MatrixPosition { row: 0, col: 0 }));
    assert_eq!(matrix.position_of(1), Some(MatrixPosition { row: 0, col: 1 }));
    assert_eq!(matrix.col_count(), 2);
}

#[rstest]
#[case(20, MatrixMode::Natural, 5, 15)]
#[case(19, MatrixMode::Square, 9, 9)]
#[case(18, MatrixMode::Square, 9, 9)]
fn test_sixty_eight_keys(
    #[case] available: usize,
    #[case] mode: MatrixMode,
    #[case] rows: usize,
    #[case] cols: usize,
) {
    let layout = common::sixty_eight_keys();
    let matrix = MatrixAllocator::allocate(&layout, available).unwrap();
    assert_eq!(matrix.mode(), mode);
    assert_eq!(matrix.row_count(), rows);
    assert_eq!(matrix.col_count(), cols);
    assert!(matrix.pins_required() <= available);
}

#[rstest]
#[case(10)]
#[case(17)]
fn test_square_that_does_not_fit_is_a_capacity_error(#[case] available: usize) {
    let layout = common::sixty_eight_keys();
    let err = MatrixAllocator::allocate(&layout, available).unwrap_err();
    match err {
        KeyCadError::Capacity {
            rows,
            cols,
            available: a,
            ..
        } => {
            assert_eq!((rows, cols), (9, 9));
            assert_eq!(a, available);
        }
        other => panic!("expected capacity error, got {:?}", other),
    }
}

#[test]
fn test_square_fill_is_row_major() {
    let layout = common::sixty_eight_keys();
    let matrix = MatrixAllocator::allocate(&layout, 18).unwrap();
    assert_eq!(matrix.position_of(0), Some(MatrixPosition { row: 0, col: 0 }));
    assert_eq!(matrix.position_of(9), Some(MatrixPosition { row: 1, col: 0 }));
    assert_eq!(matrix.position_of(67), Some(MatrixPosition { row: 7, col: 4 }));
    // 68 keys leave the ninth row empty
    assert_eq!(matrix.active_rows().len(), 8);
    assert_eq!(matrix.active_cols().len(), 9);
    assert_eq!(matrix.pins_required(), 17);
}

#[test]
fn test_jd40_natural_dimensions() {
    let layout = common::jd40();
    let matrix = MatrixAllocator::allocate(&layout, 28).unwrap();
    assert_eq!(matrix.mode(), MatrixMode::Natural);
    assert_eq!((matrix.row_count(), matrix.col_count()), (4, 12));
    // Bottom row only reaches column 5
    assert_eq!(matrix.cell(3, 5), Some(39));
    assert_eq!(matrix.cell(3, 6), None);
    assert_eq!(matrix.cell(1, 11), None);
}

#[test]
fn test_empty_layout_allocates_nothing() {
    let layout = parse_kle_json("[]").unwrap();
    let matrix = MatrixAllocator::allocate(&layout, 18).unwrap();
    assert_eq!(matrix.key_count(), 0);
    assert_eq!(matrix.pins_required(), 0);
}
