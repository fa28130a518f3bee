//! Matrix text format.
//!
//! Matrices arrive as plain text: one row per line, values separated by
//! whitespace. Blank lines are ignored so trailing newlines and padded
//! files parse cleanly.

use crate::block::Block;
use crate::error::{BlockError, BlockResult};

/// Parse a whitespace-separated matrix into a square [`Block`].
pub fn parse_matrix(text: &str) -> BlockResult<Block> {
    let mut rows: Vec<Vec<f64>> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let row = line
            .split_whitespace()
            .map(|tok| {
                tok.parse::<f64>().map_err(|_| BlockError::BadNumber {
                    row: rows.len(),
                    value: tok.to_string(),
                })
            })
            .collect::<BlockResult<Vec<f64>>>()?;
        rows.push(row);
    }
    Block::from_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_square_matrix() {
        let b = parse_matrix("1 2\n3 4\n").unwrap();
        assert_eq!(b.dim(), 2);
        assert_eq!(b.get(0, 1), 2.0);
        assert_eq!(b.get(1, 1), 4.0);
    }

    #[test]
    fn tolerates_blank_lines_and_extra_whitespace() {
        let b = parse_matrix("\n  1\t2 \n\n 3  4\n\n").unwrap();
        assert_eq!(b.rows(), vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    }

    #[test]
    fn parses_negative_and_fractional_values() {
        let b = parse_matrix("-1.5 0.25\n2e3 -0\n").unwrap();
        assert_eq!(b.get(0, 0), -1.5);
        assert_eq!(b.get(1, 0), 2000.0);
    }

    #[test]
    fn rejects_empty_input() {
        assert_eq!(parse_matrix("\n  \n"), Err(BlockError::Empty));
    }

    #[test]
    fn rejects_non_numeric_value() {
        let err = parse_matrix("1 2\n3 x\n").unwrap_err();
        assert_eq!(
            err,
            BlockError::BadNumber {
                row: 1,
                value: "x".to_string()
            }
        );
    }

    #[test]
    fn rejects_non_square() {
        let err = parse_matrix("1 2 3\n4 5 6\n").unwrap_err();
        assert_eq!(err, BlockError::NotSquare { rows: 2, cols: 3 });
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = parse_matrix("1 2\n3\n").unwrap_err();
        assert!(matches!(err, BlockError::RaggedRow { .. }));
    }
}
