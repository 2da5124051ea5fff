//! Grid shorthand parsing ("RxC").

use weft_utils::{Result, WeftError};

/// A rows-by-columns grid request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    pub rows: usize,
    pub columns: usize,
}

impl Grid {
    /// Parse "2x3" (also accepts "2X3" and surrounding whitespace).
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let (rows, columns) = trimmed
            .split_once(['x', 'X'])
            .ok_or_else(|| WeftError::layout(format!("invalid grid {:?}", input)))?;
        let rows: usize = rows
            .trim()
            .parse()
            .map_err(|_| WeftError::layout(format!("invalid grid rows in {:?}", input)))?;
        let columns: usize = columns
            .trim()
            .parse()
            .map_err(|_| WeftError::layout(format!("invalid grid columns in {:?}", input)))?;
        if rows == 0 || columns == 0 {
            return Err(WeftError::layout(format!("grid {:?} has a zero side", input)));
        }
        Ok(Self { rows, columns })
    }

    /// Number of panes the grid holds.
    pub fn panes(&self) -> usize {
        self.rows * self.columns
    }
}

impl std::str::FromStr for Grid {
    type Err = WeftError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Display for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.rows, self.columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Grid Parsing Tests ====================

    #[test]
    fn test_parse_basic() {
        let grid = Grid::parse("2x3").unwrap();
        assert_eq!(grid.rows, 2);
        assert_eq!(grid.columns, 3);
        assert_eq!(grid.panes(), 6);
    }

    #[test]
    fn test_parse_tolerates_case_and_whitespace() {
        assert_eq!(Grid::parse(" 1X4 ").unwrap(), Grid { rows: 1, columns: 4 });
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(Grid::parse("").is_err());
        assert!(Grid::parse("2").is_err());
        assert!(Grid::parse("ax2").is_err());
        assert!(Grid::parse("2x").is_err());
    }

    #[test]
    fn test_parse_rejects_zero_sides() {
        assert!(Grid::parse("0x2").is_err());
        assert!(Grid::parse("2x0").is_err());
    }

    #[test]
    fn test_display_round_trips() {
        let grid = Grid::parse("3x2").unwrap();
        assert_eq!(grid.to_string().parse::<Grid>().unwrap(), grid);
    }
}
