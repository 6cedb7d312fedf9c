//! Fixed-width row layout

use super::Column;

/// Truncate or pad `text` to exactly `width` characters
pub fn fit_cell(text: &str, width: usize) -> String {
    let mut out: String = text.chars().take(width).collect();
    let len = out.chars().count();
    out.extend(std::iter::repeat(' ').take(width - len));
    out
}

/// Join cells with single spaces; every column but the last is fitted to its
/// width, the last one is left untrimmed
pub(super) fn layout_row(columns: &[Column], cells: &[String]) -> String {
    let last = columns.len().saturating_sub(1);
    columns
        .iter()
        .zip(cells)
        .enumerate()
        .map(|(i, (column, cell))| {
            if i == last {
                cell.clone()
            } else {
                fit_cell(cell, column.width)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_cell() {
        assert_eq!(fit_cell("ab", 4), "ab  ");
        assert_eq!(fit_cell("abcdef", 4), "abcd");
        assert_eq!(fit_cell("", 2), "  ");
        assert_eq!(fit_cell("äöü", 2), "äö");
    }
}
