//! Console tables
//!
//! Layout and property dumps are scraped by other tools, so the table format
//! is fixed: left aligned cells, `|` column separators and `+---+` borders
//! around the header and at the bottom. Cells may span several lines.

use comfy_table::{ContentArrangement, Table};

/// Outer borders and the header separator, without lines between rows
const BORDERS: &str = "||--+-++|    ++++++";

/// Create a table with the given column headers
pub fn table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(BORDERS)
        .set_content_arrangement(ContentArrangement::Disabled)
        .set_header(headers.to_vec());
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        let mut table = table(&["Section offset", "Section name", "Section size"]);
        table.add_row(vec!["0x0", "boot", "0x100"]);
        table.add_row(vec!["0x100", "filesystem", "0x7f00"]);

        let expected = "\
+----------------+--------------+--------------+
| Section offset | Section name | Section size |
+----------------+--------------+--------------+
| 0x0            | boot         | 0x100        |
| 0x100          | filesystem   | 0x7f00       |
+----------------+--------------+--------------+";
        assert_eq!(table.to_string(), expected);
    }

    #[test]
    fn test_multiline_cell() {
        let mut table = table(&["Name", "Content"]);
        table.add_row(vec!["fs", "a.bin\nlonger.bin"]);

        let expected = "\
+------+------------+
| Name | Content    |
+------+------------+
| fs   | a.bin      |
|      | longer.bin |
+------+------------+";
        assert_eq!(table.to_string(), expected);
    }
}
