//! HTML rendering of a decoded worksheet

use crate::spreadsheet::grid::CellGrid;

/// Escapes text for use in HTML element content and quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Renders every row of the grid as `<table class="excel">`.
///
/// Rows are padded to the widest row so the table stays rectangular, and numeric cells are
/// right-aligned.
pub fn render_table(grid: &CellGrid) -> String {
    let width = grid.column_count();
    let mut html = String::from("<table class=\"excel\">\n");
    for row in grid.rows() {
        html.push_str("<tr>");
        for col in 0..width {
            let text = row.get(col).and_then(|cell| cell.as_deref()).unwrap_or("");
            html.push_str(if is_numeric(text) { "<td align=\"right\">" } else { "<td>" });
            html.push_str(&escape_html(text));
            html.push_str("</td>");
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</table>");
    html
}

fn is_numeric(text: &str) -> bool {
    !text.is_empty() && text.parse::<f64>().is_ok_and(f64::is_finite)
}
