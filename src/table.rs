//! Plain-text rendering of tables for terminal report sections.

use std::fmt::Write as _;

use crate::frame::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// Renders a typed table: numeric columns right-aligned, the rest left.
pub fn render(table: &Table) -> String {
    let aligns = table
        .columns()
        .iter()
        .map(|c| {
            if c.datatype.is_numeric() {
                Align::Right
            } else {
                Align::Left
            }
        })
        .collect::<Vec<_>>();
    render_rows(&table.headers(), &table.display_rows(), &aligns)
}

pub fn render_rows(headers: &[String], rows: &[Vec<String>], aligns: &[Align]) -> String {
    let mut widths = headers.iter().map(|h| h.chars().count()).collect::<Vec<_>>();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(sanitize(cell).chars().count());
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_line(headers, &widths, aligns));
    let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_line(&rule, &widths, aligns));
    for row in rows {
        let _ = writeln!(output, "{}", format_line(row, &widths, aligns));
    }
    output
}

pub fn print(table: &Table) {
    print!("{}", render(table));
}

fn format_line(values: &[String], widths: &[usize], aligns: &[Align]) -> String {
    let line = values
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(idx, (value, width))| {
            let cell = sanitize(value);
            match aligns.get(idx).copied().unwrap_or(Align::Left) {
                Align::Left => format!("{cell:<width$}", width = *width),
                Align::Right => format!("{cell:>width$}", width = *width),
            }
        })
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

fn sanitize(value: &str) -> String {
    value.replace(['\n', '\r', '\t'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::{ColumnType, Value},
        frame::Column,
    };

    #[test]
    fn render_aligns_numbers_right() {
        let table = Table::from_rows(
            vec![
                Column::new("state", ColumnType::String),
                Column::new("revenue", ColumnType::Integer),
            ],
            vec![
                vec![Some(Value::String("CA".into())), Some(Value::Integer(5))],
                vec![Some(Value::String("NY".into())), Some(Value::Integer(1200))],
            ],
        )
        .expect("table");
        let rendered = render(&table);
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(
            lines,
            vec!["state  revenue", "-----  -------", "CA           5", "NY        1200"]
        );
    }

    #[test]
    fn render_rows_flattens_control_characters() {
        let rendered = render_rows(
            &["note".to_string()],
            &[vec!["a\nb\tc".to_string()]],
            &[Align::Left],
        );
        assert_eq!(rendered.lines().nth(2), Some("a b c"));
    }
}
