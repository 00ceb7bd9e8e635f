use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

/// Display width of a cell. Issue summaries carry accented letters, so
/// count chars rather than bytes.
fn width(cell: &str) -> usize {
    cell.chars().count()
}

fn pad(cell: &str, to: usize) -> String {
    let mut out = cell.to_string();
    out.extend(std::iter::repeat(' ').take(to.saturating_sub(width(cell))));
    out
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| width(h)).collect();
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(width(cell));
        }
    }

    let header: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, &w)| pad(h, w))
        .collect();
    println!("{}", header.join("  ").trim_end());
    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("  "));

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| pad(cell, widths.get(i).copied().unwrap_or(0)))
            .collect();
        println!("{}", cells.join("  ").trim_end());
    }
}

/// `-` for absent values in table cells.
pub fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}
