//! Console output utilities.

use chrono::{DateTime, Utc};
use console::{style, Term};

use crate::api::Creator;
use crate::error::{Error, Result};

/// Print an info message.
pub fn print_info(message: &str) {
    println!("{} {}", style("INFO").cyan().bold(), message);
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", style("OK").green().bold(), message);
}

/// Print a warning message.
pub fn print_warning(message: &str) {
    println!("{} {}", style("WARN").yellow().bold(), message);
}

/// Print an error message.
pub fn print_error(message: &str) {
    eprintln!("{} {}", style("ERROR").red().bold(), message);
}

/// Print the application banner.
pub fn print_banner() {
    let banner = r#"
╔═══════════════════════════════════════════════════════╗
║     Party Downloader                                  ║
║     Mirror kemono / coomer creators to disk           ║
╚═══════════════════════════════════════════════════════╝
"#;
    println!("{}", style(banner).cyan());
}

/// Print what a pull is about to do.
pub fn print_pull_summary(creator: &Creator, site: &str, directory: &str, workers: usize) {
    println!();
    println!("{}", style("Pull:").bold());
    println!("  Creator:   {} ({}/{})", creator.name, creator.service, creator.id);
    println!("  Site:      {}", site);
    println!("  Directory: {}", directory);
    println!("  Workers:   {}", workers);
    println!();
}

const TABLE_HEADERS: [&str; 6] = ["INDEX", "NAME", "ID", "SERVICE", "UPDATED", "INDEXED"];

fn format_timestamp(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Render creators as an aligned table, numbered for selection.
pub fn creator_table(creators: &[Creator]) -> String {
    let rows: Vec<[String; 6]> = creators
        .iter()
        .enumerate()
        .map(|(index, c)| {
            [
                index.to_string(),
                c.name.clone(),
                c.id.clone(),
                c.service.clone(),
                format_timestamp(c.updated),
                format_timestamp(c.indexed),
            ]
        })
        .collect();

    let mut widths = TABLE_HEADERS.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let render = |cells: &[&str]| {
        let line: Vec<String> = cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect();
        format!("{}\n", line.join("  ").trim_end())
    };

    let mut out = render(&TABLE_HEADERS);
    for row in &rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        out.push_str(&render(&cells));
    }
    out
}

/// Ask for a row of a table with `count` rows.
pub fn prompt_selection(count: usize) -> Result<usize> {
    let term = Term::stdout();
    term.write_str("Index selection: ")?;
    let input = term.read_line()?;
    parse_selection(&input, count)
}

/// Parse a typed row index, rejecting anything outside `0..count`.
pub fn parse_selection(input: &str, count: usize) -> Result<usize> {
    match input.trim().parse::<usize>() {
        Ok(index) if index < count => Ok(index),
        _ => Err(Error::ConfigValidation {
            field: "selection".to_string(),
            message: format!(
                "'{}' is not an index between 0 and {}",
                input.trim(),
                count.saturating_sub(1)
            ),
        }),
    }
}

/// Print the creators matching a search.
pub fn print_creators(creators: &[Creator]) {
    if creators.is_empty() {
        print_warning("No creators matched");
        return;
    }
    print!("{}", creator_table(creators));
    println!("{}", style(format!("{} creators", creators.len())).dim());
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_creator_table_alignment() {
        let mut alpha = Creator::new("12345", "alpha", "patreon");
        alpha.updated = Utc.timestamp_opt(1_600_000_000, 0).single();
        let creators = vec![alpha, Creator::new("7", "beta", "fanbox")];

        let table = creator_table(&creators);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "INDEX  NAME   ID     SERVICE  UPDATED              INDEXED"
        );
        assert_eq!(
            lines[1],
            "0      alpha  12345  patreon  2020-09-13 12:26:40  -"
        );
        assert_eq!(
            lines[2],
            "1      beta   7      fanbox   -                    -"
        );
    }

    #[test]
    fn test_parse_selection() {
        assert_eq!(parse_selection(" 2\n", 3).unwrap(), 2);
        assert!(parse_selection("3", 3).is_err());
        assert!(parse_selection("two", 3).is_err());
        assert!(parse_selection("", 0).is_err());
    }
}
