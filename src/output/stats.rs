//! Statistics reporting.

use console::style;

use crate::download::{DownloadTally, PullSummary, TransferStatus};
use crate::output::console::{print_success, print_warning};

/// Print per-status counts for a run.
pub fn print_tally(tally: &DownloadTally) {
    println!();
    println!("{}", style("Results:").bold());
    for (status, count) in tally.entries() {
        let count = match status {
            TransferStatus::Success => style(count).green(),
            s if s.is_failure() => style(count).red(),
            _ => style(count).yellow(),
        };
        println!("  {:<18} {}", format!("{}:", status), count);
    }
    println!("  {:<18} {}", "total:", tally.total());

    for (status, count) in tally.entries() {
        tracing::info!("{}: {}", status, count);
    }
}

/// Print the outcome of a pull, including throttle backoff.
pub fn print_pull_stats(summary: &PullSummary) {
    println!();
    println!(
        "{}",
        style(format!(
            "{} posts, {} files in {}",
            summary.posts,
            summary.attachments,
            summary.directory.display()
        ))
        .bold()
    );

    let batches = summary.report.batches.len();
    if batches > 1 {
        println!(
            "  Throttled: {} batches, finished at {} workers",
            style(batches).yellow(),
            summary.report.final_ceiling
        );
    }
    let tally = summary.report.tally();
    print_tally(&tally);

    println!();
    match tally.failures() {
        0 => print_success("Pull complete"),
        n => print_warning(&format!("{} files failed; run again to retry them", n)),
    }
}

/// Print counts from the `details` subcommand.
pub fn print_details(name: &str, posts: usize, attachments: usize, files: usize) {
    println!();
    println!("{}", style(format!("Details for {}:", name)).bold());
    println!("  Posts:       {}", posts);
    println!("  Attachments: {}", attachments);
    println!("  Files:       {}", files);
}
