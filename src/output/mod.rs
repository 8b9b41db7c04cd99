//! Output module for console output and progress.
//!
//! Provides:
//! - Colored console output
//! - Progress bars
//! - Outcome tallies

pub mod console;
pub mod progress;
pub mod stats;

pub use console::{
    creator_table, parse_selection, print_banner, print_creators, print_error, print_info,
    print_pull_summary, print_success, print_warning, prompt_selection,
};
pub use progress::{create_download_bar, create_item_bar, create_spinner, TransferProgress};
pub use stats::{print_details, print_pull_stats, print_tally};
