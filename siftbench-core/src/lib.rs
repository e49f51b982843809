pub mod classify;
pub mod compare;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod report;

use colored::Colorize;

pub use classify::{FailureClass, TopFailures, top_failures};
pub use compare::{
    Comparison, ComparisonRow, Invocation, PipelineFailure, PipelineSpec, RowBody, RowMetrics,
};
pub use config::{ComparisonConfig, PipelineEntry};
pub use error::BenchError;
pub use pipeline::{PipelineConfig, PipelineReport, PipelineRunner};
pub use report::ReportFormat;

const BANNER: &str = r#"
     _  __ _   _                     _
 ___(_)/ _| |_| |__   ___ _ __   ___| |__
/ __| | |_| __| '_ \ / _ \ '_ \ / __| '_ \
\__ \ |  _| |_| |_) |  __/ | | | (__| | | |
|___/_|_|  \__|_.__/ \___|_| |_|\___|_| |_|
"#;

/// Banner goes to stderr so stdout stays machine readable.
pub fn print_banner() {
    eprintln!("{}", BANNER.bright_cyan());
    eprintln!(
        "    {} {}\n",
        "crawl-and-extract benchmark".dimmed(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
