use crate::CLAP_STYLING;
use clap::{Arg, arg, command};
use url::Url;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("siftbench")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("siftbench")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner, progress and non-essential output").required(false))
        .arg(
            arg!(-v --"verbose" "Enable debug logging on stderr")
                .required(false)
                .conflicts_with("quiet"),
        )
        .subcommand_required(false)
        .subcommand(
            command!("pipeline")
                .about(
                    "Run a single extraction pipeline over a bounded crawl and print its JSON \
                report to stdout",
                )
                .arg(
                    arg!(-S --"strategy" <STRATEGY>)
                        .required(true)
                        .help("Extraction strategy: static, content or rendered")
                        .value_parser(["static", "content", "rendered"]),
                )
                .arg(
                    arg!(-n --"name" <NAME>)
                        .required(false)
                        .help("Pipeline name used in the report (default: the strategy's name)"),
                )
                .args(crawl_args()),
        )
        .subcommand(
            command!("compare")
                .about("Run every pipeline against the same site and write comparison reports")
                .arg(
                    arg!(-c --"config" <PATH>)
                        .required(false)
                        .help("JSON file listing the pipelines to run (default: the built-in three)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .args(crawl_args())
                .arg(
                    arg!(-o --"output-dir" <DIR>)
                        .required(false)
                        .help("Directory for comparison_report.{json,csv,html}")
                        .default_value("."),
                )
                .arg(
                    arg!(--"parallel")
                        .required(false)
                        .help("Run pipelines concurrently (report order is unchanged)")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"in-process")
                        .required(false)
                        .help("Run the built-in pipelines as tasks instead of child processes")
                        .action(clap::ArgAction::SetTrue)
                        .conflicts_with("config"),
                )
                .arg(
                    arg!(--"pipeline-timeout" <SECONDS>)
                        .required(false)
                        .help("Give up on a pipeline after this many seconds")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Summary printed to stdout: text, json, csv, html")
                        .value_parser(["text", "json", "csv", "html"])
                        .default_value("text"),
                ),
        )
        .subcommand(command!("strategies").about("List the available extraction strategies"))
}

fn crawl_args() -> Vec<Arg> {
    vec![
        arg!(-s --"seed" <URL>)
            .required(false)
            .help("Seed URL to start crawling from (repeatable)")
            .value_parser(clap::value_parser!(Url))
            .action(clap::ArgAction::Append),
        arg!(-H --"seeds-file" <PATH>)
            .required(false)
            .help("Path to a newline-delimited file of seed URLs")
            .value_parser(clap::value_parser!(std::path::PathBuf)),
        arg!(-a --"allow-host" <HOST>)
            .required(false)
            .help("Host the crawl may visit (repeatable, default: the seeds' hosts)")
            .action(clap::ArgAction::Append),
        arg!(--"suffix-hosts")
            .required(false)
            .help("Also allow subdomains of the allowed hosts")
            .action(clap::ArgAction::SetTrue),
        arg!(--"max-pages" <NUM>)
            .required(false)
            .help("Maximum number of pages to visit")
            .value_parser(clap::value_parser!(usize))
            .default_value("200"),
        arg!(--"max-depth" <NUM>)
            .required(false)
            .help("Maximum link depth from a seed")
            .value_parser(clap::value_parser!(usize))
            .default_value("2"),
        arg!(-t --"timeout" <SECONDS>)
            .required(false)
            .help("Per-request timeout in seconds")
            .value_parser(clap::value_parser!(u64).range(1..))
            .default_value("20"),
        arg!(--"sitemap")
            .required(false)
            .help("Add URLs discovered through robots.txt and sitemap.xml as extra seeds")
            .action(clap::ArgAction::SetTrue),
    ]
}
