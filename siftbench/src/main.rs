use commands::command_argument_builder;
use siftbench::handlers::{handle_compare, handle_pipeline, handle_strategies, init_tracing};
use siftbench_core::print_banner;

mod commands;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");
    let verbose = chosen_command.get_flag("verbose");

    // pipeline output is machine read, so it never gets the banner
    let is_pipeline = matches!(chosen_command.subcommand(), Some(("pipeline", _)));
    if !quiet && !is_pipeline {
        print_banner();
    }

    let exit_code = match chosen_command.subcommand() {
        None => return,
        Some(("pipeline", primary_command)) => {
            init_tracing(verbose, quiet, "warn");
            handle_pipeline(primary_command).await
        }
        Some(("compare", primary_command)) => {
            init_tracing(verbose, quiet, "info");
            handle_compare(primary_command, quiet).await
        }
        Some(("strategies", _)) => {
            handle_strategies();
            0
        }
        _ => unreachable!("clap should ensure we don't get here"),
    };

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
