//! stforge：从 JSON 设置与模板生成 Sublime Text 主题、配色与小部件

mod build;
mod bump;
mod cli;
mod commands;
mod config;
mod convert;
mod error;
mod init;
mod logging;
mod merge;
mod naming;
mod template;
mod utils;
mod watch;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    logging::init_logging(cli.verbose, cli.quiet);
    commands::run(cli)
}
