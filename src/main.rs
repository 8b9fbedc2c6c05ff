use anyhow::Result;
use clap::Parser;
use fill_line::{app, config::Args};

fn main() -> Result<()> {
    app::run(Args::parse())
}
