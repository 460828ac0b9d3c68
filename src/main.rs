mod analysis;
mod app;
mod cli;
mod data;
mod error;
mod worker;

use anyhow::Result;

fn main() -> Result<()> {
    env_logger::init();
    cli::run()
}
