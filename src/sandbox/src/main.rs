use anyhow::Context;

use sandbox::cli::cli_main;

fn main() -> anyhow::Result<()> {
    cli_main().context("capsicum-sandbox failed")?;
    logger::debug!("capsicum-sandbox done");
    Ok(())
}
