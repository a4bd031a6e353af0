use anyhow::{Context, Result};
use clap::Parser;
use tracing::Level;

use gridify::{
    Backend, Cli, Config, Gridify, ImageToolkit, MagickToolkit, NativeToolkit, NeuralStyle,
    ProcessRunner,
};

async fn execute<T: ImageToolkit>(
    toolkit: T,
    runner: ProcessRunner,
    config: Config,
) -> Result<()> {
    let transfer = NeuralStyle::new(runner, &config.neural_style_dir);
    let input = config.input.display().to_string();
    Gridify::new(toolkit, transfer, config)
        .run()
        .await
        .with_context(|| format!("Failed to gridify {}", input))?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_cli(cli).context("Invalid configuration")?;
    let runner = ProcessRunner::new(config.verbose);

    match config.backend {
        Backend::Magick => execute(MagickToolkit::new(runner), runner, config).await,
        Backend::Native => execute(NativeToolkit::new(), runner, config).await,
    }
}
