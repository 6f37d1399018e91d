use crate::prelude::*;
use clap::Parser;

mod batch;
mod document;
mod error;
mod prelude;
mod settings;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Extract a title and an H1/H2/H3 outline from PDF documents"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// TOML file overriding the default thresholds
    #[clap(long, env = "PDFOUTLINE_CONFIG", global = true)]
    config: Option<std::path::PathBuf>,

    /// Whether to display additional information.
    #[clap(long, env = "PDFOUTLINE_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Process every PDF in a directory and write one JSON file per document
    Run(crate::batch::RunOptions),

    /// Process a single PDF and print its outline as JSON
    File(crate::document::FileOptions),

    /// Print font statistics and classification counts for a single PDF
    Stats(crate::document::StatsOptions),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::Run(options) => crate::batch::run(options, app.global).await,
        SubCommands::File(options) => crate::document::file(options, app.global).await,
        SubCommands::Stats(options) => crate::document::stats(options, app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
