use crate::assess::{run_assess, run_batch, AssessArgs, BatchArgs};
use crate::demo::{run_demo, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use vendor_risk::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Vendor Risk Engine",
    about = "Assess vendor onboarding risk over HTTP or from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Assess a single vendor with the configured signal producers
    Assess(AssessArgs),
    /// Assess every vendor row in a CSV export
    Batch(BatchArgs),
    /// Walk through canned scenarios with fixed signal producers
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Assess(args) => run_assess(args).await,
        Command::Batch(args) => run_batch(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}
