use crate::demo::{run_demo, run_evaluate, DemoArgs, EvaluateArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use delay_guard::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "DelayGuard",
    about = "Detect delayed Shopify orders and queue customer or merchant alerts",
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
    /// Evaluate every order in a CSV export and print the batch report
    Evaluate(EvaluateArgs),
    /// Walk through warehouse, carrier and transit delays with sample orders
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
    /// Order export that seeds the scheduled refresh loop
    #[arg(long)]
    pub(crate) orders: Option<PathBuf>,
    /// JSON object mapping tracking numbers to carrier snapshots
    #[arg(long)]
    pub(crate) tracking: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Evaluate(args) => run_evaluate(args),
        Command::Demo(args) => run_demo(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluate_requires_orders_path() {
        assert!(Cli::try_parse_from(["delay-guard", "evaluate"]).is_err());

        let cli = Cli::try_parse_from([
            "delay-guard",
            "evaluate",
            "--orders",
            "orders.csv",
            "--now",
            "2025-10-20",
        ])
        .expect("arguments parse");
        match cli.command {
            Some(Command::Evaluate(args)) => {
                assert_eq!(args.orders, PathBuf::from("orders.csv"));
                assert!(args.now.is_some());
            }
            other => panic!("expected evaluate, got {other:?}"),
        }
    }

    #[test]
    fn serve_accepts_tracking_snapshots() {
        let cli = Cli::try_parse_from([
            "delay-guard",
            "serve",
            "--orders",
            "orders.csv",
            "--tracking",
            "snapshots.json",
        ])
        .expect("arguments parse");
        match cli.command {
            Some(Command::Serve(args)) => {
                assert_eq!(args.tracking, Some(PathBuf::from("snapshots.json")));
                assert_eq!(args.orders, Some(PathBuf::from("orders.csv")));
            }
            other => panic!("expected serve, got {other:?}"),
        }
    }

    #[test]
    fn missing_subcommand_defaults_to_serve() {
        let cli = Cli::try_parse_from(["delay-guard"]).expect("arguments parse");
        assert!(cli.command.is_none());
    }
}
