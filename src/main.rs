use clap::Parser;
use debt_dynamics::api::{Cli, Command, run_http_server, run_simulate_command};
use debt_dynamics::logger;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logger::init_cli_logger(cli.verbose);

    match cli.command {
        Command::Serve { port } => {
            if let Err(e) = run_http_server(port).await {
                tracing::error!("server error: {e}");
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Command::Simulate(args) => match run_simulate_command(&args) {
            Ok(json) => println!("{json}"),
            Err(msg) => {
                eprintln!("Error: {msg}");
                std::process::exit(1);
            }
        },
    }
}
