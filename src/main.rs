use clap::Parser;
use create_codepush_app::cli::{error_line, Cli};
use create_codepush_app::commands;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = commands::create::execute(cli).await {
        eprintln!("{}", error_line(&e));
        std::process::exit(1);
    }
}
