mod commands;
mod server;
mod terminal;

use commands::{CommandLine, Commands, ping, scan, send, serve, upload};
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let commands = CommandLine::parse_args();

    logging::init();
    print::banner();

    let cfg = commands.config();

    match commands.command {
        Commands::Scan => {
            print::header("getting ready for discovery");
            scan::scan(&cfg.scan).await
        }
        Commands::Send { command, skip_scan } => send::send(command, skip_scan, &cfg).await,
        Commands::Ping { skip_scan } => ping::ping(skip_scan, &cfg).await,
        Commands::Upload { file } => upload::upload(&file, &cfg.upload).await,
        Commands::Serve {
            listen,
            static_dir,
            no_startup_scan,
        } => serve::serve(listen, static_dir, !no_startup_scan, &cfg).await,
    }
}
