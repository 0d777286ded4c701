use std::io;
use std::process;
use tokio::task::LocalSet;

use coinview::{app, build_command, config::Config, rpc::run_command};

#[tokio::main]
async fn main() {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let matches = build_command().get_matches();

    let config = match Config::from_matches(&matches) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {}", err);
            process::exit(1);
        }
    };

    // With a command on the command line we only act as a client of a running node
    if let Some((method, params)) = config.rpc_command() {
        let code = run_command(&config.rpc, method, params, &mut io::stdout(), &mut io::stderr()).await;
        process::exit(code);
    }

    log::info!("Starting coinview on {}", config.network);
    let local = LocalSet::new();
    let result = local.run_until(app::run(config)).await;

    if let Err(e) = result {
        log::error!("Front-end stopped: {}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
