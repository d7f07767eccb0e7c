use std::env;
use std::process::ExitCode;

use env_logger::Builder;

use kvstored::{bootstrap, config::Config, net::Server};

fn main() -> ExitCode {
    Builder::new()
        .parse_filters(&env::var("KVSTORED_LOG").unwrap_or_else(|_| "info".to_owned()))
        .init();

    let cfg = Config::from_env_and_args(env::args());
    log::info!("starting kvstored on {}", cfg.addr);

    let listener = match bootstrap::listen(cfg.addr) {
        Ok(l) => l,
        Err(e) => {
            log::error!("failed to bind {}: {e}", cfg.addr);
            return ExitCode::FAILURE;
        }
    };

    let mut server = match Server::new(listener) {
        Ok(s) => s,
        Err(e) => {
            log::error!("failed to start event loop: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = server.run() {
        log::error!("event loop exited with error: {e}");
        return ExitCode::FAILURE;
    }

    log::info!("stopped accepting connections, exiting");
    ExitCode::SUCCESS
}
