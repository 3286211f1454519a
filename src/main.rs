use clap::Parser;
use log::error;

use upload_tracker::app::cli;
use upload_tracker::config::Config;
use upload_tracker::manager::TaskManager;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    let manager = match TaskManager::new(&config) {
        Ok(manager) => manager,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = cli::run_cli(manager, config.max_upload_bytes) {
        error!("{}", e);
        std::process::exit(1);
    }
}
