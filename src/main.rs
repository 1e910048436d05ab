use log::error;
use timetable_engine::{GeneratorConfig, server};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::var("TIMETABLE_CONFIG") {
        Ok(path) => match GeneratorConfig::from_json_file(&path) {
            Ok(config) => config,
            Err(e) => {
                error!("{e}");
                std::process::exit(2);
            }
        },
        Err(_) => GeneratorConfig::default(),
    };
    let addr = std::env::var("TIMETABLE_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    if let Err(e) = server::run_server(&addr, config).await {
        error!("server stopped: {e}");
        std::process::exit(1);
    }
}
