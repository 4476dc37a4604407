use log::{error, info};
use service::{config::Config, logging::Logger, AppState};

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config);

    info!(
        "Starting long-poll server [{}] in {} mode",
        env!("CARGO_PKG_VERSION"),
        config.runtime_env()
    );

    let sweep_interval = config.sweep_interval();
    let app_state = AppState::new(config);
    let _queue_sweeper = app_state.longpoll_manager.spawn_sweeper(sweep_interval);
    let _session_sweeper = app_state.sessions.spawn_sweeper(sweep_interval);

    if let Err(e) = web::init_server(app_state).await {
        error!("Server stopped: {e}");
        std::process::exit(1);
    }
}
