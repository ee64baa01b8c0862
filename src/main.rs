use log::info;
use std::fs;
use std::path::Path;
use std::time::Duration;

use actix::Actor;
use actix_web::{App, HttpServer, web};
use tokio::sync::broadcast;

use reaction_game::{
    AppConfig, AppState, GameController, MonotonicClock, RandomDelay, ReactionGame, Shutdown,
    open_port,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("REACTION_GAME_CONFIG").ok());
    let config = AppConfig::load(config_path.as_deref())
        .unwrap_or_else(|e| panic!("Failed to load config: {e}"));

    let delays = RandomDelay::from_config(&config.game)
        .unwrap_or_else(|e| panic!("Failed to configure delays: {e}"));
    let game = ReactionGame::new(
        open_port(&config.gpio),
        Box::new(MonotonicClock::new()),
        Box::new(delays),
    );

    let (events, _) = broadcast::channel(config.broadcast_capacity);
    let controller = GameController::new(
        game,
        config.gpio.clone(),
        config.game.poll_interval(),
        events.clone(),
    )
    .start();
    let app_state = AppState {
        controller: controller.clone(),
        events,
    };

    let http_cfg = config.http.clone();
    let mut server = HttpServer::new(move || {
        let scope_path = http_cfg.path.clone();
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .service(app_state.api_scope(&scope_path))
    })
    .client_request_timeout(Duration::from_secs(config.http.timeout));

    // validation guarantees at least one listener
    let mut listeners = Vec::new();
    if let Some(socket_path) = &config.http.unix_socket {
        remove_stale_socket(socket_path)?;
        server = server.bind_uds(socket_path)?;
        listeners.push(socket_path.as_str());
    }
    if let Some(host) = &config.http.host {
        server = server.bind_auto_h2c(host)?;
        listeners.push(host.as_str());
    }

    info!("Starting server on {}...", listeners.join(" and "));

    let result = server.run().await;
    let _ = controller.send(Shutdown).await;
    result
}

fn remove_stale_socket(socket_path: &str) -> std::io::Result<()> {
    if Path::new(socket_path).exists() {
        fs::remove_file(socket_path)?;
    }
    Ok(())
}
