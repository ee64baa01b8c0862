use log::warn;

use actix::{Addr, MailboxError};
use actix_web::{HttpRequest, HttpResponse, Responder, guard, http::Method, web};
use actix_ws::{Message, MessageStream, Session};
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use crate::controller::{GameController, GetHardware, GetView, React, Reset, Start};
use crate::error::AppError;
use crate::game::GameView;

#[derive(Clone)]
pub struct AppState {
    pub controller: Addr<GameController>,
    pub events: broadcast::Sender<GameView>,
}

async fn handle_view_websocket(
    mut session: Session,
    mut client_stream: MessageStream,
    rx: broadcast::Receiver<GameView>,
) {
    let mut views = BroadcastStream::new(rx);

    loop {
        tokio::select! {
            msg = client_stream.recv() => {
                let Some(msg) = msg else { break; };

                match msg {
                    Ok(Message::Ping(bytes)) => {
                        let _ = session.pong(&bytes).await;
                    }
                    Ok(Message::Close(reason)) => {
                        let _ = session.close(reason).await;
                        break;
                    }
                    Ok(Message::Text(_))
                    | Ok(Message::Binary(_))
                    | Ok(Message::Pong(_))
                    | Ok(Message::Continuation(_))
                    | Ok(Message::Nop) => {}
                    Err(_) => break,
                }
            }
            view = views.next() => {
                let Some(view) = view else { break; };

                match view {
                    Ok(view) => {
                        if let Ok(text) = serde_json::to_string(&view)
                            && session.text(text).await.is_err()
                        {
                            warn!("WebSocket client disconnected");
                            break;
                        }
                    }
                    // only the latest view matters, so skipped ones are dropped
                    Err(BroadcastStreamRecvError::Lagged(n)) => {
                        warn!("WebSocket client lagged by {n} views");
                    }
                }
            }
        }
    }
}

impl AppState {
    pub fn api_scope(&self, base_path: &str) -> actix_web::Scope {
        web::scope(base_path)
            .service(
                web::resource("/game")
                    .route(web::get().to(get_view))
                    .route(
                        web::route()
                            .guard(guard_not_methods(&[Method::GET]))
                            .to(method_not_allowed),
                    ),
            )
            .service(
                web::resource("/game/start")
                    .route(web::post().to(start_round))
                    .route(
                        web::route()
                            .guard(guard_not_methods(&[Method::POST]))
                            .to(method_not_allowed),
                    ),
            )
            .service(
                web::resource("/game/react")
                    .route(web::post().to(react))
                    .route(
                        web::route()
                            .guard(guard_not_methods(&[Method::POST]))
                            .to(method_not_allowed),
                    ),
            )
            .service(
                web::resource("/game/reset")
                    .route(web::post().to(reset))
                    .route(
                        web::route()
                            .guard(guard_not_methods(&[Method::POST]))
                            .to(method_not_allowed),
                    ),
            )
            .service(
                web::resource("/game/events")
                    .route(web::get().to(events_ws))
                    .route(
                        web::route()
                            .guard(guard_not_methods(&[Method::GET]))
                            .to(method_not_allowed),
                    ),
            )
            .service(
                web::resource("/hardware")
                    .route(web::get().to(hardware))
                    .route(
                        web::route()
                            .guard(guard_not_methods(&[Method::GET]))
                            .to(method_not_allowed),
                    ),
            )
    }
}

fn mailbox(e: MailboxError) -> AppError {
    AppError::Unavailable(format!("game controller: {e}"))
}

async fn get_view(state: web::Data<AppState>) -> Result<impl Responder, AppError> {
    let view = state.controller.send(GetView).await.map_err(mailbox)??;

    Ok(web::Json(view))
}

async fn start_round(state: web::Data<AppState>) -> Result<impl Responder, AppError> {
    let view = state.controller.send(Start).await.map_err(mailbox)??;

    Ok(web::Json(view))
}

async fn react(state: web::Data<AppState>) -> Result<impl Responder, AppError> {
    let view = state.controller.send(React).await.map_err(mailbox)??;

    Ok(web::Json(view))
}

async fn reset(state: web::Data<AppState>) -> Result<impl Responder, AppError> {
    let view = state.controller.send(Reset).await.map_err(mailbox)??;

    Ok(web::Json(view))
}

async fn hardware(state: web::Data<AppState>) -> Result<impl Responder, AppError> {
    let info = state.controller.send(GetHardware).await.map_err(mailbox)??;

    Ok(web::Json(info))
}

async fn events_ws(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let rx = state.events.subscribe();
    let (response, session, client_stream) = actix_ws::handle(&req, stream)
        .map_err(|e| AppError::InvalidState(format!("Websocket error: {e}")))?;

    actix_web::rt::spawn(async move {
        handle_view_websocket(session, client_stream, rx).await;
    });

    Ok(response)
}

async fn method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed().finish()
}

fn guard_not_methods(methods: &[Method]) -> impl guard::Guard {
    let allowed: Vec<Method> = methods.to_vec();
    guard::fn_guard(move |ctx| !allowed.iter().any(|m| m == ctx.head().method))
}
