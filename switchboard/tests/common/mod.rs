#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use switchboard::{
    Connection, Distributor, InboundMessage, Request, Response, ServerRouter,
    SharedRouteHandler, Verb, handler,
    testing::RecordingConnection,
};

// ============================================================================
// Fleet Setup
// ============================================================================

/// Build a server process sharing `store` with the rest of the fleet.
pub async fn server(id: &str, store: Arc<dyn Distributor>) -> ServerRouter {
    ServerRouter::builder()
        .server_id(id)
        .distributor(store)
        .build()
        .await
        .expect("router builds")
}

/// A recording connection plus the handle the router keeps.
pub fn connection(id: &str) -> (RecordingConnection, Arc<dyn Connection>) {
    let recording = RecordingConnection::new(id);
    let shared: Arc<dyn Connection> = Arc::new(recording.clone());
    (recording, shared)
}

/// A request with a correlation id.
pub fn request(verb: Verb, path: &str) -> InboundMessage {
    InboundMessage::new(verb, path).with_request_id(format!("req-{path}"))
}

// ============================================================================
// Test Handlers
// ============================================================================

pub type Log = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Records `name` plus the `id` parameter, if any.
pub fn logging(log: &Log, name: &'static str) -> SharedRouteHandler {
    let log = Arc::clone(log);
    handler(move |req: Request, _res: Response| {
        let entry = match req.param("id") {
            Some(id) => format!("{name}:{id}"),
            None => name.to_owned(),
        };
        log.lock().unwrap().push(entry);
        async { Ok(()) }
    })
}

/// Joins the origin connection to the group named by the `id` parameter.
pub fn join_param() -> SharedRouteHandler {
    handler(|req: Request, res: Response| async move {
        let group = req.param("id").unwrap_or_default().to_owned();
        res.join_group(&group).await?;
        Ok(())
    })
}
