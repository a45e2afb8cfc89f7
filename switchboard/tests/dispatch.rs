//! Dispatch semantics shared by both router sides.

mod common;

use common::{connection, entries, logging, new_log, request, server};
use serde_json::Value;
use std::sync::Arc;
use switchboard::{
    ApiError, BoxError, DispatchStatus, HandlerError, Receiver, Request, Response, RouteError,
    ServerRouter, SwitchboardError, Verb, adapters::MemoryDistributor, handler, handlers,
    receive_handler, status,
};

#[tokio::test]
async fn overlapping_routes_all_fire_in_registration_order() {
    let router = server("p1", Arc::new(MemoryDistributor::new())).await;
    let log = new_log();
    router
        .get("/rooms/:id", [logging(&log, "r1-a"), logging(&log, "r1-b")])
        .unwrap();
    router.get("/rooms/*rest", [logging(&log, "r2")]).unwrap();
    router.get("/users/:id", [logging(&log, "other")]).unwrap();

    let (_, conn) = connection("c1");
    let outcome = router.dispatch(request(Verb::Get, "/rooms/42"), conn).await;

    assert_eq!(entries(&log), ["r1-a:42", "r1-b:42", "r2"]);
    assert_eq!(outcome.routes_matched, 2);
    assert_eq!(outcome.handlers_run, 3);
}

#[tokio::test]
async fn verbs_have_separate_tables() {
    let router = server("p1", Arc::new(MemoryDistributor::new())).await;
    let log = new_log();
    router.post("/x", [logging(&log, "post")]).unwrap();
    router.delete("/x", [logging(&log, "delete")]).unwrap();

    let (_, conn) = connection("c1");
    router.dispatch(request(Verb::Delete, "/x"), conn).await;

    assert_eq!(entries(&log), ["delete"]);
}

#[tokio::test]
async fn replies_never_reach_handlers() {
    let router = server("p1", Arc::new(MemoryDistributor::new())).await;
    let log = new_log();
    router.get("/x", [logging(&log, "a")]).unwrap();

    let (_, conn) = connection("c1");
    let reply = request(Verb::Get, "/x").responding_to("req-earlier");
    let outcome = router.dispatch(reply, conn).await;

    assert_eq!(outcome.status, DispatchStatus::Ignored);
    assert!(entries(&log).is_empty());
}

#[tokio::test]
async fn params_are_percent_decoded() {
    let router = server("p1", Arc::new(MemoryDistributor::new())).await;
    let log = new_log();
    router.get("/rooms/:id", [logging(&log, "room")]).unwrap();

    let (_, conn) = connection("c1");
    router
        .dispatch(request(Verb::Get, "/rooms/caf%C3%A9%20bar"), conn)
        .await;

    assert_eq!(entries(&log), ["room:café bar"]);
}

#[tokio::test]
async fn literal_segments_ignore_case_and_queries_never_match() {
    let router = server("p1", Arc::new(MemoryDistributor::new())).await;
    let log = new_log();
    router.get("/rooms/:id", [logging(&log, "room")]).unwrap();

    let (_, conn) = connection("c1");
    let upper = router
        .dispatch(request(Verb::Get, "/ROOMS/Lobby"), conn.clone())
        .await;
    let query = router
        .dispatch(request(Verb::Get, "/rooms/42?x=1"), conn)
        .await;

    assert_eq!(upper.routes_matched, 1);
    assert_eq!(query.routes_matched, 0);
    assert_eq!(entries(&log), ["room:Lobby"]);
}

#[tokio::test]
async fn setup_errors_share_one_type() {
    async fn setup(pattern: &str) -> Result<ServerRouter, SwitchboardError> {
        let router = ServerRouter::builder()
            .server_id("p1")
            .distributor(Arc::new(MemoryDistributor::new()))
            .build()
            .await?;
        router.get(pattern, handlers![])?;
        Ok(router)
    }

    assert!(setup("/rooms/:id").await.is_ok());
    let err = setup("/files/*path/tail").await.unwrap_err();
    assert!(matches!(err, SwitchboardError::Route(RouteError::InvalidPattern { .. })));
}

#[tokio::test]
async fn invalid_patterns_fail_at_registration() {
    let router = server("p1", Arc::new(MemoryDistributor::new())).await;
    let err = router.get("/files/*path/tail", handlers![]).unwrap_err();
    assert!(matches!(err, RouteError::InvalidPattern { .. }));
}

#[tokio::test]
async fn application_error_replies_with_status_and_aborts_later_routes() {
    let router = server("p1", Arc::new(MemoryDistributor::new())).await;
    let log = new_log();
    router
        .post(
            "/rooms/:id",
            [handler(|req: Request, _res: Response| async move {
                match req.param("id") {
                    Some("locked") => Err(HandlerError::from(ApiError::forbidden("room is locked"))),
                    _ => Ok(()),
                }
            })],
        )
        .unwrap();
    router.post("/rooms/:id", [logging(&log, "later")]).unwrap();

    let (origin, conn) = connection("c1");
    let outcome = router
        .dispatch(request(Verb::Post, "/rooms/locked"), conn)
        .await;

    assert_eq!(outcome.status, DispatchStatus::Aborted);
    assert!(entries(&log).is_empty());
    let reply = &origin.messages()[0];
    assert_eq!(reply["status"], status::FORBIDDEN);
    assert_eq!(reply["data"], "room is locked");
    assert_eq!(reply["respondingMessageId"], "req-/rooms/locked");
}

#[tokio::test]
async fn unexpected_error_replies_500_without_body() {
    let router = server("p1", Arc::new(MemoryDistributor::new())).await;
    router
        .put(
            "/doc",
            handlers![|req: Request, _res: Response| async move {
                let _: u32 = serde_json::from_value(req.data().clone())?;
                Ok(())
            }],
        )
        .unwrap();

    let (origin, conn) = connection("c1");
    router
        .dispatch(request(Verb::Put, "/doc").with_data("not a number"), conn)
        .await;

    let reply = &origin.messages()[0];
    assert_eq!(reply["status"], status::INTERNAL_SERVER_ERROR);
    assert_eq!(reply["data"], Value::Null);
}

#[tokio::test]
async fn second_status_on_the_same_reply_fails() {
    let router = server("p1", Arc::new(MemoryDistributor::new())).await;
    let outcomes = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&outcomes);
    router
        .get(
            "/x",
            [handler(move |_req: Request, res: Response| {
                let first = res.status(status::OK).is_ok();
                let second = res.status(status::NOT_FOUND).is_ok();
                sink.lock().unwrap().push((first, second));
                async { Ok(()) }
            })],
        )
        .unwrap();

    let (_, conn) = connection("c1");
    router.dispatch(request(Verb::Get, "/x"), conn).await;

    assert_eq!(*outcomes.lock().unwrap(), [(true, false)]);
}

#[tokio::test]
async fn clear_chain_removes_exactly_the_chained_routes() {
    let router = server("p1", Arc::new(MemoryDistributor::new())).await;
    let log = new_log();

    router.get("/feed", [logging(&log, "before")]).unwrap();
    router.start_chain("session");
    router.get("/feed", [logging(&log, "chained")]).unwrap();
    router.patch("/profile", [logging(&log, "chained-patch")]).unwrap();
    router.end_chain();
    router.get("/feed", [logging(&log, "after")]).unwrap();

    assert_eq!(router.clear_chain("session"), 2);
    assert_eq!(router.route_count(Verb::Patch), 0);
    assert_eq!(router.clear_chain("session"), 0);

    let (_, conn) = connection("c1");
    router.dispatch(request(Verb::Get, "/feed"), conn).await;
    assert_eq!(entries(&log), ["before", "after"]);
}

#[tokio::test]
async fn receiver_swallows_errors_and_stops() {
    let log = new_log();
    let hook_log = Arc::clone(&log);
    let receiver = Receiver::new().with_error_hook(move |_message, err| {
        hook_log.lock().unwrap().push(format!("hook:{err}"));
    });
    let first = Arc::clone(&log);
    receiver
        .patch(
            "/presence/:id",
            [receive_handler(move |req: Request| {
                first.lock().unwrap().push(format!("first:{}", req.param("id").unwrap_or("")));
                async { Err::<(), BoxError>("stale view".into()) }
            })],
        )
        .unwrap();
    let second = Arc::clone(&log);
    receiver
        .patch(
            "/presence/:id",
            [receive_handler(move |_req: Request| {
                second.lock().unwrap().push("second".into());
                async { Ok(()) }
            })],
        )
        .unwrap();

    let frame = br#"{"verb":"PATCH","path":"/presence/c7","status":200}"#;
    let outcome = receiver.receive(frame).await.unwrap();

    assert_eq!(outcome.status, DispatchStatus::Aborted);
    assert_eq!(entries(&log), ["first:c7", "hook:stale view"]);
}
