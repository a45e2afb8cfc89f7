//! Group and individual delivery across processes sharing one distributor.

mod common;

use bytes::Bytes;
use common::{connection, join_param, request, server};
use std::sync::Arc;
use switchboard::{
    Delivery, Distributor, Request, Response, Verb,
    adapters::MemoryDistributor,
    envelope, handlers,
    testing::{DistributorCall, RecordingDistributor},
};

#[tokio::test]
async fn group_reply_without_local_members_forwards_per_listed_process() {
    let store = RecordingDistributor::in_memory();
    for process in ["p2", "p3"] {
        store.add_list_item("group-servers:42", process).await.unwrap();
    }
    let router = server("p1", Arc::new(store.clone())).await;
    router
        .get(
            "/rooms/:id",
            handlers![|req: Request, res: Response| async move {
                let room = req.param("id").unwrap_or_default().to_owned();
                res.group(room).status(200)?.send("joined").await?;
                Ok(())
            }],
        )
        .unwrap();
    store.clear();

    let (origin, conn) = connection("c1");
    router.dispatch(request(Verb::Get, "/rooms/42"), conn).await;

    assert_eq!(origin.count(), 0);
    assert!(router.hub().groups().members("42").is_empty());
    for queue in ["server-messages:p2", "server-messages:p3"] {
        let frames = store.enqueued(queue);
        assert_eq!(frames.len(), 1, "{queue}");
        let forwarded = envelope::Envelope::decode(frames[0].clone()).unwrap();
        assert_eq!(forwarded.target, "42");
        let reply: serde_json::Value = serde_json::from_slice(&forwarded.payload).unwrap();
        assert_eq!(reply["data"], "joined");
        assert_eq!(reply["status"], 200);
        assert!(reply.get("respondingMessageId").is_none());
    }
}

#[tokio::test]
async fn local_individual_never_touches_the_distributor() {
    let store = RecordingDistributor::in_memory();
    let router = server("p1", Arc::new(store.clone())).await;
    router
        .post(
            "/dm/:id",
            handlers![|req: Request, res: Response| async move {
                let target = req.param("id").unwrap_or_default().to_owned();
                res.to(target).send(req.data().clone()).await?;
                Ok(())
            }],
        )
        .unwrap();

    let (alice, alice_conn) = connection("alice");
    let (bob, bob_conn) = connection("bob");
    router.hub().connections().add(alice_conn.clone());
    router.hub().connections().add(bob_conn);
    store.clear();

    router
        .dispatch(request(Verb::Post, "/dm/bob").with_data("hi bob"), alice_conn)
        .await;

    assert!(store.calls().is_empty());
    assert_eq!(alice.count(), 0);
    assert_eq!(bob.messages()[0]["data"], "hi bob");
}

#[tokio::test]
async fn two_processes_exchange_group_and_individual_frames() {
    let store = Arc::new(MemoryDistributor::new());
    let p1 = server("p1", store.clone()).await;
    let p2 = server("p2", store.clone()).await;

    for router in [&p1, &p2] {
        router.get("/join/:id", [join_param()]).unwrap();
        router
            .post(
                "/say/:id",
                handlers![|req: Request, res: Response| async move {
                    let room = req.param("id").unwrap_or_default().to_owned();
                    res.group(room).send(req.data().clone()).await?;
                    Ok(())
                }],
            )
            .unwrap();
        router
            .post(
                "/dm/:id",
                handlers![|req: Request, res: Response| async move {
                    let target = req.param("id").unwrap_or_default().to_owned();
                    res.to(target).send(req.data().clone()).await?;
                    Ok(())
                }],
            )
            .unwrap();
    }

    let (alice, alice_conn) = connection("alice");
    let (bob, bob_conn) = connection("bob");
    let (carol, carol_conn) = connection("carol");
    p1.attach(alice_conn.clone()).await.unwrap();
    p2.attach(bob_conn.clone()).await.unwrap();
    p2.attach(carol_conn.clone()).await.unwrap();

    p2.dispatch(request(Verb::Get, "/join/lobby"), bob_conn).await;
    assert_eq!(store.list("group-servers:lobby"), ["p2"]);

    p1.dispatch(request(Verb::Post, "/say/lobby").with_data("hello"), alice_conn.clone())
        .await;
    assert_eq!(alice.count(), 0);
    assert_eq!(carol.count(), 0);
    assert_eq!(bob.messages()[0]["data"], "hello");

    p1.dispatch(request(Verb::Post, "/dm/carol").with_data("psst"), alice_conn)
        .await;
    assert_eq!(carol.messages()[0]["data"], "psst");
    assert_eq!(bob.count(), 1);
}

#[tokio::test]
async fn unknown_individual_is_unroutable() {
    let router = server("p1", Arc::new(MemoryDistributor::new())).await;
    let (_, conn) = connection("c1");
    let response = Response::new(
        conn,
        Arc::new(request(Verb::Get, "/x")),
        Arc::clone(router.hub()),
        Arc::clone(router.codec()),
    );

    let delivery = response.to("nobody").send("hello?").await.unwrap();
    assert_eq!(delivery, Delivery::Unroutable);
}

#[tokio::test]
async fn join_then_leave_all_clears_local_and_remote_membership() {
    let store = Arc::new(MemoryDistributor::new());
    let router = server("p1", store.clone()).await;
    router.get("/join/:id", [join_param()]).unwrap();
    router
        .delete(
            "/groups",
            handlers![|_req: Request, res: Response| async move {
                res.leave_all_groups().await?;
                Ok(())
            }],
        )
        .unwrap();

    let (_, conn) = connection("c1");
    router.dispatch(request(Verb::Get, "/join/g1"), conn.clone()).await;
    router.dispatch(request(Verb::Get, "/join/g2"), conn.clone()).await;
    assert_eq!(store.list("my-groups:c1"), ["g1", "g2"]);

    router.dispatch(request(Verb::Delete, "/groups"), conn).await;

    assert!(router.hub().groups().members("g1").is_empty());
    assert!(router.hub().groups().members("g2").is_empty());
    assert!(store.list("my-groups:c1").is_empty());
    assert_eq!(store.list("group-servers:g1"), ["p1"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_joins_to_one_group_are_both_recorded() {
    let router = Arc::new(server("p1", Arc::new(MemoryDistributor::new())).await);
    router.get("/join/:id", [join_param()]).unwrap();

    let tasks: Vec<_> = ["c1", "c2"]
        .into_iter()
        .map(|id| {
            let router = Arc::clone(&router);
            tokio::spawn(async move {
                let (_, conn) = connection(id);
                router.dispatch(request(Verb::Get, "/join/shared"), conn).await
            })
        })
        .collect();
    for task in tasks {
        assert!(task.await.unwrap().is_completed());
    }

    let mut members: Vec<String> = router
        .hub()
        .groups()
        .members("shared")
        .iter()
        .map(|conn| conn.id().to_owned())
        .collect();
    members.sort();
    assert_eq!(members, ["c1", "c2"]);
}

#[tokio::test]
async fn detach_removes_owner_record_and_memberships() {
    let store = RecordingDistributor::in_memory();
    let router = server("p1", Arc::new(store.clone())).await;
    router.get("/join/:id", [join_param()]).unwrap();

    let (_, conn) = connection("c1");
    router.attach(conn.clone()).await.unwrap();
    router.dispatch(request(Verb::Get, "/join/g"), conn).await;
    assert_eq!(store.get("i:c1").await.unwrap().as_deref(), Some("p1"));

    router.detach("c1").await.unwrap();

    assert_eq!(store.get("i:c1").await.unwrap(), None);
    assert!(store.get_list_items("my-groups:c1").await.unwrap().is_empty());
    assert!(!router.hub().connections().contains("c1"));
    assert!(store.calls().contains(&DistributorCall::Delete {
        key: "i:c1".into()
    }));
}

#[tokio::test]
async fn frames_for_departed_recipients_are_dropped() {
    let store = Arc::new(MemoryDistributor::new());
    let router = server("p1", store.clone()).await;
    let (alice, alice_conn) = connection("alice");
    router.attach(alice_conn.clone()).await.unwrap();
    router.hub().join_group(&alice_conn, "lobby").await.unwrap();

    store
        .enqueue("i:p1", envelope::frame("gone", b"{}").unwrap())
        .await
        .unwrap();
    store
        .enqueue("server-messages:p1", envelope::frame("empty-room", b"{}").unwrap())
        .await
        .unwrap();
    store
        .enqueue("server-messages:p1", Bytes::from_static(b"\x00"))
        .await
        .unwrap();

    assert_eq!(alice.count(), 0);
    assert_eq!(store.pending("i:p1"), 0);
    assert_eq!(store.pending("server-messages:p1"), 0);

    store
        .enqueue("server-messages:p1", envelope::frame("lobby", b"{}").unwrap())
        .await
        .unwrap();
    assert_eq!(alice.count(), 1);
}
