mod common;

use bytes::Bytes;
use common::{open, request, service, MockConnector};
use filedeck_core::{Protocol, RemoteErrorKind};
use filedeck_lib::batch::UploadItem;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;

fn names(files: &[filedeck_core::Entry]) -> Vec<&str> {
    files.iter().map(|e| e.name.as_str()).collect()
}

fn item(path: &str, content: &'static [u8]) -> UploadItem {
    UploadItem {
        relative_path: path.to_string(),
        content: Bytes::from_static(content),
    }
}

// ── Connect ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn connect_returns_sorted_initial_listing() {
    let connector = Arc::new(MockConnector::default());
    let svc = service(connector.clone());

    let result = svc.connect(request(Protocol::Ftp, "one.example")).await.unwrap();
    assert_eq!(result.session.current_path, "/home/alice");
    assert_eq!(result.session.port, 21);
    assert!(result.session.connected);
    assert_eq!(names(&result.files), vec!["A", "a", "b"]);
    assert_eq!(svc.session_count().await, 1);
}

#[tokio::test]
async fn connect_failures_register_nothing() {
    let connector = Arc::new(MockConnector::default());
    let svc = service(connector.clone());

    let err = svc.connect(request(Protocol::Sftp, "down.example")).await.unwrap_err();
    assert_eq!(err.kind, RemoteErrorKind::Network);

    let mut req = request(Protocol::Sftp, "one.example");
    req.username = "nobody".into();
    assert_eq!(svc.connect(req).await.unwrap_err().kind, RemoteErrorKind::Auth);

    connector
        .tree("locked.example")
        .lock()
        .unwrap()
        .fail_list
        .insert("/home/alice".into());
    let err = svc.connect(request(Protocol::Sftp, "locked.example")).await.unwrap_err();
    assert_eq!(err.kind, RemoteErrorKind::Protocol);

    assert_eq!(svc.session_count().await, 0);
}

#[tokio::test]
async fn invalid_request_never_reaches_the_network() {
    let connector = Arc::new(MockConnector::default());
    let svc = service(connector.clone());

    let mut req = request(Protocol::Sftp, "one.example");
    req.password = None;
    let err = svc.connect(req).await.unwrap_err();
    assert_eq!(err.kind, RemoteErrorKind::Config);
    assert_eq!(*connector.connects.lock().unwrap(), 0);
}

// ── Serialization ────────────────────────────────────────────────────────────

#[tokio::test]
async fn operations_on_one_session_never_overlap() {
    let connector = Arc::new(MockConnector::with_delay(Duration::from_millis(20)));
    let svc = service(connector.clone());
    let id = open(&svc, "one.example").await;
    connector.log.lock().unwrap().clear();

    let calls = (0..6).map(|i| {
        let svc = svc.clone();
        let id = id.clone();
        async move {
            if i % 2 == 0 {
                svc.list(&id, None).await.map(|_| ())
            } else {
                svc.print_working_directory(&id).await.map(|_| ())
            }
        }
    });
    for result in join_all(calls).await {
        result.unwrap();
    }

    let mut spans = connector.spans();
    assert_eq!(spans.len(), 6);
    spans.sort_by_key(|s| s.start);
    for pair in spans.windows(2) {
        assert!(pair[1].start >= pair[0].end, "{:?} overlaps {:?}", pair[1], pair[0]);
    }
}

#[tokio::test]
async fn different_sessions_run_concurrently() {
    let connector = Arc::new(MockConnector::with_delay(Duration::from_millis(100)));
    let svc = service(connector.clone());
    let first = open(&svc, "one.example").await;
    let second = open(&svc, "two.example").await;
    connector.log.lock().unwrap().clear();

    let (a, b) = tokio::join!(svc.list(&first, None), svc.list(&second, None));
    a.unwrap();
    b.unwrap();

    let spans = connector.spans();
    let one = spans.iter().find(|s| s.host == "one.example").unwrap();
    let two = spans.iter().find(|s| s.host == "two.example").unwrap();
    assert!(one.start < two.end && two.start < one.end);
}

#[tokio::test]
async fn operations_run_in_submission_order() {
    let connector = Arc::new(MockConnector::with_delay(Duration::from_millis(5)));
    let svc = service(connector.clone());
    let id = open(&svc, "one.example").await;

    let calls = (0..5).map(|i| svc.make_directory(&id, format!("/tmp{}", i), None));
    for result in join_all(calls).await {
        result.unwrap();
    }

    let tree = connector.tree("one.example");
    let calls = tree.lock().unwrap().mkdir_calls.clone();
    assert_eq!(calls, vec!["/tmp0", "/tmp1", "/tmp2", "/tmp3", "/tmp4"]);
}

#[tokio::test]
async fn failed_operation_does_not_block_the_next() {
    let connector = Arc::new(MockConnector::with_delay(Duration::from_millis(5)));
    let svc = service(connector.clone());
    let id = open(&svc, "one.example").await;

    let (failed, listed) = tokio::join!(
        svc.delete_file(&id, "/home/alice/missing".into(), None),
        svc.list(&id, None)
    );
    let err = failed.unwrap_err();
    assert_eq!(err.kind, RemoteErrorKind::Protocol);
    assert_eq!(err.session_id.as_deref(), Some(id.as_str()));
    assert_eq!(names(&listed.unwrap()), vec!["A", "a", "b"]);
}

#[tokio::test]
async fn abandoned_operation_still_runs_to_completion() {
    let connector = Arc::new(MockConnector::with_delay(Duration::from_millis(100)));
    let svc = service(connector.clone());
    let id = open(&svc, "one.example").await;
    connector.log.lock().unwrap().clear();

    let abandoned = tokio::time::timeout(
        Duration::from_millis(20),
        svc.change_directory(&id, "/home".into()),
    )
    .await;
    assert!(abandoned.is_err());

    assert_eq!(svc.print_working_directory(&id).await.unwrap(), "/home");
    assert_eq!(svc.session_info(&id).await.unwrap().current_path, "/home");

    let spans = connector.spans();
    let ops: Vec<&str> = spans.iter().map(|s| s.op).collect();
    assert_eq!(ops, vec!["cd", "list", "pwd"]);
    for pair in spans.windows(2) {
        assert!(pair[1].start >= pair[0].end, "{:?} overlaps {:?}", pair[1], pair[0]);
    }
}

// ── Unknown and closed sessions ──────────────────────────────────────────────

#[tokio::test]
async fn unknown_session_is_reported_for_every_operation() {
    let svc = service(Arc::new(MockConnector::default()));
    let id = "no-such-session";
    let kinds = vec![
        svc.disconnect(id).await.unwrap_err().kind,
        svc.list(id, None).await.unwrap_err().kind,
        svc.change_directory(id, "/".into()).await.unwrap_err().kind,
        svc.print_working_directory(id).await.unwrap_err().kind,
        svc.make_directory(id, "/x".into(), None).await.unwrap_err().kind,
        svc.remove_directory(id, "/x".into(), None).await.unwrap_err().kind,
        svc.delete_file(id, "/x".into(), None).await.unwrap_err().kind,
        svc.rename(id, "/x".into(), "/y".into(), None).await.unwrap_err().kind,
        svc.download(id, "/x", &mut Vec::<u8>::new()).await.unwrap_err().kind,
        svc.upload_batch(id, "/".into(), vec![item("f", b"1")]).await.unwrap_err().kind,
        svc.session_info(id).await.unwrap_err().kind,
    ];
    assert!(kinds.iter().all(|k| *k == RemoteErrorKind::SessionNotFound), "{:?}", kinds);
}

#[tokio::test]
async fn operations_queued_behind_disconnect_see_no_session() {
    let connector = Arc::new(MockConnector::with_delay(Duration::from_millis(10)));
    let svc = service(connector.clone());
    let id = open(&svc, "one.example").await;

    let (closed, listed) = tokio::join!(svc.disconnect(&id), svc.list(&id, None));
    closed.unwrap();
    assert_eq!(listed.unwrap_err().kind, RemoteErrorKind::SessionNotFound);
    assert_eq!(svc.session_count().await, 0);
    assert_eq!(
        svc.disconnect(&id).await.unwrap_err().kind,
        RemoteErrorKind::SessionNotFound
    );
}

#[tokio::test]
async fn disconnect_all_closes_everything() {
    let svc = service(Arc::new(MockConnector::default()));
    open(&svc, "one.example").await;
    open(&svc, "two.example").await;
    assert_eq!(svc.session_count().await, 2);
    svc.disconnect_all().await;
    assert_eq!(svc.session_count().await, 0);
}

#[tokio::test]
async fn lost_connection_drops_the_session() {
    let connector = Arc::new(MockConnector::with_delay(Duration::from_millis(5)));
    let svc = service(connector.clone());
    let id = open(&svc, "one.example").await;
    connector
        .tree("one.example")
        .lock()
        .unwrap()
        .sever_on_list
        .insert("/home".into());

    let (lost, queued) = tokio::join!(
        svc.list(&id, Some("/home".into())),
        svc.print_working_directory(&id)
    );
    assert_eq!(lost.unwrap_err().kind, RemoteErrorKind::Network);
    assert_eq!(queued.unwrap_err().kind, RemoteErrorKind::SessionNotFound);
    assert_eq!(svc.session_count().await, 0);
    assert_eq!(
        svc.session_info(&id).await.unwrap_err().kind,
        RemoteErrorKind::SessionNotFound
    );
}

#[tokio::test]
async fn dead_adapter_is_never_handed_an_operation() {
    let connector = Arc::new(MockConnector::default());
    let svc = service(connector.clone());
    let id = open(&svc, "one.example").await;
    connector.log.lock().unwrap().clear();
    connector.tree("one.example").lock().unwrap().link_down = true;

    assert_eq!(
        svc.print_working_directory(&id).await.unwrap_err().kind,
        RemoteErrorKind::SessionNotFound
    );
    assert!(connector.spans().is_empty());
    assert_eq!(svc.session_count().await, 0);
}

// ── Navigation ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn change_directory_moves_current_path() {
    let svc = service(Arc::new(MockConnector::default()));
    let id = open(&svc, "one.example").await;

    let change = svc.change_directory(&id, "/home".into()).await.unwrap();
    assert_eq!(change.path, "/home");
    assert_eq!(names(&change.files), vec!["alice"]);
    assert_eq!(svc.session_info(&id).await.unwrap().current_path, "/home");

    // Listing without a path now follows the new directory.
    assert_eq!(names(&svc.list(&id, None).await.unwrap()), vec!["alice"]);
    assert_eq!(svc.print_working_directory(&id).await.unwrap(), "/home");
}

#[tokio::test]
async fn failed_change_directory_is_a_no_op() {
    let connector = Arc::new(MockConnector::default());
    let svc = service(connector.clone());
    let id = open(&svc, "one.example").await;

    let err = svc.change_directory(&id, "/nope".into()).await.unwrap_err();
    assert_eq!(err.kind, RemoteErrorKind::Protocol);
    assert_eq!(svc.session_info(&id).await.unwrap().current_path, "/home/alice");
}

#[tokio::test]
async fn change_directory_with_failing_listing_returns_to_previous_directory() {
    let connector = Arc::new(MockConnector::default());
    let svc = service(connector.clone());
    let id = open(&svc, "one.example").await;
    let tree = connector.tree("one.example");
    tree.lock().unwrap().fail_list.insert("/home/alice/A".into());

    let err = svc.change_directory(&id, "A".into()).await.unwrap_err();
    assert_eq!(err.kind, RemoteErrorKind::Protocol);
    assert_eq!(svc.session_info(&id).await.unwrap().current_path, "/home/alice");
    let tree = tree.lock().unwrap();
    assert_eq!(tree.cwd, "/home/alice");
    assert_eq!(tree.cwd_calls, vec!["/home/alice/A", "/home/alice"]);
}

#[tokio::test]
async fn list_of_a_missing_directory_is_a_protocol_error() {
    let svc = service(Arc::new(MockConnector::default()));
    let id = open(&svc, "one.example").await;
    let err = svc.list(&id, Some("/gone".into())).await.unwrap_err();
    assert_eq!(err.kind, RemoteErrorKind::Protocol);
}

// ── Mutations ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn mutations_answer_with_a_fresh_listing() {
    let svc = service(Arc::new(MockConnector::default()));
    let id = open(&svc, "one.example").await;

    let files = svc.make_directory(&id, "/home/alice/new".into(), None).await.unwrap();
    assert_eq!(names(&files), vec!["A", "new", "a", "b"]);

    let files = svc
        .rename(&id, "/home/alice/a".into(), "/home/alice/c".into(), None)
        .await
        .unwrap();
    assert_eq!(names(&files), vec!["A", "new", "b", "c"]);

    let files = svc.delete_file(&id, "/home/alice/b".into(), None).await.unwrap();
    assert_eq!(names(&files), vec!["A", "new", "c"]);

    let files = svc
        .remove_directory(&id, "/home/alice/A".into(), Some("/home/alice".into()))
        .await
        .unwrap();
    assert_eq!(names(&files), vec!["new", "c"]);

    let files = svc
        .make_directory(&id, "/home/alice/new/deep".into(), Some("/home/alice/new".into()))
        .await
        .unwrap();
    assert_eq!(names(&files), vec!["deep"]);
}

#[tokio::test]
async fn direct_mkdir_on_existing_path_is_a_conflict() {
    let svc = service(Arc::new(MockConnector::default()));
    let id = open(&svc, "one.example").await;

    let err = svc
        .make_directory(&id, "/home/alice/A".into(), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, RemoteErrorKind::Conflict);
    assert_eq!(err.session_id.as_deref(), Some(id.as_str()));
}

// ── Transfers ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn download_streams_into_the_sink() {
    let svc = service(Arc::new(MockConnector::default()));
    let id = open(&svc, "one.example").await;

    let mut sink: Vec<u8> = Vec::new();
    let result = svc.download(&id, "/home/alice/b", &mut sink).await.unwrap();
    assert_eq!(result.filename, "b");
    assert_eq!(result.bytes, 3);
    assert_eq!(sink, b"bee");
}

#[tokio::test]
async fn download_writes_exactly_the_remote_bytes() {
    let svc = service(Arc::new(MockConnector::default()));
    let id = open(&svc, "one.example").await;

    let mut sink = tokio_test::io::Builder::new().write(b"ay").build();
    let result = svc.download(&id, "/home/alice/a", &mut sink).await.unwrap();
    assert_eq!(result.bytes, 2);
}

#[tokio::test]
async fn interrupted_download_leaves_partial_output() {
    let connector = Arc::new(MockConnector::default());
    let svc = service(connector.clone());
    let id = open(&svc, "one.example").await;
    connector.tree("one.example").lock().unwrap().download_cut_after = Some(1);

    let mut sink: Vec<u8> = Vec::new();
    let err = svc.download(&id, "/home/alice/b", &mut sink).await.unwrap_err();
    assert_eq!(err.kind, RemoteErrorKind::Transfer);
    assert_eq!(sink, b"b");

    // The session stays usable.
    svc.list(&id, None).await.unwrap();
}

#[tokio::test]
async fn batch_isolates_per_file_failures() {
    let connector = Arc::new(MockConnector::default());
    let svc = service(connector.clone());
    let id = open(&svc, "one.example").await;
    let tree = connector.tree("one.example");
    tree.lock().unwrap().fail_upload.insert("/home/alice/two.txt".into());

    let report = svc
        .upload_batch(
            &id,
            "/home/alice".into(),
            vec![item("one.txt", b"1"), item("two.txt", b"2"), item("three.txt", b"3")],
        )
        .await
        .unwrap();

    let flags: Vec<bool> = report.uploads.iter().map(|u| u.success).collect();
    assert_eq!(flags, vec![true, false, true]);
    assert_eq!(report.uploads[1].name, "two.txt");
    assert!(report.uploads[1].error.as_deref().unwrap().contains("Permission denied"));
    assert!(!report.success());
    assert_eq!(names(&report.files), vec!["A", "a", "b", "one.txt", "three.txt"]);
}

#[tokio::test]
async fn batch_creates_parents_and_tolerates_existing_ones() {
    let connector = Arc::new(MockConnector::default());
    let svc = service(connector.clone());
    let id = open(&svc, "one.example").await;

    let report = svc
        .upload_batch(
            &id,
            "/home/alice".into(),
            vec![
                item("A/x.txt", b"x"),
                item("docs/sub/y.txt", b"y"),
                item("docs/sub/z.txt", b"z"),
            ],
        )
        .await
        .unwrap();
    assert!(report.success(), "{:?}", report.uploads);

    let tree = connector.tree("one.example");
    let tree = tree.lock().unwrap();
    assert_eq!(tree.file("/home/alice/A/x.txt").unwrap(), b"x");
    assert_eq!(tree.file("/home/alice/docs/sub/z.txt").unwrap(), b"z");
    // One attempt per distinct parent.
    assert_eq!(tree.mkdir_calls, vec!["/home/alice/A", "/home/alice/docs/sub"]);
}

#[tokio::test]
async fn batch_does_not_mask_real_mkdir_failures() {
    let connector = Arc::new(MockConnector::default());
    let svc = service(connector.clone());
    let id = open(&svc, "one.example").await;
    let tree = connector.tree("one.example");
    tree.lock().unwrap().fail_mkdir.insert("/home/alice/locked".into());

    let report = svc
        .upload_batch(
            &id,
            "/home/alice".into(),
            vec![item("locked/a.txt", b"a"), item("ok.txt", b"ok")],
        )
        .await
        .unwrap();
    assert!(!report.uploads[0].success);
    assert!(report.uploads[0].error.as_deref().unwrap().contains("Permission denied"));
    assert!(report.uploads[1].success);
}

#[tokio::test]
async fn batch_rejects_bad_relative_paths_per_entry() {
    let connector = Arc::new(MockConnector::default());
    let svc = service(connector.clone());
    let id = open(&svc, "one.example").await;

    let report = svc
        .upload_batch(
            &id,
            "".into(),
            vec![item("../escape.txt", b"x"), item("", b"y"), item("fine.txt", b"z")],
        )
        .await
        .unwrap();
    let flags: Vec<bool> = report.uploads.iter().map(|u| u.success).collect();
    assert_eq!(flags, vec![false, false, true]);

    // Empty base means `/` for placement and the current path for the listing.
    let tree = connector.tree("one.example");
    assert!(tree.lock().unwrap().has("/fine.txt"));
    assert_eq!(names(&report.files), vec!["A", "a", "b"]);
}

#[tokio::test]
async fn empty_batch_is_a_config_error() {
    let svc = service(Arc::new(MockConnector::default()));
    let id = open(&svc, "one.example").await;
    let err = svc.upload_batch(&id, "/".into(), Vec::new()).await.unwrap_err();
    assert_eq!(err.kind, RemoteErrorKind::Config);
}
