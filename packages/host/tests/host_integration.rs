use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use semantic_host::file_tree::{FileMetadata, FileNode, FilePath, MetadataSource, TreeError};
use semantic_host::handle::testing::{ReleaseCounter, ReleaseProbe};
use semantic_host::handle::Release;
use semantic_host::scheduler::WorkUnit;
use semantic_host::transport::{ChannelFetchHandler, RESPONSE_CONTENT_TYPE};
use semantic_host::{Host, HostConfig, HostError};

/// A stand-in engine answering metadata requests from a fixed listing.
struct Engine {
    requests: AtomicUsize,
}

#[async_trait]
impl MetadataSource for Engine {
    async fn fetch_metadata(&self, path: &FilePath) -> Result<FileMetadata, String> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        match path.to_string().as_str() {
            "/docs" => Ok(FileMetadata::directory()
                .with_children([FileNode::placeholder("readme.md")])),
            other => Err(format!("not found: {}", other)),
        }
    }
}

fn engine() -> Engine {
    Engine {
        requests: AtomicUsize::new(0),
    }
}

struct Countdown {
    remaining: usize,
    probe: ReleaseProbe,
}

impl WorkUnit for Countdown {
    fn run(&mut self) -> bool {
        self.probe.touch();
        self.remaining -= 1;
        self.remaining == 0
    }
}

impl Release for Countdown {
    fn release(self) {
        self.probe.release();
    }
}

fn countdown(remaining: usize) -> (Countdown, ReleaseCounter) {
    let (probe, released) = ReleaseProbe::new();
    (Countdown { remaining, probe }, released)
}

#[tokio::test]
async fn test_fetch_file_metadata_merges_into_tree() {
    let host = Host::new(HostConfig::default(), async { Ok(engine()) }).unwrap();

    host.fetch_file_metadata("/docs").await.unwrap();

    let tree = host.file_tree().snapshot();
    let docs = tree.node("/docs").unwrap();
    assert!(docs.is_fetched());
    assert!(!docs.child("readme.md").unwrap().is_fetched());
}

#[tokio::test]
async fn test_fetch_file_metadata_failure_keeps_tree() {
    let host = Host::new(HostConfig::default(), async { Ok(engine()) }).unwrap();

    let result = host.fetch_file_metadata("/missing").await;

    assert!(matches!(result, Err(HostError::Tree(TreeError::FetchFailed { .. }))));
    assert_eq!(
        host.file_tree().failure("/missing"),
        Some("not found: /missing".to_string())
    );
}

#[tokio::test]
async fn test_engine_constructed_once_across_requests() {
    let constructions = Arc::new(AtomicUsize::new(0));
    let counter = constructions.clone();
    let host = Host::new(HostConfig::default(), async move {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(engine())
    })
    .unwrap();

    host.fetch_file_metadata("/docs").await.unwrap();
    host.fetch_file_metadata("/docs").await.unwrap();

    assert_eq!(constructions.load(Ordering::SeqCst), 1);
    let engine = host.engine().try_get().unwrap();
    assert_eq!(engine.requests.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_failed_engine_construction_surfaces() {
    let host: Host<Engine> = Host::new(HostConfig::default(), async {
        Err(HostError::Engine("module failed to instantiate".to_string()))
    })
    .unwrap();

    let result = host.fetch_file_metadata("/docs").await;
    assert!(matches!(result, Err(HostError::EngineInit(_))));
    assert!(host.file_tree().snapshot().node("/docs").is_none());
}

#[tokio::test]
async fn test_reset_session_clears_tree() {
    let host = Host::new(HostConfig::default(), async { Ok(engine()) }).unwrap();
    host.fetch_file_metadata("/docs").await.unwrap();

    host.reset_session();

    assert!(host.file_tree().snapshot().node("/docs").is_none());
}

#[tokio::test]
async fn test_scheduled_unit_runs_until_done() {
    let host = Host::new(HostConfig::default(), async { Ok(engine()) }).unwrap();
    let (unit, released) = countdown(4);

    assert_eq!(host.schedule(unit).wait().await.unwrap(), 4);
    assert_eq!(released.released(), 1);
}

#[tokio::test]
async fn test_spawned_future_is_driven() {
    let host = Host::new(HostConfig::default(), async { Ok(engine()) }).unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel();

    let unit = host.spawn(async move {
        let _ = tx.send(42u32);
    });

    unit.wait().await.unwrap();
    assert_eq!(rx.await.unwrap(), 42);
}

#[tokio::test]
async fn test_rpc_call_uses_configured_base_url() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/svc/Ping"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("pong", RESPONSE_CONTENT_TYPE))
        .expect(1)
        .mount(&server)
        .await;

    let config = HostConfig {
        rpc_base_url: Some(format!("{}/api", server.uri())),
        ..HostConfig::default()
    };
    let host = Host::new(config, async { Ok(engine()) }).unwrap();

    let body = host.call("svc", "Ping", "ping").unwrap().await.unwrap();
    assert_eq!(body.as_ref(), b"pong");
}

#[tokio::test]
async fn test_rpc_call_without_base_url_fails() {
    let host = Host::new(HostConfig::default(), async { Ok(engine()) }).unwrap();
    assert!(matches!(
        host.call("svc", "Ping", Vec::new()),
        Err(HostError::NoRpcBaseUrl)
    ));
}

#[tokio::test]
async fn test_perform_fetch_delivers_to_handler() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rpc"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![1u8, 2], RESPONSE_CONTENT_TYPE))
        .mount(&server)
        .await;

    let host = Host::new(HostConfig::default(), async { Ok(engine()) }).unwrap();
    let (handler, call) = ChannelFetchHandler::channel();

    host.perform_fetch(format!("{}/rpc", server.uri()), Vec::new(), handler)
        .unwrap()
        .await
        .unwrap();

    assert_eq!(call.await.unwrap().as_ref(), &[1u8, 2]);
}

#[test]
fn test_host_usable_from_thread_outside_runtime() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();

    let (server, host) = runtime.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/svc/Ping"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("pong", RESPONSE_CONTENT_TYPE))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rpc"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(vec![3u8], RESPONSE_CONTENT_TYPE))
            .mount(&server)
            .await;

        let config = HostConfig {
            rpc_base_url: Some(format!("{}/api", server.uri())),
            ..HostConfig::default()
        };
        let host = Host::new(config, async { Ok(engine()) }).unwrap();
        (server, host)
    });
    let fetch_url = format!("{}/rpc", server.uri());
    let (unit, released) = countdown(2);

    let (pong, fetched, runs) = std::thread::spawn(move || {
        futures::executor::block_on(async move {
            let pong = host.call("svc", "Ping", "ping").unwrap().await.unwrap();

            let (handler, call) = ChannelFetchHandler::channel();
            host.perform_fetch(fetch_url, Vec::new(), handler)
                .unwrap()
                .await
                .unwrap();
            let fetched = call.await.unwrap();

            let runs = host.schedule(unit).wait().await.unwrap();
            (pong, fetched, runs)
        })
    })
    .join()
    .unwrap();

    assert_eq!(pong.as_ref(), b"pong");
    assert_eq!(fetched.as_ref(), &[3u8]);
    assert_eq!(runs, 2);
    assert_eq!(released.released(), 1);
    let _guard = runtime.enter();
    drop(server);
}
