//! Full wire path: daemon on a Unix socket, client transport, router.

use std::sync::Arc;
use std::time::Duration;

use quick_palette::client::router::route;
use quick_palette::client::transport::{SearchTransport, UdsTransport};
use quick_palette::model::permission::{PermissionLevel, Requester};
use quick_palette::model::types::{DomainId, Status};
use quick_palette::server::daemon::{SearchDaemon, ServerConfig};
use quick_palette::server::executor::{QueryExecutor, default_categories};
use quick_palette::server::menu::MenuRegistry;
use quick_palette::storage::sqlite::Catalog;
use tempfile::TempDir;

struct RunningDaemon {
    daemon: Arc<SearchDaemon>,
    handle: std::thread::JoinHandle<std::io::Result<()>>,
    socket_path: std::path::PathBuf,
    _dir: TempDir,
}

fn start_daemon() -> RunningDaemon {
    let dir = TempDir::new().unwrap();
    let socket_path = dir.path().join("qpal-test.sock");

    let catalog = Catalog::open(&dir.path().join("catalog.db")).expect("open catalog");
    catalog
        .insert_account("anna", "anna@example.com", "Anna", Some("Editor"))
        .unwrap();
    catalog
        .insert_account("bob", "bob@example.com", "Banner Bob", Some("Author"))
        .unwrap();
    catalog
        .insert_document("article", "Annual Report", Status::Published, 1, None, None)
        .unwrap();

    let executor = Arc::new(QueryExecutor::new(
        Arc::new(catalog),
        MenuRegistry::builtin(),
        default_categories(),
    ));
    let config = ServerConfig {
        socket_path: socket_path.clone(),
        db_path: dir.path().join("catalog.db"),
        categories: default_categories(),
        request_timeout: Duration::from_secs(5),
        max_connections: 4,
    };
    let daemon = Arc::new(SearchDaemon::new(config, executor));

    let run = Arc::clone(&daemon);
    let handle = std::thread::spawn(move || run.run());

    for _ in 0..100 {
        if socket_path.exists() {
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(socket_path.exists(), "daemon never bound its socket");

    RunningDaemon {
        daemon,
        handle,
        socket_path,
        _dir: dir,
    }
}

fn requester(level: PermissionLevel) -> Requester {
    Requester {
        account_id: 1,
        level,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn prefixed_account_query_over_the_wire() {
    let running = start_daemon();
    let transport = UdsTransport::new(running.socket_path.clone());

    // "u:ann" routes to the accounts domain with the prefix stripped.
    let routed = route("u:ann", DomainId::Documents);
    assert_eq!(routed.domain, DomainId::Accounts);

    let resp = transport
        .search(
            routed.cleaned_term,
            routed.domain,
            "test".into(),
            requester(PermissionLevel::EditOthers),
        )
        .await
        .expect("search succeeds");

    let titles: Vec<_> = resp.groups["accounts"]
        .iter()
        .map(|i| i.title.as_str())
        .collect();
    // Prefix match before containment match.
    assert_eq!(titles, vec!["Anna", "Banner Bob"]);
    assert_eq!(resp.meta.domain, DomainId::Accounts);

    running.daemon.request_shutdown();
    running.handle.join().unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn account_search_is_gated_below_the_list_capability() {
    let running = start_daemon();
    let transport = UdsTransport::new(running.socket_path.clone());

    let resp = transport
        .search(
            "ann".into(),
            DomainId::Accounts,
            "test".into(),
            requester(PermissionLevel::EditOwn),
        )
        .await
        .expect("search succeeds");
    assert!(resp.is_empty());

    // The same requester can still search documents.
    let resp = transport
        .search(
            "annual".into(),
            DomainId::Documents,
            "test".into(),
            requester(PermissionLevel::EditOwn),
        )
        .await
        .unwrap();
    assert_eq!(resp.total_count, 1);

    running.daemon.request_shutdown();
    running.handle.join().unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn bootstrap_health_and_shutdown_round_trip() {
    let running = start_daemon();
    let transport = UdsTransport::new(running.socket_path.clone());

    let boot = transport
        .bootstrap(requester(PermissionLevel::EditOthers))
        .await
        .expect("bootstrap succeeds");
    assert!(boot.pages.iter().any(|p| p.location == "settings/general"));

    let health = transport.health().await.expect("health succeeds");
    assert!(health.ready);
    assert!(health.total_requests >= 1);

    transport.shutdown().await.expect("shutdown succeeds");
    running.handle.join().unwrap().unwrap();
    assert!(!running.socket_path.exists());
}
