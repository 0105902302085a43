//! End-to-end session tests: connect, resolve pages, compose, and fan out
//! against scripted collaborators.

use std::sync::Arc;
use std::time::Duration;

use libomnicast::accounts::AccountResolver;
use libomnicast::composer::Composer;
use libomnicast::graph::mock::MockGraph;
use libomnicast::graph::{InstagramRef, PageEntry};
use libomnicast::orchestrator::Orchestrator;
use libomnicast::platforms::mock::MockPublisherFactory;
use libomnicast::platforms::PublishTarget;
use libomnicast::store::{CredentialStore, FileStorage, MemoryStorage};
use libomnicast::tokens::{spawn_refresh_task, TokenLifecycle};
use libomnicast::types::{AggregateStatus, PlatformSelection};
use libomnicast::{OmnicastError, PlatformId};
use tempfile::TempDir;

fn page_with_instagram(id: &str, ig_id: &str) -> PageEntry {
    PageEntry {
        id: id.to_string(),
        name: format!("Page {}", id),
        access_token: format!("{}-token", id),
        instagram_business_account: Some(InstagramRef {
            id: ig_id.to_string(),
            username: Some("brand".to_string()),
        }),
    }
}

fn selection(platforms: &[PlatformId]) -> PlatformSelection {
    platforms.iter().copied().collect()
}

#[tokio::test]
async fn test_exchange_resolve_and_cross_post() {
    let temp = TempDir::new().unwrap();
    let backend = FileStorage::open(temp.path().join("session.json")).unwrap();
    let store = CredentialStore::new(Arc::new(backend));

    let mut graph = MockGraph::with_pages(vec![page_with_instagram("page_a", "acct_1")]);
    graph.long_lived_token = Some("long-lived".to_string());
    let graph = Arc::new(graph);

    // Connect Facebook: exchange the short-lived token, then resolve pages.
    let lifecycle = TokenLifecycle::new(graph.clone(), store.clone(), 7);
    let long_lived = lifecycle.exchange_for_long_lived("short-lived").await.unwrap();

    let resolver = AccountResolver::new(graph.clone(), store.clone());
    let accounts = resolver.refresh(&long_lived).await.unwrap();
    assert_eq!(accounts.len(), 1);

    // Compose and fan out to Facebook plus the page-linked Instagram.
    let factory = Arc::new(MockPublisherFactory::new());
    let orchestrator = Orchestrator::new(
        store.clone(),
        AccountResolver::new(graph, store.clone()),
        factory.clone(),
    );

    let mut composer = Composer::new();
    composer.set_text("Hello world");

    let report = orchestrator
        .submit(
            &mut composer,
            &selection(&[PlatformId::Facebook, PlatformId::Instagram]),
        )
        .await
        .unwrap();

    assert_eq!(report.status, AggregateStatus::Success);
    assert_eq!(factory.call_count(), 2);

    let ig_calls = factory.calls_for(PlatformId::Instagram);
    match &ig_calls[0].target {
        PublishTarget::Instagram {
            page_id,
            page_token,
            instagram_user_id,
        } => {
            assert_eq!(page_id, "page_a");
            assert_eq!(page_token, "page_a-token");
            assert_eq!(instagram_user_id, "acct_1");
        }
        other => panic!("Expected Instagram target, got {:?}", other),
    }

    // Success resets the draft.
    assert_eq!(composer.text(), "");
}

#[tokio::test]
async fn test_session_survives_reopen() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("session.json");

    {
        let store = CredentialStore::new(Arc::new(FileStorage::open(&path).unwrap()));
        store
            .set(PlatformId::TikTok, "tt-token", Some("open-id"))
            .unwrap();
    }

    let store = CredentialStore::new(Arc::new(FileStorage::open(&path).unwrap()));
    let credential = store.get(PlatformId::TikTok).unwrap();
    assert_eq!(credential.primary_token, "tt-token");
    assert_eq!(credential.secondary_token.as_deref(), Some("open-id"));

    // Disconnecting removes both entries, durably.
    store.clear(PlatformId::TikTok).unwrap();
    let store = CredentialStore::new(Arc::new(FileStorage::open(&path).unwrap()));
    let credential = store.get(PlatformId::TikTok).unwrap();
    assert!(!credential.is_connected());
    assert!(credential.secondary_token.is_none());
}

#[tokio::test]
async fn test_validation_rejection_keeps_session_interactive() {
    let store = CredentialStore::new(Arc::new(MemoryStorage::new()));
    store.set(PlatformId::YouTube, "yt-token", None).unwrap();

    let graph = Arc::new(MockGraph::new());
    let factory = Arc::new(MockPublisherFactory::new());
    let orchestrator = Orchestrator::new(
        store.clone(),
        AccountResolver::new(graph, store),
        factory.clone(),
    );

    let mut composer = Composer::new();
    composer.set_text("watch this");

    // No video attached: rejected with nothing attempted.
    let result = orchestrator
        .submit(&mut composer, &selection(&[PlatformId::YouTube]))
        .await;
    assert!(matches!(result, Err(OmnicastError::Validation(_))));
    assert_eq!(factory.call_count(), 0);
    assert!(!orchestrator.is_posting());

    // The same session accepts a corrected submission.
    composer
        .attach("clip.mp4", "video/mp4", vec![0u8; 128])
        .unwrap();
    let report = orchestrator
        .submit(&mut composer, &selection(&[PlatformId::YouTube]))
        .await
        .unwrap();
    assert_eq!(report.status, AggregateStatus::Success);
    assert_eq!(factory.call_count(), 1);
    assert!(factory.calls()[0].has_attachment);
}

#[tokio::test]
async fn test_partial_failure_detail_reaches_report() {
    let store = CredentialStore::new(Arc::new(MemoryStorage::new()));
    store
        .set(PlatformId::TikTok, "tt-token", Some("open-id"))
        .unwrap();
    store.set(PlatformId::WhatsApp, "wa-token", None).unwrap();

    let factory = Arc::new(MockPublisherFactory::new());
    factory.fail_platform(PlatformId::TikTok, "upstream 500");

    let graph = Arc::new(MockGraph::new());
    let orchestrator = Orchestrator::new(
        store.clone(),
        AccountResolver::new(graph, store),
        factory.clone(),
    );

    let mut composer = Composer::new();
    composer.set_text("caption");
    composer
        .attach("clip.mp4", "video/mp4", vec![0u8; 64])
        .unwrap();

    let report = orchestrator
        .submit(
            &mut composer,
            &selection(&[PlatformId::TikTok, PlatformId::WhatsApp]),
        )
        .await
        .unwrap();

    assert_eq!(report.status, AggregateStatus::PartialFailure);
    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("upstream 500"));
    assert!(json.contains("partial_failure"));
}

#[tokio::test]
async fn test_refresh_task_refreshes_in_background() {
    let store = CredentialStore::new(Arc::new(MemoryStorage::new()));
    store.set_long_lived_token("expiring").unwrap();

    let mut graph = MockGraph::new();
    graph.long_lived_token = Some("fresh".to_string());
    // Two days out, under the threshold.
    graph.expires_at = chrono::Utc::now().timestamp() + 2 * 86_400;
    let graph = Arc::new(graph);

    let lifecycle = Arc::new(TokenLifecycle::new(graph, store.clone(), 7));
    let task = spawn_refresh_task(lifecycle, Duration::from_millis(20));

    tokio::time::sleep(Duration::from_millis(300)).await;
    drop(task);

    assert_eq!(store.long_lived_token().unwrap().as_deref(), Some("fresh"));
}
