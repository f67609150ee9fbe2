//! Settings store integration tests

use std::sync::Arc;

use slipway::errors::SlipwayError;
use slipway::storage::layout::StorageLayout;
use slipway::storage::settings::DeploySettings;
use slipway::storage::store::SettingsStore;

fn settings(webhook_url: &str) -> DeploySettings {
    DeploySettings {
        webhook_url: webhook_url.to_string(),
        api_token: "tok_123".to_string(),
        project_id: "prj_1".to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn get_returns_none_before_first_save() {
    let dir = tempfile::tempdir().unwrap();
    let store = SettingsStore::new(&StorageLayout::new(dir.path()), "development");

    assert!(store.get().await.unwrap().is_none());
}

#[tokio::test]
async fn set_rejects_missing_webhook_url() {
    let dir = tempfile::tempdir().unwrap();
    let store = SettingsStore::new(&StorageLayout::new(dir.path()), "development");

    let result = store.set(DeploySettings::default()).await;
    assert!(matches!(result, Err(SlipwayError::ValidationError(_))));
    // Nothing was persisted
    assert!(store.get().await.unwrap().is_none());
}

#[tokio::test]
async fn set_then_get_round_trips_and_stamps_updated_at() {
    let dir = tempfile::tempdir().unwrap();
    let store = SettingsStore::new(&StorageLayout::new(dir.path()), "development");

    let saved = store
        .set(settings("https://hooks.example.com/deploy/abc"))
        .await
        .unwrap();
    assert!(saved.updated_at.is_some());

    let loaded = store.get().await.unwrap().unwrap();
    assert_eq!(loaded.webhook(), Some("https://hooks.example.com/deploy/abc"));
    assert_eq!(loaded.token(), Some("tok_123"));
    assert_eq!(loaded.updated_at, saved.updated_at);
}

#[tokio::test]
async fn environments_are_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let layout = StorageLayout::new(dir.path());
    let development = Arc::new(SettingsStore::new(&layout, "development"));
    let production = Arc::new(SettingsStore::new(&layout, "production"));

    development
        .set(settings("https://hooks.example.com/deploy/dev"))
        .await
        .unwrap();

    assert!(production.get().await.unwrap().is_none());
    assert!(development.get().await.unwrap().is_some());
}

#[tokio::test]
async fn overwrites_replace_previous_settings() {
    let dir = tempfile::tempdir().unwrap();
    let store = SettingsStore::new(&StorageLayout::new(dir.path()), "development");

    store
        .set(settings("https://hooks.example.com/deploy/first"))
        .await
        .unwrap();
    store
        .set(DeploySettings {
            webhook_url: "https://hooks.example.com/deploy/second".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    let loaded = store.get().await.unwrap().unwrap();
    assert_eq!(
        loaded.webhook(),
        Some("https://hooks.example.com/deploy/second")
    );
    // Optional fields were cleared by the overwrite
    assert!(loaded.token().is_none());
}
