//! Handlers driven against an in-memory catalog.

use std::path::Path;
use std::sync::Arc;

use modelkeep_cli::handlers;
use modelkeep_cli::{CliContext, CliError, IsolationCommand};
use modelkeep_core::test_utils::{
    FakeCatalog, FixedLocator, InMemoryBackupRepository, InMemoryFirewall, RecordingEmitter,
};
use modelkeep_core::{ErrorKind, ModelManager, Ports, Settings};
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

fn context(catalog: &FakeCatalog, firewall: InMemoryFirewall, executable: Option<&Path>) -> CliContext {
    let locator = executable.map_or_else(FixedLocator::missing, FixedLocator::found);
    let ports = Ports {
        daemon: Arc::new(catalog.daemon()),
        builder: Arc::new(catalog.builder()),
        backups: Arc::new(InMemoryBackupRepository::default()),
        firewall: Arc::new(firewall),
        locator: Arc::new(locator),
    };
    CliContext {
        manager: ModelManager::new(ports, Arc::new(RecordingEmitter::default())),
        daemon: Arc::new(catalog.daemon()),
        settings: Settings::default(),
        executable: executable.map(Path::to_path_buf),
    }
}

fn write_definition(dir: &TempDir, text: &str) -> std::path::PathBuf {
    let path = dir.path().join("edited.modelfile");
    std::fs::write(&path, text).unwrap();
    path
}

#[tokio::test]
async fn test_save_replaces_and_backs_up() {
    let dir = TempDir::new().unwrap();
    let catalog = FakeCatalog::new().with_model("foo:latest", "BASE llama2\nSYSTEM old");
    let ctx = context(&catalog, InMemoryFirewall::new(), None);

    let file = write_definition(&dir, "BASE llama2\nSYSTEM new");
    assert_ok!(handlers::mutate::save(&ctx, "foo:latest", &file).await);

    assert_eq!(
        catalog.definition_of("foo:latest").as_deref(),
        Some("BASE llama2\nSYSTEM new")
    );
    assert_eq!(assert_ok!(ctx.manager().list_backups().await), vec!["foo:latest"]);

    assert_ok!(handlers::mutate::restore(&ctx, "foo:latest").await);
    assert_eq!(
        catalog.definition_of("foo:latest").as_deref(),
        Some("BASE llama2\nSYSTEM old")
    );
}

#[tokio::test]
async fn test_create_rejects_invalid_name() {
    let dir = TempDir::new().unwrap();
    let catalog = FakeCatalog::new();
    let ctx = context(&catalog, InMemoryFirewall::new(), None);

    let file = write_definition(&dir, "BASE llama2");
    let err = handlers::mutate::create(&ctx, "bad name!", &file)
        .await
        .unwrap_err();
    assert_eq!(err.exit_code(), 65);
    assert!(catalog.names().is_empty());
}

#[tokio::test]
async fn test_missing_definition_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let catalog = FakeCatalog::new();
    let ctx = context(&catalog, InMemoryFirewall::new(), None);

    let err = handlers::mutate::create(&ctx, "foo", &dir.path().join("absent.modelfile"))
        .await
        .unwrap_err();
    assert!(matches!(err, CliError::Io(_)));
}

#[tokio::test]
async fn test_clone_uses_source_definition() {
    let catalog = FakeCatalog::new().with_model("llama2:latest", "BASE llama2\nSYSTEM hi");
    let ctx = context(&catalog, InMemoryFirewall::new(), None);

    handlers::mutate::clone(&ctx, "llama2:latest", "helper", None)
        .await
        .unwrap();
    assert!(catalog.names().iter().any(|n| n.starts_with("helper")));
}

#[tokio::test]
async fn test_clone_onto_itself_is_refused() {
    let catalog = FakeCatalog::new().with_model("foo", "BASE llama2");
    let ctx = context(&catalog, InMemoryFirewall::new(), None);

    let err = handlers::mutate::clone(&ctx, "foo", "foo", None)
        .await
        .unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn test_forced_delete() {
    let catalog = FakeCatalog::new().with_model("foo:latest", "BASE llama2");
    let ctx = context(&catalog, InMemoryFirewall::new(), None);

    handlers::delete::execute(&ctx, "foo:latest", true)
        .await
        .unwrap();
    assert!(catalog.definition_of("foo:latest").is_none());
}

#[tokio::test]
async fn test_export_writes_file() {
    let dir = TempDir::new().unwrap();
    let catalog = FakeCatalog::new().with_model("foo:latest", "BASE llama2\nSYSTEM hi");
    let ctx = context(&catalog, InMemoryFirewall::new(), None);

    let path = dir.path().join("foo.modelfile");
    handlers::export::execute(&ctx, "foo:latest", &path)
        .await
        .unwrap();
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("SYSTEM hi"));
}

#[tokio::test]
async fn test_check_unreachable_without_start() {
    let catalog = FakeCatalog::new().unreachable();
    let ctx = context(&catalog, InMemoryFirewall::new(), None);

    let err = handlers::check::execute(&ctx, false, 1).await.unwrap_err();
    assert!(matches!(
        err,
        CliError::Core {
            kind: ErrorKind::TransientConnectivity,
            ..
        }
    ));
    assert_eq!(err.exit_code(), 69);
}

#[tokio::test]
async fn test_isolation_round_trip() {
    let catalog = FakeCatalog::new();
    let ctx = context(
        &catalog,
        InMemoryFirewall::new(),
        Some(Path::new("/usr/bin/ollama")),
    );

    assert_ok!(handlers::isolation::execute(&ctx, IsolationCommand::On));
    assert!(assert_ok!(ctx.manager().isolation_state()).is_on());

    let err = assert_err!(handlers::pull::execute(&ctx, "mistral").await);
    assert!(err.to_string().contains("pull"));

    assert_ok!(handlers::isolation::execute(&ctx, IsolationCommand::Off));
    assert!(!assert_ok!(ctx.manager().isolation_state()).is_on());
    assert_ok!(handlers::pull::execute(&ctx, "mistral").await);
    assert!(catalog.calls().contains(&"pull mistral".to_string()));
}

#[tokio::test]
async fn test_isolation_without_executable() {
    let catalog = FakeCatalog::new();
    let ctx = context(&catalog, InMemoryFirewall::new(), None);

    let err = handlers::isolation::execute(&ctx, IsolationCommand::On).unwrap_err();
    assert!(matches!(
        err,
        CliError::Core {
            kind: ErrorKind::ExecutableNotFound,
            ..
        }
    ));
}
