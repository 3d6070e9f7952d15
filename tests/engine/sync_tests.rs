// Tests for the sync sequencer
// Every run goes through MemoryDownloader; no network access

use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use packsync::logging::LogLevel;
use packsync::{ResourceSet, SyncError, SyncSequencer, TransferProgress};

use super::support::{
    default_config, publish, resource_url, LogCapture, MemoryDownloader, Pack, MANIFEST_URL,
};

fn warned(capture: &LogCapture, needle: &str) -> bool {
    capture.warnings().iter().any(|line| line.contains(needle))
}

#[tokio::test]
async fn test_fresh_sync_downloads_everything() {
    let pack = Pack::new();
    let downloader = MemoryDownloader::new();
    let remote = publish(
        &downloader,
        &[("mods/a.jar", "alpha"), ("config/b.toml", "beta")],
        &[],
    );

    let report = pack.sequencer(downloader.clone()).run().await.unwrap();

    assert_eq!(report.downloaded, vec!["mods/a.jar", "config/b.toml"]);
    assert!(report.manifest_adopted);
    assert_eq!(pack.read("mods/a.jar"), "alpha");
    assert_eq!(pack.read("config/b.toml"), "beta");
    assert_eq!(ResourceSet::load(&pack.manifest_path).unwrap(), remote);
    assert!(!pack.temp_manifest().exists());
}

#[tokio::test]
async fn test_second_sync_downloads_nothing() {
    let pack = Pack::new();
    let downloader = MemoryDownloader::new();
    publish(&downloader, &[("mods/a.jar", "alpha"), ("mods/b.jar", "beta")], &[]);

    pack.sequencer(downloader.clone()).run().await.unwrap();
    downloader.clear_requests();

    let report = pack.sequencer(downloader.clone()).run().await.unwrap();

    assert!(report.downloaded.is_empty());
    assert_eq!(downloader.requests(), vec![MANIFEST_URL.to_string()]);
    assert!(report.manifest_adopted);
}

#[tokio::test]
async fn test_stale_file_is_replaced() {
    let pack = Pack::new();
    pack.write("mods/a.jar", "old");
    pack.write("mods/b.jar", "beta");
    let downloader = MemoryDownloader::new();
    publish(&downloader, &[("mods/a.jar", "new"), ("mods/b.jar", "beta")], &[]);

    let report = pack.sequencer(downloader.clone()).run().await.unwrap();

    assert_eq!(report.downloaded, vec!["mods/a.jar"]);
    assert_eq!(downloader.resource_requests(), vec![resource_url("mods/a.jar")]);
    assert_eq!(pack.read("mods/a.jar"), "new");
}

#[tokio::test]
async fn test_disabled_file_is_updated_and_stays_disabled() {
    let pack = Pack::new();
    pack.write("mods/a.jar.disabled", "old");
    let downloader = MemoryDownloader::new();
    publish(&downloader, &[("mods/a.jar", "new")], &[]);

    let report = pack.sequencer(downloader.clone()).run().await.unwrap();

    assert_eq!(report.downloaded, vec!["mods/a.jar"]);
    assert_eq!(pack.read("mods/a.jar.disabled"), "new");
    assert!(!pack.exists("mods/a.jar"));
    assert!(report.preserve_added.is_empty());
}

#[tokio::test]
async fn test_up_to_date_disabled_file_is_left_alone() {
    let pack = Pack::new();
    pack.write("mods/a.jar.disabled", "alpha");
    let downloader = MemoryDownloader::new();
    publish(&downloader, &[("mods/a.jar", "alpha")], &[]);

    let report = pack.sequencer(downloader.clone()).run().await.unwrap();

    assert!(report.downloaded.is_empty());
    assert!(downloader.resource_requests().is_empty());
    assert!(pack.exists("mods/a.jar.disabled"));
    assert!(!pack.exists("mods/a.jar"));
}

#[tokio::test]
async fn test_patches_remove_retired_files() {
    let pack = Pack::new();
    pack.write("mods/old.jar", "retired");
    pack.write("mods/gone.jar.disabled", "retired too");
    let downloader = MemoryDownloader::new();
    publish(
        &downloader,
        &[("mods/a.jar", "alpha")],
        &["mods/old.jar", "mods/gone.jar", "mods/never-installed.jar"],
    );

    let report = pack.sequencer(downloader.clone()).run().await.unwrap();

    assert_eq!(report.patches_removed, vec!["mods/old.jar", "mods/gone.jar"]);
    assert!(!pack.exists("mods/old.jar"));
    assert!(!pack.exists("mods/gone.jar.disabled"));
    assert!(report.preserve_added.is_empty());
}

#[tokio::test]
async fn test_user_installed_file_is_preserved() {
    let pack = Pack::new();
    pack.write("mods/mine.jar", "user content");
    pack.write("saves/world.dat", "outside managed folders");
    let downloader = MemoryDownloader::new();
    publish(&downloader, &[("mods/a.jar", "alpha")], &[]);

    let mut sequencer = pack.sequencer(downloader.clone());
    let report = sequencer.run().await.unwrap();

    assert_eq!(report.preserve_added, vec!["mods/mine.jar"]);
    assert_eq!(sequencer.config().preserve, vec!["mods/mine.jar"]);
    assert_eq!(pack.config().preserve, vec!["mods/mine.jar"]);
    assert_eq!(pack.read("mods/mine.jar"), "user content");

    // a later patch naming the same path must not delete it
    publish(&downloader, &[("mods/a.jar", "alpha")], &["mods/mine.jar"]);
    let report = pack.sequencer(downloader.clone()).run().await.unwrap();

    assert!(report.patches_removed.is_empty());
    assert!(pack.exists("mods/mine.jar"));
}

#[tokio::test]
async fn test_ignored_stale_file_is_not_downloaded() {
    let pack = Pack::new();
    let downloader = MemoryDownloader::new();
    publish(&downloader, &[("mods/a.jar", "alpha"), ("mods/debug.log", "noise")], &[]);

    let report = pack.sequencer(downloader.clone()).run().await.unwrap();

    assert_eq!(report.ignored, vec!["mods/debug.log"]);
    assert_eq!(report.downloaded, vec!["mods/a.jar"]);
    assert!(!pack.exists("mods/debug.log"));
}

#[tokio::test]
async fn test_empty_url_is_skipped_with_warning() {
    let pack = Pack::new();
    let downloader = MemoryDownloader::new();
    let mut remote = publish(&downloader, &[("mods/a.jar", "alpha")], &[]);
    remote.resources[0].url.clear();
    remote.refresh_hash();
    downloader.serve_manifest(&remote);
    let capture = LogCapture::new();

    let report = pack
        .sequencer(downloader.clone())
        .with_log_observer(capture.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.skipped_without_url, vec!["mods/a.jar"]);
    assert!(report.downloaded.is_empty());
    assert!(report.manifest_adopted);
    assert!(capture
        .warnings()
        .iter()
        .any(|line| line.contains("WARNING: No download URL for mods/a.jar")));
}

#[tokio::test]
async fn test_welcome_message_is_forwarded_raw() {
    let pack = Pack::new();
    let downloader = MemoryDownloader::new();
    publish(&downloader, &[], &[]);
    let capture = LogCapture::new();

    pack.sequencer(downloader.clone())
        .with_log_observer(capture.clone())
        .run()
        .await
        .unwrap();

    let lines = capture.lines();
    assert!(lines.contains(&(LogLevel::Raw, "Welcome aboard".to_string())));
    assert!(lines
        .last()
        .map(|(_, line)| line.ends_with("Done"))
        .unwrap_or(false));
}

#[tokio::test]
async fn test_progress_reports_bytes_and_final_marker() {
    let pack = Pack::new();
    let downloader = MemoryDownloader::new();
    publish(&downloader, &[("mods/a.jar", "alpha")], &[]);
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();

    pack.sequencer(downloader.clone())
        .with_progress_callback(Arc::new(move |p: &TransferProgress| {
            sink.lock().unwrap().push(p.clone())
        }))
        .run()
        .await
        .unwrap();

    let events = events.lock().unwrap();
    assert_eq!(
        *events,
        vec![
            TransferProgress::new("a.jar", 0, 5, 0, 1),
            TransferProgress::new("a.jar", 5, 5, 0, 1),
            TransferProgress::new("a.jar", 5, 5, 1, 1),
            TransferProgress::finished(1),
        ]
    );
}

#[tokio::test]
async fn test_unparseable_manifest_aborts_and_cleans_up() {
    let pack = Pack::new();
    let downloader = MemoryDownloader::new();
    downloader.serve(MANIFEST_URL, "{ not json");
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = errors.clone();

    let result = pack
        .sequencer(downloader.clone())
        .with_error_callback(Arc::new(move |message: &str, _: &SyncError| {
            sink.lock().unwrap().push(message.to_string())
        }))
        .run()
        .await;

    assert!(result.unwrap_err().is_parse());
    assert_eq!(errors.lock().unwrap().len(), 1);
    assert!(!pack.temp_manifest().exists());
    assert!(!pack.manifest_path.exists());
}

#[tokio::test]
async fn test_manifest_with_unsafe_path_is_rejected() {
    let pack = Pack::new();
    let downloader = MemoryDownloader::new();
    let mut remote = ResourceSet::new("pack");
    remote.resources.push(super::support::resource("../escape.jar", "x"));
    downloader.serve_manifest(&remote);

    let err = pack.sequencer(downloader.clone()).run().await.unwrap_err();

    assert!(err.is_parse());
    assert!(downloader.resource_requests().is_empty());
}

#[tokio::test]
async fn test_download_failure_aborts_once_and_keeps_manifest() {
    let pack = Pack::new();
    let downloader = MemoryDownloader::new();
    let previous = ResourceSet::new("pack");
    previous.save(&pack.manifest_path).unwrap();
    publish(&downloader, &[("mods/a.jar", "alpha"), ("mods/b.jar", "beta")], &[]);
    downloader.remove(&resource_url("mods/a.jar"));
    let errors = Arc::new(Mutex::new(0));
    let counter = errors.clone();

    let result = pack
        .sequencer(downloader.clone())
        .with_error_callback(Arc::new(move |_: &str, _: &SyncError| {
            *counter.lock().unwrap() += 1
        }))
        .run()
        .await;

    let err = result.unwrap_err();
    assert!(err.is_transport());
    assert_eq!(*errors.lock().unwrap(), 1);
    // nothing after the failing file is attempted
    assert_eq!(downloader.resource_requests(), vec![resource_url("mods/a.jar")]);
    assert_eq!(ResourceSet::load(&pack.manifest_path).unwrap(), previous);
    assert!(!pack.temp_manifest().exists());
}

#[tokio::test]
async fn test_unreachable_update_server_aborts() {
    let pack = Pack::new();
    let downloader = MemoryDownloader::new();

    let err = pack.sequencer(downloader.clone()).run().await.unwrap_err();

    assert!(matches!(err, SyncError::HttpStatus { status: 404, .. }));
    assert!(!pack.temp_manifest().exists());
    assert!(fs::read_dir(&pack.base).unwrap().next().is_none());
}

#[tokio::test]
async fn test_failed_manifest_adoption_is_a_warning() {
    let pack = Pack::new();
    // a non-empty directory cannot be replaced by the temp manifest
    fs::create_dir_all(&pack.manifest_path).unwrap();
    fs::write(pack.manifest_path.join("keep"), "x").unwrap();
    let downloader = MemoryDownloader::new();
    publish(&downloader, &[("mods/a.jar", "alpha")], &[]);
    let capture = LogCapture::new();

    let report = pack
        .sequencer(downloader.clone())
        .with_log_observer(capture.clone())
        .run()
        .await
        .unwrap();

    assert!(!report.manifest_adopted);
    assert_eq!(report.downloaded, vec!["mods/a.jar"]);
    assert!(!pack.temp_manifest().exists());
    assert!(pack.manifest_path.join("keep").exists());
    assert!(warned(&capture, "WARNING: Failed to adopt new manifest"));
}

#[tokio::test]
async fn test_failed_preserve_save_keeps_running() {
    let pack = Pack::new();
    pack.write("mods/mine.jar", "user content");
    let downloader = MemoryDownloader::new();
    publish(&downloader, &[("mods/a.jar", "alpha")], &[]);
    let capture = LogCapture::new();
    let config_path = pack.base.join("missing").join("dir").join("config.json");

    let mut sequencer = SyncSequencer::new(
        &pack.base,
        default_config(),
        &config_path,
        &pack.manifest_path,
        downloader.clone(),
    )
    .with_settle_delay(Duration::ZERO)
    .with_log_observer(capture.clone());
    let report = sequencer.run().await.unwrap();

    assert_eq!(report.preserve_added, vec!["mods/mine.jar"]);
    assert_eq!(sequencer.config().preserve, vec!["mods/mine.jar"]);
    assert!(!config_path.exists());
    assert_eq!(report.downloaded, vec!["mods/a.jar"]);
    assert!(warned(&capture, "WARNING: Failed to save preserve list"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_failed_patch_removal_is_a_warning() {
    use std::os::unix::fs::PermissionsExt;

    let pack = Pack::new();
    pack.write("mods/locked/old.jar", "retired");
    let locked = pack.path("mods/locked");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();
    // privileged users ignore directory permissions
    let writable = fs::write(locked.join("canary"), "").is_ok();
    let downloader = MemoryDownloader::new();
    publish(&downloader, &[("mods/a.jar", "alpha")], &["mods/locked/old.jar"]);
    let capture = LogCapture::new();

    let result = pack
        .sequencer(downloader.clone())
        .with_log_observer(capture.clone())
        .run()
        .await;
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    let report = result.unwrap();

    assert_eq!(report.downloaded, vec!["mods/a.jar"]);
    if writable {
        return;
    }
    assert!(report.patches_removed.is_empty());
    assert!(pack.exists("mods/locked/old.jar"));
    assert!(warned(&capture, "WARNING: Failed to remove"));
}

#[tokio::test]
async fn test_failed_re_enable_downloads_into_disabled_file() {
    let pack = Pack::new();
    pack.write("mods/a.jar.disabled", "old");
    // a directory in the way of the plain name blocks the rename
    pack.write("mods/a.jar/inner.txt", "blocker");
    let downloader = MemoryDownloader::new();
    publish(&downloader, &[("mods/a.jar", "new")], &[]);
    let capture = LogCapture::new();

    let report = pack
        .sequencer(downloader.clone())
        .with_log_observer(capture.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.downloaded, vec!["mods/a.jar"]);
    assert_eq!(pack.read("mods/a.jar.disabled"), "new");
    assert_eq!(pack.read("mods/a.jar/inner.txt"), "blocker");
    assert!(warned(&capture, "WARNING: Failed to re-enable"));
}

#[tokio::test]
async fn test_disabled_suffix_survives_failed_download() {
    let pack = Pack::new();
    pack.write("mods/a.jar.disabled", "old");
    let downloader = MemoryDownloader::new();
    publish(&downloader, &[("mods/a.jar", "new")], &[]);
    downloader.remove(&resource_url("mods/a.jar"));

    let err = pack.sequencer(downloader.clone()).run().await.unwrap_err();

    assert!(matches!(err, SyncError::HttpStatus { status: 404, .. }));
    assert_eq!(downloader.resource_requests(), vec![resource_url("mods/a.jar")]);
    assert_eq!(pack.read("mods/a.jar.disabled"), "old");
    assert!(!pack.exists("mods/a.jar"));
    assert!(!pack.temp_manifest().exists());
}
