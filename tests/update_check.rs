mod helpers;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use app_keeper::update::{apply_install, InstallAction};
use app_keeper::{
    AppManager, AppUpdateDescriptor, Error, Notification, StorageMode, UpdateCheckResult,
    UpdateChecker, UpdateNotifyMode,
};

use helpers::{context, local_client, serve, FakeProcess, FakeWindow};

const FOX: &[u8] = b"The quick brown fox jumps over the lazy dog";
const FOX_MD5: &str = "9E107D9D372BB6826BD81D3542A419D6";

fn descriptor_xml(version: &str, link: &str, md5: Option<&str>) -> Vec<u8> {
    let hash = md5
        .map(|h| format!("<MD5Hash>{}</MD5Hash>", h))
        .unwrap_or_default();
    format!(
        "<?xml version=\"1.0\"?>\n<AppUpdate>\n  <Version>{}</Version>\n  <DownloadLink>{}</DownloadLink>\n  <VersionNotes>Faster startup.</VersionNotes>\n  {}\n</AppUpdate>",
        version, link, hash
    )
    .into_bytes()
}

fn checker(dir: &std::path::Path, version: &str) -> UpdateChecker {
    UpdateChecker::new(version, dir.join("downloads"))
        .unwrap()
        .with_client(local_client())
}

fn descriptor(version: &str, link: String, md5: Option<&str>) -> AppUpdateDescriptor {
    AppUpdateDescriptor {
        version: version.into(),
        download_url: link,
        download_file_name: None,
        release_notes: None,
        release_date: None,
        md5: md5.map(str::to_string),
    }
}

#[tokio::test]
async fn newer_remote_version_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let base = serve(vec![(
        "/update.xml",
        200,
        descriptor_xml("1.2.0", "https://example.org/TestApp.msi", None),
    )]);

    let result = checker(tmp.path(), "1.1.9")
        .fetch_update(&format!("{}/update.xml", base))
        .await;
    let update = result.newer_version().expect("newer version");
    assert_eq!(update.version, "1.2.0");
    assert_eq!(update.release_notes.as_deref(), Some("Faster startup."));
    assert_eq!(update.md5, None);
}

#[tokio::test]
async fn equal_version_is_not_an_update() {
    let tmp = tempfile::tempdir().unwrap();
    let base = serve(vec![(
        "/update.xml",
        200,
        descriptor_xml("1.0.0", "https://example.org/TestApp.msi", None),
    )]);

    let result = checker(tmp.path(), "1.0.0")
        .fetch_update(&format!("{}/update.xml", base))
        .await;
    assert!(result.is_successful());
    assert!(result.newer_version().is_none());
}

#[tokio::test]
async fn missing_or_broken_descriptor_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let base = serve(vec![("/broken.xml", 200, b"<html>oops</html>".to_vec())]);
    let checker = checker(tmp.path(), "1.0.0");

    let missing = checker.fetch_update(&format!("{}/absent.xml", base)).await;
    assert!(matches!(missing, UpdateCheckResult::Failed(_)));
    let broken = checker.fetch_update(&format!("{}/broken.xml", base)).await;
    assert!(matches!(broken, UpdateCheckResult::Failed(_)));
}

#[tokio::test]
async fn download_with_matching_checksum_is_kept() {
    let tmp = tempfile::tempdir().unwrap();
    let base = serve(vec![("/files/TestApp-2.0.zip", 200, FOX.to_vec())]);
    let update = descriptor("2.0", format!("{}/files/TestApp-2.0.zip", base), Some(FOX_MD5));

    let path = checker(tmp.path(), "1.0")
        .download_update(&update)
        .await
        .expect("download");
    assert_eq!(path, tmp.path().join("downloads").join("TestApp-2.0.zip"));
    assert_eq!(std::fs::read(&path).unwrap(), FOX);
}

#[tokio::test]
async fn download_with_wrong_checksum_is_deleted() {
    let tmp = tempfile::tempdir().unwrap();
    let base = serve(vec![("/files/TestApp-2.0.zip", 200, FOX.to_vec())]);
    let update = descriptor(
        "2.0",
        format!("{}/files/TestApp-2.0.zip", base),
        Some("00000000000000000000000000000000"),
    );

    let result = checker(tmp.path(), "1.0").download_update(&update).await;
    assert!(result.is_none());
    assert!(!tmp.path().join("downloads").join("TestApp-2.0.zip").exists());
}

#[tokio::test]
async fn download_reports_progress_and_uses_declared_name() {
    let tmp = tempfile::tempdir().unwrap();
    let base = serve(vec![("/dl", 200, FOX.to_vec())]);
    let mut update = descriptor("2.0", format!("{}/dl", base), None);
    update.download_file_name = Some("Setup-2.0.msi".into());

    let mut last = 0.0f32;
    let path = checker(tmp.path(), "1.0")
        .download_update_with_progress(&update, |p| last = p)
        .await
        .expect("download");
    assert!(path.ends_with("Setup-2.0.msi"));
    assert_eq!(last, 1.0);
}

#[test]
fn background_check_delivers_result_and_wakes() {
    let tmp = tempfile::tempdir().unwrap();
    let base = serve(vec![(
        "/update.xml",
        200,
        descriptor_xml("3.0", "https://example.org/TestApp.msi", None),
    )]);
    let woken = Arc::new(AtomicBool::new(false));
    let flag = woken.clone();

    let handle = checker(tmp.path(), "2.9.9").check_for_updates(
        &format!("{}/update.xml", base),
        move || flag.store(true, Ordering::SeqCst),
    );
    let result = handle.wait_timeout(Duration::from_secs(20)).expect("result");
    assert_eq!(result.newer_version().map(|d| d.version.as_str()), Some("3.0"));

    // The wake callback runs right after the send.
    for _ in 0..100 {
        if woken.load(Ordering::SeqCst) {
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(woken.load(Ordering::SeqCst));
}

#[test]
fn manager_requires_an_update_url() {
    let tmp = tempfile::tempdir().unwrap();
    let mut manager =
        AppManager::<FakeWindow>::new(context(tmp.path(), StorageMode::PerUser)).unwrap();
    assert!(matches!(
        manager.check_for_updates(|| {}),
        Err(Error::MissingUpdateUrl)
    ));
}

#[test]
fn dismissed_version_is_not_prompted_again() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = context(tmp.path(), StorageMode::PerUser);
    let update = descriptor("1.5", "https://example.org/TestApp.msi".into(), None);
    let result = UpdateCheckResult::Successful {
        descriptor: update.clone(),
        newer: true,
    };

    let mut manager = AppManager::<FakeWindow>::new(ctx.clone()).unwrap();
    manager.set_notify_mode(UpdateNotifyMode::OnlyIfNewerThanLastSeen);
    assert_eq!(
        manager.handle_update_result(&result),
        Some(Notification::UpdateAvailable(update.clone()))
    );
    assert_eq!(manager.latest_update(), Some(&update));
    assert_eq!(manager.about().update, Some(update.clone()));
    manager.mark_update_seen(&update).unwrap();

    let mut restarted = AppManager::<FakeWindow>::new(ctx).unwrap();
    restarted.set_notify_mode(UpdateNotifyMode::OnlyIfNewerThanLastSeen);
    assert_eq!(restarted.handle_update_result(&result), None);

    restarted.set_notify_mode(UpdateNotifyMode::AlwaysIncludingNegativeResult);
    assert_eq!(
        restarted.handle_update_result(&UpdateCheckResult::Failed("offline".into())),
        Some(Notification::CheckFailed("offline".into()))
    );
}

#[test]
fn installer_package_is_handed_off_and_process_exits() {
    let tmp = tempfile::tempdir().unwrap();
    let package = tmp.path().join("Setup.msi");
    std::fs::write(&package, b"msi").unwrap();
    let process = FakeProcess::default();

    let action = apply_install(&package, true, &process).unwrap();
    assert_eq!(action, InstallAction::InstallerLaunched);
    let spawned = process.spawned.borrow();
    assert_eq!(
        spawned[0].1,
        vec![
            "/i".to_string(),
            package.display().to_string(),
            "/passive".to_string()
        ]
    );
    assert_eq!(*process.exits.borrow(), vec![0]);
}

#[test]
fn other_downloads_are_revealed_without_exiting() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("TestApp.zip");
    std::fs::write(&archive, b"zip").unwrap();
    let process = FakeProcess::default();

    assert_eq!(
        apply_install(&archive, true, &process).unwrap(),
        InstallAction::Revealed
    );
    assert_eq!(process.spawned.borrow().len(), 1);
    assert!(process.exits.borrow().is_empty());
}
