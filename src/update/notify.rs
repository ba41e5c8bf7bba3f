//! Which update-check results turn into a user-visible prompt.

use crate::update::checker::UpdateCheckResult;
use crate::update::descriptor::AppUpdateDescriptor;
use crate::version::AppVersion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateNotifyMode {
    /// Prompt whenever a newer version is found.
    #[default]
    Always,
    /// Also report "up to date" and failed checks.
    AlwaysIncludingNegativeResult,
    /// Prompt only for a newer version the user has not dismissed before.
    OnlyIfNewerThanLastSeen,
    Never,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    UpdateAvailable(AppUpdateDescriptor),
    UpToDate { latest: String },
    CheckFailed(String),
}

pub fn notification_for(
    mode: UpdateNotifyMode,
    result: &UpdateCheckResult,
    last_seen: Option<&AppVersion>,
) -> Option<Notification> {
    if mode == UpdateNotifyMode::Never {
        return None;
    }
    match result {
        UpdateCheckResult::Successful { descriptor, newer: true } => {
            if mode == UpdateNotifyMode::OnlyIfNewerThanLastSeen {
                let already_seen = match (descriptor.app_version(), last_seen) {
                    (Ok(found), Some(seen)) => found <= *seen,
                    _ => false,
                };
                if already_seen {
                    return None;
                }
            }
            Some(Notification::UpdateAvailable(descriptor.clone()))
        }
        UpdateCheckResult::Successful { descriptor, newer: false } => {
            (mode == UpdateNotifyMode::AlwaysIncludingNegativeResult).then(|| {
                Notification::UpToDate {
                    latest: descriptor.version.clone(),
                }
            })
        }
        UpdateCheckResult::Failed(reason) => (mode == UpdateNotifyMode::AlwaysIncludingNegativeResult)
            .then(|| Notification::CheckFailed(reason.clone())),
    }
}
