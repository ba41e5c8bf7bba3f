//! Update checking against a remote descriptor.

pub mod checker;
pub mod descriptor;
pub mod notify;

pub use checker::{
    apply_install, file_md5, is_installer_package, verify_md5, InstallAction, UpdateCheckHandle,
    UpdateCheckResult, UpdateChecker,
};
pub use descriptor::AppUpdateDescriptor;
pub use notify::{notification_for, Notification, UpdateNotifyMode};
