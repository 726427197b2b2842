// src/notifications/desktop.rs

use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, warn};

use super::{Notification, Notifier};

/// Shows desktop notifications through the platform's command-line helper
/// (`osascript` on macOS, `notify-send` elsewhere).
///
/// The helper is spawned and never awaited.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    backend: DesktopBackend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DesktopBackend {
    Osascript,
    NotifySend,
}

impl DesktopNotifier {
    pub fn detect() -> Self {
        let backend = if cfg!(target_os = "macos") {
            DesktopBackend::Osascript
        } else {
            DesktopBackend::NotifySend
        };
        Self { backend }
    }

    fn command(&self, n: &Notification) -> Command {
        match self.backend {
            DesktopBackend::Osascript => {
                let mut script = format!(
                    "display notification {} with title {}",
                    apple_quote(&n.message),
                    apple_quote(&n.title)
                );
                if n.sound {
                    script.push_str(" sound name \"Frog\"");
                }
                let mut cmd = Command::new("osascript");
                cmd.arg("-e").arg(script);
                cmd
            }
            DesktopBackend::NotifySend => {
                let mut cmd = Command::new("notify-send");
                if n.is_error() {
                    cmd.arg("--urgency=critical");
                }
                cmd.arg(&n.title).arg(&n.message);
                cmd
            }
        }
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, notification: &Notification) {
        // tokio::process needs a reactor; outside one there is nothing to do.
        if tokio::runtime::Handle::try_current().is_err() {
            debug!("no tokio runtime; skipping desktop notification");
            return;
        }

        let mut cmd = self.command(notification);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        if let Err(err) = cmd.spawn() {
            warn!(error = %err, "failed to show desktop notification");
        }
    }
}

fn apple_quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apple_quote_escapes_quotes() {
        assert_eq!(apple_quote(r#"say "hi""#), r#""say \"hi\"""#);
    }
}
