use std::io;
use std::process::Command;

/// OS-level side effects: browser tabs, the desktop Spotify app, and the hostname
/// used to spot that app among playback devices.
pub trait Launcher: Send + Sync {
    fn open_url(&self, url: &str) -> io::Result<()>;
    /// Start the desktop app, optionally pointed at `uri`.
    fn launch_desktop(&self, uri: Option<&str>) -> io::Result<()>;
    fn hostname(&self) -> Option<String>;
}

/// Launcher backed by the platform's opener commands.
///
/// The hostname is read once when the launcher is built.
pub struct SystemLauncher {
    hostname: Option<String>,
}

impl SystemLauncher {
    pub fn new() -> Self {
        Self::with_hostname(read_hostname())
    }

    pub fn with_hostname(hostname: Option<String>) -> Self {
        if hostname.is_none() {
            tracing::debug!("hostname unavailable; desktop player detection disabled");
        }
        Self { hostname }
    }
}

impl Default for SystemLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl Launcher for SystemLauncher {
    fn open_url(&self, url: &str) -> io::Result<()> {
        tracing::info!("opening {}", url);
        open_in_browser(url)
    }

    fn launch_desktop(&self, uri: Option<&str>) -> io::Result<()> {
        tracing::info!("launching Spotify app with {:?}", uri);
        launch_spotify(uri)
    }

    fn hostname(&self) -> Option<String> {
        self.hostname.clone()
    }
}

fn read_hostname() -> Option<String> {
    let output = Command::new("hostname").output().ok()?;
    if !output.status.success() {
        return None;
    }
    parse_hostname(&output.stdout)
}

fn parse_hostname(stdout: &[u8]) -> Option<String> {
    let name = String::from_utf8_lossy(stdout).trim().to_string();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn open_in_browser(url: &str) -> io::Result<()> {
    #[cfg(target_os = "windows")]
    {
        Command::new("explorer").arg(url).spawn()?;
        Ok(())
    }

    #[cfg(target_os = "macos")]
    {
        Command::new("open").arg(url).spawn()?;
        Ok(())
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        Command::new("xdg-open").arg(url).spawn()?;
        Ok(())
    }
}

fn launch_spotify(uri: Option<&str>) -> io::Result<()> {
    #[cfg(target_os = "macos")]
    {
        let mut cmd = Command::new("open");
        cmd.args(["-a", "Spotify"]);
        if let Some(uri) = uri {
            cmd.arg(uri);
        }
        cmd.spawn()?;
        Ok(())
    }

    #[cfg(not(target_os = "macos"))]
    {
        let mut cmd = Command::new("spotify");
        if let Some(uri) = uri {
            cmd.arg(format!("--uri={}", uri));
        }
        cmd.spawn()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hostname() {
        assert_eq!(parse_hostname(b"my-laptop\n"), Some("my-laptop".to_string()));
        assert_eq!(parse_hostname(b"  \n"), None);
        assert_eq!(parse_hostname(b""), None);
    }

    #[test]
    fn test_hostname_is_read_once() {
        let launcher = SystemLauncher::with_hostname(Some("desk".to_string()));
        assert_eq!(launcher.hostname().as_deref(), Some("desk"));
        assert_eq!(launcher.hostname().as_deref(), Some("desk"));
        assert_eq!(SystemLauncher::with_hostname(None).hostname(), None);
    }
}
