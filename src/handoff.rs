//! Handing a chosen URL to the rest of the desktop: clipboard, browser and `git clone`.

use std::{
    env,
    io::Write,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use anyhow::Result;
use arboard::Clipboard as SystemClipboardHandle;

/// Destination for a copied clone URL.
pub(crate) trait ClipboardSink {
    fn set_text(&mut self, text: String) -> Result<()>;

    /// Which mechanism receives the text, reported back to the user.
    fn backend(&self) -> ClipboardBackend;
}

pub(crate) trait BrowserOpener {
    fn open(&mut self, url: &str) -> Result<()>;
}

/// Receives the committed clone URL once the picker closes.
pub(crate) trait CheckoutRunner {
    fn checkout(&mut self, url: &str) -> Result<()>;
}

const WL_COPY_ARGS: &[&str] = &[];
const XCLIP_ARGS: &[&str] = &["-selection", "clipboard"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ClipboardBackend {
    Arboard,
    WlCopy,
    Xclip,
}

impl ClipboardBackend {
    pub(crate) fn label(self) -> &'static str {
        match self {
            ClipboardBackend::Arboard => "system clipboard",
            ClipboardBackend::WlCopy => "wl-copy",
            ClipboardBackend::Xclip => "xclip",
        }
    }

    fn pipe_command(self) -> Option<(&'static str, &'static [&'static str])> {
        match self {
            ClipboardBackend::Arboard => None,
            ClipboardBackend::WlCopy => Some(("wl-copy", WL_COPY_ARGS)),
            ClipboardBackend::Xclip => Some(("xclip", XCLIP_ARGS)),
        }
    }
}

/// Graphical session the picker runs under, as far as copying is concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DisplaySession {
    Wayland,
    X11,
    Headless,
}

/// What the host offers for copying clone URLs.
pub(crate) trait ClipboardEnvironment {
    fn native_clipboard(&self) -> bool;
    fn session(&self) -> DisplaySession;
    fn has_program(&self, program: &str) -> bool;
}

struct HostEnvironment;

impl ClipboardEnvironment for HostEnvironment {
    fn native_clipboard(&self) -> bool {
        SystemClipboardHandle::new().is_ok()
    }

    fn session(&self) -> DisplaySession {
        if env::var_os("WAYLAND_DISPLAY").is_some() {
            DisplaySession::Wayland
        } else if env::var_os("DISPLAY").is_some() {
            DisplaySession::X11
        } else {
            DisplaySession::Headless
        }
    }

    fn has_program(&self, program: &str) -> bool {
        Command::new("sh")
            .arg("-c")
            .arg(format!("command -v {program} >/dev/null 2>&1"))
            .status()
            .is_ok_and(|status| status.success())
    }
}

/// Picks where `y` sends clone URLs. `None` disables copying.
pub(crate) fn detect_clipboard_backend(host: &dyn ClipboardEnvironment) -> Option<ClipboardBackend> {
    if host.native_clipboard() {
        return Some(ClipboardBackend::Arboard);
    }
    let fallback = match host.session() {
        DisplaySession::Wayland => ClipboardBackend::WlCopy,
        DisplaySession::X11 => ClipboardBackend::Xclip,
        DisplaySession::Headless => return None,
    };
    let (program, _) = fallback.pipe_command()?;
    host.has_program(program).then_some(fallback)
}

struct NativeClipboard {
    inner: SystemClipboardHandle,
}

impl ClipboardSink for NativeClipboard {
    fn set_text(&mut self, text: String) -> Result<()> {
        self.inner
            .set_text(text)
            .map_err(|err| anyhow::anyhow!("clipboard write failed: {err}"))
    }

    fn backend(&self) -> ClipboardBackend {
        ClipboardBackend::Arboard
    }
}

/// Copies by piping the URL into `wl-copy` or `xclip`.
struct PipedClipboard {
    backend: ClipboardBackend,
}

impl ClipboardSink for PipedClipboard {
    fn set_text(&mut self, text: String) -> Result<()> {
        let Some((program, args)) = self.backend.pipe_command() else {
            anyhow::bail!("{} does not take piped input", self.backend.label());
        };
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|err| anyhow::anyhow!("{program} failed to start: {err}"))?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes())?;
        }
        let status = child.wait()?;
        if !status.success() {
            anyhow::bail!("{program} exited with {status}");
        }
        Ok(())
    }

    fn backend(&self) -> ClipboardBackend {
        self.backend
    }
}

pub(crate) fn build_clipboard() -> Option<Box<dyn ClipboardSink>> {
    let Some(backend) = detect_clipboard_backend(&HostEnvironment) else {
        tracing::info!("no clipboard available, copying clone URLs is disabled");
        return None;
    };
    tracing::debug!(backend = backend.label(), "clipboard for clone URLs");
    match backend {
        ClipboardBackend::Arboard => SystemClipboardHandle::new()
            .ok()
            .map(|inner| Box::new(NativeClipboard { inner }) as Box<dyn ClipboardSink>),
        piped => Some(Box::new(PipedClipboard { backend: piped })),
    }
}

pub(crate) struct SystemBrowser;

impl BrowserOpener for SystemBrowser {
    fn open(&mut self, url: &str) -> Result<()> {
        open::that(url).map_err(|err| anyhow::anyhow!("open failed: {err}"))
    }
}

/// Prints the URL and, when a clone directory is configured, runs `git clone` there.
pub(crate) struct GitCloneRunner {
    clone_dir: Option<PathBuf>,
}

impl GitCloneRunner {
    pub(crate) fn new(clone_dir: Option<PathBuf>) -> Self {
        Self { clone_dir }
    }
}

impl CheckoutRunner for GitCloneRunner {
    fn checkout(&mut self, url: &str) -> Result<()> {
        println!("{url}");
        let Some(dir) = &self.clone_dir else {
            return Ok(());
        };
        std::fs::create_dir_all(dir)?;
        let mut command = clone_command(url, dir);
        tracing::info!(url, dir = %dir.display(), "cloning repository");
        let status = command
            .status()
            .map_err(|err| anyhow::anyhow!("failed to run git: {err}"))?;
        if !status.success() {
            anyhow::bail!("git clone exited with {status}");
        }
        Ok(())
    }
}

fn clone_command(url: &str, dir: &Path) -> Command {
    let mut command = Command::new("git");
    command.arg("clone").arg(url).current_dir(dir);
    command
}
