//! Process-wide registry of in-flight temp files plus a lazily-installed
//! termination handler, so `Ctrl-C` during a long compress/decompress
//! leaves no partial archive behind.
//!
//! `SIGINT`/`SIGTERM` are watched from a dedicated background thread via
//! `signal_hook::iterator::Signals` rather than running cleanup directly in
//! signal-handler context, so the cleanup pass is free to take the
//! registry's mutex. After cleanup, the signal's previous disposition is
//! re-raised with `emulate_default_handler` instead of calling
//! `process::exit` ourselves — for an unhandled `SIGINT`/`SIGTERM` that
//! disposition is "terminate the process", so the process still dies by
//! that signal, just after temp files are gone.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};

use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;

static CANCELLED: AtomicBool = AtomicBool::new(false);
static REGISTRY: OnceLock<Mutex<HashSet<PathBuf>>> = OnceLock::new();
static HANDLER_INSTALLED: OnceLock<()> = OnceLock::new();

fn registry() -> &'static Mutex<HashSet<PathBuf>> {
    REGISTRY.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Whether a termination signal has been observed. Pipeline stages poll
/// this cooperatively between units of work.
pub fn is_cancelled() -> bool {
    CANCELLED.load(Ordering::SeqCst)
}

/// Installs the process-wide `SIGINT`/`SIGTERM` handler exactly once. Safe
/// to call from multiple archive writers; only the first call takes effect.
pub fn install_handler() {
    HANDLER_INSTALLED.get_or_init(|| {
        let mut signals = match Signals::new([SIGINT, SIGTERM]) {
            Ok(s) => s,
            Err(_) => return,
        };
        std::thread::spawn(move || {
            for sig in signals.forever() {
                CANCELLED.store(true, Ordering::SeqCst);
                if let Ok(paths) = registry().lock() {
                    for path in paths.iter() {
                        let _ = std::fs::remove_file(path);
                    }
                }
                // Re-raise to whatever the disposition was before we
                // installed this handler — for SIGINT/SIGTERM that's the
                // default action (terminate), so the process still exits
                // via the signal rather than an exit code we invented.
                let _ = signal_hook::low_level::emulate_default_handler(sig);
            }
        });
    });
}

/// RAII guard: registers a temp-file path for signal-triggered cleanup on
/// construction, unregisters on drop. A writer calls `disarm()` right
/// before the atomic rename so a signal landing after that point doesn't
/// unlink the file it just renamed away from.
pub struct TempFileGuard {
    path: PathBuf,
    armed: bool,
}

impl TempFileGuard {
    pub fn new(path: PathBuf) -> Self {
        install_handler();
        if let Ok(mut set) = registry().lock() {
            set.insert(path.clone());
        }
        Self { path, armed: true }
    }

    /// Stop tracking this path without deleting it — call once the file has
    /// been durably renamed into place.
    pub fn disarm(&mut self) {
        if self.armed {
            if let Ok(mut set) = registry().lock() {
                set.remove(&self.path);
            }
            self.armed = false;
        }
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        self.disarm();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_registers_and_disarms() {
        let path = std::env::temp_dir().join("fqz-signal-test-guard.tmp");
        let mut guard = TempFileGuard::new(path.clone());
        assert!(registry().lock().unwrap().contains(&path));
        guard.disarm();
        assert!(!registry().lock().unwrap().contains(&path));
    }
}
