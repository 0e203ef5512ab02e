//! Single-line progress printer for pipeline jobs, plus size formatting.

use streamjoin_core::coordinator::Progress;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Spawns a task printing `(percent, status)` events on one stderr line.
/// The task ends (and terminates the line) once every sender is dropped.
pub(crate) fn spawn_printer(label: String) -> (mpsc::Sender<Progress>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<Progress>(64);
    let handle = tokio::spawn(async move {
        let mut printed = false;
        while let Some(p) = rx.recv().await {
            eprint!("\r  {}  {:>3}%  {:<20}", label, p.percent, p.status);
            printed = true;
        }
        if printed {
            eprintln!();
        }
    });
    (tx, handle)
}

/// Binary-unit size with two decimals, e.g. `12.50 MB`.
pub(crate) fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}
