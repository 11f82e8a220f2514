use std::path::{Path, PathBuf};

const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024; // 10 MB

fn exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn rotate_file(path: &Path) {
    if let Ok(meta) = std::fs::metadata(path) {
        if meta.len() >= MAX_LOG_SIZE {
            let old = path.with_extension("old");
            let _ = std::fs::rename(path, old);
        }
    }
}

/// stderr plus an append-mode log file next to the exe. The file chain is
/// skipped rather than fatal when the directory is not writable.
pub fn init() {
    let log_path = exe_dir().join("poptrans.log");
    rotate_file(&log_path);

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path);

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339_millis(std::time::SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(log::LevelFilter::Info)
        .level_for("poptrans", log::LevelFilter::Debug)
        .chain(std::io::stderr());

    if let Ok(file) = log_file {
        dispatch = dispatch.chain(file);
    } else {
        eprintln!("Warning: could not open log file {}", log_path.display());
    }

    if let Err(e) = dispatch.apply() {
        eprintln!("Warning: logger init failed: {}", e);
    }
}
