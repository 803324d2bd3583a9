// Session log for the overlay process.
// Lines are buffered in memory and written on shutdown unless streaming is on.
use anyhow::Result;
use parking_lot::Mutex;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

pub struct SessionLogger {
    log_buffer: Mutex<Vec<String>>,
    log_path: PathBuf,
    log_dir: PathBuf,
    retention_count: usize,
    app_name: String,
    stream_to_stdout: bool,
}

impl SessionLogger {
    pub fn new(log_dir: PathBuf, app_name: &str, retention_count: usize, stream_to_stdout: bool) -> Result<Self> {
        fs::create_dir_all(&log_dir)?;

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let log_filename = format!("{}_{}.log", app_name, timestamp);
        let log_path = log_dir.join(&log_filename);

        let logger = Self {
            log_buffer: Mutex::new(Vec::new()),
            log_path,
            log_dir,
            retention_count,
            app_name: app_name.to_string(),
            stream_to_stdout,
        };

        logger.clean_old_logs()?;
        logger.log(format!("=== {} Session Started ===", app_name));

        Ok(logger)
    }

    pub fn log(&self, message: impl AsRef<str>) {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let log_line = format!("[{}] {}", timestamp, message.as_ref());

        mirror_to_debugger(&log_line);

        if self.stream_to_stdout {
            println!("{}", log_line);
            let _ = self.write_line_to_file(&log_line);
        } else {
            self.log_buffer.lock().push(log_line);
        }
    }

    fn write_line_to_file(&self, line: &str) -> Result<()> {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        writeln!(file, "{}", line)?;
        file.flush()?;
        Ok(())
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.log(format!("ERROR: {}", message.as_ref()));
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.log(format!("WARN: {}", message.as_ref()));
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.log(message);
    }

    pub fn log_path(&self) -> &PathBuf {
        &self.log_path
    }

    fn clean_old_logs(&self) -> Result<()> {
        let mut log_files: Vec<(PathBuf, std::time::SystemTime)> = Vec::new();
        let prefix = format!("{}_", self.app_name);

        if let Ok(entries) = fs::read_dir(&self.log_dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|s| s.to_str()) != Some("log") {
                    continue;
                }
                let is_ours = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|name| name.starts_with(&prefix))
                    .unwrap_or(false);
                if !is_ours {
                    continue;
                }
                if let Ok(modified) = entry.metadata().and_then(|m| m.modified()) {
                    log_files.push((path, modified));
                }
            }
        }

        log_files.sort_by(|a, b| b.1.cmp(&a.1));

        // The current session's file is not on disk yet, so keep one slot for it.
        let keep = self.retention_count.saturating_sub(1);
        for (path, _) in log_files.iter().skip(keep) {
            let _ = fs::remove_file(path);
        }

        Ok(())
    }

    pub fn flush_to_disk(&self) -> Result<()> {
        let mut buffer = self.log_buffer.lock();
        if buffer.is_empty() {
            return Ok(());
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;

        for line in buffer.iter() {
            writeln!(file, "{}", line)?;
        }

        file.flush()?;
        buffer.clear();

        Ok(())
    }

    pub fn finalize(&self) -> Result<()> {
        self.log(format!("=== {} Session Ended ===", self.app_name));
        self.flush_to_disk()?;
        Ok(())
    }
}

impl Drop for SessionLogger {
    fn drop(&mut self) {
        let _ = self.flush_to_disk();
    }
}

#[cfg(windows)]
fn mirror_to_debugger(line: &str) {
    use windows::core::HSTRING;
    use windows::Win32::System::Diagnostics::Debug::OutputDebugStringW;

    let text = HSTRING::from(format!("{}\n", line));
    unsafe {
        OutputDebugStringW(&text);
    }
}

#[cfg(not(windows))]
fn mirror_to_debugger(_line: &str) {}

static LOGGER: once_cell::sync::OnceCell<SessionLogger> = once_cell::sync::OnceCell::new();

pub fn init_logger(log_dir: PathBuf, app_name: &str, retention_count: usize, stream_to_stdout: bool) -> Result<()> {
    let logger = SessionLogger::new(log_dir, app_name, retention_count, stream_to_stdout)?;
    LOGGER.set(logger).map_err(|_| anyhow::anyhow!("Logger already initialized"))?;
    Ok(())
}

pub fn log(message: impl AsRef<str>) {
    if let Some(logger) = LOGGER.get() {
        logger.log(message);
    }
}

pub fn log_error(message: impl AsRef<str>) {
    if let Some(logger) = LOGGER.get() {
        logger.error(message);
    }
}

pub fn log_warn(message: impl AsRef<str>) {
    if let Some(logger) = LOGGER.get() {
        logger.warn(message);
    }
}

pub fn log_info(message: impl AsRef<str>) {
    if let Some(logger) = LOGGER.get() {
        logger.info(message);
    }
}

pub fn finalize_logs() -> Result<()> {
    if let Some(logger) = LOGGER.get() {
        logger.finalize()?;
    }
    Ok(())
}

pub fn get_log_path() -> Option<PathBuf> {
    LOGGER.get().map(|logger| logger.log_path.clone())
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::log_info(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::log_warn(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logger::log_error(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("frostpane-logger-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn buffered_lines_reach_disk_on_flush() {
        let dir = scratch_dir("flush");
        let logger = SessionLogger::new(dir.clone(), "overlay", 5, false).unwrap();
        logger.warn("capture timed out");
        logger.error("map failed");
        assert!(!logger.log_path().exists());

        logger.flush_to_disk().unwrap();
        let text = fs::read_to_string(logger.log_path()).unwrap();
        assert!(text.contains("Session Started"));
        assert!(text.contains("WARN: capture timed out"));
        assert!(text.contains("ERROR: map failed"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn streaming_mode_writes_immediately() {
        let dir = scratch_dir("stream");
        let logger = SessionLogger::new(dir.clone(), "overlay", 5, true).unwrap();
        logger.info("frame presented");
        let text = fs::read_to_string(logger.log_path()).unwrap();
        assert!(text.contains("frame presented"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn old_sessions_beyond_retention_are_removed() {
        let dir = scratch_dir("retention");
        for i in 0..6 {
            fs::write(dir.join(format!("overlay_2024010{}_000000.log", i)), "old").unwrap();
        }
        fs::write(dir.join("other_20240101_000000.log"), "keep").unwrap();

        let _logger = SessionLogger::new(dir.clone(), "overlay", 3, false).unwrap();

        let ours = fs::read_dir(&dir)
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().starts_with("overlay_"))
            .count();
        assert_eq!(ours, 2);
        assert!(dir.join("other_20240101_000000.log").exists());

        let _ = fs::remove_dir_all(&dir);
    }
}
