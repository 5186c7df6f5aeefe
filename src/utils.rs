use parking_lot::Mutex;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Timestamped log that feeds the "Conversion Log" panel and the `log` facade.
///
/// Cheap to clone; every clone writes into the same message list.
#[derive(Clone)]
pub struct Logger {
    sender: mpsc::Sender<String>,
}

impl Logger {
    pub fn new(log_messages: Arc<Mutex<Vec<String>>>) -> Self {
        let (sender, receiver) = mpsc::channel();

        thread::spawn(move || {
            for message in receiver {
                log_messages.lock().push(message);
            }
        });

        Logger { sender }
    }

    pub fn log(&self, message: impl AsRef<str>) {
        log::info!("{}", message.as_ref());
        self.push(message.as_ref());
    }

    /// Same as [`Logger::log`], tagged so the panel renders it in red.
    pub fn error(&self, message: impl AsRef<str>) {
        log::error!("{}", message.as_ref());
        self.push(&format!("error: {}", message.as_ref()));
    }

    fn push(&self, message: &str) {
        let timestamp = chrono::Local::now().format("%H:%M:%S%.3f");
        // the panel is gone once the window closes
        let _ = self.sender.send(format!("[{}] {}", timestamp, message));
    }
}

pub fn is_error_line(line: &str) -> bool {
    line.contains("error") || line.contains("failed")
}

pub fn measure_time<F, T>(f: F) -> (T, Duration)
where
    F: FnOnce() -> T,
{
    let start = Instant::now();
    let result = f();
    let duration = start.elapsed();
    (result, duration)
}

pub fn get_memory_usage() -> String {
    if let Ok(mem_info) = sys_info::mem_info() {
        format!(
            "Memory: Total: {} MB, Free: {} MB, Used: {} MB",
            mem_info.total / 1024,
            mem_info.free / 1024,
            mem_info.total.saturating_sub(mem_info.free) / 1024
        )
    } else {
        "Unable to get memory info".to_string()
    }
}
