use crate::error::{Error, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::OnceLock;

/// Sink for human-facing output. Registered once at startup; library
/// code reaches it through [`messenger`] and the `message!` macro.
pub trait Messenger: Sync + Send {
    fn message(&self, text: &str);
    fn start_progress(&self, label: &str, total: Option<u64>) -> Box<dyn Progress>;
}

/// Live display for one long-running step. `total` at creation decides
/// whether positions render against a known end or as a bare counter.
pub trait Progress: Sync + Send {
    fn update(&self, position: u64);
    fn set_label(&self, label: &str);
    fn done(&self);
}

static MESSENGER: OnceLock<Box<dyn Messenger>> = OnceLock::new();

/// Installs the process-wide messenger. Fails if one is already
/// registered.
pub fn register_messenger(m: Box<dyn Messenger>) -> Result<()> {
    match MESSENGER.set(m) {
        Ok(()) => Ok(()),
        Err(_) => Err(Error::InvalidInput(String::from(
            "messenger already registered",
        ))),
    }
}

/// The registered messenger, or a silent one before registration.
pub fn messenger() -> &'static dyn Messenger {
    static QUIET: QuietMessenger = QuietMessenger;
    match MESSENGER.get() {
        Some(m) => m.as_ref(),
        None => &QUIET,
    }
}

#[macro_export]
macro_rules! message {
    ($($arg:tt)*) => {
        $crate::logging::messenger().message(&format!($($arg)*))
    };
}

struct QuietMessenger;

struct QuietProgress;

impl Progress for QuietProgress {
    fn update(&self, _position: u64) {}
    fn set_label(&self, _label: &str) {}
    fn done(&self) {}
}

impl Messenger for QuietMessenger {
    fn message(&self, _text: &str) {}

    fn start_progress(&self, _label: &str, _total: Option<u64>) -> Box<dyn Progress> {
        Box::new(QuietProgress)
    }
}

/// Terminal output: plain lines on stdout, indicatif bars for
/// progress.
pub struct ConsoleMessenger;

impl ConsoleMessenger {
    pub fn register() -> Result<()> {
        register_messenger(Box::new(ConsoleMessenger))
    }
}

struct ConsoleProgress {
    bar: ProgressBar,
}

impl Progress for ConsoleProgress {
    fn update(&self, position: u64) {
        self.bar.set_position(position);
    }

    fn set_label(&self, label: &str) {
        self.bar.set_message(label);
    }

    fn done(&self) {
        self.bar.finish();
    }
}

impl Messenger for ConsoleMessenger {
    fn message(&self, text: &str) {
        for line in text.split('\n') {
            println!("{}", line);
        }
    }

    fn start_progress(&self, label: &str, total: Option<u64>) -> Box<dyn Progress> {
        let bar = match total {
            Some(t) => {
                let b = ProgressBar::new(t);
                b.set_style(
                    ProgressStyle::default_bar()
                        .template("[{elapsed_precise}] {bar:50.green/white} {pos}/{len} {msg}")
                        .progress_chars("=> "),
                );
                b
            }
            None => {
                let b = ProgressBar::new_spinner();
                b.set_style(ProgressStyle::default_spinner().template("{spinner} {pos} {msg}"));
                b
            }
        };
        bar.set_message(label);
        Box::new(ConsoleProgress { bar: bar })
    }
}
