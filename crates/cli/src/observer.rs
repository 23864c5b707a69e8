//! Progress rendering over the orchestrator's observer hooks.

use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};

use ezbak_core::RunObserver;
use ezbak_index::FileStatus;

/// Renders run progress: stage lines, per-file lines in verbose mode, and a
/// byte counter while payloads stream.
pub(crate) struct ConsoleObserver {
    verbose: bool,
    quiet: bool,
    bar: Option<ProgressBar>,
}

impl ConsoleObserver {
    pub(crate) fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            bar: None,
        }
    }

    fn finish_bar(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }

    fn byte_bar(message: String) -> ProgressBar {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg} {bytes}")
                .expect("static template is valid"),
        );
        bar.set_message(message);
        bar
    }
}

impl RunObserver for ConsoleObserver {
    fn stage(&mut self, message: &str) {
        self.finish_bar();
        if self.quiet {
            return;
        }
        if self.verbose {
            self.bar = Some(Self::byte_bar(message.to_string()));
        } else {
            println!("{message}...");
        }
    }

    fn file(&mut self, path: &Path, status: FileStatus) {
        if !self.verbose {
            return;
        }
        let line = match status {
            FileStatus::Unchanged => format!("Skipping unchanged ({})", path.display()),
            FileStatus::New | FileStatus::Changed => format!("Adding {}", path.display()),
        };
        match &self.bar {
            Some(bar) => bar.println(line),
            None => println!("{line}"),
        }
    }

    fn bytes(&mut self, count: u64) {
        if let Some(bar) = &self.bar {
            bar.inc(count);
        }
    }
}

impl Drop for ConsoleObserver {
    fn drop(&mut self) {
        self.finish_bar();
    }
}
