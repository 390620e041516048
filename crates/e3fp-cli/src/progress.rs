use e3fp::workflows::progress::{Progress, ProgressCallback};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Drives an indicatif bar from the batch driver's progress events.
///
/// Workers report from multiple threads, so the bar sits behind a mutex.
#[derive(Clone)]
pub struct BatchProgressHandler {
    bar: Arc<Mutex<ProgressBar>>,
}

impl BatchProgressHandler {
    pub fn new() -> Self {
        let bar = ProgressBar::hidden();
        Self {
            bar: Arc::new(Mutex::new(bar)),
        }
    }

    pub fn callback(&self) -> ProgressCallback<'static> {
        let shared = self.bar.clone();

        Box::new(move |event: Progress| {
            let Ok(mut bar) = shared.lock() else {
                warn!("Progress bar mutex was poisoned; progress display disabled.");
                return;
            };

            match event {
                Progress::BatchStart { total_files } => {
                    let fresh = ProgressBar::new(total_files)
                        .with_style(Self::bar_style())
                        .with_message("fingerprinting");
                    fresh.set_draw_target(indicatif::ProgressDrawTarget::stderr());
                    *bar = fresh;
                }
                Progress::FileFinish { path, success } => {
                    bar.inc(1);
                    if !success && let Some(name) = path.file_name() {
                        bar.println(format!("  ✗ {}", name.to_string_lossy()));
                    }
                }
                Progress::BatchFinish => {
                    bar.finish_with_message("done");
                }
            }
        })
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {msg}",
        )
        .expect("Failed to create progress bar style template")
        .progress_chars("=>-")
    }
}

impl Default for BatchProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}
