use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown while a transfer is running.
pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("\x1b[33m{spinner}\x1b[0m {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"])
}

/// Green check mark followed by the final message.
pub fn ok_style() -> ProgressStyle {
    ProgressStyle::with_template("\x1b[32m✔\x1b[0m {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Red cross followed by the error message.
pub fn err_style() -> ProgressStyle {
    ProgressStyle::with_template("\x1b[31m✘\x1b[0m {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Run `f` behind a spinner labelled `label`.
///
/// The spinner draws to stderr and stays hidden when stderr is not a
/// terminal, so piped installs only see the `[INFO]` lines.
pub fn with_spinner<T, E>(label: &str, f: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(spinner_style());
    pb.set_message(format!("downloading {}", label));
    pb.enable_steady_tick(Duration::from_millis(120));

    let res = f();
    match &res {
        Ok(_) => {
            pb.set_style(ok_style());
            pb.finish_with_message(format!("downloaded {}", label));
        }
        Err(_) => {
            pb.set_style(err_style());
            pb.finish_with_message(format!("downloading {} failed", label));
        }
    }
    res
}
