use indicatif::{ProgressBar, ProgressStyle};

const BAR_TEMPLATE: &str =
    "{bar:40.cyan/blue} {percent:>3}% {pos}/{len} frames [{elapsed_precise}<{eta_precise}] {msg}";

pub fn frame_bar(total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    let style = ProgressStyle::with_template(BAR_TEMPLATE).unwrap_or_else(|err| {
        log::warn!("invalid progress template: {err}");
        ProgressStyle::default_bar()
    });
    bar.set_style(style);
    bar
}
