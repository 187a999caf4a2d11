pub mod progress;
pub mod table;

pub use progress::{
    ConsoleNotifier, ProgressSpinner, format_progress_bar, render_promotion_progress,
    show_progress_bar,
};
pub use table::TableDisplay;
