mod reporter;

pub use reporter::{ConsoleReporter, Reporter, format_line};
