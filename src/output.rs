/// Abstraction over user-facing output.
///
/// Commands write through this trait instead of `println!`/`eprintln!` so
/// tests can capture what a command prints.
pub trait UserOutput: Send + Sync {
    /// Informational status message
    fn status(&self, message: &str);

    /// Success message
    fn success(&self, message: &str);

    /// Error message
    fn error(&self, message: &str);
}

/// Standard CLI output: stdout/stderr with ANSI colors.
pub struct CliOutput;

impl UserOutput for CliOutput {
    fn status(&self, message: &str) {
        println!("{}", message);
    }

    fn success(&self, message: &str) {
        println!("\x1b[32m{}\x1b[0m", message);
    }

    fn error(&self, message: &str) {
        eprintln!("\x1b[31m{}\x1b[0m", message);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::UserOutput;
    use parking_lot::Mutex;

    /// Collects every line written, in order.
    #[derive(Default)]
    pub struct RecordingOutput {
        pub lines: Mutex<Vec<String>>,
    }

    impl RecordingOutput {
        pub fn text(&self) -> String {
            self.lines.lock().join("\n")
        }
    }

    impl UserOutput for RecordingOutput {
        fn status(&self, message: &str) {
            self.lines.lock().push(message.to_string());
        }

        fn success(&self, message: &str) {
            self.lines.lock().push(message.to_string());
        }

        fn error(&self, message: &str) {
            self.lines.lock().push(message.to_string());
        }
    }
}
