use std::io::Write;

use tracing::warn;

#[cfg(feature = "cli")]
use colored::Colorize;

/// Append-only text sink for the build log. One lifecycle event per line;
/// `print` exists for the polling line, which is finished by the status.
pub trait BuildLog {
    fn print(&mut self, text: &str);

    fn println(&mut self, line: &str) {
        self.print(line);
        self.print("\n");
    }

    /// Step headers, preceded by a blank line.
    fn banner(&mut self, line: &str) {
        self.println("");
        self.println(line);
    }

    fn success(&mut self, line: &str) {
        self.println(line);
    }

    fn failure(&mut self, line: &str) {
        self.println(line);
    }
}

/// Collects the log in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryLog {
    buffer: String,
}

impl MemoryLog {
    pub fn contents(&self) -> &str {
        &self.buffer
    }

    pub fn lines(&self) -> Vec<&str> {
        self.buffer.lines().collect()
    }

    pub fn contains_line(&self, line: &str) -> bool {
        self.buffer.lines().any(|l| l == line)
    }
}

impl BuildLog for MemoryLog {
    fn print(&mut self, text: &str) {
        self.buffer.push_str(text);
    }
}

/// Writes the log to any `io::Write`, flushing after each chunk so a
/// half-written polling line shows up while the request is in flight.
///
/// A failing writer does not abort the run. The first failure is reported
/// through `tracing` and later ones are dropped quietly.
pub struct WriterLog<W: Write> {
    out: W,
    broken: bool,
}

impl<W: Write> WriterLog<W> {
    pub fn new(out: W) -> Self {
        Self { out, broken: false }
    }

    /// Whether a write or flush has failed since creation.
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> BuildLog for WriterLog<W> {
    fn print(&mut self, text: &str) {
        let result = self
            .out
            .write_all(text.as_bytes())
            .and_then(|()| self.out.flush());
        if let Err(err) = result {
            if !self.broken {
                warn!(error = %err, "build log stopped accepting writes");
            }
            self.broken = true;
        }
    }
}

/// Terminal log with coloured step banners and results.
#[cfg(feature = "cli")]
pub struct ConsoleLog {
    inner: WriterLog<std::io::Stdout>,
}

#[cfg(feature = "cli")]
impl ConsoleLog {
    pub fn stdout() -> Self {
        Self {
            inner: WriterLog::new(std::io::stdout()),
        }
    }
}

#[cfg(feature = "cli")]
impl BuildLog for ConsoleLog {
    fn print(&mut self, text: &str) {
        self.inner.print(text);
    }

    fn banner(&mut self, line: &str) {
        self.println("");
        self.println(&line.bold().to_string());
    }

    fn success(&mut self, line: &str) {
        self.println(&line.green().to_string());
    }

    fn failure(&mut self, line: &str) {
        self.println(&line.red().to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_log_joins_partial_lines() {
        let mut log = MemoryLog::default();
        log.print("Polling ... ");
        log.println("RUNNING");
        log.banner("Step 2");
        log.success("done");
        log.failure("boom");

        assert_eq!(
            log.lines(),
            vec!["Polling ... RUNNING", "", "Step 2", "done", "boom"]
        );
        assert!(log.contains_line("done"));
        assert!(!log.contains_line("Polling ... "));
    }

    struct ClosedPipe {
        attempts: usize,
    }

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            self.attempts += 1;
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writer_log_survives_a_failing_writer() {
        let mut log = WriterLog::new(ClosedPipe { attempts: 0 });
        assert!(!log.is_broken());

        log.println("Step 1: Creating test execution request...");
        log.success("done");

        assert!(log.is_broken());
        // every chunk is still attempted
        assert_eq!(log.into_inner().attempts, 4);
    }

    #[test]
    fn writer_log_writes_through() {
        let mut log = WriterLog::new(Vec::new());
        log.println("JaaS endpoint: http://x/jaas");
        let bytes = log.into_inner();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "JaaS endpoint: http://x/jaas\n"
        );
    }
}
