use std::io::Write as _;
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// Spawns the thread that owns stderr. Log lines and the progress line are
/// both routed through it so they never interleave.
pub(crate) fn init(start: Instant, enable_progress: bool) -> Handle {
    let (sender, receiver) = mpsc::channel();

    let join_handle = std::thread::Builder::new()
        .name("term out".into())
        .spawn(move || {
            let mut printer = Printer {
                start,
                enable_progress,
                stderr: std::io::stderr(),
                progress: None,
                last_draw: start,
                dirty: false,
            };
            printer.run(&receiver);
        })
        .expect("failed to spawn thread");

    Handle {
        join_handle,
        sender,
    }
}

const REDRAW_PERIOD: Duration = Duration::from_millis(50);

enum Command {
    Finish,
    PrintRawLine(Vec<u8>),
    SetProgress(String),
    FreezeProgress,
}

struct Printer {
    start: Instant,
    enable_progress: bool,
    stderr: std::io::Stderr,
    progress: Option<String>,
    last_draw: Instant,
    // `progress` changed since it was last drawn
    dirty: bool,
}

impl Printer {
    fn run(&mut self, receiver: &mpsc::Receiver<Command>) {
        loop {
            let cmd = match self.next_deadline() {
                Some(timeout) if timeout.is_zero() => Err(mpsc::RecvTimeoutError::Timeout),
                Some(timeout) => receiver.recv_timeout(timeout),
                None => receiver.recv().map_err(mpsc::RecvTimeoutError::from),
            };

            match cmd {
                Ok(Command::Finish) | Err(mpsc::RecvTimeoutError::Disconnected) => {
                    self.close_progress();
                    break;
                }
                Ok(Command::PrintRawLine(line)) => self.print_line(&line),
                Ok(Command::SetProgress(progress)) => {
                    if self.enable_progress {
                        self.progress = Some(progress);
                        self.dirty = true;
                        if self.last_draw.elapsed() >= REDRAW_PERIOD {
                            self.draw_progress();
                        }
                    }
                }
                Ok(Command::FreezeProgress) => self.close_progress(),
                // Redraw to refresh the elapsed time or to show a pending update.
                Err(mpsc::RecvTimeoutError::Timeout) => self.draw_progress(),
            }
        }
    }

    fn next_deadline(&self) -> Option<Duration> {
        self.progress.as_ref()?;
        if self.dirty {
            Some(REDRAW_PERIOD.saturating_sub(self.last_draw.elapsed()))
        } else {
            Some(until_next_second(self.start.elapsed()))
        }
    }

    fn draw_progress(&mut self) {
        if let Some(ref progress) = self.progress {
            let line = progress_line(self.start.elapsed(), progress);
            handle_err(crossterm::queue!(
                self.stderr,
                crossterm::cursor::MoveToColumn(0),
                crossterm::style::Print(line),
                crossterm::terminal::Clear(crossterm::terminal::ClearType::UntilNewLine),
            ));
            handle_err(self.stderr.flush());
        }
        self.last_draw = Instant::now();
        self.dirty = false;
    }

    /// Prints a log line above the progress line.
    fn print_line(&mut self, line: &[u8]) {
        if self.progress.is_some() {
            handle_err(crossterm::queue!(
                self.stderr,
                crossterm::terminal::Clear(crossterm::terminal::ClearType::CurrentLine),
                crossterm::cursor::MoveToColumn(0),
            ));
            handle_err(self.stderr.write_all(line));
            self.draw_progress();
        } else {
            handle_err(self.stderr.write_all(line));
            handle_err(self.stderr.flush());
        }
    }

    /// Leaves the last progress line on screen and moves below it.
    fn close_progress(&mut self) {
        if self.progress.is_none() {
            return;
        }
        if self.dirty {
            self.draw_progress();
        }
        handle_err(crossterm::queue!(
            self.stderr,
            crossterm::style::Print('\n'),
            crossterm::cursor::MoveToColumn(0),
        ));
        handle_err(self.stderr.flush());
        self.progress = None;
    }
}

fn progress_line(elapsed: Duration, status: &str) -> String {
    let elapsed = elapsed.as_secs();
    format!(
        "[{:02}:{:02}:{:02}] {status}",
        elapsed / 3600,
        (elapsed / 60) % 60,
        elapsed % 60,
    )
}

fn handle_err<T>(r: std::io::Result<T>) -> T {
    r.expect("stderr write failed")
}

fn until_next_second(elapsed: Duration) -> Duration {
    match elapsed.subsec_nanos() {
        0 => Duration::ZERO,
        nanos => Duration::from_nanos(u64::from(1_000_000_000 - nanos)),
    }
}

pub(crate) struct Handle {
    join_handle: std::thread::JoinHandle<()>,
    sender: mpsc::Sender<Command>,
}

impl Handle {
    pub(crate) fn finish(self) {
        self.sender
            .send(Command::Finish)
            .expect("term out endpoint closed");
        self.join_handle.join().expect("term out thread panicked");
    }

    pub(crate) fn get_progress_print(&self) -> ProgressPrint {
        ProgressPrint {
            sender: self.sender.clone(),
        }
    }
}

#[derive(Clone)]
pub(crate) struct ProgressPrint {
    sender: mpsc::Sender<Command>,
}

impl ProgressPrint {
    pub(crate) fn set_progress(&self, progress: String) {
        self.send(Command::SetProgress(progress));
    }

    pub(crate) fn freeze_progress(&self) {
        self.send(Command::FreezeProgress);
    }

    pub(crate) fn print_raw_line(&self, line: Vec<u8>) {
        self.send(Command::PrintRawLine(line));
    }

    fn send(&self, cmd: Command) {
        self.sender.send(cmd).expect("term out endpoint closed");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{progress_line, until_next_second};

    #[test]
    fn test_progress_line() {
        assert_eq!(
            progress_line(Duration::from_secs(3725), "converting revision 0.1"),
            "[01:02:05] converting revision 0.1",
        );
        assert_eq!(progress_line(Duration::ZERO, "x"), "[00:00:00] x");
    }

    #[test]
    fn test_until_next_second() {
        assert_eq!(until_next_second(Duration::from_secs(4)), Duration::ZERO);
        assert_eq!(
            until_next_second(Duration::from_millis(4250)),
            Duration::from_millis(750),
        );
    }
}
