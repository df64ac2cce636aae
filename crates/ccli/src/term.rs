//! Console access.
//!
//! The [`Console`] trait is the only way the editor touches the outside
//! world: one-byte blocking reads, a non-blocking poll, raw writes, the
//! window size, and switching the terminal between raw and original mode.
//!
//! [`FdConsole`] implements it over a pair of file descriptors using
//! termios. [`ScriptedConsole`] replays canned input and records output,
//! which is what the tests drive sessions with.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::os::fd::{AsRawFd, RawFd};
use std::rc::Rc;

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    pub cols: u16,
    pub rows: u16,
}

/// Input and output for a session.
pub trait Console {
    /// Block until one byte is available. `Ok(None)` means end of input.
    fn read_byte(&mut self) -> io::Result<Option<u8>>;

    /// Return a byte only if one is available right now.
    fn poll_byte(&mut self) -> io::Result<Option<u8>>;

    /// Write all of `bytes`.
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Size of the terminal, or `None` when the output is not a terminal.
    fn window_size(&self) -> Option<WindowSize>;

    /// Put the original terminal mode back (for running a child process).
    fn release(&mut self) -> io::Result<()>;

    /// Re-enter raw mode after [`Console::release`].
    fn acquire(&mut self) -> io::Result<()>;
}

/// A console over raw file descriptors.
///
/// Construction saves the terminal modes of both descriptors and switches
/// the input to non-canonical mode with echo and signal generation off, so
/// Ctrl-C arrives as the byte 0x03. The saved modes are restored on
/// [`Console::release`] and when the console is dropped.
///
/// The descriptors are borrowed: they must stay open for the lifetime of
/// the console and are not closed by it. Descriptors that are not terminals
/// (pipes, files) are used as plain byte streams.
#[derive(Debug)]
pub struct FdConsole {
    input: RawFd,
    output: RawFd,
    saved_in: Option<libc::termios>,
    saved_out: Option<libc::termios>,
    raw: bool,
}

impl FdConsole {
    /// Take over `input` and `output`, entering raw mode if `input` is a
    /// terminal.
    pub fn new(input: &impl AsRawFd, output: &impl AsRawFd) -> io::Result<Self> {
        Self::from_raw_fds(input.as_raw_fd(), output.as_raw_fd())
    }

    /// Take over standard input and standard output.
    pub fn stdio() -> io::Result<Self> {
        Self::from_raw_fds(libc::STDIN_FILENO, libc::STDOUT_FILENO)
    }

    fn from_raw_fds(input: RawFd, output: RawFd) -> io::Result<Self> {
        let mut console = Self {
            input,
            output,
            saved_in: get_termios(input),
            saved_out: get_termios(output),
            raw: false,
        };
        console.acquire()?;
        Ok(console)
    }

    /// True when the input descriptor is a terminal.
    pub fn is_tty(&self) -> bool {
        self.saved_in.is_some()
    }
}

impl Console for FdConsole {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut buf = [0u8; 1];
        loop {
            let n = unsafe { libc::read(self.input, buf.as_mut_ptr() as *mut libc::c_void, 1) };
            match n {
                1 => return Ok(Some(buf[0])),
                0 => return Ok(None),
                _ => {
                    let err = io::Error::last_os_error();
                    if err.kind() != io::ErrorKind::Interrupted {
                        return Err(err);
                    }
                }
            }
        }
    }

    fn poll_byte(&mut self) -> io::Result<Option<u8>> {
        let mut fds = libc::pollfd {
            fd: self.input,
            events: libc::POLLIN,
            revents: 0,
        };
        let ready = unsafe { libc::poll(&mut fds, 1, 0) };
        if ready < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(None);
            }
            return Err(err);
        }
        if ready == 0 || fds.revents & libc::POLLIN == 0 {
            return Ok(None);
        }
        self.read_byte()
    }

    fn write_all(&mut self, mut bytes: &[u8]) -> io::Result<()> {
        while !bytes.is_empty() {
            let n = unsafe {
                libc::write(
                    self.output,
                    bytes.as_ptr() as *const libc::c_void,
                    bytes.len(),
                )
            };
            if n < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }
            if n == 0 {
                return Err(io::ErrorKind::WriteZero.into());
            }
            bytes = &bytes[n as usize..];
        }
        Ok(())
    }

    fn window_size(&self) -> Option<WindowSize> {
        if !self.is_tty() {
            return None;
        }
        let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
        let ret = unsafe { libc::ioctl(self.input, libc::TIOCGWINSZ, &mut ws) };
        if ret != 0 || ws.ws_col == 0 {
            return None;
        }
        Some(WindowSize {
            cols: ws.ws_col,
            rows: ws.ws_row,
        })
    }

    fn release(&mut self) -> io::Result<()> {
        if !self.raw {
            return Ok(());
        }
        if let Some(saved) = &self.saved_in {
            set_termios(self.input, saved)?;
        }
        if let Some(saved) = &self.saved_out {
            set_termios(self.output, saved)?;
        }
        self.raw = false;
        Ok(())
    }

    fn acquire(&mut self) -> io::Result<()> {
        if self.raw {
            return Ok(());
        }
        if let Some(saved) = &self.saved_in {
            let mut raw = *saved;
            raw.c_lflag &= !(libc::ICANON | libc::ECHO | libc::ECHONL | libc::ISIG);
            raw.c_cc[libc::VMIN] = 1;
            raw.c_cc[libc::VTIME] = 0;
            set_termios(self.input, &raw)?;
        }
        self.raw = true;
        Ok(())
    }
}

impl Drop for FdConsole {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!("could not restore terminal mode: {e}");
        }
    }
}

fn get_termios(fd: RawFd) -> Option<libc::termios> {
    let mut termios: libc::termios = unsafe { std::mem::zeroed() };
    if unsafe { libc::tcgetattr(fd, &mut termios) } == 0 {
        Some(termios)
    } else {
        None
    }
}

fn set_termios(fd: RawFd, termios: &libc::termios) -> io::Result<()> {
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, termios) } == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Shared view of everything a [`ScriptedConsole`] has written.
#[derive(Debug, Clone, Default)]
pub struct Transcript(Rc<RefCell<Vec<u8>>>);

impl Transcript {
    /// All output so far, lossily decoded.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    /// Discard the output recorded so far.
    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

/// A console that reads from a canned byte script and records its output.
///
/// Polling returns scripted bytes just like blocking reads, so tests see the
/// same read-ahead behavior a fast typist produces on a real terminal.
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    input: VecDeque<u8>,
    output: Transcript,
    size: Option<WindowSize>,
    raw: bool,
}

impl ScriptedConsole {
    /// A console that will read `input` and then report end of input.
    pub fn new(input: impl AsRef<[u8]>) -> Self {
        Self {
            input: input.as_ref().iter().copied().collect(),
            output: Transcript::default(),
            size: None,
            raw: true,
        }
    }

    /// Pretend to be a terminal of the given size.
    pub fn with_window_size(mut self, cols: u16, rows: u16) -> Self {
        self.size = Some(WindowSize { cols, rows });
        self
    }

    /// Handle on the recorded output, usable after the console is moved
    /// into a session.
    pub fn transcript(&self) -> Transcript {
        self.output.clone()
    }

    /// Queue more input.
    pub fn feed(&mut self, input: impl AsRef<[u8]>) {
        self.input.extend(input.as_ref().iter().copied());
    }

    /// True unless the console has been released.
    pub fn is_raw(&self) -> bool {
        self.raw
    }
}

impl Console for ScriptedConsole {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        Ok(self.input.pop_front())
    }

    fn poll_byte(&mut self) -> io::Result<Option<u8>> {
        Ok(self.input.pop_front())
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.output.0.borrow_mut().extend_from_slice(bytes);
        Ok(())
    }

    fn window_size(&self) -> Option<WindowSize> {
        self.size
    }

    fn release(&mut self) -> io::Result<()> {
        self.raw = false;
        Ok(())
    }

    fn acquire(&mut self) -> io::Result<()> {
        self.raw = true;
        Ok(())
    }
}
