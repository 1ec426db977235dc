//! Raw-mode terminal driver: attribute save/restore, keystroke decoding and
//! display-size discovery. Grounded on `aschey-kilo`'s `nix`/`libc` pairing
//! (§4.1).

use std::io::{self, Read, Write};
use std::os::fd::RawFd;

use libc::{c_ushort, STDOUT_FILENO, TIOCGWINSZ};
use nix::ioctl_read_bad;
use nix::libc::{VMIN, VTIME};
use nix::sys::termios::{
    tcgetattr, tcsetattr, ControlFlags, InputFlags, LocalFlags, OutputFlags, SetArg, Termios,
};

use crate::error::Result;
use crate::keys::Key;

ioctl_read_bad!(read_winsize, TIOCGWINSZ, WinSize);

#[derive(Debug)]
#[repr(C)]
struct WinSize {
    ws_row: c_ushort,
    ws_col: c_ushort,
    ws_xpixel: c_ushort,
    ws_ypixel: c_ushort,
}

/// Captures the original termios state so it can be restored on any exit
/// path, including fatal errors (spec.md §4.1, §5).
pub struct Terminal {
    stdin_fd: RawFd,
    orig_termios: Termios,
}

impl Terminal {
    pub fn new(stdin_fd: RawFd) -> Result<Self> {
        let orig_termios = tcgetattr(stdin_fd)?;
        Ok(Self {
            stdin_fd,
            orig_termios,
        })
    }

    /// Enables raw mode: disables signal generation, canonical input, echo,
    /// literal-next, flow control, CR->LF translation, break/parity/strip
    /// processing and all output post-processing; forces 8-bit characters;
    /// sets the read timeout to "return after 100ms even with zero bytes,
    /// immediately with one byte otherwise."
    pub fn enable_raw_mode(&self) -> Result<()> {
        let mut termios = self.orig_termios.clone();

        termios.input_flags &= !(InputFlags::BRKINT
            | InputFlags::ICRNL
            | InputFlags::INPCK
            | InputFlags::ISTRIP
            | InputFlags::IXON);

        termios.output_flags &= !(OutputFlags::OPOST);

        termios.local_flags &=
            !(LocalFlags::ECHO | LocalFlags::ICANON | LocalFlags::IEXTEN | LocalFlags::ISIG);

        termios.control_flags |= ControlFlags::CS8;

        termios.control_chars[VMIN] = 0;
        termios.control_chars[VTIME] = 1;

        tcsetattr(self.stdin_fd, SetArg::TCSAFLUSH, &termios)?;
        Ok(())
    }

    /// Restores the attributes captured at construction. Guaranteed to be
    /// called on every exit path by the caller (normal return, or after a
    /// `FatalIO` in `main`).
    pub fn disable_raw_mode(&self) -> Result<()> {
        tcsetattr(self.stdin_fd, SetArg::TCSAFLUSH, &self.orig_termios)?;
        Ok(())
    }

    /// Blocks (via the 100ms polling loop baked into raw mode) until one
    /// byte arrives, then decodes escape sequences for arrow/navigation
    /// keys. A lone or unrecognised escape is returned as `Key::Other(ESC)`.
    pub fn read_key(&self) -> Result<Key> {
        let mut stdin = io::stdin();
        loop {
            let mut b = 0u8;
            let n = stdin.read(std::slice::from_mut(&mut b))?;
            if n != 1 {
                continue;
            }

            if b != crate::keys::ESCAPE {
                return Ok(Key::Other(b));
            }

            let mut seq = [0u8; 2];
            if read_nonblocking(&mut stdin, &mut seq[..1])? < 1 {
                return Ok(Key::Other(b));
            }
            if read_nonblocking(&mut stdin, &mut seq[1..2])? < 1 {
                return Ok(Key::Other(b));
            }

            if seq[0] == b'[' {
                if seq[1].is_ascii_digit() {
                    let mut digit = [0u8; 1];
                    if read_nonblocking(&mut stdin, &mut digit)? < 1 {
                        return Ok(Key::Other(b));
                    }
                    if digit[0] != b'~' {
                        return Ok(Key::Other(b));
                    }
                    return Ok(match seq[1] {
                        b'1' => Key::Home,
                        b'3' => Key::Delete,
                        b'4' => Key::End,
                        b'5' => Key::PageUp,
                        b'6' => Key::PageDown,
                        b'7' => Key::Home,
                        b'8' => Key::End,
                        _ => Key::Other(b),
                    });
                }
                return Ok(match seq[1] {
                    b'A' => Key::ArrowUp,
                    b'B' => Key::ArrowDown,
                    b'C' => Key::ArrowRight,
                    b'D' => Key::ArrowLeft,
                    b'H' => Key::Home,
                    b'F' => Key::End,
                    _ => Key::Other(b),
                });
            } else if seq[0] == b'O' {
                return Ok(match seq[1] {
                    b'H' => Key::Home,
                    b'F' => Key::End,
                    _ => Key::Other(b),
                });
            }

            return Ok(Key::Other(b));
        }
    }

    /// Display size: ioctl first, falling back to "push the cursor off
    /// screen, query its position" when the ioctl fails or reports zero
    /// columns.
    pub fn get_window_size(&self) -> Result<(usize, usize)> {
        unsafe {
            let mut size: WinSize = std::mem::zeroed();
            if read_winsize(STDOUT_FILENO, &mut size).is_ok() && size.ws_col != 0 {
                return Ok((size.ws_row as usize, size.ws_col as usize));
            }
        }
        io::stdout().write_all(b"\x1b[999C\x1b[999B")?;
        io::stdout().flush()?;
        self.get_cursor_position()
    }

    fn get_cursor_position(&self) -> Result<(usize, usize)> {
        io::stdout().write_all(b"\x1b[6n")?;
        io::stdout().flush()?;

        let mut buf = Vec::new();
        let mut stdin = io::stdin();
        loop {
            let mut b = 0u8;
            if stdin.read(std::slice::from_mut(&mut b))? != 1 {
                continue;
            }
            if b == b'R' {
                break;
            }
            buf.push(b);
            if buf.len() >= 31 {
                break;
            }
        }

        let s = String::from_utf8_lossy(&buf);
        let rest = s
            .strip_prefix("\x1b[")
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "malformed cursor position report"))?;
        let (rows, cols) = rest
            .split_once(';')
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "malformed cursor position report"))?;
        let rows: usize = rows
            .parse()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "non-numeric row in cursor position report"))?;
        let cols: usize = cols
            .parse()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "non-numeric column in cursor position report"))?;
        Ok((rows, cols))
    }
}

/// `stdin` in raw mode already has `VMIN=0, VTIME=1`, so a plain blocking
/// read here returns after ~100ms with zero bytes rather than hanging --
/// good enough to probe "is the rest of the escape sequence here yet."
fn read_nonblocking(stdin: &mut io::Stdin, buf: &mut [u8]) -> io::Result<usize> {
    stdin.read(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ctrl_key_masks_high_bits() {
        assert_eq!(crate::keys::ctrl_key(b'q'), 17);
        assert_eq!(crate::keys::ctrl_key(b's'), 19);
        assert_eq!(crate::keys::ctrl_key(b'f'), 6);
    }
}
