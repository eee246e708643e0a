//! Buffered file stream
//!
//! [`FileStream`] adapts a block-oriented [`FileHandle`] into a buffered
//! byte stream with the standard `Read`/`Write`/`Seek`/`BufRead` traits
//! plus a bounded putback operation. The refill/drain protocol:
//!
//! - The read buffer reserves a small putback region at its front. A
//!   refill slides the most recently consumed bytes into that region,
//!   then issues one handle read for the rest of the buffer; a zero-byte
//!   read is end of data, never an error.
//! - The write buffer accumulates until full, then drains with one handle
//!   write. A partial write keeps the unwritten tail at the buffer front
//!   for the next drain; a zero-byte write with data pending is a hard
//!   failure.
//! - Seeks drain the write buffer, reposition the handle, and invalidate
//!   both windows; stale buffered bytes never survive a seek.
//!
//! One stream has one logical owner; there is no internal locking.

use crate::error::{PackError, PackResult};
use crate::file::{FileHandle, OpenMode};
use crate::state;
use std::io::{self, BufRead, Read, Seek, SeekFrom, Write};
use tracing::warn;

/// Default buffer capacity in bytes.
pub const DEFAULT_CAPACITY: usize = 8 * 1024;

/// Bytes reserved at the front of the read buffer for putback.
const PUTBACK: usize = 2;

/// A buffered stream over one open virtual file.
///
/// Open it in exactly one [`OpenMode`]; the standard formatted I/O
/// machinery comes from the trait impls (`lines`, `read_to_string`,
/// `write!`, ...).
///
/// # Example
/// ```no_run
/// use packfs_core::{FileStream, OpenMode};
/// use std::io::BufRead;
///
/// let stream = FileStream::open("pack/themeinfo.txt", OpenMode::Read).unwrap();
/// for line in stream.lines() {
///     println!("{}", line.unwrap());
/// }
/// ```
pub struct FileStream {
    handle: FileHandle,
    /// Read window: `rbuf[r_begin..r_pos]` is the retained putback data,
    /// `rbuf[r_pos..r_end]` the bytes not yet consumed. Empty for write
    /// streams.
    rbuf: Vec<u8>,
    r_begin: usize,
    r_pos: usize,
    r_end: usize,
    /// Write accumulator, bounded by `w_cap`. Zero capacity for read
    /// streams.
    wbuf: Vec<u8>,
    w_cap: usize,
}

impl FileStream {
    /// Open a file through the process-wide search path / write
    /// directory and wrap it in a stream.
    pub fn open(virtual_path: &str, mode: OpenMode) -> PackResult<Self> {
        let handle = match mode {
            OpenMode::Read => state::open_read(virtual_path)?,
            OpenMode::Write => state::open_write(virtual_path)?,
            OpenMode::Append => state::open_append(virtual_path)?,
        };
        Ok(Self::from_handle(handle))
    }

    /// Wrap an already open handle with the default buffer capacity.
    pub fn from_handle(handle: FileHandle) -> Self {
        Self::with_capacity(handle, DEFAULT_CAPACITY)
    }

    /// Wrap an already open handle with an explicit buffer capacity.
    ///
    /// The capacity covers one direction only (the mode decides which)
    /// and is clamped so the putback region always leaves room for data.
    pub fn with_capacity(handle: FileHandle, capacity: usize) -> Self {
        let capacity = capacity.max(PUTBACK + 2);
        let (rbuf, w_cap) = match handle.mode() {
            OpenMode::Read => (vec![0u8; capacity], 0),
            OpenMode::Write | OpenMode::Append => (Vec::new(), capacity),
        };
        let start = PUTBACK.min(rbuf.len());
        Self {
            handle,
            rbuf,
            r_begin: start,
            r_pos: start,
            r_end: start,
            wbuf: Vec::new(),
            w_cap,
        }
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_open()
    }

    /// Virtual path the stream was opened with.
    pub fn name(&self) -> &str {
        self.handle.name()
    }

    pub fn mode(&self) -> OpenMode {
        self.handle.mode()
    }

    /// Total length of the underlying file.
    ///
    /// Buffered but unwritten bytes are not included until they drain.
    pub fn length(&mut self) -> PackResult<u64> {
        self.handle.length()
    }

    /// Step the read position back one byte.
    ///
    /// Possible while consumed bytes remain in the retained region; once
    /// the region is exhausted this fails deterministically rather than
    /// rereading from the handle.
    pub fn unread(&mut self) -> PackResult<()> {
        if self.r_pos > self.r_begin {
            self.r_pos -= 1;
            Ok(())
        } else {
            Err(PackError::Seek {
                path: self.handle.name().to_string(),
                offset: -1,
                reason: "putback region exhausted".to_string(),
            })
        }
    }

    /// Drain buffered writes and close the underlying handle.
    ///
    /// The stream is unusable afterwards; dropping an open stream does
    /// the same best-effort, logging instead of failing.
    pub fn close(&mut self) -> PackResult<()> {
        let drained = self.drain_all();
        self.invalidate_read_window();
        let closed = self.handle.close();
        drained.and(closed)
    }

    // ---- refill / drain ------------------------------------------------

    /// Fetch the next block from the handle, retaining up to
    /// [`PUTBACK`] consumed bytes at the buffer front.
    ///
    /// Returns the number of fresh bytes, with 0 meaning end of data.
    fn refill(&mut self) -> PackResult<usize> {
        if self.rbuf.is_empty() {
            return Err(PackError::io(
                self.handle.name(),
                io::Error::new(io::ErrorKind::PermissionDenied, "stream not readable"),
            ));
        }

        let keep = (self.r_pos - self.r_begin).min(PUTBACK);
        self.rbuf
            .copy_within(self.r_pos - keep..self.r_pos, PUTBACK - keep);
        self.r_begin = PUTBACK - keep;

        let fresh = self.handle.read(&mut self.rbuf[PUTBACK..])?;
        self.r_pos = PUTBACK;
        self.r_end = PUTBACK + fresh;
        Ok(fresh)
    }

    /// Issue one handle write for the buffered bytes.
    ///
    /// A partial write keeps the tail buffered for the next drain.
    fn drain(&mut self) -> PackResult<()> {
        if self.wbuf.is_empty() {
            return Ok(());
        }
        let written = self.handle.write(&self.wbuf)?;
        if written == 0 {
            return Err(PackError::io(
                self.handle.name(),
                io::Error::new(
                    io::ErrorKind::WriteZero,
                    "backend accepted no bytes with data pending",
                ),
            ));
        }
        self.wbuf.drain(..written);
        Ok(())
    }

    /// Drain until nothing is buffered. Succeeds immediately when the
    /// buffer is already empty.
    fn drain_all(&mut self) -> PackResult<()> {
        while !self.wbuf.is_empty() {
            self.drain()?;
        }
        Ok(())
    }

    fn invalidate_read_window(&mut self) {
        self.r_begin = PUTBACK.min(self.rbuf.len());
        self.r_pos = self.r_begin;
        self.r_end = self.r_begin;
    }

    fn buffered_unread(&self) -> usize {
        self.r_end - self.r_pos
    }
}

impl Read for FileStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        // Serve buffered bytes first.
        if self.r_pos < self.r_end {
            let n = self.buffered_unread().min(buf.len());
            buf[..n].copy_from_slice(&self.rbuf[self.r_pos..self.r_pos + n]);
            self.r_pos += n;
            return Ok(n);
        }

        // Requests at least as large as one refill bypass the buffer.
        let refill_capacity = self.rbuf.len().saturating_sub(PUTBACK);
        if !self.rbuf.is_empty() && buf.len() >= refill_capacity {
            let n = self.handle.read(buf).map_err(io::Error::from)?;
            self.invalidate_read_window();
            return Ok(n);
        }

        let fresh = self.refill().map_err(io::Error::from)?;
        if fresh == 0 {
            return Ok(0);
        }
        let n = fresh.min(buf.len());
        buf[..n].copy_from_slice(&self.rbuf[self.r_pos..self.r_pos + n]);
        self.r_pos += n;
        Ok(n)
    }
}

impl BufRead for FileStream {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.r_pos >= self.r_end {
            self.refill().map_err(io::Error::from)?;
        }
        Ok(&self.rbuf[self.r_pos..self.r_end])
    }

    fn consume(&mut self, amt: usize) {
        self.r_pos = (self.r_pos + amt).min(self.r_end);
    }
}

impl Write for FileStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.w_cap == 0 {
            // Not a write stream; the handle reports the mode error.
            return self.handle.write(buf).map_err(io::Error::from);
        }

        let mut done = 0;
        while done < buf.len() {
            let room = self.w_cap - self.wbuf.len();
            if room == 0 {
                self.drain().map_err(io::Error::from)?;
                continue;
            }
            let n = room.min(buf.len() - done);
            self.wbuf.extend_from_slice(&buf[done..done + n]);
            done += n;
        }
        Ok(buf.len())
    }

    /// Drain everything buffered and flush the handle.
    ///
    /// Flushing with nothing buffered is always a success.
    fn flush(&mut self) -> io::Result<()> {
        self.drain_all().map_err(io::Error::from)?;
        self.handle.flush().map_err(io::Error::from)
    }
}

impl Seek for FileStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        // Buffered writes must reach the handle before the position
        // moves; resetting the window without draining would drop them.
        self.drain_all().map_err(io::Error::from)?;

        let target = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::Current(delta) => {
                let tell = self.handle.tell().map_err(io::Error::from)? as i64;
                tell - self.buffered_unread() as i64 + delta
            }
            SeekFrom::End(delta) => {
                let length = self.handle.length().map_err(io::Error::from)? as i64;
                length + delta
            }
        };
        if target < 0 {
            return Err(io::Error::from(PackError::Seek {
                path: self.handle.name().to_string(),
                offset: target,
                reason: "negative offset".to_string(),
            }));
        }

        self.handle.seek(target as u64).map_err(io::Error::from)?;
        self.invalidate_read_window();
        Ok(target as u64)
    }

    /// Logical position: the handle position adjusted for buffered but
    /// unconsumed reads and buffered but unwritten bytes. Does not
    /// invalidate either buffer.
    fn stream_position(&mut self) -> io::Result<u64> {
        let tell = self.handle.tell().map_err(io::Error::from)?;
        Ok(tell - self.buffered_unread() as u64 + self.wbuf.len() as u64)
    }
}

impl Drop for FileStream {
    fn drop(&mut self) {
        if self.handle.is_open() {
            if let Err(e) = self.drain_all() {
                warn!(file = %self.handle.name(), error = %e, "buffered bytes lost on drop");
            }
        }
    }
}

impl std::fmt::Debug for FileStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStream")
            .field("name", &self.handle.name())
            .field("mode", &self.handle.mode())
            .field("buffered_unread", &self.buffered_unread())
            .field("buffered_unwritten", &self.wbuf.len())
            .finish()
    }
}
