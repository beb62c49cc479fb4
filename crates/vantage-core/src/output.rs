//! # Output Multiplexer
//!
//! Routes rendered text to the console or to files shared between display
//! modules.
//!
//! Every module writes to a [`DestinationKey`]. File destinations are
//! reference counted by the modules pointing at them: the first module to
//! select a path opens it, the last one to leave flushes and closes it. The
//! console is always available and never opened or closed.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::debug;

use crate::error::{Result, VantageError};

/// Where a module's text goes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum DestinationKey
{
    /// The host's console
    #[default]
    Console,
    /// A file (or anything path-like the opener understands, e.g. a tty)
    File(PathBuf),
}

impl DestinationKey
{
    /// Interpret an `output` setting: empty means the console.
    pub fn from_setting(value: &str) -> Self
    {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Self::Console
        } else {
            Self::File(PathBuf::from(trimmed))
        }
    }

    /// The setting string for this key.
    pub fn to_setting(&self) -> String
    {
        match self {
            Self::Console => String::new(),
            Self::File(path) => path.display().to_string(),
        }
    }
}

impl fmt::Display for DestinationKey
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Self::Console => write!(f, "<console>"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Opens the stream behind a file destination.
pub trait StreamOpener
{
    /// Open `path` for writing.
    fn open(&mut self, path: &Path) -> io::Result<Box<dyn Write>>;
}

/// Opens regular files in append mode, creating them if needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileOpener;

impl StreamOpener for FileOpener
{
    fn open(&mut self, path: &Path) -> io::Result<Box<dyn Write>>
    {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Box::new(file))
    }
}

/// In-memory writer whose clones share one buffer.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer
{
    inner: Rc<RefCell<Vec<u8>>>,
}

impl SharedBuffer
{
    /// Empty buffer.
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String
    {
        String::from_utf8_lossy(&self.inner.borrow()).into_owned()
    }

    /// Discard the buffered text.
    pub fn clear(&self)
    {
        self.inner.borrow_mut().clear();
    }
}

impl Write for SharedBuffer
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>
    {
        self.inner.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()>
    {
        Ok(())
    }
}

struct Destination
{
    stream: Box<dyn Write>,
    writers: usize,
}

/// Reference-counted routing of text to destinations.
pub struct OutputMultiplexer
{
    console: Box<dyn Write>,
    files: HashMap<PathBuf, Destination>,
    opener: Box<dyn StreamOpener>,
}

impl fmt::Debug for OutputMultiplexer
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let open: HashMap<&PathBuf, usize> = self.files.iter().map(|(path, dest)| (path, dest.writers)).collect();
        f.debug_struct("OutputMultiplexer").field("files", &open).finish_non_exhaustive()
    }
}

impl Default for OutputMultiplexer
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl OutputMultiplexer
{
    /// Console on stdout, files opened with [`FileOpener`].
    pub fn new() -> Self
    {
        Self::with_parts(Box::new(io::stdout()), Box::new(FileOpener))
    }

    /// Custom console writer and stream opener.
    pub fn with_parts(console: Box<dyn Write>, opener: Box<dyn StreamOpener>) -> Self
    {
        Self {
            console,
            files: HashMap::new(),
            opener,
        }
    }

    /// Move `module` from `previous` to `next`.
    ///
    /// The new destination is acquired before the old one is released, so
    /// re-selecting the current destination never closes and reopens it. If
    /// opening `next` fails the module keeps `previous`.
    ///
    /// ## Errors
    ///
    /// `Io` if `next` has to be opened and cannot be, or if flushing a
    /// released destination fails (it is closed regardless).
    pub fn set_destination(
        &mut self,
        module: &str,
        previous: Option<&DestinationKey>,
        next: &DestinationKey,
    ) -> Result<()>
    {
        self.acquire(module, next)?;
        match previous {
            Some(previous) => self.release(module, previous),
            None => Ok(()),
        }
    }

    /// Take a reference on `key`, opening it on first use.
    ///
    /// ## Errors
    ///
    /// `Io` if the stream cannot be opened.
    pub fn acquire(&mut self, module: &str, key: &DestinationKey) -> Result<()>
    {
        let DestinationKey::File(path) = key else {
            return Ok(());
        };
        if let Some(destination) = self.files.get_mut(path) {
            destination.writers += 1;
            debug!(module, destination = %key, writers = destination.writers, "joined destination");
            return Ok(());
        }

        let stream = self.opener.open(path)?;
        debug!(module, destination = %key, "opened destination");
        self.files.insert(path.clone(), Destination { stream, writers: 1 });
        Ok(())
    }

    /// Drop a reference on `key`, closing it when nobody is left.
    ///
    /// ## Errors
    ///
    /// `Io` if the final flush fails. Releasing an unknown key is a no-op.
    pub fn release(&mut self, module: &str, key: &DestinationKey) -> Result<()>
    {
        let DestinationKey::File(path) = key else {
            return Ok(());
        };
        let Some(destination) = self.files.get_mut(path) else {
            return Ok(());
        };

        destination.writers -= 1;
        if destination.writers > 0 {
            debug!(module, destination = %key, writers = destination.writers, "left destination");
            return Ok(());
        }
        let Some(mut closing) = self.files.remove(path) else {
            return Ok(());
        };
        debug!(module, destination = %key, "closing destination");
        closing.stream.flush()?;
        Ok(())
    }

    /// Write `text` to `key`.
    ///
    /// ## Errors
    ///
    /// `DestinationNotFound` for a file no module holds, `Io` on write failure.
    pub fn write(&mut self, key: &DestinationKey, text: &str) -> Result<()>
    {
        let stream = self.stream(key)?;
        stream.write_all(text.as_bytes())?;
        stream.flush()?;
        Ok(())
    }

    /// Writer for `key`, for callers that format directly into it.
    ///
    /// ## Errors
    ///
    /// `DestinationNotFound` for a file no module holds.
    pub fn stream(&mut self, key: &DestinationKey) -> Result<&mut dyn Write>
    {
        let stream: &mut dyn Write = match key {
            DestinationKey::Console => self.console.as_mut(),
            DestinationKey::File(path) => self
                .files
                .get_mut(path)
                .ok_or_else(|| VantageError::DestinationNotFound(path.display().to_string()))?
                .stream
                .as_mut(),
        };
        Ok(stream)
    }

    /// Number of modules holding `key`. The console reports zero.
    pub fn writer_count(&self, key: &DestinationKey) -> usize
    {
        match key {
            DestinationKey::Console => 0,
            DestinationKey::File(path) => self.files.get(path).map_or(0, |destination| destination.writers),
        }
    }

    /// Whether a file destination is currently open.
    pub fn is_open(&self, key: &DestinationKey) -> bool
    {
        match key {
            DestinationKey::Console => true,
            DestinationKey::File(path) => self.files.contains_key(path),
        }
    }

    /// Paths of every open file destination.
    pub fn open_files(&self) -> Vec<&Path>
    {
        self.files.keys().map(PathBuf::as_path).collect()
    }
}

#[cfg(test)]
mod tests
{
    use std::cell::Cell;

    use super::*;

    #[derive(Clone, Default)]
    struct CountingOpener
    {
        opened: Rc<Cell<usize>>,
        buffer: SharedBuffer,
    }

    impl StreamOpener for CountingOpener
    {
        fn open(&mut self, _path: &Path) -> io::Result<Box<dyn Write>>
        {
            self.opened.set(self.opened.get() + 1);
            Ok(Box::new(self.buffer.clone()))
        }
    }

    struct FailingOpener;

    impl StreamOpener for FailingOpener
    {
        fn open(&mut self, path: &Path) -> io::Result<Box<dyn Write>>
        {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, path.display().to_string()))
        }
    }

    fn file(name: &str) -> DestinationKey
    {
        DestinationKey::File(PathBuf::from(name))
    }

    #[test]
    fn test_two_writers_share_one_stream()
    {
        let opener = CountingOpener::default();
        let mut mux = OutputMultiplexer::with_parts(Box::new(SharedBuffer::new()), Box::new(opener.clone()));
        let log = file("/tmp/dash.log");

        mux.set_destination("registers", None, &log).unwrap();
        mux.set_destination("assembly", None, &log).unwrap();
        assert_eq!(opener.opened.get(), 1);
        assert_eq!(mux.writer_count(&log), 2);

        mux.write(&log, "a").unwrap();
        mux.set_destination("registers", Some(&log), &DestinationKey::Console).unwrap();
        assert!(mux.is_open(&log));
        mux.write(&log, "b").unwrap();

        mux.set_destination("assembly", Some(&log), &DestinationKey::Console).unwrap();
        assert!(!mux.is_open(&log));
        assert_eq!(opener.buffer.contents(), "ab");
    }

    #[test]
    fn test_reselecting_keeps_stream_open()
    {
        let opener = CountingOpener::default();
        let mut mux = OutputMultiplexer::with_parts(Box::new(SharedBuffer::new()), Box::new(opener.clone()));
        let log = file("out");

        mux.set_destination("registers", None, &log).unwrap();
        mux.set_destination("registers", Some(&log), &log).unwrap();
        assert_eq!(opener.opened.get(), 1);
        assert_eq!(mux.writer_count(&log), 1);
    }

    #[test]
    fn test_unknown_file_is_absent()
    {
        let mut mux = OutputMultiplexer::with_parts(Box::new(SharedBuffer::new()), Box::new(CountingOpener::default()));
        let err = mux.write(&file("nowhere"), "text").unwrap_err();
        assert!(matches!(err, VantageError::DestinationNotFound(_)));
    }

    #[test]
    fn test_failed_open_keeps_previous()
    {
        let console = SharedBuffer::new();
        let mut mux = OutputMultiplexer::with_parts(Box::new(console.clone()), Box::new(FailingOpener));

        let err = mux.set_destination("registers", Some(&DestinationKey::Console), &file("denied"));
        assert!(matches!(err, Err(VantageError::Io(_))));
        mux.write(&DestinationKey::Console, "still here").unwrap();
        assert_eq!(console.contents(), "still here");
    }

    #[test]
    fn test_setting_strings()
    {
        assert_eq!(DestinationKey::from_setting("  "), DestinationKey::Console);
        assert_eq!(DestinationKey::from_setting("/dev/pts/3"), file("/dev/pts/3"));
        assert_eq!(file("x").to_setting(), "x");
    }
}
