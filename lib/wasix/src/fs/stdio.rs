use std::fmt;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One of the three standard streams, backed by any host reader or writer.
pub enum Stdio {
    Stdin(Box<dyn Read + Send>),
    Stdout(Box<dyn Write + Send>),
    Stderr(Box<dyn Write + Send>),
}

impl Stdio {
    pub fn inherit_stdin() -> Self {
        Stdio::Stdin(Box::new(io::stdin()))
    }

    pub fn inherit_stdout() -> Self {
        Stdio::Stdout(Box::new(io::stdout()))
    }

    pub fn inherit_stderr() -> Self {
        Stdio::Stderr(Box::new(io::stderr()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stdio::Stdin(_) => "stdin",
            Stdio::Stdout(_) => "stdout",
            Stdio::Stderr(_) => "stderr",
        }
    }
}

impl fmt::Debug for Stdio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Stdio").field(&self.name()).finish()
    }
}

/// An in-memory sink that can be handed to the session as stdout or stderr
/// while the embedder keeps a clone to inspect what the guest printed.
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn contents(&self) -> Vec<u8> {
        self.lock().clone()
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.lock()).into_owned()
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
