//! Line-oriented TCP exchange for banner monitors.
//!
//! Each attempt opens its own blocking socket on the blocking thread pool;
//! the socket closes when the attempt's closure returns.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

/// An attempt failed with an I/O error.
#[derive(Debug)]
pub(crate) struct AttemptError {
    /// Whether the TCP connection had been established.
    pub connected: bool,
    pub source: io::Error,
}

impl AttemptError {
    fn connect(source: io::Error) -> Self {
        Self {
            connected: false,
            source,
        }
    }

    fn exchange(source: io::Error) -> Self {
        Self {
            connected: true,
            source,
        }
    }
}

/// A connected text-protocol peer.
pub(crate) struct LineSession {
    reader: BufReader<TcpStream>,
}

impl LineSession {
    /// Read one line without its terminator. `None` on end of stream.
    pub fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    /// Write a request and flush it.
    pub fn send(&mut self, request: &str) -> io::Result<()> {
        let stream = self.reader.get_mut();
        stream.write_all(request.as_bytes())?;
        stream.flush()
    }
}

/// Connect to `addr` and run `exchange` on the blocking pool.
///
/// `timeout` bounds the connect and every individual read and write. A zero
/// timeout means no timeout: the connect and all I/O block.
pub(crate) async fn attempt<T, F>(
    addr: SocketAddr,
    timeout: Duration,
    exchange: F,
) -> Result<T, AttemptError>
where
    T: Send + 'static,
    F: FnOnce(&mut LineSession) -> io::Result<T> + Send + 'static,
{
    let timeout = (!timeout.is_zero()).then_some(timeout);
    let task = tokio::task::spawn_blocking(move || {
        let stream = match timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        }
        .map_err(AttemptError::connect)?;
        stream
            .set_read_timeout(timeout)
            .and_then(|()| stream.set_write_timeout(timeout))
            .map_err(AttemptError::exchange)?;
        let mut session = LineSession {
            reader: BufReader::new(stream),
        };
        exchange(&mut session).map_err(AttemptError::exchange)
    });

    match task.await {
        Ok(result) => result,
        Err(e) => Err(AttemptError::connect(io::Error::other(e))),
    }
}

/// First whitespace-separated token of a response line.
pub(crate) fn first_token(line: &str) -> Option<&str> {
    line.split_whitespace().next()
}
