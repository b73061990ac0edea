//! Transfer client: puts local files onto the remote store.
//!
//! Sessions are single-use. One is opened per file, used for exactly one
//! write and closed right after, so an idle watcher never has to keep a
//! connection alive or reconnect. Nothing is retried here.

mod sftp;

pub use sftp::SftpClient;

use std::path::Path;

use crate::error::Result;
use crate::types::RemoteObjectName;

/// Opens sessions against the remote store
pub trait TransferClient: Send + Sync {
    /// Connect and authenticate
    fn open(&self) -> Result<Box<dyn TransferSession>>;
}

/// A connected session, good for one write
pub trait TransferSession {
    /// Create or truncate `<root>/<name>` and stream `local` into it.
    /// Returns the number of bytes written.
    fn send(&mut self, local: &Path, name: &RemoteObjectName) -> Result<u64>;

    /// Tear the session down. Failures are logged, not returned.
    fn close(self: Box<Self>);
}

/// Open a session, send one file, close the session
pub fn upload(client: &dyn TransferClient, local: &Path, name: &RemoteObjectName) -> Result<u64> {
    let mut session = client.open()?;
    let result = session.send(local, name);
    session.close();
    result
}
