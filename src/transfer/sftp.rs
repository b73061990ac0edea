//! SFTP backend over libssh2

use std::fs::File;
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};

use ssh2::{OpenFlags, OpenType, Session, Sftp};

use super::{TransferClient, TransferSession};
use crate::config::RemoteConfig;
use crate::error::{Result, SkrinsError};
use crate::types::{RemoteObjectName, UploadStage};

/// Mode for newly created remote objects
const REMOTE_FILE_MODE: i32 = 0o644;

/// SFTP client for the single configured identity
pub struct SftpClient {
    host: String,
    user: String,
    key_path: PathBuf,
    passphrase: Option<String>,
    root: String,
}

impl SftpClient {
    pub fn new(config: &RemoteConfig) -> Self {
        Self {
            host: config.host.clone(),
            user: config.user.clone(),
            key_path: config.key_path.clone(),
            passphrase: config.passphrase.clone(),
            root: config.root.clone(),
        }
    }

    /// Remote path for an object; `root` carries exactly one trailing slash
    pub fn remote_path(&self, name: &RemoteObjectName) -> PathBuf {
        remote_path(&self.root, name)
    }

    fn connect(&self) -> std::result::Result<(Session, Sftp), String> {
        let tcp = TcpStream::connect(&self.host)
            .map_err(|e| format!("connect to {}: {}", self.host, e))?;

        let mut session = Session::new().map_err(|e| e.to_string())?;
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|e| format!("handshake with {}: {}", self.host, e))?;

        // Host key is not verified
        session
            .userauth_pubkey_file(
                &self.user,
                None,
                &self.key_path,
                self.passphrase.as_deref(),
            )
            .map_err(|e| format!("authenticate as {}: {}", self.user, e))?;
        if !session.authenticated() {
            return Err(format!("authentication as {} rejected", self.user));
        }

        let sftp = session
            .sftp()
            .map_err(|e| format!("start sftp subsystem: {}", e))?;
        Ok((session, sftp))
    }
}

impl TransferClient for SftpClient {
    fn open(&self) -> Result<Box<dyn TransferSession>> {
        let (session, sftp) = self
            .connect()
            .map_err(|e| SkrinsError::transfer(UploadStage::Connect, e))?;
        tracing::debug!("SFTP session opened to {}", self.host);

        Ok(Box::new(SftpSession {
            session,
            sftp,
            remote_root: self.root.clone(),
        }))
    }
}

struct SftpSession {
    session: Session,
    sftp: Sftp,
    remote_root: String,
}

impl TransferSession for SftpSession {
    fn send(&mut self, local: &Path, name: &RemoteObjectName) -> Result<u64> {
        // Local side first so a vanished file leaves no empty object behind
        let mut source =
            File::open(local).map_err(|e| SkrinsError::transfer(UploadStage::OpenSource, e))?;

        let remote = remote_path(&self.remote_root, name);
        let mut destination = self
            .sftp
            .open_mode(
                &remote,
                OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::TRUNCATE,
                REMOTE_FILE_MODE,
                OpenType::File,
            )
            .map_err(|e| SkrinsError::transfer(UploadStage::OpenDestination, e))?;

        let bytes = copy_to_remote(&mut source, &mut destination)?;

        tracing::info!(
            "Total of {} bytes copied to {}",
            bytes,
            remote.display()
        );
        Ok(bytes)
    }

    fn close(self: Box<Self>) {
        let SftpSession { session, sftp, .. } = *self;
        drop(sftp);
        if let Err(e) = session.disconnect(None, "upload complete", None) {
            tracing::debug!("SFTP disconnect failed: {}", e);
        }
    }
}

/// Remote file whose close can fail
trait RemoteFile: Write {
    fn finish(&mut self) -> std::result::Result<(), String>;
}

impl RemoteFile for ssh2::File {
    fn finish(&mut self) -> std::result::Result<(), String> {
        self.close().map_err(|e| e.to_string())
    }
}

/// Copy everything and close the remote handle.
///
/// The server may only report a failed write when the handle is closed, and
/// dropping an `ssh2::File` discards that error. Closing explicitly keeps a
/// short remote object from counting as uploaded.
fn copy_to_remote<R: Read, F: RemoteFile>(source: &mut R, destination: &mut F) -> Result<u64> {
    let bytes =
        io::copy(source, destination).map_err(|e| SkrinsError::transfer(UploadStage::Copy, e))?;
    destination
        .finish()
        .map_err(|e| SkrinsError::transfer(UploadStage::Copy, e))?;
    Ok(bytes)
}

fn remote_path(root: &str, name: &RemoteObjectName) -> PathBuf {
    PathBuf::from(format!("{}{}", root, name))
}
