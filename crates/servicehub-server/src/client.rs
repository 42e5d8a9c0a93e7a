//! Programmatic protocol client.
//!
//! Speaks the same framing as the server, one command exchange at a time.
//! This is the embeddable half of a client application; presenting menus or
//! scanning local directories for uploadable packages is the caller's
//! business.

use std::path::Path;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::wire::{self, ProtocolError};

/// Client side of one hub session.
pub struct HubClient<S> {
    stream: S,
}

impl HubClient<TcpStream> {
    /// Connect to a hub server and consume the banner.
    ///
    /// Returns the client and the banner text.
    pub async fn connect(addr: impl tokio::net::ToSocketAddrs) -> Result<(Self, String), ProtocolError> {
        let stream = TcpStream::connect(addr).await?;
        Self::handshake(stream).await
    }
}

impl<S> HubClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Start a session over an established stream and consume the banner.
    pub async fn handshake(mut stream: S) -> Result<(Self, String), ProtocolError> {
        let banner = wire::read_string(&mut stream).await?;
        Ok((Self { stream }, banner))
    }

    /// `LIST_SERVICES`: names of every loaded service, in order.
    pub async fn list_services(&mut self) -> Result<Vec<String>, ProtocolError> {
        wire::write_string(&mut self.stream, "LIST_SERVICES").await?;
        let count = wire::read_u32(&mut self.stream).await?;
        let mut names = Vec::with_capacity(count as usize);
        for _ in 0..count {
            names.push(wire::read_string(&mut self.stream).await?);
        }
        Ok(names)
    }

    /// `ACTIVE_SERVICE`: activate by 0-based index. Answers the service
    /// name, or the `"null"` sentinel for an invalid index.
    pub async fn activate(&mut self, index: i32) -> Result<String, ProtocolError> {
        wire::write_string(&mut self.stream, "ACTIVE_SERVICE").await?;
        wire::write_i32(&mut self.stream, index).await?;
        wire::read_string(&mut self.stream).await
    }

    /// `EXECUTE_SERVICE`: run the active service with `input`.
    pub async fn execute(&mut self, input: &str) -> Result<String, ProtocolError> {
        wire::write_string(&mut self.stream, "EXECUTE_SERVICE").await?;
        wire::write_string(&mut self.stream, input).await?;
        wire::read_string(&mut self.stream).await
    }

    /// `GET_INSTRUCTIONS`: help text of the active service.
    pub async fn instructions(&mut self) -> Result<String, ProtocolError> {
        wire::write_string(&mut self.stream, "GET_INSTRUCTIONS").await?;
        wire::read_string(&mut self.stream).await
    }

    /// `DEACTIVATE_SERVICE`: clear the active selection.
    pub async fn deactivate(&mut self) -> Result<String, ProtocolError> {
        wire::write_string(&mut self.stream, "DEACTIVATE_SERVICE").await?;
        wire::read_string(&mut self.stream).await
    }

    /// `RELOAD_SERVICES`: re-scan the server's package directory.
    pub async fn reload(&mut self) -> Result<String, ProtocolError> {
        wire::write_string(&mut self.stream, "RELOAD_SERVICES").await?;
        wire::read_string(&mut self.stream).await
    }

    /// `UPLOAD_PACKAGE`: upload raw package bytes under `file_name`.
    pub async fn upload(&mut self, file_name: &str, bytes: &[u8]) -> Result<String, ProtocolError> {
        wire::write_string(&mut self.stream, "UPLOAD_PACKAGE").await?;
        wire::write_string(&mut self.stream, file_name).await?;
        wire::write_u64(&mut self.stream, bytes.len() as u64).await?;
        wire::write_payload(&mut self.stream, bytes).await?;
        wire::read_string(&mut self.stream).await
    }

    /// Upload a package file from disk, keeping its file name.
    pub async fn upload_file(&mut self, path: &Path) -> Result<String, ProtocolError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                ProtocolError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "path has no usable file name",
                ))
            })?
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        self.upload(&file_name, &bytes).await
    }

    /// Send an arbitrary command token and read one string back. Useful for
    /// probing; unknown tokens get the server's fixed rejection answer.
    pub async fn raw_command(&mut self, token: &str) -> Result<String, ProtocolError> {
        wire::write_string(&mut self.stream, token).await?;
        wire::read_string(&mut self.stream).await
    }

    /// `EXIT`: end the session. The server closes the connection.
    pub async fn exit(mut self) -> Result<(), ProtocolError> {
        wire::write_string(&mut self.stream, "EXIT").await?;
        Ok(())
    }
}
