//! Per-connection command engine.
//!
//! Each accepted connection runs its own [`Connection`] against the one
//! shared registry. The engine reads one command token at a time and
//! completes that command's full exchange, including any embedded payload
//! transfer, before reading the next token. `EXIT` (or the peer closing
//! the stream between commands) ends the session; a malformed exchange
//! terminates only this session.

use std::ffi::OsStr;
use std::path::{Component, Path};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use servicehub_core::ServiceRegistry;

use crate::wire::{self, ProtocolError, MAX_UPLOAD_BYTES};

/// Greeting sent once per connection, before the command loop.
pub const BANNER: &str = "Connected. Welcome to the service hub!";

/// Answer for an unknown command token.
pub const UNRECOGNIZED: &str = "Command not recognized.";

/// Wire sentinel answering an out-of-range activation index.
pub const INVALID_INDEX: &str = "null";

/// Ack for a deactivation request.
pub const DEACTIVATE_ACK: &str = "Service deactivated.";

/// Status answer for a completed reload.
pub const RELOAD_OK: &str = "Service list reloaded successfully.";

/// Recognized command tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ListServices,
    ActiveService,
    ExecuteService,
    GetInstructions,
    DeactivateService,
    ReloadServices,
    UploadPackage,
    Exit,
}

impl Command {
    /// Parse a wire token. Unknown tokens are data, not errors.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "LIST_SERVICES" => Some(Self::ListServices),
            "ACTIVE_SERVICE" => Some(Self::ActiveService),
            "EXECUTE_SERVICE" => Some(Self::ExecuteService),
            "GET_INSTRUCTIONS" => Some(Self::GetInstructions),
            "DEACTIVATE_SERVICE" => Some(Self::DeactivateService),
            "RELOAD_SERVICES" => Some(Self::ReloadServices),
            "UPLOAD_PACKAGE" => Some(Self::UploadPackage),
            "EXIT" => Some(Self::Exit),
            _ => None,
        }
    }
}

/// One client session. Holds the stream and nothing else; every piece of
/// service state is read from and written to the shared registry.
pub struct Connection<S> {
    stream: S,
    registry: Arc<ServiceRegistry>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, registry: Arc<ServiceRegistry>) -> Self {
        Self { stream, registry }
    }

    /// Run the session to completion.
    ///
    /// Returns `Ok` on an orderly end (`EXIT`, or the peer closing the
    /// stream between commands) and `Err` when the session dies on a
    /// protocol violation.
    pub async fn run(mut self) -> Result<(), ProtocolError> {
        wire::write_string(&mut self.stream, BANNER).await?;

        loop {
            // A close between commands is orderly; an EOF inside the token
            // frame is a truncated exchange and fails the session.
            let token = match wire::try_read_string(&mut self.stream).await? {
                Some(token) => token,
                None => {
                    tracing::debug!("client disconnected without EXIT");
                    return Ok(());
                }
            };
            tracing::debug!(command = %token, "command received");

            match Command::parse(&token) {
                Some(Command::ListServices) => {
                    let names = self.registry.names().await;
                    wire::write_u32(&mut self.stream, names.len() as u32).await?;
                    for name in names {
                        wire::write_string(&mut self.stream, &name).await?;
                    }
                }
                Some(Command::ActiveService) => {
                    let index = wire::read_i32(&mut self.stream).await?;
                    let activated = if index >= 0 {
                        self.registry.activate(index as usize).await
                    } else {
                        None
                    };
                    let answer = match activated {
                        Some(service) => service.name(),
                        None => INVALID_INDEX.to_string(),
                    };
                    wire::write_string(&mut self.stream, &answer).await?;
                }
                Some(Command::ExecuteService) => {
                    let input = wire::read_string(&mut self.stream).await?;
                    let answer = match self.registry.active_execute(&input).await {
                        Ok(result) => result,
                        Err(e) => format!("Service execution failed: {e}"),
                    };
                    wire::write_string(&mut self.stream, &answer).await?;
                }
                Some(Command::GetInstructions) => {
                    let help = self.registry.active_help().await;
                    wire::write_string(&mut self.stream, &help).await?;
                }
                Some(Command::DeactivateService) => {
                    self.registry.deactivate().await;
                    wire::write_string(&mut self.stream, DEACTIVATE_ACK).await?;
                }
                Some(Command::ReloadServices) => {
                    self.registry.reload().await;
                    wire::write_string(&mut self.stream, RELOAD_OK).await?;
                }
                Some(Command::UploadPackage) => {
                    self.handle_upload().await?;
                }
                Some(Command::Exit) => {
                    tracing::debug!("client requested exit");
                    return Ok(());
                }
                None => {
                    wire::write_string(&mut self.stream, UNRECOGNIZED).await?;
                }
            }
        }
    }

    /// Receive an uploaded package and trigger a registry reload.
    ///
    /// A bad file name is rejected as data: the payload is drained so the
    /// stream stays in sync and the session continues. Transfer failures
    /// (early close) terminate the session and leave no partial file
    /// behind.
    async fn handle_upload(&mut self) -> Result<(), ProtocolError> {
        let file_name = wire::read_string(&mut self.stream).await?;
        let size = wire::read_u64(&mut self.stream).await?;

        if size > MAX_UPLOAD_BYTES {
            return Err(ProtocolError::UploadTooLarge(size));
        }

        if let Err(reason) = validate_file_name(&file_name) {
            tracing::warn!(file_name = %file_name, reason, "upload rejected");
            let mut sink = tokio::io::sink();
            wire::copy_exact(&mut self.stream, &mut sink, size).await?;
            let answer = format!("Upload rejected: {reason}.");
            return wire::write_string(&mut self.stream, &answer).await;
        }

        tracing::info!(file_name = %file_name, size, "receiving package");

        tokio::fs::create_dir_all(self.registry.services_dir()).await?;
        let dest = self.registry.services_dir().join(&file_name);
        let mut file = tokio::fs::File::create(&dest).await?;

        if let Err(e) = wire::copy_exact(&mut self.stream, &mut file, size).await {
            // Do not keep a truncated package around.
            drop(file);
            let _ = tokio::fs::remove_file(&dest).await;
            return Err(e);
        }
        file.sync_all().await?;
        drop(file);

        self.registry.reload().await;
        tracing::info!(file_name = %file_name, "package received");

        let answer = format!("Service package received: {file_name}");
        wire::write_string(&mut self.stream, &answer).await?;
        self.stream.flush().await?;
        Ok(())
    }
}

/// Check that an uploaded file name stays inside the services directory.
fn validate_file_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("empty file name");
    }
    if name.len() > 255 {
        return Err("file name too long");
    }
    if name.contains('\0') {
        return Err("file name contains a NUL byte");
    }
    // `\` is a separator and `:` a drive or stream marker on Windows; ban
    // them everywhere so a name accepted on one platform is accepted on all.
    if name.contains('/') || name.contains('\\') {
        return Err("file name contains a path separator");
    }
    if name.contains(':') {
        return Err("file name contains a reserved character");
    }
    // The name must parse as exactly one normal component. `.`, `..`, root
    // markers, and Windows prefixes like `C:` all parse as something else,
    // and joining them onto the services directory would escape it.
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(c)), None) if c == OsStr::new(name) => Ok(()),
        _ => Err("file name is not a plain file name"),
    }
}
