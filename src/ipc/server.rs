//! Unix socket server: one task per connection, every command serialized
//! through the supervisor lock.

use super::protocol::{AgentView, MAX_LINE_LENGTH, Request, Response};
use crate::error::{Result, WardenError};
use crate::supervisor::{AgentRecord, SharedSupervisor, Supervisor};
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::{UnixListener, UnixStream};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// A bound control socket, ready to serve.
#[derive(Debug)]
pub struct IpcServer {
    listener: UnixListener,
    socket_path: PathBuf,
    supervisor: SharedSupervisor,
    shutdown: CancellationToken,
}

impl IpcServer {
    /// Bind the control socket, replacing a stale socket file.
    ///
    /// The caller must already hold the daemon PID file, otherwise this
    /// would steal a live daemon's socket path.
    pub fn bind(
        socket_path: &Path,
        supervisor: SharedSupervisor,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        if let Some(parent) = socket_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                WardenError::UserError(format!(
                    "failed to create socket directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        match std::fs::remove_file(socket_path) {
            Ok(()) => tracing::info!(path = %socket_path.display(), "removed stale socket"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(WardenError::UserError(format!(
                    "failed to remove stale socket '{}': {}",
                    socket_path.display(),
                    e
                )));
            }
        }

        let listener = UnixListener::bind(socket_path).map_err(|e| {
            WardenError::UserError(format!(
                "failed to bind socket '{}': {}",
                socket_path.display(),
                e
            ))
        })?;

        if let Err(e) =
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))
        {
            tracing::warn!(path = %socket_path.display(), error = %e, "failed to restrict socket permissions");
        }

        tracing::info!(path = %socket_path.display(), "listening for controllers");
        Ok(Self {
            listener,
            socket_path: socket_path.to_path_buf(),
            supervisor,
            shutdown,
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Accept connections until the shutdown token fires, then stop every
    /// agent, drop open connections and remove the socket file.
    pub async fn run(self) {
        let IpcServer {
            listener,
            socket_path,
            supervisor,
            shutdown,
        } = self;
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, _addr)) => {
                        let supervisor = supervisor.clone();
                        let shutdown = shutdown.clone();
                        connections.spawn(async move {
                            if let Err(e) = handle_connection(stream, supervisor, shutdown).await {
                                tracing::debug!(error = %e, "controller connection closed");
                            }
                        });
                    }
                    Err(e) => tracing::warn!(error = %e, "failed to accept connection"),
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        tracing::info!("shutting down");
        supervisor.shutdown().await;
        connections.shutdown().await;
        drop(listener);

        match std::fs::remove_file(&socket_path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %socket_path.display(), error = %e, "failed to remove socket")
            }
        }
    }
}

// ============================================================================
// Connections
// ============================================================================

enum Frame {
    Line(Vec<u8>),
    Oversized,
    Eof,
}

/// Read one newline-terminated frame of at most [`MAX_LINE_LENGTH`] bytes.
///
/// An oversized frame is consumed up to its newline so the next request on
/// the connection still parses.
async fn read_frame<R>(reader: &mut R) -> io::Result<Frame>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let limit = MAX_LINE_LENGTH as u64 + 1;
    let n = (&mut *reader).take(limit).read_until(b'\n', &mut buf).await?;
    if n == 0 {
        return Ok(Frame::Eof);
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
        return Ok(Frame::Line(buf));
    }
    if buf.len() > MAX_LINE_LENGTH {
        discard_line(reader).await?;
        return Ok(Frame::Oversized);
    }
    // Final frame without a trailing newline.
    Ok(Frame::Line(buf))
}

async fn discard_line<R>(reader: &mut R) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(());
        }
        if let Some(pos) = available.iter().position(|&b| b == b'\n') {
            reader.consume(pos + 1);
            return Ok(());
        }
        let len = available.len();
        reader.consume(len);
    }
}

/// Serve requests on one connection until EOF or a write fails.
///
/// Bad frames get an `error` response and the connection stays open. A
/// broken pipe ends only this connection.
async fn handle_connection(
    stream: UnixStream,
    supervisor: SharedSupervisor,
    shutdown: CancellationToken,
) -> io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    loop {
        let (response, stop_after_reply) = match read_frame(&mut reader).await? {
            Frame::Eof => return Ok(()),
            Frame::Oversized => (
                Response::error(&WardenError::InvalidRequest(format!(
                    "Request exceeds {} bytes",
                    MAX_LINE_LENGTH
                ))),
                false,
            ),
            Frame::Line(bytes) => {
                let Ok(text) = std::str::from_utf8(&bytes) else {
                    let err = WardenError::InvalidRequest("Invalid JSON: not UTF-8".to_string());
                    write_response(&mut writer, &Response::error(&err)).await?;
                    continue;
                };
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                match Request::parse(text) {
                    Ok(request) => {
                        tracing::debug!(cmd = %request.kind(), "request");
                        let is_shutdown = matches!(request, Request::Shutdown);
                        (dispatch(request, &supervisor).await, is_shutdown)
                    }
                    Err(e) => (Response::error(&e), false),
                }
            }
        };

        write_response(&mut writer, &response).await?;
        if stop_after_reply {
            shutdown.cancel();
        }
    }
}

async fn write_response<W>(writer: &mut W, response: &Response) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(response.to_line().as_bytes()).await?;
    writer.flush().await
}

// ============================================================================
// Dispatch
// ============================================================================

async fn dispatch(request: Request, supervisor: &SharedSupervisor) -> Response {
    match execute(request, supervisor).await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(error = %e, "request failed");
            Response::error(&e)
        }
    }
}

/// Run one request. Each arm takes the supervisor lock for its own
/// duration; `stop` and `remove` release it while the worker terminates.
async fn execute(request: Request, supervisor: &SharedSupervisor) -> Result<Response> {
    fn view(supervisor: &Supervisor, record: AgentRecord) -> AgentView {
        let pid = supervisor.pid(&record.agent_id);
        AgentView::new(record, pid)
    }

    Ok(match request {
        Request::Ping => Response::ok_message("pong"),
        Request::Shutdown => Response::ok_message("Shutting down"),
        Request::List => {
            let supervisor = supervisor.lock().await;
            let agents = supervisor
                .list()
                .into_iter()
                .map(|record| view(&supervisor, record))
                .collect();
            Response::with_agents(agents)
        }
        Request::Register { agent_id, config } => {
            let mut supervisor = supervisor.lock().await;
            let record = supervisor.register(&agent_id, config)?;
            Response::with_agent(view(&supervisor, record))
        }
        Request::Start { agent_id, config } => {
            let mut supervisor = supervisor.lock().await;
            let record = supervisor.start(&agent_id, config)?;
            Response::with_agent(view(&supervisor, record))
        }
        Request::Stop { agent_id } => {
            let record = supervisor.stop(&agent_id).await?;
            Response::with_agent(view(&*supervisor.lock().await, record))
        }
        Request::Status { agent_id } => {
            let supervisor = supervisor.lock().await;
            let record = supervisor.status(&agent_id)?;
            Response::with_agent(view(&supervisor, record))
        }
        Request::Remove { agent_id } => {
            let record = supervisor.remove(&agent_id).await?;
            Response {
                message: Some(format!("Agent {} removed", agent_id)),
                ..Response::with_agent(AgentView::new(record, None))
            }
        }
    })
}
