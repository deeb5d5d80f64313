//! Controller-side client for the daemon socket.

use super::protocol::{AgentView, Request, Response};
use crate::config::AgentConfig;
use crate::error::{Result, WardenError};
use crate::pidfile::{is_process_alive, read_pid};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};

/// Upper bound on a single response line. `list` replies grow with the
/// number of agents, so this is larger than the request limit.
const MAX_RESPONSE_LENGTH: u64 = 16 * 1024 * 1024;

#[derive(Debug)]
struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

/// A controller session: one connection carrying sequential requests.
///
/// A broken connection surfaces as `ConnectionLost`; the next request dials
/// again.
#[derive(Debug)]
pub struct DaemonClient {
    socket_path: PathBuf,
    connection: Option<Connection>,
}

impl DaemonClient {
    /// A client that connects lazily on the first request.
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            connection: None,
        }
    }

    /// Connect now, failing with `DaemonNotRunning` if nobody is listening.
    pub async fn connect(socket_path: impl Into<PathBuf>) -> Result<Self> {
        let mut client = Self::new(socket_path);
        client.ensure_connected().await?;
        Ok(client)
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Send a request and return the daemon's response, `ok` or `error`.
    pub async fn send(&mut self, request: &Request) -> Result<Response> {
        self.send_raw(&request.to_value().to_string()).await
    }

    /// Send a request, turning an `error` response into `WardenError::Remote`.
    pub async fn call(&mut self, request: &Request) -> Result<Response> {
        self.send(request).await?.into_result()
    }

    /// Send one raw line as-is. Used for protocol probing and tests.
    pub async fn send_raw(&mut self, line: &str) -> Result<Response> {
        self.ensure_connected().await?;
        let result = self.exchange(line).await;
        if result.is_err() {
            self.connection = None;
        }
        result
    }

    // =========================================================================
    // Commands
    // =========================================================================

    pub async fn ping(&mut self) -> Result<()> {
        self.call(&Request::Ping).await.map(|_| ())
    }

    pub async fn list(&mut self) -> Result<Vec<AgentView>> {
        let response = self.call(&Request::List).await?;
        Ok(response.agents.unwrap_or_default())
    }

    pub async fn register(
        &mut self,
        agent_id: &str,
        config: Option<AgentConfig>,
    ) -> Result<AgentView> {
        let request = Request::Register {
            agent_id: agent_id.to_string(),
            config,
        };
        self.call_for_agent(&request).await
    }

    pub async fn start(&mut self, agent_id: &str, config: Option<AgentConfig>) -> Result<AgentView> {
        let request = Request::Start {
            agent_id: agent_id.to_string(),
            config,
        };
        self.call_for_agent(&request).await
    }

    pub async fn stop(&mut self, agent_id: &str) -> Result<AgentView> {
        let request = Request::Stop {
            agent_id: agent_id.to_string(),
        };
        self.call_for_agent(&request).await
    }

    pub async fn status(&mut self, agent_id: &str) -> Result<AgentView> {
        let request = Request::Status {
            agent_id: agent_id.to_string(),
        };
        self.call_for_agent(&request).await
    }

    pub async fn remove(&mut self, agent_id: &str) -> Result<AgentView> {
        let request = Request::Remove {
            agent_id: agent_id.to_string(),
        };
        self.call_for_agent(&request).await
    }

    /// Ask the daemon to stop every agent and exit.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.call(&Request::Shutdown).await?;
        self.connection = None;
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn call_for_agent(&mut self, request: &Request) -> Result<AgentView> {
        let response = self.call(request).await?;
        response.agent.ok_or_else(|| {
            WardenError::ConnectionLost(format!(
                "daemon sent no agent in reply to '{}'",
                request.kind()
            ))
        })
    }

    async fn ensure_connected(&mut self) -> Result<()> {
        if self.connection.is_some() {
            return Ok(());
        }
        let stream = UnixStream::connect(&self.socket_path).await.map_err(|e| {
            WardenError::DaemonNotRunning(format!(
                "cannot connect to '{}': {}",
                self.socket_path.display(),
                e
            ))
        })?;
        let (reader, writer) = stream.into_split();
        self.connection = Some(Connection {
            reader: BufReader::new(reader),
            writer,
        });
        Ok(())
    }

    async fn exchange(&mut self, line: &str) -> Result<Response> {
        let Some(connection) = self.connection.as_mut() else {
            return Err(WardenError::ConnectionLost("not connected".to_string()));
        };

        let mut frame = line.trim_end_matches('\n').to_string();
        frame.push('\n');
        connection
            .writer
            .write_all(frame.as_bytes())
            .await
            .map_err(|e| WardenError::ConnectionLost(format!("failed to send request: {}", e)))?;
        connection
            .writer
            .flush()
            .await
            .map_err(|e| WardenError::ConnectionLost(format!("failed to send request: {}", e)))?;

        let mut reply = String::new();
        let n = (&mut connection.reader)
            .take(MAX_RESPONSE_LENGTH)
            .read_line(&mut reply)
            .await
            .map_err(|e| WardenError::ConnectionLost(format!("failed to read response: {}", e)))?;
        if n == 0 {
            return Err(WardenError::ConnectionLost(
                "daemon closed the connection".to_string(),
            ));
        }

        serde_json::from_str(reply.trim_end())
            .map_err(|e| WardenError::ConnectionLost(format!("malformed response: {}", e)))
    }
}

/// Whether a daemon answers `ping` on `socket_path`.
pub async fn is_daemon_running(socket_path: &Path) -> bool {
    let mut client = DaemonClient::new(socket_path);
    client.ping().await.is_ok()
}

/// PID recorded in the daemon's PID file, if that process is alive.
pub fn read_daemon_pid(pid_path: &Path) -> Option<u32> {
    read_pid(pid_path).filter(|&pid| is_process_alive(pid))
}
