//! Sandbox IPC server (§6.3).
//!
//! Length-prefixed JSON frames on a local stream: a `u32` big-endian
//! length, then that many bytes of JSON. The parent binds a UNIX domain
//! socket under the sandbox root by default; platforms without UNIX
//! socket support fall back to a loopback TCP listener. Either way the
//! child discovers the transport through environment variables set at
//! spawn time.

use planner_core::SandboxError;
use planner_core::{ActionResponse, TenantId};
use planner_dispatcher::ToolDispatch;
use serde::Deserialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Transport chosen for one run's IPC channel.
pub enum IpcTransport {
    /// A UNIX domain socket at the given path.
    Unix(std::path::PathBuf),
    /// A loopback TCP listener bound to an ephemeral port.
    Tcp(std::net::SocketAddr),
}

impl IpcTransport {
    /// The environment variables a spawned child needs to reach this
    /// transport, matching the names `_ipc.py` reads.
    pub fn env_vars(&self) -> Vec<(&'static str, String)> {
        match self {
            IpcTransport::Unix(path) => {
                vec![("SANDBOX_SOCKET_PATH", path.display().to_string())]
            }
            IpcTransport::Tcp(addr) => {
                vec![("SANDBOX_TCP_PORT", addr.port().to_string())]
            }
        }
    }
}

enum Listener {
    Unix(tokio::net::UnixListener),
    Tcp(tokio::net::TcpListener),
}

/// Accepts sandbox IPC connections and dispatches each request through a
/// [`ToolDispatch`] implementation.
pub struct IpcServer {
    listener: Listener,
    transport: IpcTransport,
}

#[derive(Deserialize)]
struct IpcRequest {
    run_id: String,
    token: String,
    provider: String,
    tool: String,
    args: serde_json::Value,
}

impl IpcServer {
    /// Bind a UNIX domain socket under `root`, falling back to a loopback
    /// TCP listener if the platform has none.
    pub async fn bind(root: &std::path::Path) -> Result<Self, SandboxError> {
        #[cfg(unix)]
        {
            let path = root.join("ipc.sock");
            match tokio::net::UnixListener::bind(&path) {
                Ok(listener) => {
                    return Ok(Self {
                        listener: Listener::Unix(listener),
                        transport: IpcTransport::Unix(path),
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "UNIX socket bind failed, falling back to TCP");
                }
            }
        }
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| SandboxError::Ipc(format!("tcp bind: {e}")))?;
        let addr = listener
            .local_addr()
            .map_err(|e| SandboxError::Ipc(format!("tcp local_addr: {e}")))?;
        Ok(Self {
            listener: Listener::Tcp(listener),
            transport: IpcTransport::Tcp(addr),
        })
    }

    /// The transport a spawned child should be told to connect to.
    pub fn transport(&self) -> &IpcTransport {
        &self.transport
    }

    /// Serve requests until the connection closes. Validates `run_id` and
    /// `token` on every frame; everything else is routed through
    /// `dispatcher`. Runs until the peer disconnects, so callers should
    /// spawn this alongside the subprocess and let it end naturally when
    /// the child exits.
    pub async fn serve_one(
        &self,
        run_id: &str,
        token: &str,
        tenant: &TenantId,
        dispatcher: &dyn ToolDispatch,
    ) -> Result<(), SandboxError> {
        match &self.listener {
            Listener::Unix(listener) => {
                let (stream, _) = listener
                    .accept()
                    .await
                    .map_err(|e| SandboxError::Ipc(format!("accept: {e}")))?;
                serve_stream(stream, run_id, token, tenant, dispatcher).await
            }
            Listener::Tcp(listener) => {
                let (stream, _) = listener
                    .accept()
                    .await
                    .map_err(|e| SandboxError::Ipc(format!("accept: {e}")))?;
                serve_stream(stream, run_id, token, tenant, dispatcher).await
            }
        }
    }
}

async fn serve_stream<S: AsyncRead + AsyncWrite + Unpin>(
    mut stream: S,
    run_id: &str,
    token: &str,
    tenant: &TenantId,
    dispatcher: &dyn ToolDispatch,
) -> Result<(), SandboxError> {
    loop {
        let frame = match read_frame(&mut stream).await {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(()),
            Err(e) => return Err(e),
        };
        let request: IpcRequest = serde_json::from_slice(&frame)
            .map_err(|e| SandboxError::Ipc(format!("malformed request: {e}")))?;

        let response = if request.run_id != run_id || request.token != token {
            ActionResponse::failed("invalid run_id/token")
        } else {
            dispatcher
                .invoke(tenant, &request.provider, &request.tool, request.args)
                .await
        };

        let payload = serde_json::to_vec(&response)
            .map_err(|e| SandboxError::Ipc(format!("serialize response: {e}")))?;
        write_frame(&mut stream, &payload).await?;
    }
}

async fn read_frame<S: AsyncRead + Unpin>(stream: &mut S) -> Result<Option<Vec<u8>>, SandboxError> {
    let mut len_buf = [0u8; 4];
    match stream.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(SandboxError::Ipc(format!("read length: {e}"))),
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    let mut body = vec![0u8; len];
    stream
        .read_exact(&mut body)
        .await
        .map_err(|e| SandboxError::Ipc(format!("read body: {e}")))?;
    Ok(Some(body))
}

async fn write_frame<S: AsyncWrite + Unpin>(stream: &mut S, payload: &[u8]) -> Result<(), SandboxError> {
    let len = (payload.len() as u32).to_be_bytes();
    stream
        .write_all(&len)
        .await
        .map_err(|e| SandboxError::Ipc(format!("write length: {e}")))?;
    stream
        .write_all(payload)
        .await
        .map_err(|e| SandboxError::Ipc(format!("write body: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use planner_dispatcher::ToolDispatcher;
    use planner_registry::{ProviderRegistry, ToolInvoker};
    use serde_json::json;
    use std::sync::Arc;

    struct EchoInvoker;

    #[async_trait]
    impl ToolInvoker for EchoInvoker {
        async fn invoke(
            &self,
            _tenant: &TenantId,
            tool_name: &str,
            args: serde_json::Value,
        ) -> ActionResponse {
            ActionResponse::ok(serde_json::Map::from_iter([
                ("tool".to_string(), json!(tool_name)),
                ("args".to_string(), args),
            ]))
        }
    }

    #[tokio::test]
    async fn frame_roundtrip_over_duplex_pipe() {
        let (mut a, mut b) = tokio::io::duplex(4096);
        let payload = b"{\"hello\":\"world\"}".to_vec();
        write_frame(&mut a, &payload).await.unwrap();
        let read = read_frame(&mut b).await.unwrap().unwrap();
        assert_eq!(read, payload);
    }

    #[tokio::test]
    async fn rejects_mismatched_token() {
        let mut registry = ProviderRegistry::new();
        let tenant = TenantId::new("acme");
        registry.register(tenant.clone(), "crm", Arc::new(EchoInvoker), true);
        let dispatcher = ToolDispatcher::new(Arc::new(registry));

        let (mut client, server) = tokio::io::duplex(4096);
        let request = json!({
            "run_id": "r1",
            "token": "wrong-token",
            "provider": "crm",
            "tool": "lookup",
            "args": {}
        });
        let payload = serde_json::to_vec(&request).unwrap();

        let serve = tokio::spawn(async move {
            serve_stream(server, "r1", "correct-token", &tenant, &dispatcher)
                .await
                .unwrap();
        });

        write_frame(&mut client, &payload).await.unwrap();
        let response_bytes = read_frame(&mut client).await.unwrap().unwrap();
        let response: ActionResponse = serde_json::from_slice(&response_bytes).unwrap();
        assert!(!response.successful);

        drop(client);
        serve.await.unwrap();
    }

    #[tokio::test]
    async fn dispatches_valid_request_through_dispatcher() {
        let mut registry = ProviderRegistry::new();
        let tenant = TenantId::new("acme");
        registry.register(tenant.clone(), "crm", Arc::new(EchoInvoker), true);
        let dispatcher = ToolDispatcher::new(Arc::new(registry));

        let (mut client, server) = tokio::io::duplex(4096);
        let request = json!({
            "run_id": "r1",
            "token": "tok",
            "provider": "crm",
            "tool": "lookup_contact",
            "args": {"id": 1}
        });
        let payload = serde_json::to_vec(&request).unwrap();

        let serve = tokio::spawn(async move {
            serve_stream(server, "r1", "tok", &tenant, &dispatcher)
                .await
                .unwrap();
        });

        write_frame(&mut client, &payload).await.unwrap();
        let response_bytes = read_frame(&mut client).await.unwrap().unwrap();
        let response: ActionResponse = serde_json::from_slice(&response_bytes).unwrap();
        assert!(response.successful);
        assert_eq!(response.data["tool"], json!("lookup_contact"));

        drop(client);
        serve.await.unwrap();
    }
}
