use std::net::SocketAddr;
use std::time::Duration;

use ipvsd_core::ProbeKind;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Runs one probe attempt against `addr` and reports whether the backend
/// answered. `None` never fails: it's a heartbeat with no real check.
pub async fn run_once(kind: &ProbeKind, addr: SocketAddr, deadline: Duration) -> bool {
    match kind {
        ProbeKind::None => true,
        ProbeKind::TcpConnect => timeout(deadline, TcpStream::connect(addr)).await.is_ok_and(|r| r.is_ok()),
        ProbeKind::HttpGet { path } => http_get(addr, path, deadline).await,
    }
}

async fn http_get(addr: SocketAddr, path: &str, deadline: Duration) -> bool {
    let attempt = async {
        let mut stream = TcpStream::connect(addr).await.ok()?;
        let request = format!(
            "GET {path} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
            addr.ip()
        );
        stream.write_all(request.as_bytes()).await.ok()?;
        let mut buf = [0u8; 16];
        tokio::io::AsyncReadExt::read(&mut stream, &mut buf)
            .await
            .ok()
            .filter(|n| *n > 0)
    };
    timeout(deadline, attempt).await.ok().flatten().is_some()
}
