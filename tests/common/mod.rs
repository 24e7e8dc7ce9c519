//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use lazyvm::vm::{VmController, VmError};

/// Start a TCP echo backend: every byte received is written back.
#[allow(dead_code)]
pub async fn start_echo_backend(addr: SocketAddr) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        loop {
                            match socket.read(&mut buf).await {
                                Ok(0) | Err(_) => break,
                                Ok(n) => {
                                    if socket.write_all(&buf[..n]).await.is_err() {
                                        break;
                                    }
                                }
                            }
                        }
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Start a backend that accepts connections and then never responds,
/// keeping them open until the far end goes away.
#[allow(dead_code)]
pub async fn start_stalling_backend(addr: SocketAddr) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        // Drain whatever arrives without ever replying.
                        while let Ok(n) = socket.read(&mut buf).await {
                            if n == 0 {
                                break;
                            }
                        }
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Observable state behind [`MockVm`].
pub struct MockState {
    pub exists: AtomicBool,
    pub running: AtomicBool,
    pub starts: AtomicU32,
    pub suspends: AtomicU32,
}

/// Scriptable in-memory VM controller.
#[derive(Clone)]
pub struct MockVm {
    pub state: Arc<MockState>,
}

impl MockVm {
    /// An existing, stopped VM.
    #[allow(dead_code)]
    pub fn new() -> Self {
        Self {
            state: Arc::new(MockState {
                exists: AtomicBool::new(true),
                running: AtomicBool::new(false),
                starts: AtomicU32::new(0),
                suspends: AtomicU32::new(0),
            }),
        }
    }

    /// An existing VM that is already running.
    #[allow(dead_code)]
    pub fn started() -> Self {
        let vm = Self::new();
        vm.state.running.store(true, Ordering::SeqCst);
        vm
    }

    /// A VM that VBoxManage has never heard of.
    #[allow(dead_code)]
    pub fn missing() -> Self {
        let vm = Self::new();
        vm.state.exists.store(false, Ordering::SeqCst);
        vm
    }
}

impl VmController for MockVm {
    async fn exists(&self) -> Result<bool, VmError> {
        Ok(self.state.exists.load(Ordering::SeqCst))
    }

    async fn is_running(&self) -> Result<bool, VmError> {
        Ok(self.state.running.load(Ordering::SeqCst))
    }

    async fn start(&self) -> Result<(), VmError> {
        self.state.starts.fetch_add(1, Ordering::SeqCst);
        self.state.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn suspend(&self) -> Result<(), VmError> {
        self.state.suspends.fetch_add(1, Ordering::SeqCst);
        self.state.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn resolve_addr(&self) -> Result<String, VmError> {
        if !self.state.running.load(Ordering::SeqCst) {
            return Err(VmError::NotRunning("mock-vm".into()));
        }
        Ok("127.0.0.1".into())
    }
}

/// Poll `predicate` until it holds or `deadline` elapses.
#[allow(dead_code)]
pub async fn wait_for(mut predicate: impl FnMut() -> bool, deadline: Duration) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    predicate()
}

/// One echo round trip through the proxy, retried while the backend is
/// mid-activation (a connection racing a suspend is dropped by design).
#[allow(dead_code)]
pub async fn echo_roundtrip(addr: &str, payload: &[u8]) -> std::io::Result<()> {
    let mut last_err = std::io::Error::new(std::io::ErrorKind::Other, "no attempt made");
    for _ in 0..20 {
        match try_echo(addr, payload).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                last_err = e;
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
    }
    Err(last_err)
}

async fn try_echo(addr: &str, payload: &[u8]) -> std::io::Result<()> {
    let mut client = TcpStream::connect(addr).await?;
    client.write_all(payload).await?;
    let mut buf = vec![0u8; payload.len()];
    client.read_exact(&mut buf).await?;
    if buf != payload {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "echo mismatch",
        ));
    }
    Ok(())
}
