//! Interruptible listener behavior under close.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;

use lazyvm::net::{Accepted, InterruptibleListener};

async fn bind_ephemeral() -> InterruptibleListener {
    InterruptibleListener::bind("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn close_unblocks_pending_accept() {
    let mut listener = bind_ephemeral().await;
    let handle = listener.handle();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.close();
    });

    let result = timeout(Duration::from_secs(1), listener.accept())
        .await
        .expect("accept must unblock after close");
    assert!(matches!(result, Accepted::Interrupted));
}

#[tokio::test]
async fn every_accept_after_close_is_interrupted() {
    let mut listener = bind_ephemeral().await;
    listener.handle().close();

    for _ in 0..5 {
        let result = timeout(Duration::from_secs(1), listener.accept())
            .await
            .expect("post-close accept must never block indefinitely");
        assert!(matches!(result, Accepted::Interrupted));
    }
}

#[tokio::test]
async fn connections_are_delivered_before_close() {
    let mut listener = bind_ephemeral().await;
    let addr = listener.local_addr();

    let client = tokio::spawn(async move { TcpStream::connect(addr).await });

    let result = timeout(Duration::from_secs(1), listener.accept())
        .await
        .expect("accept must yield the pending connection");
    match result {
        Accepted::Conn(_, peer) => assert_eq!(peer.ip(), addr.ip()),
        other => panic!("expected a connection, got {:?}", other),
    }
    client.await.unwrap().unwrap();

    listener.handle().close();
    let result = timeout(Duration::from_secs(1), listener.accept())
        .await
        .expect("accept after close must not block");
    assert!(matches!(result, Accepted::Interrupted));
}

#[tokio::test]
async fn double_close_is_noop() {
    let mut listener = bind_ephemeral().await;
    let handle = listener.handle();

    handle.close();
    handle.close();
    assert!(handle.is_closed());

    let result = timeout(Duration::from_secs(1), listener.accept())
        .await
        .expect("accept after double close must not block");
    assert!(matches!(result, Accepted::Interrupted));
}

#[tokio::test]
async fn queued_connection_is_not_handed_out_after_close() {
    let mut listener = bind_ephemeral().await;
    let addr = listener.local_addr();
    let handle = listener.handle();

    // Let the background task queue a connection, then close before
    // the caller ever sees it.
    let _client = TcpStream::connect(addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.close();

    let result = timeout(Duration::from_secs(1), listener.accept())
        .await
        .expect("accept must not block");
    assert!(matches!(result, Accepted::Interrupted));
}
