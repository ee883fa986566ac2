use tokio::{io::AsyncWriteExt, net::TcpListener};

/// Spawn the TCP listener Docker's HEALTHCHECK probes, on its own task.
pub fn spawn_healthcheck_listener(port: u16) {
    tokio::task::spawn(async move {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .expect("fail to bind docker health listener");

        tracing::info!("Docker health check listening on port {port}");

        while let Ok((mut stream, _)) = listener.accept().await {
            tracing::debug!("health probe connected");
            let res = stream.write_all(b"OK").await;
            if let Err(err) = res {
                tracing::error!("fail to respond to health checker: {err}")
            }
        }
    });
}

#[tokio::test]
async fn healthcheck_responds_ok() {
    use tokio::io::AsyncReadExt;

    spawn_healthcheck_listener(19471);

    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", 19471))
        .await
        .expect("fail to reach health listener");
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert_eq!("OK", response);
}
