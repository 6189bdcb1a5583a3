use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use server_mocker::matchers::{any, path};
use server_mocker::{text, Error, MockServer, SHUTDOWN_PATH};

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[async_std::test]
async fn close_releases_the_port() {
    // Arrange
    let mock_server = MockServer::start().await;
    let address = *mock_server.address();

    // Act
    mock_server.close().await;

    // Assert
    assert!(TcpListener::bind(address).is_ok());
}

#[async_std::test]
async fn servers_can_be_started_and_closed_on_the_same_port_in_a_row() {
    let port = free_port();

    for round in 0..3 {
        // Arrange
        let mock_server = MockServer::builder().port(port).start().await;
        mock_server
            .stub(path("/round"))
            .returns(text(round.to_string()));

        // Act
        let body = reqwest::get(format!("{}/round", mock_server.uri()))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        mock_server.close().await;

        // Assert
        assert_eq!(body, round.to_string());
    }
}

#[async_std::test]
async fn try_start_reports_a_taken_port() {
    // Arrange
    let taken = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = taken.local_addr().unwrap().port();

    // Act
    let outcome = MockServer::builder().port(port).try_start().await;

    // Assert
    assert!(matches!(outcome, Err(Error::Bind(address, _)) if address.port() == port));
}

#[async_std::test]
async fn close_clears_the_registry() {
    // Arrange
    let mock_server = MockServer::start().await;
    let registry = mock_server.registry().clone();
    let ping = mock_server.mock(any()).returns(text("pong"));
    reqwest::get(mock_server.uri()).await.unwrap();
    assert!(ping.called());

    // Act
    mock_server.close().await;

    // Assert
    assert!(registry.requests().is_empty());
    assert!(!ping.called());
}

#[async_std::test]
async fn idle_keep_alive_connections_do_not_delay_close() {
    // Arrange
    let mock_server = MockServer::builder()
        .shutdown_grace_period(Duration::from_secs(30))
        .start()
        .await;
    mock_server.stub(any()).returns(text("hi"));
    // The client keeps its connection open in its pool.
    let client = reqwest::Client::new();
    client.get(mock_server.uri()).send().await.unwrap();

    // Act
    let started = Instant::now();
    mock_server.close().await;

    // Assert
    assert!(started.elapsed() < Duration::from_secs(10));
    drop(client);
}

#[async_std::test]
async fn stuck_connections_are_terminated_after_the_grace_period() {
    // Arrange
    let mock_server = MockServer::builder()
        .shutdown_grace_period(Duration::from_millis(200))
        .start()
        .await;
    let address = *mock_server.address();
    // A request that never completes.
    let mut stream = TcpStream::connect(address).unwrap();
    stream.write_all(b"POST / HTTP/1.1\r\nhost: localhost\r\ncontent-length: 100\r\n\r\npartial").unwrap();
    async_std::task::sleep(Duration::from_millis(100)).await;

    // Act
    let started = Instant::now();
    mock_server.close().await;

    // Assert
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(TcpListener::bind(address).is_ok());
}

#[async_std::test]
async fn the_shutdown_path_stops_the_server_and_runs_the_hook() {
    // Arrange
    let hook_ran = Arc::new(AtomicBool::new(false));
    let flag = hook_ran.clone();
    let mock_server = MockServer::builder()
        .shutdown_hook(move || flag.store(true, Ordering::SeqCst))
        .start()
        .await;
    let catch_all = mock_server.mock(any()).returns(text("user registration"));
    let ping = mock_server.mock(path("/ping")).returns(text("pong"));
    let address = *mock_server.address();
    reqwest::get(format!("{}/ping", mock_server.uri()))
        .await
        .unwrap();
    assert!(ping.called_once());
    assert_eq!(mock_server.requests().len(), 1);

    // Act
    let response = reqwest::get(format!("{}{}", mock_server.uri(), SHUTDOWN_PATH))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "server-mocker shutting down");
    assert!(!catch_all.called());

    for _ in 0..100 {
        if hook_ran.load(Ordering::SeqCst) {
            break;
        }
        async_std::task::sleep(Duration::from_millis(20)).await;
    }
    assert!(hook_ran.load(Ordering::SeqCst));
    assert!(TcpListener::bind(address).is_ok());
    // Stopping the server forgets registrations and received requests.
    assert!(mock_server.requests().is_empty());
    assert!(!ping.called());
    assert_eq!(ping.call_count(), 0);

    // Closing an already stopped server is harmless.
    mock_server.close().await;
}

#[async_std::test]
async fn without_a_hook_the_shutdown_path_is_an_ordinary_path() {
    // Arrange
    let mock_server = MockServer::start().await;
    mock_server
        .stub(path(SHUTDOWN_PATH))
        .returns(text("user registration"));

    // Act
    let body = reqwest::get(format!("{}{}", mock_server.uri(), SHUTDOWN_PATH))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    // Assert
    assert_eq!(body, "user registration");
    let still_up = reqwest::get(format!("{}{}", mock_server.uri(), SHUTDOWN_PATH))
        .await
        .unwrap();
    assert_eq!(still_up.status(), 200);
}
