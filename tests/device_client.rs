use music_leds_ui::device_client::{DeviceClient, DeviceReply, LedDeviceClient};
use music_leds_ui::settings::{FlashParams, SettingsUpdate, VuParams};
use serde_json::json;
use std::{net::SocketAddr, time::Duration};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

const CLIENT_TIMEOUT: Duration = Duration::from_secs(2);

fn http_ok(body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    )
}

// Read one HTTP request from the stream and return its body
async fn read_request(stream: &mut TcpStream) -> String {
    let mut reader = BufReader::new(stream);
    let mut content_length = 0usize;

    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await.is_err() {
            return String::new();
        }

        let lower = line.to_ascii_lowercase();
        if let Some(value) = lower.strip_prefix("content-length:") {
            content_length = value.trim().parse().unwrap_or(0);
        }

        if line.trim().is_empty() {
            break;
        }
    }

    let mut body = vec![0u8; content_length];
    if reader.read_exact(&mut body).await.is_err() {
        return String::new();
    }

    String::from_utf8_lossy(&body).into_owned()
}

// Start a mock device answering every request with the given raw response
async fn start_mock_device(raw_response: String) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind mock device");
    let addr = listener.local_addr().expect("failed to get local addr");

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };

            let response = raw_response.clone();
            tokio::spawn(async move {
                read_request(&mut stream).await;
                let _ = stream.write_all(response.as_bytes()).await;
            });
        }
    });

    addr
}

// Start a mock device that reads the request but never answers
async fn start_silent_device() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind mock device");
    let addr = listener.local_addr().expect("failed to get local addr");

    tokio::spawn(async move {
        let Ok((mut stream, _)) = listener.accept().await else {
            return;
        };

        read_request(&mut stream).await;
        tokio::time::sleep(Duration::from_secs(30)).await;
        drop(stream);
    });

    addr
}

// Start a mock device that captures the request body of one request
async fn start_capturing_device(body_tx: oneshot::Sender<String>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind mock device");
    let addr = listener.local_addr().expect("failed to get local addr");

    tokio::spawn(async move {
        let Ok((mut stream, _)) = listener.accept().await else {
            return;
        };

        let body = read_request(&mut stream).await;
        let _ = body_tx.send(body);
        let _ = stream
            .write_all(http_ok(r#"{"status": "ok"}"#).as_bytes())
            .await;
    });

    addr
}

fn client_for(addr: SocketAddr) -> LedDeviceClient {
    LedDeviceClient::new(&addr.to_string(), CLIENT_TIMEOUT).expect("failed to create client")
}

fn flash_update() -> SettingsUpdate {
    SettingsUpdate::Flash(FlashParams::default())
}

#[tokio::test]
async fn ok_reply_is_classified_as_success() {
    let addr = start_mock_device(http_ok(r#"{"status": "ok"}"#)).await;
    let client = client_for(addr);

    let reply = client.push_settings(&flash_update()).await;

    assert_eq!(reply, DeviceReply::Success);
}

#[tokio::test]
async fn no_change_reply_is_classified_as_no_change() {
    let addr = start_mock_device(http_ok(r#"{"status": "no_change"}"#)).await;
    let client = client_for(addr);

    let reply = client.push_settings(&flash_update()).await;

    assert_eq!(reply, DeviceReply::NoChange);
}

#[tokio::test]
async fn unexpected_status_is_reported_verbatim() {
    let addr = start_mock_device(http_ok(r#"{"status": "rebooting"}"#)).await;
    let client = client_for(addr);

    let reply = client.push_settings(&flash_update()).await;

    assert_eq!(
        reply,
        DeviceReply::UnknownStatus {
            status: Some(String::from("rebooting")),
        }
    );
}

#[tokio::test]
async fn non_json_reply_is_malformed() {
    let addr = start_mock_device(http_ok("device says hi")).await;
    let client = client_for(addr);

    let reply = client.push_settings(&flash_update()).await;

    assert_eq!(reply, DeviceReply::Malformed);
}

#[tokio::test]
async fn server_error_maps_to_http_error() {
    let addr = start_mock_device(String::from(
        "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\n\r\n",
    ))
    .await;
    let client = client_for(addr);

    let reply = client.push_settings(&flash_update()).await;

    assert_eq!(reply, DeviceReply::HttpError { status: 500 });
}

#[tokio::test]
async fn unreachable_device_maps_to_connection_failed() {
    // Bind a port and drop the listener again so connecting to it is refused
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind");
    let addr = listener.local_addr().expect("failed to get local addr");
    drop(listener);

    let client = client_for(addr);
    let reply = client.push_settings(&flash_update()).await;

    assert_eq!(reply, DeviceReply::ConnectionFailed);
}

#[tokio::test]
async fn silent_device_maps_to_timed_out() {
    let addr = start_silent_device().await;
    let client = LedDeviceClient::new(&addr.to_string(), Duration::from_millis(300))
        .expect("failed to create client");

    let reply = client.push_settings(&flash_update()).await;

    assert_eq!(reply, DeviceReply::TimedOut);
}

#[tokio::test]
async fn device_receives_mode_and_parameter_block() {
    let (body_tx, body_rx) = oneshot::channel();
    let addr = start_capturing_device(body_tx).await;
    let client = client_for(addr);

    let update = SettingsUpdate::VuRainbow(VuParams {
        sensitivity: 42,
        ..VuParams::default()
    });
    let reply = client.push_settings(&update).await;
    assert_eq!(reply, DeviceReply::Success);

    let body = body_rx.await.expect("mock device captured no body");
    let sent: serde_json::Value = serde_json::from_str(&body).expect("request body is not json");

    assert_eq!(
        sent,
        json!({
            "mode": 1,
            "vu_rainbow": {
                "sensitivity": 42,
                "brightness": 80,
                "bgColor": "#000000",
                "bgBrightness": 10,
                "smoothing": 30,
            },
        })
    );
}
