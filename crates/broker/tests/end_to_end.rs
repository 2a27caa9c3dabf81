//! End-to-end scenarios over a real TCP socket, against an in-memory
//! store and a manually driven worker loop (no live Redis, no external
//! process — these exercise the same code paths as production minus the
//! network hop to the store and the spawned binary).

use std::sync::Arc;
use std::time::Duration;

use taskwheel_proto::{Frame, FrameType, PollKey, Reply, StatusResult, TaskRequest};
use taskwheel_store::fake::FakeGateway;
use taskwheel_store::StoreGateway;
use taskwheel_timer::Wheel;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

async fn start_broker() -> (std::net::SocketAddr, Arc<FakeGateway>, Wheel, CancellationToken) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let gateway = Arc::new(FakeGateway::new());
    let wheel = Wheel::new(Duration::from_millis(5));
    wheel.start();
    let shutdown = CancellationToken::new();

    tokio::spawn(taskwheel_broker::accept_loop(
        listener,
        Arc::clone(&gateway),
        wheel.clone(),
        shutdown.clone(),
    ));

    (addr, gateway, wheel, shutdown)
}

async fn submit(stream: &mut TcpStream, req: &TaskRequest) -> StatusResult {
    let (tag, body) = Frame::Submit(req.clone()).encode().unwrap();
    stream.write_u8(tag).await.unwrap();
    stream.write_all(&body).await.unwrap();

    let mut buf = vec![0u8; 1024];
    let n = stream.read(&mut buf).await.unwrap();
    serde_json::from_slice(&buf[..n]).unwrap()
}

async fn poll(stream: &mut TcpStream, uuid: &str) -> Reply {
    let (tag, body) = Frame::PollResult(PollKey {
        key: format!("r_{uuid}"),
    })
    .encode()
    .unwrap();
    stream.write_u8(tag).await.unwrap();
    stream.write_all(&body).await.unwrap();

    let mut buf = vec![0u8; 256];
    let n = stream.read(&mut buf).await.unwrap();
    serde_json::from_slice(&buf[..n]).unwrap()
}

fn req(uuid: &str) -> TaskRequest {
    TaskRequest {
        uuid: uuid.to_string(),
        bin_name: "echo.sh".into(),
        args: "hi".into(),
        start_time: 0,
        time_interval: String::new(),
        index: 0,
    }
}

#[tokio::test]
async fn immediate_submit_then_poll_round_trips() {
    let (addr, gateway, wheel, _shutdown) = start_broker().await;
    let mut client = TcpStream::connect(addr).await.unwrap();

    let status = submit(&mut client, &req("a")).await;
    assert_eq!(status.status, 0);
    assert_eq!(gateway.pending_count(), 1);

    // Poll before a worker has run: not present yet.
    let reply = poll(&mut client, "a").await;
    assert_eq!(reply, Reply::not_present());

    // Simulate the worker: take the request, "run" it, write the result.
    let taken = gateway.take_request().await.unwrap().unwrap();
    assert_eq!(taken.uuid, "a");
    gateway
        .put_result(
            &taskwheel_proto::TaskResult {
                request: taken,
                is_success: 1,
                result: "hi".into(),
            },
            60,
        )
        .await
        .unwrap();

    let reply = poll(&mut client, "a").await;
    assert_eq!(reply, Reply::found(1, "hi".into()));

    wheel.stop();
}

#[tokio::test]
async fn delayed_submit_is_not_visible_until_the_wheel_fires() {
    let (addr, gateway, wheel, _shutdown) = start_broker().await;
    let mut client = TcpStream::connect(addr).await.unwrap();

    let mut r = req("a");
    r.start_time = taskwheel_broker::now_unix() + 1;
    let status = submit(&mut client, &r).await;
    assert_eq!(status.status, 0);
    assert_eq!(gateway.pending_count(), 0);

    tokio::time::sleep(Duration::from_millis(1300)).await;
    assert_eq!(gateway.pending_count(), 1);

    wheel.stop();
}

#[tokio::test]
async fn close_frame_ends_the_connection() {
    let (addr, _gateway, wheel, _shutdown) = start_broker().await;
    let mut client = TcpStream::connect(addr).await.unwrap();

    client.write_u8(FrameType::Close.to_u8()).await.unwrap();

    let mut buf = [0u8; 1];
    let n = client.read(&mut buf).await.unwrap();
    assert_eq!(n, 0, "server closed the socket");

    wheel.stop();
}

#[tokio::test]
async fn unknown_frame_type_closes_the_connection() {
    let (addr, _gateway, wheel, _shutdown) = start_broker().await;
    let mut client = TcpStream::connect(addr).await.unwrap();

    client.write_u8(99).await.unwrap();

    let mut buf = [0u8; 1];
    let n = client.read(&mut buf).await.unwrap();
    assert_eq!(n, 0);

    wheel.stop();
}

#[tokio::test]
async fn one_connection_carries_multiple_messages_in_wire_order() {
    let (addr, gateway, wheel, _shutdown) = start_broker().await;
    let mut client = TcpStream::connect(addr).await.unwrap();

    for uuid in ["a", "b", "c"] {
        let status = submit(&mut client, &req(uuid)).await;
        assert_eq!(status.status, 0);
    }
    assert_eq!(gateway.pending_count(), 3);

    wheel.stop();
}
