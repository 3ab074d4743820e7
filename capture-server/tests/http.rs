use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use capture_server::{App, CaptureResponse, CaptureServer, FingerprintStore, CAPTURE_FAILED};
use image::ImageFormat;
use sgfplib_rs::{BusyPolicy, CaptureConfig, CaptureController, MockSdk, Step};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn start(sdk: MockSdk, root: &std::path::Path) -> (SocketAddr, Arc<CaptureController<MockSdk>>) {
    let config = CaptureConfig {
        settle_delay: Duration::from_secs(0),
        busy_policy: BusyPolicy::Reject,
        ..CaptureConfig::default()
    };
    let controller = Arc::new(CaptureController::new(Arc::new(sdk), config));
    let app = App::new(
        Arc::clone(&controller),
        FingerprintStore::open(root).unwrap(),
        Duration::from_secs(10),
    );
    let server = CaptureServer::bind("127.0.0.1:0", app).unwrap();
    let address = server.local_addr().unwrap();
    thread::spawn(move || server.serve());

    (address, controller)
}

// HTTP/1.0 keeps tiny_http from chunking large bodies, so the body is everything after
// the head.
fn get(address: SocketAddr, path: &str) -> (u16, Vec<u8>) {
    let mut stream = TcpStream::connect(address).unwrap();
    write!(
        stream,
        "GET {} HTTP/1.0\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, address
    )
    .unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).unwrap();
    let split = raw
        .windows(4)
        .position(|window| window == b"\r\n\r\n")
        .unwrap();
    let head = String::from_utf8_lossy(&raw[..split]).into_owned();
    let status = head.split_whitespace().nth(1).unwrap().parse().unwrap();

    (status, raw[split + 4..].to_vec())
}

fn can_bind() -> bool {
    if TcpListener::bind("127.0.0.1:0").is_err() {
        eprintln!("skipping test: cannot bind local port");
        return false;
    }
    true
}

#[test]
fn capture_over_http_returns_decodable_png() {
    if !can_bind() {
        return;
    }
    let root = tempfile::tempdir().unwrap();
    let (address, _) = start(MockSdk::new().with_fill(|i| (i % 200) as u8 + 17), root.path());

    let (status, body) = get(address, "/capture");
    assert_eq!(status, 200);

    let (image, image_path) = match serde_json::from_slice::<CaptureResponse>(&body).unwrap() {
        CaptureResponse::Success { image, image_path } => (image, image_path),
        other => panic!("unexpected response: {:?}", other),
    };
    let png = STANDARD.decode(image).unwrap();
    let gray = image::load_from_memory_with_format(&png, ImageFormat::Png)
        .unwrap()
        .to_luma8();
    assert_eq!(gray.dimensions(), (300, 400));
    assert_eq!(gray.get_pixel(0, 0).0[0], 17);

    let (status, served) = get(address, &format!("/static/{}", image_path));
    assert_eq!(status, 200);
    assert_eq!(served, png);
}

#[test]
fn large_bodies_arrive_unchunked() {
    if !can_bind() {
        return;
    }
    let root = tempfile::tempdir().unwrap();
    // Noise-like pixels keep the PNG well above tiny_http's chunking threshold.
    let sdk = MockSdk::new().with_fill(|i| (i.wrapping_mul(2_654_435_761) >> 13) as u8);
    let (address, _) = start(sdk, root.path());

    let (status, body) = get(address, "/capture");
    assert_eq!(status, 200);
    assert!(body.len() > 32 * 1024);
    assert_eq!(body.first(), Some(&b'{'));
    assert!(serde_json::from_slice::<CaptureResponse>(&body).is_ok());
}

#[test]
fn open_failure_is_generic_500_and_device_released() {
    if !can_bind() {
        return;
    }
    let root = tempfile::tempdir().unwrap();
    let (address, controller) = start(MockSdk::new().failing(Step::Open, 5), root.path());

    let (status, body) = get(address, "/capture");
    assert_eq!(status, 500);
    assert_eq!(
        serde_json::from_slice::<CaptureResponse>(&body).unwrap(),
        CaptureResponse::error(CAPTURE_FAILED)
    );
    assert_eq!(controller.sdk().count(Step::Close), 1);
    assert_eq!(controller.sdk().count(Step::Terminate), 1);
    assert_eq!(std::fs::read_dir(root.path().join("fingerprints")).unwrap().count(), 0);
}

#[test]
fn slow_capture_does_not_block_other_routes() {
    if !can_bind() {
        return;
    }
    let root = tempfile::tempdir().unwrap();
    let sdk = MockSdk::new().with_acquire_delay(Duration::from_millis(500));
    let (address, controller) = start(sdk, root.path());

    let pending = thread::spawn(move || get(address, "/capture"));
    while controller.sdk().count(Step::Acquire) == 0 {
        thread::sleep(Duration::from_millis(5));
    }

    let (status, _) = get(address, "/static/fingerprints/missing.png");
    assert_eq!(status, 404);
    assert_eq!(controller.sdk().count(Step::Terminate), 0);

    let (status, _) = pending.join().unwrap();
    assert_eq!(status, 200);
}
