use crate::response::{self, CaptureResponse};
use crate::store::{FingerprintStore, FINGERPRINTS_DIR};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use failure::format_err;
use log::{debug, error, info, warn};
use sgfplib_rs::{CaptureController, CaptureError, Sdk};
use std::net::SocketAddr;
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Method, Request, Response, Server};

/// A rendered HTTP reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Reply {
    fn json(status: u16, body: &CaptureResponse) -> Self {
        // Serialising these enums cannot fail.
        let body = serde_json::to_vec(body).unwrap_or_default();

        Reply {
            status,
            content_type: "application/json",
            body,
        }
    }

    fn error(status: u16, message: &str) -> Self {
        Reply::json(status, &CaptureResponse::error(message))
    }

    fn png(body: Vec<u8>) -> Self {
        Reply {
            status: 200,
            content_type: "image/png",
            body,
        }
    }
}

/// Routes requests to the capture controller and the fingerprint store.
pub struct App<S: Sdk + 'static> {
    controller: Arc<CaptureController<S>>,
    store: FingerprintStore,
    timeout: Duration,
}

impl<S: Sdk + 'static> App<S> {
    pub fn new(
        controller: Arc<CaptureController<S>>,
        store: FingerprintStore,
        timeout: Duration,
    ) -> Self {
        App {
            controller,
            store,
            timeout,
        }
    }

    pub fn handle(&self, method: &Method, url: &str) -> Reply {
        let path = url.split('?').next().unwrap_or(url);
        let static_prefix = format!("/static/{}/", FINGERPRINTS_DIR);

        match (method, path) {
            (Method::Get, "/capture") => self.capture(),
            (_, "/capture") => Reply::error(405, response::METHOD_NOT_ALLOWED),
            (Method::Get, path) if path.starts_with(&static_prefix) => {
                self.stored(&path[static_prefix.len()..])
            }
            _ => Reply::error(404, response::NOT_FOUND),
        }
    }

    fn capture(&self) -> Reply {
        let receiver = self.controller.spawn_capture();
        let result = match receiver.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "No capture result within {:?}; the session keeps the device until it ends",
                    self.timeout
                );
                return Reply::error(500, response::CAPTURE_TIMED_OUT);
            }
            Err(RecvTimeoutError::Disconnected) => {
                error!("Capture thread ended without a result");
                return Reply::error(500, response::CAPTURE_FAILED);
            }
        };

        let capture = match result {
            Ok(capture) => capture,
            Err(CaptureError::DeviceBusy) => return Reply::error(500, response::DEVICE_BUSY),
            Err(e) => {
                error!("Fingerprint capture failed at {}: {}", e.step(), e);
                return Reply::error(500, response::CAPTURE_FAILED);
            }
        };

        let image_path = match self.store.save(&capture) {
            Ok(path) => path,
            Err(e) => {
                error!("Failed to save {}: {}", capture.file_name(), e);
                return Reply::error(500, response::CAPTURE_FAILED);
            }
        };

        Reply::json(
            200,
            &CaptureResponse::Success {
                image: STANDARD.encode(capture.png()),
                image_path,
            },
        )
    }

    fn stored(&self, file_name: &str) -> Reply {
        match self.store.load(file_name) {
            Ok(Some(data)) => Reply::png(data),
            Ok(None) => Reply::error(404, response::NOT_FOUND),
            Err(e) => {
                error!("Failed to read {}: {}", file_name, e);
                Reply::error(500, response::INTERNAL_ERROR)
            }
        }
    }

    fn respond(&self, request: Request) {
        debug!("{} {}", request.method(), request.url());
        let reply = self.handle(request.method(), request.url());

        let mut response = Response::from_data(reply.body).with_status_code(reply.status);
        if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes())
        {
            response = response.with_header(header);
        }
        if let Err(e) = request.respond(response) {
            warn!("Failed to send response: {}", e);
        }
    }
}

/// HTTP front end. Each request gets its own thread so a capture waiting on a finger
/// never holds up other requests.
pub struct CaptureServer<S: Sdk + 'static> {
    server: Server,
    app: Arc<App<S>>,
}

impl<S: Sdk + 'static> CaptureServer<S> {
    pub fn bind(address: &str, app: App<S>) -> Result<Self, failure::Error> {
        let server = Server::http(address)
            .map_err(|e| format_err!("Failed to listen on {}: {}", address, e))?;

        Ok(CaptureServer {
            server,
            app: Arc::new(app),
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    pub fn serve(self) {
        if let Some(address) = self.local_addr() {
            info!("Listening on http://{}", address);
        }

        for request in self.server.incoming_requests() {
            let app = Arc::clone(&self.app);
            thread::spawn(move || app.respond(request));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sgfplib_rs::{BusyPolicy, CaptureConfig, MockSdk, Step};

    fn app(sdk: MockSdk, root: &std::path::Path) -> App<MockSdk> {
        let config = CaptureConfig {
            settle_delay: Duration::from_secs(0),
            busy_policy: BusyPolicy::Reject,
            ..CaptureConfig::default()
        };
        let controller = Arc::new(CaptureController::new(Arc::new(sdk), config));

        App::new(
            controller,
            FingerprintStore::open(root).unwrap(),
            Duration::from_secs(5),
        )
    }

    fn body(reply: &Reply) -> CaptureResponse {
        serde_json::from_slice(&reply.body).unwrap()
    }

    #[test]
    fn capture_persists_and_returns_image() {
        let root = tempfile::tempdir().unwrap();
        let app = app(MockSdk::new(), root.path());

        let reply = app.handle(&Method::Get, "/capture");
        assert_eq!(reply.status, 200);
        assert_eq!(reply.content_type, "application/json");

        match body(&reply) {
            CaptureResponse::Success { image, image_path } => {
                assert!(image_path.starts_with("fingerprints/fingerprint_"));
                assert!(image_path.ends_with(".png"));
                let stored = std::fs::read(root.path().join(&image_path)).unwrap();
                assert_eq!(STANDARD.decode(image).unwrap(), stored);

                let file_name = &image_path["fingerprints/".len()..];
                let served = app.handle(&Method::Get, &format!("/static/fingerprints/{}", file_name));
                assert_eq!(served.status, 200);
                assert_eq!(served.content_type, "image/png");
                assert_eq!(served.body, stored);
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn failures_do_not_leak_native_details() {
        let root = tempfile::tempdir().unwrap();
        let app = app(MockSdk::new().failing(Step::Open, 5), root.path());

        let reply = app.handle(&Method::Get, "/capture?finger=1");
        assert_eq!(reply.status, 500);
        assert_eq!(body(&reply), CaptureResponse::error(response::CAPTURE_FAILED));
        assert!(!String::from_utf8(reply.body).unwrap().contains('5'));
    }

    #[test]
    fn timeout_reports_without_waiting_for_device() {
        let root = tempfile::tempdir().unwrap();
        let sdk = MockSdk::new().with_acquire_delay(Duration::from_millis(300));
        let mut app = app(sdk, root.path());
        app.timeout = Duration::from_millis(20);

        let reply = app.handle(&Method::Get, "/capture");
        assert_eq!(body(&reply), CaptureResponse::error(response::CAPTURE_TIMED_OUT));

        // Whether or not the session got the device before the reply, nothing may stay open.
        thread::sleep(Duration::from_millis(50));
        while app.controller.is_busy() {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(app.controller.sdk().live_handles(), 0);
        assert_eq!(
            app.controller.sdk().count(Step::Create),
            app.controller.sdk().count(Step::Terminate)
        );
    }

    #[test]
    fn unknown_routes() {
        let root = tempfile::tempdir().unwrap();
        let app = app(MockSdk::new(), root.path());

        assert_eq!(app.handle(&Method::Get, "/").status, 404);
        assert_eq!(app.handle(&Method::Post, "/capture").status, 405);
        assert_eq!(
            app.handle(&Method::Get, "/static/fingerprints/../secret.png")
                .status,
            404
        );
        assert_eq!(app.controller.sdk().calls(), vec![]);
    }
}
