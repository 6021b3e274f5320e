//! End-to-end integration tests for formrelay.
//!
//! Both delivery endpoints are served in-process by axum on a loopback
//! listener, so the suite runs offline, needs no credentials, and can
//! assert on exactly what each service received: the spreadsheet row
//! JSON, the multipart parts of the document upload, and per-endpoint
//! hit counts.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture

use axum::extract::{Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use formrelay::{
    CaptureSession, Dispatcher, DraftStore, FormFields, RelayConfig, RelayError, SubmitState,
};
use image::{DynamicImage, Rgb, RgbImage};
use lopdf::Document;
use serde_json::{json, Value};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Mock services ────────────────────────────────────────────────────────────

/// What the document endpoint received in its multipart body.
#[derive(Debug, Default, Clone)]
struct CapturedUpload {
    chat_id: String,
    caption: String,
    file_name: String,
    pdf: Vec<u8>,
}

#[derive(Default)]
struct MockState {
    sheet_hits: AtomicUsize,
    document_hits: AtomicUsize,
    last_row: Mutex<Option<Value>>,
    last_upload: Mutex<Option<CapturedUpload>>,
    /// The `ok` flag the document endpoint answers with.
    document_ok: AtomicBool,
}

async fn sheet_handler(
    State(state): State<Arc<MockState>>,
    Json(row): Json<Value>,
) -> &'static str {
    state.sheet_hits.fetch_add(1, Ordering::SeqCst);
    *state.last_row.lock().unwrap() = Some(row);
    // The client never reads this; any body will do.
    "ok"
}

async fn document_handler(
    State(state): State<Arc<MockState>>,
    mut multipart: Multipart,
) -> Json<Value> {
    state.document_hits.fetch_add(1, Ordering::SeqCst);

    let mut upload = CapturedUpload::default();
    while let Some(field) = multipart.next_field().await.expect("read multipart field") {
        match field.name().unwrap_or_default() {
            "chat_id" => upload.chat_id = field.text().await.expect("chat_id text"),
            "caption" => upload.caption = field.text().await.expect("caption text"),
            "document" => {
                upload.file_name = field.file_name().unwrap_or_default().to_string();
                upload.pdf = field.bytes().await.expect("document bytes").to_vec();
            }
            other => panic!("unexpected multipart part: {other}"),
        }
    }
    *state.last_upload.lock().unwrap() = Some(upload);

    if state.document_ok.load(Ordering::SeqCst) {
        Json(json!({ "ok": true }))
    } else {
        Json(json!({ "ok": false, "description": "document rejected" }))
    }
}

/// Serve both mock endpoints on an ephemeral loopback port.
async fn spawn_services(document_ok: bool) -> (Arc<MockState>, String) {
    let state = Arc::new(MockState {
        document_ok: AtomicBool::new(document_ok),
        ..MockState::default()
    });

    let app = Router::new()
        .route("/ingest", post(sheet_handler))
        .route("/send", post(document_handler))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve mocks");
    });

    (state, format!("http://{addr}"))
}

/// A loopback URL nothing is listening on (connection refused).
fn dead_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}/ingest")
}

// ── Test helpers ─────────────────────────────────────────────────────────────

fn config_for(base: &str) -> RelayConfig {
    RelayConfig::builder()
        .sheet_url(format!("{base}/ingest"))
        .document_url(format!("{base}/send"))
        .chat_id("-1000")
        .caption_prefix("📦 ")
        .build()
        .expect("valid config")
}

fn complete_fields() -> FormFields {
    FormFields {
        date: "2024-01-01".into(),
        article: "A1".into(),
        client: "C1".into(),
        order_number: "B1".into(),
        ticket_number: "T1".into(),
        quantity: "5".into(),
    }
}

fn jpeg_bytes(w: u32, h: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([160, 80, 40])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)
        .expect("encode jpeg");
    buf
}

fn session_with(images: &[Vec<u8>]) -> CaptureSession {
    let mut session = CaptureSession::new();
    for bytes in images {
        session.add_image(bytes.clone()).expect("add image");
    }
    session
}

/// Width of the image XObject on each page, in page order.
fn page_image_widths(pdf: &[u8]) -> Vec<i64> {
    let doc = Document::load_mem(pdf).expect("valid pdf");
    doc.page_iter()
        .map(|page| {
            let dict = doc.get_dictionary(page).expect("page dict");
            let resources = dict
                .get(b"Resources")
                .and_then(lopdf::Object::as_dict)
                .expect("resources");
            let xobjects = resources
                .get(b"XObject")
                .and_then(lopdf::Object::as_dict)
                .expect("xobjects");
            let (_, obj) = xobjects.iter().next().expect("one image per page");
            let stream = doc
                .get_object(obj.as_reference().expect("reference"))
                .and_then(lopdf::Object::as_stream)
                .expect("image stream");
            stream
                .dict
                .get(b"Width")
                .and_then(lopdf::Object::as_i64)
                .expect("width")
        })
        .collect()
}

// ── Full-flow tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn submit_succeeds_when_both_services_accept() {
    let (state, base) = spawn_services(true).await;
    let mut dispatcher = Dispatcher::new(config_for(&base)).unwrap();
    let mut fields = complete_fields();
    let mut session = session_with(&[jpeg_bytes(24, 24)]);

    let report = dispatcher.submit(&mut fields, &mut session).await.unwrap();

    assert!(report.succeeded());
    assert_eq!(report.document_name, "B1.pdf");
    assert_eq!(dispatcher.state(), SubmitState::Succeeded);

    // Full success clears the record and the attachment list.
    assert!(session.is_empty());
    assert_eq!(fields, FormFields::default());

    // Each service was called exactly once.
    assert_eq!(state.sheet_hits.load(Ordering::SeqCst), 1);
    assert_eq!(state.document_hits.load(Ordering::SeqCst), 1);

    // The spreadsheet row is the camelCase projection with numeric quantity.
    let row = state.last_row.lock().unwrap().clone().expect("row posted");
    assert_eq!(row["date"], "2024-01-01");
    assert_eq!(row["orderNumber"], "B1");
    assert_eq!(row["ticketNumber"], "T1");
    assert_eq!(row["quantity"], 5);

    // The upload carries the destination, the named PDF, and the caption.
    let upload = state
        .last_upload
        .lock()
        .unwrap()
        .clone()
        .expect("document uploaded");
    assert_eq!(upload.chat_id, "-1000");
    assert_eq!(upload.file_name, "B1.pdf");
    assert_eq!(upload.caption, "📦 C1");
    assert_eq!(page_image_widths(&upload.pdf), vec![24]);
}

#[tokio::test]
async fn document_rejection_fails_and_keeps_the_record() {
    let (state, base) = spawn_services(false).await;
    let mut dispatcher = Dispatcher::new(config_for(&base)).unwrap();
    let mut fields = complete_fields();
    let mut session = session_with(&[jpeg_bytes(16, 16)]);

    let report = dispatcher.submit(&mut fields, &mut session).await.unwrap();

    // The spreadsheet call went through, but ok:false fails the whole
    // submission and nothing is cleared.
    assert!(report.sheet.delivered);
    assert!(!report.document.delivered);
    assert!(!report.succeeded());
    assert_eq!(dispatcher.state(), SubmitState::Failed);
    assert_eq!(session.len(), 1);
    assert_eq!(fields, complete_fields());
    assert_eq!(state.sheet_hits.load(Ordering::SeqCst), 1);

    let err = report.into_result().unwrap_err();
    assert!(matches!(
        err,
        RelayError::DeliveryFailed {
            sheet_delivered: true,
            document_delivered: false,
        }
    ));
}

#[tokio::test]
async fn sheet_transport_failure_fails_and_keeps_the_record() {
    let (state, base) = spawn_services(true).await;
    let config = RelayConfig::builder()
        .sheet_url(dead_url())
        .document_url(format!("{base}/send"))
        .chat_id("-1000")
        .build()
        .unwrap();
    let mut dispatcher = Dispatcher::new(config).unwrap();
    let mut fields = complete_fields();
    let mut session = session_with(&[jpeg_bytes(16, 16)]);

    let report = dispatcher.submit(&mut fields, &mut session).await.unwrap();

    assert!(!report.sheet.delivered);
    assert!(report.sheet.detail.is_some(), "transport failure is recorded");
    assert!(report.document.delivered);
    assert!(!report.succeeded());
    assert_eq!(session.len(), 1, "record kept for retry");
    assert_eq!(state.document_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn zero_images_blocks_before_any_network_call() {
    let (state, base) = spawn_services(true).await;
    let mut dispatcher = Dispatcher::new(config_for(&base)).unwrap();
    let mut fields = complete_fields();
    let mut session = CaptureSession::new();

    let err = dispatcher
        .submit(&mut fields, &mut session)
        .await
        .unwrap_err();

    match err {
        RelayError::ValidationFailed { errors } => {
            assert_eq!(errors, vec!["At least one image is required"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(dispatcher.state(), SubmitState::Idle);
    assert_eq!(state.sheet_hits.load(Ordering::SeqCst), 0);
    assert_eq!(state.document_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_fields_reported_in_order_before_any_network_call() {
    let (state, base) = spawn_services(true).await;
    let mut dispatcher = Dispatcher::new(config_for(&base)).unwrap();
    let mut fields = FormFields::default();
    let mut session = CaptureSession::new();

    let err = dispatcher
        .submit(&mut fields, &mut session)
        .await
        .unwrap_err();

    match err {
        RelayError::ValidationFailed { errors } => {
            assert_eq!(
                errors,
                vec![
                    "Date is required",
                    "Article is required",
                    "Client is required",
                    "Quantity is required",
                    "At least one image is required",
                ]
            );
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(state.sheet_hits.load(Ordering::SeqCst), 0);
    assert_eq!(state.document_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn bad_quantity_blocks_before_any_network_call() {
    let (state, base) = spawn_services(true).await;
    let mut dispatcher = Dispatcher::new(config_for(&base)).unwrap();
    let mut fields = complete_fields();
    fields.quantity = "five".into();
    let mut session = session_with(&[jpeg_bytes(16, 16)]);

    let err = dispatcher
        .submit(&mut fields, &mut session)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Quantity"));
    assert_eq!(state.sheet_hits.load(Ordering::SeqCst), 0);
    assert_eq!(state.document_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn multi_image_submission_keeps_page_order() {
    let (state, base) = spawn_services(true).await;
    let mut dispatcher = Dispatcher::new(config_for(&base)).unwrap();
    let mut fields = complete_fields();
    let mut session = session_with(&[
        jpeg_bytes(30, 30),
        jpeg_bytes(50, 50),
        jpeg_bytes(70, 70),
    ]);

    let report = dispatcher.submit(&mut fields, &mut session).await.unwrap();

    assert!(report.succeeded());
    assert_eq!(report.stats.page_count, 3);

    let upload = state.last_upload.lock().unwrap().clone().unwrap();
    assert_eq!(
        page_image_widths(&upload.pdf),
        vec![30, 50, 70],
        "one page per image, in capture order"
    );
}

#[tokio::test]
async fn removed_image_is_not_delivered() {
    let (state, base) = spawn_services(true).await;
    let mut dispatcher = Dispatcher::new(config_for(&base)).unwrap();
    let mut fields = complete_fields();

    let mut session = CaptureSession::new();
    session.add_image(jpeg_bytes(30, 30)).unwrap();
    let dropped = session.add_image(jpeg_bytes(50, 50)).unwrap();
    assert!(session.remove_image(&dropped));

    let report = dispatcher.submit(&mut fields, &mut session).await.unwrap();
    assert!(report.succeeded());

    let upload = state.last_upload.lock().unwrap().clone().unwrap();
    assert_eq!(page_image_widths(&upload.pdf), vec![30]);
}

#[tokio::test]
async fn missing_order_number_falls_back_to_timestamped_name() {
    let (state, base) = spawn_services(true).await;
    let mut dispatcher = Dispatcher::new(config_for(&base)).unwrap();
    let mut fields = complete_fields();
    fields.order_number.clear();
    let mut session = session_with(&[jpeg_bytes(16, 16)]);

    let report = dispatcher.submit(&mut fields, &mut session).await.unwrap();
    assert!(report.succeeded());

    let upload = state.last_upload.lock().unwrap().clone().unwrap();
    assert!(
        upload.file_name.starts_with("submission_") && upload.file_name.ends_with(".pdf"),
        "got: {}",
        upload.file_name
    );
}

#[tokio::test]
async fn caption_defaults_to_the_bare_client_name() {
    let (state, base) = spawn_services(true).await;
    let config = RelayConfig::builder()
        .sheet_url(format!("{base}/ingest"))
        .document_url(format!("{base}/send"))
        .chat_id("-1000")
        .caption_prefix("")
        .build()
        .unwrap();
    let mut dispatcher = Dispatcher::new(config).unwrap();
    let mut fields = complete_fields();
    let mut session = session_with(&[jpeg_bytes(16, 16)]);

    dispatcher.submit(&mut fields, &mut session).await.unwrap();

    let upload = state.last_upload.lock().unwrap().clone().unwrap();
    assert_eq!(upload.caption, "C1");
}

#[tokio::test]
async fn dry_run_touches_no_endpoint() {
    let (state, base) = spawn_services(true).await;
    let dispatcher = Dispatcher::new(config_for(&base)).unwrap();
    let fields = complete_fields();
    let session = session_with(&[jpeg_bytes(16, 16)]);

    let pdf = dispatcher.dry_run(&fields, &session).unwrap();
    assert!(pdf.starts_with(b"%PDF"));
    assert_eq!(page_image_widths(&pdf), vec![16]);
    assert_eq!(state.sheet_hits.load(Ordering::SeqCst), 0);
    assert_eq!(state.document_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn draft_round_trip_feeds_a_later_submission() {
    let (state, base) = spawn_services(true).await;
    let dir = tempfile::tempdir().unwrap();

    let config = RelayConfig::builder()
        .sheet_url(format!("{base}/ingest"))
        .document_url(format!("{base}/send"))
        .chat_id("-1000")
        .draft_path(dir.path().join("draft.json"))
        .build()
        .unwrap();

    // Save a half-finished record.
    let store = DraftStore::new(&config).unwrap();
    let partial = FormFields {
        date: "2024-01-01".into(),
        client: "C1".into(),
        ..Default::default()
    };
    store.save(&partial).unwrap();

    // Pick it up later, fill in the rest, submit.
    let mut fields = store.load().unwrap().expect("draft present").fields;
    fields.article = "A1".into();
    fields.quantity = "5".into();
    let mut session = session_with(&[jpeg_bytes(16, 16)]);

    let mut dispatcher = Dispatcher::new(config).unwrap();
    let report = dispatcher.submit(&mut fields, &mut session).await.unwrap();
    assert!(report.succeeded());

    let row = state.last_row.lock().unwrap().clone().expect("row posted");
    assert_eq!(row["client"], "C1");
    assert_eq!(row["quantity"], 5);
}

#[tokio::test]
async fn failed_submission_can_be_retried_and_succeed() {
    // First attempt against a rejecting document service, second against
    // an accepting one: the record survives the failure and goes through
    // unchanged on the retry.
    let (_rejecting, base1) = spawn_services(false).await;
    let mut dispatcher = Dispatcher::new(config_for(&base1)).unwrap();
    let mut fields = complete_fields();
    let mut session = session_with(&[jpeg_bytes(16, 16)]);

    let report = dispatcher.submit(&mut fields, &mut session).await.unwrap();
    assert!(!report.succeeded());
    assert_eq!(session.len(), 1);

    let (accepting, base2) = spawn_services(true).await;
    let mut dispatcher = Dispatcher::new(config_for(&base2)).unwrap();
    let report = dispatcher.submit(&mut fields, &mut session).await.unwrap();

    assert!(report.succeeded());
    assert!(session.is_empty());
    assert_eq!(accepting.document_hits.load(Ordering::SeqCst), 1);
}
