//! Debounced resize handling. Runs on a paused clock.

mod common;

use common::{drain, viewer, viewer_with, FakeBackend, LETTER};
use pdf_viewer_mcp::viewer::{
    CommandBus, ContainerSize, HostGeometry, Target, ViewerEvent, ViewerOptions, ZoomLevel,
    ZoomMode,
};
use pretty_assertions::assert_eq;
use std::time::Duration;
use tokio::time::{sleep, Instant};

fn geometry(element_width: u32) -> HostGeometry {
    HostGeometry {
        viewport_height: 900,
        element_width,
        element_top: 95,
    }
}

async fn loaded(id: &str, backend: &FakeBackend) -> pdf_viewer_mcp::ViewerInstance<FakeBackend> {
    let v = viewer_with(
        Some(id),
        backend,
        ViewerOptions {
            zoom: ZoomLevel::Mode(ZoomMode::FitWidth),
            geometry: geometry(612),
            ..ViewerOptions::default()
        },
    );
    v.set_source("five.pdf").await.unwrap();
    backend.clear_renders();
    v
}

fn five_pages() -> FakeBackend {
    FakeBackend::new().with_document("five.pdf", 5, LETTER)
}

#[tokio::test(start_paused = true)]
async fn test_resize_burst_renders_once_after_quiet_interval() {
    let backend = five_pages();
    let v = loaded("v1", &backend).await;
    let mut events = v.subscribe();

    v.on_resize(geometry(500));
    sleep(Duration::from_millis(20)).await;
    v.on_resize(geometry(450));
    sleep(Duration::from_millis(20)).await;
    v.on_resize(geometry(306));
    let last = Instant::now();

    sleep(Duration::from_millis(99)).await;
    assert!(backend.renders().is_empty());
    assert_eq!(v.container(), ContainerSize::new(612, 800));

    sleep(Duration::from_millis(2)).await;
    assert!(last.elapsed() >= Duration::from_millis(100));

    let renders = backend.renders();
    assert_eq!(renders.len(), 1);
    assert_eq!(renders[0].page, 1);
    assert_eq!(renders[0].scale, 0.5);
    assert_eq!(v.container(), ContainerSize::new(306, 800));
    assert_eq!(
        drain(&mut events),
        vec![ViewerEvent::PageLoaded { page: 1, total: 5 }]
    );

    // Nothing else fires later
    sleep(Duration::from_millis(500)).await;
    assert_eq!(backend.renders().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_resize_without_document_only_relayouts() {
    let backend = five_pages();
    let v = viewer(Some("v1"), &backend);

    v.on_resize(geometry(640));
    sleep(Duration::from_millis(150)).await;

    assert_eq!(v.container(), ContainerSize::new(640, 800));
    assert!(backend.renders().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_custom_quiet_interval() {
    let backend = five_pages();
    let v = viewer_with(
        Some("v1"),
        &backend,
        ViewerOptions {
            resize_quiet_interval: Duration::from_millis(250),
            ..ViewerOptions::default()
        },
    );

    v.on_resize(geometry(640));
    sleep(Duration::from_millis(200)).await;
    assert_eq!(v.container(), ContainerSize::default());

    sleep(Duration::from_millis(60)).await;
    assert_eq!(v.container(), ContainerSize::new(640, 800));
}

#[tokio::test(start_paused = true)]
async fn test_instances_debounce_independently() {
    let backend = five_pages();
    let a = loaded("a", &backend).await;
    let b = loaded("b", &backend).await;

    a.on_resize(geometry(306));
    sleep(Duration::from_millis(30)).await;
    b.on_resize(geometry(1224));
    sleep(Duration::from_millis(150)).await;

    let mut scales: Vec<f32> = backend.renders().iter().map(|call| call.scale).collect();
    scales.sort_by(f32::total_cmp);
    assert_eq!(scales, vec![0.5, 2.0]);
    assert_eq!(a.container().width, 306);
    assert_eq!(b.container().width, 1224);
}

#[tokio::test(start_paused = true)]
async fn test_detach_cancels_pending_resize() {
    let backend = five_pages();
    let bus = CommandBus::new();
    let v = loaded("v1", &backend).await;
    bus.attach(v.clone()).unwrap();

    v.on_resize(geometry(306));
    bus.detach(&Target::Instance("v1".to_string()));
    sleep(Duration::from_millis(200)).await;

    assert!(backend.renders().is_empty());
    assert_eq!(v.container(), ContainerSize::new(612, 800));
}

#[tokio::test(start_paused = true)]
async fn test_dropped_viewer_does_not_render() {
    let backend = five_pages();
    let v = loaded("v1", &backend).await;

    v.on_resize(geometry(306));
    drop(v);
    sleep(Duration::from_millis(200)).await;

    assert!(backend.renders().is_empty());
}
