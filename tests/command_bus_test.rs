//! Addressed command dispatch tests

mod common;

use common::{viewer, FakeBackend, LETTER};
use pdf_viewer_mcp::error::Error;
use pdf_viewer_mcp::viewer::{
    Command, CommandBus, NavigationCommand, Target, ViewerInstance, ZoomLevel,
};
use pretty_assertions::assert_eq;

struct Fixture {
    bus: CommandBus<FakeBackend>,
    a: ViewerInstance<FakeBackend>,
    b: ViewerInstance<FakeBackend>,
    anonymous: ViewerInstance<FakeBackend>,
}

async fn fixture() -> Fixture {
    let backend = FakeBackend::new().with_document("five.pdf", 5, LETTER);
    let bus = CommandBus::new();

    let a = viewer(Some("a"), &backend);
    let b = viewer(Some("b"), &backend);
    let anonymous = viewer(None, &backend);
    for v in [&a, &b, &anonymous] {
        v.set_source("five.pdf").await.unwrap();
        bus.attach(v.clone()).unwrap();
    }

    Fixture {
        bus,
        a,
        b,
        anonymous,
    }
}

fn instance(id: &str) -> Target {
    Target::Instance(id.to_string())
}

/// Wait until every command queued for `target` so far has been applied.
/// Page 0 is always rejected, so the flush itself changes nothing.
async fn flush(bus: &CommandBus<FakeBackend>, target: Target) {
    bus.dispatch(NavigationCommand::new(target, Command::GotoPage(0)))
        .await
        .unwrap();
}

fn pages(f: &Fixture) -> (u32, u32, u32) {
    (
        f.a.current_page(),
        f.b.current_page(),
        f.anonymous.current_page(),
    )
}

#[tokio::test]
async fn test_dispatch_only_moves_addressed_viewer() {
    let f = fixture().await;

    let changed = f
        .bus
        .dispatch(NavigationCommand::new(instance("b"), Command::NextPage))
        .await
        .unwrap();
    f.bus
        .dispatch(NavigationCommand::new(instance("b"), Command::NextPage))
        .await
        .unwrap();

    assert!(changed);
    assert_eq!(pages(&f), (1, 3, 1));
}

#[tokio::test]
async fn test_dispatch_reports_rejected_command() {
    let f = fixture().await;

    let changed = f
        .bus
        .dispatch(NavigationCommand::new(instance("a"), Command::PrevPage))
        .await
        .unwrap();

    assert!(!changed);
    assert_eq!(f.a.current_page(), 1);
}

#[tokio::test]
async fn test_remote_commands_are_addressed() {
    let f = fixture().await;

    f.bus.instance("a").goto_page(4);
    f.bus.instance("a").change_zoom("150");
    flush(&f.bus, instance("a")).await;

    assert_eq!(pages(&f), (4, 1, 1));
    assert_eq!(f.a.zoom_level(), ZoomLevel::Percent(150.0));
    assert_eq!(f.b.zoom_level(), ZoomLevel::Percent(100.0));
}

#[tokio::test]
async fn test_commands_apply_in_arrival_order() {
    let f = fixture().await;
    let remote = f.bus.instance("b");

    remote.goto_page(5);
    remote.prev_page();
    remote.prev_page();
    remote.next_page();
    flush(&f.bus, instance("b")).await;

    assert_eq!(f.b.current_page(), 4);
}

#[tokio::test]
async fn test_unaddressed_reaches_only_anonymous_viewer() {
    let f = fixture().await;

    f.bus.next_page();
    f.bus.next_page();
    f.bus.prev_page();
    flush(&f.bus, Target::Unaddressed).await;

    assert_eq!(pages(&f), (1, 1, 2));
}

#[tokio::test]
async fn test_unaddressed_without_anonymous_viewer_is_dropped() {
    let backend = FakeBackend::new().with_document("five.pdf", 5, LETTER);
    let bus = CommandBus::new();
    let a = viewer(Some("a"), &backend);
    a.set_source("five.pdf").await.unwrap();
    bus.attach(a.clone()).unwrap();

    bus.next_page();
    flush(&bus, instance("a")).await;

    assert_eq!(a.current_page(), 1);
    let result = bus
        .dispatch(NavigationCommand::new(Target::Unaddressed, Command::NextPage))
        .await;
    assert!(matches!(result, Err(Error::ViewerNotFound { .. })));
}

#[tokio::test]
async fn test_unknown_target_is_not_found() {
    let f = fixture().await;

    // Fire-and-forget drops silently
    f.bus.instance("c").next_page();

    let result = f
        .bus
        .dispatch(NavigationCommand::new(instance("c"), Command::NextPage))
        .await;
    assert!(matches!(result, Err(Error::ViewerNotFound { id }) if id == "c"));
    assert_eq!(pages(&f), (1, 1, 1));
}

#[tokio::test]
async fn test_duplicate_attach_rejected() {
    let f = fixture().await;
    let backend = FakeBackend::new();

    let result = f.bus.attach(viewer(Some("a"), &backend));
    assert!(matches!(result, Err(Error::ViewerAlreadyAttached { .. })));

    let result = f.bus.attach(viewer(None, &backend));
    assert!(matches!(result, Err(Error::ViewerAlreadyAttached { .. })));
    assert_eq!(f.bus.len(), 3);
}

#[tokio::test]
async fn test_detach_stops_delivery() {
    let f = fixture().await;

    let detached = f.bus.detach(&instance("a")).unwrap();
    assert_eq!(detached.id(), Some("a"));
    assert!(f.bus.get(&instance("a")).is_none());
    assert!(f.bus.detach(&instance("a")).is_none());

    f.bus.instance("a").next_page();
    let result = f
        .bus
        .dispatch(NavigationCommand::new(instance("a"), Command::NextPage))
        .await;
    assert!(matches!(result, Err(Error::ViewerNotFound { .. })));
    assert_eq!(f.a.current_page(), 1);

    // The identifier is free again
    f.bus.attach(f.a.clone()).unwrap();
    f.bus.instance("a").next_page();
    flush(&f.bus, instance("a")).await;
    assert_eq!(f.a.current_page(), 2);
}

#[tokio::test]
async fn test_targets_lists_attached_viewers() {
    let f = fixture().await;

    let mut targets: Vec<String> = f.bus.targets().iter().map(ToString::to_string).collect();
    targets.sort();

    assert_eq!(targets, vec!["<unaddressed>", "a", "b"]);
    assert!(!f.bus.is_empty());
}

#[tokio::test]
async fn test_oversized_zoom_keeps_worker_alive() {
    let f = fixture().await;

    let changed = f
        .bus
        .dispatch(NavigationCommand::new(
            instance("a"),
            Command::ChangeZoom(ZoomLevel::parse("1e30")),
        ))
        .await
        .unwrap();
    assert!(changed);
    assert_eq!(f.a.snapshot().surface_width, 612);

    let moved = f
        .bus
        .dispatch(NavigationCommand::new(instance("a"), Command::NextPage))
        .await
        .unwrap();
    assert!(moved);
    assert_eq!(f.a.current_page(), 2);

    // A sane zoom renders again
    f.bus
        .dispatch(NavigationCommand::new(
            instance("a"),
            Command::ChangeZoom(ZoomLevel::parse("200")),
        ))
        .await
        .unwrap();
    let snapshot = f.a.snapshot();
    assert_eq!(snapshot.rendered_page, Some(2));
    assert_eq!(snapshot.surface_width, 1224);
}
