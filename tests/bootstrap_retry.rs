use admin_nav::prelude::*;

const ORIGIN: &str = "https://hr.example.com";

fn build(layout: &SidebarLayout, config: &NavConfig, path: &str) -> (MemoryHost, NavMenu<MemoryNode>) {
    let host = layout.build(config, &format!("{ORIGIN}{path}"));
    let menu = NavMenu::new(config.clone()).unwrap();
    (host, menu)
}

fn without(key: &str) -> SidebarLayout {
    let mut layout = SidebarLayout::admin();
    layout.groups.remove(key);
    layout
}

#[test]
fn test_ready_at_startup_needs_no_retry() {
    let config = NavConfig::default();
    let (host, mut menu) = build(&SidebarLayout::admin(), &config, "/admin/dashboard");

    let (mut retry, status) = RetryLoop::start(&mut menu, &host);
    assert_eq!(status, BootStatus::Ready);
    assert!(retry.is_finished());

    assert_eq!(retry.tick(&mut menu, &host), TickOutcome::Ready);
    assert_eq!(retry.attempts(), 0);
}

fn run_until_final(max_attempts: u32) {
    let mut config = NavConfig::default();
    config.retry.max_attempts = max_attempts;
    let layout = SidebarLayout {
        groups: Default::default(),
        ..SidebarLayout::admin()
    };
    let (host, mut menu) = build(&layout, &config, "/admin/dashboard");

    let (mut retry, status) = RetryLoop::start(&mut menu, &host);
    assert_eq!(status, BootStatus::Pending);

    let mut ticks = 0;
    let outcome = loop {
        ticks += 1;
        let outcome = retry.tick(&mut menu, &host);
        if outcome.is_final() || ticks > 10 * max_attempts {
            break outcome;
        }
    };

    assert_eq!(outcome, TickOutcome::Exhausted);
    assert_eq!(ticks, max_attempts);
    assert_eq!(retry.attempts(), max_attempts);

    // Further ticks are inert
    assert_eq!(retry.tick(&mut menu, &host), TickOutcome::Exhausted);
    assert_eq!(retry.attempts(), max_attempts);
}

#[test]
fn test_retry_is_bounded_when_elements_never_appear() {
    assert_eq!(NavConfig::default().retry.max_attempts, 10);
    run_until_final(10);
}

#[test]
fn test_custom_attempt_budget() {
    run_until_final(3);
}

#[test]
fn test_late_markup_is_wired_and_auto_opened() {
    let config = NavConfig::default();
    let layout = without("requests");
    let (host, mut menu) = build(&layout, &config, "/admin/requests/overtime");

    let (mut retry, status) = RetryLoop::start(&mut menu, &host);
    assert_eq!(status, BootStatus::Pending);
    assert_eq!(retry.tick(&mut menu, &host), TickOutcome::Continue);
    assert!(!menu.is_wired("requests"));

    // The requests fragment arrives
    let nav = host.query_all("aside nav").unwrap()[0];
    let links = SidebarLayout::admin().groups["requests"].clone();
    layout.build_group(&host, nav, config.group("requests").unwrap(), &links);

    assert_eq!(retry.tick(&mut menu, &host), TickOutcome::Ready);
    assert_eq!(retry.attempts(), 2);
    assert!(menu.is_wired("requests"));
    assert_eq!(menu.animation_state(&host, "requests"), Some(AnimationState::Opening));

    host.settle(&mut menu);
    assert_eq!(menu.animation_state(&host, "requests"), Some(AnimationState::Open));
}

#[test]
fn test_retries_do_not_duplicate_listeners() {
    let config = NavConfig::default();
    let (host, mut menu) = build(&without("attendance"), &config, "/admin/dashboard");

    let (mut retry, _) = RetryLoop::start(&mut menu, &host);
    while !retry.tick(&mut menu, &host).is_final() {}

    assert_eq!(retry.outcome(), Some(TickOutcome::Exhausted));
    assert_eq!(host.toggle_listener_count("employees"), 1);
    assert_eq!(host.toggle_listener_count("requests"), 1);
    assert_eq!(host.toggle_listener_count("attendance"), 0);
}

#[test]
fn test_snapshot_reflects_partial_wiring() {
    let config = NavConfig::default();
    let (host, mut menu) = build(&without("attendance"), &config, "/admin/employees");
    RetryLoop::start(&mut menu, &host);

    let snapshot = menu.snapshot(&host);
    let keys: Vec<_> = snapshot.groups.iter().map(|g| g.key.as_str()).collect();
    assert_eq!(keys, ["employees", "attendance", "requests"]);

    let employees = &snapshot.groups[0];
    assert!(employees.present && employees.wired && employees.auto_opened);
    assert!(employees.indicator);
    assert_eq!(employees.state, AnimationState::Opening);
    assert_eq!(employees.aria_expanded.as_deref(), Some("true"));

    let attendance = &snapshot.groups[1];
    assert!(!attendance.present && !attendance.wired);
    assert_eq!(attendance.aria_expanded, None);

    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["groups"][2]["state"], "Closed");
}
