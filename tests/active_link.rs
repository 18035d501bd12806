use std::collections::BTreeMap;

use admin_nav::prelude::*;

const ORIGIN: &str = "https://hr.example.com";

fn setup_with(layout: SidebarLayout, path: &str) -> (MemoryHost, NavMenu<MemoryNode>) {
    let config = NavConfig::default();
    let host = layout.build(&config, &format!("{ORIGIN}{path}"));
    let menu = NavMenu::new(config).unwrap();
    (host, menu)
}

fn setup(path: &str) -> (MemoryHost, NavMenu<MemoryNode>) {
    setup_with(SidebarLayout::admin(), path)
}

fn node(host: &MemoryHost, id: &str) -> MemoryNode {
    host.element_by_id(id)
        .unwrap_or_else(|| panic!("#{id} not in document"))
}

fn url(path: &str) -> String {
    format!("{ORIGIN}{path}")
}

fn single_group(key: &str, links: &[&str]) -> SidebarLayout {
    let mut groups = BTreeMap::new();
    groups.insert(key.to_string(), links.iter().map(|l| l.to_string()).collect());
    SidebarLayout {
        top_links: Vec::new(),
        groups,
        row_height: 36,
    }
}

#[test]
fn test_active_link_marked_and_style_injected_once() {
    let (host, mut menu) = setup("/admin/employees/new");

    let active = menu.highlight(&host);
    assert_eq!(active, host.link("/admin/employees/new"));
    assert!(host.has_class(&active.unwrap(), "nav-active"));

    let style = node(&host, "nav-active-style");
    assert_eq!(
        host.text(style),
        "aside nav a.nav-active{color:rgba(219,234,254,0.9) !important;}"
    );

    menu.highlight(&host);
    menu.highlight(&host);
    assert_eq!(host.query_all("head style").unwrap().len(), 1);
}

#[test]
fn test_failed_style_injection_still_highlights() {
    let (host, mut menu) = setup("/admin/employees/new");
    host.fail_mutations(host.head());

    let active = menu.highlight(&host);
    assert_eq!(active, host.link("/admin/employees/new"));
    assert!(host.has_class(&active.unwrap(), "nav-active"));
    assert!(host.element_by_id("nav-active-style").is_none());

    assert!(menu.state("employees").unwrap().auto_opened);
    assert_eq!(menu.animation_state(&host, "employees"), Some(AnimationState::Opening));
    assert!(host.has_class(&node(&host, "nav-employees-toggle"), "text-gray-300"));
}

#[test]
fn test_previous_mark_is_cleared() {
    let (host, mut menu) = setup("/admin/employees/new");
    menu.highlight(&host);

    let active = host.navigate(&mut menu, &url("/admin/attendance"));
    assert_eq!(active, host.link("/admin/attendance"));
    assert_eq!(host.query_all("a.nav-active").unwrap(), vec![active.unwrap()]);
    assert!(!host.has_class(&host.link("/admin/employees/new").unwrap(), "nav-active"));
}

#[test]
fn test_last_matching_link_wins() {
    let mut layout = SidebarLayout::admin();
    layout.top_links.push("/admin/employees".to_string());
    let (host, mut menu) = setup_with(layout, "/admin/employees");

    let matches = host.links_with_href("/admin/employees");
    assert_eq!(matches.len(), 2);

    let active = menu.highlight(&host).unwrap();
    assert_eq!(active, matches[1]);
    assert!(!host.has_class(&matches[0], "nav-active"));
}

#[test]
fn test_fragment_must_match_only_when_link_has_one() {
    let (host, mut menu) = setup("/admin/attendance/reports#weekly");
    assert_eq!(menu.highlight(&host), None);

    let active = host.navigate(&mut menu, &url("/admin/attendance/reports#monthly"));
    assert_eq!(active, host.link("/admin/attendance/reports#monthly"));

    // No fragment on the link: any fragment of the location matches
    let active = host.navigate(&mut menu, &url("/admin/employees#top"));
    assert_eq!(active, host.link("/admin/employees"));
}

#[test]
fn test_relative_hrefs_resolve_against_location() {
    let layout = single_group("employees", &["new", "../attendance"]);
    let (host, mut menu) = setup_with(layout, "/admin/employees/new");

    assert_eq!(menu.highlight(&host), host.link("new"));

    let active = host.navigate(&mut menu, &url("/admin/attendance"));
    assert_eq!(active, None);

    let active = host.navigate(&mut menu, &url("/admin/employees/x"));
    assert_eq!(active, None);

    let active = host.navigate(&mut menu, &url("/attendance"));
    assert_eq!(active, host.link("../attendance"));
}

#[test]
fn test_unparsable_location_resolves_nothing() {
    let (host, mut menu) = setup("/admin/employees");
    host.set_location("not a url");
    assert_eq!(menu.highlight(&host), None);
    assert!(host.query_all("a.nav-active").unwrap().is_empty());
}

#[test]
fn test_auto_open_runs_once_then_reveals_without_animation() {
    let (host, mut menu) = setup("/admin/employees");

    menu.highlight(&host);
    assert!(menu.state("employees").unwrap().auto_opened);
    assert_eq!(menu.animation_state(&host, "employees"), Some(AnimationState::Opening));
    assert_eq!(host.pending_frames().len(), 1);
    host.settle(&mut menu);
    assert_eq!(menu.animation_state(&host, "employees"), Some(AnimationState::Open));

    host.navigate(&mut menu, &url("/admin/employees#filters"));
    assert!(host.pending_frames().is_empty());
    assert_eq!(menu.animation_state(&host, "employees"), Some(AnimationState::Open));
    let toggle = node(&host, "nav-employees-toggle");
    assert_eq!(host.attribute(&toggle, "aria-expanded").as_deref(), Some("true"));
}

#[test]
fn test_parent_marker_follows_active_group() {
    let (host, mut menu) = setup("/admin/employees");
    let employees = node(&host, "nav-employees-toggle");
    let requests = node(&host, "nav-requests-toggle");

    menu.highlight(&host);
    assert!(host.has_class(&employees, "text-gray-300"));
    assert!(!host.has_class(&requests, "text-gray-300"));

    host.navigate(&mut menu, &url("/admin/requests/leave"));
    assert!(!host.has_class(&employees, "text-gray-300"));
    assert!(host.has_class(&requests, "text-gray-300"));
}

#[test]
fn test_user_close_sticks_until_navigation_leaves_group() {
    let (host, mut menu) = setup("/admin/employees");
    RetryLoop::start(&mut menu, &host);
    host.settle(&mut menu);

    let toggle = node(&host, "nav-employees-toggle");
    let panel = node(&host, "nav-employees-sub");
    host.click(&mut menu, toggle);
    host.settle(&mut menu);
    assert!(menu.state("employees").unwrap().user_closed);

    // Re-highlighting inside the group respects the close
    host.navigate(&mut menu, &url("/admin/employees/new"));
    assert!(host.pending_frames().is_empty());
    assert_eq!(menu.animation_state(&host, "employees"), Some(AnimationState::Closed));
    // A user-closed group is not marked as the active parent either
    assert!(!host.has_class(&toggle, "text-gray-300"));

    // Leaving the group clears the intent
    host.navigate(&mut menu, &url("/admin/requests/leave"));
    assert!(!menu.state("employees").unwrap().user_closed);

    // Coming back expands it again
    host.navigate(&mut menu, &url("/admin/employees"));
    assert!(!host.has_class(&panel, "hidden"));
    assert_eq!(menu.animation_state(&host, "employees"), Some(AnimationState::Open));
    assert_eq!(host.attribute(&toggle, "aria-expanded").as_deref(), Some("true"));
}

#[test]
fn test_no_active_link_keeps_intent() {
    let (host, mut menu) = setup("/admin/employees");
    RetryLoop::start(&mut menu, &host);
    host.settle(&mut menu);
    host.click(&mut menu, node(&host, "nav-employees-toggle"));
    host.settle(&mut menu);

    assert_eq!(host.navigate(&mut menu, &url("/profile")), None);
    assert!(menu.state("employees").unwrap().user_closed);
}
