//! Headless sidebar trace
//!
//! Replays a scripted session against the in-memory sidebar and prints one
//! JSON snapshot per step.
//!
//! ```text
//! nav-trace script.json [config.json]
//! ```
//!
//! ```json
//! {
//!   "location": "https://hr.example.com/admin/employees",
//!   "steps": ["settle", {"click": "employees"}, "settle", {"navigate": "https://hr.example.com/admin/requests/leave"}]
//! }
//! ```

use std::fs;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use admin_nav::prelude::*;

#[derive(Debug, Deserialize)]
struct Script {
    location: String,
    #[serde(default)]
    layout: Option<SidebarLayout>,
    steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
enum Step {
    /// Click a group's toggle
    Click(String),
    /// Press a key on a group's toggle
    Key { group: String, key: String },
    /// Click the first link with this href
    ClickLink(String),
    /// Click the page body
    ClickOutside,
    /// Change location and run the highlight pass
    Navigate(String),
    Frames,
    Transitions,
    Settle,
    /// One bootstrap retry tick
    Tick,
}

#[derive(Debug, Serialize)]
struct TraceLine<'a> {
    step: usize,
    action: &'a Step,
    active: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry: Option<TickOutcome>,
    snapshot: MenuSnapshot,
}

fn toggle_of(host: &MemoryHost, config: &NavConfig, group: &str) -> Result<MemoryNode> {
    let group = config
        .group(group)
        .ok_or_else(|| anyhow!("unknown group '{group}'"))?;
    host.element_by_id(&group.toggle_id)
        .ok_or_else(|| anyhow!("toggle #{} not rendered", group.toggle_id))
}

fn active_href(host: &MemoryHost, config: &NavConfig) -> Option<String> {
    let selector = format!("a.{}", config.classes.active_link);
    host.query_all(&selector)
        .ok()?
        .first()
        .and_then(|link| host.attribute(link, "href"))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let script_path = args
        .next()
        .context("usage: nav-trace <script.json> [config.json]")?;
    let config = match args.next() {
        Some(path) => {
            let json = fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            NavConfig::from_json(&json).with_context(|| format!("parsing {path}"))?
        }
        None => NavConfig::default(),
    };
    let script: Script = serde_json::from_str(
        &fs::read_to_string(&script_path).with_context(|| format!("reading {script_path}"))?,
    )
    .with_context(|| format!("parsing {script_path}"))?;

    let layout = script.layout.unwrap_or_else(SidebarLayout::admin);
    let host = layout.build(&config, &script.location);
    let mut menu = NavMenu::new(config.clone())?;

    let (mut retry, status) = RetryLoop::start(&mut menu, &host);
    log::info!("startup at {}: {:?}", script.location, status);

    for (index, step) in script.steps.iter().enumerate() {
        let mut tick = None;
        match step {
            Step::Click(group) => {
                let toggle = toggle_of(&host, &config, group)?;
                host.click(&mut menu, toggle);
            }
            Step::Key { group, key } => {
                let toggle = toggle_of(&host, &config, group)?;
                host.key(&mut menu, toggle, key);
            }
            Step::ClickLink(href) => {
                let link = host
                    .link(href)
                    .ok_or_else(|| anyhow!("no link with href '{href}'"))?;
                host.click(&mut menu, link);
            }
            Step::ClickOutside => {
                host.click(&mut menu, host.body());
            }
            Step::Navigate(href) => {
                host.navigate(&mut menu, href);
            }
            Step::Frames => {
                host.run_frames(&mut menu);
            }
            Step::Transitions => host.finish_transitions(&mut menu),
            Step::Settle => host.settle(&mut menu),
            Step::Tick => tick = Some(retry.tick(&mut menu, &host)),
        }

        let line = TraceLine {
            step: index + 1,
            action: step,
            active: active_href(&host, &config),
            retry: tick,
            snapshot: menu.snapshot(&host),
        };
        println!("{}", serde_json::to_string(&line)?);
    }

    log::info!("replayed {} steps", script.steps.len());
    Ok(())
}
