//! Active-link resolution
//!
//! A pass recomputes from scratch: every link loses the active class, each
//! `href` is resolved against the current location, and the last link whose
//! path (and fragment, when the link names one) matches is marked active.

use url::Url;

use crate::config::NavConfig;
use crate::error::{NavError, NavResult};
use crate::host::Host;

/// Path and fragment a link or location points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    pub path: String,
    /// Non-empty fragment without the leading `#`
    pub fragment: Option<String>,
}

impl LinkTarget {
    /// Parse an absolute URL
    pub fn parse(href: &str) -> NavResult<Self> {
        let url = Url::parse(href).map_err(|_| NavError::InvalidUrl(href.to_string()))?;
        Ok(Self::from_url(&url))
    }

    /// Resolve `href` relative to `base`
    pub fn resolve(base: &Url, href: &str) -> NavResult<Self> {
        let url = base
            .join(href)
            .map_err(|_| NavError::InvalidUrl(href.to_string()))?;
        Ok(Self::from_url(&url))
    }

    fn from_url(url: &Url) -> Self {
        Self {
            path: url.path().to_string(),
            fragment: url.fragment().filter(|f| !f.is_empty()).map(str::to_string),
        }
    }

    /// A link without a fragment matches any fragment of the same path
    pub fn matches(&self, location: &LinkTarget) -> bool {
        self.path == location.path
            && match &self.fragment {
                None => true,
                Some(fragment) => location.fragment.as_deref() == Some(fragment.as_str()),
            }
    }
}

/// Inject the active-link style rule unless an element with its id exists
pub fn ensure_active_style<H: Host>(host: &H, config: &NavConfig) -> NavResult<()> {
    if host.element_by_id(&config.links.style_id).is_some() {
        return Ok(());
    }
    let css = config.links.active_rule(&config.classes.active_link);
    host.inject_stylesheet(&config.links.style_id, &css)?;
    log::debug!("injected active-link style #{}", config.links.style_id);
    Ok(())
}

/// Mark and return the link representing the current location
pub fn resolve_active_link<H: Host>(host: &H, config: &NavConfig) -> NavResult<Option<H::Node>> {
    if let Err(err) = ensure_active_style(host, config) {
        log::debug!("could not inject active-link style: {err}");
    }

    let href = host.location_href()?;
    let base = Url::parse(&href).map_err(|_| NavError::InvalidUrl(href.clone()))?;
    let location = LinkTarget::from_url(&base);
    let active_class = &config.classes.active_link;

    let mut active = None;
    for link in host.query_all(&config.links.link_selector())? {
        if let Err(err) = host.remove_class(&link, active_class) {
            log::debug!("could not clear active class: {err}");
            continue;
        }
        let Some(target) = host.attribute(&link, "href") else {
            continue;
        };
        match LinkTarget::resolve(&base, &target) {
            // Later matches overwrite earlier ones.
            Ok(resolved) if resolved.matches(&location) => active = Some(link),
            Ok(_) => {}
            Err(err) => log::debug!("skipping link: {err}"),
        }
    }

    if let Some(link) = &active {
        host.add_class(link, active_class)?;
    }
    Ok(active)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://hr.example.com/admin/employees/list?page=2#today").unwrap()
    }

    #[test]
    fn test_relative_resolution() {
        let base = base();
        assert_eq!(
            LinkTarget::resolve(&base, "edit").unwrap().path,
            "/admin/employees/edit"
        );
        assert_eq!(
            LinkTarget::resolve(&base, "../attendance").unwrap().path,
            "/admin/attendance"
        );
        assert_eq!(LinkTarget::resolve(&base, "/admin").unwrap().path, "/admin");
        assert_eq!(
            LinkTarget::resolve(&base, "#today").unwrap(),
            LinkTarget {
                path: "/admin/employees/list".into(),
                fragment: Some("today".into()),
            }
        );
    }

    #[test]
    fn test_fragment_only_required_when_link_has_one() {
        let location = LinkTarget::parse("https://x.test/a/b#sec").unwrap();
        let plain = LinkTarget::parse("https://x.test/a/b").unwrap();
        let same = LinkTarget::parse("https://x.test/a/b#sec").unwrap();
        let other = LinkTarget::parse("https://x.test/a/b#other").unwrap();
        assert!(plain.matches(&location));
        assert!(same.matches(&location));
        assert!(!other.matches(&location));

        let bare = LinkTarget::parse("https://x.test/a/b#").unwrap();
        assert_eq!(bare.fragment, None);
    }

    #[test]
    fn test_query_is_ignored_for_matching() {
        let location = LinkTarget::parse("https://x.test/list?page=3").unwrap();
        let link = LinkTarget::parse("https://x.test/list?sort=name").unwrap();
        assert!(link.matches(&location));
    }

    #[test]
    fn test_invalid_location() {
        assert!(matches!(
            LinkTarget::parse("not a url"),
            Err(NavError::InvalidUrl(_))
        ));
    }
}
