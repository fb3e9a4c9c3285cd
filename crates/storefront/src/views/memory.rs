//! In-memory page used by tests and the CLI.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{Navigator, Region, RenderTarget};

/// Last known state of one region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionState {
    pub html: Option<String>,
    pub text: Option<String>,
    pub visible: Option<bool>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Default)]
struct PageState {
    regions: BTreeMap<Region, RegionState>,
    alerts: Vec<String>,
    navigations: Vec<String>,
}

/// A page that records everything rendered into it.
#[derive(Debug, Default)]
pub struct MemoryPage {
    state: Mutex<PageState>,
}

impl MemoryPage {
    /// Create a blank page.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state of `region`.
    #[must_use]
    pub fn region(&self, region: Region) -> RegionState {
        self.lock().regions.get(&region).cloned().unwrap_or_default()
    }

    /// Last HTML rendered into `region`.
    #[must_use]
    pub fn html(&self, region: Region) -> Option<String> {
        self.region(region).html
    }

    /// Last text set on `region`.
    #[must_use]
    pub fn text(&self, region: Region) -> Option<String> {
        self.region(region).text
    }

    /// Last visibility set on `region`.
    #[must_use]
    pub fn is_visible(&self, region: Region) -> Option<bool> {
        self.region(region).visible
    }

    /// Last enabled state set on `region`.
    #[must_use]
    pub fn is_enabled(&self, region: Region) -> Option<bool> {
        self.region(region).enabled
    }

    /// Every region touched so far, in region order.
    #[must_use]
    pub fn regions(&self) -> Vec<(Region, RegionState)> {
        self.lock()
            .regions
            .iter()
            .map(|(region, state)| (*region, state.clone()))
            .collect()
    }

    /// Alerts shown so far, oldest first.
    #[must_use]
    pub fn alerts(&self) -> Vec<String> {
        self.lock().alerts.clone()
    }

    /// Navigations requested so far, oldest first.
    #[must_use]
    pub fn navigations(&self) -> Vec<String> {
        self.lock().navigations.clone()
    }

    /// The most recent navigation, if any.
    #[must_use]
    pub fn last_navigation(&self) -> Option<String> {
        self.lock().navigations.last().cloned()
    }
}

impl RenderTarget for MemoryPage {
    fn render(&self, region: Region, html: String) {
        self.lock().regions.entry(region).or_default().html = Some(html);
    }

    fn set_text(&self, region: Region, text: String) {
        self.lock().regions.entry(region).or_default().text = Some(text);
    }

    fn set_visible(&self, region: Region, visible: bool) {
        self.lock().regions.entry(region).or_default().visible = Some(visible);
    }

    fn set_enabled(&self, region: Region, enabled: bool) {
        self.lock().regions.entry(region).or_default().enabled = Some(enabled);
    }
}

impl Navigator for MemoryPage {
    fn alert(&self, message: &str) {
        self.lock().alerts.push(message.to_owned());
    }

    fn navigate(&self, path: &str) {
        self.lock().navigations.push(path.to_owned());
    }
}
