//! Chart lifecycle
//!
//! Each chart kind has one handle that owns at most one live instance.
//! Rendering a kind always destroys the previous instance before a new one
//! is mounted on the anchor.

pub mod adapters;

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

use crate::api::Pair;
use crate::view::document::{anchor, Document};
use adapters::ChartConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    RequestsPerMinute,
    Methods,
    StatusCodes,
    UserAgents,
    Referers,
    SizeDistribution,
    Hourly,
}

impl ChartKind {
    pub const ALL: [ChartKind; 7] = [
        ChartKind::RequestsPerMinute,
        ChartKind::Methods,
        ChartKind::StatusCodes,
        ChartKind::UserAgents,
        ChartKind::Referers,
        ChartKind::SizeDistribution,
        ChartKind::Hourly,
    ];

    /// Anchor the chart is mounted on
    pub fn anchor(&self) -> &'static str {
        match self {
            ChartKind::RequestsPerMinute => anchor::RPM_CHART,
            ChartKind::Methods => anchor::METHOD_CHART,
            ChartKind::StatusCodes => anchor::STATUS_CHART,
            ChartKind::UserAgents => anchor::USER_AGENT_CHART,
            ChartKind::Referers => anchor::REFERER_CHART,
            ChartKind::SizeDistribution => anchor::SIZE_CHART,
            ChartKind::Hourly => anchor::HOURLY_CHART,
        }
    }

    fn build(&self, series: &[Pair]) -> ChartConfig {
        match self {
            ChartKind::RequestsPerMinute => adapters::requests_per_minute(series),
            ChartKind::Methods => adapters::method_distribution(series),
            ChartKind::StatusCodes => adapters::status_codes(series),
            ChartKind::UserAgents => adapters::top_user_agents(series),
            ChartKind::Referers => adapters::top_referers(series),
            ChartKind::SizeDistribution => adapters::size_distribution(series),
            ChartKind::Hourly => adapters::hourly_distribution(series),
        }
    }

    /// The RPM chart shows a placeholder point instead of disappearing.
    fn renders_when_empty(&self) -> bool {
        matches!(self, ChartKind::RequestsPerMinute)
    }
}

/// A chart mounted on an anchor
#[derive(Debug, Clone, PartialEq)]
pub struct ChartInstance {
    pub id: Uuid,
    pub kind: ChartKind,
    pub config: ChartConfig,
}

/// Outcome of one adapter call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Engine missing, tab hidden or anchor absent: nothing touched
    Skipped,
    /// Previous instance destroyed, nothing to show
    Cleared,
    /// A fresh instance is mounted
    Mounted,
}

/// Owner of the single instance of one chart kind
#[derive(Debug)]
pub struct ChartHandle {
    kind: ChartKind,
    instance: Option<ChartInstance>,
    created: u64,
    destroyed: u64,
}

impl ChartHandle {
    fn new(kind: ChartKind) -> Self {
        Self {
            kind,
            instance: None,
            created: 0,
            destroyed: 0,
        }
    }

    pub fn instance(&self) -> Option<&ChartInstance> {
        self.instance.as_ref()
    }

    pub fn is_live(&self) -> bool {
        self.instance.is_some()
    }

    /// Drop the live instance without touching the anchor
    fn release(&mut self) -> bool {
        match self.instance.take() {
            Some(old) => {
                debug!("Destroying {:?} chart {}", self.kind, old.id);
                self.destroyed += 1;
                true
            }
            None => false,
        }
    }

    fn destroy(&mut self, doc: &mut Document) {
        if self.release() {
            doc.update(self.kind.anchor(), |n| n.chart = None);
        }
    }

    /// Replace the instance. The anchor is written once, so an unchanged
    /// config produces no patch.
    fn mount(&mut self, doc: &mut Document, config: ChartConfig) {
        self.release();
        let json = config.to_json();
        let instance = ChartInstance {
            id: Uuid::new_v4(),
            kind: self.kind,
            config,
        };
        doc.update(self.kind.anchor(), |n| n.chart = Some(json));
        self.created += 1;
        self.instance = Some(instance);
    }

    /// Instances created minus instances destroyed; never above one
    pub fn live_count(&self) -> u64 {
        self.created - self.destroyed
    }
}

/// One handle per chart kind
#[derive(Debug)]
pub struct ChartRegistry {
    engine_available: bool,
    handles: BTreeMap<ChartKind, ChartHandle>,
}

impl ChartRegistry {
    pub fn new(engine_available: bool) -> Self {
        let handles = ChartKind::ALL.iter().map(|k| (*k, ChartHandle::new(*k))).collect();
        Self {
            engine_available,
            handles,
        }
    }

    pub fn engine_available(&self) -> bool {
        self.engine_available
    }

    pub fn handle(&self, kind: ChartKind) -> Option<&ChartHandle> {
        self.handles.get(&kind)
    }

    /// Live instances across all kinds
    pub fn live_instances(&self) -> u64 {
        self.handles.values().map(ChartHandle::live_count).sum()
    }

    /// Charts only draw when the engine is there, the dashboard tab is
    /// showing and the anchor exists.
    fn can_render(&self, doc: &Document, kind: ChartKind) -> bool {
        self.engine_available
            && doc.has_class(anchor::DASHBOARD_TAB, "active")
            && doc.contains(kind.anchor())
    }

    /// Render one chart from a `(label, value)` series.
    pub fn render(&mut self, doc: &mut Document, kind: ChartKind, series: &[Pair]) -> RenderOutcome {
        if !self.can_render(doc, kind) {
            return RenderOutcome::Skipped;
        }
        let Some(handle) = self.handles.get_mut(&kind) else {
            return RenderOutcome::Skipped;
        };

        if series.is_empty() && !kind.renders_when_empty() {
            handle.destroy(doc);
            return RenderOutcome::Cleared;
        }

        handle.mount(doc, kind.build(series));
        RenderOutcome::Mounted
    }
}
