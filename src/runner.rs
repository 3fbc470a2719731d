//! One notifier pass: open store, fetch, filter, notify, persist, summarize.

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{RunError, RunState};
use crate::ingest::types::{FeedItem, FeedSource};
use crate::matcher::{match_item, MatchResult};
use crate::notify::{format_notification, DeliveryOutcome, DispatchReport, Dispatcher};
use crate::store::SeenStore;

/// What a run needs beyond its collaborators.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub keywords: Vec<String>,
    pub endpoints: Vec<String>,
    pub seen_store: PathBuf,
    pub dry_run: bool,
}

impl RunPlan {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            keywords: cfg.keywords.clone(),
            endpoints: cfg.http_push.clone(),
            seen_store: cfg.seen_store.clone(),
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EndpointTally {
    pub endpoint: String,
    pub delivered: usize,
    pub failed: usize,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub items_fetched: usize,
    pub already_seen: usize,
    /// New items whose title matched at least one keyword.
    pub matched: usize,
    /// Matched items delivered to at least one endpoint.
    pub notified: usize,
    pub marked_seen: usize,
    pub no_destinations: bool,
    pub dry_run: bool,
    /// Per endpoint, in configured order; duplicates are folded together.
    pub endpoints: Vec<EndpointTally>,
}

impl RunSummary {
    pub fn no_matches(&self) -> bool {
        self.matched == 0
    }

    pub fn delivery_failures(&self) -> usize {
        self.endpoints.iter().map(|t| t.failed).sum()
    }

    pub fn tally(&self, endpoint: &str) -> Option<&EndpointTally> {
        self.endpoints.iter().find(|t| t.endpoint == endpoint)
    }

    /// Operator-facing notices; informational, never failures.
    pub fn notices(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.no_matches() {
            out.push("no matches found in the feed".to_string());
        }
        if self.no_destinations {
            out.push("no destinations configured (httpPush is empty)".to_string());
        }
        if self.dry_run && !self.no_matches() {
            out.push("dry run: nothing was sent or marked seen".to_string());
        }
        out
    }

    fn record(&mut self, report: &DispatchReport) {
        match report {
            DispatchReport::NoDestinations => self.no_destinations = true,
            DispatchReport::Attempted(outcomes) => {
                for o in outcomes {
                    let pos = self.endpoints.iter().position(|t| t.endpoint == o.endpoint());
                    let idx = match pos {
                        Some(i) => i,
                        None => {
                            self.endpoints.push(EndpointTally {
                                endpoint: o.endpoint().to_string(),
                                ..Default::default()
                            });
                            self.endpoints.len() - 1
                        }
                    };
                    let tally = &mut self.endpoints[idx];
                    match o {
                        DeliveryOutcome::Delivered { .. } => tally.delivered += 1,
                        DeliveryOutcome::Failed { error, .. } => {
                            tally.failed += 1;
                            tally.last_error = Some(error.clone());
                        }
                    }
                }
            }
        }
        if report.any_delivered() {
            self.notified += 1;
        }
    }

    pub fn log(&self) {
        info!(
            fetched = self.items_fetched,
            already_seen = self.already_seen,
            matched = self.matched,
            notified = self.notified,
            marked_seen = self.marked_seen,
            delivery_failures = self.delivery_failures(),
            dry_run = self.dry_run,
            "run summary"
        );
        for t in &self.endpoints {
            if t.failed > 0 {
                warn!(
                    endpoint = %t.endpoint,
                    delivered = t.delivered,
                    failed = t.failed,
                    last_error = t.last_error.as_deref().unwrap_or_default(),
                    "endpoint tally"
                );
            } else {
                info!(endpoint = %t.endpoint, delivered = t.delivered, "endpoint tally");
            }
        }
        for notice in self.notices() {
            if notice.starts_with("no destinations") {
                warn!("{notice}");
            } else {
                info!("{notice}");
            }
        }
    }
}

fn advance(state: &mut RunState, next: RunState) {
    debug!(from = %state, to = %next, "run state");
    *state = next;
}

/// Drive one run to `Done`, or stop at the first fatal condition.
/// The store is dropped (released) on every early return.
pub async fn run_once(
    plan: &RunPlan,
    source: &dyn FeedSource,
    dispatcher: &Dispatcher,
) -> Result<RunSummary, RunError> {
    let mut state = RunState::Init;

    let mut store = match SeenStore::open(&plan.seen_store).await {
        Ok(s) => s,
        Err(e) => {
            advance(&mut state, RunState::Failed);
            return Err(RunError::Store {
                state: RunState::Init,
                source: e,
            });
        }
    };

    advance(&mut state, RunState::Fetching);
    let items = match source.fetch_items().await {
        Ok(v) if v.is_empty() => {
            advance(&mut state, RunState::Failed);
            return Err(RunError::EmptyFeed {
                feed: source.name().to_string(),
            });
        }
        Ok(v) => v,
        Err(e) => {
            advance(&mut state, RunState::Failed);
            return Err(RunError::Fetch(e));
        }
    };
    info!(feed = source.name(), items = items.len(), "feed fetched");

    advance(&mut state, RunState::Filtering);
    let mut summary = RunSummary {
        items_fetched: items.len(),
        dry_run: plan.dry_run,
        ..Default::default()
    };
    let matches = select_new_matches(&items, &store, &plan.keywords, &mut summary);
    summary.matched = matches.len();

    advance(&mut state, RunState::Notifying);
    for m in &matches {
        let payload = format_notification(m);
        if plan.dry_run {
            info!(id = %m.item.id, text = %payload.text, "dry run: notification not sent");
            continue;
        }

        let report = dispatcher.dispatch(&payload, &plan.endpoints).await;
        if report == DispatchReport::NoDestinations {
            debug!(id = %m.item.id, "no destinations configured; notification not sent");
        }
        summary.record(&report);

        // Evaluated is what counts for dedup, not delivered.
        match store.mark_seen(&m.item.id, Utc::now()).await {
            Ok(_) => summary.marked_seen += 1,
            Err(e) => {
                advance(&mut state, RunState::Failed);
                return Err(RunError::Store {
                    state: RunState::Notifying,
                    source: e,
                });
            }
        }
    }

    advance(&mut state, RunState::Finalizing);
    store.close();
    summary.log();

    advance(&mut state, RunState::Done);
    Ok(summary)
}

/// New (unseen) items whose titles match, in feed order. Repeated ids within one
/// feed are evaluated once.
pub fn select_new_matches(
    items: &[FeedItem],
    store: &SeenStore,
    keywords: &[String],
    summary: &mut RunSummary,
) -> Vec<MatchResult> {
    let mut picked: HashSet<&str> = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        if store.has_seen(&item.id) {
            summary.already_seen += 1;
            debug!(id = %item.id, "already seen");
            continue;
        }
        if picked.contains(item.id.as_str()) {
            debug!(id = %item.id, "duplicate entry in feed");
            continue;
        }
        let Some(m) = match_item(item, keywords) else {
            continue;
        };
        info!(
            keyword = %m.keywords.join(","),
            title = %item.title,
            link = %item.link,
            published = %item.published,
            categories = %item.categories.join(","),
            "matched"
        );
        picked.insert(item.id.as_str());
        out.push(m);
    }
    out
}
