//! Operating modes and the restart policy.
//!
//! Both modes wrap session lifecycles in an unbounded retry loop: any fatal
//! error discards the browsing context and builds a fresh one, logging the
//! failure first. The process never exits on error; it runs until killed.
//!
//! Monitor mode serves every configured airframe type round-robin on one
//! session, bounded by the session-refresh and feed-refresh intervals.
//! Saturation mode races one worker per airframe type, each with its own
//! session and quota, on a bounded pool.

use crate::collect::collect_all_pages;
use crate::config::Config;
use crate::counters::CounterStore;
use crate::error::SessionError;
use crate::extract::extract_offer_table;
use crate::feed::{AcquisitionRule, RuleFeed};
use crate::renderer::DriverFactory;
use crate::scheduler::run_rule;
use crate::session::RemoteSession;
use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

/// Monitor mode: one session, all rules, shared durable counters.
pub struct Monitor {
    cfg: Config,
    factory: Box<dyn DriverFactory>,
    feed: Box<dyn RuleFeed>,
    counters: CounterStore,
}

impl Monitor {
    pub fn new(
        cfg: Config,
        factory: Box<dyn DriverFactory>,
        feed: Box<dyn RuleFeed>,
        counters: CounterStore,
    ) -> Self {
        Self {
            cfg,
            factory,
            feed,
            counters,
        }
    }

    /// Run forever. Each completed session lifetime (the refresh interval
    /// elapsing) or any failure leads to a fresh session; the counters
    /// outlive every restart.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            match self.run_session().await {
                Ok(()) => info!("session refresh interval elapsed, re-authenticating"),
                Err(e) => {
                    error!("session failed, discarding and restarting: {e:#}");
                    tokio::time::sleep(self.cfg.pass_delay).await;
                }
            }
        }
    }

    /// One full session lifecycle: build, authenticate, serve passes until
    /// the refresh interval elapses, tear down.
    pub async fn run_session(&mut self) -> Result<()> {
        let driver = self.factory.connect().await?;
        let mut session = RemoteSession::new(driver, &self.cfg);
        let outcome = self.drive_session(&mut session).await;
        session.close().await;
        outcome
    }

    async fn drive_session(&mut self, session: &mut RemoteSession) -> Result<()> {
        session.login_workflow().await?;
        let refresh_deadline = Instant::now() + self.cfg.session_refresh;
        while Instant::now() < refresh_deadline {
            let rules = self.feed.read_rules().await?;
            let feed_deadline = Instant::now() + self.cfg.feed_refresh;
            while Instant::now() < feed_deadline && Instant::now() < refresh_deadline {
                for rule in &rules {
                    self.run_pass(session, rule).await?;
                }
                tokio::time::sleep(self.cfg.pass_delay).await;
            }
        }
        Ok(())
    }

    /// One scheduling pass for one rule: refresh the results screen, filter,
    /// sweep every page, purchase from the snapshot.
    async fn run_pass(
        &mut self,
        session: &mut RemoteSession,
        rule: &AcquisitionRule,
    ) -> Result<()> {
        // Re-navigating forces a clean un-filtered state for this rule.
        session.goto_results_page().await?;
        if !session.select_filter(&rule.aircraft_type).await? {
            return Ok(());
        }
        let table = collect_all_pages(session).await?;
        if table.is_empty() {
            return Ok(());
        }
        run_rule(session, rule, &table, &mut self.counters).await?;
        Ok(())
    }
}

/// Saturation mode: read the rules once, then race one quota-bounded worker
/// per airframe type on a pool of at most `cfg.max_workers` live sessions.
/// Workers share nothing; each owns its session and its quota counter.
pub async fn run_saturation(
    cfg: Config,
    factory: Arc<dyn DriverFactory>,
    feed: Box<dyn RuleFeed>,
) -> Result<()> {
    let rules = feed.read_rules().await?;
    info!(workers = rules.len(), ceiling = cfg.max_workers, "starting saturation mode");

    let pool = Arc::new(Semaphore::new(cfg.max_workers));
    let mut handles = Vec::with_capacity(rules.len());
    for rule in rules {
        let pool = Arc::clone(&pool);
        let factory = Arc::clone(&factory);
        let cfg = cfg.clone();
        handles.push(tokio::spawn(async move {
            let Ok(_permit) = pool.acquire_owned().await else {
                return;
            };
            saturation_worker(&cfg, factory.as_ref(), &rule).await;
        }));
    }
    for handle in handles {
        let _ = handle.await;
    }
    Ok(())
}

/// One saturation worker: keep a session alive, grab the cheapest-to-find
/// offer (first page, first row) as fast as possible, rebuild the session on
/// any fatal error, stop at quota.
pub async fn saturation_worker(cfg: &Config, factory: &dyn DriverFactory, rule: &AcquisitionRule) {
    let mut purchases = 0u32;
    while purchases < rule.max_airframes {
        let driver = match factory.connect().await {
            Ok(driver) => driver,
            Err(e) => {
                warn!(airframe = %rule.aircraft_type, "failed to build a session: {e:#}");
                tokio::time::sleep(cfg.pass_delay).await;
                continue;
            }
        };
        let mut session = RemoteSession::new(driver, cfg);
        if let Err(e) = session.login_workflow().await {
            warn!(airframe = %rule.aircraft_type, "login failed, retrying: {e}");
            session.close().await;
            continue;
        }

        while purchases < rule.max_airframes {
            let started = Instant::now();
            match saturation_pass(&mut session, rule).await {
                Ok(true) => {
                    purchases += 1;
                    info!(
                        airframe = %rule.aircraft_type,
                        purchases,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "saturation purchase complete"
                    );
                }
                Ok(false) => {
                    // No supply this pass; try again immediately.
                }
                Err(e) if e.is_session_fatal() => {
                    warn!(airframe = %rule.aircraft_type, "session crashed, rebuilding: {e}");
                    break;
                }
                Err(e) => {
                    warn!(airframe = %rule.aircraft_type, "pass failed, retrying: {e}");
                }
            }
        }
        session.close().await;
    }
    info!(airframe = %rule.aircraft_type, purchases, "saturation quota reached");
}

/// One saturation pass: refresh, filter, read only the first page, and if it
/// holds any offer, buy row 1 in place. Returns whether a purchase happened.
async fn saturation_pass(
    session: &mut RemoteSession,
    rule: &AcquisitionRule,
) -> Result<bool, SessionError> {
    session.goto_results_page().await?;
    if !session.select_filter(&rule.aircraft_type).await? {
        return Ok(false);
    }
    let html = session.read_current_page().await?;
    let table = extract_offer_table(&html)?;
    if table.is_empty() {
        return Ok(false);
    }
    session.purchase(None, 1).await?;
    Ok(true)
}
