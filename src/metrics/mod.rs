//! Usage monitoring over recorded agent sessions.
//!
//! Sessions land in a fixed-capacity FIFO ring; rolling metrics are computed
//! on demand over the last 24 hours of retained history. The error rate is
//! the one lifetime figure: it counts every request since process start and
//! ignores both the ring capacity and the time window.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::orchestrator::AgentSession;

/// Maximum retained session samples; the oldest is evicted on overflow.
pub const HISTORY_CAPACITY: usize = 1000;

/// Metrics aggregation window.
const WINDOW_HOURS: i64 = 24;

/// Usage count for one agent within the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentUsage {
    /// Agent identifier.
    pub agent_id: String,
    /// Sessions served within the window.
    pub count: u64,
}

/// Rolling usage metrics, computed on demand and never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageMetrics {
    /// Tokens consumed within the window.
    pub total_tokens: u64,
    /// Dollar cost within the window.
    pub total_cost: f64,
    /// Distinct users active within the window.
    pub active_users: usize,
    /// Top five agents by session count, ties kept in first-encountered order.
    pub top_agents: Vec<AgentUsage>,
    /// Average latency within the window.
    pub average_latency_ms: f64,
    /// 95th percentile latency within the window.
    pub p95_latency_ms: u64,
    /// 99th percentile latency within the window.
    pub p99_latency_ms: u64,
    /// Lifetime error percentage, unaffected by the window.
    pub error_rate: f64,
    /// Sessions within the window.
    pub window_sessions: usize,
}

/// Coarse system health derived from the rolling metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// All metrics within thresholds.
    Healthy,
    /// Error rate above 5% or average latency above 5000ms.
    Warning,
    /// Error rate above 10% or average latency above 10000ms.
    Critical,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Warning => write!(f, "warning"),
            HealthStatus::Critical => write!(f, "critical"),
        }
    }
}

/// Health status plus the advisory alerts that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemHealth {
    /// Derived tri-state status.
    pub status: HealthStatus,
    /// Lifetime error percentage at evaluation time.
    pub error_rate: f64,
    /// Windowed average latency at evaluation time.
    pub average_latency_ms: f64,
    /// Advisory alert text, empty when healthy.
    pub alerts: Vec<String>,
}

/// One retained session sample.
#[derive(Debug, Clone)]
struct SessionSample {
    agent_id: String,
    user_id: String,
    tokens_used: u64,
    cost: f64,
    latency_ms: u64,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct MonitorState {
    history: VecDeque<SessionSample>,
    total_requests: u64,
    error_count: u64,
}

/// Aggregates session telemetry into rolling metrics and a health status.
#[derive(Default)]
pub struct UsageMonitor {
    state: RwLock<MonitorState>,
}

impl UsageMonitor {
    /// Create an empty monitor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed session.
    pub fn record(&self, session: &AgentSession) {
        let mut state = self.state.write().unwrap();
        state.history.push_back(SessionSample {
            agent_id: session.agent_id.clone(),
            user_id: session.user_id.clone(),
            tokens_used: session.usage.tokens_used,
            cost: session.usage.cost,
            latency_ms: session.usage.latency_ms,
            created_at: session.created_at,
        });
        if state.history.len() > HISTORY_CAPACITY {
            state.history.pop_front();
        }
        state.total_requests += 1;

        debug!(
            session_id = %session.id,
            agent_id = %session.agent_id,
            retained = state.history.len(),
            "Recorded session"
        );
    }

    /// Record a failed orchestration attempt.
    pub fn record_failure(&self, agent_id: &str) {
        let mut state = self.state.write().unwrap();
        state.total_requests += 1;
        state.error_count += 1;
        debug!(agent_id = %agent_id, errors = state.error_count, "Recorded failure");
    }

    /// Sessions currently retained in the ring.
    pub fn retained(&self) -> usize {
        self.state.read().unwrap().history.len()
    }

    /// Compute rolling metrics over the last 24 hours.
    pub fn global_metrics(&self) -> UsageMetrics {
        let state = self.state.read().unwrap();
        let cutoff = Utc::now() - Duration::hours(WINDOW_HOURS);

        let window: Vec<&SessionSample> = state
            .history
            .iter()
            .filter(|s| s.created_at >= cutoff)
            .collect();

        let total_tokens = window.iter().map(|s| s.tokens_used).sum();
        let total_cost = window.iter().map(|s| s.cost).sum();
        let active_users: HashSet<&str> = window.iter().map(|s| s.user_id.as_str()).collect();

        // Count per agent, keeping first-encountered order for tie-breaking.
        let mut order: Vec<String> = Vec::new();
        let mut counts: HashMap<String, u64> = HashMap::new();
        for sample in &window {
            if !counts.contains_key(&sample.agent_id) {
                order.push(sample.agent_id.clone());
            }
            *counts.entry(sample.agent_id.clone()).or_insert(0) += 1;
        }
        let mut top_agents: Vec<AgentUsage> = order
            .into_iter()
            .map(|agent_id| {
                let count = counts[&agent_id];
                AgentUsage { agent_id, count }
            })
            .collect();
        top_agents.sort_by(|a, b| b.count.cmp(&a.count));
        top_agents.truncate(5);

        let mut latencies: Vec<u64> = window.iter().map(|s| s.latency_ms).collect();
        latencies.sort_unstable();
        let average_latency_ms = if latencies.is_empty() {
            0.0
        } else {
            latencies.iter().sum::<u64>() as f64 / latencies.len() as f64
        };

        UsageMetrics {
            total_tokens,
            total_cost,
            active_users: active_users.len(),
            top_agents,
            average_latency_ms,
            p95_latency_ms: percentile(&latencies, 0.95),
            p99_latency_ms: percentile(&latencies, 0.99),
            error_rate: error_rate(state.error_count, state.total_requests),
            window_sessions: window.len(),
        }
    }

    /// Derive a coarse health status from the current metrics.
    pub fn system_health(&self) -> SystemHealth {
        let metrics = self.global_metrics();
        let mut alerts = Vec::new();

        if metrics.error_rate > 10.0 {
            alerts.push(format!(
                "Error rate {:.1}% exceeds the 10% critical threshold",
                metrics.error_rate
            ));
        } else if metrics.error_rate > 5.0 {
            alerts.push(format!(
                "Error rate {:.1}% exceeds the 5% warning threshold",
                metrics.error_rate
            ));
        }

        if metrics.average_latency_ms > 10000.0 {
            alerts.push(format!(
                "Average latency {:.0}ms exceeds the 10000ms critical threshold",
                metrics.average_latency_ms
            ));
        } else if metrics.average_latency_ms > 5000.0 {
            alerts.push(format!(
                "Average latency {:.0}ms exceeds the 5000ms warning threshold",
                metrics.average_latency_ms
            ));
        }

        let status = if metrics.error_rate > 10.0 || metrics.average_latency_ms > 10000.0 {
            HealthStatus::Critical
        } else if metrics.error_rate > 5.0 || metrics.average_latency_ms > 5000.0 {
            HealthStatus::Warning
        } else {
            HealthStatus::Healthy
        };

        SystemHealth {
            status,
            error_rate: metrics.error_rate,
            average_latency_ms: metrics.average_latency_ms,
            alerts,
        }
    }
}

/// Percentile by index `floor(count * p)`, clamped; 0 for an empty slice.
fn percentile(sorted: &[u64], p: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let idx = ((sorted.len() as f64 * p).floor() as usize).min(sorted.len() - 1);
    sorted[idx]
}

/// Lifetime errors over lifetime requests, as a percentage.
fn error_rate(errors: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        errors as f64 / total as f64 * 100.0
    }
}
