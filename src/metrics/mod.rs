use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

// ============================================================================
// Metrics Module - Prometheus counters for order-table outcomes
// ============================================================================
//
// Counts what the orchestrators decide:
// - Discontinuations the store accepted or rejected
// - Confirmations declined or left unanswered
// - Duplicate submissions suppressed by the guard
// - Edit flows started
// - Ambiguous concept resolutions
//
// The registry is exposed for whatever exporter the host application uses.
// ============================================================================

pub struct Metrics {
    registry: Registry,

    pub discontinues_accepted: IntCounterVec,
    pub discontinues_failed: IntCounterVec,
    pub confirmations: IntCounterVec,
    pub duplicates_suppressed: IntCounter,
    pub edits_started: IntCounterVec,
    pub ambiguous_resolutions: IntCounter,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let discontinues_accepted = IntCounterVec::new(
            Opts::new("order_discontinues_accepted_total", "Discontinue commands the store accepted"),
            &["variant"],
        )?;
        registry.register(Box::new(discontinues_accepted.clone()))?;

        let discontinues_failed = IntCounterVec::new(
            Opts::new("order_discontinues_failed_total", "Discontinue commands the store rejected"),
            &["variant"],
        )?;
        registry.register(Box::new(discontinues_failed.clone()))?;

        let confirmations = IntCounterVec::new(
            Opts::new("order_confirmations_total", "Discontinue confirmations by decision"),
            &["decision"],
        )?;
        registry.register(Box::new(confirmations.clone()))?;

        let duplicates_suppressed = IntCounter::new(
            "order_duplicate_submissions_suppressed_total",
            "Discontinue attempts suppressed while another was in flight",
        )?;
        registry.register(Box::new(duplicates_suppressed.clone()))?;

        let edits_started = IntCounterVec::new(
            Opts::new("order_edits_started_total", "Edit flows started"),
            &["variant"],
        )?;
        registry.register(Box::new(edits_started.clone()))?;

        let ambiguous_resolutions = IntCounter::new(
            "order_ambiguous_concept_resolutions_total",
            "Concept lookups that matched more than one candidate",
        )?;
        registry.register(Box::new(ambiguous_resolutions.clone()))?;

        Ok(Self {
            registry,
            discontinues_accepted,
            discontinues_failed,
            confirmations,
            duplicates_suppressed,
            edits_started,
            ambiguous_resolutions,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_discontinue(&self, variant: &str, success: bool) {
        if success {
            self.discontinues_accepted.with_label_values(&[variant]).inc();
        } else {
            self.discontinues_failed.with_label_values(&[variant]).inc();
        }
    }

    pub fn record_confirmation(&self, decision: &str) {
        self.confirmations.with_label_values(&[decision]).inc();
    }

    pub fn record_duplicate(&self) {
        self.duplicates_suppressed.inc();
    }

    pub fn record_edit(&self, variant: &str) {
        self.edits_started.with_label_values(&[variant]).inc();
    }

    pub fn record_ambiguity(&self) {
        self.ambiguous_resolutions.inc();
    }
}
