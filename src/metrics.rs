//! Aggregate statistics over a batch of evaluation results.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use crate::result::EvalResult;

/// Pure aggregation over a fixed list of results.
///
/// Every statistic is a function of the result list alone; the underlying
/// tallies are computed once on first access and memoized, so accessors
/// are cheap to call repeatedly and in any order.
#[derive(Debug)]
pub struct Metrics {
    results: Vec<EvalResult>,
    totals: OnceLock<Totals>,
    frequencies: OnceLock<Frequencies>,
}

#[derive(Debug, Default)]
struct Totals {
    total_actions: usize,
    total_successful_actions: usize,
    total_full_matches: usize,
    total_partial_matches: usize,
    total_extra_actions: usize,
}

#[derive(Debug, Default)]
struct Frequencies {
    extra: HashMap<String, usize>,
    successful: HashMap<String, usize>,
    failed: HashMap<String, usize>,
}

impl Metrics {
    /// Builds metrics over the given results.
    pub fn new(results: Vec<EvalResult>) -> Self {
        Self {
            results,
            totals: OnceLock::new(),
            frequencies: OnceLock::new(),
        }
    }

    /// The underlying result list, in collection order.
    pub fn results(&self) -> &[EvalResult] {
        &self.results
    }

    fn totals(&self) -> &Totals {
        self.totals.get_or_init(|| {
            let mut t = Totals::default();
            for result in &self.results {
                let matches = result.match_results();
                t.total_actions += matches.len();
                t.total_successful_actions += matches.values().filter(|&&m| m).count();
                t.total_full_matches += usize::from(result.is_full_match());
                t.total_partial_matches += usize::from(result.is_partial_match());
                t.total_extra_actions += result.extra_actions().len();
            }
            t
        })
    }

    fn frequencies(&self) -> &Frequencies {
        self.frequencies.get_or_init(|| {
            let mut f = Frequencies::default();
            for result in &self.results {
                for (action, matched) in result.match_results() {
                    let bucket = if matched { &mut f.successful } else { &mut f.failed };
                    *bucket.entry(action.to_string()).or_insert(0) += 1;
                }
                for action in result.extra_actions() {
                    *f.extra.entry(action.to_string()).or_insert(0) += 1;
                }
            }
            f
        })
    }

    /// Total number of expected-action entries across all results.
    pub fn total_actions(&self) -> usize {
        self.totals().total_actions
    }

    /// Number of expected-action entries that matched.
    pub fn total_successful_actions(&self) -> usize {
        self.totals().total_successful_actions
    }

    /// Number of results where every expected action matched.
    pub fn total_full_matches(&self) -> usize {
        self.totals().total_full_matches
    }

    /// Number of results where at least one expected action matched.
    pub fn total_partial_matches(&self) -> usize {
        self.totals().total_partial_matches
    }

    /// Total number of observed actions with no expected counterpart.
    pub fn total_extra_actions(&self) -> usize {
        self.totals().total_extra_actions
    }

    /// Matched fraction of all expected-action entries; 0 when there are
    /// no expected actions at all.
    pub fn action_success_rate(&self) -> f64 {
        ratio(self.total_successful_actions(), self.total_actions())
    }

    /// Fraction of results that fully matched; 0 when there are no
    /// results.
    pub fn full_match_rate(&self) -> f64 {
        ratio(self.total_full_matches(), self.results.len())
    }

    /// Fraction of results that at least partially matched; 0 when there
    /// are no results.
    pub fn partial_match_rate(&self) -> f64 {
        ratio(self.total_partial_matches(), self.results.len())
    }

    /// How often each unexpected action recurs, keyed by its rendered
    /// form.
    pub fn extra_action_frequency(&self) -> &HashMap<String, usize> {
        &self.frequencies().extra
    }

    /// How often each matched expected action recurs.
    pub fn successful_actions_frequency(&self) -> &HashMap<String, usize> {
        &self.frequencies().successful
    }

    /// How often each unmatched expected action recurs.
    pub fn failed_actions_frequency(&self) -> &HashMap<String, usize> {
        &self.frequencies().failed
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Evaluation metrics over {} results", self.results.len())?;
        writeln!(
            f,
            "  actions: {}/{} matched ({:.1}%)",
            self.total_successful_actions(),
            self.total_actions(),
            self.action_success_rate() * 100.0
        )?;
        writeln!(
            f,
            "  full matches: {} ({:.1}%)",
            self.total_full_matches(),
            self.full_match_rate() * 100.0
        )?;
        writeln!(
            f,
            "  partial matches: {} ({:.1}%)",
            self.total_partial_matches(),
            self.partial_match_rate() * 100.0
        )?;
        write!(f, "  extra actions: {}", self.total_extra_actions())?;

        // Sorted for stable output; HashMap iteration order is not.
        for (label, frequency) in [
            ("failed", self.failed_actions_frequency()),
            ("extra", self.extra_action_frequency()),
        ] {
            if frequency.is_empty() {
                continue;
            }
            let mut entries: Vec<_> = frequency.iter().collect();
            entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
            write!(f, "\n  recurring {label} actions:")?;
            for (action, count) in entries {
                write!(f, "\n    {count}x {action}")?;
            }
        }
        Ok(())
    }
}
