use std::collections::HashMap;

use crate::assessment::config::ReadinessConfig;
use crate::assessment::round_half_up;
use crate::assessment::types::{DomainReadiness, DomainStatus, ReadinessReport, Trend};
use crate::constants::MIXED_DOMAIN;
use crate::store::operations::runs::{QuizMode, QuizRun};

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    correct: u64,
    total: u64,
}

impl Tally {
    fn add(&mut self, correct: u64, total: u64) {
        self.correct += correct;
        self.total += total;
    }

    fn percent(self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64 * 100.0
        }
    }
}

/// Per-domain tallies that remember first-seen order.
#[derive(Default)]
struct DomainTallies {
    order: Vec<String>,
    index: HashMap<String, usize>,
    tallies: Vec<Tally>,
}

impl DomainTallies {
    fn entry(&mut self, domain: &str) -> &mut Tally {
        let idx = match self.index.get(domain) {
            Some(idx) => *idx,
            None => {
                let idx = self.order.len();
                self.order.push(domain.to_string());
                self.index.insert(domain.to_string(), idx);
                self.tallies.push(Tally::default());
                idx
            }
        };
        &mut self.tallies[idx]
    }

    fn into_entries(self) -> impl Iterator<Item = (String, Tally)> {
        self.order.into_iter().zip(self.tallies)
    }
}

pub struct ReadinessPredictor<'a> {
    config: &'a ReadinessConfig,
}

impl<'a> ReadinessPredictor<'a> {
    pub fn new(config: &'a ReadinessConfig) -> Self {
        Self { config }
    }

    /// `runs` must be newest first. `expected_domains` are listed even when
    /// nothing was answered in them; only a user with no runs at all gets an
    /// empty breakdown.
    pub fn compute(&self, exam_id: &str, runs: &[QuizRun], expected_domains: &[String]) -> ReadinessReport {
        if runs.is_empty() {
            return ReadinessReport::empty(exam_id);
        }

        let eligible: Vec<&QuizRun> = runs
            .iter()
            .take(self.config.run_cap)
            .filter(|run| run.mode != QuizMode::Diagnostic && run.total > 0)
            .collect();

        let mut overall = Tally::default();
        let mut recent = Tally::default();
        let mut mock_exams_taken = 0;
        let mut domains = DomainTallies::default();
        for domain in expected_domains {
            domains.entry(domain);
        }

        for (position, run) in eligible.iter().enumerate() {
            let correct = u64::from(run.correct);
            let total = u64::from(run.total);
            overall.add(correct, total);
            if position < self.config.recent_window {
                recent.add(correct, total);
            }
            if run.mode == QuizMode::Simulation {
                mock_exams_taken += 1;
            }

            if run.answers.is_empty() {
                match run.domain.as_deref() {
                    Some(domain) if domain != MIXED_DOMAIN && !domain.is_empty() => {
                        domains.entry(domain).add(correct, total)
                    }
                    _ => {}
                }
                continue;
            }
            for answer in &run.answers {
                if let Some(domain) = answer.domain.as_deref().filter(|d| !d.is_empty()) {
                    domains.entry(domain).add(u64::from(answer.is_correct), 1);
                }
            }
        }

        let overall_accuracy = overall.percent();
        let recent_accuracy = recent.percent();
        let trend = if recent_accuracy > overall_accuracy + self.config.trend_band {
            Trend::Improving
        } else if recent_accuracy < overall_accuracy - self.config.trend_band {
            Trend::Declining
        } else {
            Trend::Stable
        };
        let score = round_half_up(
            overall_accuracy * self.config.overall_weight + recent_accuracy * self.config.recent_weight,
        );

        let mut breakdown: Vec<DomainReadiness> = domains
            .into_entries()
            .map(|(domain, tally)| {
                let pct = tally.percent();
                DomainReadiness {
                    domain,
                    score: round_half_up(pct) as u32,
                    total_questions: tally.total,
                    status: self.domain_status(tally.total, pct),
                }
            })
            .collect();
        // Stable sort: ties keep encounter order.
        breakdown.sort_by_key(|d| d.status.priority());

        ReadinessReport {
            exam_id: exam_id.to_string(),
            overall_score: (overall.total > 0).then(|| score.clamp(0.0, 100.0) as u32),
            trend,
            domains: breakdown,
            total_questions_answered: overall.total,
            mock_exams_taken,
            is_preliminary: overall.total < self.config.preliminary_floor,
        }
    }

    fn domain_status(&self, total: u64, pct: f64) -> DomainStatus {
        if total < self.config.domain_insufficient_floor {
            DomainStatus::Insufficient
        } else if pct >= self.config.strong_threshold {
            DomainStatus::Strong
        } else if pct < self.config.weak_threshold {
            DomainStatus::Weak
        } else {
            DomainStatus::Moderate
        }
    }
}
