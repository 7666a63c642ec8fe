//! Round controller: iteratively narrow the candidate set, then rank.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use pr_link::model::Profile;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::engine::ProxyEngine;
use crate::latency::{probe, Candidate, LatencyResult, ProbeEvent, ProbeSettings};

/// Probing policy: how many passes, and the per-pass settings.
#[derive(Debug, Clone)]
pub struct RoundPlan {
    pub rounds: usize,
    pub settings: ProbeSettings,
}

impl Default for RoundPlan {
    fn default() -> Self {
        Self {
            rounds: 3,
            settings: ProbeSettings::default(),
        }
    }
}

/// Receives per-round lifecycle callbacks for live reporting.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// A round is about to probe `candidates` profiles. The returned sender,
    /// if any, gets one [`ProbeEvent`] per completed probe and closes when
    /// the round is done.
    async fn round_started(
        &self,
        round: usize,
        rounds: usize,
        candidates: usize,
    ) -> Option<mpsc::Sender<ProbeEvent>>;

    /// The round finished with `survivors` successful probes.
    async fn round_finished(&self, round: usize, survivors: usize);
}

/// Run the probing rounds over tagged, validated profiles.
///
/// Round 1 probes every profile; each later round probes only the previous
/// round's successes. An empty candidate set or a parent cancellation stops
/// early, returning whatever survived so far; neither is an error.
pub async fn run_rounds(
    cancel: &CancellationToken,
    plan: &RoundPlan,
    engine: Arc<dyn ProxyEngine>,
    profiles: &[Profile],
    progress: Option<&dyn ProgressSink>,
) -> Vec<LatencyResult> {
    let mut survivors: Vec<LatencyResult> = Vec::new();

    for round in 1..=plan.rounds {
        if cancel.is_cancelled() {
            tracing::info!(round, "probing canceled before round start");
            break;
        }

        let candidates: Vec<Candidate> = if round == 1 {
            profiles
                .iter()
                .filter_map(|p| match engine.dialer(&p.descriptor) {
                    Ok(dialer) => Some(Candidate {
                        tag: p.tag().to_string(),
                        dialer,
                    }),
                    Err(e) => {
                        tracing::warn!(tag = %p.tag(), error = %e, "dialer unavailable");
                        None
                    }
                })
                .collect()
        } else {
            survivors
                .iter()
                .map(|r| Candidate {
                    tag: r.tag.clone(),
                    dialer: r.dialer.clone(),
                })
                .collect()
        };

        if candidates.is_empty() {
            tracing::info!(round, "no candidates left, stopping early");
            break;
        }

        tracing::info!(
            round,
            rounds = plan.rounds,
            candidates = candidates.len(),
            "probing round"
        );

        let events = match progress {
            Some(sink) => sink.round_started(round, plan.rounds, candidates.len()).await,
            None => None,
        };

        let results = probe(cancel, &plan.settings, engine.clone(), candidates, events).await;
        survivors = results.into_iter().filter(LatencyResult::is_success).collect();

        if let Some(sink) = progress {
            sink.round_finished(round, survivors.len()).await;
        }
    }

    survivors
}

/// Final ranking: successes only, stable-sorted ascending by delay, ties
/// keeping their encounter order.
pub fn rank(mut results: Vec<LatencyResult>) -> Vec<LatencyResult> {
    results.retain(LatencyResult::is_success);
    results.sort_by_key(|r| r.delay_ms);
    results
}

/// Map ranked results back to the original URIs of their profiles. Results
/// whose tag no longer resolves are skipped.
pub fn reassociate<'a>(results: &[LatencyResult], profiles: &'a [Profile]) -> Vec<&'a str> {
    let by_tag: HashMap<&str, &str> = profiles
        .iter()
        .filter_map(|p| p.tag.as_deref().map(|t| (t, p.uri.as_str())))
        .collect();

    results
        .iter()
        .filter_map(|r| by_tag.get(r.tag.as_str()).copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeError;
    use crate::testing::{delays_by_tag, result, MockEngine, Script};
    use crate::validate::validate_and_tag;
    use pr_link::parse_profile;
    use std::time::Duration;

    fn profile(server: &str) -> Profile {
        parse_profile(&format!("trojan://pw@{server}:443#t")).unwrap()
    }

    fn plan(rounds: usize) -> RoundPlan {
        RoundPlan {
            rounds,
            settings: ProbeSettings {
                test_url: "http://probe.test/generate_204".to_string(),
                timeout: Duration::from_millis(500),
                concurrency: 8,
            },
        }
    }

    #[tokio::test]
    async fn later_rounds_probe_only_survivors() {
        let engine = Arc::new(MockEngine::new([
            ("h0", Script::Delay(1)),
            ("h1", Script::Fail),
            ("h2", Script::Delay(1)),
        ]));
        let outcome = validate_and_tag(
            engine.as_ref(),
            vec![profile("h0"), profile("h1"), profile("h2")],
        );

        let cancel = CancellationToken::new();
        let survivors =
            run_rounds(&cancel, &plan(2), engine.clone(), &outcome.profiles, None).await;

        assert_eq!(survivors.len(), 2);
        let delays = delays_by_tag(&survivors);
        assert!(delays.contains_key("outbound-0"));
        assert!(delays.contains_key("outbound-2"));
        // Round 1 probed 3 candidates, round 2 only the 2 survivors.
        assert_eq!(engine.probe_count(), 5);
    }

    #[tokio::test]
    async fn zero_successes_in_round_one_halts_before_round_two() {
        let engine = Arc::new(MockEngine::new([("h0", Script::Fail), ("h1", Script::Fail)]));
        let outcome = validate_and_tag(engine.as_ref(), vec![profile("h0"), profile("h1")]);

        let cancel = CancellationToken::new();
        let survivors =
            run_rounds(&cancel, &plan(3), engine.clone(), &outcome.profiles, None).await;

        assert!(survivors.is_empty());
        assert_eq!(engine.probe_count(), 2);
    }

    /// Sink that cancels the shared token once the given round completes.
    struct CancelAfterRound {
        round: usize,
        cancel: CancellationToken,
    }

    #[async_trait]
    impl ProgressSink for CancelAfterRound {
        async fn round_started(
            &self,
            _round: usize,
            _rounds: usize,
            _candidates: usize,
        ) -> Option<mpsc::Sender<ProbeEvent>> {
            None
        }

        async fn round_finished(&self, round: usize, _survivors: usize) {
            if round == self.round {
                self.cancel.cancel();
            }
        }
    }

    #[tokio::test]
    async fn cancellation_between_rounds_keeps_prior_survivors() {
        let engine = Arc::new(MockEngine::new([
            ("h0", Script::Delay(1)),
            ("h1", Script::Delay(1)),
        ]));
        let outcome = validate_and_tag(engine.as_ref(), vec![profile("h0"), profile("h1")]);

        let cancel = CancellationToken::new();
        let sink = CancelAfterRound {
            round: 1,
            cancel: cancel.clone(),
        };
        let survivors = run_rounds(
            &cancel,
            &plan(3),
            engine.clone(),
            &outcome.profiles,
            Some(&sink),
        )
        .await;

        // Round 1 completed; rounds 2 and 3 never started.
        assert_eq!(survivors.len(), 2);
        assert_eq!(engine.probe_count(), 2);
    }

    #[tokio::test]
    async fn canceled_parent_terminates_before_round_one() {
        let engine = Arc::new(MockEngine::new([("h0", Script::Delay(1))]));
        let outcome = validate_and_tag(engine.as_ref(), vec![profile("h0")]);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let survivors =
            run_rounds(&cancel, &plan(3), engine.clone(), &outcome.profiles, None).await;

        assert!(survivors.is_empty());
        assert_eq!(engine.probe_count(), 0);
    }

    #[test]
    fn rank_sorts_ascending_and_keeps_tie_order() {
        let results = vec![
            result("a", 50, true),
            result("b", 10, true),
            result("c", 30, true),
            result("d", -1, false),
            result("e", 30, true),
        ];
        let ranked = rank(results);
        let order: Vec<&str> = ranked.iter().map(|r| r.tag.as_str()).collect();
        // 30ms tie: "c" was encountered before "e" and stays first.
        assert_eq!(order, ["b", "c", "e", "a"]);
    }

    #[test]
    fn reassociate_recovers_original_uris() {
        let engine = MockEngine::new([("h0", Script::Delay(1)), ("h1", Script::Delay(1))]);
        let outcome = validate_and_tag(&engine, vec![profile("h0"), profile("h1")]);

        let results = vec![result("outbound-1", 7, true), result("outbound-0", 9, true)];
        let uris = reassociate(&results, &outcome.profiles);
        assert_eq!(uris, ["trojan://pw@h1:443#t", "trojan://pw@h0:443#t"]);
    }

    #[test]
    fn reassociate_skips_unknown_tags() {
        let engine = MockEngine::new([("h0", Script::Delay(1))]);
        let outcome = validate_and_tag(&engine, vec![profile("h0")]);
        let results = vec![result("outbound-9", 7, true)];
        assert!(reassociate(&results, &outcome.profiles).is_empty());
    }

    #[test]
    fn failed_results_never_rank() {
        let ranked = rank(vec![result("t", -1, false)]);
        assert!(ranked.is_empty());
        // Sanity: the failure carries an error kind.
        assert!(matches!(
            result("t", -1, false).error,
            Some(ProbeError::Io(_))
        ));
    }
}
