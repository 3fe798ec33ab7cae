//! Risk Scorer (spec.md §4.4): a pure function from the drained
//! [`TraceData`] to a [`RiskScore`]. None of `C1`–`C9` touches the network or
//! the cache; everything here is deterministic given its inputs.
//!
//! `original_source/app/services/risk_scorer.py` only carries the base
//! entity-score terms (C1–C4); the temporal/velocity/mixer/clustering/circular
//! terms (C5–C9) are not present there and are implemented directly from
//! spec.md's formulas rather than transcribed from a reference.

use crate::model::{RiskLevel, RiskScore, RiskTag};
use crate::tracer::TraceData;
use chrono::Utc;
use std::collections::{HashMap, HashSet};

/// `scorer.proximity-decay` and `scorer.tag-weights` from spec.md §6.
#[derive(Debug, Clone)]
pub struct ScorerConfig {
    pub decay: f64,
    pub tag_weights: HashMap<RiskTag, f64>,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            decay: 0.5,
            tag_weights: HashMap::new(),
        }
    }
}

impl ScorerConfig {
    pub fn weight(&self, tag: RiskTag) -> f64 {
        self.tag_weights
            .get(&tag)
            .copied()
            .unwrap_or_else(|| tag.default_weight())
    }
}

/// C1 `EntityContribution`. A display quantity attached to each
/// `FlaggedEntity` as it is discovered; not summed into the final score.
pub fn entity_contribution(
    tags: &std::collections::BTreeSet<RiskTag>,
    distance: u32,
    config: &ScorerConfig,
) -> f64 {
    let max_weight = tags
        .iter()
        .map(|t| config.weight(*t))
        .fold(f64::NEG_INFINITY, f64::max);
    if !max_weight.is_finite() {
        return 0.0;
    }
    max_weight * config.decay.powi(distance as i32) * 100.0
}

/// C2..C9 aggregated into the final `RiskScore`.
pub fn score(data: &TraceData, config: &ScorerConfig) -> RiskScore {
    let mut reasons = Vec::new();

    let base_total = base_entity_score(data, config, &mut reasons);
    let exchange_bonus = exchange_proximity_bonus(data, config, &mut reasons);
    let volume = volume_adjustment(data, &mut reasons);
    let temporal = temporal_decay(data, &mut reasons);
    let velocity = velocity_anomaly(data, &mut reasons);
    let clustering = clustering_coefficient(data);
    let mixer = mixer_pattern(data, clustering, &mut reasons);
    let circular = circular_path_penalty(data, &mut reasons);

    let raw = base_total + exchange_bonus + volume + temporal + velocity + mixer + circular;
    let score = (raw.round().clamp(0.0, 100.0)) as u32;

    if reasons.is_empty() {
        reasons.push(if score == 0 {
            "No suspicious entities detected".to_string()
        } else {
            "based on traced patterns".to_string()
        });
    }

    RiskScore {
        score,
        level: RiskLevel::from_score(score),
        reasons,
    }
}

/// C2 `BaseEntityScore`, summed over entities deduplicated by lowercased
/// address (first occurrence wins — in practice guaranteed unique already,
/// since the Tracer marks an address visited before it is ever processed).
fn base_entity_score(
    data: &crate::tracer::TraceData,
    config: &ScorerConfig,
    reasons: &mut Vec<String>,
) -> f64 {
    // Entities are pushed by concurrently spawned tasks, so their arrival
    // order in `data.flagged` is nondeterministic; sort before generating
    // reason strings so two runs over identical data produce byte-identical
    // reports (spec.md §8 Testable Property 5).
    let mut ordered: Vec<_> = data.flagged.iter().collect();
    ordered.sort_by(|a, b| {
        a.distance
            .cmp(&b.distance)
            .then_with(|| a.address.to_lowercase().cmp(&b.address.to_lowercase()))
    });

    let mut seen = HashSet::new();
    let mut total = 0.0;
    for entity in ordered {
        if !seen.insert(entity.address.to_lowercase()) {
            continue;
        }
        let weight_sum: f64 = entity.tags.iter().map(|t| config.weight(*t)).sum();
        let contribution = weight_sum * config.decay.powi(entity.distance as i32) * 50.0;
        total += contribution;
        reasons.push(format!(
            "{} tagged {} at distance {} ({contribution:+.1})",
            short_address(&entity.address),
            tag_list(&entity.tags),
            entity.distance,
        ));
    }
    total
}

/// C3 `ExchangeProximityBonus`.
fn exchange_proximity_bonus(
    data: &crate::tracer::TraceData,
    config: &ScorerConfig,
    reasons: &mut Vec<String>,
) -> f64 {
    let nearest = data
        .flagged
        .iter()
        .filter(|e| e.tags.contains(&RiskTag::Exchange))
        .map(|e| e.distance)
        .min();
    match nearest {
        Some(d) => {
            let bonus = config.weight(RiskTag::Exchange) * config.decay.powi(d as i32) * 100.0;
            if bonus != 0.0 {
                reasons.push(format!("exchange proximity at distance {d} ({bonus:+.1})"));
            }
            bonus
        }
        None => 0.0,
    }
}

/// C4 `VolumeAdjustment`: fraction of addresses with `tx_count < 10 AND
/// balance > 0` — suspicious low-activity wallets holding value.
fn volume_adjustment(data: &crate::tracer::TraceData, reasons: &mut Vec<String>) -> f64 {
    if data.addr_meta.is_empty() {
        return 0.0;
    }
    let suspicious = data
        .addr_meta
        .values()
        .filter(|m| m.tx_count < 10 && m.balance > 0.0)
        .count();
    let r = suspicious as f64 / data.addr_meta.len() as f64;
    let adjustment = r * 0.5 * 20.0;
    if adjustment != 0.0 {
        reasons.push(format!(
            "{suspicious}/{} low-activity high-balance wallets ({adjustment:+.1})",
            data.addr_meta.len()
        ));
    }
    adjustment
}

/// C5 `TemporalDecay`. Preserved verbatim per spec.md §9: fresher activity
/// contributes a more negative term here, which *increases* the final risk
/// score despite the name.
fn temporal_decay(data: &crate::tracer::TraceData, reasons: &mut Vec<String>) -> f64 {
    let newest = match data.tx_timestamps.values().max() {
        Some(t) => *t,
        None => return 0.0,
    };
    let age_days = ((Utc::now() - newest).num_seconds() as f64 / 86_400.0).max(0.0);
    let adjustment = (1.0 - (-age_days / 365.0).exp()) * -10.0;
    if adjustment != 0.0 {
        reasons.push(format!(
            "temporal decay, newest activity {age_days:.1}d old ({adjustment:+.1})"
        ));
    }
    adjustment
}

/// C6 `VelocityAnomaly`: mean gap between successive transaction timestamps.
fn velocity_anomaly(data: &crate::tracer::TraceData, reasons: &mut Vec<String>) -> f64 {
    let mut timestamps: Vec<_> = data.tx_timestamps.values().copied().collect();
    if timestamps.len() < 2 {
        return 0.0;
    }
    timestamps.sort();
    let gaps: Vec<f64> = timestamps
        .windows(2)
        .map(|w| (w[1] - w[0]).num_seconds() as f64)
        .collect();
    let avg_gap = gaps.iter().sum::<f64>() / gaps.len() as f64;
    if avg_gap < 3600.0 {
        let adjustment = (3600.0 / (avg_gap + 1.0) * 5.0).min(30.0);
        reasons.push(format!(
            "velocity anomaly, average gap {avg_gap:.0}s ({adjustment:+.1})"
        ));
        adjustment
    } else {
        0.0
    }
}

/// C8 `ClusteringCoefficient` over the adjacency graph.
fn clustering_coefficient(data: &crate::tracer::TraceData) -> f64 {
    let mut t = 0u64;
    let mut p = 0u64;
    for neighbors in data.adjacency.values() {
        let list: Vec<&String> = neighbors.iter().collect();
        let k = list.len();
        if k < 2 {
            continue;
        }
        p += (k * (k - 1) / 2) as u64;
        for (i, n1) in list.iter().enumerate() {
            for (j, n2) in list.iter().enumerate() {
                if i == j {
                    continue;
                }
                if data
                    .adjacency
                    .get(n1.as_str())
                    .is_some_and(|s| s.contains(n2.as_str()))
                {
                    t += 1;
                }
            }
        }
    }
    if p == 0 {
        0.0
    } else {
        t as f64 / p as f64
    }
}

/// C7 `MixerPattern`. Three mutually exclusive cases, first match wins. Case
/// (ii) is preserved verbatim from the source despite being very permissive
/// (spec.md §9 Open Questions).
fn mixer_pattern(
    data: &crate::tracer::TraceData,
    clustering: f64,
    reasons: &mut Vec<String>,
) -> f64 {
    if data
        .flagged
        .iter()
        .any(|e| e.tags.contains(&RiskTag::Mixer))
    {
        reasons.push("explicit mixer tag present (+40.0)".to_string());
        return 40.0;
    }
    let contract_count = data.addr_meta.values().filter(|m| m.is_contract).count();
    if contract_count >= 1 && clustering > 0.5 {
        reasons.push(format!(
            "tornado-style mixing pattern, clustering {clustering:.2} (+30.0)"
        ));
        return 30.0;
    }
    if clustering > 0.6 && data.addr_meta.len() >= 5 {
        reasons.push(format!(
            "generic mixer pattern, clustering {clustering:.2} (+25.0)"
        ));
        return 25.0;
    }
    0.0
}

/// C9 `CircularPathPenalty`.
fn circular_path_penalty(data: &crate::tracer::TraceData, reasons: &mut Vec<String>) -> f64 {
    if data.circular_paths.is_empty() {
        return 0.0;
    }
    let penalty = (10.0 * data.circular_paths.len() as f64).min(20.0);
    reasons.push(format!(
        "{} circular path(s) detected ({penalty:+.1})",
        data.circular_paths.len()
    ));
    penalty
}

fn short_address(address: &str) -> String {
    if address.len() <= 10 {
        address.to_string()
    } else {
        format!("{}…{}", &address[..6], &address[address.len() - 4..])
    }
}

fn tag_list(tags: &std::collections::BTreeSet<RiskTag>) -> String {
    tags.iter()
        .map(|t| format!("{t:?}").to_lowercase())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FlaggedEntity;

    fn flagged(address: &str, tags: &[RiskTag], distance: u32) -> FlaggedEntity {
        FlaggedEntity {
            address: address.into(),
            chain: "bitcoin".into(),
            tags: tags.iter().copied().collect(),
            distance,
            via_tx: "tx".into(),
            contribution: 0.0,
        }
    }

    #[test]
    fn empty_trace_scores_zero_with_catch_all_reason() {
        let data = TraceData::default();
        let result = score(&data, &ScorerConfig::default());
        assert_eq!(result.score, 0);
        assert_eq!(result.level, RiskLevel::Low);
        assert_eq!(
            result.reasons,
            vec!["No suspicious entities detected".to_string()]
        );
    }

    #[test]
    fn direct_mixer_hit_scores_ninety() {
        // S2: mixer at distance 0 -> BaseEntityScore 50, MixerPattern +40.
        let mut data = TraceData::default();
        data.flagged.push(flagged("m", &[RiskTag::Mixer], 0));
        let result = score(&data, &ScorerConfig::default());
        assert_eq!(result.score, 90);
        assert_eq!(result.level, RiskLevel::High);
    }

    #[test]
    fn exchange_cushion_clamps_to_zero() {
        // S3: exchange at distance 0 -> BaseEntityScore -10, bonus -20, clamp 0.
        let mut data = TraceData::default();
        data.flagged.push(flagged("e", &[RiskTag::Exchange], 0));
        let result = score(&data, &ScorerConfig::default());
        assert_eq!(result.score, 0);
        assert_eq!(result.level, RiskLevel::Low);
        assert!(result.reasons.iter().any(|r| r.contains("exchange")));
    }

    #[test]
    fn circular_path_alone_scores_ten() {
        let mut data = TraceData::default();
        data.circular_paths
            .push(vec!["a".into(), "b".into(), "c".into(), "a".into()]);
        let result = score(&data, &ScorerConfig::default());
        assert_eq!(result.score, 10);
    }

    #[test]
    fn distance_decay_is_monotonically_decreasing() {
        let mut near = TraceData::default();
        near.flagged.push(flagged("a", &[RiskTag::Scam], 0));
        let mut far = TraceData::default();
        far.flagged.push(flagged("a", &[RiskTag::Scam], 1));

        let near_score = score(&near, &ScorerConfig::default()).score;
        let far_score = score(&far, &ScorerConfig::default()).score;
        assert!(far_score < near_score);
    }

    #[test]
    fn velocity_anomaly_boundary_at_exactly_one_hour() {
        let mut data = TraceData::default();
        let base = Utc::now();
        data.tx_timestamps.insert("a".into(), base);
        data.tx_timestamps
            .insert("b".into(), base + chrono::Duration::seconds(3600));
        let result = score(&data, &ScorerConfig::default());
        assert!(!result.reasons.iter().any(|r| r.contains("velocity")));
    }

    #[test]
    fn score_is_deterministic_for_identical_inputs() {
        let mut data = TraceData::default();
        data.flagged.push(flagged("a", &[RiskTag::Hack], 1));
        data.flagged.push(flagged("b", &[RiskTag::Scam], 2));
        let first = score(&data, &ScorerConfig::default());
        let second = score(&data, &ScorerConfig::default());
        assert_eq!(first.score, second.score);
        assert_eq!(first.reasons, second.reasons);
    }

    /// Entities arrive from concurrently spawned tasks in no fixed order; the
    /// reasons generated must not depend on `data.flagged`'s insertion order
    /// (spec.md §8 Testable Property 5).
    #[test]
    fn reason_order_does_not_depend_on_flagged_insertion_order() {
        let mut forward = TraceData::default();
        forward.flagged.push(flagged("zzz", &[RiskTag::Hack], 1));
        forward.flagged.push(flagged("aaa", &[RiskTag::Scam], 1));

        let mut reversed = TraceData::default();
        reversed.flagged.push(flagged("aaa", &[RiskTag::Scam], 1));
        reversed.flagged.push(flagged("zzz", &[RiskTag::Hack], 1));

        let a = score(&forward, &ScorerConfig::default());
        let b = score(&reversed, &ScorerConfig::default());
        assert_eq!(a.reasons, b.reasons);
    }
}
