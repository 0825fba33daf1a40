use std::cmp::Ordering;
use std::collections::HashMap;

use crate::cluster::Clustering;
use crate::models::{ClusterSummary, EnrichedRecord, RankedUser, Rankings, Statistics, TeamStat};
use crate::stats;

#[derive(Default)]
struct TeamTotals {
    members: usize,
    stepcount: f64,
    pushup: f64,
    squat: f64,
    balance: f64,
    engagement_index: f64,
}

/// Groups by exact team string, sorted by team name.
pub fn team_stats(records: &[EnrichedRecord]) -> Vec<TeamStat> {
    let mut map: HashMap<&str, TeamTotals> = HashMap::new();

    for enriched in records {
        let entry = map.entry(enriched.record.team.as_str()).or_default();
        entry.members += 1;
        entry.stepcount += enriched.record.stepcount;
        entry.pushup += enriched.record.pushup;
        entry.squat += enriched.record.squat;
        entry.balance += enriched.record.balance;
        entry.engagement_index += enriched.engagement_index;
    }

    let mut teams: Vec<TeamStat> = map
        .into_iter()
        .map(|(team, totals)| {
            let count = totals.members as f64;
            TeamStat {
                team: team.to_string(),
                members: totals.members,
                avg_stepcount: totals.stepcount / count,
                avg_pushup: totals.pushup / count,
                avg_squat: totals.squat / count,
                avg_balance: totals.balance / count,
                avg_engagement_index: totals.engagement_index / count,
            }
        })
        .collect();

    teams.sort_by(|a, b| a.team.cmp(&b.team));
    teams
}

pub fn cluster_summaries(records: &[EnrichedRecord], clustering: &Clustering) -> Vec<ClusterSummary> {
    (0..clustering.k())
        .map(|id| {
            let engagement: Vec<f64> = clustering
                .members(id)
                .map(|index| records[index].engagement_index)
                .collect();
            let consistency: Vec<f64> = clustering
                .members(id)
                .map(|index| records[index].activity_consistency)
                .collect();
            ClusterSummary {
                id,
                size: engagement.len(),
                centroid: clustering.centroids[id],
                avg_engagement_index: stats::mean(&engagement),
                avg_activity_consistency: stats::mean(&consistency),
            }
        })
        .collect()
}

fn column<F>(records: &[EnrichedRecord], select: F) -> Vec<f64>
where
    F: Fn(&EnrichedRecord) -> f64,
{
    records.iter().map(select).collect()
}

pub fn statistics(records: &[EnrichedRecord]) -> Statistics {
    Statistics {
        stepcount: stats::describe(&column(records, |r| r.record.stepcount)),
        pushup: stats::describe(&column(records, |r| r.record.pushup)),
        squat: stats::describe(&column(records, |r| r.record.squat)),
        balance: stats::describe(&column(records, |r| r.record.balance)),
        engagement_index: stats::describe(&column(records, |r| r.engagement_index)),
        activity_consistency: stats::describe(&column(records, |r| r.activity_consistency)),
    }
}

pub fn correlation_balance_stepcount(records: &[EnrichedRecord]) -> f64 {
    stats::pearson(
        &column(records, |r| r.record.balance),
        &column(records, |r| r.record.stepcount),
    )
}

/// Descending by `value`; the sort is stable so equal values keep load order.
pub fn top_by<F>(records: &[EnrichedRecord], limit: usize, value: F) -> Vec<RankedUser>
where
    F: Fn(&EnrichedRecord) -> f64,
{
    let mut ranked: Vec<RankedUser> = records
        .iter()
        .map(|r| RankedUser {
            username: r.record.username.clone(),
            team: r.record.team.clone(),
            value: value(r),
        })
        .collect();
    ranked.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal));
    ranked.truncate(limit);
    ranked
}

pub fn rankings(records: &[EnrichedRecord], limit: usize) -> Rankings {
    let outliers: Vec<EnrichedRecord> = records.iter().filter(|r| r.is_outlier).cloned().collect();
    Rankings {
        top_engagement: top_by(records, limit, |r| r.engagement_index),
        top_consistency: top_by(records, limit, |r| r.activity_consistency),
        outliers: top_by(&outliers, limit, |r| r.z_scores.max_abs()),
    }
}
