use std::fmt::Write;

use crate::models::{AnalyticsResult, MetricStats, RankedUser};

pub fn build_summary(result: &AnalyticsResult) -> String {
    let summary = &result.summary;
    let mut output = String::new();

    let _ = writeln!(output, "# Fitness Cohort Analytics");
    let _ = writeln!(
        output,
        "Generated {} (run {})",
        result.generated_on, result.run_id
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "- Records: {}", summary.total_records);
    let _ = writeln!(output, "- Teams: {}", summary.team_count);
    let _ = writeln!(output, "- Outliers: {}", summary.outlier_count);
    let _ = writeln!(
        output,
        "- Balance/stepcount correlation: {:.3}",
        summary.correlation_balance_stepcount
    );
    let _ = writeln!(
        output,
        "- Clustering: {} non-empty clusters, inertia {:.2}",
        summary.cluster_count, summary.inertia
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Clusters");
    for cluster in &summary.clusters {
        let [steps, pushup, squat, balance] = cluster.centroid.0;
        let _ = writeln!(
            output,
            "- Cluster {}: {} members, centroid steps {:.1} / pushup {:.1} / squat {:.1} / balance {:.2}, avg engagement {:.2}",
            cluster.id, cluster.size, steps, pushup, squat, balance, cluster.avg_engagement_index
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Teams");
    for team in &result.teams {
        let _ = writeln!(
            output,
            "- {}: {} members, avg steps {:.1}, pushup {:.1}, squat {:.1}, balance {:.2}, engagement {:.2}",
            team.team,
            team.members,
            team.avg_stepcount,
            team.avg_pushup,
            team.avg_squat,
            team.avg_balance,
            team.avg_engagement_index
        );
    }

    write_ranking(&mut output, "Top Engagement", &result.rankings.top_engagement, 2);
    write_ranking(&mut output, "Most Balanced Activity", &result.rankings.top_consistency, 3);
    write_ranking(&mut output, "Outliers (max |z|)", &result.rankings.outliers, 2);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Statistics");
    let stats = &result.statistics;
    for (name, metric) in [
        ("stepcount", &stats.stepcount),
        ("pushup", &stats.pushup),
        ("squat", &stats.squat),
        ("balance", &stats.balance),
        ("engagement_index", &stats.engagement_index),
        ("activity_consistency", &stats.activity_consistency),
    ] {
        let _ = writeln!(output, "- {}: {}", name, format_stats(metric));
    }

    output
}

fn write_ranking(output: &mut String, title: &str, entries: &[RankedUser], precision: usize) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## {title}");
    if entries.is_empty() {
        let _ = writeln!(output, "None.");
        return;
    }
    for (position, entry) in entries.iter().enumerate() {
        let _ = writeln!(
            output,
            "{}. {} ({}) {:.*}",
            position + 1,
            entry.username,
            entry.team,
            precision,
            entry.value
        );
    }
}

fn format_stats(stats: &MetricStats) -> String {
    format!(
        "avg {:.2}, min {:.2}, max {:.2}, median {:.2}, stddev {:.2}",
        stats.avg, stats.min, stats.max, stats.median, stats.stddev
    )
}

const CSV_HEADER: [&str; 22] = [
    "username",
    "team",
    "email",
    "transactions",
    "balance",
    "stepcount",
    "pushup",
    "squat",
    "cluster",
    "engagement_index",
    "activity_consistency",
    "stepcount_z",
    "pushup_z",
    "squat_z",
    "balance_z",
    "is_outlier",
    "recommended_pushup",
    "similar_user",
    "similar_user_distance",
    "challenge_type",
    "challenge_ratio",
    "deadline",
];

/// Full dump of enriched records, one row per record in load order.
pub fn write_records_csv<W: std::io::Write>(result: &AnalyticsResult, writer: W) -> csv::Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(CSV_HEADER)?;

    for enriched in &result.records {
        let record = &enriched.record;
        let z = &enriched.z_scores;
        let (challenge_type, challenge_ratio, deadline) = match &enriched.challenge {
            Some(challenge) => (
                challenge.challenge_type.label().to_string(),
                challenge.worst_ratio.to_string(),
                challenge.deadline.to_string(),
            ),
            None => (String::new(), String::new(), String::new()),
        };
        writer.write_record([
            record.username.clone(),
            record.team.clone(),
            record.email.clone(),
            record.transactions.clone(),
            record.balance.to_string(),
            record.stepcount.to_string(),
            record.pushup.to_string(),
            record.squat.to_string(),
            enriched.cluster.to_string(),
            enriched.engagement_index.to_string(),
            enriched.activity_consistency.to_string(),
            z.stepcount_z.to_string(),
            z.pushup_z.to_string(),
            z.squat_z.to_string(),
            z.balance_z.to_string(),
            enriched.is_outlier.to_string(),
            enriched.recommended_pushup.to_string(),
            enriched.similar_user.clone().unwrap_or_default(),
            enriched
                .similar_user_distance
                .map(|distance| distance.to_string())
                .unwrap_or_default(),
            challenge_type,
            challenge_ratio,
            deadline,
        ])?;
    }

    writer.flush()?;
    Ok(())
}
