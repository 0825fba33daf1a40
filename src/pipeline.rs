use chrono::NaiveDate;
use uuid::Uuid;

use crate::aggregate;
use crate::cluster::{self, Clustering};
use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, Result};
use crate::features;
use crate::metrics;
use crate::models::{AnalyticsResult, EnrichedRecord, RawRecord, Record, Summary};
use crate::preprocess;

/// Runs every pass over one batch of source rows. `today` anchors the
/// challenge deadlines.
pub fn run(rows: &[RawRecord], config: &AnalyticsConfig, today: NaiveDate) -> Result<AnalyticsResult> {
    let records = preprocess::preprocess(rows, config.numeric_policy)?;
    analyze(records, config, today)
}

pub fn analyze(records: Vec<Record>, config: &AnalyticsConfig, today: NaiveDate) -> Result<AnalyticsResult> {
    if records.is_empty() {
        return Err(AnalyticsError::EmptyDataset);
    }

    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("analytics_run", %run_id, records = records.len());
    let _guard = span.enter();

    let features = features::build_features(&records);
    let clustering = cluster::kmeans(&features, &config.clustering)?;
    tracing::info!(
        k = clustering.k(),
        inertia = clustering.inertia,
        "clustering finished"
    );

    let enriched = enrich(records, &features, &clustering, config, today);
    let outlier_count = enriched.iter().filter(|r| r.is_outlier).count();
    tracing::info!(outliers = outlier_count, "metric passes finished");

    let teams = aggregate::team_stats(&enriched);
    let summary = Summary {
        total_records: enriched.len(),
        team_count: teams.len(),
        outlier_count,
        correlation_balance_stepcount: aggregate::correlation_balance_stepcount(&enriched),
        cluster_count: clustering.sizes().iter().filter(|&&size| size > 0).count(),
        inertia: clustering.inertia,
        clusters: aggregate::cluster_summaries(&enriched, &clustering),
    };
    let rankings = aggregate::rankings(&enriched, config.top_n);
    let statistics = aggregate::statistics(&enriched);

    Ok(AnalyticsResult {
        run_id,
        generated_on: today,
        summary,
        records: enriched,
        teams,
        rankings,
        statistics,
    })
}

fn enrich(
    records: Vec<Record>,
    features: &[features::FeatureVector],
    clustering: &Clustering,
    config: &AnalyticsConfig,
    today: NaiveDate,
) -> Vec<EnrichedRecord> {
    let z_scores = metrics::z_scores(&records);
    let neighbors = metrics::nearest_neighbors(features);
    let usernames: Vec<String> = records.iter().map(|r| r.username.clone()).collect();

    records
        .into_iter()
        .zip(clustering.assignments.iter().copied())
        .zip(z_scores)
        .zip(neighbors)
        .map(|(((record, cluster), z_scores), neighbor)| {
            let centroid = &clustering.centroids[cluster];
            EnrichedRecord {
                cluster,
                engagement_index: metrics::engagement_index(&record),
                activity_consistency: metrics::activity_consistency(&record),
                is_outlier: metrics::is_outlier(&z_scores),
                z_scores,
                recommended_pushup: metrics::recommended_pushup(centroid),
                similar_user: neighbor.map(|n| usernames[n.index].clone()),
                similar_user_distance: neighbor.map(|n| n.distance),
                challenge: config
                    .assign_challenges
                    .then(|| metrics::assign_challenge(&record, centroid, today)),
                record,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClusterConfig, InitStrategy, NumericPolicy};
    use crate::loader;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    fn seeded() -> AnalyticsConfig {
        AnalyticsConfig {
            clustering: ClusterConfig {
                seed: Some(42),
                ..ClusterConfig::default()
            },
            ..AnalyticsConfig::default()
        }
    }

    fn record(name: &str, team: &str, stepcount: f64, pushup: f64, squat: f64, balance: f64) -> Record {
        Record {
            username: name.to_string(),
            team: team.to_string(),
            email: format!("{name}@example.com"),
            transactions: String::new(),
            password: "hunter2".to_string(),
            stepcount,
            pushup,
            squat,
            balance,
        }
    }

    fn mixed_population() -> Vec<Record> {
        vec![
            record("ana", "red", 9000.0, 30.0, 40.0, 120.0),
            record("bo", "red", 8800.0, 25.0, 38.0, 90.0),
            record("cy", "blue", 1200.0, 5.0, 8.0, 15.0),
            record("di", "blue", 1500.0, 6.0, 10.0, 20.0),
            record("ed", "green", 15000.0, 60.0, 70.0, 400.0),
            record("fa", "green", 14000.0, 55.0, 75.0, 380.0),
            record("gu", "None", 5000.0, 20.0, 20.0, 60.0),
            record("ha", "red", 5200.0, 22.0, 25.0, 70.0),
        ]
    }

    #[test]
    fn every_record_has_a_valid_cluster() {
        let result = analyze(mixed_population(), &seeded(), today()).unwrap();
        assert_eq!(result.records.len(), 8);
        assert!(result.records.iter().all(|r| r.cluster < 4));
        let total: usize = result.summary.clusters.iter().map(|c| c.size).sum();
        assert_eq!(total, result.summary.total_records);
    }

    #[test]
    fn pushup_target_follows_cluster_centroid() {
        let result = analyze(mixed_population(), &seeded(), today()).unwrap();
        for enriched in &result.records {
            let centroid = &result.summary.clusters[enriched.cluster].centroid;
            assert_eq!(enriched.recommended_pushup, (centroid.0[1] * 1.1).round() as i64);
        }
    }

    #[test]
    fn team_rollup_partitions_records() {
        let result = analyze(mixed_population(), &seeded(), today()).unwrap();
        let members: usize = result.teams.iter().map(|t| t.members).sum();
        assert_eq!(members, result.records.len());
        for enriched in &result.records {
            let matches = result.teams.iter().filter(|t| t.team == enriched.record.team).count();
            assert_eq!(matches, 1);
        }
        let names: Vec<&str> = result.teams.iter().map(|t| t.team.as_str()).collect();
        assert_eq!(names, vec!["None", "blue", "green", "red"]);
        let red = result.teams.iter().find(|t| t.team == "red").unwrap();
        assert_eq!(red.members, 3);
        assert!((red.avg_stepcount - 23000.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn identical_records_in_one_team() {
        let records: Vec<Record> = (0..5)
            .map(|i| record(&format!("u{i}"), "solo", 4000.0, 12.0, 18.0, 55.0))
            .collect();
        let result = analyze(records, &seeded(), today()).unwrap();

        assert_eq!(result.teams.len(), 1);
        let team = &result.teams[0];
        assert_eq!(team.members, 5);
        assert!((team.avg_stepcount - 4000.0).abs() < 1e-9);
        assert!((team.avg_pushup - 12.0).abs() < 1e-9);
        assert!((team.avg_squat - 18.0).abs() < 1e-9);
        assert!((team.avg_balance - 55.0).abs() < 1e-9);
        assert_eq!(result.summary.correlation_balance_stepcount, 0.0);
        assert_eq!(result.summary.outlier_count, 0);
        assert_eq!(result.summary.cluster_count, 1);
        // all neighbours are at distance 0; the earliest other record wins
        assert_eq!(result.records[0].similar_user.as_deref(), Some("u1"));
        assert_eq!(result.records[3].similar_user.as_deref(), Some("u0"));
    }

    #[test]
    fn two_distinct_points_do_not_break_clustering() {
        let records = vec![
            record("a", "x", 10.0, 1.0, 1.0, 1.0),
            record("b", "x", 10.0, 1.0, 1.0, 1.0),
            record("c", "x", 900.0, 9.0, 9.0, 9.0),
        ];
        let result = analyze(records, &seeded(), today()).unwrap();
        assert_eq!(result.records.len(), 3);
        assert_eq!(result.summary.clusters.len(), 4);
        assert!(result.summary.cluster_count <= 2);
        assert!(result.records.iter().all(|r| r.cluster < 4));
    }

    #[test]
    fn outlier_flag_matches_z_scores() {
        let mut records: Vec<Record> = (0..24)
            .map(|i| record(&format!("u{i}"), "t", 1000.0 + i as f64, 10.0, 10.0, 50.0))
            .collect();
        records.push(record("whale", "t", 250000.0, 10.0, 10.0, 50.0));
        let result = analyze(records, &seeded(), today()).unwrap();

        for enriched in &result.records {
            assert_eq!(enriched.is_outlier, enriched.z_scores.max_abs() > 3.0);
        }
        assert_eq!(result.summary.outlier_count, 1);
        assert_eq!(result.rankings.outliers.len(), 1);
        assert_eq!(result.rankings.outliers[0].username, "whale");
    }

    #[test]
    fn consistency_bounds_hold() {
        let result = analyze(mixed_population(), &seeded(), today()).unwrap();
        for enriched in &result.records {
            assert!(enriched.activity_consistency > 0.0);
            assert!(enriched.activity_consistency <= 1.0);
        }
        let corr = result.summary.correlation_balance_stepcount;
        assert!((-1.0..=1.0).contains(&corr));
        assert!(corr > 0.9);
    }

    #[test]
    fn neighbour_is_never_self() {
        let result = analyze(mixed_population(), &seeded(), today()).unwrap();
        for enriched in &result.records {
            assert_ne!(enriched.similar_user.as_deref(), Some(enriched.record.username.as_str()));
        }
        assert_eq!(result.records[0].similar_user.as_deref(), Some("bo"));
    }

    #[test]
    fn challenges_can_be_disabled() {
        let config = AnalyticsConfig {
            assign_challenges: false,
            ..seeded()
        };
        let result = analyze(mixed_population(), &config, today()).unwrap();
        assert!(result.records.iter().all(|r| r.challenge.is_none()));

        let result = analyze(mixed_population(), &seeded(), today()).unwrap();
        for enriched in &result.records {
            let challenge = enriched.challenge.unwrap();
            let days = (challenge.deadline - today()).num_days();
            assert!([30, 37, 44].contains(&days));
        }
    }

    #[test]
    fn rankings_are_sorted_and_limited() {
        let config = AnalyticsConfig { top_n: 3, ..seeded() };
        let result = analyze(mixed_population(), &config, today()).unwrap();
        let top = &result.rankings.top_engagement;
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].username, "ed");
        assert!(top.windows(2).all(|pair| pair[0].value >= pair[1].value));
        assert_eq!(result.rankings.top_consistency.len(), 3);
    }

    #[test]
    fn statistics_cover_population() {
        let result = analyze(mixed_population(), &seeded(), today()).unwrap();
        assert_eq!(result.statistics.stepcount.min, 1200.0);
        assert_eq!(result.statistics.stepcount.max, 15000.0);
        assert_eq!(result.statistics.squat.median, 31.5);
    }

    #[test]
    fn empty_dataset_is_rejected() {
        let err = analyze(Vec::new(), &seeded(), today()).unwrap_err();
        assert!(matches!(err, AnalyticsError::EmptyDataset));
    }

    #[test]
    fn json_payload_hides_passwords() {
        let result = analyze(mixed_population(), &seeded(), today()).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        let first = &json["records"][0];
        assert!(first.get("password").is_none());
        assert_eq!(first["username"], "ana");
        assert!(first.get("challenge_type").is_some());
        assert!(first.get("stepcount_z").is_some());
        assert_eq!(json["generated_on"], "2026-03-01");
    }

    #[test]
    fn runs_from_raw_csv_rows() {
        let data = "username,team,email,transactions,password,balance,stepcount,pushup,squat\n\
                    ana,red,ana@example.com,2,pw,120,9000,30,40\n\
                    bo,,bo@example.com,1,pw,90,8800,25,38\n\
                    cy,blue,,,,15,1200,5,8\n";
        let rows = loader::load_from_reader(data.as_bytes()).unwrap();
        let config = AnalyticsConfig {
            clustering: ClusterConfig {
                k: 2,
                init: InitStrategy::Random,
                seed: Some(1),
                ..ClusterConfig::default()
            },
            numeric_policy: NumericPolicy::Strict,
            ..AnalyticsConfig::default()
        };
        let result = run(&rows, &config, today()).unwrap();
        assert_eq!(result.records.len(), 3);
        assert_eq!(result.records[1].record.team, "None");
        assert_eq!(result.records[2].record.email, "");
    }
}
