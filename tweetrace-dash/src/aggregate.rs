//! Daily aggregation of scored tweets

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use tweetrace_common::ScoredTweet;

/// Mean score and tweet count for one name on one day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub name: String,
    /// Rounded to two decimals
    pub mean_score: f64,
    pub count: i64,
}

/// Group rows by (calendar date, name). Ordered by date, then name.
pub fn daily_points(rows: &[ScoredTweet]) -> Vec<DailyPoint> {
    let mut groups: BTreeMap<(NaiveDate, &str), (i64, i64)> = BTreeMap::new();
    for row in rows {
        let entry = groups
            .entry((row.created_at.date(), row.name.as_str()))
            .or_insert((0, 0));
        entry.0 += row.score;
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|((date, name), (sum, count))| DailyPoint {
            date,
            name: name.to_string(),
            mean_score: round2(sum as f64 / count as f64),
            count,
        })
        .collect()
}

/// Round half away from zero to two decimals
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use tweetrace_common::{SentimentScore, StagedTweet};

    fn row(day: u32, hour: u32, name: &str, score: SentimentScore) -> ScoredTweet {
        let ts: NaiveDateTime = NaiveDate::from_ymd_opt(2021, 4, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap();
        StagedTweet::new(1, ts, name, "t").into_scored("t".to_string(), score)
    }

    #[test]
    fn test_mean_and_count_per_day_and_name() {
        use SentimentScore::*;
        let rows = vec![
            row(14, 9, "scholz", Positive),
            row(14, 23, "scholz", Neutral),
            row(14, 10, "scholz", Negative),
            row(14, 11, "habeck", Positive),
            row(15, 0, "scholz", Negative),
        ];

        let points = daily_points(&rows);
        let summary: Vec<(String, &str, f64, i64)> = points
            .iter()
            .map(|p| (p.date.to_string(), p.name.as_str(), p.mean_score, p.count))
            .collect();

        assert_eq!(
            summary,
            vec![
                ("2021-04-14".to_string(), "habeck", 1.0, 1),
                ("2021-04-14".to_string(), "scholz", 0.0, 3),
                ("2021-04-15".to_string(), "scholz", -1.0, 1),
            ]
        );
    }

    #[test]
    fn test_mean_rounded_to_two_decimals() {
        use SentimentScore::*;
        let rows = vec![
            row(14, 1, "laschet", Positive),
            row(14, 2, "laschet", Neutral),
            row(14, 3, "laschet", Neutral),
        ];
        assert_eq!(daily_points(&rows)[0].mean_score, 0.33);

        let rows = vec![
            row(14, 1, "laschet", Negative),
            row(14, 2, "laschet", Negative),
            row(14, 3, "laschet", Neutral),
        ];
        assert_eq!(daily_points(&rows)[0].mean_score, -0.67);
    }

    #[test]
    fn test_empty_input() {
        assert!(daily_points(&[]).is_empty());
    }
}
