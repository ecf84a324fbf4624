//! Descriptive statistics over a finalized result table.

use super::ResultRow;

/// Mean scores for one group of rows (a model or a prompt).
#[derive(Debug, Clone, PartialEq)]
pub struct GroupStats {
    pub key: String,
    pub rows: usize,
    /// Rows that degraded during generation.
    pub failed: usize,
    pub mean_clarity: Option<f64>,
    pub mean_specificity: Option<f64>,
    pub mean_third: Option<f64>,
    pub mean_word_count: f64,
}

/// Per-model means, groups in first-seen row order.
pub fn by_model(rows: &[ResultRow]) -> Vec<GroupStats> {
    group_by(rows, |r| r.model.clone())
}

/// Per-prompt means, groups in first-seen row order.
pub fn by_prompt(rows: &[ResultRow]) -> Vec<GroupStats> {
    group_by(rows, |r| r.prompt.clone())
}

fn group_by(rows: &[ResultRow], key: impl Fn(&ResultRow) -> String) -> Vec<GroupStats> {
    let mut order: Vec<String> = Vec::new();
    for row in rows {
        let k = key(row);
        if !order.contains(&k) {
            order.push(k);
        }
    }
    order
        .into_iter()
        .map(|k| {
            let members: Vec<&ResultRow> = rows.iter().filter(|r| key(r) == k).collect();
            GroupStats {
                rows: members.len(),
                failed: members.iter().filter(|r| r.error.is_some()).count(),
                mean_clarity: mean(&members, |r| r.score.clarity),
                mean_specificity: mean(&members, |r| r.score.specificity),
                mean_third: mean(&members, |r| r.score.third_criterion),
                mean_word_count: members.iter().map(|r| r.word_count as f64).sum::<f64>()
                    / members.len().max(1) as f64,
                key: k,
            }
        })
        .collect()
}

/// Mean over rows where the score is present; absent scores are excluded
/// from the denominator rather than counted as zero.
fn mean(rows: &[&ResultRow], f: impl Fn(&ResultRow) -> Option<u8>) -> Option<f64> {
    let values: Vec<f64> = rows.iter().filter_map(|r| f(r).map(f64::from)).collect();
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
