//! Terminal bar charts over a finalized table.
//!
//! Read-only: charts are derived from the same rows the export writes and
//! never mutate them. Rendering targets plain terminals, so omitting charts
//! in headless runs loses nothing but the picture.

use super::summary::GroupStats;

const BAR_WIDTH: usize = 20;
const SCORE_MAX: f64 = 10.0;

/// Renders one bar per group and criterion, scores scaled to a 1-10 bar.
pub fn render(title: &str, third_criterion: &str, stats: &[GroupStats]) -> String {
    let mut out = String::new();
    out.push_str(title);
    out.push('\n');
    out.push_str(&"=".repeat(title.len()));
    out.push('\n');

    if stats.is_empty() {
        out.push_str("(no rows)\n");
        return out;
    }

    for group in stats {
        out.push_str(&format!(
            "{} ({} rows{})\n",
            truncate(&group.key, 60),
            group.rows,
            if group.failed > 0 {
                format!(", {} failed", group.failed)
            } else {
                String::new()
            }
        ));
        out.push_str(&bar_line("clarity", group.mean_clarity));
        out.push_str(&bar_line("specificity", group.mean_specificity));
        out.push_str(&bar_line(&third_criterion.to_lowercase(), group.mean_third));
        out.push_str(&format!("  {:<12} {:.1}\n", "avg words", group.mean_word_count));
        out.push('\n');
    }
    out
}

fn bar_line(label: &str, value: Option<f64>) -> String {
    match value {
        Some(v) => {
            let filled = ((v / SCORE_MAX) * BAR_WIDTH as f64).round() as usize;
            let filled = filled.min(BAR_WIDTH);
            format!(
                "  {:<12} {}{} {:.1}\n",
                label,
                "█".repeat(filled),
                "░".repeat(BAR_WIDTH - filled),
                v
            )
        }
        None => format!("  {:<12} {} -\n", label, "░".repeat(BAR_WIDTH)),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{head}...")
    }
}
