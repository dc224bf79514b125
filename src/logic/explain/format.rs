//! Turns a contribution vector into ranked, display-ready drivers.

use std::cmp::Ordering;

use ndarray::ArrayView1;

use crate::logic::explain::types::{Driver, DriverEffect};

/// How many drivers a response carries.
pub const DEFAULT_TOP_K: usize = 5;

/// Display labels for transformed columns whose mechanical rendering reads
/// poorly. Anything not listed falls back to underscore-to-space title case.
fn display_label(column: &str) -> Option<&'static str> {
    match column {
        "education_Graduate" => Some("Education: Graduate"),
        "education_Not Graduate" => Some("Education: Not Graduate"),
        "self_employed_Yes" => Some("Self Employed: Yes"),
        "self_employed_No" => Some("Self Employed: No"),
        _ => None,
    }
}

fn title_case(words: &str) -> String {
    words
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Human-readable label for one transformed column.
pub fn render_label(column: &str) -> String {
    match display_label(column) {
        Some(label) => label.to_string(),
        None => title_case(&column.replace('_', " ")),
    }
}

/// Ranks contributions by magnitude and keeps the strongest `top_k`.
///
/// Scores keep their full precision and sign; only the effect label folds
/// the sign into words. A zero contribution reads as supporting approval.
/// Ties in magnitude keep the transformed column order, so repeated calls
/// over the same vector produce an identical list.
pub fn format_drivers(scores: ArrayView1<f64>, columns: &[String], top_k: usize) -> Vec<Driver> {
    debug_assert_eq!(scores.len(), columns.len(), "contribution/layout width drift");
    let mut ranked: Vec<(usize, f64)> = scores.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| b.1.abs().partial_cmp(&a.1.abs()).unwrap_or(Ordering::Equal));
    ranked.truncate(top_k);
    ranked
        .into_iter()
        .map(|(index, score)| Driver {
            label: render_label(&columns[index]),
            score,
            effect: if score > 0.0 {
                DriverEffect::SupportRejection
            } else {
                DriverEffect::SupportApproval
            },
        })
        .collect()
}
