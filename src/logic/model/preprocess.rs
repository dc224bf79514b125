//! Frozen preprocessing transform.
//!
//! The trainer fits imputation and scaling statistics once, offline; at
//! serving time this module only replays them. Numeric fields are
//! median-imputed and standardized, categorical fields are mode-imputed and
//! one-hot encoded with unknown categories mapping to an all-zero block.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::logic::schema::LoanApplication;

/// Fitted statistics for one numeric field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericStats {
    pub name: String,
    /// Imputation value for missing (NaN) inputs.
    pub median: f64,
    /// Centering term, computed on the imputed training column.
    pub mean: f64,
    /// Scaling term, population standard deviation of the imputed column.
    pub std: f64,
}

impl NumericStats {
    fn transform(&self, raw: f64) -> f64 {
        let value = if raw.is_nan() { self.median } else { raw };
        // Constant training columns keep their centered value unscaled.
        let scale = if self.std > 0.0 { self.std } else { 1.0 };
        (value - self.mean) / scale
    }
}

/// Fitted vocabulary for one categorical field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryMap {
    pub name: String,
    /// Imputation value for missing (empty) inputs.
    pub mode: String,
    /// Known categories, sorted lexicographically. One output column each.
    pub categories: Vec<String>,
}

impl CategoryMap {
    /// Writes the one-hot block for `raw` into `out`. Unknown categories
    /// leave the whole block at zero rather than failing the request.
    fn encode(&self, raw: &str, out: &mut Vec<f64>) {
        let trimmed = raw.trim();
        let value = if trimmed.is_empty() { self.mode.as_str() } else { trimmed };
        for category in &self.categories {
            out.push(if category == value { 1.0 } else { 0.0 });
        }
    }
}

/// The full fitted preprocessor: numeric block first, then one one-hot
/// block per categorical field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preprocessor {
    pub numeric: Vec<NumericStats>,
    pub categorical: Vec<CategoryMap>,
}

impl Preprocessor {
    /// Number of columns a transformed row will have.
    pub fn output_width(&self) -> usize {
        self.numeric.len() + self.categorical.iter().map(|c| c.categories.len()).sum::<usize>()
    }

    /// Transformed column names, aligned one-to-one with [`transform`] output.
    /// One-hot columns are named `{field}_{category}`.
    ///
    /// [`transform`]: Preprocessor::transform
    pub fn column_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.output_width());
        for stats in &self.numeric {
            names.push(stats.name.clone());
        }
        for map in &self.categorical {
            for category in &map.categories {
                names.push(format!("{}_{}", map.name, category));
            }
        }
        names
    }

    /// Applies the frozen transform to one application.
    pub fn transform(&self, application: &LoanApplication) -> Array1<f64> {
        let numeric_values = application.numeric_values();
        let categorical_values = application.categorical_values();
        let mut row = Vec::with_capacity(self.output_width());
        for (stats, &raw) in self.numeric.iter().zip(numeric_values.iter()) {
            row.push(stats.transform(raw));
        }
        for (map, raw) in self.categorical.iter().zip(categorical_values.iter()) {
            map.encode(raw, &mut row);
        }
        Array1::from_vec(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fitted() -> Preprocessor {
        let numeric = crate::logic::schema::NUMERIC_FIELDS
            .iter()
            .map(|&name| {
                let (median, mean, std) = match name {
                    "cibil_score" => (600.0, 600.0, 150.0),
                    "income_annum" => (5_000_000.0, 5_000_000.0, 2_000_000.0),
                    _ => (0.0, 0.0, 1.0),
                };
                NumericStats { name: name.to_string(), median, mean, std }
            })
            .collect();
        let categorical = vec![
            CategoryMap {
                name: "education".to_string(),
                mode: "Graduate".to_string(),
                categories: vec!["Graduate".to_string(), "Not Graduate".to_string()],
            },
            CategoryMap {
                name: "self_employed".to_string(),
                mode: "No".to_string(),
                categories: vec!["No".to_string(), "Yes".to_string()],
            },
        ];
        Preprocessor { numeric, categorical }
    }

    fn application() -> LoanApplication {
        LoanApplication {
            cibil_score: 750.0,
            income_annum: 7_000_000.0,
            ..LoanApplication::neutral()
        }
    }

    #[test]
    fn test_output_width_and_names_align() {
        let pre = fitted();
        assert_eq!(pre.output_width(), 13);
        let names = pre.column_names();
        assert_eq!(names.len(), 13);
        assert_eq!(names[0], "no_of_dependents");
        assert_eq!(names[9], "education_Graduate");
        assert_eq!(names[10], "education_Not Graduate");
        assert_eq!(names[11], "self_employed_No");
        assert_eq!(names[12], "self_employed_Yes");
    }

    #[test]
    fn test_numeric_standardization() {
        let pre = fitted();
        let row = pre.transform(&application());
        // cibil_score sits at index 4 of the numeric block.
        assert!((row[4] - 1.0).abs() < 1e-12);
        assert!((row[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_nan_is_median_imputed() {
        let pre = fitted();
        let mut app = application();
        app.cibil_score = f64::NAN;
        let row = pre.transform(&app);
        // Median equals the mean in the fixture, so the column centers to 0.
        assert_eq!(row[4], 0.0);
    }

    #[test]
    fn test_one_hot_known_category() {
        let pre = fitted();
        let mut app = application();
        app.education = "Not Graduate".to_string();
        let row = pre.transform(&app);
        assert_eq!(row[9], 0.0);
        assert_eq!(row[10], 1.0);
        assert_eq!(row[11], 1.0);
        assert_eq!(row[12], 0.0);
    }

    #[test]
    fn test_one_hot_unknown_category_is_all_zero() {
        let pre = fitted();
        let mut app = application();
        app.education = "Doctorate".to_string();
        let row = pre.transform(&app);
        assert_eq!(row[9], 0.0);
        assert_eq!(row[10], 0.0);
    }

    #[test]
    fn test_empty_categorical_uses_mode() {
        let pre = fitted();
        let mut app = application();
        app.self_employed = "  ".to_string();
        let row = pre.transform(&app);
        assert_eq!(row[11], 1.0);
        assert_eq!(row[12], 0.0);
    }

    #[test]
    fn test_whitespace_around_category_is_ignored() {
        let pre = fitted();
        let mut app = application();
        app.education = " Graduate ".to_string();
        let row = pre.transform(&app);
        assert_eq!(row[9], 1.0);
    }

    #[test]
    fn test_zero_std_falls_back_to_unit_scale() {
        let stats = NumericStats { name: "x".into(), median: 3.0, mean: 3.0, std: 0.0 };
        assert_eq!(stats.transform(5.0), 2.0);
    }
}
