//! Factorial ANOVA with type II sums of squares
//!
//! The model is the full factorial OLS fit `y ~ A * B * ...` with
//! treatment-coded categorical factors (levels sorted, first level as
//! reference). Terms appear in the usual formula order: main effects, then
//! two-way interactions, and so on, each group in factor order.
//!
//! The type II sum of squares for a term is the drop in residual sum of
//! squares when the term is added to the model made of every term that does
//! not contain it. Nested fits use an SVD least-squares solve, so rank
//! deficient designs (empty cells) get the correct degrees of freedom.

use crate::levene::f_survival;
use decibench_core::{Error, Result};
use itertools::Itertools;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// A categorical factor: one level label per observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    pub name: String,
    pub values: Vec<String>,
}

impl Factor {
    pub fn new<S: AsRef<str>>(name: impl Into<String>, values: &[S]) -> Self {
        Self {
            name: name.into(),
            values: values.iter().map(|v| v.as_ref().to_string()).collect(),
        }
    }

    /// Distinct levels in sorted order
    pub fn levels(&self) -> Vec<&str> {
        self.values
            .iter()
            .map(String::as_str)
            .sorted()
            .dedup()
            .collect()
    }

    /// Treatment-coded indicator columns, one per non-reference level
    fn dummy_columns(&self) -> Vec<Vec<f64>> {
        self.levels()
            .into_iter()
            .skip(1)
            .map(|level| {
                self.values
                    .iter()
                    .map(|v| if v == level { 1.0 } else { 0.0 })
                    .collect()
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnovaRow {
    pub term: String,
    pub sum_sq: f64,
    pub df: f64,
    /// NaN on the residual row
    pub f_value: f64,
    /// NaN on the residual row
    pub p_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnovaTable {
    /// Model terms in formula order followed by the `Residual` row
    pub rows: Vec<AnovaRow>,
}

impl AnovaTable {
    pub fn row(&self, term: &str) -> Option<&AnovaRow> {
        self.rows.iter().find(|r| r.term == term)
    }

    pub fn residual(&self) -> Option<&AnovaRow> {
        self.row("Residual")
    }
}

impl fmt::Display for AnovaTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .rows
            .iter()
            .map(|r| r.term.len())
            .max()
            .unwrap_or(0)
            .max(4);
        writeln!(
            f,
            "{:<width$} {:>16} {:>8} {:>12} {:>12}",
            "", "sum_sq", "df", "F", "PR(>F)"
        )?;
        for r in &self.rows {
            writeln!(
                f,
                "{:<width$} {:>16.6e} {:>8.1} {:>12.4} {:>12.4e}",
                r.term, r.sum_sq, r.df, r.f_value, r.p_value
            )?;
        }
        Ok(())
    }
}

/// Full factorial ANOVA over a response and categorical factors.
#[derive(Debug, Clone, Default)]
pub struct FactorialAnova {
    response: Vec<f64>,
    factors: Vec<Factor>,
}

struct Term {
    name: String,
    factors: Vec<usize>,
    columns: Vec<Vec<f64>>,
}

struct Fit {
    rss: f64,
    rank: usize,
}

impl FactorialAnova {
    pub fn new(response: &[f64]) -> Self {
        Self {
            response: response.to_vec(),
            factors: Vec::new(),
        }
    }

    #[must_use]
    pub fn factor<S: AsRef<str>>(mut self, name: impl Into<String>, values: &[S]) -> Self {
        self.factors.push(Factor::new(name, values));
        self
    }

    fn terms(&self) -> Vec<Term> {
        let dummies: Vec<Vec<Vec<f64>>> = self.factors.iter().map(Factor::dummy_columns).collect();
        let n = self.response.len();

        (1..=self.factors.len())
            .flat_map(|size| (0..self.factors.len()).combinations(size))
            .map(|members| {
                let name = members.iter().map(|&i| self.factors[i].name.as_str()).join(":");
                let columns = members
                    .iter()
                    .map(|&i| dummies[i].iter())
                    .multi_cartesian_product()
                    .map(|cols| {
                        (0..n)
                            .map(|row| cols.iter().map(|c| c[row]).product::<f64>())
                            .collect()
                    })
                    .collect();
                Term {
                    name,
                    factors: members,
                    columns,
                }
            })
            .collect()
    }

    fn fit(&self, terms: &[&Term]) -> Result<Fit> {
        let n = self.response.len();
        let columns: Vec<&Vec<f64>> = terms.iter().flat_map(|t| t.columns.iter()).collect();
        let p = columns.len() + 1;
        let x = DMatrix::from_fn(n, p, |r, c| if c == 0 { 1.0 } else { columns[c - 1][r] });
        let y = DVector::from_column_slice(&self.response);

        let svd = x.clone().svd(true, true);
        let tol = svd.singular_values.max() * n.max(p) as f64 * f64::EPSILON;
        let rank = svd.rank(tol);
        let beta = svd
            .solve(&y, tol)
            .map_err(|e| Error::Statistics(format!("Least squares failed: {e}")))?;
        let rss = (y - x * beta).norm_squared();
        Ok(Fit { rss, rank })
    }

    /// Fit the model and compute the type II ANOVA table.
    pub fn fit_type2(&self) -> Result<AnovaTable> {
        let n = self.response.len();
        if self.factors.is_empty() {
            return Err(Error::Statistics("ANOVA needs at least one factor".into()));
        }
        if let Some(f) = self.factors.iter().find(|f| f.values.len() != n) {
            return Err(Error::Statistics(format!(
                "Factor {} has {} values for {} observations",
                f.name,
                f.values.len(),
                n
            )));
        }
        if self.response.iter().any(|v| !v.is_finite()) {
            return Err(Error::Statistics("ANOVA response must be finite".into()));
        }

        let terms = self.terms();
        let all: Vec<&Term> = terms.iter().collect();
        let full = self.fit(&all)?;
        if full.rank >= n {
            return Err(Error::Statistics(format!(
                "No residual degrees of freedom ({n} observations, rank {})",
                full.rank
            )));
        }
        let df_resid = (n - full.rank) as f64;
        let mse = full.rss / df_resid;

        let mut rows = Vec::with_capacity(terms.len() + 1);
        for term in &terms {
            let contains_term = |other: &Term| {
                !std::ptr::eq(other, term) && term.factors.iter().all(|f| other.factors.contains(f))
            };
            let reduced: Vec<&Term> = terms
                .iter()
                .filter(|t| !std::ptr::eq(*t, term) && !contains_term(*t))
                .collect();
            let mut augmented = reduced.clone();
            augmented.push(term);

            let without = self.fit(&reduced)?;
            let with = self.fit(&augmented)?;
            let df = with.rank.saturating_sub(without.rank) as f64;
            let sum_sq = (without.rss - with.rss).max(0.0);

            let (f_value, p_value) = if df > 0.0 {
                let f = (sum_sq / df) / mse;
                (f, f_survival(f, df, df_resid)?)
            } else {
                (f64::NAN, f64::NAN)
            };
            rows.push(AnovaRow {
                term: term.name.clone(),
                sum_sq,
                df,
                f_value,
                p_value,
            });
        }
        rows.push(AnovaRow {
            term: "Residual".to_string(),
            sum_sq: full.rss,
            df: df_resid,
            f_value: f64::NAN,
            p_value: f64::NAN,
        });

        debug!(observations = n, terms = terms.len(), df_resid, "Fitted factorial ANOVA");
        Ok(AnovaTable { rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Balanced 2x2 design, two replicates per cell, cell deviations of +-1
    fn two_by_two() -> FactorialAnova {
        let y = [5.5, 7.5, 9.5, 11.5, 6.5, 8.5, 14.5, 16.5];
        let a = ["a1", "a1", "a1", "a1", "a2", "a2", "a2", "a2"];
        let b = ["b1", "b1", "b2", "b2", "b1", "b1", "b2", "b2"];
        FactorialAnova::new(&y).factor("A", &a).factor("B", &b)
    }

    /// Unbalanced 2x2 layout with cell sizes 3, 1, 1, 3, so A and B are
    /// correlated and each factor's sum of squares depends on the other
    const UNBALANCED_Y: [f64; 8] = [1.0, 2.0, 3.0, 6.0, 4.0, 8.0, 9.0, 11.0];
    const UNBALANCED_A: [&str; 8] = ["a1", "a1", "a1", "a1", "a2", "a2", "a2", "a2"];
    const UNBALANCED_B: [&str; 8] = ["b1", "b1", "b1", "b2", "b1", "b2", "b2", "b2"];

    #[test]
    fn test_unbalanced_uses_type2_sums() {
        let table = FactorialAnova::new(&UNBALANCED_Y)
            .factor("A", &UNBALANCED_A)
            .factor("B", &UNBALANCED_B)
            .fit_type2()
            .unwrap();
        // SS(A | B) = RSS(B) - RSS(A + B) and SS(B | A) = RSS(A) - RSS(A + B),
        // solved exactly from the normal equations
        let a = table.row("A").unwrap();
        let b = table.row("B").unwrap();
        assert_relative_eq!(a.sum_sq, 32.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(b.sum_sq, 98.0 / 3.0, epsilon = 1e-9);
        // sequential sums would give 50 for A entered first and 72 for B
        assert!((a.sum_sq - 50.0).abs() > 1.0);
        assert!((b.sum_sq - 72.0).abs() > 1.0);
        assert_relative_eq!(table.row("A:B").unwrap().sum_sq, 2.0 / 3.0, epsilon = 1e-9);
        let residual = table.residual().unwrap();
        assert_relative_eq!(residual.sum_sq, 20.0 / 3.0, epsilon = 1e-9);
        assert_eq!(residual.df, 4.0);
    }

    #[test]
    fn test_factor_order_does_not_change_sums() {
        let ab = FactorialAnova::new(&UNBALANCED_Y)
            .factor("A", &UNBALANCED_A)
            .factor("B", &UNBALANCED_B)
            .fit_type2()
            .unwrap();
        let ba = FactorialAnova::new(&UNBALANCED_Y)
            .factor("B", &UNBALANCED_B)
            .factor("A", &UNBALANCED_A)
            .fit_type2()
            .unwrap();
        for term in ["A", "B"] {
            let (x, y) = (ab.row(term).unwrap(), ba.row(term).unwrap());
            assert_relative_eq!(x.sum_sq, y.sum_sq, epsilon = 1e-9);
            assert_relative_eq!(x.f_value, y.f_value, epsilon = 1e-9);
            assert_relative_eq!(x.p_value, y.p_value, epsilon = 1e-9);
        }
        assert_relative_eq!(
            ab.row("A:B").unwrap().sum_sq,
            ba.row("B:A").unwrap().sum_sq,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_balanced_two_way() {
        let table = two_by_two().fit_type2().unwrap();
        let terms: Vec<&str> = table.rows.iter().map(|r| r.term.as_str()).collect();
        assert_eq!(terms, ["A", "B", "A:B", "Residual"]);

        let a = table.row("A").unwrap();
        assert_relative_eq!(a.sum_sq, 18.0, epsilon = 1e-9);
        assert_relative_eq!(a.df, 1.0);
        assert_relative_eq!(a.f_value, 9.0, epsilon = 1e-9);

        let b = table.row("B").unwrap();
        assert_relative_eq!(b.sum_sq, 72.0, epsilon = 1e-9);
        assert_relative_eq!(b.f_value, 36.0, epsilon = 1e-9);

        let ab = table.row("A:B").unwrap();
        assert_relative_eq!(ab.sum_sq, 8.0, epsilon = 1e-9);
        assert_relative_eq!(ab.f_value, 4.0, epsilon = 1e-9);

        let resid = table.residual().unwrap();
        assert_relative_eq!(resid.sum_sq, 8.0, epsilon = 1e-9);
        assert_relative_eq!(resid.df, 4.0);
        assert!(resid.f_value.is_nan());

        // F(1, 4) = 36 is significant, F(1, 4) = 4 is not
        assert!(b.p_value < 0.01);
        assert!(ab.p_value > 0.05);
    }

    #[test]
    fn test_three_way_term_order_and_df() {
        let mut y = Vec::new();
        let (mut a, mut b, mut c) = (Vec::new(), Vec::new(), Vec::new());
        for (i, (x, yv, z)) in itertools::iproduct!(["p", "q"], ["r", "s", "t"], ["u", "v"])
            .cycle()
            .take(36)
            .enumerate()
        {
            a.push(x);
            b.push(yv);
            c.push(z);
            y.push((i * 7 % 11) as f64);
        }
        let table = FactorialAnova::new(&y)
            .factor("Algorithm", &a)
            .factor("Type", &b)
            .factor("Decimation", &c)
            .fit_type2()
            .unwrap();
        let terms: Vec<&str> = table.rows.iter().map(|r| r.term.as_str()).collect();
        assert_eq!(
            terms,
            [
                "Algorithm",
                "Type",
                "Decimation",
                "Algorithm:Type",
                "Algorithm:Decimation",
                "Type:Decimation",
                "Algorithm:Type:Decimation",
                "Residual"
            ]
        );
        let dfs: Vec<f64> = table.rows.iter().map(|r| r.df).collect();
        assert_eq!(dfs, [1.0, 2.0, 1.0, 2.0, 1.0, 2.0, 2.0, 24.0]);
    }

    #[test]
    fn test_empty_cell_reduces_interaction_df() {
        // No observations for (a2, b2)
        let y = [1.0, 2.0, 3.0, 4.0, 6.0, 7.0];
        let a = ["a1", "a1", "a1", "a1", "a2", "a2"];
        let b = ["b1", "b1", "b2", "b2", "b1", "b1"];
        let table = FactorialAnova::new(&y).factor("A", &a).factor("B", &b).fit_type2().unwrap();
        let ab = table.row("A:B").unwrap();
        assert_eq!(ab.df, 0.0);
        assert!(ab.f_value.is_nan());
        assert_eq!(table.residual().unwrap().df, 3.0);
    }

    #[test]
    fn test_rejects_mismatched_lengths() {
        let result = FactorialAnova::new(&[1.0, 2.0, 3.0])
            .factor("A", &["x", "y"])
            .fit_type2();
        assert!(result.is_err());
    }

    #[test]
    fn test_display_lists_every_term() {
        let text = two_by_two().fit_type2().unwrap().to_string();
        assert!(text.contains("PR(>F)"));
        assert!(text.contains("A:B"));
        assert!(text.contains("Residual"));
    }
}
