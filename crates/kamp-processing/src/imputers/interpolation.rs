//! Linear interpolation by row position.

use crate::error::Result;
use crate::types::{ActionType, PreprocessingAction};
use crate::utils::column_as_f64;
use polars::prelude::*;

/// Fills gaps in numeric columns by linear interpolation.
///
/// Interior gaps are filled on the straight line between their neighbours,
/// trailing gaps repeat the last known value and leading gaps stay missing.
pub struct InterpolationImputer;

impl InterpolationImputer {
    pub fn apply_linear(
        df: &mut DataFrame,
        col_name: &str,
        actions: &mut Vec<PreprocessingAction>,
    ) -> Result<()> {
        if df.column(col_name).is_err() {
            return Ok(());
        }

        let values = column_as_f64(df, col_name)?;
        let before = values.iter().filter(|v| v.is_none()).count();
        if before == 0 {
            return Ok(());
        }

        let filled = interpolate_linear(&values);
        let after = filled.iter().filter(|v| v.is_none()).count();
        df.replace(col_name, Series::new(col_name.into(), filled))?;

        actions.push(
            PreprocessingAction::new(
                ActionType::ValueImputed,
                col_name,
                format!("Filled {} missing values", before - after),
            )
            .with_details("linear interpolation"),
        );
        Ok(())
    }
}

/// Interpolate `values` linearly over their positions.
pub fn interpolate_linear(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = values.to_vec();
    let mut last: Option<(usize, f64)> = None;

    for (i, value) in values.iter().enumerate() {
        let Some(v) = *value else { continue };
        if let Some((j, prev)) = last
            && i > j + 1
        {
            let span = (i - j) as f64;
            for (k, slot) in out.iter_mut().enumerate().take(i).skip(j + 1) {
                *slot = Some(prev + (v - prev) * (k - j) as f64 / span);
            }
        }
        last = Some((i, v));
    }

    if let Some((j, prev)) = last {
        for slot in out.iter_mut().skip(j + 1) {
            *slot = Some(prev);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interior_gap() {
        let filled = interpolate_linear(&[Some(1.0), None, None, Some(4.0)]);
        assert_eq!(filled, vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn test_edges() {
        let filled = interpolate_linear(&[None, Some(2.0), None, Some(6.0), None, None]);
        assert_eq!(
            filled,
            vec![None, Some(2.0), Some(4.0), Some(6.0), Some(6.0), Some(6.0)]
        );
    }

    #[test]
    fn test_all_missing_stays_missing() {
        let filled = interpolate_linear(&[None, None]);
        assert_eq!(filled, vec![None, None]);
    }

    #[test]
    fn test_apply_linear_records_action() {
        let mut df = df!["Humidity" => [Some(40.0), None, Some(50.0)]].unwrap();
        let mut actions = Vec::new();

        InterpolationImputer::apply_linear(&mut df, "Humidity", &mut actions).unwrap();

        assert_eq!(df.column("Humidity").unwrap().null_count(), 0);
        assert_eq!(
            column_as_f64(&df, "Humidity").unwrap(),
            vec![Some(40.0), Some(45.0), Some(50.0)]
        );
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action_type, ActionType::ValueImputed);
    }
}
