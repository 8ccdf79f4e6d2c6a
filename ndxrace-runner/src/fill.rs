//! Gap-filling policy for share counts.

/// Carry the last known value forward over gaps.
///
/// Leading gaps stay `None`: a value is never invented before the first
/// observation. Present values are never modified.
pub fn forward_fill(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut last = None;
    values
        .iter()
        .map(|v| {
            if v.is_some() {
                last = *v;
            }
            last
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_interior_and_trailing_gaps() {
        let filled = forward_fill(&[Some(1.0), None, Some(3.0), None, None]);
        assert_eq!(filled, vec![Some(1.0), Some(1.0), Some(3.0), Some(3.0), Some(3.0)]);
    }

    #[test]
    fn leading_gaps_stay_empty() {
        let filled = forward_fill(&[None, None, Some(2.0), None]);
        assert_eq!(filled, vec![None, None, Some(2.0), Some(2.0)]);
    }

    #[test]
    fn all_none_stays_none() {
        assert_eq!(forward_fill(&[None, None]), vec![None, None]);
        assert!(forward_fill(&[]).is_empty());
    }
}
