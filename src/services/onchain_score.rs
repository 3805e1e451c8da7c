//! On-chain metric scoring: fixed piecewise maps per metric, equal-weighted
//! mean over whatever is available.

use crate::models::domain::clamp_score;

/// Netflow normalization scale (coins/day). Beyond this the signal saturates.
pub const NETFLOW_SCALE: f64 = 10_000.0;

/// Exchange netflow, sign-inverted: inflows (positive) are bearish.
pub fn netflow_score(netflow: f64) -> f64 {
    clamp_score(-netflow / NETFLOW_SCALE)
}

/// NUPL: +1 at 0, 0 at 0.5, -1 at 0.75 and beyond.
pub fn nupl_score(nupl: f64) -> f64 {
    if nupl <= 0.0 {
        1.0
    } else if nupl <= 0.5 {
        1.0 - nupl / 0.5
    } else if nupl < 0.75 {
        -(nupl - 0.5) / 0.25
    } else {
        -1.0
    }
}

/// MVRV Z-Score: +1 below 0, 0 at 3.5, -1 at 7 and beyond.
pub fn mvrv_z_score(z: f64) -> f64 {
    if z <= 0.0 {
        1.0
    } else if z <= 3.5 {
        1.0 - z / 3.5
    } else if z < 7.0 {
        -(z - 3.5) / 3.5
    } else {
        -1.0
    }
}

/// SOPR: +0.5 below 1 (capitulation), 0 at 1, down to -0.3 past 1.05.
pub fn sopr_score(sopr: f64) -> f64 {
    if sopr < 1.0 {
        0.5
    } else if sopr <= 1.05 {
        -(sopr - 1.0) / 0.05 * 0.3
    } else {
        -0.3
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OnchainInputs {
    pub exchange_netflow: Option<f64>,
    pub nupl: Option<f64>,
    pub mvrv_z: Option<f64>,
    pub sopr: Option<f64>,
}

/// Equal-weighted mean over available metrics; None when nothing is available.
pub fn compute_onchain_score(inputs: &OnchainInputs) -> Option<f64> {
    let mut parts = Vec::with_capacity(4);
    if let Some(v) = inputs.exchange_netflow {
        parts.push(netflow_score(v));
    }
    if let Some(v) = inputs.nupl {
        parts.push(nupl_score(v));
    }
    if let Some(v) = inputs.mvrv_z {
        parts.push(mvrv_z_score(v));
    }
    if let Some(v) = inputs.sopr {
        parts.push(sopr_score(v));
    }
    if parts.is_empty() {
        return None;
    }
    Some(clamp_score(parts.iter().sum::<f64>() / parts.len() as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nupl_map() {
        assert_eq!(nupl_score(0.0), 1.0);
        assert!((nupl_score(0.25) - 0.5).abs() < 1e-9);
        assert_eq!(nupl_score(0.5), 0.0);
        assert!((nupl_score(0.625) + 0.5).abs() < 1e-9);
        assert_eq!(nupl_score(0.75), -1.0);
        assert_eq!(nupl_score(0.9), -1.0);
    }

    #[test]
    fn test_mvrv_map() {
        assert_eq!(mvrv_z_score(-1.0), 1.0);
        assert_eq!(mvrv_z_score(3.5), 0.0);
        assert_eq!(mvrv_z_score(7.0), -1.0);
        assert_eq!(mvrv_z_score(10.0), -1.0);
    }

    #[test]
    fn test_sopr_map() {
        assert_eq!(sopr_score(0.97), 0.5);
        assert_eq!(sopr_score(1.0), 0.0);
        assert!((sopr_score(1.025) + 0.15).abs() < 1e-9);
        assert_eq!(sopr_score(1.2), -0.3);
    }

    #[test]
    fn test_netflow_inverted() {
        assert!(netflow_score(5_000.0) < 0.0);
        assert!(netflow_score(-5_000.0) > 0.0);
        assert_eq!(netflow_score(50_000.0), -1.0);
    }

    #[test]
    fn test_equal_weighted_mean() {
        let score = compute_onchain_score(&OnchainInputs {
            exchange_netflow: None,
            nupl: Some(0.0),
            mvrv_z: Some(7.0),
            sopr: None,
        })
        .unwrap();
        assert!((score - 0.0).abs() < 1e-9, "mean of +1 and -1 is 0, got {score}");

        assert!(compute_onchain_score(&OnchainInputs::default()).is_none());
    }
}
