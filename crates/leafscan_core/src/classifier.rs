//! crates/leafscan_core/src/classifier.rs
//!
//! The single home of the severity thresholds and status labels. Both the live
//! result and every history record go through these functions.

use crate::domain::{Classification, Tier};

fn normalize(status: &str) -> String {
    status.trim().to_lowercase()
}

fn is_healthy(status: &str) -> bool {
    matches!(normalize(status).as_str(), "healthy" | "sehat")
}

/// Maps a confidence score (0..=100) and backend status to a severity tier.
///
/// Lower bounds are inclusive: 90 is `Tinggi`, 79.9 is `Rendah`. NaN falls to `SangatRendah`.
pub fn severity_tier(accuracy: f64, status: &str) -> Tier {
    if is_healthy(status) {
        return Tier::Healthy;
    }
    if accuracy >= 90.0 {
        Tier::Tinggi
    } else if accuracy >= 80.0 {
        Tier::Sedang
    } else if accuracy >= 70.0 {
        Tier::Rendah
    } else {
        Tier::SangatRendah
    }
}

/// Maps the known backend status strings to display labels; anything else passes through.
pub fn status_label(status: &str) -> String {
    match normalize(status).as_str() {
        "terdeteksi penyakit" | "infected" => "Terdeteksi".to_string(),
        "healthy" | "sehat" => "Sehat".to_string(),
        _ => status.to_string(),
    }
}

pub fn classify(accuracy: f64, status: &str) -> Classification {
    let tier = severity_tier(accuracy, status);
    Classification {
        tier,
        tier_label: tier.label(),
        status_label: status_label(status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_follow_thresholds() {
        assert_eq!(severity_tier(92.0, "Infected"), Tier::Tinggi);
        assert_eq!(severity_tier(85.0, "Infected"), Tier::Sedang);
        assert_eq!(severity_tier(75.0, "Infected"), Tier::Rendah);
        assert_eq!(severity_tier(60.0, "Infected"), Tier::SangatRendah);
    }

    #[test]
    fn lower_bounds_are_inclusive() {
        assert_eq!(severity_tier(90.0, "Infected"), Tier::Tinggi);
        assert_eq!(severity_tier(89.99, "Infected"), Tier::Sedang);
        assert_eq!(severity_tier(80.0, "Infected"), Tier::Sedang);
        assert_eq!(severity_tier(79.9, "Infected"), Tier::Rendah);
        assert_eq!(severity_tier(70.0, "Infected"), Tier::Rendah);
        assert_eq!(severity_tier(69.99, "Infected"), Tier::SangatRendah);
        assert_eq!(severity_tier(f64::NAN, "Infected"), Tier::SangatRendah);
    }

    #[test]
    fn healthy_wins_over_accuracy() {
        for accuracy in [0.0, 50.0, 75.0, 99.9, 100.0] {
            assert_eq!(severity_tier(accuracy, "Healthy"), Tier::Healthy);
        }
        assert_eq!(severity_tier(95.0, "  healthy "), Tier::Healthy);
        assert_eq!(severity_tier(95.0, "Sehat"), Tier::Healthy);
        assert_eq!(Tier::Healthy.label(), "Sehat");
    }

    #[test]
    fn status_labels() {
        assert_eq!(status_label("Terdeteksi Penyakit"), "Terdeteksi");
        assert_eq!(status_label("Infected"), "Terdeteksi");
        assert_eq!(status_label("Healthy"), "Sehat");
        assert_eq!(status_label("Menunggu"), "Menunggu");
    }

    #[test]
    fn classify_is_deterministic() {
        let a = classify(94.2, "Infected");
        let b = classify(94.2, "Infected");
        assert_eq!(a, b);
        assert_eq!(a.tier, Tier::Tinggi);
        assert_eq!(a.tier_label, "Tinggi");
        assert_eq!(a.status_label, "Terdeteksi");
    }
}
