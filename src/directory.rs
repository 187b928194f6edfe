//! Health-center directory.
//!
//! The flows only see the `HealthCenterDirectory` trait; the static directory
//! below stands in for a real provider registry.

use crate::pipeline::flows::types::HealthCenter;

/// Read-only lookup of health centers by specialty.
pub trait HealthCenterDirectory {
    /// All centers whose specialty contains `specialty` (case-insensitive),
    /// in the directory's insertion order.
    fn query(&self, specialty: &str) -> Vec<HealthCenter>;
}

/// In-memory directory with a fixed record set.
pub struct StaticHealthCenterDirectory {
    centers: Vec<HealthCenter>,
}

impl StaticHealthCenterDirectory {
    pub fn new(centers: Vec<HealthCenter>) -> Self {
        Self { centers }
    }

    /// The six-record directory shipped for local use.
    pub fn with_default_centers() -> Self {
        let center = |name: &str, address: &str, phone: &str, specialty: &str| HealthCenter {
            name: name.to_string(),
            address: address.to_string(),
            phone: phone.to_string(),
            specialty: Some(specialty.to_string()),
        };

        Self::new(vec![
            center("Apollo Clinic", "123 Health St, Wellness City", "+1-555-123-4567", "General Physician"),
            center("Fortis Hospital", "456 Cure Ave, Remedy Town", "+1-555-987-6543", "Cardiology"),
            center("Max Healthcare", "789 Life Blvd, Vitality Village", "+1-555-234-5678", "Dermatology"),
            center("City General Hospital", "101 Main St, Metroburg", "+1-555-111-2222", "General Physician"),
            center("Heartbeat Cardiology Center", "202 Pulse Rd, Cardio City", "+1-555-333-4444", "Cardiology"),
            center("Skin Deep Dermatology Clinic", "303 Dermis Dr, Epiderm Ville", "+1-555-555-6666", "Dermatology"),
        ])
    }

    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }
}

impl HealthCenterDirectory for StaticHealthCenterDirectory {
    fn query(&self, specialty: &str) -> Vec<HealthCenter> {
        let needle = specialty.to_lowercase();
        self.centers
            .iter()
            .filter(|c| {
                c.specialty
                    .as_deref()
                    .is_some_and(|s| s.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect()
    }
}
