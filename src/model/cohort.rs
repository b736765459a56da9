use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Cohort {
    #[serde(rename = "HC")]
    HealthyControl,
    #[serde(rename = "PD")]
    Parkinsons,
    #[serde(rename = "SWEDD")]
    Swedd,
}

impl Cohort {
    pub const ALL: [Cohort; 3] = [Cohort::HealthyControl, Cohort::Parkinsons, Cohort::Swedd];

    pub fn parse(code: &str) -> Option<Cohort> {
        match code.trim() {
            "HC" => Some(Cohort::HealthyControl),
            "PD" => Some(Cohort::Parkinsons),
            "SWEDD" => Some(Cohort::Swedd),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Cohort::HealthyControl => "HC",
            Cohort::Parkinsons => "PD",
            Cohort::Swedd => "SWEDD",
        }
    }

    /// Position in [`Cohort::ALL`]; also the on-disk tag in store snapshots.
    pub fn index(self) -> usize {
        match self {
            Cohort::HealthyControl => 0,
            Cohort::Parkinsons => 1,
            Cohort::Swedd => 2,
        }
    }

    pub fn from_index(idx: usize) -> Option<Cohort> {
        Cohort::ALL.get(idx).copied()
    }
}

impl std::fmt::Display for Cohort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CohortCounts {
    pub subjects: usize,
    #[serde(rename = "HC")]
    pub hc: usize,
    #[serde(rename = "PD")]
    pub pd: usize,
    #[serde(rename = "SWEDD")]
    pub swedd: usize,
}

impl CohortCounts {
    pub fn get(&self, cohort: Cohort) -> usize {
        match cohort {
            Cohort::HealthyControl => self.hc,
            Cohort::Parkinsons => self.pd,
            Cohort::Swedd => self.swedd,
        }
    }

    /// Cohorts with at least one subject, in HC, PD, SWEDD order.
    pub fn present(&self) -> Vec<Cohort> {
        Cohort::ALL
            .iter()
            .copied()
            .filter(|&c| self.get(c) > 0)
            .collect()
    }
}

pub fn count_cohorts(labels: &[Cohort]) -> CohortCounts {
    let mut counts = CohortCounts::default();
    for &label in labels {
        match label {
            Cohort::HealthyControl => counts.hc += 1,
            Cohort::Parkinsons => counts.pd += 1,
            Cohort::Swedd => counts.swedd += 1,
        }
    }
    counts.subjects = counts.hc + counts.pd + counts.swedd;
    if counts.subjects == 0 {
        tracing::warn!("no subjects selected");
    }
    counts
}
