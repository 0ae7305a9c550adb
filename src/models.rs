use std::fmt;

use serde::Serialize;

/// Column names of `student_performance`, in model feature order.
pub const FEATURE_NAMES: [&str; 6] = [
    "Attendance",
    "Assignment_Score",
    "Midterm_Score",
    "Final_Score",
    "Outstanding_Balance",
    "Library_Visits",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BalanceTier {
    Zero,
    Tier100k,
    Tier250k,
    Tier300k,
    Tier450k,
    Tier500k,
    Tier600k,
}

impl BalanceTier {
    pub const ALL: [BalanceTier; 7] = [
        BalanceTier::Zero,
        BalanceTier::Tier100k,
        BalanceTier::Tier250k,
        BalanceTier::Tier300k,
        BalanceTier::Tier450k,
        BalanceTier::Tier500k,
        BalanceTier::Tier600k,
    ];

    pub fn amount(self) -> i64 {
        match self {
            BalanceTier::Zero => 0,
            BalanceTier::Tier100k => 100_000,
            BalanceTier::Tier250k => 250_000,
            BalanceTier::Tier300k => 300_000,
            BalanceTier::Tier450k => 450_000,
            BalanceTier::Tier500k => 500_000,
            BalanceTier::Tier600k => 600_000,
        }
    }

    pub fn from_amount(amount: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|tier| tier.amount() == amount)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureRecord {
    pub attendance: u8,
    pub assignment_score: u8,
    pub midterm_score: u8,
    pub final_score: u8,
    pub outstanding_balance: BalanceTier,
    pub library_visits: u8,
}

impl FeatureRecord {
    /// Feature vector in `FEATURE_NAMES` order.
    pub fn to_features(&self) -> Vec<f64> {
        vec![
            f64::from(self.attendance),
            f64::from(self.assignment_score),
            f64::from(self.midterm_score),
            f64::from(self.final_score),
            self.outstanding_balance.amount() as f64,
            f64::from(self.library_visits),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    Pass,
    Fail,
}

impl Label {
    pub fn as_str(self) -> &'static str {
        match self {
            Label::Pass => "Pass",
            Label::Fail => "Fail",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Pass" => Some(Label::Pass),
            "Fail" => Some(Label::Fail),
            _ => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub label: Label,
    /// Aligned with the model's class list.
    pub probabilities: Vec<(Label, f64)>,
}

impl PredictionResult {
    /// Highest class probability as a percentage.
    pub fn confidence(&self) -> f64 {
        let max = self
            .probabilities
            .iter()
            .map(|(_, p)| *p)
            .fold(0.0_f64, f64::max);
        (max * 100.0).clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistedRow {
    #[serde(rename = "Attendance")]
    pub attendance: f64,
    #[serde(rename = "Assignment_Score")]
    pub assignment_score: f64,
    #[serde(rename = "Midterm_Score")]
    pub midterm_score: f64,
    #[serde(rename = "Final_Score")]
    pub final_score: i64,
    #[serde(rename = "Outstanding_Balance")]
    pub outstanding_balance: i64,
    #[serde(rename = "Library_Visits")]
    pub library_visits: i64,
    #[serde(rename = "Performance")]
    pub performance: String,
}

impl PersistedRow {
    pub fn new(record: &FeatureRecord, label: Label) -> Self {
        Self {
            attendance: f64::from(record.attendance),
            assignment_score: f64::from(record.assignment_score),
            midterm_score: f64::from(record.midterm_score),
            final_score: i64::from(record.final_score),
            outstanding_balance: record.outstanding_balance.amount(),
            library_visits: i64::from(record.library_visits),
            performance: label.as_str().to_string(),
        }
    }
}
