use serde::Deserialize;

use crate::models::{BalanceTier, FeatureRecord, FEATURE_NAMES};
use crate::page::{Element, Page};

pub struct SliderSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub min: i64,
    pub max: i64,
    pub default: i64,
}

impl SliderSpec {
    fn clamp(&self, value: i64) -> i64 {
        value.clamp(self.min, self.max)
    }
}

pub const ATTENDANCE: SliderSpec = SliderSpec {
    key: "attendance",
    label: "Attendance (%)",
    min: 0,
    max: 100,
    default: 85,
};
pub const ASSIGNMENT_SCORE: SliderSpec = SliderSpec {
    key: "assignment_score",
    label: "Assignment Score",
    min: 0,
    max: 100,
    default: 75,
};
pub const MIDTERM_SCORE: SliderSpec = SliderSpec {
    key: "midterm_score",
    label: "Midterm Score",
    min: 0,
    max: 100,
    default: 65,
};
pub const FINAL_SCORE: SliderSpec = SliderSpec {
    key: "final_score",
    label: "Final Score",
    min: 0,
    max: 100,
    default: 70,
};
pub const LIBRARY_VISITS: SliderSpec = SliderSpec {
    key: "library_visits",
    label: "Library Visits (per semester)",
    min: 0,
    max: 50,
    default: 20,
};

pub const BALANCE_KEY: &str = "outstanding_balance";
pub const BALANCE_LABEL: &str = "Outstanding Balance";
pub const BALANCE_DEFAULT: BalanceTier = BalanceTier::Zero;

/// Raw widget values as submitted by the form or given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WidgetState {
    pub attendance: i64,
    pub assignment_score: i64,
    pub midterm_score: i64,
    pub final_score: i64,
    pub outstanding_balance: i64,
    pub library_visits: i64,
}

impl Default for WidgetState {
    fn default() -> Self {
        Self {
            attendance: ATTENDANCE.default,
            assignment_score: ASSIGNMENT_SCORE.default,
            midterm_score: MIDTERM_SCORE.default,
            final_score: FINAL_SCORE.default,
            outstanding_balance: BALANCE_DEFAULT.amount(),
            library_visits: LIBRARY_VISITS.default,
        }
    }
}

/// Renders the six input controls into the sidebar and returns the record
/// they describe. Out-of-range slider values are clamped and an unknown
/// balance falls back to the selector default, so this never fails.
pub fn collect(state: &WidgetState, page: &mut Page) -> FeatureRecord {
    page.push_sidebar(Element::Header("Input Student Features".to_string()));

    let attendance = slider(page, &ATTENDANCE, state.attendance);
    let assignment_score = slider(page, &ASSIGNMENT_SCORE, state.assignment_score);
    let midterm_score = slider(page, &MIDTERM_SCORE, state.midterm_score);
    let final_score = slider(page, &FINAL_SCORE, state.final_score);

    let outstanding_balance =
        BalanceTier::from_amount(state.outstanding_balance).unwrap_or(BALANCE_DEFAULT);
    page.push_sidebar(Element::Select {
        key: BALANCE_KEY,
        label: BALANCE_LABEL,
        options: BalanceTier::ALL.iter().map(|tier| tier.amount()).collect(),
        value: outstanding_balance.amount(),
    });

    let library_visits = slider(page, &LIBRARY_VISITS, state.library_visits);

    FeatureRecord {
        attendance,
        assignment_score,
        midterm_score,
        final_score,
        outstanding_balance,
        library_visits,
    }
}

fn slider(page: &mut Page, spec: &SliderSpec, raw: i64) -> u8 {
    let value = spec.clamp(raw);
    page.push_sidebar(Element::Slider {
        key: spec.key,
        label: spec.label,
        min: spec.min,
        max: spec.max,
        value,
    });
    // Every slider range sits inside 0..=100.
    u8::try_from(value).unwrap_or(0)
}

/// Table echo of the current inputs, keyed by column name.
pub fn metrics_table(record: &FeatureRecord) -> Element {
    let values = [
        record.attendance.to_string(),
        record.assignment_score.to_string(),
        record.midterm_score.to_string(),
        record.final_score.to_string(),
        record.outstanding_balance.amount().to_string(),
        record.library_visits.to_string(),
    ];
    Element::Table(
        FEATURE_NAMES
            .iter()
            .zip(values)
            .map(|(name, value)| (name.to_string(), value))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_produce_default_record() {
        let mut page = Page::new("test");
        let record = collect(&WidgetState::default(), &mut page);
        assert_eq!(
            record,
            FeatureRecord {
                attendance: 85,
                assignment_score: 75,
                midterm_score: 65,
                final_score: 70,
                outstanding_balance: BalanceTier::Zero,
                library_visits: 20,
            }
        );
    }

    #[test]
    fn renders_header_five_sliders_and_one_selector() {
        let mut page = Page::new("test");
        collect(&WidgetState::default(), &mut page);
        let sliders = page
            .sidebar
            .iter()
            .filter(|e| matches!(e, Element::Slider { .. }))
            .count();
        let selects = page
            .sidebar
            .iter()
            .filter(|e| matches!(e, Element::Select { .. }))
            .count();
        assert_eq!(sliders, 5);
        assert_eq!(selects, 1);
        assert_eq!(
            page.sidebar[0],
            Element::Header("Input Student Features".to_string())
        );
    }

    #[test]
    fn max_balance_with_minimum_scores_is_accepted() {
        let state = WidgetState {
            attendance: 0,
            assignment_score: 0,
            midterm_score: 0,
            final_score: 0,
            outstanding_balance: 600_000,
            library_visits: 0,
        };
        let record = collect(&state, &mut Page::new("test"));
        assert_eq!(record.outstanding_balance, BalanceTier::Tier600k);
        assert_eq!(record.attendance, 0);
        assert_eq!(record.assignment_score, 0);
        assert_eq!(record.midterm_score, 0);
        assert_eq!(record.final_score, 0);
        assert_eq!(record.library_visits, 0);
    }

    #[test]
    fn in_range_values_pass_through_unchanged() {
        for attendance in [0, 1, 50, 99, 100] {
            for library_visits in [0, 25, 50] {
                for tier in BalanceTier::ALL {
                    let state = WidgetState {
                        attendance,
                        assignment_score: 100 - attendance,
                        midterm_score: attendance / 2,
                        final_score: attendance,
                        outstanding_balance: tier.amount(),
                        library_visits,
                    };
                    let record = collect(&state, &mut Page::new("test"));
                    assert_eq!(i64::from(record.attendance), attendance);
                    assert_eq!(i64::from(record.assignment_score), 100 - attendance);
                    assert_eq!(i64::from(record.midterm_score), attendance / 2);
                    assert_eq!(i64::from(record.final_score), attendance);
                    assert_eq!(record.outstanding_balance, tier);
                    assert_eq!(i64::from(record.library_visits), library_visits);
                }
            }
        }
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let state = WidgetState {
            attendance: 140,
            assignment_score: -5,
            midterm_score: 101,
            final_score: 70,
            outstanding_balance: 123,
            library_visits: 80,
        };
        let record = collect(&state, &mut Page::new("test"));
        assert_eq!(record.attendance, 100);
        assert_eq!(record.assignment_score, 0);
        assert_eq!(record.midterm_score, 100);
        assert_eq!(record.outstanding_balance, BalanceTier::Zero);
        assert_eq!(record.library_visits, 50);
    }

    #[test]
    fn metrics_table_uses_column_names() {
        let record = collect(&WidgetState::default(), &mut Page::new("test"));
        let Element::Table(cells) = metrics_table(&record) else {
            panic!("expected a table");
        };
        assert_eq!(cells[0], ("Attendance".to_string(), "85".to_string()));
        assert_eq!(cells[4], ("Outstanding_Balance".to_string(), "0".to_string()));
        assert_eq!(cells.len(), 6);
    }
}
