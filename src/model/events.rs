/// Study timeline: screening, baseline, then numbered follow-up visits.
const EVENT_TIMELINE: &[&str] = &[
    "SC", "BL", "V01", "V02", "V03", "V04", "V05", "V06", "V07", "V08", "V09", "V10", "V11", "V12",
];

// Free-text event names used by the biospecimen analysis exports.
const BIOSPECIMEN_EVENTS: &[(&str, &str)] = &[
    ("Screening Visit", "SC"),
    ("Baseline Collection", "BL"),
    ("Visit 01", "V01"),
    ("Visit 02", "V02"),
    ("Visit 03", "V03"),
    ("Visit 04", "V04"),
    ("Visit 05", "V05"),
    ("Visit 06", "V06"),
    ("Visit 07", "V07"),
    ("Visit 08", "V08"),
    ("Visit 09", "V09"),
    ("Visit 10", "V10"),
    ("Visit 11", "V11"),
    ("Visit 12", "V12"),
];

pub fn event_timeline() -> Vec<String> {
    EVENT_TIMELINE.iter().map(|s| s.to_string()).collect()
}

pub fn recode_biospecimen_event(text: &str) -> Option<&'static str> {
    BIOSPECIMEN_EVENTS
        .iter()
        .find(|(name, _)| *name == text.trim())
        .map(|(_, code)| *code)
}
