use crate::models::report::{AnalysisReport, Provenance};
use serde_json::{Number, Value as JsonValue};

/// Counts of leaf fields taken from upstream vs. filled from the baseline.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeTally {
    pub accepted: usize,
    pub defaulted: usize,
}

/// Turns raw model output into a complete report. Never fails.
pub fn normalize_response(raw: &str) -> AnalysisReport {
    match parse_untrusted(raw) {
        Some(value) => merge_with_baseline(&value),
        None => {
            tracing::warn!(
                response_len = raw.len(),
                "scoring response contained no parseable JSON object, using fallback report"
            );
            AnalysisReport::fallback()
        }
    }
}

/// Cut points remembered while scanning an unterminated object.
const MAX_REPAIR_CUTS: usize = 8;
/// Deeper prefixes are not worth closing; serde_json stops at 128 anyway.
const MAX_REPAIR_DEPTH: usize = 64;

/// Strict decode first, then the first top-level `{...}` in the text. An
/// object the model never finished is closed after its last complete member.
pub fn parse_untrusted(raw: &str) -> Option<JsonValue> {
    if let Ok(value @ JsonValue::Object(_)) = serde_json::from_str::<JsonValue>(raw.trim()) {
        return Some(value);
    }

    let mut from = 0;
    loop {
        match scan_object(raw, from)? {
            Scan::Closed { start, end } => {
                if let Ok(value @ JsonValue::Object(_)) = serde_json::from_str::<JsonValue>(&raw[start..end]) {
                    return Some(value);
                }
                from = end;
            }
            Scan::Open { start, cuts } => return repair_truncated(raw, start, &cuts),
        }
    }
}

/// Returns the first balanced top-level JSON object embedded in `text`,
/// skipping braces inside string literals. Objects that never close yield
/// `None`.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let mut from = 0;
    loop {
        match scan_object(text, from)? {
            Scan::Closed { start, end } => {
                let slice = &text[start..end];
                if serde_json::from_str::<JsonValue>(slice).is_ok() {
                    return Some(slice);
                }
                from = end;
            }
            Scan::Open { .. } => return None,
        }
    }
}

enum Scan {
    Closed { start: usize, end: usize },
    /// Text ended inside the object. `cuts` holds prefix ends, each with the
    /// closers that complete it, oldest first.
    Open { start: usize, cuts: Vec<(usize, String)> },
}

/// Single pass from the first `{` at or after `from`. Nested objects are
/// never returned on their own.
fn scan_object(text: &str, from: usize) -> Option<Scan> {
    let start = from + text.get(from..)?.find('{')?;
    let mut closers: Vec<u8> = Vec::new();
    let mut cuts: Vec<(usize, String)> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (idx, &byte) in text.as_bytes().iter().enumerate().skip(start) {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => {
                closers.push(if byte == b'{' { b'}' } else { b']' });
                if closers.len() > 1 {
                    push_cut(&mut cuts, idx + 1, &closers);
                }
            }
            b'}' | b']' => {
                closers.pop();
                if closers.is_empty() {
                    return Some(Scan::Closed { start, end: idx + 1 });
                }
                push_cut(&mut cuts, idx + 1, &closers);
            }
            b',' => push_cut(&mut cuts, idx, &closers),
            _ => {}
        }
    }

    Some(Scan::Open { start, cuts })
}

fn push_cut(cuts: &mut Vec<(usize, String)>, at: usize, closers: &[u8]) {
    if closers.len() > MAX_REPAIR_DEPTH {
        return;
    }
    if cuts.len() == MAX_REPAIR_CUTS {
        cuts.remove(0);
    }
    cuts.push((at, closers.iter().rev().map(|&b| char::from(b)).collect()));
}

fn repair_truncated(text: &str, start: usize, cuts: &[(usize, String)]) -> Option<JsonValue> {
    cuts.iter().rev().find_map(|(end, closers)| {
        let candidate = format!("{}{}", &text[start..*end], closers);
        match serde_json::from_str::<JsonValue>(&candidate) {
            Ok(value @ JsonValue::Object(_)) => {
                tracing::warn!(
                    kept_bytes = *end - start,
                    dropped_bytes = text.len() - *end,
                    "scoring response was truncated, closed after last complete member"
                );
                Some(value)
            }
            _ => None,
        }
    })
}

/// Deep-merges an upstream object over the neutral baseline, field by field.
/// Upstream values are kept wherever their JSON kind matches the baseline slot.
pub fn merge_with_baseline(upstream: &JsonValue) -> AnalysisReport {
    let mut base = match serde_json::to_value(AnalysisReport::fallback()) {
        Ok(value) => value,
        Err(e) => {
            tracing::error!(error = %e, "baseline report failed to serialize");
            return AnalysisReport::fallback();
        }
    };
    if let Some(fields) = base.as_object_mut() {
        fields.remove("provenance");
    }

    let mut tally = MergeTally::default();
    overlay(&mut base, upstream, &mut tally);

    let mut report = match serde_json::from_value::<AnalysisReport>(base) {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(error = %e, "merged report failed to decode, using fallback report");
            return AnalysisReport::fallback();
        }
    };

    report.provenance = if tally.accepted == 0 {
        Provenance::Fallback
    } else if tally.defaulted == 0 {
        Provenance::Model
    } else {
        Provenance::Partial
    };

    if tally.defaulted > 0 {
        tracing::debug!(
            accepted = tally.accepted,
            defaulted = tally.defaulted,
            "scoring response was incomplete, baseline fields filled in"
        );
    }

    report
}

fn overlay(base: &mut JsonValue, upstream: &JsonValue, tally: &mut MergeTally) {
    if let Some(fields) = base.as_object_mut() {
        let incoming = upstream.as_object();
        for (key, slot) in fields.iter_mut() {
            match incoming.and_then(|obj| obj.get(key)) {
                Some(value) => overlay(slot, value, tally),
                None => tally.defaulted += leaf_count(slot),
            }
        }
        return;
    }

    let replacement = match &*base {
        JsonValue::Number(_) => coerce_number(upstream).map(JsonValue::Number),
        JsonValue::String(_) => upstream
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| JsonValue::String(s.to_string())),
        JsonValue::Bool(_) => upstream.as_bool().map(JsonValue::Bool),
        JsonValue::Array(_) => upstream.as_array().map(|items| {
            JsonValue::Array(
                items
                    .iter()
                    .filter_map(|item| match item {
                        JsonValue::String(s) if !s.trim().is_empty() => {
                            Some(JsonValue::String(s.trim().to_string()))
                        }
                        JsonValue::Number(n) => Some(JsonValue::String(n.to_string())),
                        _ => None,
                    })
                    .collect(),
            )
        }),
        _ => None,
    };

    match replacement {
        Some(value) => {
            *base = value;
            tally.accepted += 1;
        }
        None => tally.defaulted += 1,
    }
}

fn coerce_number(value: &JsonValue) -> Option<Number> {
    let raw = match value {
        JsonValue::Number(n) => n.as_f64()?,
        JsonValue::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };
    Number::from_f64(raw)
}

fn leaf_count(value: &JsonValue) -> usize {
    match value {
        JsonValue::Object(fields) => fields.values().map(leaf_count).sum(),
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::report::{Decision, LocusOfControl, RetentionRisk};
    use serde_json::json;

    fn assert_in_range(report: &AnalysisReport) {
        let s = &report.scores;
        for v in [s.aptitude, s.integrity, s.performance_potential, s.cultural_fit, s.flight_risk] {
            assert!(v <= 100);
        }
        let b = &report.psychology.big_five;
        for v in [b.openness, b.conscientiousness, b.extraversion, b.agreeableness, b.neuroticism] {
            assert!(v <= 100);
        }
        let ei = &report.emotional_intelligence;
        for v in [ei.self_awareness, ei.self_regulation, ei.empathy, ei.motivation, ei.social_skills] {
            assert!(v <= 10);
        }
        assert!(report.coherence.score <= 100);
        assert!(report.coherence.honesty_score <= 100);
    }

    #[test]
    fn extracts_object_surrounded_by_commentary() {
        let text = "Sure! Here is the analysis:\n```json\n{\"a\": {\"b\": \"}\"}}\n```\nHope it helps {not json";
        assert_eq!(extract_json_object(text), Some("{\"a\": {\"b\": \"}\"}}"));
    }

    #[test]
    fn skips_unbalanced_or_invalid_prefix_objects() {
        let text = "{oops} then {\"ok\": true}";
        assert_eq!(extract_json_object(text), Some("{\"ok\": true}"));
        assert_eq!(extract_json_object("{\"never\": \"closed\""), None);
        assert_eq!(extract_json_object("no braces at all"), None);
    }

    #[test]
    fn truncated_response_keeps_completed_sections() {
        let raw = r#"```json
{"scores": {"aptitude": 93, "integrity": 12, "performancePotential": 70,
 "culturalFit": 66, "flightRisk": 40},
 "flags": {"redFlags": ["Left the post"], "greenFlags": ["Punctual", "Hon"#;
        let report = normalize_response(raw);

        assert_eq!(report.scores.aptitude, 93);
        assert_eq!(report.scores.integrity, 12);
        assert_eq!(report.flags.red_flags, vec!["Left the post".to_string()]);
        assert_eq!(report.flags.green_flags, vec!["Punctual".to_string()]);
        assert_eq!(report.recommendation.decision, Decision::Validate);
        assert_eq!(report.provenance, Provenance::Partial);
        assert_in_range(&report);
    }

    #[test]
    fn truncated_inside_a_nested_value_drops_only_that_member() {
        let raw = r#"{"scores": {"aptitude": 93, "integrity": 12}, "recommendation": {"decision": "REJ"#;
        let value = parse_untrusted(raw).unwrap();
        assert_eq!(value["scores"]["aptitude"], 93);
        assert_eq!(value["recommendation"], json!({}));

        let report = merge_with_baseline(&value);
        assert_eq!(report.scores.aptitude, 93);
        assert_eq!(report.scores.integrity, 12);
        assert_ne!(report.provenance, Provenance::Fallback);
    }

    #[test]
    fn many_unbalanced_braces_scan_in_one_pass() {
        let raw = "{".repeat(200_000);
        assert_eq!(extract_json_object(&raw), None);
        assert_eq!(normalize_response(&raw).provenance, Provenance::Fallback);
    }

    #[test]
    fn garbage_and_empty_responses_yield_complete_fallback() {
        for raw in ["", "   ", "null", "[]", "I cannot help with that.", "{", "{\"scores\": "] {
            let report = normalize_response(raw);
            assert_eq!(report, AnalysisReport::fallback(), "input: {raw:?}");
            assert_eq!(report.recommendation.decision, Decision::Validate);
            assert_eq!(report.provenance, Provenance::Fallback);
            assert_in_range(&report);
        }
    }

    #[test]
    fn partial_response_keeps_what_parsed() {
        let raw = r#"Analysis follows: {"scores": {"aptitude": 88, "integrity": "73"},
            "flags": {"redFlags": ["Kept the bill", 7, null]},
            "recommendation": {"decision": "hire"}} trailing"#;
        let report = normalize_response(raw);

        assert_eq!(report.scores.aptitude, 88);
        assert_eq!(report.scores.integrity, 73);
        assert_eq!(report.scores.flight_risk, 50);
        assert_eq!(report.flags.red_flags, vec!["Kept the bill".to_string(), "7".to_string()]);
        assert!(report.flags.green_flags.is_empty());
        assert_eq!(report.recommendation.decision, Decision::Hire);
        assert_eq!(report.recommendation.reason, AnalysisReport::fallback().recommendation.reason);
        assert_eq!(report.provenance, Provenance::Partial);
    }

    #[test]
    fn out_of_range_and_mistyped_values_are_clamped_or_defaulted() {
        let upstream = json!({
            "scores": {"aptitude": 140.6, "integrity": -3, "culturalFit": 61.4, "flightRisk": {"x": 1}},
            "emotionalIntelligence": {"empathy": 42, "selfAwareness": 7.6},
            "coherence": {"inconsistencies": "not a list", "locusOfControl": "sideways"},
            "motivation": {"roleAlignment": "yes", "retentionRiskLevel": "HIGH"},
            "psychology": {"mbti": "", "bigFive": {"openness": 77}}
        });
        let report = merge_with_baseline(&upstream);

        assert_eq!(report.scores.aptitude, 100);
        assert_eq!(report.scores.integrity, 0);
        assert_eq!(report.scores.cultural_fit, 61);
        assert_eq!(report.scores.flight_risk, 50);
        assert_eq!(report.emotional_intelligence.empathy, 10);
        assert_eq!(report.emotional_intelligence.self_awareness, 8);
        assert!(report.coherence.inconsistencies.is_empty());
        assert_eq!(report.coherence.locus_of_control, LocusOfControl::External);
        assert!(!report.motivation.role_alignment);
        assert_eq!(report.motivation.retention_risk_level, RetentionRisk::High);
        assert_eq!(report.psychology.mbti, "N/A");
        assert_eq!(report.psychology.big_five.openness, 77);
        assert_in_range(&report);
    }

    #[test]
    fn complete_response_is_marked_as_model_output() {
        let mut full = serde_json::to_value(AnalysisReport::fallback()).unwrap();
        full["scores"]["aptitude"] = json!(91);
        full["recommendation"]["decision"] = json!("REJECT");
        full.as_object_mut().unwrap().remove("provenance");

        let report = normalize_response(&full.to_string());
        assert_eq!(report.scores.aptitude, 91);
        assert_eq!(report.recommendation.decision, Decision::Reject);
        assert_eq!(report.provenance, Provenance::Model);
    }
}
