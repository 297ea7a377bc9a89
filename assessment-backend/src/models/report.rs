use serde::{Deserialize, Deserializer, Serialize};

/// Structured scoring result. Every numeric field is clamped on the way in,
/// so a decoded report is always in range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub scores: Scores,
    pub psychology: Psychology,
    pub emotional_intelligence: EmotionalIntelligence,
    pub coherence: Coherence,
    pub leadership: Leadership,
    pub flags: Flags,
    pub motivation: Motivation,
    pub recommendation: Recommendation,
    #[serde(default)]
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scores {
    #[serde(deserialize_with = "percent")]
    pub aptitude: u8,
    #[serde(deserialize_with = "percent")]
    pub integrity: u8,
    #[serde(deserialize_with = "percent")]
    pub performance_potential: u8,
    #[serde(deserialize_with = "percent")]
    pub cultural_fit: u8,
    #[serde(deserialize_with = "percent")]
    pub flight_risk: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Psychology {
    pub mbti: String,
    pub big_five: BigFive,
    pub enneagram: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BigFive {
    #[serde(deserialize_with = "percent")]
    pub openness: u8,
    #[serde(deserialize_with = "percent")]
    pub conscientiousness: u8,
    #[serde(deserialize_with = "percent")]
    pub extraversion: u8,
    #[serde(deserialize_with = "percent")]
    pub agreeableness: u8,
    #[serde(deserialize_with = "percent")]
    pub neuroticism: u8,
}

/// Sub-scores on a 0-10 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionalIntelligence {
    #[serde(deserialize_with = "decile")]
    pub self_awareness: u8,
    #[serde(deserialize_with = "decile")]
    pub self_regulation: u8,
    #[serde(deserialize_with = "decile")]
    pub empathy: u8,
    #[serde(deserialize_with = "decile")]
    pub motivation: u8,
    #[serde(deserialize_with = "decile")]
    pub social_skills: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coherence {
    #[serde(deserialize_with = "percent")]
    pub score: u8,
    pub narrative_analysis: String,
    #[serde(deserialize_with = "percent")]
    pub honesty_score: u8,
    pub honesty_analysis: String,
    pub inconsistencies: Vec<String>,
    pub locus_of_control: LocusOfControl,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leadership {
    pub primary_style: String,
    pub secondary_style: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub development_plan: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flags {
    pub red_flags: Vec<String>,
    pub green_flags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Motivation {
    pub surface_level: String,
    pub deep_level: String,
    pub role_alignment: bool,
    pub retention_risk_level: RetentionRisk,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub decision: Decision,
    pub reason: String,
    pub next_steps: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Hire,
    Validate,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LocusOfControl {
    Internal,
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RetentionRisk {
    Low,
    Medium,
    High,
}

/// Where the report content came from. A FALLBACK report is neutral because
/// nothing was evaluated, not because the candidate scored average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Provenance {
    #[default]
    Model,
    Partial,
    Fallback,
}

// Unrecognized enum values decode to the neutral baseline value instead of
// failing the whole report.

impl<'de> Deserialize<'de> for Decision {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.trim().to_ascii_uppercase().as_str() {
            "HIRE" => Decision::Hire,
            "REJECT" => Decision::Reject,
            _ => Decision::Validate,
        })
    }
}

impl<'de> Deserialize<'de> for LocusOfControl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(if raw.trim().eq_ignore_ascii_case("internal") {
            LocusOfControl::Internal
        } else {
            LocusOfControl::External
        })
    }
}

impl<'de> Deserialize<'de> for RetentionRisk {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.trim().to_ascii_lowercase().as_str() {
            "low" => RetentionRisk::Low,
            "high" => RetentionRisk::High,
            _ => RetentionRisk::Medium,
        })
    }
}

pub const PERCENT_MAX: u8 = 100;
pub const DECILE_MAX: u8 = 10;

pub fn clamp_score(value: f64, max: u8) -> u8 {
    if !value.is_finite() {
        return max / 2;
    }
    value.round().clamp(0.0, f64::from(max)) as u8
}

fn percent<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let value = f64::deserialize(deserializer)?;
    Ok(clamp_score(value, PERCENT_MAX))
}

fn decile<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let value = f64::deserialize(deserializer)?;
    Ok(clamp_score(value, DECILE_MAX))
}

impl AnalysisReport {
    /// The neutral, fully-populated baseline substituted when scoring fails.
    pub fn fallback() -> Self {
        Self {
            scores: Scores {
                aptitude: 50,
                integrity: 50,
                performance_potential: 50,
                cultural_fit: 50,
                flight_risk: 50,
            },
            psychology: Psychology {
                mbti: "N/A".to_string(),
                big_five: BigFive {
                    openness: 50,
                    conscientiousness: 50,
                    extraversion: 50,
                    agreeableness: 50,
                    neuroticism: 50,
                },
                enneagram: "N/A".to_string(),
            },
            emotional_intelligence: EmotionalIntelligence {
                self_awareness: 5,
                self_regulation: 5,
                empathy: 5,
                motivation: 5,
                social_skills: 5,
            },
            coherence: Coherence {
                score: 50,
                narrative_analysis: "Analysis unavailable".to_string(),
                honesty_score: 50,
                honesty_analysis: "Insufficient information".to_string(),
                inconsistencies: Vec::new(),
                locus_of_control: LocusOfControl::External,
            },
            leadership: Leadership {
                primary_style: "N/A".to_string(),
                secondary_style: "N/A".to_string(),
                strengths: Vec::new(),
                weaknesses: Vec::new(),
                development_plan: "N/A".to_string(),
            },
            flags: Flags {
                red_flags: Vec::new(),
                green_flags: Vec::new(),
            },
            motivation: Motivation {
                surface_level: "N/A".to_string(),
                deep_level: "N/A".to_string(),
                role_alignment: false,
                retention_risk_level: RetentionRisk::Medium,
            },
            recommendation: Recommendation {
                decision: Decision::Validate,
                reason: "Automated analysis could not be completed; validate manually.".to_string(),
                next_steps: Vec::new(),
            },
            provenance: Provenance::Fallback,
        }
    }
}
