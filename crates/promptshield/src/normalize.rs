//! Response normalization: provider replies to a single verdict shape.
//!
//! Two families exist. Classification replies are ranked `{label, score}`
//! lists; generative replies are free text that the analysis prompt forces
//! into a `SCORE:.. THREATS:.. REASON:..` line.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::providers::{RawResponse, ResponseFamily};
use crate::types::ThreatType;

/// Score reported when a generative reply carries no parseable SCORE.
const UNPARSED_SCORE: f64 = 0.3;

/// Score assigned to classification labels outside the known set.
const SUSPICION_BASELINE: f64 = 0.5;

/// Normalized model output folded into the running verdict.
#[derive(Clone, Debug, PartialEq)]
pub struct Analysis {
    pub score: f64,
    pub threats: Vec<ThreatType>,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

/// Normalize a raw provider reply. Classification payloads that fail to
/// decode are errors (charged to the breaker); generative replies always
/// normalize, falling back to conservative defaults on a parse miss.
pub fn normalize(raw: &RawResponse) -> Result<Analysis> {
    match raw.family {
        ResponseFamily::Classification => normalize_classification(&raw.payload),
        ResponseFamily::Generative => Ok(normalize_generative(&raw.payload)),
    }
}

fn normalize_classification(payload: &str) -> Result<Analysis> {
    let batches: Vec<Vec<LabelScore>> = serde_json::from_str(payload)
        .map_err(|e| Error::Decode(format!("classification payload: {e}")))?;

    let top = batches
        .first()
        .and_then(|batch| batch.first())
        .ok_or_else(|| Error::Decode("empty classification response".to_string()))?;

    let label = top.label.to_lowercase();
    Ok(match label.as_str() {
        "injection" => Analysis {
            score: top.score,
            threats: vec![ThreatType::Injection],
            reason: "prompt injection reported by the deberta classifier".to_string(),
        },
        "label_1" => Analysis {
            score: top.score,
            threats: vec![ThreatType::Injection],
            reason: "prompt injection reported by the prompt-guard classifier".to_string(),
        },
        "safe" => Analysis {
            score: clamp_benign(1.0 - top.score),
            threats: Vec::new(),
            reason: "classified as safe by the deberta classifier".to_string(),
        },
        "label_0" => Analysis {
            score: clamp_benign(1.0 - top.score),
            threats: Vec::new(),
            reason: "classified as benign by the prompt-guard classifier".to_string(),
        },
        other => Analysis {
            score: SUSPICION_BASELINE,
            threats: Vec::new(),
            reason: format!("unknown classification label '{other}'"),
        },
    })
}

/// A low-confidence "safe" inverts to a high number; clamp it down so label
/// noise cannot masquerade as a confident detection.
fn clamp_benign(benign: f64) -> f64 {
    if benign > 0.8 {
        0.1
    } else if benign > 0.6 {
        0.3
    } else {
        benign
    }
}

fn score_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"SCORE:([0-9]*\.?[0-9]+)").unwrap())
}

fn threats_re() -> &'static Regex {
    // Non-greedy up to REASON: so a reason starting with a capital R cannot
    // truncate the threat list.
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"THREATS:(.*?)(?:\s*REASON:|$)").unwrap())
}

fn reason_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)REASON:(.+)$").unwrap())
}

fn normalize_generative(reply: &str) -> Analysis {
    let reply = reply.trim();

    let score = score_re()
        .captures(reply)
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .unwrap_or(UNPARSED_SCORE);

    let threats = threats_re()
        .captures(reply)
        .map(|caps| parse_threat_list(&caps[1]))
        .unwrap_or_default();

    let reason = reason_re()
        .captures(reply)
        .map(|caps| caps[1].trim().to_string())
        .unwrap_or_else(|| "Unable to parse LLM response".to_string());

    Analysis {
        score,
        threats,
        reason,
    }
}

fn parse_threat_list(raw: &str) -> Vec<ThreatType> {
    let mut threats = Vec::new();
    for token in raw.split(',') {
        let mapped = match token.trim().to_lowercase().as_str() {
            "jailbreak" => Some(ThreatType::Jailbreak),
            "system_leak" | "system_prompt_leak" => Some(ThreatType::SystemPromptLeak),
            "data_extraction" => Some(ThreatType::DataExtraction),
            "injection" => Some(ThreatType::Injection),
            "encoding_attack" => Some(ThreatType::EncodingAttack),
            "delimiter_attack" => Some(ThreatType::DelimiterAttack),
            _ => None,
        };
        if let Some(threat) = mapped {
            if !threats.contains(&threat) {
                threats.push(threat);
            }
        }
    }
    threats
}
