//! Prompt templates for the three one-shot insight tasks.
//!
//! Builders are pure: input data is serialized verbatim into the user message
//! and nothing is truncated here. Bounding input size is the sampler's job.

use crate::llm::ChatMessage;
use crate::types::PolicyRecord;

/// A system/user message pair ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn into_messages(self) -> Vec<ChatMessage> {
        vec![ChatMessage::system(self.system), ChatMessage::user(self.user)]
    }
}

const SUMMARY_SYSTEM: &str = "You are a helpful assistant that summarizes text efficiently.";
const ANALYSIS_SYSTEM: &str = "You are a data analyst extracting concerns from complaints.";
const POLICY_SYSTEM: &str = "You are a policy maker that suggests policies efficiently.";

pub fn build_summary_prompt(titles: &[String]) -> Prompt {
    Prompt {
        system: SUMMARY_SYSTEM.to_string(),
        user: format!(
            "Summarize the following gig worker complaints in about 200 words. \
             Keep the tone neutral and make sure the summary does not contain anyone's name.\n\n\
             Complaints:\n{}",
            to_json(titles)
        ),
    }
}

pub fn build_analysis_prompt(titles: &[String]) -> Prompt {
    Prompt {
        system: ANALYSIS_SYSTEM.to_string(),
        user: format!(
            "Analyze the following gig worker complaints and identify exactly 5 major concerns.\n\
             Group complaints that share similar issues and provide an accurate count of how many \
             complaints fall under each concern.\n\
             Respond with a valid JSON array and nothing else, where each item has:\n\
             - \"concern\": a brief description of the issue.\n\
             - \"count\": the number of complaints associated with this concern.\n\n\
             Complaints data:\n{}",
            to_json(titles)
        ),
    }
}

pub fn build_policy_suggestion_prompt(policies: &[PolicyRecord]) -> Prompt {
    Prompt {
        system: POLICY_SYSTEM.to_string(),
        user: format!(
            "Based on the given historical policies, suggest good policies for the betterment \
             of cab drivers.\n\
             Respond with a valid JSON object with the following property:\n\
             - \"suggestions\": list of policies as an array of strings (at least 5 items).\n\n\
             Past policies:\n{}",
            to_json(policies)
        ),
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    // Serializing strings and JSON values cannot fail
    serde_json::to_string(value).unwrap_or_default()
}
