//! Parsing of one model turn in the Thought/Action/Action Input format.

use std::sync::OnceLock;

use regex::Regex;

/// What the model decided to do this turn.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentDecision {
    Final {
        answer: String,
    },
    ToolCall {
        thought: Option<String>,
        tool: String,
        input: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseFailure {
    /// Observation text fed back so the model can correct itself.
    pub feedback: String,
}

fn action_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*Action\s*:\s*(.+?)\s*$").expect("static regex")
    })
}

fn action_input_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?ms)^\s*Action Input\s*:\s*(.*?)\s*(?:^\s*Observation\s*:|\z)")
            .expect("static regex")
    })
}

fn thought_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?ms)^\s*Thought\s*:\s*(.*?)\s*(?:^\s*Action\s*:|^\s*Final Answer\s*:|\z)")
            .expect("static regex")
    })
}

/// Parse a model turn. "Final Answer:" wins over any action text; a turn
/// with neither a final answer nor a complete action is a failure whose
/// feedback goes back to the model as an observation.
pub fn parse_decision(text: &str) -> Result<AgentDecision, ParseFailure> {
    if let Some(position) = text.find("Final Answer:") {
        let answer = text[position + "Final Answer:".len()..].trim();
        if !answer.is_empty() {
            return Ok(AgentDecision::Final {
                answer: answer.to_string(),
            });
        }
        return Err(ParseFailure {
            feedback: "Your 'Final Answer:' was empty. Provide the answer after 'Final Answer:'."
                .to_string(),
        });
    }

    let thought = thought_regex()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty());

    let Some(tool) = action_regex()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
    else {
        return Err(ParseFailure {
            feedback: "Could not parse your response. Reply with either 'Final Answer: <answer>' \
                       or 'Action: <tool>' followed by 'Action Input: <input>'."
                .to_string(),
        });
    };

    let Some(input) = action_input_regex()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
    else {
        return Err(ParseFailure {
            feedback: format!(
                "You chose Action: {} but gave no 'Action Input:'. Repeat the action with its \
                 input.",
                tool
            ),
        });
    };

    Ok(AgentDecision::ToolCall {
        thought,
        tool,
        input,
    })
}
