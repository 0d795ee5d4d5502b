use crate::agent::parser::ToolCall;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};

/// One completed tool round: what the model asked for, the text it wrote to
/// ask for it, and what it got back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub call: ToolCall,
    pub log: String,
    pub observation: String,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Action: {}\nAction Input: {}\nObservation: {}",
            self.call.name, self.call.argument, self.observation
        )
    }
}

/// Replays prior steps the way the model wrote them, each followed by its
/// observation and a fresh `Thought:` cue.
pub fn render_scratchpad(steps: &[Step]) -> String {
    let mut scratchpad = String::new();
    for step in steps {
        scratchpad.push_str(step.log.trim_end());
        let _ = write!(
            scratchpad,
            "\nObservation: {}\nThought: ",
            step.observation
        );
    }
    scratchpad
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(log: &str, name: &str, argument: &str, observation: &str) -> Step {
        Step {
            call: ToolCall::new(name, argument),
            log: log.to_string(),
            observation: observation.to_string(),
        }
    }

    #[test]
    fn empty_scratchpad() {
        assert_eq!(render_scratchpad(&[]), "");
    }

    #[test]
    fn scratchpad_replays_logs_and_observations() {
        let steps = vec![
            step(
                "I need the link.\nAction: Academic_Search\nAction Input: attention\n",
                "Academic_Search",
                "attention",
                "[{\"title\":\"Attention Is All You Need\"}]",
            ),
            step(
                "Now read it.\nAction: Content_Reader\nAction Input: https://arxiv.org/abs/1706.03762",
                "Content_Reader",
                "https://arxiv.org/abs/1706.03762",
                "The paper discusses...",
            ),
        ];

        assert_eq!(
            render_scratchpad(&steps),
            "I need the link.\nAction: Academic_Search\nAction Input: attention\
             \nObservation: [{\"title\":\"Attention Is All You Need\"}]\nThought: \
             Now read it.\nAction: Content_Reader\nAction Input: https://arxiv.org/abs/1706.03762\
             \nObservation: The paper discusses...\nThought: "
        );
    }

    #[test]
    fn display_is_readable() {
        let s = step("", "Web_Search", "rust", "results");
        assert_eq!(
            s.to_string(),
            "Action: Web_Search\nAction Input: rust\nObservation: results"
        );
    }
}
