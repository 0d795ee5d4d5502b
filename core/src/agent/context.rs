use crate::agent::transcript::{Step, render_scratchpad};
use crate::traits::{ChatMessage, ToolInput, ToolSpec};
use std::fmt::Write;

const EXAMPLE_WORKFLOW: &str = "\
Question: Read the paper \"Attention Is All You Need\"
Thought: I need to find the link first.
Action: Academic_Search
Action Input: Attention Is All You Need
Observation: [{'title': 'Attention Is All You Need', 'link': 'https://arxiv.org/abs/1706.03762'}]
Thought: I found the paper. Now I will use the LINK to read it.
Action: Content_Reader
Action Input: https://arxiv.org/abs/1706.03762
Observation: The paper discusses...
Final Answer: The paper proposes the Transformer model...";

/// Renders the two messages sent on every turn: fixed instructions listing
/// the tools, and the question followed by the scratchpad so far.
pub struct ContextBuilder {
    pub tool_specs: Vec<ToolSpec>,
}

impl ContextBuilder {
    pub fn new(tool_specs: Vec<ToolSpec>) -> Self {
        Self { tool_specs }
    }

    pub fn build_system_prompt(&self) -> String {
        let names: Vec<&str> = self.tool_specs.iter().map(|t| t.name.as_str()).collect();

        let mut prompt = String::new();
        prompt.push_str("You are a helpful research assistant.\n");
        let _ = writeln!(prompt, "You have access to: {}\n", names.join(", "));

        for tool in &self.tool_specs {
            let _ = writeln!(prompt, "- {}: {}", tool.name, tool.description);
        }

        prompt.push_str(
            "\nFORMAT INSTRUCTIONS:\n\
             --------------------\n\
             You MUST use this format:\n\n\
             Thought: Do I need to use a tool? Yes\n\
             Action: [Tool Name]\n\
             Action Input: [Input]\n\
             (STOP HERE! Wait for Observation)\n\n\
             When you know the answer:\n\n\
             Thought: I now know the final answer\n\
             Final Answer: [your answer]\n\n",
        );

        prompt.push_str("EXAMPLE WORKFLOW (Follow this pattern):\n");
        prompt.push_str("---------------------------------------\n");
        prompt.push_str(EXAMPLE_WORKFLOW);
        prompt.push_str("\n---------------------------------------\n\n");

        prompt.push_str("CRITICAL RULES:\n");
        prompt.push_str("1. 'Action Input:' must be on a NEW LINE.\n");
        let url_tools: Vec<&str> = self
            .tool_specs
            .iter()
            .filter(|t| t.input == ToolInput::Url)
            .map(|t| t.name.as_str())
            .collect();
        if !url_tools.is_empty() {
            let _ = writeln!(
                prompt,
                "2. If using {}, Input MUST be a URL (starting with http), NOT a title.",
                url_tools.join(" or ")
            );
            prompt.push_str("3. NEVER use JSON.\n");
        } else {
            prompt.push_str("2. NEVER use JSON.\n");
        }

        prompt
    }

    pub fn build_human_prompt(&self, question: &str, steps: &[Step]) -> String {
        format!("Question: {}\nThought: {}", question, render_scratchpad(steps))
    }

    pub fn build_messages(&self, question: &str, steps: &[Step]) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.build_system_prompt()),
            ChatMessage::user(self.build_human_prompt(question, steps)),
        ]
    }
}
