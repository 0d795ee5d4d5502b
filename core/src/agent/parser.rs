//! Classifies one raw model turn written in the
//! `Thought / Action / Action Input / Final Answer` format.
//!
//! Small instruction-tuned models drift from this format constantly: they
//! write their own `Observation:` lines, wrap arguments in JSON, or put the
//! argument on the action line. Parsing never fails. Anything that cannot be
//! read as a call to a registered tool comes back as a final answer.

use crate::agent::ToolRegistry;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

pub const ACTION_MARKER: &str = "Action:";
pub const ACTION_INPUT_MARKER: &str = "Action Input:";
pub const FINAL_ANSWER_MARKER: &str = "Final Answer:";
pub const OBSERVATION_MARKER: &str = "Observation";

static QUOTED_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#":\s*"([^"]+)""#).expect("quoted value pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub argument: String,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, argument: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            argument: argument.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseResult {
    ToolCall(ToolCall),
    FinalAnswer(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Action(&'a str),
    ActionInput(&'a str),
    Text(&'a str),
}

pub struct ResponseParser {
    tool_names: Vec<String>,
}

impl ResponseParser {
    /// Tool names are tried in the given order, so list the more specific
    /// names (`Web_Search_Tavily`) before the ones they contain (`Web_Search`).
    pub fn new<I, S>(tool_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tool_names: tool_names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn for_registry(registry: &ToolRegistry) -> Self {
        Self::new(registry.names())
    }

    pub fn parse(&self, raw_text: &str) -> ParseResult {
        let text = strip_hallucinated_observation(raw_text.trim());

        if let Some(idx) = text.rfind(FINAL_ANSWER_MARKER) {
            let answer = text[idx + FINAL_ANSWER_MARKER.len()..].trim();
            return ParseResult::FinalAnswer(answer.to_string());
        }

        let tokens = lex(text);

        let Some(action_line) = first_value(&tokens, |t| matches!(t, Token::Action(_))) else {
            return ParseResult::FinalAnswer(raw_text.to_string());
        };

        let Some((name, inline_argument)) = self.resolve_tool(action_line) else {
            return ParseResult::FinalAnswer(raw_text.to_string());
        };

        let argument = inline_argument
            .or_else(|| {
                first_value(&tokens, |t| matches!(t, Token::ActionInput(_)))
                    .map(strip_parenthetical)
                    .filter(|arg| !arg.is_empty())
                    .map(str::to_string)
            })
            .map(normalize_json_argument)
            .unwrap_or_default();

        ParseResult::ToolCall(ToolCall::new(name, strip_quotes(argument.trim()).trim()))
    }

    /// Substring match of the action line against the registered names.
    /// Returns the tool name and whatever else the model wrote on that line.
    fn resolve_tool(&self, action_line: &str) -> Option<(&str, Option<String>)> {
        let name = self
            .tool_names
            .iter()
            .find(|name| action_line.contains(name.as_str()))?;

        let remainder = action_line.replace(name.as_str(), "");
        let remainder = strip_quotes(remainder.trim());

        let inline = (!remainder.is_empty()).then(|| remainder.to_string());

        Some((name.as_str(), inline))
    }
}

/// Cuts the text at the first `Observation` that follows the first
/// `Action Input:`. The model must never predict its own tool result.
pub fn strip_hallucinated_observation(text: &str) -> &str {
    let Some(input_at) = text.find(ACTION_INPUT_MARKER) else {
        return text;
    };
    let after_input = input_at + ACTION_INPUT_MARKER.len();

    match text[after_input..].find(OBSERVATION_MARKER) {
        Some(offset) => &text[..after_input + offset],
        None => text,
    }
}

fn lex(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();

    for line in text.lines() {
        let mut rest = line;
        let mut marked = false;

        while let Some((start, marker)) = find_first_marker(rest) {
            marked = true;
            let value = &rest[start + marker.len()..];
            let end = find_first_marker(value).map_or(value.len(), |(idx, _)| idx);

            let token_value = value[..end].trim();
            tokens.push(if marker == ACTION_MARKER {
                Token::Action(token_value)
            } else {
                Token::ActionInput(token_value)
            });

            rest = &value[end..];
        }

        if !marked && !line.trim().is_empty() {
            tokens.push(Token::Text(line.trim()));
        }
    }

    tokens
}

fn find_first_marker(text: &str) -> Option<(usize, &'static str)> {
    [ACTION_MARKER, ACTION_INPUT_MARKER]
        .into_iter()
        .filter_map(|marker| text.find(marker).map(|idx| (idx, marker)))
        .min_by_key(|(idx, _)| *idx)
}

/// Value of the first token accepted by `wanted`. A marker left empty at the
/// end of its line takes the following plain line as its value.
fn first_value<'a>(tokens: &[Token<'a>], wanted: impl Fn(&Token<'a>) -> bool) -> Option<&'a str> {
    let idx = tokens.iter().position(wanted)?;

    let value = match tokens[idx] {
        Token::Action(v) | Token::ActionInput(v) | Token::Text(v) => v,
    };
    if !value.is_empty() {
        return Some(value);
    }

    match tokens.get(idx + 1) {
        Some(Token::Text(next)) => Some(*next),
        _ => None,
    }
}

fn strip_parenthetical(argument: &str) -> &str {
    argument.split('(').next().unwrap_or_default().trim()
}

fn strip_quotes(text: &str) -> &str {
    text.trim_matches('"').trim_matches('\'')
}

/// Reduces `{"query": "text"}` style arguments to `text`. When no quoted
/// value follows a colon the braces and the `"query":` label are removed
/// and whatever is left is used.
fn normalize_json_argument(argument: String) -> String {
    if !argument.contains('{') {
        return argument;
    }

    if let Some(value) = QUOTED_VALUE.captures(&argument).and_then(|c| c.get(1)) {
        return value.as_str().to_string();
    }

    argument
        .replace('{', "")
        .replace('}', "")
        .replace("\"query\":", "")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOOLS: &[&str] = &[
        "Academic_Search",
        "Web_Search_Tavily",
        "Web_Search",
        "Content_Reader_Tavily",
        "Content_Reader",
    ];

    fn parser() -> ResponseParser {
        ResponseParser::new(TOOLS.iter().copied())
    }

    fn call(name: &str, argument: &str) -> ParseResult {
        ParseResult::ToolCall(ToolCall::new(name, argument))
    }

    fn answer(text: &str) -> ParseResult {
        ParseResult::FinalAnswer(text.to_string())
    }

    #[test]
    fn academic_search_turn() {
        let raw = "Thought: I should look this up.\nAction: Academic_Search\nAction Input: Deep Learning\n";
        assert_eq!(parser().parse(raw), call("Academic_Search", "Deep Learning"));
    }

    #[test]
    fn plain_final_answer() {
        let raw = "Final Answer: The transformer model uses self-attention.";
        assert_eq!(
            parser().parse(raw),
            answer("The transformer model uses self-attention.")
        );
    }

    #[test]
    fn last_final_answer_wins() {
        let raw = "Final Answer: draft\nAction: Web_Search\nAction Input: rust\nFinal Answer:   the real one  \n";
        assert_eq!(parser().parse(raw), answer("the real one"));
    }

    #[test]
    fn final_answer_takes_precedence_over_action() {
        let raw = "Action: Web_Search\nAction Input: rust\nFinal Answer: done";
        assert_eq!(parser().parse(raw), answer("done"));
    }

    #[test]
    fn hallucinated_turns_are_discarded() {
        let parser = ResponseParser::new(["ToolA", "ToolB"]);
        let raw = "Action: ToolA\nAction Input: x\nObservation: fake\nAction: ToolB";
        assert_eq!(parser.parse(raw), call("ToolA", "x"));
    }

    #[test]
    fn final_answer_inside_fake_observation_is_ignored() {
        let raw = "Action: Web_Search\nAction Input: rust\nObservation: made up results\nThought: I know now\nFinal Answer: invented";
        assert_eq!(parser().parse(raw), call("Web_Search", "rust"));
    }

    #[test]
    fn json_query_argument() {
        let raw = "Action: Web_Search\nAction Input: {\"query\": \"text\"}";
        assert_eq!(parser().parse(raw), call("Web_Search", "text"));
    }

    #[test]
    fn json_without_quoted_value_falls_back_to_stripping() {
        let raw = "Action: Web_Search\nAction Input: {\"query\":rust lifetimes}";
        assert_eq!(parser().parse(raw), call("Web_Search", "rust lifetimes"));

        let raw = "Action: Web_Search\nAction Input: {\"query\": }";
        assert_eq!(parser().parse(raw), call("Web_Search", ""));
    }

    #[test]
    fn inline_argument_on_action_line() {
        let raw = "Action: Web_Search \"rust async\"";
        assert_eq!(parser().parse(raw), call("Web_Search", "rust async"));
    }

    #[test]
    fn inline_argument_beats_action_input() {
        let raw = "Action: Web_Search rust\nAction Input: python";
        assert_eq!(parser().parse(raw), call("Web_Search", "rust"));
    }

    #[test]
    fn leftover_brackets_on_action_line_are_the_argument() {
        let raw = "Action: [Academic_Search]\nAction Input: transformers";
        assert_eq!(parser().parse(raw), call("Academic_Search", "[]"));
    }

    #[test]
    fn trailing_parenthetical_is_dropped() {
        let raw = "Action: Content_Reader\nAction Input: https://arxiv.org/abs/1706.03762 (the paper link)";
        assert_eq!(
            parser().parse(raw),
            call("Content_Reader", "https://arxiv.org/abs/1706.03762")
        );
    }

    #[test]
    fn surrounding_quotes_are_removed() {
        let raw = "Action: Academic_Search\nAction Input: 'Deep Learning'";
        assert_eq!(parser().parse(raw), call("Academic_Search", "Deep Learning"));

        let raw = "Action: Academic_Search\nAction Input: \"Deep Learning\" ";
        assert_eq!(parser().parse(raw), call("Academic_Search", "Deep Learning"));
    }

    #[test]
    fn registration_order_breaks_ties() {
        let raw = "Action: Web_Search_Tavily\nAction Input: rust";
        assert_eq!(parser().parse(raw), call("Web_Search_Tavily", "rust"));

        // With the shorter name first it swallows the longer one.
        let parser = ResponseParser::new(["Web_Search", "Web_Search_Tavily"]);
        assert_eq!(parser.parse(raw), call("Web_Search", "_Tavily"));
    }

    #[test]
    fn tool_names_are_case_sensitive() {
        let raw = "Action: web_search\nAction Input: rust";
        assert_eq!(parser().parse(raw), answer(raw));
    }

    #[test]
    fn missing_action_input_gives_empty_argument() {
        let raw = "Thought: search\nAction: Web_Search";
        assert_eq!(parser().parse(raw), call("Web_Search", ""));
    }

    #[test]
    fn action_value_on_following_line() {
        let raw = "Action:\nWeb_Search\nAction Input: rust";
        assert_eq!(parser().parse(raw), call("Web_Search", "rust"));
    }

    #[test]
    fn unknown_tool_falls_back_to_raw_text() {
        let raw = "Action: Calculator\nAction Input: 2 + 2";
        assert_eq!(parser().parse(raw), answer(raw));
    }

    #[test]
    fn markerless_text_is_returned_verbatim() {
        let raw = "  I am not sure what you mean.\n";
        assert_eq!(parser().parse(raw), answer(raw));
        assert_eq!(parser().parse(""), answer(""));
    }

    #[test]
    fn final_answer_text_reparses_to_itself() {
        let raw = "Thought: done\nFinal Answer:  Attention is all you need.  ";
        let ParseResult::FinalAnswer(text) = parser().parse(raw) else {
            panic!("expected a final answer");
        };
        assert_eq!(parser().parse(&text), answer(&text));
    }

    #[test]
    fn guard_keeps_observation_before_action_input() {
        let text = "Observation: earlier\nAction: Web_Search\nAction Input: rust";
        assert_eq!(strip_hallucinated_observation(text), text);
        assert_eq!(strip_hallucinated_observation("no markers"), "no markers");
        assert_eq!(
            strip_hallucinated_observation("Action: A\nAction Input: x\nObservation: y"),
            "Action: A\nAction Input: x\n"
        );
    }

    #[test]
    fn lexer_splits_markers_sharing_a_line() {
        let tokens = lex("Thought: hmm\nAction: Web_Search Action Input: rust");
        assert_eq!(
            tokens,
            vec![
                Token::Text("Thought: hmm"),
                Token::Action("Web_Search"),
                Token::ActionInput("rust"),
            ]
        );
    }
}
