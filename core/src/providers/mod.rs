pub mod factory;
pub mod huggingface;
pub mod openai;

pub use factory::create_provider;
pub use huggingface::HuggingFaceProvider;
pub use openai::OpenAIProvider;

/// Cuts a generation at the earliest stop sequence, mirroring what the
/// hosted endpoints do server-side when they honour `stop`.
pub fn trim_at_stop_sequences(text: &str, stop: &[String]) -> String {
    let cut = stop
        .iter()
        .filter(|s| !s.is_empty())
        .filter_map(|s| text.find(s.as_str()))
        .min()
        .unwrap_or(text.len());
    text[..cut].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stops(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn cuts_at_earliest_stop() {
        let text = "Action: Web_Search\nAction Input: rust\nObservation: made up\nNote: x";
        assert_eq!(
            trim_at_stop_sequences(text, &stops(&["Note:", "\nObservation"])),
            "Action: Web_Search\nAction Input: rust"
        );
    }

    #[test]
    fn untouched_without_match() {
        assert_eq!(
            trim_at_stop_sequences("Final Answer: 42", &stops(&["Observation:", ""])),
            "Final Answer: 42"
        );
        assert_eq!(trim_at_stop_sequences("abc", &[]), "abc");
    }
}
