use pipesh::lexer::tokenize;
use pipesh::{ParsedCommand, Stage};
use proptest::prelude::*;

fn plain_word() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_./=-]{1,8}"
}

proptest! {
    #[test]
    fn parsing_is_a_pure_function_of_the_text(line in "[ a-z|<>&\"]{0,40}") {
        prop_assert_eq!(ParsedCommand::parse(&line), ParsedCommand::parse(&line));
    }

    #[test]
    fn plain_words_make_one_stage(words in prop::collection::vec(plain_word(), 1..6)) {
        let line = words.join(" ");
        let parsed = ParsedCommand::parse(&line);

        prop_assert_eq!(parsed.stages, vec![Stage::new(words.clone())]);
        prop_assert!(parsed.input.is_none());
        prop_assert!(parsed.output.is_none());
        prop_assert!(!parsed.background);
        prop_assert_eq!(tokenize(&line).unwrap(), words);
    }

    #[test]
    fn quoted_spans_survive_as_single_tokens(inner in "[a-z |<>&]{1,12}") {
        let line = format!("echo \"{}\"", inner);
        let parsed = ParsedCommand::parse(&line);
        prop_assert_eq!(parsed.validate(), Ok(()));
        prop_assert_eq!(parsed.stages.len(), 1);
        prop_assert_eq!(parsed.stages[0].args(), &["echo".to_string(), inner][..]);
    }
}
