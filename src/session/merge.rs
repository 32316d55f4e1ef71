/// Combine the text that was in the field when recording started with the
/// streamed transcript.
///
/// Each partial is a full replacement of the spoken-so-far transcript, so
/// the merge is a plain append to the fixed baseline. Failures never reach
/// this function; an error leaves the baseline untouched.
pub fn merge_transcript(baseline: &str, spoken: &str) -> String {
    format!("{}{}", baseline, spoken)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_spoken_text_to_baseline() {
        assert_eq!(merge_transcript("foo ", "bar"), "foo bar");
    }

    #[test]
    fn later_partials_replace_not_accumulate() {
        let baseline = "foo ";
        assert_eq!(merge_transcript(baseline, "bar"), "foo bar");
        assert_eq!(merge_transcript(baseline, "bar baz"), "foo bar baz");
        assert_eq!(merge_transcript(baseline, "bar baz!"), "foo bar baz!");
    }

    #[test]
    fn empty_baseline() {
        assert_eq!(merge_transcript("", "hello"), "hello");
    }

    #[test]
    fn empty_transcript_keeps_baseline() {
        assert_eq!(merge_transcript("typed", ""), "typed");
    }
}
