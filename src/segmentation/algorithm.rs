use crate::segmentation::config::SegmentationConfig;

/// Greedy line fill: words are appended to the current line until the next
/// word (plus its separating space) would push it past `target_width`
/// characters. Words are never split, so an oversized word sits alone on its
/// own line. Text with no words yields no lines.
pub fn split_into_lines(text: &str, config: &SegmentationConfig) -> Vec<String> {
    let width = config.target_width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        let separator = usize::from(current_len > 0);

        if current_len > 0 && current_len + separator + word_len > width {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if current_len > 0 {
        lines.push(current);
    }

    lines
}

/// Line count used for timing division. Never zero: a body without words is
/// read as one line spanning the whole duration.
pub fn timed_line_count(text: &str, config: &SegmentationConfig) -> usize {
    split_into_lines(text, config).len().max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str, width: usize) -> Vec<String> {
        split_into_lines(text, &SegmentationConfig::with_width(width))
    }

    #[test]
    fn empty_and_blank_text_yield_no_lines() {
        assert!(lines("", 10).is_empty());
        assert!(lines(" \n\t  ", 10).is_empty());
        assert_eq!(timed_line_count("   ", &SegmentationConfig::default()), 1);
    }

    #[test]
    fn fills_greedily_up_to_width() {
        assert_eq!(
            lines("aa bb cc dd", 5),
            vec!["aa bb".to_string(), "cc dd".to_string()]
        );
        assert_eq!(lines("aa bb cc", 4), vec!["aa", "bb", "cc"]);
    }

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(lines("one   two\n\nthree", 80), vec!["one two three"]);
    }

    #[test]
    fn long_word_gets_its_own_line() {
        assert_eq!(
            lines("a incomprehensibilities b", 6),
            vec!["a", "incomprehensibilities", "b"]
        );
    }

    #[test]
    fn width_counts_characters_not_bytes() {
        assert_eq!(lines("héé wöö", 7), vec!["héé wöö"]);
    }

    #[test]
    fn no_line_exceeds_width_unless_single_word() {
        let text = "The quick brown fox jumps over the lazy dog while a \
                    supercalifragilisticexpialidocious parrot watches quietly \
                    from a distant branch of the old oak tree near the river.";
        for width in 1..40 {
            for line in lines(text, width) {
                let fits = line.chars().count() <= width;
                let single_word = !line.contains(' ');
                assert!(fits || single_word, "width {width}: {line:?}");
            }
        }
    }

    #[test]
    fn resegmenting_joined_lines_is_stable() {
        let text = "Welcome everyone, and thank you for joining today's session \
                    on building calm, confident delivery for short talks.";
        for width in [8, 20, 65] {
            let first = lines(text, width);
            let second = lines(&first.join(" "), width);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn default_width_is_sixty_five() {
        let text = "word ".repeat(40);
        let result = split_into_lines(&text, &SegmentationConfig::default());
        assert!(result.iter().all(|line| line.chars().count() <= 65));
        assert_eq!(result.len(), 4);
    }
}
