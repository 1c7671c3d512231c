//! Variable buffer
//!
//! Word splits what looks like one piece of text into several runs as soon
//! as formatting, spell-check marks or revision ids differ, so a variable
//! such as `[name]` frequently arrives as `[na` ... markup ... `me]`. The
//! buffer holds tokens back from the first opening delimiter until a closing
//! delimiter shows up, then matches the concatenated run text against the
//! dictionary as a whole.
//!
//! Only text inside a text run (`w:t`) can open a candidate. On a match every
//! held token is replaced by a single text token carrying the substituted
//! text, provided the held span closes exactly the elements it reopens;
//! otherwise dropping it would unbalance the document. Without a match the
//! held tokens are released untouched, so the output stays structurally
//! identical to the input.

use crate::config::FillConfig;
use crate::error::FillResult;
use crate::token::{QName, Token};
use crate::xml_io::TokenSink;
use tracing::debug;

/// Counters collected while transcoding one part
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranscodeStats {
    /// Tokens read from the source part
    pub tokens: usize,
    /// Variables replaced with a dictionary value
    pub substitutions: usize,
    /// Delimited candidates that matched no key
    pub unmatched_candidates: usize,
    /// Flushes forced because the buffer reached its capacity
    pub forced_flushes: usize,
    /// Matches left in place because the span crossed element boundaries
    pub unbalanced_spans: usize,
    /// Tokens still held when the part ended
    pub unterminated_tokens: usize,
}

#[derive(Debug)]
struct Held {
    token: Token,
    /// Unescaped text, kept only for text captured inside a text run
    run_text: Option<String>,
}

/// Bounded queue of withheld tokens plus the matching protocol
pub struct VariableBuffer<'c> {
    config: &'c FillConfig,
    text_run: QName,
    held: Vec<Held>,
    in_text_run: bool,
    stats: TranscodeStats,
}

impl<'c> VariableBuffer<'c> {
    pub fn new(config: &'c FillConfig) -> Self {
        Self {
            config,
            text_run: QName::parse(&config.text_run_element),
            held: Vec::with_capacity(config.buffer_capacity),
            in_text_run: false,
            stats: TranscodeStats::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.held.len() >= self.config.buffer_capacity
    }

    /// Route one token: hold it, release it, or resolve the pending candidate
    pub fn push<S: TokenSink>(&mut self, token: Token, sink: &mut S) -> FillResult<()> {
        self.stats.tokens += 1;
        self.track_text_run(&token);

        let text = match token.unescaped_text() {
            Some(text) => Some(text?.into_owned()),
            None => None,
        };
        let delimiters = self.config.delimiters;

        if self.held.is_empty() {
            let Some(text) = text.filter(|_| self.in_text_run) else {
                return sink.emit(token);
            };
            let Some(open) = text.find(delimiters.opening) else {
                return sink.emit(token);
            };
            let closes = text[open + delimiters.opening.len_utf8()..].contains(delimiters.closing);
            self.hold(token, text);
            if closes {
                self.process(sink)?;
            }
            return Ok(());
        }

        match text {
            Some(text) => {
                let closes = text.contains(delimiters.closing);
                self.hold(token, text);
                if closes {
                    self.process(sink)?;
                }
            }
            None => self.held.push(Held {
                token,
                run_text: None,
            }),
        }
        Ok(())
    }

    /// Release every held token unchanged
    pub fn flush<S: TokenSink>(&mut self, sink: &mut S) -> FillResult<()> {
        for held in self.held.drain(..) {
            sink.emit(held.token)?;
        }
        Ok(())
    }

    /// Give up on the pending candidate because the buffer is full
    pub fn force_flush<S: TokenSink>(&mut self, sink: &mut S) -> FillResult<()> {
        self.stats.forced_flushes += 1;
        self.flush(sink)
    }

    /// Release whatever is still held once the part has ended
    pub fn finish<S: TokenSink>(&mut self, sink: &mut S) -> FillResult<TranscodeStats> {
        self.stats.unterminated_tokens += self.held.len();
        self.flush(sink)?;
        Ok(self.stats)
    }

    fn track_text_run(&mut self, token: &Token) {
        match token {
            Token::Start(tag) if tag.name == self.text_run && !tag.self_closing => {
                self.in_text_run = true;
            }
            Token::End(name) if *name == self.text_run => {
                self.in_text_run = false;
            }
            _ => {}
        }
    }

    fn hold(&mut self, token: Token, text: String) {
        let run_text = self.in_text_run.then_some(text);
        self.held.push(Held { token, run_text });
    }

    /// Whether the held span closes exactly the elements it opens again,
    /// innermost first, so the first and last held text share a parent chain
    fn is_balanced(&self) -> bool {
        let mut closed: Vec<&QName> = Vec::new();
        let mut opened: Vec<&QName> = Vec::new();
        for held in &self.held {
            match &held.token {
                Token::Start(tag) if !tag.self_closing => opened.push(&tag.name),
                Token::End(name) => {
                    if opened.pop().is_none() {
                        closed.push(name);
                    }
                }
                _ => {}
            }
        }
        closed.len() == opened.len() && closed.iter().rev().eq(opened.iter())
    }

    /// Match the held run text against the dictionary
    fn process<S: TokenSink>(&mut self, sink: &mut S) -> FillResult<()> {
        let candidate: String = self
            .held
            .iter()
            .filter_map(|held| held.run_text.as_deref())
            .collect();

        match self.config.dictionary.find_in(&candidate) {
            Some((key, _)) if !self.is_balanced() => {
                debug!(key, tokens = self.held.len(), "variable spans element boundaries, leaving it");
                self.stats.unbalanced_spans += 1;
                self.flush(sink)
            }
            Some((key, value)) => {
                debug!(key, tokens = self.held.len(), "substituting variable");
                let replaced = candidate.replacen(key, value, 1);
                self.stats.substitutions += 1;
                self.held.clear();
                sink.emit(Token::text(&replaced))
            }
            None => {
                debug!(candidate = %candidate, "no dictionary key in candidate");
                self.stats.unmatched_candidates += 1;
                self.flush(sink)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Dictionary;
    use crate::token::StartTag;

    fn config() -> FillConfig {
        let dict: Dictionary = [
            ("[simple]", "SiMPlE"),
            ("[with_color]", "WiTh CoLoR"),
        ]
        .into_iter()
        .collect();
        FillConfig::new(dict)
    }

    fn start(local: &str) -> Token {
        Token::Start(StartTag::new(QName::new("w", local)))
    }

    fn end(local: &str) -> Token {
        Token::End(QName::new("w", local))
    }

    fn text(content: &str) -> Token {
        Token::text(content)
    }

    fn run(content: &str) -> Vec<Token> {
        vec![start("r"), start("t"), text(content), end("t"), end("r")]
    }

    fn feed(config: &FillConfig, tokens: Vec<Token>) -> (Vec<Token>, TranscodeStats) {
        let mut buffer = VariableBuffer::new(config);
        let mut out = Vec::new();
        for token in tokens {
            if buffer.is_full() {
                buffer.force_flush(&mut out).unwrap();
            }
            buffer.push(token, &mut out).unwrap();
        }
        let stats = buffer.finish(&mut out).unwrap();
        (out, stats)
    }

    #[test]
    fn test_plain_tokens_pass_straight_through() {
        let config = config();
        let mut buffer = VariableBuffer::new(&config);
        let mut out = Vec::new();

        buffer.push(start("p"), &mut out).unwrap();
        buffer.push(text("no variables"), &mut out).unwrap();

        assert!(buffer.is_empty());
        assert_eq!(out, vec![start("p"), text("no variables")]);
    }

    #[test]
    fn test_self_contained_variable() {
        let config = config();
        let (out, stats) = feed(&config, run("Dear [simple],"));

        assert_eq!(out, run("Dear SiMPlE,"));
        assert_eq!(stats.substitutions, 1);
        assert_eq!(stats.unterminated_tokens, 0);
    }

    #[test]
    fn test_split_variable_replaces_whole_span() {
        let config = config();
        let mut tokens = vec![start("p")];
        tokens.extend(run("Hello [wi"));
        tokens.extend([
            start("r"),
            start("rPr"),
            Token::Start(StartTag::new(QName::new("w", "color")).self_closing()),
            end("rPr"),
            start("t"),
            text("th_color]!"),
            end("t"),
            end("r"),
        ]);
        tokens.push(end("p"));

        let (out, stats) = feed(&config, tokens);

        let mut expected = vec![start("p")];
        expected.extend(run("Hello WiTh CoLoR!"));
        expected.push(end("p"));
        assert_eq!(out, expected);
        assert_eq!(stats.substitutions, 1);
    }

    #[test]
    fn test_unmatched_candidate_is_released_unchanged() {
        let config = config();
        let mut tokens = run("[unk");
        tokens.extend(run("nown]"));

        let (out, stats) = feed(&config, tokens.clone());

        assert_eq!(out, tokens);
        assert_eq!(stats.unmatched_candidates, 1);
        assert_eq!(stats.substitutions, 0);
    }

    #[test]
    fn test_text_outside_runs_is_not_part_of_candidate() {
        let config = config();
        let mut tokens = run("[sim");
        // Whitespace between runs sits outside w:t
        tokens.push(text("\n  "));
        tokens.extend(run("ple]"));

        let (out, _) = feed(&config, tokens);

        assert_eq!(out, run("SiMPlE"));
    }

    #[test]
    fn test_deleted_text_does_not_open_a_candidate() {
        let config = config();
        let mut tokens = vec![start("del"), start("r"), start("delText"), text("[old")];
        tokens.extend([end("delText"), end("r"), end("del")]);
        let mut expected = tokens.clone();
        tokens.extend(run("[simple]"));
        expected.extend(run("SiMPlE"));

        let (out, stats) = feed(&config, tokens);

        assert_eq!(out, expected);
        assert_eq!(stats.substitutions, 1);
    }

    #[test]
    fn test_variable_crossing_into_hyperlink_is_left_unchanged() {
        let config = config();
        let mut tokens = run("[sim");
        tokens.push(start("hyperlink"));
        tokens.extend(run("ple]"));
        tokens.push(end("hyperlink"));

        let (out, stats) = feed(&config, tokens.clone());

        assert_eq!(out, tokens);
        assert_eq!(stats.substitutions, 0);
        assert_eq!(stats.unbalanced_spans, 1);
    }

    #[test]
    fn test_variable_leaving_hyperlink_is_left_unchanged() {
        let config = config();
        let mut tokens = vec![start("hyperlink")];
        tokens.extend(run("[sim"));
        tokens.push(end("hyperlink"));
        tokens.extend(run("ple]"));

        let (out, stats) = feed(&config, tokens.clone());

        assert_eq!(out, tokens);
        assert_eq!(stats.unbalanced_spans, 1);
    }

    #[test]
    fn test_variable_across_sibling_insertions_is_replaced() {
        let config = config();
        let mut tokens = vec![start("ins")];
        tokens.extend(run("[sim"));
        tokens.extend([end("ins"), start("ins")]);
        tokens.extend(run("ple]"));
        tokens.push(end("ins"));

        let (out, stats) = feed(&config, tokens);

        let mut expected = vec![start("ins")];
        expected.extend(run("SiMPlE"));
        expected.push(end("ins"));
        assert_eq!(out, expected);
        assert_eq!(stats.substitutions, 1);
    }

    #[test]
    fn test_closing_before_opening_keeps_buffering() {
        let config = config();
        let mut tokens = run("a] b [sim");
        tokens.extend(run("ple]"));

        let (out, stats) = feed(&config, tokens);

        assert_eq!(out, run("a] b SiMPlE"));
        assert_eq!(stats.substitutions, 1);
    }

    #[test]
    fn test_unterminated_variable_is_flushed_at_end() {
        let config = config();
        let mut tokens = run("[never closed");
        tokens.extend(run("more text"));

        let (out, stats) = feed(&config, tokens.clone());

        assert_eq!(out, tokens);
        assert_eq!(stats.unterminated_tokens, 8);
    }

    #[test]
    fn test_capacity_bounds_held_tokens() {
        let config = config().with_buffer_capacity(4);
        let mut tokens = run("[sim");
        tokens.extend(run("ple]"));

        let (out, stats) = feed(&config, tokens.clone());

        // The span is longer than the capacity, so the variable is given up on
        assert_eq!(out, tokens);
        assert!(stats.forced_flushes >= 1);
        assert_eq!(stats.substitutions, 0);
    }

    #[test]
    fn test_custom_delimiters() {
        let dict: Dictionary = [("{name}", "Ada")].into_iter().collect();
        let config = FillConfig::new(dict).with_delimiters('{', '}');

        let (out, _) = feed(&config, run("Hi {name}, [simple]"));

        assert_eq!(out, run("Hi Ada, [simple]"));
    }

    #[test]
    fn test_only_first_occurrence_is_replaced() {
        let config = config();
        let (out, _) = feed(&config, run("[simple] and [simple]"));

        assert_eq!(out, run("SiMPlE and [simple]"));
    }

    #[test]
    fn test_replacement_is_escaped() {
        let dict: Dictionary = [("[co]", "Smith & <Sons>")].into_iter().collect();
        let config = FillConfig::new(dict);

        let (out, _) = feed(&config, run("[co]"));

        assert_eq!(out[2], Token::Text(b"Smith &amp; &lt;Sons&gt;".to_vec()));
    }
}
