//! Per-move comments from PGN movetext.
//!
//! Produces the rows of a moves table: one [`MoveComment`] per mainline move with the comment
//! that follows it. Variations are skipped and NAGs ignored.

use pgn_reader::{Nag, Outcome, RawComment, Reader, SanPlus, Skip, Visitor};
use std::io;
use std::ops::ControlFlow;

use crate::clock::ClockPattern;
use crate::log;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveComment {
    pub ply: u32,
    pub san: String,
    pub comment: Option<String>,
}

#[derive(Default)]
struct MoveCommentVisitor {
    moves: Vec<MoveComment>,
}

impl MoveCommentVisitor {
    fn attach(&mut self, text: &[u8]) {
        // Comments before the first move have no owner.
        let Some(last) = self.moves.last_mut() else {
            return;
        };

        let text = String::from_utf8_lossy(text);
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        match &mut last.comment {
            Some(existing) => {
                existing.push(' ');
                existing.push_str(text);
            }
            None => last.comment = Some(text.to_string()),
        }
    }
}

impl Visitor for MoveCommentVisitor {
    type Tags = ();
    type Movetext = ();
    type Output = ();

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        self.moves.clear();
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, _tags: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        ControlFlow::Continue(())
    }

    fn san(
        &mut self,
        _movetext: &mut Self::Movetext,
        san_plus: SanPlus,
    ) -> ControlFlow<Self::Output> {
        let ply = self.moves.len() as u32 + 1;
        self.moves.push(MoveComment {
            ply,
            san: san_plus.to_string(),
            comment: None,
        });
        ControlFlow::Continue(())
    }

    fn nag(&mut self, _: &mut Self::Movetext, _: Nag) -> ControlFlow<Self::Output> {
        ControlFlow::Continue(())
    }

    fn comment(
        &mut self,
        _movetext: &mut Self::Movetext,
        comment: RawComment<'_>,
    ) -> ControlFlow<Self::Output> {
        self.attach(comment.as_bytes());
        ControlFlow::Continue(())
    }

    fn partial_comment(
        &mut self,
        _movetext: &mut Self::Movetext,
        comment: RawComment<'_>,
    ) -> ControlFlow<Self::Output> {
        self.attach(comment.as_bytes());
        ControlFlow::Continue(())
    }

    fn begin_variation(&mut self, _: &mut Self::Movetext) -> ControlFlow<Self::Output, Skip> {
        ControlFlow::Continue(Skip(true))
    }

    fn outcome(
        &mut self,
        _movetext: &mut Self::Movetext,
        _outcome: Outcome,
    ) -> ControlFlow<Self::Output> {
        ControlFlow::Continue(())
    }

    fn end_game(&mut self, _movetext: Self::Movetext) -> Self::Output {}
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedMoveComments {
    pub moves: Vec<MoveComment>,
    pub parse_error: bool,
}

/// Like [`move_comments`], but reports whether the reader stopped on malformed movetext.
pub fn parse_move_comments(movetext: &str) -> ParsedMoveComments {
    if movetext.trim().is_empty() {
        return ParsedMoveComments::default();
    }

    let mut reader = Reader::new(io::Cursor::new(movetext.as_bytes()));
    let mut visitor = MoveCommentVisitor::default();

    let parse_error = match reader.read_game(&mut visitor) {
        Ok(Some(())) => false,
        Ok(None) => true,
        Err(e) => {
            log::warn(format!(
                "movetext read stopped after {} move(s): {e}",
                visitor.moves.len()
            ));
            true
        }
    };

    ParsedMoveComments {
        moves: visitor.moves,
        parse_error,
    }
}

/// Mainline moves of `movetext` with their comments.
///
/// Unreadable movetext yields the moves read before the error.
pub fn move_comments(movetext: &str) -> Vec<MoveComment> {
    parse_move_comments(movetext).moves
}

/// JSON array of `{"ply","san","comment","clock"}` objects, `clock` in seconds or `null`.
pub fn move_clocks_json(movetext: &str, pattern: &ClockPattern) -> String {
    let rows: Vec<serde_json::Value> = move_comments(movetext)
        .into_iter()
        .map(|m| {
            let clock = m
                .comment
                .as_deref()
                .and_then(|c| pattern.parse(c))
                .and_then(|c| c.total_seconds());
            serde_json::json!({
                "ply": m.ply,
                "san": m.san,
                "comment": m.comment,
                "clock": clock,
            })
        })
        .collect();

    serde_json::Value::Array(rows).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_comments_lichess() {
        let moves = move_comments(
            "1. d4 { [%eval 0.25] [%clk 1:30:43] } Nf6 { [%eval 0.22] [%clk 1:30:42] } 2. c4",
        );
        assert_eq!(
            moves,
            vec![
                MoveComment {
                    ply: 1,
                    san: "d4".to_string(),
                    comment: Some("[%eval 0.25] [%clk 1:30:43]".to_string()),
                },
                MoveComment {
                    ply: 2,
                    san: "Nf6".to_string(),
                    comment: Some("[%eval 0.22] [%clk 1:30:42]".to_string()),
                },
                MoveComment {
                    ply: 3,
                    san: "c4".to_string(),
                    comment: None,
                },
            ]
        );
    }

    #[test]
    fn test_move_comments_skip_variations_and_nags() {
        let moves = move_comments("1. e4! { best } (1. d4 { alt } d5) e5?? $4 2. Nf3 1-0");
        let sans: Vec<&str> = moves.iter().map(|m| m.san.as_str()).collect();
        assert_eq!(sans, vec!["e4", "e5", "Nf3"]);
        assert_eq!(moves[0].comment.as_deref(), Some("best"));
        assert_eq!(moves[1].comment, None);
    }

    #[test]
    fn test_move_comments_joins_multiple_comments() {
        let moves = move_comments("1. e4 { first } { second } e5");
        assert_eq!(moves[0].comment.as_deref(), Some("first second"));
    }

    #[test]
    fn test_move_comments_leading_comment_ignored() {
        let moves = move_comments("{ opening comment } 1. e4 e5");
        assert_eq!(moves.len(), 2);
        assert!(moves.iter().all(|m| m.comment.is_none()));
    }

    #[test]
    fn test_parse_move_comments_flags_unterminated_comment() {
        let parsed = parse_move_comments("1. e4 { [%clk 0:03:00] } e5 { unterminated");
        assert!(parsed.parse_error);
        let sans: Vec<&str> = parsed.moves.iter().map(|m| m.san.as_str()).collect();
        assert_eq!(sans, vec!["e4", "e5"]);
        assert_eq!(parsed.moves[0].comment.as_deref(), Some("[%clk 0:03:00]"));
    }

    #[test]
    fn test_parse_move_comments_clean_input() {
        let parsed = parse_move_comments("1. e4 e5 2. Nf3 *");
        assert!(!parsed.parse_error);
        assert_eq!(parsed.moves.len(), 3);
        assert_eq!(parse_move_comments(""), ParsedMoveComments::default());
    }

    #[test]
    fn test_move_comments_empty() {
        assert!(move_comments("").is_empty());
        assert!(move_comments("   ").is_empty());
    }

    #[test]
    fn test_move_clocks_json() {
        let json = move_clocks_json(
            "1. e4 { [%clk 0:03:00] } e5 { no clock }",
            &ClockPattern::default(),
        );
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["ply"], 1);
        assert_eq!(parsed[0]["san"], "e4");
        assert_eq!(parsed[0]["clock"], 180.0);
        assert_eq!(parsed[1]["comment"], "no clock");
        assert!(parsed[1]["clock"].is_null());
    }

    #[test]
    fn test_move_clocks_json_empty() {
        assert_eq!(move_clocks_json("", &ClockPattern::default()), "[]");
    }
}
