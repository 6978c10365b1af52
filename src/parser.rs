//! Indentation-based configuration parser.
//!
//! Turns flat device-configuration text into an ordered sequence of
//! [`ConfigBlock`]s. A line whose first character is not whitespace opens a
//! new block; indented lines belong to the block above them. Every line is
//! passed through the [`Redactor`] before it is stored.
//!
//! Blank lines and `!` comment lines are skipped entirely: they neither
//! close nor extend a block, so a comment embedded inside an indented
//! stanza does not split it. That behavior is load-bearing for block
//! identity and is covered by tests.

use crate::models::ConfigBlock;
use crate::redact::Redactor;

/// Parse configuration text into redacted blocks, in source order.
///
/// Indented lines before the first header have no block to join and are
/// dropped. A file containing only blanks and comments yields no blocks.
/// `line_start`/`line_end` are zero-based source indices of the first and
/// last stored line of the block, both inclusive.
pub fn parse_blocks(text: &str, redactor: &Redactor) -> Vec<ConfigBlock> {
    let mut blocks = Vec::new();
    let mut current_parent: Option<String> = None;
    let mut current_lines: Vec<String> = Vec::new();
    let mut block_start = 0usize;
    let mut block_end = 0usize;
    let mut block_has_secret = false;

    for (i, line) in text.lines().enumerate() {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('!') {
            continue;
        }

        let (safe_line, found_secret) = redactor.redact_line(line);
        let is_body = line.starts_with(' ') || line.starts_with('\t');

        if !is_body {
            if let Some(parent) = current_parent.take() {
                blocks.push(make_block(
                    parent,
                    &current_lines,
                    block_start,
                    block_end,
                    block_has_secret,
                ));
            }
            current_parent = Some(safe_line.clone());
            current_lines = vec![safe_line];
            block_start = i;
            block_end = i;
            block_has_secret = found_secret;
        } else if current_parent.is_some() {
            current_lines.push(safe_line);
            block_end = i;
            block_has_secret |= found_secret;
        }
    }

    if let Some(parent) = current_parent {
        blocks.push(make_block(
            parent,
            &current_lines,
            block_start,
            block_end,
            block_has_secret,
        ));
    }

    blocks
}

fn make_block(
    parent: String,
    lines: &[String],
    start: usize,
    end: usize,
    has_secret: bool,
) -> ConfigBlock {
    let header_type = parent
        .split_whitespace()
        .next()
        .unwrap_or("global")
        .to_string();

    ConfigBlock {
        full_text: lines.join("\n"),
        body_lines: lines[1..].to_vec(),
        parent_line: parent,
        header_type,
        line_start: start,
        line_end: end,
        has_secret,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
hostname Switch-Core
!
vlan 10
 name Sales
vlan 20
 name Engineering
!
interface GigabitEthernet1/0/1
 description Uplink to Router
 switchport mode trunk
!
router ospf 1
 network 10.0.0.0 0.0.0.255 area 0
";

    fn parse(text: &str) -> Vec<ConfigBlock> {
        parse_blocks(text, &Redactor::new())
    }

    #[test]
    fn test_blocks_split_on_headers() {
        let blocks = parse(SAMPLE);
        let parents: Vec<&str> = blocks.iter().map(|b| b.parent_line.as_str()).collect();
        assert_eq!(
            parents,
            vec![
                "hostname Switch-Core",
                "vlan 10",
                "vlan 20",
                "interface GigabitEthernet1/0/1",
                "router ospf 1",
            ]
        );
    }

    #[test]
    fn test_header_type_is_first_token() {
        let blocks = parse(SAMPLE);
        let types: Vec<&str> = blocks.iter().map(|b| b.header_type.as_str()).collect();
        assert_eq!(types, vec!["hostname", "vlan", "vlan", "interface", "router"]);
    }

    #[test]
    fn test_body_lines_keep_indentation() {
        let blocks = parse(SAMPLE);
        assert_eq!(blocks[1].body_lines, vec![" name Sales"]);
        assert_eq!(
            blocks[3].body_lines,
            vec![" description Uplink to Router", " switchport mode trunk"]
        );
        assert_eq!(blocks[3].full_text, "interface GigabitEthernet1/0/1\n description Uplink to Router\n switchport mode trunk");
    }

    #[test]
    fn test_line_spans_inclusive() {
        let blocks = parse(SAMPLE);
        let spans: Vec<(usize, usize)> =
            blocks.iter().map(|b| (b.line_start, b.line_end)).collect();
        assert_eq!(spans, vec![(0, 0), (2, 3), (4, 5), (7, 9), (11, 12)]);
    }

    #[test]
    fn test_comment_inside_stanza_does_not_split() {
        // Skipped lines neither close nor extend a block, so the stanza
        // continues across the comment line.
        let text = "interface Gi1\n description up\n! maintenance note\n shutdown\n";
        let blocks = parse(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].body_lines, vec![" description up", " shutdown"]);
        assert_eq!((blocks[0].line_start, blocks[0].line_end), (0, 3));
    }

    #[test]
    fn test_blank_line_inside_stanza_does_not_split() {
        let text = "vlan 10\n name Sales\n\n mtu 1500\n";
        let blocks = parse(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].body_lines, vec![" name Sales", " mtu 1500"]);
    }

    #[test]
    fn test_comment_only_input_yields_no_blocks() {
        assert!(parse("! header banner\n!\n\n!\n").is_empty());
        assert!(parse("").is_empty());
    }

    #[test]
    fn test_leading_indented_lines_dropped() {
        // A body line with no governing header has no block to join.
        let text = " orphan setting\nhostname X\n";
        let blocks = parse(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].parent_line, "hostname X");
        assert_eq!((blocks[0].line_start, blocks[0].line_end), (1, 1));
    }

    #[test]
    fn test_secret_flag_per_block() {
        let text = "line vty 0 4\n password 7 045802150C2E\n login\nvlan 10\n name Sales\n";
        let blocks = parse(text);
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].has_secret);
        assert_eq!(blocks[0].body_lines[0], " password 7 [REDACTED]");
        assert!(!blocks[1].has_secret);
    }

    #[test]
    fn test_parse_is_deterministic() {
        let a = parse(SAMPLE);
        let b = parse(SAMPLE);
        assert_eq!(a, b);
    }

    #[test]
    fn test_block_coverage_of_non_skipped_lines() {
        // Every non-blank, non-comment source line lands in exactly one
        // block span, and stored line counts add up to the same total.
        let blocks = parse(SAMPLE);
        let mut stored_lines = 0usize;
        for (i, line) in SAMPLE.lines().enumerate() {
            let stripped = line.trim();
            if stripped.is_empty() || stripped.starts_with('!') {
                continue;
            }
            stored_lines += 1;
            let covering = blocks
                .iter()
                .filter(|b| b.line_start <= i && i <= b.line_end)
                .count();
            assert_eq!(covering, 1, "line {i} covered by {covering} blocks");
        }
        let total: usize = blocks.iter().map(|b| 1 + b.body_lines.len()).sum();
        assert_eq!(total, stored_lines);
    }

    #[test]
    fn test_line_start_strictly_increasing() {
        let blocks = parse(SAMPLE);
        for pair in blocks.windows(2) {
            assert!(pair[0].line_start < pair[1].line_start);
            assert!(pair[0].line_end < pair[1].line_start);
        }
    }
}
