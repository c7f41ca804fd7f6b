//! Bracketed tag parsing.
//!
//! Character sheets in roleplay system prompts are written as loosely
//! XML-shaped blocks:
//!
//! ```text
//! <system>Stay in character.</system>
//! <Nova>
//! Name: Nova
//! Personality: bold, kind
//! </Nova>
//! <scenario>A quiet harbor town.</scenario>
//! ```
//!
//! This module turns such text into a tree of [`TagBlock`]s with a small
//! stack-based parser. It is deliberately forgiving: unmatched closing tags are
//! ignored, unclosed opening tags are dropped (their already-closed children
//! are kept and re-parented), and nested blocks sharing a label pair up
//! correctly.
//!
//! Grammar (informal):
//! ```text
//! open   = "<" label ">"          label has no '<', '>' or newline,
//! close  = "</" label ">"         does not start with '!' or '?',
//! block  = open (text | block)* close     and does not end with '/'
//! ```

use std::ops::Range;

/// Labels that structure a prompt but never name a character.
const STRUCTURAL_LABELS: &[&str] = &[
    "system",
    "scenario",
    "example_dialogs",
    "roleplay_guidelines",
    "/",
];

/// Markers that identify a block as a character description.
const DESCRIPTOR_KEYWORDS: &[&str] = &[
    "name:",
    "age:",
    "gender:",
    "species:",
    "personality:",
    "appearance:",
    "description:",
    "backstory:",
    "character details",
    "[character",
];

/// Blocks whose trimmed content is longer than this many characters count as
/// substantial even without descriptor keywords.
pub const SUBSTANTIAL_CONTENT_CHARS: usize = 200;

/// Deepest block nesting the parser tracks.
pub const MAX_NESTING: usize = 64;

/// A paired `<label>...</label>` block, borrowing its content from the
/// parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagBlock<'a> {
    /// Trimmed label text shared by the opening and closing tag.
    pub label: String,
    /// Byte range of the whole block, tags included.
    pub span: Range<usize>,
    /// Byte range between the opening and closing tag.
    pub inner_span: Range<usize>,
    /// Raw text between the tags, nested markup included.
    pub content: &'a str,
    /// Blocks nested directly inside this one, in document order.
    pub children: Vec<TagBlock<'a>>,
}

/// How a parsed block relates to character extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// A denylisted structural label (`system`, `scenario`, ...).
    Structural,
    /// A character sheet carrying descriptor keywords.
    DescribedEntity,
    /// A character sheet recognized by its length alone.
    LongEntity,
    /// Too thin to be a character sheet.
    Minor,
}

impl BlockKind {
    pub fn is_entity(self) -> bool {
        matches!(self, BlockKind::DescribedEntity | BlockKind::LongEntity)
    }
}

impl TagBlock<'_> {
    /// Whether the label is one of the structural, non-character labels.
    pub fn is_structural(&self) -> bool {
        is_structural_label(&self.label)
    }

    /// Classify the block as structural, entity, or minor.
    pub fn classify(&self) -> BlockKind {
        if self.is_structural() {
            return BlockKind::Structural;
        }
        let lowered = self.content.to_lowercase();
        if DESCRIPTOR_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            BlockKind::DescribedEntity
        } else if self.content.trim().chars().count() > SUBSTANTIAL_CONTENT_CHARS {
            BlockKind::LongEntity
        } else {
            BlockKind::Minor
        }
    }
}

/// Case-insensitive membership in the structural label denylist.
pub fn is_structural_label(label: &str) -> bool {
    let label = label.trim();
    STRUCTURAL_LABELS.iter().any(|s| s.eq_ignore_ascii_case(label))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open { label: String, start: usize, end: usize },
    Close { label: String, start: usize, end: usize },
}

/// Scan `source` for opening and closing tags, in document order.
///
/// Single pass: after a `<`, the scan stops at the first `<`, `>` or line
/// break, so no byte is examined more than twice.
fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut cursor = 0;

    while let Some(rel) = source[cursor..].find('<') {
        let start = cursor + rel;
        let Some(stop_rel) = source[start + 1..].find(['<', '>', '\n']) else {
            break;
        };
        let stop = start + 1 + stop_rel;

        match source.as_bytes()[stop] {
            // Restart from the inner `<`; the outer one cannot open a tag.
            b'<' => {
                cursor = stop;
                continue;
            }
            b'\n' => {
                cursor = stop + 1;
                continue;
            }
            _ => {}
        }

        let body = &source[start + 1..stop];
        let end = stop + 1;

        if let Some(rest) = body.strip_prefix('/') {
            let label = rest.trim();
            if !label.is_empty() {
                tokens.push(Token::Close {
                    label: label.to_string(),
                    start,
                    end,
                });
            }
        } else {
            let label = body.trim();
            let skip = label.is_empty()
                || label.starts_with('!')
                || label.starts_with('?')
                || label.ends_with('/');
            if !skip {
                tokens.push(Token::Open {
                    label: label.to_string(),
                    start,
                    end,
                });
            }
        }
        cursor = end;
    }

    tokens
}

struct Frame<'a> {
    label: String,
    start: usize,
    inner_start: usize,
    children: Vec<TagBlock<'a>>,
}

/// Children of abandoned frames (outermost first), in document order.
fn orphaned_children<'a>(abandoned: Vec<Frame<'a>>) -> impl Iterator<Item = TagBlock<'a>> {
    abandoned.into_iter().flat_map(|frame| frame.children)
}

/// Parse every paired block in `source` into a forest of top-level blocks.
///
/// Opening tags nested deeper than [`MAX_NESTING`] are treated as text.
pub fn parse(source: &str) -> Vec<TagBlock<'_>> {
    let mut roots = Vec::new();
    let mut stack: Vec<Frame<'_>> = Vec::new();

    for token in tokenize(source) {
        match token {
            Token::Open { label, start, end } => {
                if stack.len() >= MAX_NESTING {
                    continue;
                }
                stack.push(Frame {
                    label,
                    start,
                    inner_start: end,
                    children: Vec::new(),
                });
            }
            Token::Close { label, start, end } => {
                let Some(pos) = stack.iter().rposition(|f| f.label == label) else {
                    continue;
                };
                let abandoned: Vec<Frame<'_>> = stack.drain(pos + 1..).collect();
                let Some(mut frame) = stack.pop() else {
                    continue;
                };
                frame.children.extend(orphaned_children(abandoned));
                let block = TagBlock {
                    label: frame.label,
                    span: frame.start..end,
                    inner_span: frame.inner_start..start,
                    content: &source[frame.inner_start..start],
                    children: frame.children,
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(block),
                    None => roots.push(block),
                }
            }
        }
    }

    let abandoned: Vec<Frame<'_>> = stack.drain(..).collect();
    roots.extend(orphaned_children(abandoned));
    roots
}

/// Blank out every block whose label matches `label` (case-insensitive),
/// tags and content included.
///
/// Masked bytes become ASCII spaces so byte offsets into the result still
/// line up with the original text.
pub fn mask_blocks(source: &str, label: &str) -> String {
    let mut spans = Vec::new();
    collect_spans(&parse(source), label, &mut spans);
    if spans.is_empty() {
        return source.to_string();
    }

    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for span in spans {
        if span.start < cursor {
            continue;
        }
        out.push_str(&source[cursor..span.start]);
        out.extend(std::iter::repeat_n(' ', span.end - span.start));
        cursor = span.end;
    }
    out.push_str(&source[cursor..]);
    out
}

fn collect_spans(blocks: &[TagBlock<'_>], label: &str, spans: &mut Vec<Range<usize>>) {
    for block in blocks {
        if block.label.eq_ignore_ascii_case(label) {
            spans.push(block.span.clone());
        } else {
            collect_spans(&block.children, label, spans);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn parses_flat_blocks_in_order() {
        let src = "<Nova>bold</Nova>\n<scenario>harbor</scenario>";
        let blocks = parse(src);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].label, "Nova");
        assert_eq!(blocks[0].content, "bold");
        assert_eq!(&src[blocks[0].span.clone()], "<Nova>bold</Nova>");
        assert_eq!(blocks[1].label, "scenario");
    }

    #[test]
    fn nested_same_label_blocks_pair_correctly() {
        let src = "<A>outer <A>inner</A> tail</A>";
        let blocks = parse(src);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].content, "outer <A>inner</A> tail");
        assert_eq!(blocks[0].children.len(), 1);
        assert_eq!(blocks[0].children[0].content, "inner");
    }

    #[test]
    fn unmatched_tags_are_tolerated() {
        let src = "</stray><open> text <Bob>sheet</Bob>";
        let blocks = parse(src);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].label, "Bob");
    }

    #[test]
    fn unclosed_frame_inside_block_keeps_children() {
        let src = "<outer><loose><Bob>x</Bob></outer>";
        let blocks = parse(src);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].label, "outer");
        assert_eq!(blocks[0].children[0].label, "Bob");
    }

    #[test]
    fn comparison_operators_and_comments_are_not_tags() {
        let src = "a < b and c > d <!-- note --> <br/>";
        assert!(parse(src).is_empty());
    }

    #[test]
    fn labels_may_contain_spaces_and_punctuation() {
        let blocks = parse("<Mx. Foo's Persona>hi</Mx. Foo's Persona>");
        assert_eq!(blocks[0].label, "Mx. Foo's Persona");
    }

    #[test]
    fn multiline_tags_are_ignored() {
        assert!(parse("<Nova\n>x</Nova>").is_empty());
    }

    #[test]
    fn structural_labels_are_case_insensitive() {
        assert!(is_structural_label("System"));
        assert!(is_structural_label(" Scenario "));
        assert!(is_structural_label("EXAMPLE_DIALOGS"));
        assert!(is_structural_label("/"));
        assert!(!is_structural_label("Nova"));
    }

    #[test]
    fn classify_by_keywords_and_length() {
        let described = &parse("<Nova>Name: Nova</Nova>")[0];
        assert_eq!(described.classify(), BlockKind::DescribedEntity);

        let long = format!("<Nova>{}</Nova>", "x".repeat(SUBSTANTIAL_CONTENT_CHARS + 1));
        assert_eq!(parse(&long)[0].classify(), BlockKind::LongEntity);

        let short = &parse("<Nova>hello</Nova>")[0];
        assert_eq!(short.classify(), BlockKind::Minor);
        assert!(!short.classify().is_entity());

        let structural = &parse("<scenario>Name: Town</scenario>")[0];
        assert_eq!(structural.classify(), BlockKind::Structural);
    }

    #[test]
    fn mask_blocks_preserves_offsets() {
        let src = "<system>Name: Admin</system><Nova>Name: Nova</Nova>";
        let masked = mask_blocks(src, "system");
        assert_eq!(masked.len(), src.len());
        assert!(!masked.contains("Admin"));
        let blocks = parse(&masked);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].label, "Nova");
        assert_eq!(&src[blocks[0].span.clone()], "<Nova>Name: Nova</Nova>");
    }

    #[test]
    fn mask_blocks_without_match_is_identity() {
        let src = "<Nova>x</Nova>";
        assert_eq!(mask_blocks(src, "system"), src);
    }

    fn depth(blocks: &[TagBlock<'_>]) -> usize {
        blocks.iter().map(|b| 1 + depth(&b.children)).max().unwrap_or(0)
    }

    #[test]
    fn stray_angle_before_a_tag_does_not_hide_it() {
        let blocks = parse("x <a <<b>inner</b> and <c\n<d>more</d>");
        let labels: Vec<_> = blocks.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["b", "d"]);
    }

    #[test]
    fn long_run_of_open_angles_is_linear() {
        let src = format!("{}>", "<".repeat(1_000_000));
        let started = Instant::now();
        assert!(parse(&src).is_empty());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn unterminated_tags_on_one_line_are_linear() {
        let src = "<name ".repeat(500_000);
        let started = Instant::now();
        assert!(parse(&src).is_empty());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn deep_nesting_is_capped() {
        let n = 100_000;
        let src = format!("{}core{}", "<a>".repeat(n), "</a>".repeat(n));
        let started = Instant::now();
        let blocks = parse(&src);
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(blocks.len(), 1);
        assert_eq!(depth(&blocks), MAX_NESTING);
    }

    #[test]
    fn unmatched_closers_against_a_full_stack_are_linear() {
        let src = format!("{}{}", "<a>".repeat(10_000), "</b>".repeat(300_000));
        let started = Instant::now();
        assert!(parse(&src).is_empty());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn many_blocks_under_unclosed_frames_stay_in_order() {
        let src = format!("<r>{}</r>", "<u><x>y</x>".repeat(50_000));
        let started = Instant::now();
        let blocks = parse(&src);
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].label, "r");
        let children = &blocks[0].children;
        assert!(!children.is_empty());
        assert!(children.iter().all(|c| c.label == "x"));
        assert!(children.windows(2).all(|w| w[0].span.start < w[1].span.start));
    }

    #[test]
    fn multi_megabyte_system_prompt_masks_quickly() {
        let sheet = format!("<Nova>Name: Nova\n{}</Nova>", "lore <b>bold</b> < > ".repeat(200_000));
        let started = Instant::now();
        let masked = mask_blocks(&sheet, "system");
        let blocks = parse(&masked);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].classify(), BlockKind::DescribedEntity);
    }
}
