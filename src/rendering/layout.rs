//! Block layout used by the built-in engine's paint.
//!
//! This is deliberately simple: headings and text blocks stack vertically at
//! the viewport width, with estimated line wrapping. It exists so the soft
//! backend can report a content size and paint something representative; a
//! real engine backend brings its own layout.

use scraper::{Html, Selector};

use crate::Viewport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Heading,
    Text,
}

#[derive(Debug, Clone)]
pub struct BlockNode {
    pub rect: BlockRect,
    pub text: String,
    pub kind: BlockKind,
}

const SIDE_MARGIN: u32 = 8;
const CHAR_WIDTH: u32 = 8;
const LINE_HEIGHT: u32 = 8;

/// Lay out the document at the given viewport width. Blocks never wrap
/// horizontally past the viewport; height grows as far as the content needs,
/// unconstrained by the viewport height.
pub fn layout_document(document: &Html, viewport: Viewport) -> Vec<BlockNode> {
    let mut y = SIDE_MARGIN;
    let page_width = viewport.width;
    let mut nodes = Vec::new();

    let heading_sel = Selector::parse("h1, h2, h3").unwrap();
    for heading in document.select(&heading_sel) {
        let text = heading.text().collect::<String>();
        if text.trim().is_empty() {
            continue;
        }
        let padding = 8u32;
        let box_h = LINE_HEIGHT * 2 + padding * 2;
        nodes.push(BlockNode {
            rect: BlockRect {
                x: SIDE_MARGIN as i32,
                y: y as i32,
                width: page_width.saturating_sub(SIDE_MARGIN * 2),
                height: box_h,
            },
            text: text.trim().to_string(),
            kind: BlockKind::Heading,
        });
        y += box_h + SIDE_MARGIN;
    }

    let block_sel = Selector::parse("p, li, pre").unwrap();
    for block in document.select(&block_sel) {
        let text = block.text().collect::<String>();
        if text.trim().is_empty() {
            continue;
        }
        let padding = 6u32;
        let content_w = page_width
            .saturating_sub(SIDE_MARGIN * 2)
            .saturating_sub(padding * 2);
        let chars_per_line = (content_w / CHAR_WIDTH).max(1) as usize;

        let mut lines = 0u32;
        let mut current = 0usize;
        for word in text.split_whitespace() {
            if current > 0 && current + word.len() + 1 > chars_per_line {
                lines += 1;
                current = word.len();
            } else {
                current += word.len() + usize::from(current > 0);
            }
        }
        if current > 0 {
            lines += 1;
        }
        let box_h = lines.max(1) * LINE_HEIGHT + padding * 2;

        nodes.push(BlockNode {
            rect: BlockRect {
                x: SIDE_MARGIN as i32,
                y: y as i32,
                width: page_width.saturating_sub(SIDE_MARGIN * 2),
                height: box_h,
            },
            text: text.trim().to_string(),
            kind: BlockKind::Text,
        });
        y += box_h + 6;
    }

    nodes
}

/// Bottom edge of the laid-out content, in pixels.
pub fn content_height(nodes: &[BlockNode]) -> u32 {
    nodes
        .iter()
        .map(|n| (n.rect.y.max(0) as u32).saturating_add(n.rect.height))
        .max()
        .map(|bottom| bottom + SIDE_MARGIN)
        .unwrap_or(0)
}
