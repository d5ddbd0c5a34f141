//! Sanitization of provider-supplied job description HTML.
//!
//! Markup is parsed with `scraper` (html5ever), which repairs unclosed and
//! misnested tags, then lowered into a small allow-listed tree, repaired so
//! the result re-parses to the same tree, and serialized again.
//!
//! Pipeline:
//! ```text
//! raw html ─► parse_fragment ─► lower (allow-list, drop scripts)
//!          ─► normalize (content model, bullet lists) ─► render
//! ```
//!
//! Pure functions: no I/O, no shared state.

use scraper::{ElementRef, Html, Node as HtmlNode};
use thiserror::Error;

/// Elements nested deeper than this are not walked, and output that would
/// nest deeper is not produced; the whole description degrades to plain
/// escaped text instead.
pub const MAX_NESTING_DEPTH: usize = 128;

/// Glyphs providers use as hand-rolled list markers.
const BULLETS: &[char] = &[
    '\u{2022}', // •
    '\u{25E6}', // ◦
    '\u{25AA}', // ▪
    '\u{25AB}', // ▫
    '\u{2023}', // ‣
    '\u{25CF}', // ●
    '\u{25CB}', // ○
    '\u{25A0}', // ■
    '\u{25A1}', // □
    '\u{00B7}', // ·
    '\u{2043}', // ⁃
];

const LINK_REL: &str = "nofollow noopener noreferrer";

const SAFE_SCHEMES: &[&str] = &["http://", "https://", "mailto:"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SanitizeError {
    #[error("markup nested deeper than {max} elements")]
    TooDeep { max: usize },
}

/// Sanitize untrusted description HTML into display-ready markup.
///
/// Never fails: input that cannot be walked safely degrades to escaped text.
/// Sanitizing the output again returns it unchanged.
pub fn sanitize_html(raw: &str) -> String {
    match try_sanitize_html(raw) {
        Ok(html) => html,
        Err(e) => {
            tracing::warn!(error = %e, len = raw.len(), "Degrading description to plain text");
            plain_text_fallback(raw)
        }
    }
}

/// Sanitize, reporting markup that is too deeply nested to walk.
pub fn try_sanitize_html(raw: &str) -> Result<String, SanitizeError> {
    if raw.trim().is_empty() {
        return Ok(String::new());
    }

    let fragment = Html::parse_fragment(raw);
    let lowered = lower_children(fragment.root_element(), 0)?;

    // Repairing lists can add a level per nested list.
    let nodes = normalize_document(lowered);
    if nesting_depth(&nodes) > MAX_NESTING_DEPTH {
        return Err(SanitizeError::TooDeep {
            max: MAX_NESTING_DEPTH,
        });
    }
    Ok(render_document(&nodes))
}

fn plain_text_fallback(raw: &str) -> String {
    let fragment = Html::parse_fragment(raw);
    let mut text = String::new();
    for node in fragment.root_element().descendants() {
        let HtmlNode::Text(chunk) = node.value() else {
            continue;
        };
        let removed = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| is_removed(el.name()))
        });
        if !removed {
            let chunk: &str = chunk;
            text.push_str(chunk);
        }
    }

    let paragraph = Node::Element(Element::new(Tag::P, vec![Node::Text(text)]));
    render_document(&normalize_document(vec![paragraph]))
}

fn normalize_document(nodes: Vec<Node>) -> Vec<Node> {
    group_list_items(normalize_nodes(nodes, Ctx::ROOT))
}

/// Whitespace-only documents render as nothing, matching blank input.
fn render_document(nodes: &[Node]) -> String {
    let mut out = String::new();
    if !is_blank(nodes) {
        render(nodes, &mut out);
    }
    out
}

// ============================================================================
// Tree
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    P,
    H(u8),
    Ul,
    Ol,
    Li,
    Blockquote,
    Strong,
    Em,
    U,
    Code,
    A,
    Br,
}

impl Tag {
    fn from_name(name: &str) -> Option<Self> {
        let tag = match name {
            "p" | "div" | "section" | "article" | "pre" | "tr" => Tag::P,
            "h1" => Tag::H(1),
            "h2" => Tag::H(2),
            "h3" => Tag::H(3),
            "h4" => Tag::H(4),
            "h5" => Tag::H(5),
            "h6" => Tag::H(6),
            "ul" => Tag::Ul,
            "ol" => Tag::Ol,
            "li" => Tag::Li,
            "blockquote" => Tag::Blockquote,
            "strong" | "b" => Tag::Strong,
            "em" | "i" => Tag::Em,
            "u" => Tag::U,
            "code" => Tag::Code,
            "a" => Tag::A,
            "br" => Tag::Br,
            _ => return None,
        };
        Some(tag)
    }

    fn name(self) -> &'static str {
        match self {
            Tag::P => "p",
            Tag::H(1) => "h1",
            Tag::H(2) => "h2",
            Tag::H(3) => "h3",
            Tag::H(4) => "h4",
            Tag::H(5) => "h5",
            Tag::H(_) => "h6",
            Tag::Ul => "ul",
            Tag::Ol => "ol",
            Tag::Li => "li",
            Tag::Blockquote => "blockquote",
            Tag::Strong => "strong",
            Tag::Em => "em",
            Tag::U => "u",
            Tag::Code => "code",
            Tag::A => "a",
            Tag::Br => "br",
        }
    }

    fn is_block(self) -> bool {
        matches!(
            self,
            Tag::P | Tag::H(_) | Tag::Ul | Tag::Ol | Tag::Li | Tag::Blockquote
        )
    }

    fn is_list(self) -> bool {
        matches!(self, Tag::Ul | Tag::Ol)
    }
}

/// Elements removed together with everything inside them.
fn is_removed(name: &str) -> bool {
    matches!(
        name,
        "script"
            | "style"
            | "iframe"
            | "object"
            | "embed"
            | "noscript"
            | "template"
            | "svg"
            | "math"
            | "form"
            | "input"
            | "button"
            | "select"
            | "textarea"
            | "link"
            | "meta"
            | "base"
            | "frame"
            | "frameset"
            | "applet"
            | "canvas"
            | "audio"
            | "video"
            | "img"
            | "head"
            | "title"
    )
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Element(Element),
}

#[derive(Debug, Clone, PartialEq)]
struct Element {
    tag: Tag,
    href: Option<String>,
    children: Vec<Node>,
}

impl Element {
    fn new(tag: Tag, children: Vec<Node>) -> Self {
        Self {
            tag,
            href: None,
            children,
        }
    }
}

impl Node {
    fn is_block(&self) -> bool {
        matches!(self, Node::Element(el) if el.tag.is_block())
    }

    fn is_tag(&self, tag: Tag) -> bool {
        matches!(self, Node::Element(el) if el.tag == tag)
    }

    fn is_whitespace(&self) -> bool {
        matches!(self, Node::Text(t) if t.trim().is_empty())
    }
}

// ============================================================================
// Lowering: parsed DOM -> allow-listed tree
// ============================================================================

fn lower_children(parent: ElementRef<'_>, depth: usize) -> Result<Vec<Node>, SanitizeError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(SanitizeError::TooDeep {
            max: MAX_NESTING_DEPTH,
        });
    }

    let mut out = Vec::new();
    for child in parent.children() {
        match child.value() {
            HtmlNode::Text(text) => {
                let text: &str = text;
                out.push(Node::Text(text.to_string()));
            }
            HtmlNode::Element(el) => {
                if is_removed(el.name()) {
                    continue;
                }
                let Some(child_ref) = ElementRef::wrap(child) else {
                    continue;
                };
                let children = lower_children(child_ref, depth + 1)?;

                match Tag::from_name(el.name()) {
                    Some(Tag::A) => match safe_href(el.attr("href")) {
                        Some(href) => out.push(Node::Element(Element {
                            tag: Tag::A,
                            href: Some(href),
                            children,
                        })),
                        None => out.extend(children),
                    },
                    Some(Tag::Br) => out.push(Node::Element(Element::new(Tag::Br, Vec::new()))),
                    Some(tag) => out.push(Node::Element(Element::new(tag, children))),
                    None => out.extend(children),
                }
            }
            _ => {}
        }
    }
    Ok(out)
}

fn safe_href(href: Option<&str>) -> Option<String> {
    let href = href?.trim();
    let lower = href.to_ascii_lowercase();
    SAFE_SCHEMES
        .iter()
        .any(|scheme| lower.starts_with(scheme) && lower.len() > scheme.len())
        .then(|| href.to_string())
}

// ============================================================================
// Normalization
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    /// Document body or blockquote: bullet paragraphs become lists
    Root,
    /// Inside a list item: bullet glyphs are stripped, never nested
    ListItem,
}

#[derive(Debug, Clone, Copy)]
struct Ctx {
    flow: Flow,
    in_anchor: bool,
}

impl Ctx {
    const ROOT: Ctx = Ctx {
        flow: Flow::Root,
        in_anchor: false,
    };
}

fn normalize_nodes(nodes: Vec<Node>, ctx: Ctx) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        out.extend(normalize_node(node, ctx));
    }
    merge_text(out)
}

fn normalize_node(node: Node, ctx: Ctx) -> Vec<Node> {
    let el = match node {
        Node::Text(t) if t.is_empty() => return Vec::new(),
        Node::Text(t) => return vec![Node::Text(t)],
        Node::Element(el) => el,
    };

    if el.tag == Tag::A && ctx.in_anchor {
        return normalize_nodes(el.children, ctx);
    }

    let child_ctx = Ctx {
        flow: match el.tag {
            Tag::Li => Flow::ListItem,
            Tag::Blockquote => Flow::Root,
            _ => ctx.flow,
        },
        in_anchor: ctx.in_anchor || el.tag == Tag::A,
    };
    let children = normalize_nodes(el.children, child_ctx);

    match el.tag {
        Tag::P | Tag::H(_) => normalize_text_block(el.tag, children, ctx),
        Tag::Ul | Tag::Ol => {
            let items = list_items(children);
            if items.is_empty() {
                Vec::new()
            } else {
                vec![Node::Element(Element::new(el.tag, items))]
            }
        }
        Tag::Li => finish_list_item(children).into_iter().collect(),
        Tag::Blockquote => {
            let children = group_list_items(children);
            if is_blank(&children) {
                Vec::new()
            } else {
                vec![Node::Element(Element::new(Tag::Blockquote, children))]
            }
        }
        Tag::Br => vec![Node::Element(Element::new(Tag::Br, Vec::new()))],
        Tag::Strong | Tag::Em | Tag::U | Tag::Code | Tag::A => {
            // Formatting can't wrap blocks, and blank formatting is noise.
            if children.iter().any(Node::is_block) || is_blank(&children) {
                children
            } else {
                vec![Node::Element(Element {
                    tag: el.tag,
                    href: el.href,
                    children,
                })]
            }
        }
    }
}

/// Paragraphs and headings hold inline content only. Block children are
/// hoisted out, splitting the surrounding inline content into siblings.
fn normalize_text_block(tag: Tag, children: Vec<Node>, ctx: Ctx) -> Vec<Node> {
    if !children.iter().any(Node::is_block) {
        return finish_text_block(tag, children, ctx);
    }

    let mut out = Vec::new();
    let mut run = Vec::new();
    for child in children {
        if child.is_block() {
            out.extend(finish_text_block(tag, std::mem::take(&mut run), ctx));
            out.push(child);
        } else {
            run.push(child);
        }
    }
    out.extend(finish_text_block(tag, run, ctx));
    out
}

fn finish_text_block(tag: Tag, children: Vec<Node>, ctx: Ctx) -> Vec<Node> {
    let mut children = merge_text(children);
    if is_blank(&children) {
        return Vec::new();
    }

    match (tag, ctx.flow) {
        (Tag::P, Flow::Root) => bulletize(children),
        (Tag::P, Flow::ListItem) => {
            if starts_with_bullet(&children) {
                strip_leading_bullets(&mut children);
                children = merge_text(children);
                if is_blank(&children) {
                    return Vec::new();
                }
            }
            vec![Node::Element(Element::new(Tag::P, children))]
        }
        _ => vec![Node::Element(Element::new(tag, children))],
    }
}

/// Turn `<br>`-separated lines that start with a bullet glyph into list
/// items. Other lines stay together as paragraphs.
fn bulletize(children: Vec<Node>) -> Vec<Node> {
    let has_bullet_line = children
        .split(|n| n.is_tag(Tag::Br))
        .any(starts_with_bullet);
    if !has_bullet_line {
        return vec![Node::Element(Element::new(Tag::P, children))];
    }

    let mut out = Vec::new();
    let mut pending: Vec<Node> = Vec::new();
    let flush = |pending: &mut Vec<Node>, out: &mut Vec<Node>| {
        if !pending.is_empty() {
            let text = merge_text(std::mem::take(pending));
            out.push(Node::Element(Element::new(Tag::P, text)));
        }
    };

    for line in children.split(|n| n.is_tag(Tag::Br)) {
        if starts_with_bullet(line) {
            flush(&mut pending, &mut out);
            let mut item = line.to_vec();
            strip_leading_bullets(&mut item);
            trim_trailing_whitespace(&mut item);
            let item = merge_text(item);
            if !is_blank(&item) {
                out.push(Node::Element(Element::new(Tag::Li, item)));
            }
        } else if !is_blank(line) {
            if !pending.is_empty() {
                pending.push(Node::Element(Element::new(Tag::Br, Vec::new())));
            }
            pending.extend(line.iter().cloned());
        }
    }
    flush(&mut pending, &mut out);
    out
}

fn finish_list_item(children: Vec<Node>) -> Option<Node> {
    let mut children = group_list_items(children);
    strip_leading_bullets(&mut children);
    let children = merge_text(children);
    if is_blank(&children) {
        None
    } else {
        Some(Node::Element(Element::new(Tag::Li, children)))
    }
}

/// Lists hold only list items; stray content is wrapped into items.
fn list_items(children: Vec<Node>) -> Vec<Node> {
    let mut items = Vec::new();
    let mut run = Vec::new();
    for child in children {
        if child.is_tag(Tag::Li) {
            if let Some(item) = finish_list_item(std::mem::take(&mut run)) {
                items.push(item);
            }
            items.push(child);
        } else if !(run.is_empty() && child.is_whitespace()) {
            run.push(child);
        }
    }
    if let Some(item) = finish_list_item(run) {
        items.push(item);
    }
    items
}

/// Group runs of sibling list items into a single `<ul>`, dropping the
/// whitespace between them.
fn group_list_items(children: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::with_capacity(children.len());
    let mut items: Vec<Node> = Vec::new();
    let mut gap: Vec<Node> = Vec::new();

    for child in children {
        if child.is_tag(Tag::Li) {
            if items.is_empty() {
                out.append(&mut gap);
            } else {
                gap.clear();
            }
            items.push(child);
        } else if !items.is_empty() && child.is_whitespace() {
            gap.push(child);
        } else {
            if !items.is_empty() {
                out.push(Node::Element(Element::new(Tag::Ul, std::mem::take(&mut items))));
            }
            out.append(&mut gap);
            out.push(child);
        }
    }
    if !items.is_empty() {
        out.push(Node::Element(Element::new(Tag::Ul, items)));
    }
    out.append(&mut gap);
    merge_text(out)
}

// ============================================================================
// Helpers
// ============================================================================

fn merge_text(nodes: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Text(t) if t.is_empty() => {}
            Node::Text(t) => {
                if let Some(Node::Text(prev)) = out.last_mut() {
                    prev.push_str(&t);
                } else {
                    out.push(Node::Text(t));
                }
            }
            other => out.push(other),
        }
    }
    out
}

fn nesting_depth(nodes: &[Node]) -> usize {
    nodes
        .iter()
        .map(|node| match node {
            Node::Text(_) => 0,
            Node::Element(el) => 1 + nesting_depth(&el.children),
        })
        .max()
        .unwrap_or(0)
}

fn is_blank(nodes: &[Node]) -> bool {
    nodes.iter().all(|node| match node {
        Node::Text(t) => t.trim().is_empty(),
        Node::Element(el) => is_blank(&el.children),
    })
}

/// First non-whitespace character in reading order, not looking into
/// nested lists.
fn first_char(nodes: &[Node]) -> Option<char> {
    for node in nodes {
        match node {
            Node::Text(t) => {
                if let Some(c) = t.chars().find(|c| !c.is_whitespace()) {
                    return Some(c);
                }
            }
            Node::Element(el) if el.tag.is_list() => return None,
            Node::Element(el) => {
                if let Some(c) = first_char(&el.children) {
                    return Some(c);
                }
            }
        }
    }
    None
}

fn starts_with_bullet(nodes: &[Node]) -> bool {
    first_char(nodes).is_some_and(|c| BULLETS.contains(&c))
}

/// Remove leading whitespace, bullet glyphs, and line breaks. Returns
/// whether real content was reached.
fn strip_leading_bullets(nodes: &mut Vec<Node>) -> bool {
    while let Some(first) = nodes.first_mut() {
        match first {
            Node::Text(t) => {
                let keep = t
                    .trim_start_matches(|c: char| c.is_whitespace() || BULLETS.contains(&c))
                    .len();
                if keep == 0 {
                    nodes.remove(0);
                    continue;
                }
                let cut = t.len() - keep;
                t.drain(..cut);
                return true;
            }
            Node::Element(el) if el.tag == Tag::Br => {
                nodes.remove(0);
            }
            Node::Element(el) if el.tag.is_list() => return true,
            Node::Element(el) => {
                if strip_leading_bullets(&mut el.children) {
                    return true;
                }
                nodes.remove(0);
            }
        }
    }
    false
}

fn trim_trailing_whitespace(nodes: &mut Vec<Node>) {
    while let Some(last) = nodes.last_mut() {
        match last {
            Node::Text(t) => {
                let keep = t.trim_end().len();
                if keep == 0 {
                    nodes.pop();
                    continue;
                }
                t.truncate(keep);
                return;
            }
            Node::Element(el) if el.tag == Tag::Br => {
                nodes.pop();
            }
            _ => return,
        }
    }
}

// ============================================================================
// Rendering
// ============================================================================

fn render(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(t) => escape_into(t, false, out),
            Node::Element(el) if el.tag == Tag::Br => out.push_str("<br>"),
            Node::Element(el) => {
                out.push('<');
                out.push_str(el.tag.name());
                if let Some(href) = &el.href {
                    out.push_str(" href=\"");
                    escape_into(href, true, out);
                    out.push_str("\" rel=\"");
                    out.push_str(LINK_REL);
                    out.push('"');
                }
                out.push('>');
                render(&el.children, out);
                out.push_str("</");
                out.push_str(el.tag.name());
                out.push('>');
            }
        }
    }
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}
