//! Inline content conversion
//!
//! Building side: [`InlineBuilder`] flattens nested formatting (comrak
//! emphasis nodes, inline HTML tags) into runs with [`Marks`].
//!
//! Serializing side: runs are written back out either as markdown
//! (`**bold**`, `<u>`, `<span style="color: …">`) or as HTML for table cells.
//! Marks are opened and closed in a fixed nesting order so a mark shared by
//! neighbouring runs stays open across them.

use crate::document::{normalize_inlines, Inline, Marks, TextRun};
use crate::markdown::html::{self, Tag};

// ─────────────────────────────────────────────────────────────────────────────
// Building
// ─────────────────────────────────────────────────────────────────────────────

/// Accumulates inline content while a converter walks nested formatting.
#[derive(Debug, Default)]
pub struct InlineBuilder {
    out: Vec<Inline>,
    marks: Marks,
    /// Open HTML tags with the marks that were active before each opened
    open_tags: Vec<(String, Marks)>,
}

impl InlineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append text with the currently active marks.
    pub fn push_text(&mut self, text: &str) {
        self.push_text_with(text, self.marks.clone());
    }

    /// Append text with explicit marks.
    pub fn push_text_with(&mut self, text: &str, marks: Marks) {
        if text.is_empty() {
            return;
        }
        self.out.push(Inline::Text(TextRun {
            text: text.to_string(),
            marks,
        }));
    }

    pub fn push_break(&mut self) {
        self.out.push(Inline::HardBreak);
    }

    /// Currently active marks.
    pub fn marks(&self) -> &Marks {
        &self.marks
    }

    /// Run `f` with a mark applied, restoring the previous marks afterwards.
    pub fn with_marks<F>(&mut self, apply: impl FnOnce(&mut Marks), f: F)
    where
        F: FnOnce(&mut Self),
    {
        let saved = self.marks.clone();
        apply(&mut self.marks);
        f(self);
        self.marks = saved;
    }

    /// Interpret an inline HTML tag.
    ///
    /// Returns `false` when the tag carries no formatting this builder
    /// understands; callers then keep the raw tag as text.
    pub fn apply_tag(&mut self, tag: &Tag) -> bool {
        if tag.closing {
            return self.close_tag(&tag.name);
        }
        if tag.name == "br" {
            self.push_break();
            return true;
        }

        let saved = self.marks.clone();
        let recognized = match tag.name.as_str() {
            "strong" | "b" => {
                self.marks.bold = true;
                true
            }
            "em" | "i" => {
                self.marks.italic = true;
                true
            }
            "u" | "ins" => {
                self.marks.underline = true;
                true
            }
            "s" | "del" | "strike" => {
                self.marks.strike = true;
                true
            }
            "code" => {
                self.marks.code = true;
                true
            }
            "a" => {
                self.marks.link = tag.attr("href").map(str::to_string);
                true
            }
            // Spans without a color still need to balance their end tag
            "span" => {
                if let Some(color) = tag.style("color") {
                    self.marks.color = Some(color);
                }
                true
            }
            // Block-ish wrappers inside table cells carry no marks
            "p" | "div" => return true,
            _ => false,
        };

        if recognized && !tag.self_closing {
            self.open_tags.push((tag.name.clone(), saved));
        }
        recognized
    }

    fn close_tag(&mut self, name: &str) -> bool {
        match name {
            "br" | "p" | "div" => return true,
            _ => {}
        }
        match self.open_tags.iter().rposition(|(open, _)| open == name) {
            Some(position) => {
                let (_, saved) = self.open_tags.swap_remove(position);
                self.open_tags.truncate(position);
                self.marks = saved;
                true
            }
            None => false,
        }
    }

    /// Finish building, returning normalized content.
    pub fn finish(self) -> Vec<Inline> {
        normalize_inlines(self.out)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mark Ordering
// ─────────────────────────────────────────────────────────────────────────────

/// A single mark in nesting order, outermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
enum MarkToken {
    Link(String),
    Color(String),
    Underline,
    Bold,
    Italic,
    Strike,
    Code,
}

fn mark_tokens(marks: &Marks, include_code: bool) -> Vec<MarkToken> {
    let mut tokens = Vec::new();
    if let Some(link) = &marks.link {
        tokens.push(MarkToken::Link(link.clone()));
    }
    if let Some(color) = &marks.color {
        tokens.push(MarkToken::Color(color.clone()));
    }
    if marks.underline {
        tokens.push(MarkToken::Underline);
    }
    if marks.bold {
        tokens.push(MarkToken::Bold);
    }
    if marks.italic {
        tokens.push(MarkToken::Italic);
    }
    if marks.strike {
        tokens.push(MarkToken::Strike);
    }
    if include_code && marks.code {
        tokens.push(MarkToken::Code);
    }
    tokens
}

/// Close the marks in `active` that `target` does not share, then open the
/// ones `target` adds. Returns `(closing, opening)` delimiters.
fn transition<T: PartialEq>(
    active: &mut Vec<T>,
    target: Vec<T>,
    open: impl Fn(&T) -> String,
    close: impl Fn(&T) -> String,
) -> (String, String) {
    let shared = shared_prefix(active, &target);
    let closing: String = active[shared..].iter().rev().map(|token| close(token)).collect();
    let opening: String = target[shared..].iter().map(|token| open(token)).collect();
    *active = target;
    (closing, opening)
}

fn shared_prefix<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

// ─────────────────────────────────────────────────────────────────────────────
// Delimiter Placement
// ─────────────────────────────────────────────────────────────────────────────

/// A mark as it is written out. `html` marks that the markdown delimiter
/// would not be left- or right-flanking where it lands, so the mark is
/// written as its HTML tag instead.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Placed {
    token: MarkToken,
    html: bool,
}

fn placed_open(placed: &Placed) -> String {
    if placed.html {
        html_open(&placed.token)
    } else {
        markdown_open(&placed.token)
    }
}

fn placed_close(placed: &Placed) -> String {
    if placed.html {
        html_close(&placed.token)
    } else {
        markdown_close(&placed.token)
    }
}

/// Emphasis delimiter character, for marks whose markdown form is flanking
/// sensitive.
fn delimiter(token: &MarkToken) -> Option<char> {
    match token {
        MarkToken::Bold | MarkToken::Italic => Some('*'),
        MarkToken::Strike => Some('~'),
        _ => None,
    }
}

/// Whitespace that moves outside delimiters. Other Unicode whitespace such
/// as NBSP is content.
fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

/// Whether a run produces output of its own.
fn is_written(run: &TextRun) -> bool {
    if run.marks.code {
        !run.text.is_empty()
    } else {
        !run.text.trim_matches(is_blank).is_empty()
    }
}

/// Whether a delimiter between `outer` and the first non-delimiter
/// character inside it (`inner`) can open or close. `None` is the edge of
/// the content.
fn flanks(outer: Option<char>, inner: char) -> bool {
    if inner.is_whitespace() {
        return false;
    }
    match outer {
        None => true,
        Some(c) if c.is_whitespace() || c.is_ascii_punctuation() => true,
        Some(_) => inner.is_alphanumeric(),
    }
}

/// Marks to write for each inline, with each emphasis span placed as
/// markdown or HTML. Breaks and whitespace-only runs get no marks.
fn place_marks(content: &[Inline]) -> Vec<Vec<Placed>> {
    let tokens: Vec<Option<Vec<MarkToken>>> = content
        .iter()
        .map(|inline| match inline {
            Inline::Text(run) if is_written(run) => Some(mark_tokens(&run.marks, false)),
            _ => None,
        })
        .collect();

    // (first run, depth, last run) of every span where a mark stays open
    let mut spans = Vec::new();
    let mut previous: &[MarkToken] = &[];
    for (index, inline) in content.iter().enumerate() {
        let Some(target) = tokens[index].as_deref() else {
            if matches!(inline, Inline::HardBreak) {
                previous = &[];
            }
            continue;
        };
        for depth in shared_prefix(previous, target)..target.len() {
            spans.push((index, depth, span_end(content, &tokens, index, depth)));
        }
        previous = target;
    }

    let mut html: Vec<Vec<bool>> = tokens
        .iter()
        .map(|target| vec![false; target.as_ref().map_or(0, Vec::len)])
        .collect();

    // Inner marks first: an outer delimiter's neighbour may be an inner one
    spans.sort_by(|a, b| b.1.cmp(&a.1));
    for (first, depth, last) in spans {
        let Some(token) = tokens[first].as_ref().and_then(|target| target.get(depth)) else {
            continue;
        };
        if delimiter(token).is_none() {
            continue;
        }
        let opens = flanks(
            outer_before(content, first),
            inner_edge(content, &tokens, &html, first, depth, true),
        );
        let closes = flanks(
            outer_after(content, last),
            inner_edge(content, &tokens, &html, last, depth, false),
        );
        if !(opens && closes) {
            for flags in &mut html[first..=last] {
                if let Some(flag) = flags.get_mut(depth) {
                    *flag = true;
                }
            }
        }
    }

    tokens
        .into_iter()
        .zip(html)
        .map(|(target, flags)| {
            target
                .unwrap_or_default()
                .into_iter()
                .zip(flags)
                .map(|(token, html)| Placed { token, html })
                .collect()
        })
        .collect()
}

/// Last run of the span opened at `first` for the mark at `depth`.
fn span_end(
    content: &[Inline],
    tokens: &[Option<Vec<MarkToken>>],
    first: usize,
    depth: usize,
) -> usize {
    let Some(prefix) = tokens[first].as_ref().map(|target| &target[..=depth]) else {
        return first;
    };
    let mut last = first;
    for index in first + 1..content.len() {
        match (&content[index], tokens[index].as_ref()) {
            (Inline::HardBreak, _) => break,
            (_, None) => continue,
            (_, Some(target)) if target.len() > depth && target[..=depth] == *prefix => {
                last = index
            }
            _ => break,
        }
    }
    last
}

/// Character written just inside the delimiter of the mark at `depth`, on
/// the opening (`first`) or closing side of run `index`.
fn inner_edge(
    content: &[Inline],
    tokens: &[Option<Vec<MarkToken>>],
    html: &[Vec<bool>],
    index: usize,
    depth: usize,
    first: bool,
) -> char {
    let target = tokens[index].as_deref().unwrap_or_default();
    if let Some(inner) = target.get(depth + 1) {
        if html[index].get(depth + 1).copied().unwrap_or(false) {
            return if first { '<' } else { '>' };
        }
        let inner_delimiter = delimiter(inner);
        if inner_delimiter.is_some() && inner_delimiter == target.get(depth).and_then(delimiter) {
            // Same character: both delimiters form one run
            return inner_edge(content, tokens, html, index, depth + 1, first);
        }
        return inner_delimiter.unwrap_or('<');
    }

    match &content[index] {
        Inline::Text(run) if run.marks.code => '`',
        Inline::Text(run) => {
            let core = run.text.trim_matches(is_blank);
            let edge = if first { core.chars().next() } else { core.chars().next_back() };
            edge.unwrap_or(' ')
        }
        Inline::HardBreak => ' ',
    }
}

/// Character written just before run `index`, as far as flanking goes.
fn outer_before(content: &[Inline], index: usize) -> Option<char> {
    if let Inline::Text(run) = &content[index] {
        if !run.marks.code && run.text.starts_with(is_blank) {
            return Some(' ');
        }
    }
    content[..index].iter().rev().find_map(|inline| match inline {
        Inline::HardBreak => Some('\n'),
        Inline::Text(run) => run.text.chars().next_back(),
    })
}

/// Character written just after run `index`, as far as flanking goes.
fn outer_after(content: &[Inline], index: usize) -> Option<char> {
    if let Inline::Text(run) = &content[index] {
        if !run.marks.code && run.text.ends_with(is_blank) {
            return Some(' ');
        }
    }
    content[index + 1..].iter().find_map(|inline| match inline {
        Inline::HardBreak => Some('\n'),
        Inline::Text(run) => run.text.chars().next(),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Markdown Output
// ─────────────────────────────────────────────────────────────────────────────

fn markdown_open(token: &MarkToken) -> String {
    match token {
        MarkToken::Link(_) => "[".to_string(),
        MarkToken::Color(color) => format!("<span style=\"color: {}\">", html::escape_attr(color)),
        MarkToken::Underline => "<u>".to_string(),
        MarkToken::Bold => "**".to_string(),
        MarkToken::Italic => "*".to_string(),
        MarkToken::Strike => "~~".to_string(),
        MarkToken::Code => String::new(),
    }
}

fn markdown_close(token: &MarkToken) -> String {
    match token {
        MarkToken::Link(url) => format!("]({})", link_destination(url)),
        MarkToken::Color(_) => "</span>".to_string(),
        MarkToken::Underline => "</u>".to_string(),
        MarkToken::Bold => "**".to_string(),
        MarkToken::Italic => "*".to_string(),
        MarkToken::Strike => "~~".to_string(),
        MarkToken::Code => String::new(),
    }
}

fn link_destination(url: &str) -> String {
    if url.is_empty() || url.contains([' ', '(', ')', '<', '>']) {
        format!("<{}>", url.replace('<', "%3C").replace('>', "%3E"))
    } else {
        url.to_string()
    }
}

/// Whether nothing but whitespace was written since the last newline.
fn at_line_start(out: &str) -> bool {
    let line = match out.rfind('\n') {
        Some(position) => &out[position + 1..],
        None => out,
    };
    line.trim_matches(is_blank).is_empty()
}

/// Write inline content as markdown.
///
/// Leading and trailing whitespace of each run is moved outside the
/// delimiters. Emphasis that still could not open or close where it lands
/// is written as HTML. Hard breaks are written as a backslash line ending;
/// trailing breaks are dropped since markdown cannot end a paragraph with
/// one.
pub fn to_markdown(content: &[Inline]) -> String {
    let end = content
        .iter()
        .rposition(|inline| !matches!(inline, Inline::HardBreak))
        .map_or(0, |last| last + 1);
    let content = &content[..end];

    let mut out = String::new();
    let mut active: Vec<Placed> = Vec::new();
    let mut pending_space = String::new();

    for (inline, target) in content.iter().zip(place_marks(content)) {
        match inline {
            Inline::HardBreak => {
                let (closing, _) = transition(&mut active, Vec::new(), placed_open, placed_close);
                out.push_str(&closing);
                pending_space.clear();
                out.push_str("\\\n");
            }
            Inline::Text(run) => {
                write_markdown_run(run, target, &mut out, &mut active, &mut pending_space)
            }
        }
    }

    let (closing, _) = transition(&mut active, Vec::new(), placed_open, placed_close);
    out.push_str(&closing);
    out
}

fn write_markdown_run(
    run: &TextRun,
    target: Vec<Placed>,
    out: &mut String,
    active: &mut Vec<Placed>,
    pending_space: &mut String,
) {
    let text = run.text.as_str();
    if !is_written(run) {
        pending_space.push_str(text);
        return;
    }
    // Code keeps its whitespace inside the span
    let (lead, core, trail) = if run.marks.code {
        ("", text, "")
    } else {
        let core = text.trim_matches(is_blank);
        let lead = &text[..text.len() - text.trim_start_matches(is_blank).len()];
        let trail = &text[text.trim_end_matches(is_blank).len()..];
        (lead, core, trail)
    };

    let (closing, opening) = transition(active, target, placed_open, placed_close);
    out.push_str(&closing);
    if !at_line_start(out) {
        out.push_str(pending_space);
        out.push_str(lead);
    }
    pending_space.clear();
    // `![` would start an image
    if opening.starts_with('[') && out.ends_with('!') {
        out.pop();
        out.push_str("\\!");
    }
    out.push_str(&opening);

    if run.marks.code {
        out.push_str(&code_span(core));
    } else {
        let line_start = at_line_start(out) && opening.is_empty();
        out.push_str(&escape_markdown(core, line_start));
    }
    pending_space.push_str(trail);
}

/// Wrap code in a backtick fence longer than any backtick run it contains.
fn code_span(code: &str) -> String {
    let longest = longest_run(code, '`');
    let fence = "`".repeat(longest + 1);
    let pad = code.starts_with('`')
        || code.ends_with('`')
        || (code.starts_with(' ') && code.ends_with(' ') && !code.trim().is_empty());
    if pad {
        format!("{fence} {code} {fence}")
    } else {
        format!("{fence}{code}{fence}")
    }
}

/// Length of the longest run of `ch` in `s`.
pub fn longest_run(s: &str, ch: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in s.chars() {
        if c == ch {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// Backslash-escape characters that markdown would otherwise interpret.
///
/// `line_start` additionally guards block syntax that only matters at the
/// beginning of a line (list markers, setext underlines).
pub fn escape_markdown(text: &str, line_start: bool) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut at_start = line_start;
    let chars: Vec<char> = text.chars().collect();

    for (index, &c) in chars.iter().enumerate() {
        match c {
            '\\' | '*' | '_' | '`' | '[' | ']' | '<' | '>' | '~' | '|' | '&' | '#' => {
                out.push('\\');
                out.push(c);
            }
            '-' | '+' | '=' if at_start => {
                out.push('\\');
                out.push(c);
            }
            '.' | ')' if at_start_of_ordered_marker(&chars, index, line_start) => {
                out.push('\\');
                out.push(c);
            }
            '\n' => {
                out.push_str("\\\n");
                at_start = true;
                continue;
            }
            _ => out.push(c),
        }
        if !c.is_ascii_digit() {
            at_start = false;
        }
    }
    out
}

/// Whether `chars[index]` ends a run of digits that opens the line.
fn at_start_of_ordered_marker(chars: &[char], index: usize, line_start: bool) -> bool {
    let line_begin = chars[..index]
        .iter()
        .rposition(|&c| c == '\n')
        .map(|position| position + 1);
    let begin = match line_begin {
        Some(begin) => begin,
        None if line_start => 0,
        None => return false,
    };
    index > begin && chars[begin..index].iter().all(|c| c.is_ascii_digit())
}

// ─────────────────────────────────────────────────────────────────────────────
// HTML Output
// ─────────────────────────────────────────────────────────────────────────────

fn html_open(token: &MarkToken) -> String {
    match token {
        MarkToken::Link(url) => format!("<a href=\"{}\">", html::escape_attr(url)),
        MarkToken::Color(color) => format!("<span style=\"color: {}\">", html::escape_attr(color)),
        MarkToken::Underline => "<u>".to_string(),
        MarkToken::Bold => "<strong>".to_string(),
        MarkToken::Italic => "<em>".to_string(),
        MarkToken::Strike => "<s>".to_string(),
        MarkToken::Code => "<code>".to_string(),
    }
}

fn html_close(token: &MarkToken) -> String {
    match token {
        MarkToken::Link(_) => "</a>".to_string(),
        MarkToken::Color(_) => "</span>".to_string(),
        MarkToken::Underline => "</u>".to_string(),
        MarkToken::Bold => "</strong>".to_string(),
        MarkToken::Italic => "</em>".to_string(),
        MarkToken::Strike => "</s>".to_string(),
        MarkToken::Code => "</code>".to_string(),
    }
}

/// Write inline content as single-line HTML, for raw-HTML table cells.
pub fn to_html(content: &[Inline]) -> String {
    let mut out = String::new();
    let mut active: Vec<MarkToken> = Vec::new();

    for inline in content {
        match inline {
            Inline::HardBreak => out.push_str("<br>"),
            Inline::Text(run) => {
                let target = mark_tokens(&run.marks, true);
                let (closing, opening) = transition(&mut active, target, html_open, html_close);
                out.push_str(&closing);
                out.push_str(&opening);
                out.push_str(&html::escape_text(&run.text).replace('\n', "<br>"));
            }
        }
    }

    let (closing, _) = transition(&mut active, Vec::new(), html_open, html_close);
    out.push_str(&closing);
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
