use crate::config::SiteConfig;
use crate::content::ImageRef;
use crate::error::{FolioError, Result};
use crate::math::{MathDisplay, render_mathml};
use crate::tree::Node;
use crate::xml::escape;
use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

const IMAGE_MARKER: &str = "\u{0}folio-image\u{0}";

/// What a transform reads and what it leaves behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Text,
    Math,
    Heading,
    Link,
    Markup,
}

/// Pre-render transforms over the raw markdown source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextTransform {
    /// Rewrites `\( \)` and `\[ \]` into dollar delimiters.
    Math,
    /// Converts CRLF and lone CR to LF.
    LineEndings,
}

/// Post-render transforms over the parsed event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TreeTransform {
    Math,
    HeadingAnchors,
    ExternalLinks,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTransform(pub String);

impl fmt::Display for UnknownTransform {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "unknown transform '{}'", self.0)
    }
}

impl FromStr for TextTransform {
    type Err = UnknownTransform;

    fn from_str(name: &str) -> std::result::Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "math" | "remark-math" => Ok(TextTransform::Math),
            "line-endings" => Ok(TextTransform::LineEndings),
            _ => Err(UnknownTransform(name.to_string())),
        }
    }
}

impl FromStr for TreeTransform {
    type Err = UnknownTransform;

    fn from_str(name: &str) -> std::result::Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "math" | "katex" | "rehype-katex" => Ok(TreeTransform::Math),
            "heading-anchors" => Ok(TreeTransform::HeadingAnchors),
            "external-links" => Ok(TreeTransform::ExternalLinks),
            _ => Err(UnknownTransform(name.to_string())),
        }
    }
}

impl TextTransform {
    pub fn id(&self) -> &'static str {
        match self {
            TextTransform::Math => "math",
            TextTransform::LineEndings => "line-endings",
        }
    }

    pub fn consumes(&self) -> NodeKind {
        NodeKind::Text
    }

    pub fn produces(&self) -> NodeKind {
        match self {
            TextTransform::Math => NodeKind::Math,
            TextTransform::LineEndings => NodeKind::Text,
        }
    }

    pub fn apply(&self, text: &str) -> std::result::Result<String, String> {
        match self {
            TextTransform::Math => rewrite_math_delimiters(text),
            TextTransform::LineEndings => Ok(text.replace("\r\n", "\n").replace('\r', "\n")),
        }
    }
}

impl TreeTransform {
    pub fn id(&self) -> &'static str {
        match self {
            TreeTransform::Math => "math",
            TreeTransform::HeadingAnchors => "heading-anchors",
            TreeTransform::ExternalLinks => "external-links",
        }
    }

    pub fn consumes(&self) -> NodeKind {
        match self {
            TreeTransform::Math => NodeKind::Math,
            TreeTransform::HeadingAnchors => NodeKind::Heading,
            TreeTransform::ExternalLinks => NodeKind::Link,
        }
    }

    pub fn produces(&self) -> NodeKind {
        match self {
            TreeTransform::Math => NodeKind::Markup,
            TreeTransform::HeadingAnchors => NodeKind::Heading,
            TreeTransform::ExternalLinks => NodeKind::Markup,
        }
    }

    /// Events this transform does not consume are passed through untouched.
    pub fn apply<'a>(&self, events: Vec<Event<'a>>) -> std::result::Result<Vec<Event<'a>>, String> {
        match self {
            TreeTransform::Math => render_math_events(events),
            TreeTransform::HeadingAnchors => Ok(add_heading_anchors(events)),
            TreeTransform::ExternalLinks => Ok(mark_external_links(events)),
        }
    }
}

impl fmt::Display for TextTransform {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.id())
    }
}

impl fmt::Display for TreeTransform {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.id())
    }
}

pub fn is_known_theme(name: &str) -> bool {
    ThemeSet::load_defaults().themes.contains_key(name)
}

/// Markdown to nodes: text chain, parse, highlight, tree chain.
pub struct MarkdownPipeline {
    syntax_set: SyntaxSet,
    theme: Theme,
    text_chain: Vec<TextTransform>,
    tree_chain: Vec<TreeTransform>,
    options: Options,
}

impl MarkdownPipeline {
    pub fn new(config: &SiteConfig) -> Result<Self> {
        let mut theme_set = ThemeSet::load_defaults();
        let theme = theme_set
            .themes
            .remove(&config.syntax_theme)
            .ok_or_else(|| FolioError::Config {
                message: format!("unknown syntax theme '{}'", config.syntax_theme),
            })?;

        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
        if config.math_enabled() || config.markdown_output_extensions.contains(&TreeTransform::Math)
        {
            options.insert(Options::ENABLE_MATH);
        }

        Ok(Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme,
            text_chain: config.markdown_extensions.clone(),
            tree_chain: config.markdown_output_extensions.clone(),
            options,
        })
    }

    pub fn run_text_chain(&self, document: &str, text: &str) -> Result<String> {
        let mut current = text.to_string();
        for transform in &self.text_chain {
            current = transform
                .apply(&current)
                .map_err(|message| FolioError::Transform {
                    document: document.to_string(),
                    transform: transform.id().to_string(),
                    message,
                })?;
        }
        Ok(current)
    }

    pub fn render(&self, document: &str, text: &str) -> Result<Vec<Node>> {
        let prepared = self.run_text_chain(document, text)?;
        let events: Vec<Event> = Parser::new_ext(&prepared, self.options).collect();
        let mut events = self.highlight_code_blocks(events);

        for transform in &self.tree_chain {
            events = transform
                .apply(events)
                .map_err(|message| FolioError::Transform {
                    document: document.to_string(),
                    transform: transform.id().to_string(),
                    message,
                })?;
        }

        Ok(events_to_nodes(events))
    }

    fn highlight_code_blocks<'a>(&self, events: Vec<Event<'a>>) -> Vec<Event<'a>> {
        let mut output = Vec::with_capacity(events.len());
        let mut code_block: Option<(Option<String>, String)> = None;

        for event in events {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let language = match kind {
                        CodeBlockKind::Fenced(info) => info
                            .split_whitespace()
                            .next()
                            .map(|token| token.to_string()),
                        CodeBlockKind::Indented => None,
                    };
                    code_block = Some((language, String::new()));
                }
                Event::End(TagEnd::CodeBlock) => {
                    if let Some((language, code)) = code_block.take() {
                        let html = self.highlight(language.as_deref(), &code);
                        output.push(Event::Html(CowStr::from(html)));
                    }
                }
                Event::Text(text) if code_block.is_some() => {
                    if let Some((_, code)) = code_block.as_mut() {
                        code.push_str(&text);
                    }
                }
                other => output.push(other),
            }
        }

        output
    }

    fn highlight(&self, language: Option<&str>, code: &str) -> String {
        let Some(language) = language else {
            return format!("<pre><code>{}</code></pre>", escape(code));
        };
        self.syntax_set
            .find_syntax_by_token(language)
            .map(|syntax| {
                highlighted_html_for_string(code, &self.syntax_set, syntax, &self.theme)
                    .unwrap_or_else(|_| format!("<pre><code>{}</code></pre>", escape(code)))
            })
            .unwrap_or_else(|| {
                format!(
                    "<pre><code class=\"language-{}\">{}</code></pre>",
                    escape(language),
                    escape(code)
                )
            })
    }
}

/// Local images become `Image` nodes so they go through optimization;
/// everything else is rendered to markup.
fn events_to_nodes(events: Vec<Event<'_>>) -> Vec<Node> {
    let mut images = Vec::new();
    let mut stream = Vec::with_capacity(events.len());
    let mut pending: Option<(String, String, usize)> = None;

    for event in events {
        if let Some((_, alt, depth)) = pending.as_mut() {
            let finished = match event {
                Event::Start(Tag::Image { .. }) => {
                    *depth += 1;
                    false
                }
                Event::End(TagEnd::Image) if *depth == 0 => true,
                Event::End(TagEnd::Image) => {
                    *depth -= 1;
                    false
                }
                Event::Text(text) | Event::Code(text) => {
                    alt.push_str(&text);
                    false
                }
                _ => false,
            };
            if finished && let Some((src, alt, _)) = pending.take() {
                stream.push(Event::InlineHtml(CowStr::from(IMAGE_MARKER)));
                images.push(ImageRef::new(src, alt));
            }
            continue;
        }

        match event {
            Event::Start(Tag::Image { ref dest_url, .. }) if is_local_image(dest_url) => {
                pending = Some((dest_url.to_string(), String::new(), 0));
            }
            other => stream.push(other),
        }
    }

    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, stream.into_iter());

    let mut nodes = Vec::new();
    let mut images = images.into_iter();
    let mut segments = html.split(IMAGE_MARKER);
    if let Some(first) = segments.next() {
        push_raw(&mut nodes, first);
    }
    for segment in segments {
        if let Some(image) = images.next() {
            nodes.push(Node::image(image, None));
        }
        push_raw(&mut nodes, segment);
    }
    nodes
}

fn push_raw(nodes: &mut Vec<Node>, markup: &str) {
    if !markup.is_empty() {
        nodes.push(Node::Raw(markup.to_string()));
    }
}

fn is_local_image(src: &str) -> bool {
    !src.trim().is_empty() && !ImageRef::new(src, "").is_remote()
}

fn render_math_events(events: Vec<Event<'_>>) -> std::result::Result<Vec<Event<'_>>, String> {
    events
        .into_iter()
        .map(|event| match event {
            Event::InlineMath(tex) => {
                let mathml = render_mathml(&tex, MathDisplay::Inline)?;
                Ok(Event::InlineHtml(CowStr::from(format!(
                    "<span class=\"math math-inline\">{}</span>",
                    mathml
                ))))
            }
            Event::DisplayMath(tex) => {
                let mathml = render_mathml(&tex, MathDisplay::Block)?;
                Ok(Event::InlineHtml(CowStr::from(format!(
                    "<span class=\"math math-display\">{}</span>",
                    mathml
                ))))
            }
            other => Ok(other),
        })
        .collect()
}

fn add_heading_anchors(mut events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut used: HashSet<String> = events
        .iter()
        .filter_map(|event| match event {
            Event::Start(Tag::Heading { id: Some(id), .. }) => Some(id.to_string()),
            _ => None,
        })
        .collect();

    for index in 0..events.len() {
        if !matches!(events[index], Event::Start(Tag::Heading { id: None, .. })) {
            continue;
        }

        let mut text = String::new();
        for event in &events[index + 1..] {
            match event {
                Event::End(TagEnd::Heading(_)) => break,
                Event::Text(content) | Event::Code(content) => text.push_str(content),
                _ => {}
            }
        }

        let slug = unique_slug(slugify(&text), &mut used);
        if let Event::Start(Tag::Heading { id, .. }) = &mut events[index] {
            *id = Some(CowStr::from(slug));
        }
    }

    events
}

pub fn slugify(text: &str) -> String {
    let mut slug = String::new();
    let mut pending_separator = false;
    for character in text.chars().flat_map(char::to_lowercase) {
        if character.is_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(character);
        } else if character.is_whitespace() || character == '-' || character == '_' {
            pending_separator = true;
        }
    }
    if slug.is_empty() {
        "section".to_string()
    } else {
        slug
    }
}

fn unique_slug(base: String, used: &mut HashSet<String>) -> String {
    if used.insert(base.clone()) {
        return base;
    }
    let mut counter = 1;
    loop {
        let candidate = format!("{}-{}", base, counter);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        counter += 1;
    }
}

fn mark_external_links(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut output = Vec::with_capacity(events.len());
    let mut open_links: Vec<bool> = Vec::new();

    for event in events {
        match event {
            Event::Start(Tag::Link {
                ref dest_url,
                ref title,
                ..
            }) if is_external(dest_url) => {
                let mut tag = format!("<a href=\"{}\"", escape(dest_url));
                if !title.is_empty() {
                    tag.push_str(&format!(" title=\"{}\"", escape(title)));
                }
                tag.push_str(" target=\"_blank\" rel=\"noopener noreferrer\">");
                open_links.push(true);
                output.push(Event::InlineHtml(CowStr::from(tag)));
            }
            Event::Start(Tag::Link { .. }) => {
                open_links.push(false);
                output.push(event);
            }
            Event::End(TagEnd::Link) => {
                if open_links.pop().unwrap_or(false) {
                    output.push(Event::InlineHtml(CowStr::Borrowed("</a>")));
                } else {
                    output.push(event);
                }
            }
            other => output.push(other),
        }
    }

    output
}

fn is_external(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Rewrites `\(x\)` to `$x$` and `\[x\]` to `$$x$$`.
///
/// Fenced code, code spans and existing dollar math are copied verbatim.
/// Backslash escapes are consumed in pairs so `\\(` stays literal. Running
/// the rewrite on its own output returns it unchanged.
fn rewrite_math_delimiters(text: &str) -> std::result::Result<String, String> {
    let chars: Vec<char> = text.chars().collect();
    let mut output = String::with_capacity(text.len());
    let mut index = 0;

    while index < chars.len() {
        let line_start = index == 0 || chars[index - 1] == '\n';
        if line_start && let Some(end) = fenced_block_end(&chars, index) {
            output.extend(&chars[index..end]);
            index = end;
            continue;
        }

        match chars[index] {
            '`' => {
                let run = run_length(&chars, index, '`');
                match find_backtick_run(&chars, index + run, run) {
                    Some(close) => {
                        output.extend(&chars[index..close + run]);
                        index = close + run;
                    }
                    None => {
                        output.extend(&chars[index..index + run]);
                        index += run;
                    }
                }
            }
            '$' => {
                let display = chars.get(index + 1) == Some(&'$');
                let opener = if display { 2 } else { 1 };
                match find_dollar_close(&chars, index + opener, display) {
                    Some(close) => {
                        output.extend(&chars[index..close + opener]);
                        index = close + opener;
                    }
                    None => {
                        output.extend(&chars[index..index + opener]);
                        index += opener;
                    }
                }
            }
            '\\' => match chars.get(index + 1) {
                Some('(') => {
                    let (inner, next) = latex_region(&chars, index, ')')?;
                    output.push('$');
                    output.push_str(&inner);
                    output.push('$');
                    index = next;
                }
                Some('[') => {
                    let (inner, next) = latex_region(&chars, index, ']')?;
                    output.push_str("$$");
                    output.push_str(&inner);
                    output.push_str("$$");
                    index = next;
                }
                Some(&escaped) => {
                    output.push('\\');
                    output.push(escaped);
                    index += 2;
                }
                None => {
                    output.push('\\');
                    index += 1;
                }
            },
            character => {
                output.push(character);
                index += 1;
            }
        }
    }

    Ok(output)
}

fn run_length(chars: &[char], start: usize, target: char) -> usize {
    chars[start..]
        .iter()
        .take_while(|&&character| character == target)
        .count()
}

fn find_backtick_run(chars: &[char], from: usize, length: usize) -> Option<usize> {
    let mut index = from;
    while index < chars.len() {
        if chars[index] == '`' {
            let run = run_length(chars, index, '`');
            if run == length {
                return Some(index);
            }
            index += run;
        } else {
            index += 1;
        }
    }
    None
}

fn find_dollar_close(chars: &[char], from: usize, display: bool) -> Option<usize> {
    let mut index = from;
    while index < chars.len() {
        match chars[index] {
            '\\' => index += 2,
            '$' if !display => return Some(index),
            '$' if chars.get(index + 1) == Some(&'$') => return Some(index),
            _ => index += 1,
        }
    }
    None
}

/// End (exclusive) of a fenced code block opening at `start`, closing fence
/// line included. An unclosed fence runs to the end of the text.
fn fenced_block_end(chars: &[char], start: usize) -> Option<usize> {
    let indent = chars[start..]
        .iter()
        .take(4)
        .take_while(|&&character| character == ' ')
        .count();
    if indent > 3 {
        return None;
    }
    let fence_start = start + indent;
    let marker = *chars.get(fence_start)?;
    if marker != '`' && marker != '~' {
        return None;
    }
    let fence = run_length(chars, fence_start, marker);
    if fence < 3 {
        return None;
    }

    let mut line = match next_line(chars, fence_start) {
        Some(line) => line,
        None => return Some(chars.len()),
    };
    loop {
        let indent = chars[line..]
            .iter()
            .take(4)
            .take_while(|&&character| character == ' ')
            .count();
        let candidate = line + indent;
        if indent <= 3
            && chars.get(candidate) == Some(&marker)
            && run_length(chars, candidate, marker) >= fence
        {
            return Some(next_line(chars, candidate).unwrap_or(chars.len()));
        }
        match next_line(chars, line) {
            Some(next) => line = next,
            None => return Some(chars.len()),
        }
    }
}

fn next_line(chars: &[char], from: usize) -> Option<usize> {
    chars[from..]
        .iter()
        .position(|&character| character == '\n')
        .map(|offset| from + offset + 1)
        .filter(|&next| next < chars.len())
}

/// Inner text of `\(...\)` or `\[...\]` starting at `start`, and the index
/// just past the closing delimiter.
fn latex_region(
    chars: &[char],
    start: usize,
    closer: char,
) -> std::result::Result<(String, usize), String> {
    let opener = if closer == ')' { "\\(" } else { "\\[" };
    let mut index = start + 2;
    while index < chars.len() {
        if chars[index] == '\\' {
            if chars.get(index + 1) == Some(&closer) {
                let raw: String = chars[start + 2..index].iter().collect();
                let inner = raw.trim().to_string();
                validate_math_inner(&inner, opener)?;
                return Ok((inner, index + 2));
            }
            index += 2;
        } else {
            index += 1;
        }
    }
    Err(format!("unterminated '{}' delimiter", opener))
}

fn validate_math_inner(inner: &str, opener: &str) -> std::result::Result<(), String> {
    if inner.is_empty() {
        return Err(format!("empty '{}' math", opener));
    }
    for forbidden in ["$", "`", "\\(", "\\[", "~~~"] {
        if inner.contains(forbidden) {
            return Err(format!(
                "'{}' math must not contain '{}': {}",
                opener, forbidden, inner
            ));
        }
    }
    if inner.ends_with('\\') {
        return Err(format!("'{}' math ends with a dangling '\\': {}", opener, inner));
    }
    Ok(())
}
