//! Text renderings of page HTML for the inspect sub-tools.

use scraper::{ElementRef, Html, Node, Selector};

const SKIP_TAGS: &[&str] = &["script", "style", "noscript", "svg", "template"];
const SHOWN_ATTRS: &[&str] = &[
    "id",
    "class",
    "name",
    "type",
    "href",
    "src",
    "placeholder",
    "value",
    "aria-label",
    "role",
    "title",
    "action",
    "method",
];
const MAX_MATCHES: usize = 10;
const MAX_LISTED: usize = 25;
const MAX_SNIPPET_CHARS: usize = 160;
const MAX_VISIBLE_TEXT_CHARS: usize = 4_000;

/// Title, URL, headings, links, forms, buttons and visible text of a page.
pub fn page_summary(html: &str, title: &str, url: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::new();

    out.push_str(&format!("Title: {}\nURL: {}\n", title.trim(), url));

    let headings = select_all(&document, "h1, h2, h3")
        .map(|el| format!("{} {}", el.value().name(), text_of(el)))
        .filter(|line| line.len() > 3)
        .take(MAX_LISTED)
        .collect::<Vec<_>>();
    push_section(&mut out, "Headings", &headings);

    let links = select_all(&document, "a[href]")
        .map(|el| {
            let href = el.value().attr("href").unwrap_or_default();
            let text = text_of(el);
            if text.is_empty() {
                href.to_string()
            } else {
                format!("{text} -> {href}")
            }
        })
        .take(MAX_LISTED)
        .collect::<Vec<_>>();
    push_section(&mut out, "Links", &links);

    let forms = select_all(&document, "form")
        .map(|form| {
            let fields = select_within(form, "input, select, textarea")
                .filter(|f| f.value().attr("type") != Some("hidden"))
                .map(open_tag)
                .collect::<Vec<_>>()
                .join(" ");
            format!("{} {}", open_tag(form), fields)
        })
        .take(MAX_LISTED)
        .collect::<Vec<_>>();
    push_section(&mut out, "Forms", &forms);

    let buttons = select_all(
        &document,
        "button, input[type=submit], input[type=button], [role=button]",
    )
        .map(|el| {
            let text = text_of(el);
            if text.is_empty() { open_tag(el) } else { format!("{} {text}", open_tag(el)) }
        })
        .take(MAX_LISTED)
        .collect::<Vec<_>>();
    push_section(&mut out, "Buttons", &buttons);

    let text = visible_text(&document);
    if !text.is_empty() {
        out.push_str("\nVisible text:\n");
        out.push_str(&truncate_chars(&text, MAX_VISIBLE_TEXT_CHARS));
        out.push('\n');
    }
    out
}

/// Elements whose own text or labelling attributes contain `needle`
/// (case-insensitive), each with `context_size` ancestor levels.
pub fn inspect_text(html: &str, needle: &str, context_size: usize) -> String {
    let document = Html::parse_document(html);
    let needle_lower = needle.to_lowercase();

    let matches: Vec<ElementRef<'_>> = document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| !SKIP_TAGS.contains(&el.value().name()) && !inside_skipped(*el))
        .filter(|el| own_text_matches(*el, &needle_lower) || attrs_match(*el, &needle_lower))
        .take(MAX_MATCHES)
        .collect();

    if matches.is_empty() {
        return format!("No elements found containing text '{needle}'");
    }
    render_matches(&matches, context_size)
}

/// Elements matching a CSS selector, each with `context_size` ancestor levels.
pub fn inspect_selector(html: &str, selector: &str, context_size: usize) -> Result<String, String> {
    let parsed = Selector::parse(selector).map_err(|e| format!("invalid CSS selector: {e}"))?;
    let document = Html::parse_document(html);
    let matches: Vec<ElementRef<'_>> = document.select(&parsed).take(MAX_MATCHES).collect();

    if matches.is_empty() {
        return Ok(format!("No elements found matching selector '{selector}'"));
    }
    Ok(render_matches(&matches, context_size))
}

fn render_matches(matches: &[ElementRef<'_>], context_size: usize) -> String {
    let blocks: Vec<String> = matches
        .iter()
        .enumerate()
        .map(|(idx, el)| format!("Match {}:\n{}", idx + 1, render_with_context(*el, context_size)))
        .collect();
    blocks.join("\n\n")
}

fn render_with_context(element: ElementRef<'_>, context_size: usize) -> String {
    let mut ancestors: Vec<ElementRef<'_>> = element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() != "html")
        .take(context_size)
        .collect();
    ancestors.reverse();

    let mut lines = Vec::with_capacity(ancestors.len() + 1);
    for (depth, ancestor) in ancestors.iter().enumerate() {
        lines.push(format!("{}{}", "  ".repeat(depth), open_tag(*ancestor)));
    }

    let text = text_of(element);
    let indent = "  ".repeat(ancestors.len());
    if text.is_empty() {
        lines.push(format!("{indent}{}", open_tag(element)));
    } else {
        lines.push(format!(
            "{indent}{} {:?}",
            open_tag(element),
            truncate_chars(&text, MAX_SNIPPET_CHARS)
        ));
    }
    lines.join("\n")
}

fn open_tag(element: ElementRef<'_>) -> String {
    let value = element.value();
    let mut tag = format!("<{}", value.name());
    for name in SHOWN_ATTRS {
        if let Some(attr) = value.attr(name) {
            tag.push_str(&format!(" {name}=\"{}\"", truncate_chars(attr.trim(), 80)));
        }
    }
    tag.push('>');
    tag
}

fn own_text_matches(element: ElementRef<'_>, needle_lower: &str) -> bool {
    element.children().any(|child| match child.value() {
        Node::Text(text) => text.to_lowercase().contains(needle_lower),
        _ => false,
    })
}

fn attrs_match(element: ElementRef<'_>, needle_lower: &str) -> bool {
    ["placeholder", "aria-label", "value", "title", "alt"]
        .iter()
        .filter_map(|name| element.value().attr(name))
        .any(|attr| attr.to_lowercase().contains(needle_lower))
}

fn inside_skipped(element: ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|el| SKIP_TAGS.contains(&el.value().name()))
}

fn select_all<'a>(document: &'a Html, css: &str) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    let selector = Selector::parse(css).ok();
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(move |el| selector.as_ref().is_some_and(|s| s.matches(el)))
}

fn select_within<'a>(root: ElementRef<'a>, css: &str) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    let selector = Selector::parse(css).ok();
    root.descendants()
        .filter_map(ElementRef::wrap)
        .filter(move |el| selector.as_ref().is_some_and(|s| s.matches(el)))
}

fn text_of(element: ElementRef<'_>) -> String {
    collapse_whitespace(&collect_text(element).join(" "))
}

fn visible_text(document: &Html) -> String {
    let body = Selector::parse("body")
        .ok()
        .and_then(|s| document.select(&s).next())
        .unwrap_or_else(|| document.root_element());
    collapse_whitespace(&collect_text(body).join(" "))
}

fn collect_text(element: ElementRef<'_>) -> Vec<String> {
    if SKIP_TAGS.contains(&element.value().name()) {
        return Vec::new();
    }
    let mut parts = Vec::new();
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    parts.push(trimmed.to_string());
                }
            }
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    parts.extend(collect_text(child_el));
                }
            }
            _ => {}
        }
    }
    parts
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{cut}...")
}

fn push_section(out: &mut String, name: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("\n{name}:\n"));
    for item in items {
        out.push_str("- ");
        out.push_str(item);
        out.push('\n');
    }
}
