//! Rebuild HTML from the formatting entities of an incoming message

use super::{push_escaped, types::MessageEntity};

/// HTML element for an entity kind; kinds Telegram detects on its own
/// (mentions, plain urls, hashtags) are left as text
fn element(kind: &str) -> Option<&'static str> {
    Some(match kind {
        "bold" => "b",
        "italic" => "i",
        "underline" => "u",
        "strikethrough" => "s",
        "spoiler" => "tg-spoiler",
        "code" => "code",
        "pre" => "pre",
        "blockquote" => "blockquote",
        "text_link" => "a",
        _ => return None,
    })
}

fn open_tag(out: &mut String, entity: &MessageEntity, name: &str) {
    if name == "a" {
        let url = entity.url.as_deref().unwrap_or_default();
        out.push_str("<a href=\"");
        for c in url.chars() {
            match c {
                '"' => out.push_str("&quot;"),
                _ => push_escaped(out, c),
            }
        }
        out.push_str("\">");
    } else {
        out.push('<');
        out.push_str(name);
        out.push('>');
    }
}

fn close_tag(out: &mut String, name: &str) {
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

/// Close every open span that ends at or before `pos`. Spans opened after
/// one of them are closed too and reopened, so the output stays well nested.
fn close_ended<'a>(out: &mut String, open: &mut Vec<(&'a MessageEntity, &'static str)>, pos: usize) {
    let Some(first) = open.iter().position(|(e, _)| e.offset + e.length <= pos) else {
        return;
    };
    let closed: Vec<_> = open.drain(first..).collect();
    for (_, name) in closed.iter().rev() {
        close_tag(out, name);
    }
    for (entity, name) in closed {
        if entity.offset + entity.length > pos {
            open_tag(out, entity, name);
            open.push((entity, name));
        }
    }
}

/// Escape `text` for HTML parse mode, keeping the sender's formatting
pub fn to_html(text: &str, entities: &[MessageEntity]) -> String {
    let mut spans: Vec<(&MessageEntity, &'static str)> = entities
        .iter()
        .filter(|e| e.length > 0)
        .filter_map(|e| element(&e.kind).map(|name| (e, name)))
        .collect();
    // outer spans first when two start together
    spans.sort_by(|(a, _), (b, _)| a.offset.cmp(&b.offset).then(b.length.cmp(&a.length)));

    let mut out = String::with_capacity(text.len());
    let mut open = Vec::new();
    let mut pending = spans.into_iter().peekable();
    let mut pos = 0;

    for c in text.chars() {
        close_ended(&mut out, &mut open, pos);
        while let Some((entity, name)) = pending.next_if(|(e, _)| e.offset <= pos) {
            open_tag(&mut out, entity, name);
            open.push((entity, name));
        }
        push_escaped(&mut out, c);
        pos += c.len_utf16();
    }
    close_ended(&mut out, &mut open, usize::MAX);
    out
}
