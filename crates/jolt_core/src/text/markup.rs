//! Bracket markup: `[styled text](effect=a,b;other=c)`, `[img](uuid=..)`
//! and `[anim](uuid=..)` embedded in plain text.
//!
//! Anything that does not complete the `[..](..)` shape is plain text, so a
//! stray bracket never swallows the rest of the string.

/// One `name=arg,arg` entry of an attribute list.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectSpec {
    pub name: String,
    pub args: Vec<String>,
}

impl EffectSpec {
    pub fn new(name: &str, args: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Plain(String),
    Styled { text: String, effects: Vec<EffectSpec> },
    Image { attrs: Vec<EffectSpec> },
    Animation { attrs: Vec<EffectSpec> },
}

/// Splits `input` into segments in source order. Newlines may appear
/// inside styled text.
pub fn parse_markup(input: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut plain = String::new();
    let mut rest = input;

    while !rest.is_empty() {
        if let Some((segment, consumed)) = styled_at(rest) {
            if !plain.is_empty() {
                segments.push(Segment::Plain(std::mem::take(&mut plain)));
            }
            segments.push(segment);
            rest = &rest[consumed..];
            continue;
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            plain.push(c);
        }
        rest = chars.as_str();
    }
    if !plain.is_empty() {
        segments.push(Segment::Plain(plain));
    }
    segments
}

/// Parses `[text](attrs)` at the start of `s`, returning the segment and the
/// number of bytes it spans.
fn styled_at(s: &str) -> Option<(Segment, usize)> {
    let body = s.strip_prefix('[')?;
    let close = body.find(']')?;
    let text = &body[..close];
    if text.contains('[') {
        return None;
    }
    let after = body[close + 1..].strip_prefix('(')?;
    let end = after.find(')')?;
    let attrs = parse_attrs(&after[..end]);
    // '[' + text + "](" + attrs + ')'
    let consumed = 1 + close + 2 + end + 1;
    let segment = match text {
        "img" => Segment::Image { attrs },
        "anim" => Segment::Animation { attrs },
        _ => Segment::Styled {
            text: text.to_string(),
            effects: attrs,
        },
    };
    Some((segment, consumed))
}

/// `a=1,2;b=red;c` becomes three entries; a bare name has no args.
pub fn parse_attrs(list: &str) -> Vec<EffectSpec> {
    list.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((name, value)) => EffectSpec {
                name: name.trim().to_string(),
                args: value
                    .split(',')
                    .map(|a| a.trim().to_string())
                    .filter(|a| !a.is_empty())
                    .collect(),
            },
            None => EffectSpec {
                name: entry.to_string(),
                args: Vec::new(),
            },
        })
        .collect()
}

/// First argument named `name` in an attribute list.
pub fn attr<'a>(attrs: &'a [EffectSpec], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|a| a.name == name)
        .and_then(|a| a.args.first())
        .map(String::as_str)
}
