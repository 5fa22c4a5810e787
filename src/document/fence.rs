//! Line-level scanning of notebook structure
//!
//! Recognises the metadata preamble (`---` ... `---`) and fenced blocks
//! (```` ```engine id=... name="..." ````). Only the structure the widgets
//! anchor to is extracted; everything else is left to the document parser.

use ropey::Rope;

/// One `key=value` attribute of a fence info string
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FenceAttribute {
    pub key: String,
    pub value: String,
    /// The attribute exactly as written
    pub raw: String,
}

/// A fenced block as it appears in the text
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FenceSpan {
    /// Line of the opening fence
    pub open_line: usize,
    /// Line of the closing fence, `None` when unterminated
    pub close_line: Option<usize>,
    /// Engine tag (first word of the info string)
    pub engine: String,
    pub attributes: Vec<FenceAttribute>,
}

impl FenceSpan {
    /// Block identifier, `None` when missing or malformed
    pub fn id(&self) -> Option<&str> {
        self.attribute("id").filter(|id| is_valid_identifier(id))
    }

    /// Display name
    pub fn name(&self) -> Option<&str> {
        self.attribute("name").filter(|name| !name.trim().is_empty())
    }

    /// The identifier field as written, e.g. `id="orders"`
    pub fn anchor_marker(&self) -> Option<&str> {
        self.id()?;
        self.attributes
            .iter()
            .find(|attr| attr.key == "id")
            .map(|attr| attr.raw.as_str())
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.key == key)
            .map(|attr| attr.value.as_str())
    }

    /// Last line covered by the fence
    pub fn end_line(&self, line_count: usize) -> usize {
        self.close_line
            .unwrap_or_else(|| line_count.saturating_sub(1).max(self.open_line))
    }
}

/// The leading metadata block
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreambleSpan {
    pub open_line: usize,
    pub close_line: usize,
    /// Parameter names in declaration order, with their defaults
    pub params: Vec<(String, Option<String>)>,
}

/// Everything the widgets need to know about a document's structure
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocumentOutline {
    pub preamble: Option<PreambleSpan>,
    pub fences: Vec<FenceSpan>,
    pub line_count: usize,
}

impl DocumentOutline {
    /// Scan the whole text once
    pub fn scan(text: &Rope) -> Self {
        let lines: Vec<String> = text
            .lines()
            .map(|line| {
                let line: String = line.chars().collect();
                line.trim_end_matches(['\n', '\r']).to_string()
            })
            .collect();

        let preamble = scan_preamble(&lines);
        let body_start = preamble.as_ref().map_or(0, |p| p.close_line + 1);

        let mut fences = Vec::new();
        let mut open: Option<(FenceSpan, char, usize)> = None;

        for (line_idx, line) in lines.iter().enumerate().skip(body_start) {
            match open.take() {
                Some((mut span, fence_char, fence_len)) => {
                    if is_closing_fence(line, fence_char, fence_len) {
                        span.close_line = Some(line_idx);
                        fences.push(span);
                    } else {
                        open = Some((span, fence_char, fence_len));
                    }
                }
                None => {
                    if let Some((fence_char, fence_len, info)) = opening_fence(line) {
                        let (engine, attributes) = parse_info_string(info);
                        let span = FenceSpan {
                            open_line: line_idx,
                            close_line: None,
                            engine,
                            attributes,
                        };
                        open = Some((span, fence_char, fence_len));
                    }
                }
            }
        }

        if let Some((span, _, _)) = open {
            fences.push(span);
        }

        Self {
            preamble,
            fences,
            line_count: lines.len(),
        }
    }

    /// Fences that carry a parseable identifier
    pub fn identified_fences(&self) -> impl Iterator<Item = (&str, &FenceSpan)> {
        self.fences
            .iter()
            .filter_map(|fence| fence.id().map(|id| (id, fence)))
    }
}

fn scan_preamble(lines: &[String]) -> Option<PreambleSpan> {
    if lines.first().map(|l| l.trim_end()) != Some("---") {
        return None;
    }

    let close_line = lines
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, line)| matches!(line.trim_end(), "---" | "..."))
        .map(|(idx, _)| idx)?;

    Some(PreambleSpan {
        open_line: 0,
        close_line,
        params: parse_params(&lines[1..close_line]),
    })
}

/// Parse the `params:` (or `parameters:`) section of the preamble
fn parse_params(lines: &[String]) -> Vec<(String, Option<String>)> {
    let mut params = Vec::new();
    let mut in_params = false;
    let mut entry_indent: Option<usize> = None;

    for line in lines {
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }

        let indent = indent_of(line);
        if indent == 0 {
            let key = line.split(':').next().unwrap_or("").trim();
            in_params = matches!(key, "params" | "parameters");
            entry_indent = None;
            continue;
        }
        if !in_params {
            continue;
        }

        // Nested keys of a param (e.g. `type: int`) sit deeper than the name
        let entry_indent = *entry_indent.get_or_insert(indent);
        if indent > entry_indent {
            continue;
        }

        let entry = line.trim();
        let entry = entry.strip_prefix("- ").unwrap_or(entry).trim();
        let (name, default) = match entry.split_once(':') {
            Some((name, value)) => {
                let value = value.trim().trim_matches(['"', '\'']);
                (name.trim(), (!value.is_empty()).then(|| value.to_string()))
            }
            None => (entry, None),
        };

        if is_valid_identifier(name) {
            params.push((name.to_string(), default));
        }
    }

    params
}

fn indent_of(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

/// Returns fence char, fence length and the info string
fn opening_fence(line: &str) -> Option<(char, usize, &str)> {
    let trimmed = line.trim_start();
    if indent_of(line) > 3 {
        return None;
    }
    let fence_char = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let fence_len = trimmed.chars().take_while(|c| *c == fence_char).count();
    if fence_len < 3 {
        return None;
    }
    let info = trimmed[fence_len..].trim();
    // Backtick fences cannot carry backticks in their info string
    if fence_char == '`' && info.contains('`') {
        return None;
    }
    Some((fence_char, fence_len, info))
}

fn is_closing_fence(line: &str, fence_char: char, fence_len: usize) -> bool {
    let trimmed = line.trim();
    let run = trimmed.chars().take_while(|c| *c == fence_char).count();
    run >= fence_len && run == trimmed.chars().count()
}

/// Split an info string into the engine tag and its attributes
fn parse_info_string(info: &str) -> (String, Vec<FenceAttribute>) {
    let tokens = tokenize(info);
    let mut tokens = tokens.into_iter();

    let engine = match tokens.next() {
        Some(first) if !first.contains('=') => first,
        Some(first) => {
            // No engine tag, the first token is already an attribute
            let mut attributes = Vec::new();
            attributes.extend(parse_attribute(&first));
            attributes.extend(tokens.filter_map(|t| parse_attribute(&t)));
            return (String::new(), attributes);
        }
        None => String::new(),
    };

    let attributes = tokens.filter_map(|t| parse_attribute(&t)).collect();
    (engine, attributes)
}

fn parse_attribute(token: &str) -> Option<FenceAttribute> {
    let (key, value) = token.split_once('=')?;
    let key = key.trim().trim_start_matches(['{', ',']).trim();
    let value = value.trim().trim_end_matches(['}', ',']);
    if key.is_empty() {
        return None;
    }
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    Some(FenceAttribute {
        key: key.to_string(),
        value: value.to_string(),
        raw: token.trim().to_string(),
    })
}

/// Whitespace split that keeps double-quoted runs together
fn tokenize(info: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in info.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

pub(crate) fn is_valid_identifier(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outline(text: &str) -> DocumentOutline {
        DocumentOutline::scan(&Rope::from_str(text))
    }

    #[test]
    fn test_preamble_with_params() {
        let doc = outline(
            "---\ntitle: Sales\nparams:\n  - region: EU\n  limit: 10\n    type: int\n---\n# Body\n",
        );
        let preamble = doc.preamble.unwrap();
        assert_eq!(preamble.close_line, 6);
        assert_eq!(
            preamble.params,
            vec![
                ("region".to_string(), Some("EU".to_string())),
                ("limit".to_string(), Some("10".to_string())),
            ]
        );
    }

    #[test]
    fn test_unterminated_preamble_is_ignored() {
        let doc = outline("---\ntitle: x\n```sql id=a\nselect 1\n```\n");
        assert!(doc.preamble.is_none());
        assert_eq!(doc.fences.len(), 1);
    }

    #[test]
    fn test_fence_attributes() {
        let doc = outline("```sql id=orders name=\"Orders by day\"\nselect *\n```\n");
        let fence = &doc.fences[0];
        assert_eq!(fence.engine, "sql");
        assert_eq!(fence.id(), Some("orders"));
        assert_eq!(fence.name(), Some("Orders by day"));
        assert_eq!(fence.anchor_marker(), Some("id=orders"));
        assert_eq!(fence.close_line, Some(2));
    }

    #[test]
    fn test_fence_without_identifier() {
        let doc = outline("```python\nprint(1)\n```\n```sql id=\"bad id\"\n```\n");
        assert_eq!(doc.fences.len(), 2);
        assert_eq!(doc.fences[0].id(), None);
        assert_eq!(doc.fences[1].id(), None);
        assert_eq!(doc.identified_fences().count(), 0);
    }

    #[test]
    fn test_longer_fence_contains_shorter() {
        let doc = outline("````md id=outer\n```sql id=inner\n```\n````\n");
        assert_eq!(doc.fences.len(), 1);
        assert_eq!(doc.fences[0].id(), Some("outer"));
        assert_eq!(doc.fences[0].close_line, Some(3));
    }

    #[test]
    fn test_unclosed_fence_runs_to_end() {
        let doc = outline("intro\n```sql id=a\nselect 1");
        let fence = &doc.fences[0];
        assert_eq!(fence.close_line, None);
        assert_eq!(fence.end_line(doc.line_count), 2);
    }
}
