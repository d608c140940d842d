//! Inline cross-reference roles
//!
//! Roles are written `` {role}`target` `` or `` {role}`text <target>` ``,
//! optionally with a domain (`` {cpp:class}`...` ``). Roles inside fenced
//! code blocks and inline code spans are left alone.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref ROLE_REGEX: Regex = Regex::new(
        r"\{([A-Za-z][\w-]*(?::[A-Za-z][\w-]*)?)\}`([^`]+)`"
    ).unwrap();

    static ref LABELLED_REGEX: Regex = Regex::new(r"^(.*\S)\s*<([^<>]+)>$").unwrap();
}

/// A role occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRef<'a> {
    /// `cpp` in `cpp:class`
    pub domain: Option<&'a str>,
    /// `class` in `cpp:class`
    pub name: &'a str,
    /// Explicit link text
    pub text: Option<&'a str>,
    pub target: &'a str,
}

impl<'a> RoleRef<'a> {
    /// Parse the role name and the backquoted content
    pub fn parse(role: &'a str, content: &'a str) -> Self {
        let (domain, name) = match role.split_once(':') {
            Some((domain, name)) => (Some(domain), name),
            None => (None, role),
        };
        let (text, target) = match LABELLED_REGEX.captures(content) {
            Some(caps) => {
                let text = caps.get(1).map(|m| m.as_str());
                let target = caps.get(2).map(|m| m.as_str().trim()).unwrap_or(content);
                (text, target)
            }
            None => (None, content.trim()),
        };
        Self {
            domain,
            name,
            text,
            target,
        }
    }

    /// Text to display: the explicit text or the target
    pub fn label(&self) -> &'a str {
        self.text.unwrap_or(self.target)
    }

    /// The role as written, normalised
    pub fn markup(&self) -> String {
        match self.text {
            Some(text) => format!("{{{}}}`{} <{}>`", self.full_name(), text, self.target),
            None => format!("{{{}}}`{}`", self.full_name(), self.target),
        }
    }

    /// Full role name, `domain:name` or `name`
    pub fn full_name(&self) -> String {
        match self.domain {
            Some(domain) => format!("{}:{}", domain, self.name),
            None => self.name.to_string(),
        }
    }
}

/// Replace every role outside code with the result of `f`
pub fn replace_roles(text: &str, mut f: impl FnMut(&RoleRef<'_>) -> String) -> String {
    replace_roles_at(text, |role, _| f(role))
}

/// Like [`replace_roles`], also passing the 1-indexed line of each role
pub fn replace_roles_at(
    text: &str,
    mut f: impl FnMut(&RoleRef<'_>, usize) -> String,
) -> String {
    let mut out = String::with_capacity(text.len());
    let mut fences = FenceTracker::default();

    for (idx, line) in text.split_inclusive('\n').enumerate() {
        match fences.classify(line) {
            // directive fences (```{note}) hold Markdown, so roles inside are live
            FenceLine::Text => {
                let mut at_line = |role: &RoleRef<'_>| f(role, idx + 1);
                out.push_str(&replace_in_line(line, &mut at_line));
            }
            _ => out.push_str(line),
        }
    }
    out
}

/// How a line relates to fenced blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceLine<'l> {
    /// Ordinary Markdown, possibly inside a directive
    Text,
    /// Opening fence of a code block with its info string
    CodeOpen(&'l str),
    /// Line inside a code block
    Code,
    CodeClose,
    /// Opening fence of a directive, e.g. `{note}` or `{admonition} Title`
    DirectiveOpen(&'l str),
    DirectiveClose,
}

/// Line-by-line tracker for code blocks and nested directive fences
#[derive(Debug, Clone, Default)]
pub struct FenceTracker {
    code: Option<(char, usize)>,
    directives: Vec<(char, usize)>,
}

impl FenceTracker {
    /// Classify the next line
    pub fn classify<'l>(&mut self, line: &'l str) -> FenceLine<'l> {
        let trimmed = line.trim_start();
        if let Some((ch, len)) = self.code {
            if is_fence_close(trimmed, ch, len) {
                self.code = None;
                return FenceLine::CodeClose;
            }
            return FenceLine::Code;
        }
        let Some((ch, len)) = fence_open(trimmed) else {
            return FenceLine::Text;
        };
        let info = trimmed[len..].trim();
        let closes_directive = self
            .directives
            .last()
            .is_some_and(|&(c, l)| c == ch && len >= l && info.is_empty());
        if closes_directive {
            self.directives.pop();
            FenceLine::DirectiveClose
        } else if info.starts_with('{') && !CODE_DIRECTIVES.contains(&directive_name(info)) {
            self.directives.push((ch, len));
            FenceLine::DirectiveOpen(info)
        } else {
            self.code = Some((ch, len));
            FenceLine::CodeOpen(info)
        }
    }

    /// Number of open directives
    pub fn depth(&self) -> usize {
        self.directives.len()
    }
}

/// Directives whose content is source code rather than Markdown
pub const CODE_DIRECTIVES: &[&str] = &["code-block", "code", "sourcecode"];

/// `note` in `{note} arg`
pub fn directive_name(info: &str) -> &str {
    info.strip_prefix('{')
        .and_then(|rest| rest.split_once('}'))
        .map(|(name, _)| name.trim())
        .unwrap_or("")
}

/// Argument after the directive name: `Title` in `{admonition} Title`
pub fn directive_arg(info: &str) -> &str {
    info.split_once('}').map_or("", |(_, arg)| arg.trim())
}

/// Whether `line` closes a fence opened with `len` times `ch`
pub fn is_fence_close(line: &str, ch: char, len: usize) -> bool {
    let count = line.chars().take_while(|&c| c == ch).count();
    count >= len && line[count..].trim().is_empty()
}

/// Opening code fence: its character and length
pub fn fence_open(line: &str) -> Option<(char, usize)> {
    let ch = line.chars().next()?;
    if ch != '`' && ch != '~' {
        return None;
    }
    let len = line.chars().take_while(|&c| c == ch).count();
    (len >= 3).then_some((ch, len))
}

fn replace_in_line(line: &str, f: &mut impl FnMut(&RoleRef<'_>) -> String) -> String {
    // split into code spans and plain segments; roles only live in plain text
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    while !rest.is_empty() {
        let Some(m) = ROLE_REGEX.find(rest) else {
            out.push_str(rest);
            break;
        };
        let before = &rest[..m.start()];
        if inside_code_span(&out, before) {
            out.push_str(&rest[..m.end()]);
            rest = &rest[m.end()..];
            continue;
        }
        out.push_str(before);
        let replaced = ROLE_REGEX.replace(m.as_str(), |caps: &Captures| {
            let role = RoleRef::parse(
                caps.get(1).map_or("", |c| c.as_str()),
                caps.get(2).map_or("", |c| c.as_str()),
            );
            f(&role)
        });
        out.push_str(&replaced);
        rest = &rest[m.end()..];
    }
    out
}

/// Whether an odd number of backticks precedes the match on this line
fn inside_code_span(done: &str, before: &str) -> bool {
    let line_start = done.rfind('\n').map_or(done, |i| &done[i + 1..]);
    let ticks = line_start.matches('`').count() + before.matches('`').count();
    ticks % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse() {
        let role = RoleRef::parse("cpp:class", "the server <mboxid::modbus_tcp_server>");
        assert_eq!(role.domain, Some("cpp"));
        assert_eq!(role.name, "class");
        assert_eq!(role.text, Some("the server"));
        assert_eq!(role.target, "mboxid::modbus_tcp_server");
        assert_eq!(role.full_name(), "cpp:class");

        let role = RoleRef::parse("any", "errc");
        assert_eq!(role.label(), "errc");
        assert_eq!(role.domain, None);
    }

    #[test]
    fn test_replace_skips_code() {
        let text = "See {any}`errc`.\n\n```cpp\n{any}`kept`\n```\n\nInline `{any}`span`` too.\n";
        let out = replace_roles(text, |r| format!("<{}>", r.target));
        assert_eq!(
            out,
            "See <errc>.\n\n```cpp\n{any}`kept`\n```\n\nInline `{any}`span`` too.\n"
        );
    }

    #[test]
    fn test_fence_tracker_nesting() {
        let mut fences = FenceTracker::default();
        let lines = ["````{note}", "text", "```cpp", "x", "```", "````", "after"];
        let kinds: Vec<FenceLine<'_>> = lines.iter().map(|l| fences.classify(l)).collect();
        assert_eq!(
            kinds,
            vec![
                FenceLine::DirectiveOpen("{note}"),
                FenceLine::Text,
                FenceLine::CodeOpen("cpp"),
                FenceLine::Code,
                FenceLine::CodeClose,
                FenceLine::DirectiveClose,
                FenceLine::Text,
            ]
        );
        assert_eq!(fences.depth(), 0);

        assert_eq!(
            fences.classify("```{code-block} cpp"),
            FenceLine::CodeOpen("{code-block} cpp")
        );
        assert_eq!(fences.classify("{any}`x`"), FenceLine::Code);
    }

    #[test]
    fn test_replace_inside_directive() {
        let text = "````{note}\nUse {func}`run`.\n````\n";
        let out = replace_roles(text, |r| r.target.to_uppercase());
        assert_eq!(out, "````{note}\nUse RUN.\n````\n");
    }
}
