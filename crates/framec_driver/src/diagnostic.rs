//! Renders a pass's [`ErrorList`] as the plain text the CLI prints.
//!
//! Diagnostics are textual-only by design (no line/column rendering, no
//! source snippets); this module's job is just to group and colorize what
//! each [`CompileError`] already carries, the way the teacher crate's own
//! `Style` helper colorizes its error output.

use framec_base::{CompileError, ErrorKind, ErrorList};

/// ANSI escape code styling. Colors are opt-in per call; callers in a
/// non-terminal context (redirected output, tests) see the same text
/// without stripping anything themselves — the codes are inert outside a
/// terminal and most pagers/terminals ignore or pass them through cleanly.
pub struct Style;

impl Style {
    pub const RESET: &'static str = "\x1b[0m";
    pub const BOLD: &'static str = "\x1b[1m";
    pub const RED: &'static str = "\x1b[31m";
    pub const YELLOW: &'static str = "\x1b[33m";

    pub fn bold(s: &str) -> String {
        format!("{}{}{}", Self::BOLD, s, Self::RESET)
    }

    pub fn bold_red(s: &str) -> String {
        format!("{}{}{}{}", Self::BOLD, Self::RED, s, Self::RESET)
    }

    pub fn yellow(s: &str) -> String {
        format!("{}{}{}", Self::YELLOW, s, Self::RESET)
    }
}

fn kind_label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Lex => "lex error",
        ErrorKind::Parse => "parse error",
        ErrorKind::Name => "name error",
        ErrorKind::Type => "type error",
        ErrorKind::Arity => "arity error",
        ErrorKind::Internal => "internal error",
    }
}

/// One line per error: `<bold red>kind error<reset>: message (bytes a..b)`.
pub fn render_error(err: &CompileError) -> String {
    format!(
        "{}: {} ({}..{})",
        Style::bold_red(kind_label(err.kind)),
        err.message,
        err.span.start,
        err.span.end
    )
}

/// Renders every error in `errors`, one per line, prefixed with a summary
/// line naming the count. Returns an empty string for an empty list.
pub fn render_errors(errors: &ErrorList) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let mut out = String::new();
    out.push_str(&Style::bold(&format!("{} error(s)\n", errors.len())));
    for err in errors.iter() {
        out.push_str(&render_error(err));
        out.push('\n');
    }
    out
}

/// A warning is not a [`CompileError`] — it never blocks compilation — but
/// reuses the same rendering so the CLI's output reads consistently.
pub fn render_warning(message: &str) -> String {
    format!("{}: {}", Style::yellow("warning"), message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use framec_base::Span;

    #[test]
    fn empty_list_renders_to_empty_string() {
        assert_eq!(render_errors(&ErrorList::new()), "");
    }

    #[test]
    fn rendered_error_names_its_kind_and_span() {
        let mut errors = ErrorList::new();
        errors.push(CompileError::new(ErrorKind::Type, "bad operand", Span::new(4, 9)));
        let rendered = render_errors(&errors);
        assert!(rendered.contains("type error"));
        assert!(rendered.contains("bad operand"));
        assert!(rendered.contains("(4..9)"));
    }
}
