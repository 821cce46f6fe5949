use terminal_size::{terminal_size, Width};

use crate::constant::*;
use crate::model::Nargs;
use crate::parser::interface::*;
use crate::plan::{FlagSpec, ParserPlan};

struct Entry {
    left: String,
    middle: String,
}

struct Section {
    title: String,
    description: Option<String>,
    entries: Vec<Entry>,
}

/// Renders the help message of a [`ParserPlan`].
pub(crate) struct Printer {
    summary: Vec<String>,
    about: Option<String>,
    sections: Vec<Section>,
    terminal_width: Option<usize>,
}

// Let's assume the average word length is 5.
// Then 17 is a good minimum, because it allows precisely 3 words with a space between them.
const DEFAULT_MIDDLE_WIDTH: usize = 17;
// Longer left entries get a line of their own.
const MAXIMUM_LEFT_WIDTH: usize = 30;
const PADDING_WIDTH: usize = 3;
const MAIN_INDENT: usize = 1;

impl Printer {
    pub(crate) fn terminal(plan: &ParserPlan, about: Option<&str>, add_help: bool) -> Self {
        let terminal_width = if let Some((Width(terminal_width), _)) = terminal_size() {
            Some(terminal_width as usize)
        } else {
            None
        };

        Self::new(plan, about, add_help, terminal_width)
    }

    pub(crate) fn new(
        plan: &ParserPlan,
        about: Option<&str>,
        add_help: bool,
        terminal_width: Option<usize>,
    ) -> Self {
        let mut summary = Vec::default();
        let mut positionals = Vec::default();
        let mut sections = Vec::default();

        if add_help {
            summary.push(format!("[-{HELP_SHORT}]"));
        }

        for flag in plan.flags().filter(|f| !f.positional) {
            let option = flag.option_strings.first().cloned().unwrap_or_default();
            let grammar = grammar(&flag.metavar(), flag.nargs, true);

            if flag.required {
                summary.push(format!("{option}{grammar}"));
            } else {
                summary.push(format!("[{option}{grammar}]"));
            }
        }

        for flag in plan.flags().filter(|f| f.positional) {
            let grammar = grammar(&flag.metavar(), flag.nargs, false);
            summary.push(grammar.clone());
            positionals.push(Entry {
                left: grammar,
                middle: describe(flag),
            });
        }

        if !positionals.is_empty() {
            sections.push(Section {
                title: "positional arguments".to_string(),
                description: None,
                entries: positionals,
            });
        }

        if add_help {
            sections.push(Section {
                title: "options".to_string(),
                description: None,
                entries: vec![Entry {
                    left: format!("-{HELP_SHORT}, --{HELP_NAME}"),
                    middle: HELP_MESSAGE.to_string(),
                }],
            });
        }

        for group in plan.groups() {
            let entries: Vec<Entry> = group
                .flags()
                .iter()
                .filter(|f| !f.positional)
                .map(|flag| Entry {
                    left: option_flags(flag),
                    middle: describe(flag),
                })
                .collect();

            if !entries.is_empty() {
                sections.push(Section {
                    title: group.title().to_string(),
                    description: group.description().map(String::from),
                    entries,
                });
            }
        }

        Self {
            summary,
            about: about.map(String::from),
            sections,
            terminal_width,
        }
    }

    /// The help message, one line per entry.
    pub(crate) fn render(&self, program: &str) -> String {
        let entries = self.sections.iter().flat_map(|s| s.entries.iter());
        let left_column_width = entries
            .clone()
            .map(|e| e.left.len())
            .filter(|width| *width <= MAXIMUM_LEFT_WIDTH)
            .max()
            .unwrap_or(1);
        let middle_column_width = entries.map(|e| e.middle.len()).max().unwrap_or(0) + MAIN_INDENT;

        let column_renderer = match self.terminal_width {
            Some(tw) => ColumnRenderer::guided(
                PaddingWidth::new(PADDING_WIDTH),
                LeftWidth::new(left_column_width),
                MiddleWidth::new(middle_column_width),
                TotalWidth(tw),
            ),
            None => ColumnRenderer::new(
                PaddingWidth::new(PADDING_WIDTH),
                LeftWidth::new(left_column_width),
                MiddleWidth::new(std::cmp::min(middle_column_width, DEFAULT_MIDDLE_WIDTH)),
            ),
        };

        let mut lines = Vec::default();

        if self.summary.is_empty() {
            lines.push(format!("usage: {program}"));
        } else {
            lines.push(format!("usage: {program} {}", self.summary.join(" ")));
        }

        if let Some(about) = &self.about {
            lines.push(String::default());
            lines.push(about.clone());
        }

        for section in &self.sections {
            lines.push(String::default());
            lines.push(format!("{}:", section.title));

            if let Some(description) = &section.description {
                lines.push(format!("{:MAIN_INDENT$}{description}", ""));
            }

            for entry in &section.entries {
                lines.extend(column_renderer.render(MAIN_INDENT, &entry.left, &entry.middle));
            }
        }

        lines.join("\n")
    }
}

fn grammar(metavar: &str, nargs: Nargs, leading_space: bool) -> String {
    let grammar = match nargs {
        Nargs::Precisely(0) => return String::default(),
        Nargs::Precisely(n) => vec![metavar; n as usize].join(" "),
        Nargs::ZeroOrOne => format!("[{metavar}]"),
        Nargs::Any => format!("[{metavar} ...]"),
        Nargs::AtLeastOne => format!("{metavar} [...]"),
    };

    if leading_space {
        format!(" {grammar}")
    } else {
        grammar
    }
}

fn option_flags(flag: &FlagSpec) -> String {
    let grammar = grammar(&flag.metavar(), flag.nargs, true);

    flag.option_strings
        .iter()
        .map(|option| format!("{option}{grammar}"))
        .chain(flag.negative_option_strings.iter().cloned())
        .collect::<Vec<String>>()
        .join(", ")
}

fn describe(flag: &FlagSpec) -> String {
    let mut parts = Vec::default();

    if !flag.choices.is_empty() {
        parts.push(format!("{{{}}}", flag.choices.join(", ")));
    }

    if let Some(help) = &flag.help {
        parts.push(help.clone());
    }

    if let (Some(default), false) = (&flag.default, flag.required) {
        parts.push(format!("(default: {default})"));
    }

    parts.join(" ")
}

/// The tokens with a caret under the offending offset.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ErrorContext {
    offset: usize,
    tokens: Vec<String>,
}

impl ErrorContext {
    pub(crate) fn new(offset: usize, tokens: &[&str]) -> Self {
        Self {
            offset,
            tokens: tokens.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl std::fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tokens_length = 0;
        let mut projection = String::default();
        let mut projection_offset = 0;

        for (i, token) in self.tokens.iter().enumerate() {
            tokens_length += token.len();
            projection.push_str(token);

            if i + 1 < self.tokens.len() {
                projection.push(' ');

                if tokens_length <= self.offset {
                    projection_offset += 1;
                }
            }
        }

        write!(
            f,
            "{projection}\n{:width$}^",
            "",
            width = std::cmp::min(self.offset, tokens_length.saturating_sub(1)) + projection_offset
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;
    use crate::plan::{plan, AddedRecord, Settings};
    use crate::record::{Field, FieldType, Record, RecordDecl, RecordModel};
    use crate::test::assert_contains;
    use rstest::rstest;

    struct Hparams;

    impl Record for Hparams {
        fn declaration() -> RecordDecl {
            RecordDecl::new("Hparams")
                .help("Training knobs.")
                .field(Field::new("lr", FieldType::Float).help("The learning rate."))
                .field(Field::new("cuda", FieldType::Bool).default(false))
        }
    }

    struct Files;

    impl Record for Files {
        fn declaration() -> RecordDecl {
            RecordDecl::new("Files")
                .field(Field::new("source", FieldType::Str).positional().help("Where to read."))
                .field(
                    Field::new("mode", FieldType::Choice(vec!["fast".to_string(), "slow".to_string()]))
                        .default("fast"),
                )
                .field(
                    Field::new("rest", FieldType::list(FieldType::Str))
                        .positional()
                        .default_factory(|| Value::List(vec![])),
                )
        }
    }

    fn planned<R: Record>() -> ParserPlan {
        let (_, parser_plan) = plan(
            &RecordModel::new(),
            &[AddedRecord::new::<R>("config")],
            &Settings::default(),
        )
        .unwrap();
        parser_plan
    }

    #[test]
    fn render_empty() {
        // Setup
        let printer = Printer::new(&ParserPlan::default(), None, true, Some(120));

        // Execute
        let message = printer.render("program");

        // Verify
        assert_eq!(
            message,
            format!("usage: program [-h]\n\noptions:\n -h, --help   {HELP_MESSAGE}")
        );
    }

    #[test]
    fn render_empty_without_help() {
        let printer = Printer::new(&ParserPlan::default(), None, false, Some(120));
        assert_eq!(printer.render("program"), "usage: program");
    }

    #[test]
    fn render_group() {
        // Setup
        let printer = Printer::new(&planned::<Hparams>(), Some("Train a model."), true, Some(120));

        // Execute
        let message = printer.render("program");

        // Verify
        let expected = vec![
            "usage: program [-h] --lr LR [--cuda [CUDA]]".to_string(),
            String::default(),
            "Train a model.".to_string(),
            String::default(),
            "options:".to_string(),
            format!(" {:24}   {HELP_MESSAGE}", "-h, --help"),
            String::default(),
            "Hparams ['config']:".to_string(),
            " Training knobs.".to_string(),
            format!(" {:24}   The learning rate.", "--lr LR"),
            " --cuda [CUDA], --no-cuda   (default: false)".to_string(),
        ];
        assert_eq!(message, expected.join("\n"));
    }

    #[test]
    fn render_positional() {
        // Setup
        let printer = Printer::new(&planned::<Files>(), None, true, Some(120));

        // Execute
        let message = printer.render("program");

        // Verify
        assert_contains!(message, "usage: program [-h] [--mode MODE] SOURCE [REST ...]");
        assert_contains!(message, "positional arguments:\n SOURCE");
        assert_contains!(message, "Where to read.");
        assert_contains!(message, "{fast, slow} (default: fast)");
        assert!(!message.contains("--source"));
    }

    #[test]
    fn render_narrow_terminal() {
        // Setup
        let printer = Printer::new(&planned::<Hparams>(), None, true, Some(30));

        // Execute
        let message = printer.render("program");

        // Verify
        for line in message.lines().skip(1) {
            assert!(line.len() <= 50, "'{line}' is too wide");
        }
        assert_contains!(message, "The learning");
        assert!(!message.contains("The learning rate."));
    }

    #[rstest]
    #[case(Nargs::Precisely(0), "")]
    #[case(Nargs::Precisely(1), " LR")]
    #[case(Nargs::Precisely(2), " LR LR")]
    #[case(Nargs::ZeroOrOne, " [LR]")]
    #[case(Nargs::Any, " [LR ...]")]
    #[case(Nargs::AtLeastOne, " LR [...]")]
    fn grammar_nargs(#[case] nargs: Nargs, #[case] expected: &str) {
        assert_eq!(grammar("LR", nargs, true), expected);
        assert_eq!(grammar("LR", nargs, false), expected.trim_start());
    }

    #[test]
    fn error_context_tokens0() {
        assert_eq!(ErrorContext::new(0, &[]).to_string(), "\n^");
        assert_eq!(ErrorContext::new(3, &[]).to_string(), "\n^");
    }

    #[rstest]
    #[case(0, "abc 123\n^")]
    #[case(1, "abc 123\n ^")]
    #[case(2, "abc 123\n  ^")]
    #[case(3, "abc 123\n    ^")]
    #[case(4, "abc 123\n     ^")]
    #[case(5, "abc 123\n      ^")]
    #[case(6, "abc 123\n      ^")]
    #[case(9, "abc 123\n      ^")]
    fn error_context_tokens2(#[case] offset: usize, #[case] expected: &str) {
        assert_eq!(ErrorContext::new(offset, &["abc", "123"]).to_string(), expected);
    }
}
