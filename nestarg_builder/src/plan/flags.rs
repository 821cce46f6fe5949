use crate::error::PlanError;
use crate::model::{DashesOrUnderscores, NestedFieldDisplay};
use crate::plan::{PlannedField, Settings};

/// A generated option string, bound to the destination of its field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFlag {
    /// The option string (ex: `--model.lr`).
    pub option: String,
    /// The destination it feeds.
    pub dest: String,
    /// Whether this is the preferred spelling of the field name.
    pub primary: bool,
    /// Whether this is the negative form of a boolean flag (ex: `--no-cuda`).
    pub negative: bool,
}

/// The option strings for `field`, given its current qualification.
///
/// Ordered shortest first; positional fields get none.
pub(crate) fn candidate_flags(
    field: &PlannedField,
    settings: &Settings,
) -> Result<Vec<CandidateFlag>, PlanError> {
    if field.field.positional {
        return Ok(Vec::default());
    }

    let mut names: Vec<(Option<&str>, &str)> = vec![(None, field.field.name.as_str())];

    for alias in &field.field.aliases {
        let stripped = alias.trim_start_matches('-');
        let dashes = &alias[..alias.len() - stripped.len()];

        if stripped.is_empty() || dashes.len() > 2 || alias.chars().any(char::is_whitespace) {
            return Err(PlanError::InvalidAlias {
                alias: alias.clone(),
                dest: field.dest.clone(),
            });
        }

        names.push((if dashes.is_empty() { None } else { Some(dashes) }, stripped));
    }

    let mut options: Vec<String> = Vec::default();
    let mut primary: Option<String> = None;

    for (dashes, name) in names {
        for body in bodies(field, name, settings.nested_field_display) {
            for spelling in spellings(&body, settings.dashes_or_underscores) {
                let spelled = match dashes {
                    Some(dashes) => vec![format!("{dashes}{spelling}")],
                    None if spelling.chars().count() == 1 => {
                        vec![format!("-{spelling}"), format!("--{spelling}")]
                    }
                    None => vec![format!("--{spelling}")],
                };

                for option in spelled {
                    if primary.is_none() && option.starts_with("--") {
                        primary = Some(option.clone());
                    }

                    if !options.contains(&option) {
                        options.push(option);
                    }
                }
            }
        }
    }

    let negatives: Vec<String> = if has_negative(field) {
        options
            .iter()
            .filter(|option| option.starts_with("--"))
            .map(|option| negate(option))
            .collect()
    } else {
        Vec::default()
    };

    let mut candidates: Vec<CandidateFlag> = options
        .into_iter()
        .map(|option| CandidateFlag {
            primary: primary.as_ref() == Some(&option),
            option,
            dest: field.dest.clone(),
            negative: false,
        })
        .collect();
    candidates.sort_by_key(|c| c.option.len());
    let mut negatives: Vec<CandidateFlag> = negatives
        .into_iter()
        .map(|option| CandidateFlag {
            option,
            dest: field.dest.clone(),
            primary: false,
            negative: true,
        })
        .collect();
    negatives.sort_by_key(|c| c.option.len());
    candidates.extend(negatives);
    Ok(candidates)
}

fn bodies(field: &PlannedField, name: &str, display: NestedFieldDisplay) -> Vec<String> {
    let words: Vec<&str> = field.parent_dest.split('.').collect();
    let flat = words[words.len() - field.words()..]
        .iter()
        .copied()
        .chain(std::iter::once(name))
        .collect::<Vec<_>>()
        .join(".");
    let flat = format!("{}{flat}", field.prefix);
    let nested = format!("{}{}.{name}", field.prefix, field.parent_dest);

    match display {
        NestedFieldDisplay::Shortest => vec![flat],
        NestedFieldDisplay::FullPath => vec![nested],
        NestedFieldDisplay::Both if flat == nested => vec![flat],
        NestedFieldDisplay::Both => vec![flat, nested],
    }
}

fn spellings(body: &str, dashes_or_underscores: DashesOrUnderscores) -> Vec<String> {
    let dashed = body.replace('_', "-");

    match dashes_or_underscores {
        DashesOrUnderscores::Underscore => vec![body.to_string()],
        DashesOrUnderscores::Dash => vec![dashed],
        DashesOrUnderscores::Both if dashed == body => vec![dashed],
        DashesOrUnderscores::Both => vec![body.to_string(), dashed],
    }
}

fn has_negative(field: &PlannedField) -> bool {
    field.field.field_type.is_bool()
        && !field.is_merged()
        && field.field.overrides.nargs.is_none()
        && field.selector.is_none()
}

/// Insert `no-` before the last dotted segment: `--model.cuda` becomes `--model.no-cuda`.
fn negate(option: &str) -> String {
    match option.rsplit_once('.') {
        Some((head, last)) => format!("{head}.no-{last}"),
        None => format!("--no-{}", option.trim_start_matches('-')),
    }
}
