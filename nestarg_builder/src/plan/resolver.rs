use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::constant::reserved_options;
use crate::error::PlanError;
use crate::model::ConflictResolution;
use crate::plan::flags::candidate_flags;
use crate::plan::{PlannedField, PlannedRecord, Qualifier, Settings};
use crate::record::FieldType;

/// The bound on rewrite steps before a conflict is declared unresolvable.
pub(crate) const MAX_ATTEMPTS: usize = 50;

/// An option string shared by several planned fields (or colliding with help).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Conflict {
    pub(crate) option: String,
    pub(crate) members: Vec<usize>,
    pub(crate) reserved: bool,
}

impl Conflict {
    fn destinations(&self, fields: &[PlannedField]) -> Vec<String> {
        self.members
            .iter()
            .flat_map(|i| fields[*i].destinations.iter().cloned())
            .collect()
    }
}

/// Rewrite `fields` until no conflicts remain.
pub(crate) fn resolve_conflicts(
    fields: Vec<PlannedField>,
    records: &[PlannedRecord],
    settings: &Settings,
) -> Result<Vec<PlannedField>, PlanError> {
    let mut current = fields;

    for attempt in 1..=MAX_ATTEMPTS {
        let next = resolve(&current, records, settings)?;

        if next == current {
            debug!("Conflicts resolved after {attempt} attempt(s).");
            return Ok(next);
        }

        current = next;
    }

    match find_conflicts(&current, settings)?.into_iter().next() {
        None => Ok(current),
        Some(conflict) => Err(PlanError::UnresolvableConflict {
            destinations: conflict.destinations(&current),
            option: conflict.option,
        }),
    }
}

/// One rewrite step: every conflict found is rewritten per the conflict resolution.
///
/// Conflicts sharing a member with an earlier conflict wait for the next step.
/// Returns `fields` unchanged when there are no conflicts.
pub(crate) fn resolve(
    fields: &[PlannedField],
    records: &[PlannedRecord],
    settings: &Settings,
) -> Result<Vec<PlannedField>, PlanError> {
    let conflicts = find_conflicts(fields, settings)?;
    let mut next = fields.to_vec();
    let mut touched: HashSet<usize> = HashSet::default();
    let mut absorbed: HashSet<usize> = HashSet::default();

    for conflict in conflicts {
        if conflict.members.iter().any(|i| touched.contains(i)) {
            continue;
        }

        debug!(
            "Resolving '{}' between {:?} with {:?}.",
            conflict.option,
            conflict.destinations(&next),
            settings.conflict_resolution
        );
        touched.extend(conflict.members.iter().copied());

        match settings.conflict_resolution {
            ConflictResolution::None => {
                return Err(PlanError::ConflictResolution {
                    destinations: conflict.destinations(&next),
                    option: conflict.option,
                });
            }
            ConflictResolution::Explicit => explicit(&mut next, &conflict)?,
            ConflictResolution::Auto => auto(&mut next, &conflict, settings)?,
            ConflictResolution::AlwaysMerge => {
                let mergeable = !conflict.reserved
                    && conflict
                        .members
                        .iter()
                        .all(|i| next[*i].selector.is_none() && next[*i].min_words == 0);

                if mergeable {
                    absorbed.extend(merge(&mut next, &conflict, records)?);
                } else {
                    explicit(&mut next, &conflict)?;
                }
            }
        }
    }

    if absorbed.is_empty() {
        Ok(next)
    } else {
        Ok(next
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !absorbed.contains(i))
            .map(|(_, field)| field)
            .collect())
    }
}

/// The conflicts, in the plan order of their option strings.
pub(crate) fn find_conflicts(
    fields: &[PlannedField],
    settings: &Settings,
) -> Result<Vec<Conflict>, PlanError> {
    let reserved: Vec<String> = if settings.add_help {
        reserved_options().to_vec()
    } else {
        Vec::default()
    };
    let mut owners: HashMap<String, Vec<usize>> = HashMap::default();
    let mut order: Vec<String> = Vec::default();

    for (i, field) in fields.iter().enumerate() {
        for candidate in candidate_flags(field, settings)? {
            let members = owners.entry(candidate.option.clone()).or_insert_with(|| {
                order.push(candidate.option.clone());
                Vec::default()
            });

            if !members.contains(&i) {
                members.push(i);
            }
        }
    }

    let mut conflicts = Vec::default();

    for option in order {
        if let Some(members) = owners.remove(&option) {
            let is_reserved = reserved.contains(&option);

            if members.len() > 1 || is_reserved {
                conflicts.push(Conflict {
                    option,
                    members,
                    reserved: is_reserved,
                });
            }
        }
    }

    Ok(conflicts)
}

/// Every field of the conflicting records uses its full destination path.
/// Merged fields keep their shared flag.
fn explicit(fields: &mut [PlannedField], conflict: &Conflict) -> Result<(), PlanError> {
    let owners: HashSet<usize> = conflict.members.iter().map(|i| fields[*i].record).collect();
    let mut changed = false;

    for field in fields.iter_mut() {
        if owners.contains(&field.record)
            && !field.is_merged()
            && field.qualifier != Qualifier::Explicit
        {
            field.qualifier = Qualifier::Explicit;
            changed = true;
        }
    }

    if changed {
        Ok(())
    } else {
        Err(unresolvable(fields, conflict))
    }
}

/// The fewest trailing destination words that tell the members apart; otherwise their full paths.
fn auto(
    fields: &mut [PlannedField],
    conflict: &Conflict,
    settings: &Settings,
) -> Result<(), PlanError> {
    let members = &conflict.members;

    if members
        .iter()
        .all(|i| fields[*i].qualifier == Qualifier::Explicit)
    {
        return Err(unresolvable(fields, conflict));
    }

    let current = members.iter().map(|i| fields[*i].words()).max().unwrap_or(0);
    let depth = members
        .iter()
        .map(|i| fields[*i].word_count())
        .max()
        .unwrap_or(0);
    let reserved: Vec<String> = if conflict.reserved {
        reserved_options().to_vec()
    } else {
        Vec::default()
    };

    for k in (current + 1)..=depth {
        let trial: Vec<PlannedField> = members
            .iter()
            .map(|i| qualify(&fields[*i], k))
            .collect();
        let mut seen: HashSet<String> = HashSet::default();
        let mut distinct = true;

        'members: for field in &trial {
            for candidate in candidate_flags(field, settings)? {
                if reserved.contains(&candidate.option) || !seen.insert(candidate.option) {
                    distinct = false;
                    break 'members;
                }
            }
        }

        if distinct {
            debug!("Qualifying '{}' with {k} word(s).", conflict.option);

            for (i, field) in members.iter().zip(trial) {
                fields[*i] = field;
            }

            return Ok(());
        }
    }

    debug!("Qualifying '{}' with the full path.", conflict.option);

    for i in members {
        fields[*i].qualifier = Qualifier::Explicit;
    }

    Ok(())
}

fn qualify(field: &PlannedField, k: usize) -> PlannedField {
    let mut field = field.clone();

    if field.qualifier != Qualifier::Explicit {
        field.qualifier = if k >= field.word_count() {
            Qualifier::Explicit
        } else {
            Qualifier::Words(k)
        };
    }

    field
}

/// Fuse the members into the first, in registration order.
/// Returns the absorbed members.
fn merge(
    fields: &mut [PlannedField],
    conflict: &Conflict,
    records: &[PlannedRecord],
) -> Result<Vec<usize>, PlanError> {
    let first = conflict.members[0];
    let name = fields[first].field.name.clone();
    let expected = shape(&records[fields[first].record]);
    let inconsistent = |reason: &str| PlanError::InconsistentArgument {
        option: conflict.option.clone(),
        destinations: conflict.destinations(fields),
        reason: reason.to_string(),
    };

    for i in &conflict.members {
        let field = &fields[*i];

        if field.field.name != name {
            return Err(inconsistent("the fields have different names."));
        }

        if field.field.field_type.is_list() || field.field.overrides.nargs.is_some() {
            return Err(inconsistent("multi-valued fields cannot be merged."));
        }

        if shape(&records[field.record]) != expected {
            return Err(inconsistent("the records are not structurally identical."));
        }
    }

    let destinations: Vec<String> = conflict.destinations(fields);

    if u8::try_from(destinations.len()).is_err() {
        return Err(inconsistent("too many destinations to merge."));
    }

    debug!("Merging '{}' into {destinations:?}.", conflict.option);
    fields[first].destinations = destinations;
    fields[first].qualifier = Qualifier::Words(0);
    Ok(conflict.members[1..].to_vec())
}

fn shape(record: &PlannedRecord) -> Vec<(&str, &FieldType)> {
    record
        .fields
        .iter()
        .map(|f| (f.name.as_str(), &f.field_type))
        .collect()
}

fn unresolvable(fields: &[PlannedField], conflict: &Conflict) -> PlanError {
    PlanError::UnresolvableConflict {
        option: conflict.option.clone(),
        destinations: conflict.destinations(fields),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NestedFieldDisplay, Nargs};
    use crate::plan::walker::walk;
    use crate::plan::{AddedRecord, Walk};
    use crate::record::{Field, Record, RecordDecl, RecordModel, RecordRef, Subgroup};
    use rstest::rstest;

    struct Hparams;

    impl Record for Hparams {
        fn declaration() -> RecordDecl {
            RecordDecl::new("Hparams")
                .field(Field::new("rate", FieldType::Float).default(0.1))
                .field(Field::new("cuda", FieldType::Bool).default(true))
        }
    }

    struct Other;

    impl Record for Other {
        fn declaration() -> RecordDecl {
            RecordDecl::new("Other")
                .field(Field::new("rate", FieldType::Float).default(0.2))
                .field(Field::new("size", FieldType::Int).default(3))
        }
    }

    struct Listed;

    impl Record for Listed {
        fn declaration() -> RecordDecl {
            RecordDecl::new("Listed").field(Field::new("rate", FieldType::list(FieldType::Float)))
        }
    }

    struct Helpful;

    impl Record for Helpful {
        fn declaration() -> RecordDecl {
            RecordDecl::new("Helpful").field(Field::new("help", FieldType::Str).default("x"))
        }
    }

    struct Pair;

    impl Record for Pair {
        fn declaration() -> RecordDecl {
            RecordDecl::new("Pair")
                .field(Field::new("left", FieldType::record::<Other>()))
                .field(Field::new("right", FieldType::record::<Other>()))
        }
    }

    struct Wide;

    impl Record for Wide {
        fn declaration() -> RecordDecl {
            RecordDecl::new("Wide").field(Field::new("width", FieldType::Int).default(4))
        }
    }

    struct Choosy;

    impl Record for Choosy {
        fn declaration() -> RecordDecl {
            RecordDecl::new("Choosy")
                .field(Field::new(
                    "choice",
                    FieldType::Subgroup(
                        Subgroup::new()
                            .variant("wide", RecordRef::of::<Wide>())
                            .with_default("wide"),
                    ),
                ))
                .field(Field::new("rate", FieldType::Float).default(0.3))
        }
    }

    fn walked(added: &[AddedRecord]) -> Walk {
        walk(&RecordModel::new(), added).unwrap()
    }

    fn settings(conflict_resolution: ConflictResolution) -> Settings {
        Settings {
            conflict_resolution,
            ..Settings::default()
        }
    }

    fn options(fields: &[PlannedField], settings: &Settings) -> Vec<Vec<String>> {
        fields
            .iter()
            .map(|f| {
                candidate_flags(f, settings)
                    .unwrap()
                    .into_iter()
                    .map(|c| c.option)
                    .collect()
            })
            .collect()
    }

    #[test]
    fn resolve_no_conflict() {
        // Setup
        let walk = walked(&[AddedRecord::new::<Hparams>("model")]);
        let settings = settings(ConflictResolution::Auto);

        // Execute
        let resolved = resolve(&walk.fields, &walk.records, &settings).unwrap();

        // Verify
        assert_eq!(resolved, walk.fields);
    }

    #[test]
    fn resolve_auto() {
        // Setup
        let walk = walked(&[
            AddedRecord::new::<Hparams>("model1"),
            AddedRecord::new::<Other>("model2"),
        ]);
        let settings = settings(ConflictResolution::Auto);

        // Execute
        let resolved = resolve_conflicts(walk.fields.clone(), &walk.records, &settings).unwrap();

        // Verify
        assert_eq!(
            options(&resolved, &settings),
            vec![
                vec!["--model1.rate"],
                vec!["--cuda", "--no-cuda"],
                vec!["--model2.rate"],
                vec!["--size"],
            ]
        );
        assert!(find_conflicts(&resolved, &settings).unwrap().is_empty());
    }

    #[test]
    fn resolve_auto_shortest_suffix() {
        // Setup
        let walk = walked(&[AddedRecord::new::<Pair>("pair")]);
        let settings = settings(ConflictResolution::Auto);

        // Execute
        let resolved = resolve_conflicts(walk.fields.clone(), &walk.records, &settings).unwrap();

        // Verify
        assert_eq!(
            options(&resolved, &settings),
            vec![
                vec!["--left.rate"],
                vec!["--left.size"],
                vec!["--right.rate"],
                vec!["--right.size"],
            ]
        );
    }

    #[test]
    fn resolve_auto_deeper() {
        // Setup
        let walk = walked(&[
            AddedRecord::new::<Pair>("a.pair"),
            AddedRecord::new::<Pair>("b.pair"),
        ]);
        let settings = settings(ConflictResolution::Auto);

        // Execute
        let resolved = resolve_conflicts(walk.fields.clone(), &walk.records, &settings).unwrap();

        // Verify
        let flags = options(&resolved, &settings);
        assert_eq!(flags[0], vec!["--a.pair.left.rate"]);
        assert_eq!(flags[4], vec!["--b.pair.left.rate"]);
        assert!(find_conflicts(&resolved, &settings).unwrap().is_empty());
    }

    #[rstest]
    #[case(NestedFieldDisplay::Shortest)]
    #[case(NestedFieldDisplay::Both)]
    fn resolve_explicit(#[case] nested_field_display: NestedFieldDisplay) {
        // Setup
        let walk = walked(&[
            AddedRecord::new::<Hparams>("model1"),
            AddedRecord::new::<Other>("model2"),
        ]);
        let settings = Settings {
            nested_field_display,
            ..settings(ConflictResolution::Explicit)
        };

        // Execute
        let resolved = resolve_conflicts(walk.fields.clone(), &walk.records, &settings).unwrap();

        // Verify
        assert_eq!(
            options(&resolved, &settings),
            vec![
                vec!["--model1.rate"],
                vec!["--model1.cuda", "--model1.no-cuda"],
                vec!["--model2.rate"],
                vec!["--model2.size"],
            ]
        );
    }

    #[test]
    fn resolve_none() {
        let walk = walked(&[
            AddedRecord::new::<Hparams>("model1"),
            AddedRecord::new::<Other>("model2"),
        ]);
        let result = resolve_conflicts(
            walk.fields.clone(),
            &walk.records,
            &settings(ConflictResolution::None),
        );
        assert_matches!(
            result,
            Err(PlanError::ConflictResolution { option, destinations })
                if option == "--rate" && destinations == vec!["model1.rate", "model2.rate"]
        );
    }

    #[test]
    fn resolve_none_prefixed() {
        let walk = walked(&[
            AddedRecord::new::<Hparams>("model1").prefix("a_"),
            AddedRecord::new::<Other>("model2").prefix("b_"),
        ]);
        let settings = settings(ConflictResolution::None);
        let resolved = resolve_conflicts(walk.fields.clone(), &walk.records, &settings).unwrap();
        assert_eq!(options(&resolved, &settings)[0], vec!["--a_rate"]);
        assert_eq!(options(&resolved, &settings)[2], vec!["--b_rate"]);
    }

    #[test]
    fn resolve_merge() {
        // Setup
        let walk = walked(&[
            AddedRecord::new::<Hparams>("a"),
            AddedRecord::new::<Hparams>("b"),
            AddedRecord::new::<Hparams>("c"),
        ]);
        let settings = settings(ConflictResolution::AlwaysMerge);

        // Execute
        let resolved = resolve_conflicts(walk.fields.clone(), &walk.records, &settings).unwrap();

        // Verify
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].destinations, vec!["a.rate", "b.rate", "c.rate"]);
        assert_eq!(resolved[0].nargs(), Nargs::Precisely(3));
        assert_eq!(resolved[1].destinations, vec!["a.cuda", "b.cuda", "c.cuda"]);
        assert_eq!(
            options(&resolved, &settings),
            vec![vec!["--rate"], vec!["--cuda"]]
        );
    }

    #[test]
    fn resolve_merge_beside_explicit_selector() {
        // Setup
        let walk = walked(&[AddedRecord::new::<Choosy>("a"), AddedRecord::new::<Choosy>("b")]);
        let settings = settings(ConflictResolution::AlwaysMerge);

        // Execute
        let resolved = resolve_conflicts(walk.fields.clone(), &walk.records, &settings).unwrap();

        // Verify
        let merged = resolved
            .iter()
            .find(|field| field.field.name == "rate" && field.record == 0)
            .unwrap();
        assert_eq!(merged.destinations, vec!["a.rate", "b.rate"]);
        assert!(options(&resolved, &settings).contains(&vec!["--rate".to_string()]));
        assert!(options(&resolved, &settings).contains(&vec!["--a.choice".to_string()]));
        assert!(options(&resolved, &settings).contains(&vec!["--b.choice".to_string()]));
        assert!(find_conflicts(&resolved, &settings).unwrap().is_empty());
    }

    #[test]
    fn resolve_merge_too_many() {
        // Setup
        let added: Vec<AddedRecord> = (0..256)
            .map(|i| AddedRecord::new::<Hparams>(format!("m{i}")))
            .collect();
        let walk = walked(&added);

        // Execute
        let result = resolve_conflicts(
            walk.fields.clone(),
            &walk.records,
            &settings(ConflictResolution::AlwaysMerge),
        );

        // Verify
        assert_matches!(
            result,
            Err(PlanError::InconsistentArgument { option, reason, .. })
                if option == "--rate" && reason == "too many destinations to merge."
        );
    }

    #[test]
    fn resolve_merge_inconsistent() {
        let walk = walked(&[
            AddedRecord::new::<Hparams>("model1"),
            AddedRecord::new::<Other>("model2"),
        ]);
        let result = resolve_conflicts(
            walk.fields.clone(),
            &walk.records,
            &settings(ConflictResolution::AlwaysMerge),
        );
        assert_matches!(result, Err(PlanError::InconsistentArgument { option, .. }) if option == "--rate");
    }

    #[test]
    fn resolve_merge_list() {
        let walk = walked(&[
            AddedRecord::new::<Listed>("a"),
            AddedRecord::new::<Listed>("b"),
        ]);
        let result = resolve_conflicts(
            walk.fields.clone(),
            &walk.records,
            &settings(ConflictResolution::AlwaysMerge),
        );
        assert_matches!(result, Err(PlanError::InconsistentArgument { reason, .. }) if reason == "multi-valued fields cannot be merged.");
    }

    #[rstest]
    #[case(ConflictResolution::Auto)]
    #[case(ConflictResolution::Explicit)]
    #[case(ConflictResolution::AlwaysMerge)]
    fn resolve_reserved(#[case] conflict_resolution: ConflictResolution) {
        let walk = walked(&[AddedRecord::new::<Helpful>("config")]);
        let settings = settings(conflict_resolution);
        let resolved = resolve_conflicts(walk.fields.clone(), &walk.records, &settings).unwrap();
        assert_eq!(options(&resolved, &settings), vec![vec!["--config.help"]]);
    }

    #[test]
    fn resolve_reserved_without_help() {
        let walk = walked(&[AddedRecord::new::<Helpful>("config")]);
        let settings = Settings {
            add_help: false,
            ..settings(ConflictResolution::None)
        };
        let resolved = resolve_conflicts(walk.fields.clone(), &walk.records, &settings).unwrap();
        assert_eq!(options(&resolved, &settings), vec![vec!["--help"]]);
    }

    #[test]
    fn resolve_unresolvable() {
        // Setup
        let walk = walked(&[
            AddedRecord::new::<Hparams>("m").prefix("n."),
            AddedRecord::new::<Hparams>("n.m"),
        ]);
        let settings = settings(ConflictResolution::Auto);
        let mut fields = walk.fields.clone();
        fields
            .iter_mut()
            .for_each(|field| field.qualifier = Qualifier::Explicit);

        // Execute
        let result = resolve_conflicts(fields, &walk.records, &settings);

        // Verify
        assert_matches!(
            result,
            Err(PlanError::UnresolvableConflict { option, destinations })
                if option == "--n.m.rate" && destinations == vec!["m.rate", "n.m.rate"]
        );
    }
}
