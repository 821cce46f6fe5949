use nestarg::{ArgumentParser, Field, FieldType, Instance, Record, RecordDecl};

struct Optimizer;

impl Record for Optimizer {
    fn declaration() -> RecordDecl {
        RecordDecl::new("Optimizer")
            .help("Settings for one optimizer.")
            .field(
                Field::new("lr", FieldType::Float)
                    .default(0.001)
                    .help("The learning rate."),
            )
            .field(Field::new("momentum", FieldType::Float).default(0.9))
    }
}

struct Training;

impl Record for Training {
    fn declaration() -> RecordDecl {
        RecordDecl::new("Training")
            .field(
                Field::new("epochs", FieldType::Int)
                    .default(10)
                    .help("Passes over the data."),
            )
            .field(
                Field::new(
                    "device",
                    FieldType::Choice(vec!["cpu".to_string(), "cuda".to_string()]),
                )
                .default("cpu"),
            )
            .field(Field::new("generator", FieldType::record::<Optimizer>()))
            .field(Field::new("discriminator", FieldType::record::<Optimizer>()))
    }
}

fn main() {
    let outcome = parser().parse();

    if let Some(training) = outcome.namespace().instance("config") {
        println!("{training}");
    }
}

fn parser() -> ArgumentParser {
    ArgumentParser::new("gan")
        .about("Train a generative adversarial network.")
        .add_record::<Training>("config")
}

#[allow(dead_code)]
fn training(tokens: &[&str]) -> Option<Instance> {
    let outcome = parser().parse_args(tokens).ok()?;
    outcome.namespace().instance("config").cloned()
}
