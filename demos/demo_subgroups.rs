use nestarg::{derive::*, ArgumentParser, DecodeError};

#[derive(Debug, PartialEq, Record)]
struct Layer {
    #[nestarg(default = 64, help = "Units per layer.")]
    width: u32,
}

#[derive(Debug, PartialEq, Record)]
struct Mlp {
    #[nestarg(base)]
    layer: Layer,
    #[nestarg(default = 2)]
    depth: u32,
}

#[derive(Debug, PartialEq, Record)]
struct Conv {
    #[nestarg(base)]
    layer: Layer,
    #[nestarg(default = 3)]
    kernel: u32,
}

#[derive(Debug, PartialEq, Subgroups)]
enum Model {
    #[nestarg(default)]
    Mlp(Mlp),
    Conv(Conv),
}

#[derive(Debug, PartialEq, Record)]
struct Experiment {
    model: Model,
    #[nestarg(help = "Where to write the results.")]
    output: Option<String>,
}

fn main() -> Result<(), DecodeError> {
    let experiment: Experiment = parser().parse().extract("experiment")?;
    println!("{experiment:?}");
    Ok(())
}

fn parser() -> ArgumentParser {
    ArgumentParser::new("subgroups").add_record::<Experiment>("experiment")
}
