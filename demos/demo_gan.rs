use nestarg::{derive::*, ArgumentParser, DecodeError};

#[derive(Debug, PartialEq, Record)]
#[nestarg(help = "Settings for one optimizer.")]
struct Optimizer {
    #[nestarg(default = 0.001, help = "The learning rate.")]
    lr: f64,
    #[nestarg(default = 0.9)]
    momentum: f64,
}

#[derive(Debug, PartialEq, Choice)]
enum Device {
    Cpu,
    Cuda,
}

#[derive(Debug, PartialEq, Record)]
struct Training {
    #[nestarg(default = 10, help = "Passes over the data.")]
    epochs: u32,
    #[nestarg(default = Device::Cpu)]
    device: Device,
    generator: Optimizer,
    discriminator: Optimizer,
}

fn main() -> Result<(), DecodeError> {
    let training: Training = parser().parse().extract("config")?;
    println!("{training:?}");
    Ok(())
}

fn parser() -> ArgumentParser {
    ArgumentParser::new("gan")
        .about("Train a generative adversarial network.")
        .add_record::<Training>("config")
}
