use neural_layers::architecture::{build_model, load_architecture};
use neural_layers::config::{load_config, TrainingConfig};
use neural_layers::layers::{DenseLayer, SigmoidLayer, TanhLayer};
use neural_layers::model::Sequential;
use neural_layers::tensor::{from_vec, Tensor};
use neural_layers::utils::SimpleRng;
use neural_layers::NetResult;
use std::env;
use std::process;

// Small MLP to learn XOR (educational example).
const NUM_INPUTS: usize = 2;
const NUM_HIDDEN: usize = 4;
const NUM_OUTPUTS: usize = 1;
const NUM_SAMPLES: usize = 4;

// Used when no config path is given on the command line.
const DEFAULT_CONFIG: &str = r#"{
    "optimizer": "adam",
    "learning_rate": 0.05,
    "loss": "mse",
    "epochs": 2000,
    "seed": 42
}"#;

fn build_network(rng: &mut SimpleRng) -> NetResult<Sequential> {
    let mut model = Sequential::new(vec![NUM_INPUTS]);
    model
        .add(DenseLayer::new(NUM_HIDDEN).with_display("hidden"))
        .add(TanhLayer::default())
        .add(DenseLayer::new(NUM_OUTPUTS).with_display("output"))
        .add(SigmoidLayer::default());
    model.build(rng)?;
    Ok(model)
}

// XOR dataset (binary inputs and expected outputs).
fn xor_dataset() -> NetResult<(Tensor, Tensor)> {
    let inputs = from_vec(
        &[NUM_SAMPLES, NUM_INPUTS],
        vec![0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0],
    )?;
    let targets = from_vec(&[NUM_SAMPLES, NUM_OUTPUTS], vec![0.0, 1.0, 1.0, 0.0])?;
    Ok((inputs, targets))
}

fn run(config: &TrainingConfig, architecture: Option<&str>) -> NetResult<()> {
    // Fixed seed for reproducibility.
    let mut rng = SimpleRng::new(config.seed());
    let mut model = match architecture {
        Some(path) => build_model(&load_architecture(path)?, &mut rng)?,
        None => build_network(&mut rng)?,
    };
    println!("{}", model.summary());

    let loss = config.build_loss()?;
    let mut optimizer = config.build_optimizer()?;
    let (inputs, targets) = xor_dataset()?;

    let epochs = config.epochs();
    let report_every = (epochs / 10).max(1);
    for epoch in 0..epochs {
        let error = model.train_step(&inputs, &targets, loss.as_ref(), optimizer.as_mut())?;
        if (epoch + 1) % report_every == 0 {
            println!("Epoch {}, Error: {:.6}", epoch + 1, error);
        }
    }

    println!("\nTesting the trained network:");
    let predictions = model.predict(&inputs)?;
    for sample in 0..NUM_SAMPLES {
        println!(
            "Input: {:.1}, {:.1}, Expected Output: {:.1}, Predicted Output: {:.3}",
            inputs[[sample, 0]],
            inputs[[sample, 1]],
            targets[[sample, 0]],
            predictions[[sample, 0]]
        );
    }
    Ok(())
}

fn main() {
    // Usage: xor_mlp [training_config.json] [architecture.json]
    let args: Vec<String> = env::args().collect();
    let config = match args.get(1) {
        Some(path) => load_config(path),
        None => neural_layers::config::parse_config(DEFAULT_CONFIG),
    };

    let result = config.and_then(|config| run(&config, args.get(2).map(String::as_str)));
    if let Err(err) = result {
        eprintln!("xor_mlp: {}", err);
        process::exit(1);
    }
}
