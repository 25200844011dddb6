use anyhow::Result;
use egobox_gpc::{
    GpClassifier, Inducings, VariationalDistribution, VariationalStrategy, linspace_grid,
    periodic_sign_data,
};
use env_logger::{Builder, Env};
use linfa::prelude::*;
use ndarray::{Axis, concatenate};
use ndarray_npy::write_npy;
use std::io::Write;

const EGOBOX_LOG: &str = "EGOBOX_LOG";

fn main() -> Result<()> {
    let env = Env::new().filter_or(EGOBOX_LOG, "info");
    let mut builder = Builder::from_env(env);
    let builder = builder
        .target(env_logger::Target::Stdout)
        .format(|buf, record| writeln!(buf, "{}", record.args()));
    builder.try_init().ok();

    // 10 points in [0, 1] labelled by the sign of cos(4 pi x)
    let (xt, yt) = periodic_sign_data(10, 0., 1., 4.);
    println!("Train GP classifier on x = {}", xt.column(0));
    println!("                     y = {}", yt);

    let gpc = GpClassifier::<f64>::params()
        .variational_distribution(VariationalDistribution::Cholesky)
        .variational_strategy(VariationalStrategy::Unwhitened)
        .inducings(Inducings::Training)
        .learn_inducings(false)
        .n_iter(50)
        .learning_rate(0.1)
        .fit(&Dataset::new(xt.clone(), yt.clone()))?;
    println!("{gpc}");

    let x = linspace_grid(101, 0., 1.);
    let proba = gpc.predict_proba(&x)?;
    let labels = gpc.predict(&x)?;

    println!("Class membership probabilities (x, P(y=+1|x), label)");
    println!(
        "{}",
        concatenate![
            Axis(1),
            x,
            proba.view().insert_axis(Axis(1)),
            labels.view().insert_axis(Axis(1))
        ]
    );

    let out_dir = "target/demos";
    std::fs::create_dir_all(out_dir)?;
    write_npy(format!("{out_dir}/gpc_xt.npy"), &xt)?;
    write_npy(format!("{out_dir}/gpc_yt.npy"), &yt)?;
    write_npy(format!("{out_dir}/gpc_x.npy"), &x)?;
    write_npy(format!("{out_dir}/gpc_proba.npy"), &proba)?;
    write_npy(format!("{out_dir}/gpc_labels.npy"), &labels)?;
    println!("Observations and predictions saved in {out_dir}");
    Ok(())
}
