use dsarch::cli::initialize_from_arguments;

/// Without arguments, main runs the echo simulation
fn main() -> anyhow::Result<()> {
    println!("dsarch v{}", env!("CARGO_PKG_VERSION"));
    initialize_from_arguments()
}
