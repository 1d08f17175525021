fn main() {
    if let Err(err) = scatter_declutter::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
