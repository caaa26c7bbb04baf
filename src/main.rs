fn main() {
    if let Err(err) = kowatch_lib::run() {
        eprintln!("kowatch: {err:#}");
        std::process::exit(1);
    }
}
