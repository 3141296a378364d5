use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    pairfolds::apps::run_prepare(std::env::args().skip(1))
}
