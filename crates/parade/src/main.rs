use parade::{ExitStatus, parade_main};

fn main() -> ExitStatus {
    parade_main(|args| args)
}
