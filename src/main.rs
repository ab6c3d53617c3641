use std::process::ExitCode;

fn main() -> ExitCode {
    seminar_desk_lib::run()
}
