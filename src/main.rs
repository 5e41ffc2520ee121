use std::process::ExitCode;

fn main() -> ExitCode {
    excel_sync_lib::run()
}
