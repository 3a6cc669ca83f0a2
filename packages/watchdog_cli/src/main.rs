use std::process::ExitCode;

use watchdog_cli::entry::{self, NativeConnect};
use watchdog_cli::profiling::{self, CpuProfile};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let session = CpuProfile::start(&profiling::profile_dir());

    let mut stdout = std::io::stdout();
    let exit = entry::run(std::env::args_os(), session, NativeConnect, &mut stdout).await;

    exit.into()
}
