use std::process::ExitCode;

use backitup::{
    google_drive::{flow::LoopbackFlow, oauth::Authenticator, Drive},
    Outcome, Settings,
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("backitup=info"));
    if let Err(err) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        eprintln!("could not install tracing subscriber: {err}");
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    init_tracing();

    let settings = Settings::from_env();
    tracing::debug!("{settings:?}");

    let credential = Authenticator::new(&settings, LoopbackFlow)
        .authenticate()
        .await?;
    let drive = Drive::new(&credential);

    let mut stdout = std::io::stdout();
    match backitup::run(&drive, &settings, &mut stdout).await? {
        Outcome::Completed(report) => {
            tracing::info!(
                "{} file(s) backed up to folder {}, {} skipped",
                report.uploaded.len(),
                report.folder_id,
                report.skipped.len()
            );
            Ok(ExitCode::SUCCESS)
        }
        Outcome::Failed => Ok(ExitCode::FAILURE),
    }
}
