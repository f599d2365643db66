//! impfbot - appointment automation for the Bavarian vaccination portal
//!
//! Thin command-line entry point: wires configuration, the file-backed
//! credential source and the appointment service, then runs one operation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use chrono::{Local, NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use impfbot_core::AppointmentService;
use impfbot_domain::{Appointment, ImpfbotError};
use impfbot_infra::{FileCredentialSource, PortalSessionFactory};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "impfbot",
    version,
    about = "Appointment automation for the Bavarian vaccination portal"
)]
struct Cli {
    /// Path to a config file (JSON or TOML); standard locations are probed
    /// if omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the credentials JSON file.
    #[arg(long, global = true, default_value = "credentials.json")]
    credentials: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a date range for free appointment slots.
    Scan {
        /// First day to probe; today if omitted.
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Number of days to scan beyond the first.
        #[arg(long, default_value_t = 60)]
        days: u32,
    },
    /// Show the currently booked appointment.
    Current,
    /// Book a specific slot.
    Book {
        /// Vaccination site identifier.
        #[arg(long)]
        site: String,

        /// Slot date, e.g. 2021-12-13.
        #[arg(long)]
        date: NaiveDate,

        /// Slot time, e.g. 15:00.
        #[arg(long)]
        time: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging first so .env loading is visible.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match dotenvy::dotenv() {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(err) => debug!(error = %err, "no .env file loaded"),
    }

    let cli = Cli::parse();
    let config = Arc::new(impfbot_infra::config::load(cli.config.clone())?);
    let service = AppointmentService::new(Arc::new(PortalSessionFactory::new(config)));
    let credentials = FileCredentialSource::new(cli.credentials.clone());

    match run(&service, &credentials, cli.command).await {
        Err(ImpfbotError::InvalidCredentials) => Err(anyhow!(
            "the portal rejected the username or password; check [{}]",
            cli.credentials.display()
        )),
        result => Ok(result?),
    }
}

async fn run(
    service: &AppointmentService,
    credentials: &FileCredentialSource,
    command: Command,
) -> impfbot_domain::Result<()> {
    match command {
        Command::Scan { from, days } => {
            let first_day = from.unwrap_or_else(|| Local::now().date_naive());
            info!(%first_day, days, "looking for appointments");
            let authentication = service.authentication(credentials).await?;
            let appointments =
                service.appointments_in_range(&authentication, first_day, days).await?;
            if appointments.is_empty() {
                info!("no free appointments found");
            }
            for appointment in &appointments {
                if let Appointment::Scheduled { site, date_time } = appointment {
                    info!(site = %site, date_time = %date_time, "free appointment");
                }
            }
            info!("done");
            Ok(())
        }
        Command::Current => {
            let authentication = service.authentication(credentials).await?;
            match service.current_appointment(&authentication).await? {
                Appointment::Scheduled { site, date_time } => {
                    info!(site = %site, date_time = %date_time, "currently booked");
                }
                Appointment::NoAppointment => info!("no appointment booked"),
            }
            Ok(())
        }
        Command::Book { site, date, time } => {
            let time = NaiveTime::parse_from_str(&time, "%H:%M").map_err(|err| {
                ImpfbotError::InvalidInput(format!("unparseable slot time [{time}]: {err}"))
            })?;
            let date_time = date.and_time(time);
            let appointment = Appointment::scheduled(site.clone(), date_time);
            let authentication = service.authentication(credentials).await?;
            service.book_appointment(&authentication, &appointment).await?;
            info!(site = %site, date_time = %date_time, "booked");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_declaration_is_consistent() {
        Cli::command().debug_assert();
    }
}
