use btleplug::platform::Manager;
use log::{error, info, warn};
use tokio::signal;

use crate::app::args::Args;
use crate::config::io::load_config;
use crate::device::btle::BtleDiscoverySource;
use crate::device::permission::BtlePermissionGate;
use crate::error::{AppRunError, DiscoveryError};
use crate::scan::scheduler::Scheduler;
use crate::scan::session::ScanSession;
use crate::scan::types::SessionState;

pub fn render_devices(state: &SessionState) -> String {
    let mut out = format!("Session {}: {} device(s)\n", state.session, state.devices.len());

    for device in state.devices.iter() {
        out.push_str(&format!("  Name: {}  RSSI: {}\n", device.display_name_or_unknown(), device.signal_strength));
    }

    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Scanning { session: u64 },
    Error(String),
    Ended(SessionState),
}

/// Turns published session states into things worth printing.
///
/// The watch channel only keeps the latest state, so a session that started and failed between two
/// reads shows up as a single idle state. Sessions are told apart by their counter, not by watching
/// `active` flip.
#[derive(Debug, Default)]
pub struct SessionReporter {
    announced: u64,
    reported: u64,
    last_error: Option<(u64, String)>,
}

impl SessionReporter {
    /// Nothing that is already visible in `state` gets reported again.
    pub fn starting_from(state: &SessionState) -> Self {
        SessionReporter {
            announced: state.session,
            reported: if state.active { state.session.saturating_sub(1) } else { state.session },
            last_error: state.last_error.clone().map(|e| (state.session, e)),
        }
    }

    pub fn observe(&mut self, state: &SessionState) -> Vec<Report> {
        let mut reports = Vec::new();

        if state.session > self.announced {
            self.announced = state.session;
            reports.push(Report::Scanning { session: state.session });
        }

        if let Some(last_error) = &state.last_error {
            let seen = self.last_error.as_ref()
                .map_or(false, |(session, e)| *session == state.session && e == last_error);
            if !seen {
                self.last_error = Some((state.session, last_error.clone()));
                reports.push(Report::Error(last_error.clone()));
            }
        }

        if !state.active && state.session > self.reported {
            self.reported = state.session;
            reports.push(Report::Ended(state.clone()));
        }

        reports
    }
}

pub async fn run_application(args: Args) -> Result<(), AppRunError> {
    let mut config = load_config(args.config.as_deref()).await?;
    args.apply_overrides(&mut config);
    config.validate()?;

    // one manager for both, so the permission check looks at the same stack the scan runs on
    let manager = Manager::new().await.map_err(DiscoveryError::from)?;
    let (session, session_handle) = ScanSession::spawn(
        config.session_config(),
        Box::new(BtlePermissionGate::new(manager.clone())),
        Box::new(BtleDiscoverySource::new(manager, config.adapter_index)),
    );

    if !session.initialize().await {
        let cause = session.state().last_error.unwrap_or_default();
        error!("Bluetooth is not available: {}", cause);
        if args.once || !config.recheck_permission {
            session.shutdown().await;
            return Ok(());
        }
    }

    let mut states = session.subscribe();
    let mut reporter = SessionReporter::starting_from(&states.borrow_and_update());

    let (scheduler, scheduler_handle) = Scheduler::spawn(session.clone(), config.scan_period());
    scheduler.trigger().await;

    let ctrl_c = signal::ctrl_c();
    tokio::pin!(ctrl_c);

    'mainloop: loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break 'mainloop;
            },
            changed = states.changed() => {
                if changed.is_err() {
                    break 'mainloop;
                }

                let state = states.borrow_and_update().clone();
                for report in reporter.observe(&state) {
                    match report {
                        Report::Scanning { .. } => println!("Scanning..."),
                        Report::Error(last_error) => println!("Scan error: {}", last_error),
                        Report::Ended(ended) => {
                            print!("{}", render_devices(&ended));
                            if args.once {
                                break 'mainloop;
                            }
                        },
                    }
                }
            },
        }
    }

    scheduler.shutdown();
    if let Err(err) = scheduler_handle.await {
        warn!("Failed to join scheduler task: {:?}", err);
    }

    session.shutdown().await;
    if let Err(err) = session_handle.await {
        warn!("Failed to join scan session task: {:?}", err);
    }

    info!("Stopped");
    Ok(())
}
