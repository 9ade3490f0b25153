// SPDX-License-Identifier: MPL-2.0

//! Kiosk Dashboard and Event Loop
//!
//! The dashboard is the single owner of everything the user sees: the feature
//! catalog, the alert monitor and the progress of the install in flight.
//!
//! # Architecture
//!
//! All state changes go through [`Dashboard::update`], driven by one
//! [`Message`] at a time. [`run`] is the single-threaded loop that turns the
//! three event sources into messages:
//!
//! - warning-file notifications, debounced
//! - install worker events
//! - command lines typed at the terminal
//!
//! Install workers run on their own threads and only talk back through the
//! event channel, so the dashboard never needs a lock except for the shared
//! installed-image set.

use crate::alert::{AlertMonitor, AlertPresenter, Debouncer, WarningFileWatcher};
use crate::catalog::Feature;
use crate::install::{InstallEvent, InstallRequest, InstallUpdate, SocketProbe, spawn_install};
use crate::presentation::{CatalogEntry, StorePresenter};
use crate::store::{SharedInstalledImages, is_installed};
use std::io::BufRead;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};

/// Clock format for alert start times.
const TIME_FORMAT: &str = "%H:%M:%S";

const HELP: &str = "Commands: list, show <n>, install <n>, status, help, quit";

// ============================================================================
// Commands
// ============================================================================

/// A command line typed by the user. Feature numbers are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    List,
    Show(usize),
    Install(usize),
    Status,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().unwrap_or_default().to_ascii_lowercase();
        let index = words.next().map(|w| {
            w.parse::<usize>()
                .map_err(|_| format!("'{}' is not a feature number", w))
        });
        if let Some(extra) = words.next() {
            return Err(format!("Unexpected argument '{}'", extra));
        }

        let need_index = |index: Option<Result<usize, String>>| match index {
            Some(result) => result,
            None => Err(format!("'{}' needs a feature number", verb)),
        };

        match verb.as_str() {
            "list" | "ls" => Ok(Command::List),
            "show" => need_index(index).map(Command::Show),
            "install" => need_index(index).map(Command::Install),
            "status" => Ok(Command::Status),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            "" => Err(String::from("Empty command")),
            other => Err(format!("Unknown command '{}'", other)),
        }
    }
}

// ============================================================================
// Messages
// ============================================================================

/// Inputs to [`Dashboard::update`].
#[derive(Debug)]
pub enum Message {
    /// The warning file settled after a burst of changes.
    WarningFileChanged,
    Install(InstallUpdate),
    /// Raw command line from the terminal.
    Input(String),
}

/// Side effect requested by [`Dashboard::update`], carried out by the loop.
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    None,
    StartInstall(InstallRequest),
    Quit,
}

// ============================================================================
// Dashboard
// ============================================================================

pub struct Dashboard<A, S> {
    features: Vec<Feature>,
    installed: SharedInstalledImages,
    alerts: AlertMonitor<A>,
    store: S,
    /// Image name of the running install; the catalog is locked while set
    in_flight: Option<String>,
}

impl<A: AlertPresenter, S: StorePresenter> Dashboard<A, S> {
    pub fn new(
        features: Vec<Feature>,
        installed: SharedInstalledImages,
        alerts: AlertMonitor<A>,
        store: S,
    ) -> Self {
        Self {
            features,
            installed,
            alerts,
            store,
            in_flight: None,
        }
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn installed(&self) -> &SharedInstalledImages {
        &self.installed
    }

    pub fn alerts(&self) -> &AlertMonitor<A> {
        &self.alerts
    }

    pub fn in_flight(&self) -> Option<&str> {
        self.in_flight.as_deref()
    }

    pub fn into_presenters(self) -> (A, S) {
        (self.alerts.into_presenter(), self.store)
    }

    /// Initial render: read the warning file once and list the catalog.
    pub fn start(&mut self) {
        self.alerts.poll();
        self.show_catalog();
    }

    pub fn update(&mut self, message: Message) -> Action {
        match message {
            Message::WarningFileChanged => {
                self.alerts.poll();
                Action::None
            }
            Message::Install(update) => {
                self.on_install_update(update);
                Action::None
            }
            Message::Input(line) => {
                if line.trim().is_empty() {
                    return Action::None;
                }
                match line.parse::<Command>() {
                    Ok(command) => self.on_command(command),
                    Err(e) => {
                        self.store.notice(&format!("{}. {}", e, HELP));
                        Action::None
                    }
                }
            }
        }
    }

    /// The worker for `request` could not be started.
    pub fn install_not_started(&mut self, request: &InstallRequest, error: &std::io::Error) {
        log::error!("Failed to start install of {}: {}", request.image_name, error);
        if self.in_flight.as_deref() == Some(request.image_name.as_str()) {
            self.in_flight = None;
        }
        self.store.install_finished(
            &request.image_name,
            false,
            &format!("Could not start installer: {}", error),
        );
    }

    fn entry<'a>(
        features: &'a [Feature],
        installed: &SharedInstalledImages,
        number: usize,
    ) -> Option<CatalogEntry<'a>> {
        let feature = features.get(number.checked_sub(1)?)?;
        Some(CatalogEntry {
            index: number,
            feature,
            installed: is_installed(installed, &feature.image_name()),
        })
    }

    fn show_catalog(&mut self) {
        let entries: Vec<CatalogEntry<'_>> = (1..=self.features.len())
            .filter_map(|n| Self::entry(&self.features, &self.installed, n))
            .collect();
        self.store.catalog(&entries);
    }

    fn on_command(&mut self, command: Command) -> Action {
        match command {
            Command::List => self.show_catalog(),
            Command::Show(number) => match Self::entry(&self.features, &self.installed, number) {
                Some(entry) => self.store.details(&entry),
                None => Self::no_such_feature(&mut self.store, number),
            },
            Command::Install(number) => return self.request_install(number),
            Command::Status => {
                let alert = match self.alerts.session() {
                    None => String::from("no alert"),
                    Some(session) => format!(
                        "alerting ({}) since {}",
                        session.kind,
                        session.opened_at.format(TIME_FORMAT)
                    ),
                };
                let install = match &self.in_flight {
                    Some(name) => format!("installing {}", name),
                    None => String::from("idle"),
                };
                let count = self
                    .installed
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .len();
                self.store.notice(&format!(
                    "Alert: {} | Installer: {} | Installed images: {}",
                    alert, install, count
                ));
            }
            Command::Help => self.store.notice(HELP),
            Command::Quit => return Action::Quit,
        }
        Action::None
    }

    fn request_install(&mut self, number: usize) -> Action {
        if let Some(name) = &self.in_flight {
            let text = format!("Installing {}, please wait.", name);
            self.store.notice(&text);
            return Action::None;
        }
        let Some(entry) = Self::entry(&self.features, &self.installed, number) else {
            Self::no_such_feature(&mut self.store, number);
            return Action::None;
        };

        let feature = entry.feature;
        let request = InstallRequest::new(&feature.location);
        if request.image_name.is_empty() {
            let text = format!("{} has no image to install.", feature.name);
            self.store.notice(&text);
            return Action::None;
        }
        if entry.installed {
            let text = format!("{} is already installed.", feature.name);
            self.store.notice(&text);
            return Action::None;
        }

        log::info!("Install requested: {} ({})", feature.name, request.image_name);
        let text = format!("Installing {}...", feature.name);
        self.store.notice(&text);
        self.in_flight = Some(request.image_name.clone());
        Action::StartInstall(request)
    }

    fn on_install_update(&mut self, update: InstallUpdate) {
        match update.event {
            InstallEvent::Status(line) => self.store.install_status(&update.image_name, &line),
            InstallEvent::Finished(outcome) => {
                if self.in_flight.as_deref() == Some(update.image_name.as_str()) {
                    self.in_flight = None;
                }
                let success = outcome.is_success();
                self.store
                    .install_finished(&update.image_name, success, &outcome.message());
                if success {
                    self.show_catalog();
                }
            }
        }
    }

    fn no_such_feature(store: &mut S, number: usize) {
        let text = format!("No feature #{}. Type 'list' to see the catalog.", number);
        store.notice(&text);
    }
}

// ============================================================================
// Event Loop
// ============================================================================

pub struct RunOptions {
    pub debounce: Duration,
    pub probe: SocketProbe,
}

/// Forward terminal lines to the event loop from a dedicated thread.
///
/// A plain thread is used because a blocking read in the runtime's blocking
/// pool would keep the runtime from shutting down after `quit`.
pub fn spawn_stdin_reader() -> UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    let spawned = std::thread::Builder::new()
        .name(String::from("stdin"))
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        log::warn!("Stopped reading commands: {}", e);
                        break;
                    }
                }
            }
        });
    if let Err(e) = spawned {
        log::error!("Failed to start command reader: {}", e);
    }
    rx
}

/// Run the dashboard until `quit` or Ctrl-C, then hand it back.
///
/// Must be called inside a tokio runtime. When `commands` closes the loop
/// keeps monitoring alerts and installs.
pub async fn run<A, S>(
    mut dashboard: Dashboard<A, S>,
    options: RunOptions,
    mut commands: UnboundedReceiver<String>,
) -> Dashboard<A, S>
where
    A: AlertPresenter,
    S: StorePresenter,
{
    let (install_tx, mut install_rx) = mpsc::unbounded_channel::<InstallUpdate>();
    let (watch_tx, mut watch_rx) = mpsc::unbounded_channel::<()>();

    let warning_file = dashboard.alerts().path().to_path_buf();
    let _watcher = match WarningFileWatcher::new(&warning_file, move || {
        let _ = watch_tx.send(());
    }) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            log::error!("Alert monitoring disabled: {}", e);
            None
        }
    };

    let mut debouncer = Debouncer::new(options.debounce);
    let mut commands_open = true;
    dashboard.start();

    loop {
        let message = tokio::select! {
            Some(()) = watch_rx.recv() => {
                debouncer.arm();
                continue;
            }
            () = debouncer.fired() => Message::WarningFileChanged,
            Some(update) = install_rx.recv() => Message::Install(update),
            line = commands.recv(), if commands_open => match line {
                Some(line) => Message::Input(line),
                None => {
                    log::info!("Command input closed, continuing to monitor");
                    commands_open = false;
                    continue;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted");
                break;
            }
        };

        match dashboard.update(message) {
            Action::None => {}
            Action::Quit => break,
            Action::StartInstall(request) => {
                let started = spawn_install(
                    request.clone(),
                    options.probe.clone(),
                    dashboard.installed().clone(),
                    install_tx.clone(),
                );
                if let Err(e) = started {
                    dashboard.install_not_started(&request, &e);
                }
            }
        }
    }

    log::info!("Dashboard stopped");
    dashboard
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::{AlertMessage, AlertState, WarningKind};
    use crate::install::{InstallError, InstallOutcome, PodmanError};
    use crate::store::{InstalledImages, record_install};
    use std::path::Path;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Alerts {
        shown: Vec<WarningKind>,
        dismissed: usize,
    }

    impl AlertPresenter for Alerts {
        fn show(&mut self, kind: WarningKind, _message: AlertMessage) {
            self.shown.push(kind);
        }
        fn update(&mut self, kind: WarningKind, _message: AlertMessage) {
            self.shown.push(kind);
        }
        fn dismiss(&mut self) {
            self.dismissed += 1;
        }
    }

    #[derive(Debug, Default)]
    struct Screen {
        catalogs: Vec<Vec<(String, bool)>>,
        details: Vec<String>,
        status: Vec<String>,
        finished: Vec<(String, bool, String)>,
        notices: Vec<String>,
    }

    impl StorePresenter for Screen {
        fn catalog(&mut self, entries: &[CatalogEntry<'_>]) {
            self.catalogs.push(
                entries
                    .iter()
                    .map(|e| (e.feature.name.clone(), e.installed))
                    .collect(),
            );
        }
        fn details(&mut self, entry: &CatalogEntry<'_>) {
            self.details.push(entry.feature.name.clone());
        }
        fn install_status(&mut self, _image_name: &str, line: &str) {
            self.status.push(line.to_string());
        }
        fn install_finished(&mut self, image_name: &str, success: bool, message: &str) {
            self.finished
                .push((image_name.to_string(), success, message.to_string()));
        }
        fn notice(&mut self, text: &str) {
            self.notices.push(text.to_string());
        }
    }

    fn feature(name: &str, location: &str) -> Feature {
        Feature {
            name: name.to_string(),
            short_desc: String::new(),
            long_desc: String::new(),
            icon: String::new(),
            location: location.to_string(),
        }
    }

    fn dashboard(dir: &Path) -> Dashboard<Alerts, Screen> {
        let features = vec![
            feature("Hello", "https://hub.docker.com/_/hello-world"),
            feature("Lane Keep", "https://hub.docker.com/r/example/lane-keep"),
            feature("Clock", ""),
        ];
        let installed = InstalledImages::load(dir.join("installed.json")).into_shared();
        let monitor = AlertMonitor::new(dir.join("results.json"), Alerts::default());
        Dashboard::new(features, installed, monitor, Screen::default())
    }

    fn input(dashboard: &mut Dashboard<Alerts, Screen>, line: &str) -> Action {
        dashboard.update(Message::Input(line.to_string()))
    }

    fn finished(image_name: &str, outcome: InstallOutcome) -> Message {
        Message::Install(InstallUpdate {
            image_name: image_name.to_string(),
            event: InstallEvent::Finished(outcome),
        })
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!("list".parse::<Command>(), Ok(Command::List));
        assert_eq!(" Install 2 ".parse::<Command>(), Ok(Command::Install(2)));
        assert_eq!("show 1".parse::<Command>(), Ok(Command::Show(1)));
        assert_eq!("quit".parse::<Command>(), Ok(Command::Quit));
        assert!("install".parse::<Command>().is_err());
        assert!("install two".parse::<Command>().is_err());
        assert!("show 1 2".parse::<Command>().is_err());
        assert!("dance".parse::<Command>().is_err());
    }

    #[test]
    fn test_install_locks_catalog_until_finished() {
        let dir = TempDir::new().unwrap();
        let mut dashboard = dashboard(dir.path());

        let Action::StartInstall(request) = input(&mut dashboard, "install 1") else {
            panic!("expected an install");
        };
        assert_eq!(request.image_name, "hello-world");
        assert_eq!(request.container_name, "adas-hello-world");
        assert_eq!(dashboard.in_flight(), Some("hello-world"));

        // Second request is refused while the first is running
        assert_eq!(input(&mut dashboard, "install 2"), Action::None);
        assert!(dashboard.store.notices.last().unwrap().contains("please wait"));

        dashboard.update(Message::Install(InstallUpdate {
            image_name: "hello-world".into(),
            event: InstallEvent::Status("Connecting to Podman...".into()),
        }));
        record_install(dashboard.installed(), "hello-world").unwrap();
        dashboard.update(finished(
            "hello-world",
            InstallOutcome::Installed {
                image_name: "hello-world".into(),
                status_trail: Vec::new(),
            },
        ));

        assert_eq!(dashboard.in_flight(), None);
        assert_eq!(dashboard.store.status, vec!["Connecting to Podman..."]);
        let (name, success, message) = dashboard.store.finished.last().unwrap();
        assert_eq!(name, "hello-world");
        assert!(*success);
        assert_eq!(message, "Container ran successfully.");
        let catalog = dashboard.store.catalogs.last().unwrap();
        assert_eq!(catalog[0], ("Hello".to_string(), true));
        assert_eq!(catalog[1], ("Lane Keep".to_string(), false));

        // Already installed features are not reinstalled
        assert_eq!(input(&mut dashboard, "install 1"), Action::None);
        assert!(matches!(input(&mut dashboard, "install 2"), Action::StartInstall(_)));
    }

    #[test]
    fn test_failed_install_stays_installable() {
        let dir = TempDir::new().unwrap();
        let mut dashboard = dashboard(dir.path());

        assert!(matches!(input(&mut dashboard, "install 2"), Action::StartInstall(_)));
        dashboard.update(finished(
            "lane-keep",
            InstallOutcome::Failed(InstallError::PullFailed(PodmanError::Pull(String::from(
                "manifest unknown",
            )))),
        ));

        let (_, success, message) = dashboard.store.finished.last().unwrap();
        assert!(!success);
        assert_eq!(message, "Image pull failed: manifest unknown");
        assert_eq!(dashboard.in_flight(), None);
        assert!(matches!(input(&mut dashboard, "install 2"), Action::StartInstall(_)));
    }

    #[test]
    fn test_worker_start_failure_unlocks_catalog() {
        let dir = TempDir::new().unwrap();
        let mut dashboard = dashboard(dir.path());

        let Action::StartInstall(request) = input(&mut dashboard, "install 1") else {
            panic!("expected an install");
        };
        let error = std::io::Error::other("no threads left");
        dashboard.install_not_started(&request, &error);

        assert_eq!(dashboard.in_flight(), None);
        assert!(!dashboard.store.finished.last().unwrap().1);
    }

    #[test]
    fn test_invalid_install_targets() {
        let dir = TempDir::new().unwrap();
        let mut dashboard = dashboard(dir.path());

        assert_eq!(input(&mut dashboard, "install 3"), Action::None);
        assert!(dashboard.store.notices.last().unwrap().contains("no image"));
        assert_eq!(input(&mut dashboard, "install 0"), Action::None);
        assert_eq!(input(&mut dashboard, "install 9"), Action::None);
        assert!(dashboard.store.notices.last().unwrap().contains("No feature #9"));
        assert_eq!(dashboard.in_flight(), None);
    }

    #[test]
    fn test_warning_change_drives_alert() {
        let dir = TempDir::new().unwrap();
        let mut dashboard = dashboard(dir.path());
        dashboard.start();
        assert_eq!(dashboard.alerts().state(), AlertState::Idle);
        input(&mut dashboard, "status");
        assert!(dashboard.store.notices.last().unwrap().starts_with("Alert: no alert |"));

        let results = dir.path().join("results.json");
        std::fs::write(&results, r#"{"drowsy": false, "distracted": true, "yawning": true}"#)
            .unwrap();
        dashboard.update(Message::WarningFileChanged);
        assert_eq!(
            dashboard.alerts().state(),
            AlertState::Alerting(WarningKind::Distracted)
        );

        input(&mut dashboard, "status");
        let opened_at = dashboard.alerts().session().unwrap().opened_at;
        let expected = format!("alerting (distracted) since {}", opened_at.format("%H:%M:%S"));
        assert!(
            dashboard.store.notices.last().unwrap().contains(&expected),
            "{:?}",
            dashboard.store.notices
        );

        std::fs::write(&results, r#"{"drowsy": false, "distracted": false, "yawning": false}"#)
            .unwrap();
        dashboard.update(Message::WarningFileChanged);
        let (alerts, _) = dashboard.into_presenters();
        assert_eq!(alerts.shown, vec![WarningKind::Distracted]);
        assert_eq!(alerts.dismissed, 1);
    }

    #[test]
    fn test_show_and_unknown_command() {
        let dir = TempDir::new().unwrap();
        let mut dashboard = dashboard(dir.path());

        input(&mut dashboard, "show 2");
        assert_eq!(dashboard.store.details, vec!["Lane Keep"]);
        input(&mut dashboard, "fly");
        assert!(dashboard.store.notices.last().unwrap().contains("Unknown command"));
        assert_eq!(input(&mut dashboard, "   "), Action::None);
        assert_eq!(input(&mut dashboard, "quit"), Action::Quit);
    }

    #[tokio::test]
    async fn test_run_polls_at_start_and_quits() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("results.json"),
            r#"{"drowsy": true, "distracted": false, "yawning": false}"#,
        )
        .unwrap();
        let dashboard = dashboard(dir.path());

        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(String::from("list")).unwrap();
        tx.send(String::from("quit")).unwrap();
        let options = RunOptions {
            debounce: Duration::from_millis(50),
            probe: SocketProbe::with_candidates(None, Vec::new()),
        };

        let dashboard = run(dashboard, options, rx).await;
        let (alerts, screen) = dashboard.into_presenters();
        assert_eq!(alerts.shown, vec![WarningKind::Drowsy]);
        // Start-up render plus the `list` command
        assert_eq!(screen.catalogs.len(), 2);
    }
}
