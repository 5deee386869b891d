//! Shared handlers and callers for the behavioural suites.

use std::sync::Mutex;

use crate::{
    CommandDescriptor, CommandError, CommandHandler, CommandMethod, CommandSender, CommandStatus,
    Mapping, NetCommandHandler, NetCommandMethod, SenderKind,
};

/// Caller double that records what it is told.
pub(crate) struct RecordingSender {
    kind: SenderKind,
    permissions: Vec<String>,
    messages: Mutex<Vec<String>>,
    permission_checks: Mutex<usize>,
}

impl RecordingSender {
    pub(crate) fn new(kind: SenderKind, permissions: &[&str]) -> Self {
        Self {
            kind,
            permissions: permissions.iter().map(|p| (*p).to_owned()).collect(),
            messages: Mutex::new(Vec::new()),
            permission_checks: Mutex::new(0),
        }
    }

    pub(crate) fn messages(&self) -> Vec<String> {
        self.messages.lock().expect("messages lock").clone()
    }

    pub(crate) fn permission_checks(&self) -> usize {
        *self.permission_checks.lock().expect("checks lock")
    }
}

impl CommandSender for RecordingSender {
    fn name(&self) -> String {
        format!("{}-caller", self.kind)
    }

    fn kind(&self) -> SenderKind {
        self.kind
    }

    fn has_permission(&self, permission: &str) -> bool {
        *self.permission_checks.lock().expect("checks lock") += 1;
        self.permissions.iter().any(|held| held == permission)
    }

    fn send_message(&self, message: &str) {
        self.messages
            .lock()
            .expect("messages lock")
            .push(message.to_owned());
    }
}

/// Local handler servicing `heal`.
#[derive(Default)]
pub(crate) struct Infirmary {
    heals: Mutex<usize>,
    statuses: Mutex<Vec<CommandStatus>>,
}

impl Infirmary {
    fn heal(
        &self,
        _sender: &dyn CommandSender,
        _kind: SenderKind,
        _descriptor: &CommandDescriptor,
        _command: &str,
        arguments: &[String],
    ) -> Result<CommandStatus, CommandError> {
        match arguments.first().map(String::as_str) {
            Some("help") => return Ok(CommandStatus::Help),
            Some("panic") => panic!("the infirmary is on fire"),
            None => return Ok(CommandStatus::InvalidArgs),
            Some(_) => {}
        }
        *self.heals.lock().expect("heals lock") += 1;
        Ok(CommandStatus::Success)
    }

    pub(crate) fn heals(&self) -> usize {
        *self.heals.lock().expect("heals lock")
    }

    pub(crate) fn statuses(&self) -> Vec<CommandStatus> {
        self.statuses.lock().expect("statuses lock").clone()
    }
}

impl CommandHandler for Infirmary {
    fn commands(&self) -> Vec<CommandMethod<Self>> {
        vec![CommandMethod::new(
            CommandDescriptor::new("heal", "<player>", "cmd.heal", [SenderKind::Player]),
            Self::heal,
        )]
    }

    fn handle_command_status(&self, status: CommandStatus, _: &dyn CommandSender, _: SenderKind) {
        self.statuses.lock().expect("statuses lock").push(status);
    }
}

/// Local handler servicing `dispense`.
#[derive(Default)]
pub(crate) struct Pharmacy;

impl Pharmacy {
    fn dispense(
        &self,
        _: &dyn CommandSender,
        _: SenderKind,
        _: &CommandDescriptor,
        _: &str,
        _: &[String],
    ) -> Result<CommandStatus, CommandError> {
        Ok(CommandStatus::Success)
    }
}

impl CommandHandler for Pharmacy {
    fn commands(&self) -> Vec<CommandMethod<Self>> {
        vec![CommandMethod::new(
            CommandDescriptor::new(
                "dispense",
                "<item>",
                "cmd.dispense",
                [SenderKind::Player, SenderKind::Console],
            ),
            Self::dispense,
        )]
    }

    fn handle_command_status(&self, _: CommandStatus, _: &dyn CommandSender, _: SenderKind) {}
}

/// Net handler recording every mapping it receives.
pub(crate) struct Scoreboard {
    command: String,
    required: Vec<String>,
    faulty: bool,
    received: Mutex<Vec<Mapping>>,
}

impl Scoreboard {
    pub(crate) fn new(command: &str, required: &[String], faulty: bool) -> Self {
        Self {
            command: command.to_owned(),
            required: required.to_vec(),
            faulty,
            received: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, data: &Mapping) -> Result<(), CommandError> {
        self.received
            .lock()
            .expect("received lock")
            .push(data.clone());
        if self.faulty {
            return Err(CommandError::new("scoreboard storage unavailable"));
        }
        Ok(())
    }

    pub(crate) fn received(&self) -> Vec<Mapping> {
        self.received.lock().expect("received lock").clone()
    }
}

impl NetCommandHandler for Scoreboard {
    fn net_commands(&self) -> Vec<NetCommandMethod<Self>> {
        vec![NetCommandMethod::new(
            self.command.as_str(),
            self.required.iter().cloned(),
            Self::record,
        )]
    }
}
