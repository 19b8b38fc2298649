use crate::domains::traversal::StopSignal;
use tokio::sync::mpsc;

/// Requests from outside the control loop. Applied at the start of the next
/// tick, never mid-stage.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatorCommand {
    SelectAreas(Vec<String>),
    Stop,
    Resume,
}

/// Cloneable, thread-safe handle for queueing coordinator commands.
///
/// `stop` also raises the shared stop signal so a wait in progress unwinds
/// within one poll interval instead of at the next drain.
#[derive(Debug, Clone)]
pub struct CommandSender {
    sender: mpsc::UnboundedSender<CoordinatorCommand>,
    stop_signal: StopSignal,
}

impl CommandSender {
    pub fn send(&self, command: CoordinatorCommand) -> Result<(), String> {
        self.sender
            .send(command)
            .map_err(|e| format!("Failed to queue command: {}", e))
    }

    pub fn select_areas(&self, area_ids: Vec<String>) -> Result<(), String> {
        self.send(CoordinatorCommand::SelectAreas(area_ids))
    }

    pub fn stop(&self) -> Result<(), String> {
        self.stop_signal.raise();
        self.send(CoordinatorCommand::Stop)
    }

    pub fn resume(&self) -> Result<(), String> {
        self.stop_signal.clear();
        self.send(CoordinatorCommand::Resume)
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop_signal.clone()
    }
}

pub fn command_channel() -> (CommandSender, mpsc::UnboundedReceiver<CoordinatorCommand>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let stop_signal = StopSignal::new();
    (CommandSender { sender, stop_signal }, receiver)
}

/// Everything queued so far, in order. Does not block.
pub fn drain(receiver: &mut mpsc::UnboundedReceiver<CoordinatorCommand>) -> Vec<CoordinatorCommand> {
    let mut commands = Vec::new();
    while let Ok(command) = receiver.try_recv() {
        commands.push(command);
    }
    commands
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_drain_in_order_from_other_threads() {
        let (sender, mut receiver) = command_channel();
        let remote = sender.clone();
        std::thread::spawn(move || {
            remote.select_areas(vec!["winter".to_string()]).unwrap();
            remote.stop().unwrap();
        })
        .join()
        .unwrap();
        sender.resume().unwrap();

        let drained = drain(&mut receiver);
        assert_eq!(
            drained,
            vec![
                CoordinatorCommand::SelectAreas(vec!["winter".to_string()]),
                CoordinatorCommand::Stop,
                CoordinatorCommand::Resume,
            ]
        );
        assert!(drain(&mut receiver).is_empty());
    }

    #[test]
    fn test_stop_raises_signal_before_drain() {
        let (sender, mut receiver) = command_channel();
        let signal = sender.stop_signal();
        assert!(!signal.is_raised());

        sender.clone().stop().unwrap();
        assert!(signal.is_raised());

        sender.resume().unwrap();
        assert!(!signal.is_raised());
        assert_eq!(drain(&mut receiver), vec![CoordinatorCommand::Stop, CoordinatorCommand::Resume]);
    }

    #[test]
    fn test_send_after_receiver_dropped_fails() {
        let (sender, receiver) = command_channel();
        drop(receiver);
        assert!(sender.stop().is_err());
    }
}
