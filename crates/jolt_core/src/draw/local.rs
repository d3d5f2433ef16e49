//! Commands owned by one entity and emitted inside its shader pipeline.

use crate::draw::command::{CommandMeta, CommandSink, DrawCommand, RecordedCommand};

#[derive(Default, Clone, Debug)]
pub struct BatchedLocalCommands {
    commands: Vec<RecordedCommand>,
}

impl BatchedLocalCommands {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, command: DrawCommand, meta: CommandMeta) {
        self.commands.push(RecordedCommand::new(command, meta));
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Empties the list and returns its commands stable-sorted by z.
    pub fn take_sorted(&mut self) -> Vec<RecordedCommand> {
        let mut commands = std::mem::take(&mut self.commands);
        commands.sort_by_key(|c| c.meta.z);
        commands
    }
}

impl CommandSink for BatchedLocalCommands {
    fn push_command(&mut self, command: DrawCommand, meta: CommandMeta) {
        self.add(command, meta);
    }
}
